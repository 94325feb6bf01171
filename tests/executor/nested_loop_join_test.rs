use cangkul::{
    executor::{CompOp, Condition, Executor, NestedLoopJoinExecutor},
    storage::schema::{ColumnDef, TabCol},
    types::{
        error::DatabaseError,
        value::{ColType, Value},
    },
    utils::mock::ValuesExecutor,
};

use crate::common::{int_pairs, left_rows, right_rows, run, text};

fn id_eq() -> Condition {
    Condition::with_col(TabCol::new("l", "id"), CompOp::Eq, TabCol::new("r", "id"))
}

fn empty(table: &str) -> Result<ValuesExecutor, DatabaseError> {
    ValuesExecutor::new(table, &[ColumnDef::new("id", ColType::Int)], vec![])
}

#[test]
fn test_equi_join() -> Result<(), DatabaseError> {
    let mut join = NestedLoopJoinExecutor::new(left_rows()?.boxed(), right_rows()?.boxed(), &[id_eq()])?;
    assert_eq!(
        run(&mut join)?,
        vec![vec![Value::Int(2), text("b"), Value::Int(2), text("x")]]
    );
    Ok(())
}

#[test]
fn test_joined_schema_shifts_right_columns() -> Result<(), DatabaseError> {
    let join = NestedLoopJoinExecutor::new(left_rows()?.boxed(), right_rows()?.boxed(), &[])?;
    assert_eq!(join.tuple_len(), 16);
    let offsets: Vec<(String, usize)> = join
        .cols()
        .iter()
        .map(|c| (format!("{}.{}", c.tab_name, c.name), c.offset))
        .collect();
    assert_eq!(
        offsets,
        vec![
            ("l.id".to_string(), 0),
            ("l.name".to_string(), 4),
            ("r.id".to_string(), 8),
            ("r.tag".to_string(), 12),
        ]
    );
    assert_eq!(join.get_col_offset(&TabCol::new("r", "tag"))?.offset, 12);
    assert_eq!(join.executor_type(), "NestedLoopJoinExecutor");
    Ok(())
}

#[test]
fn test_cross_product_is_left_major() -> Result<(), DatabaseError> {
    let mut join = NestedLoopJoinExecutor::new(
        int_pairs("a", &[(1, 0), (2, 0)])?.boxed(),
        int_pairs("b", &[(10, 0), (20, 0), (30, 0)])?.boxed(),
        &[],
    )?;
    let keys: Vec<(Value, Value)> = run(&mut join)?
        .into_iter()
        .map(|row| (row[0].clone(), row[2].clone()))
        .collect();
    assert_eq!(
        keys,
        vec![
            (Value::Int(1), Value::Int(10)),
            (Value::Int(1), Value::Int(20)),
            (Value::Int(1), Value::Int(30)),
            (Value::Int(2), Value::Int(10)),
            (Value::Int(2), Value::Int(20)),
            (Value::Int(2), Value::Int(30)),
        ]
    );
    Ok(())
}

#[test]
fn test_empty_inputs_produce_nothing() -> Result<(), DatabaseError> {
    let mut join = NestedLoopJoinExecutor::new(left_rows()?.boxed(), empty("r")?.boxed(), &[])?;
    join.begin_tuple()?;
    assert!(join.is_end());
    assert!(join.next().is_none());

    let mut join = NestedLoopJoinExecutor::new(empty("l")?.boxed(), right_rows()?.boxed(), &[])?;
    assert!(run(&mut join)?.is_empty());
    Ok(())
}

#[test]
fn test_no_matches() -> Result<(), DatabaseError> {
    let cond = Condition::with_col(TabCol::new("l", "id"), CompOp::Gt, TabCol::new("r", "id"));
    let mut join = NestedLoopJoinExecutor::new(left_rows()?.boxed(), right_rows()?.boxed(), &[cond])?;
    assert!(run(&mut join)?.is_empty());
    Ok(())
}

#[test]
fn test_literal_and_column_conditions_combine() -> Result<(), DatabaseError> {
    let conds = [
        Condition::with_col(TabCol::new("a", "k"), CompOp::Eq, TabCol::new("b", "k")),
        Condition::with_value(TabCol::new("b", "v"), CompOp::Ge, Value::Int(5)),
    ];
    let mut join = NestedLoopJoinExecutor::new(
        int_pairs("a", &[(1, 0), (2, 0), (3, 0)])?.boxed(),
        int_pairs("b", &[(1, 4), (2, 5), (3, 6), (2, 9)])?.boxed(),
        &conds,
    )?;
    let pairs: Vec<(Value, Value)> = run(&mut join)?
        .into_iter()
        .map(|row| (row[0].clone(), row[3].clone()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            (Value::Int(2), Value::Int(5)),
            (Value::Int(2), Value::Int(9)),
            (Value::Int(3), Value::Int(6)),
        ]
    );
    Ok(())
}

#[test]
fn test_peek_does_not_advance() -> Result<(), DatabaseError> {
    let mut join = NestedLoopJoinExecutor::new(left_rows()?.boxed(), right_rows()?.boxed(), &[])?;
    join.begin_tuple()?;
    let first = join.next().cloned();
    assert!(first.is_some());
    assert_eq!(join.next().cloned(), first);
    join.next_tuple()?;
    assert_ne!(join.next().cloned(), first);
    Ok(())
}

#[test]
fn test_nested_joins_compose() -> Result<(), DatabaseError> {
    let inner = NestedLoopJoinExecutor::new(left_rows()?.boxed(), right_rows()?.boxed(), &[id_eq()])?;
    let third = int_pairs("c", &[(2, 100), (3, 200)])?;
    let cond = Condition::with_col(TabCol::new("r", "id"), CompOp::Eq, TabCol::new("c", "k"));
    let mut outer = NestedLoopJoinExecutor::new(Box::new(inner), third.boxed(), &[cond])?;
    assert_eq!(
        run(&mut outer)?,
        vec![vec![
            Value::Int(2),
            text("b"),
            Value::Int(2),
            text("x"),
            Value::Int(2),
            Value::Int(100),
        ]]
    );
    Ok(())
}
