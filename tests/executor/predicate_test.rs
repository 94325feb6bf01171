use std::{cmp::Ordering, sync::Arc};

use cangkul::{
    executor::{
        BlockNestedLoopJoinExecutor, CompOp, CondRhs, Condition, NestedLoopJoinExecutor,
        predicate::{BoundCondition, bind_conditions, eval_conditions},
    },
    storage::{
        buffer_pool::BufferPool,
        schema::{ColumnDef, TabCol, TableSchema},
    },
    types::{
        error::DatabaseError,
        record::Record,
        value::{ColType, Value},
    },
};

use crate::common::{run, single_col, text};

const ALL_OPS: [CompOp; 6] = [CompOp::Eq, CompOp::Ne, CompOp::Lt, CompOp::Gt, CompOp::Le, CompOp::Ge];

#[test]
fn test_operator_codes() -> Result<(), DatabaseError> {
    for op in ALL_OPS {
        assert_eq!(CompOp::from_code(op.code())?, op);
    }
    assert!(matches!(
        CompOp::from_code(6),
        Err(DatabaseError::UnknownOperator { code: 6 })
    ));
    let err = Condition::from_code(TabCol::new("t", "a"), 42, CondRhs::Val(Value::Int(1)));
    assert!(matches!(err, Err(DatabaseError::UnknownOperator { code: 42 })));
    Ok(())
}

#[test]
fn test_operator_truth_table() {
    use Ordering::*;
    let expected = [
        (CompOp::Eq, [false, true, false]),
        (CompOp::Ne, [true, false, true]),
        (CompOp::Lt, [true, false, false]),
        (CompOp::Gt, [false, false, true]),
        (CompOp::Le, [true, true, false]),
        (CompOp::Ge, [false, true, true]),
    ];
    for (op, results) in expected {
        for (ord, result) in [Less, Equal, Greater].into_iter().zip(results) {
            assert_eq!(op.eval(ord), result, "{} on {:?}", op, ord);
        }
    }
}

fn holds(op: CompOp, ord: Ordering) -> bool {
    op.eval(ord)
}

/// Joins `left.v op right.v` both ways and checks the pairs against `cmp`.
fn check_join_op(
    def: ColumnDef,
    values: Vec<Value>,
    cmp: impl Fn(&Value, &Value) -> Ordering,
) -> Result<(), DatabaseError> {
    for op in ALL_OPS {
        let cond = Condition::with_col(TabCol::new("l", "v"), op, TabCol::new("r", "v"));
        let mut expected = Vec::new();
        for a in &values {
            for b in &values {
                if holds(op, cmp(a, b)) {
                    expected.push(vec![a.clone(), b.clone()]);
                }
            }
        }

        let mut nlj = NestedLoopJoinExecutor::new(
            single_col("l", def.clone(), values.clone())?.boxed(),
            single_col("r", def.clone(), values.clone())?.boxed(),
            std::slice::from_ref(&cond),
        )?;
        assert_eq!(run(&mut nlj)?, expected, "nested loop join with {}", cond);

        let pool = BufferPool::with_page_size(8, def.len * 2);
        let mut bnlj = BlockNestedLoopJoinExecutor::with_budget(
            single_col("l", def.clone(), values.clone())?.boxed(),
            single_col("r", def.clone(), values.clone())?.boxed(),
            std::slice::from_ref(&cond),
            Arc::clone(&pool),
            2,
        )?;
        let mut got = run(&mut bnlj)?;
        let mut want = expected.clone();
        let key = |row: &Vec<Value>| format!("{:?}", row);
        got.sort_by_key(key);
        want.sort_by_key(key);
        assert_eq!(got, want, "block join with {}", cond);
        assert_eq!(pool.pinned_count(), 0);
    }
    Ok(())
}

#[test]
fn test_join_operators_on_ints() -> Result<(), DatabaseError> {
    let values = vec![Value::Int(-3), Value::Int(0), Value::Int(7), Value::Int(7)];
    check_join_op(ColumnDef::new("v", ColType::Int), values, |a, b| match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        _ => unreachable!(),
    })
}

#[test]
fn test_join_operators_on_floats() -> Result<(), DatabaseError> {
    let values = vec![Value::Float(-1.5), Value::Float(0.0), Value::Float(2.25), Value::Float(2.25)];
    check_join_op(ColumnDef::new("v", ColType::Float), values, |a, b| match (a, b) {
        (Value::Float(x), Value::Float(y)) => x.total_cmp(y),
        _ => unreachable!(),
    })
}

#[test]
fn test_join_operators_on_strings() -> Result<(), DatabaseError> {
    let values = vec![text("a"), text("ab"), text("b"), text("ab")];
    check_join_op(ColumnDef::text("v", 4), values, |a, b| match (a, b) {
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        _ => unreachable!(),
    })
}

#[test]
fn test_literal_conditions_at_boundaries() -> Result<(), DatabaseError> {
    let schema = TableSchema::new(
        "t",
        0,
        &[ColumnDef::new("n", ColType::BigInt), ColumnDef::text("s", 6)],
    )?;
    let record = Record::from_values(
        &schema.cols,
        schema.record_size(),
        &[Value::BigInt(100), text("mid")],
    )?;
    let n = TabCol::new("t", "n");
    let s = TabCol::new("t", "s");
    let cases = [
        (Condition::with_value(n.clone(), CompOp::Eq, Value::BigInt(100)), true),
        (Condition::with_value(n.clone(), CompOp::Lt, Value::BigInt(100)), false),
        (Condition::with_value(n.clone(), CompOp::Le, Value::BigInt(100)), true),
        (Condition::with_value(n.clone(), CompOp::Gt, Value::BigInt(99)), true),
        (Condition::with_value(n.clone(), CompOp::Ge, Value::BigInt(101)), false),
        (Condition::with_value(n.clone(), CompOp::Ne, Value::BigInt(100)), false),
        (Condition::with_value(s.clone(), CompOp::Eq, text("mid")), true),
        (Condition::with_value(s.clone(), CompOp::Gt, text("mi")), true),
        (Condition::with_value(s.clone(), CompOp::Lt, text("mida")), true),
    ];
    for (cond, expected) in cases {
        let bound = BoundCondition::bind(&cond, &schema.cols)?;
        assert_eq!(bound.eval(record.data()), expected, "{}", cond);
    }
    Ok(())
}

#[test]
fn test_conjunction_requires_every_condition() -> Result<(), DatabaseError> {
    let schema = TableSchema::new("t", 0, &[ColumnDef::new("a", ColType::Int)])?;
    let record = Record::from_values(&schema.cols, 4, &[Value::Int(5)])?;
    let a = TabCol::new("t", "a");
    let conds = bind_conditions(
        &[
            Condition::with_value(a.clone(), CompOp::Gt, Value::Int(1)),
            Condition::with_value(a.clone(), CompOp::Lt, Value::Int(5)),
        ],
        &schema.cols,
    )?;
    assert!(!eval_conditions(&conds, record.data()));
    assert!(eval_conditions(&conds[..1], record.data()));
    assert!(eval_conditions(&[], record.data()));
    Ok(())
}

#[test]
fn test_text_columns_of_different_widths() -> Result<(), DatabaseError> {
    let mut join = NestedLoopJoinExecutor::new(
        single_col("l", ColumnDef::text("v", 4), vec![text("ab"), text("zz")])?.boxed(),
        single_col("r", ColumnDef::text("v", 8), vec![text("ab"), text("abc")])?.boxed(),
        &[Condition::with_col(TabCol::new("l", "v"), CompOp::Eq, TabCol::new("r", "v"))],
    )?;
    assert_eq!(run(&mut join)?, vec![vec![text("ab"), text("ab")]]);
    Ok(())
}

#[test]
fn test_int_column_against_string_literal_is_rejected() -> Result<(), DatabaseError> {
    let cond = Condition::with_value(TabCol::new("l", "id"), CompOp::Eq, text("1"));
    let err = NestedLoopJoinExecutor::new(
        crate::common::left_rows()?.boxed(),
        crate::common::right_rows()?.boxed(),
        &[cond],
    )
    .err();
    assert!(matches!(err, Some(DatabaseError::TypeMismatch { .. })));
    Ok(())
}

#[test]
fn test_mismatched_column_types_are_rejected() -> Result<(), DatabaseError> {
    let cond = Condition::with_col(TabCol::new("l", "v"), CompOp::Lt, TabCol::new("r", "v"));
    let err = BlockNestedLoopJoinExecutor::new(
        single_col("l", ColumnDef::new("v", ColType::Int), vec![Value::Int(1)])?.boxed(),
        single_col("r", ColumnDef::new("v", ColType::Float), vec![Value::Float(1.0)])?.boxed(),
        &[cond],
        BufferPool::new(4),
    )
    .err();
    assert!(matches!(err, Some(DatabaseError::TypeMismatch { .. })));
    Ok(())
}

#[test]
fn test_unknown_columns_are_rejected() -> Result<(), DatabaseError> {
    let cond = Condition::with_value(TabCol::new("l", "missing"), CompOp::Eq, Value::Int(1));
    let err = NestedLoopJoinExecutor::new(
        crate::common::left_rows()?.boxed(),
        crate::common::right_rows()?.boxed(),
        &[cond],
    )
    .err();
    assert!(matches!(err, Some(DatabaseError::ColumnNotFound { .. })));
    Ok(())
}
