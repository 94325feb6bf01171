//! Property-based tests for the join and sort executors.

use std::{cmp::Ordering, sync::Arc};

use proptest::prelude::*;

use cangkul::{
    executor::{
        BlockNestedLoopJoinExecutor, CompOp, Condition, Executor, NestedLoopJoinExecutor,
        OrderBy, SortExecutor, collect_records,
    },
    storage::{buffer_pool::BufferPool, schema::TabCol},
    types::{error::DatabaseError, value::Value},
    utils::mock::decode_record,
};

use crate::common::{int_pairs, run_sorted};

/// Strategy for (k, v) rows with a small key domain so joins find matches.
fn arb_rows() -> impl Strategy<Value = Vec<(i32, i32)>> {
    prop::collection::vec((0i32..6, any::<i32>()), 0..24)
}

fn arb_op() -> impl Strategy<Value = CompOp> {
    (0u8..6).prop_map(|code| CompOp::from_code(code).expect("codes 0..6 are valid"))
}

struct JoinOutcome {
    nested: Vec<Vec<u8>>,
    blocked: Vec<Vec<u8>>,
    peak_pinned: usize,
    pinned_after: usize,
}

fn join_both(
    left: &[(i32, i32)],
    right: &[(i32, i32)],
    op: CompOp,
    per_page: usize,
    budget: usize,
) -> Result<JoinOutcome, DatabaseError> {
    let cond = Condition::with_col(TabCol::new("a", "k"), op, TabCol::new("b", "k"));
    let mut nested = NestedLoopJoinExecutor::new(
        int_pairs("a", left)?.boxed(),
        int_pairs("b", right)?.boxed(),
        std::slice::from_ref(&cond),
    )?;
    let pool = BufferPool::with_page_size(budget, 8 * per_page);
    let mut blocked = BlockNestedLoopJoinExecutor::with_budget(
        int_pairs("a", left)?.boxed(),
        int_pairs("b", right)?.boxed(),
        std::slice::from_ref(&cond),
        Arc::clone(&pool),
        budget,
    )?;
    Ok(JoinOutcome {
        nested: run_sorted(&mut nested)?,
        blocked: run_sorted(&mut blocked)?,
        peak_pinned: pool.peak_pinned(),
        pinned_after: pool.pinned_count(),
    })
}

fn sorted_keys(
    rows: &[(i32, i32)],
    desc: bool,
    limit: Option<usize>,
) -> Result<Vec<(i32, i32)>, DatabaseError> {
    let order = OrderBy {
        col: TabCol::new("s", "k"),
        desc,
    };
    let tie_break = OrderBy::asc(TabCol::new("s", "v"));
    let mut sort = SortExecutor::new(int_pairs("s", rows)?.boxed(), &[order, tie_break], limit)?;
    let records = collect_records(&mut sort)?;
    let cols = sort.cols().to_vec();
    records
        .iter()
        .map(|record| match decode_record(&cols, record)?.as_slice() {
            [Value::Int(k), Value::Int(v)] => Ok((*k, *v)),
            other => Err(DatabaseError::Serialization {
                details: format!("unexpected row {:?}", other),
            }),
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn block_join_matches_nested_loop(
        left in arb_rows(),
        right in arb_rows(),
        op in arb_op(),
        per_page in 1usize..4,
        budget in 2usize..7,
    ) {
        let outcome = join_both(&left, &right, op, per_page, budget).expect("join should succeed");
        prop_assert_eq!(outcome.nested, outcome.blocked);
        prop_assert!(outcome.peak_pinned <= budget);
        prop_assert_eq!(outcome.pinned_after, 0);
    }

    #[test]
    fn sort_orders_and_truncates(
        rows in arb_rows(),
        desc in any::<bool>(),
        limit in prop::option::of(0usize..30),
    ) {
        let output = sorted_keys(&rows, desc, limit).expect("sort should succeed");

        let expected_len = match limit {
            Some(n) if n > 0 => n.min(rows.len()),
            _ => rows.len(),
        };
        prop_assert_eq!(output.len(), expected_len);

        for pair in output.windows(2) {
            let ord = pair[0].0.cmp(&pair[1].0);
            let ord = if desc { ord.reverse() } else { ord };
            prop_assert!(ord != Ordering::Greater);
            if ord == Ordering::Equal {
                prop_assert!(pair[0].1 <= pair[1].1);
            }
        }

        let mut expected = rows.clone();
        expected.sort_by(|a, b| {
            let ord = a.0.cmp(&b.0);
            let ord = if desc { ord.reverse() } else { ord };
            ord.then(a.1.cmp(&b.1))
        });
        expected.truncate(expected_len);
        prop_assert_eq!(output, expected);
    }
}
