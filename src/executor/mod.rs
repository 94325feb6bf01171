//! Pull-based executors.
//!
//! Every operator implements [`Executor`]. A driver calls `begin_tuple` once,
//! then alternates `next` (peek at the current tuple) and `next_tuple`
//! (advance) until `is_end` reports exhaustion. `next` never mutates, so it
//! may be called any number of times per position.

pub mod block_nested_loop_join;
pub mod nested_loop_join;
pub mod predicate;
pub mod sequential_scan;
pub mod sort;
pub mod update;

use crate::{
    storage::schema::{ColumnMeta, TabCol},
    types::{
        Rid,
        error::{DatabaseError, Result},
        record::Record,
    },
};

pub use block_nested_loop_join::BlockNestedLoopJoinExecutor;
pub use nested_loop_join::NestedLoopJoinExecutor;
pub use predicate::{CompOp, CondRhs, Condition};
pub use sequential_scan::SeqScanExecutor;
pub use sort::{OrderBy, SortExecutor};
pub use update::{SetClause, UpdateExecutor};

pub trait Executor {
    /// Positions on the first qualifying tuple, or on the end state if there
    /// is none. May do arbitrarily expensive work.
    fn begin_tuple(&mut self) -> Result<()>;

    /// Advances to the next qualifying tuple, or to the end state.
    fn next_tuple(&mut self) -> Result<()>;

    /// The tuple at the current position; `None` once the executor has ended.
    fn next(&self) -> Option<&Record>;

    fn is_end(&self) -> bool;

    /// Output schema.
    fn cols(&self) -> &[ColumnMeta];

    /// Byte length of every output tuple.
    fn tuple_len(&self) -> usize;

    /// Storage location of the current tuple, when it has one.
    fn rid(&self) -> Option<Rid> {
        None
    }

    fn executor_type(&self) -> &'static str;

    fn get_col_offset(&self, target: &TabCol) -> Result<&ColumnMeta> {
        get_col(self.cols(), target)
    }
}

pub type BoxedExecutor = Box<dyn Executor>;

/// Looks a column up by table and name.
pub fn get_col<'a>(cols: &'a [ColumnMeta], target: &TabCol) -> Result<&'a ColumnMeta> {
    cols.iter()
        .find(|col| col.matches(target))
        .ok_or_else(|| DatabaseError::ColumnNotFound {
            name: target.col_name.clone(),
            table: target.tab_name.clone(),
        })
}

/// Schema of a join: left columns, then right columns shifted past the left tuple.
pub fn join_cols(left: &[ColumnMeta], right: &[ColumnMeta], left_len: usize) -> Vec<ColumnMeta> {
    let mut cols = left.to_vec();
    cols.extend(right.iter().cloned().map(|mut col| {
        col.offset += left_len;
        col
    }));
    cols
}

/// Drives an executor to completion through the standard `Iterator` interface.
pub struct ExecutorIter<'a> {
    executor: &'a mut dyn Executor,
    started: bool,
    failed: bool,
}

impl<'a> ExecutorIter<'a> {
    pub fn new(executor: &'a mut dyn Executor) -> Self {
        Self {
            executor,
            started: false,
            failed: false,
        }
    }
}

impl Iterator for ExecutorIter<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let step = if self.started {
            self.executor.next_tuple()
        } else {
            self.started = true;
            self.executor.begin_tuple()
        };
        if let Err(e) = step {
            self.failed = true;
            return Some(Err(e));
        }
        if self.executor.is_end() {
            return None;
        }
        self.executor.next().cloned().map(Ok)
    }
}

/// Runs `executor` from the start and collects every output tuple.
pub fn collect_records(executor: &mut dyn Executor) -> Result<Vec<Record>> {
    ExecutorIter::new(executor).collect()
}
