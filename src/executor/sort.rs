//! In-memory sort.
//!
//! `begin_tuple` drains the child completely before the first tuple is
//! available, so the whole input is held in memory and the first row is only
//! as fast as the last row of the child.

use std::cmp::Ordering;

use tracing::debug;

use crate::{
    executor::{BoxedExecutor, Executor, get_col},
    storage::schema::{ColumnMeta, TabCol},
    types::{Rid, error::Result, record::Record, compare::compare},
};

/// One ORDER BY term as the planner writes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub col: TabCol,
    pub desc: bool,
}

impl OrderBy {
    pub fn asc(col: TabCol) -> Self {
        Self { col, desc: false }
    }

    pub fn desc(col: TabCol) -> Self {
        Self { col, desc: true }
    }
}

/// An ORDER BY term resolved to a byte range of the child's tuples.
#[derive(Debug, Clone)]
pub struct SortKey {
    pub col: ColumnMeta,
    pub desc: bool,
}

impl SortKey {
    pub fn new(col: ColumnMeta, desc: bool) -> Self {
        Self { col, desc }
    }
}

/// Orders two tuples by `keys`, earlier keys taking priority.
pub fn compare_records(keys: &[SortKey], a: &[u8], b: &[u8]) -> Ordering {
    for key in keys {
        let range = key.col.offset..key.col.offset + key.col.len;
        let ord = compare(&a[range.clone()], &b[range], key.col.col_type, key.col.len);
        if ord != Ordering::Equal {
            return if key.desc { ord.reverse() } else { ord };
        }
    }
    Ordering::Equal
}

pub struct SortExecutor {
    prev: BoxedExecutor,
    keys: Vec<SortKey>,
    limit: Option<usize>,
    tuples: Vec<(Record, Option<Rid>)>,
    pos: usize,
}

impl SortExecutor {
    /// `limit` of `None` or `Some(0)` keeps every row.
    pub fn new(prev: BoxedExecutor, order_by: &[OrderBy], limit: Option<usize>) -> Result<Self> {
        let keys = order_by
            .iter()
            .map(|term| -> Result<SortKey> {
                Ok(SortKey::new(get_col(prev.cols(), &term.col)?.clone(), term.desc))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            prev,
            keys,
            limit: limit.filter(|n| *n > 0),
            tuples: Vec::new(),
            pos: 0,
        })
    }
}

impl Executor for SortExecutor {
    fn begin_tuple(&mut self) -> Result<()> {
        self.tuples.clear();
        self.pos = 0;
        self.prev.begin_tuple()?;
        while !self.prev.is_end() {
            if let Some(record) = self.prev.next() {
                self.tuples.push((record.clone(), self.prev.rid()));
            }
            self.prev.next_tuple()?;
        }
        let keys = &self.keys;
        self.tuples
            .sort_unstable_by(|(a, _), (b, _)| compare_records(keys, a.data(), b.data()));
        let total = self.tuples.len();
        if let Some(limit) = self.limit {
            self.tuples.truncate(limit);
        }
        debug!(total, output = self.tuples.len(), keys = self.keys.len(), "sorted child output");
        Ok(())
    }

    fn next_tuple(&mut self) -> Result<()> {
        if self.pos < self.tuples.len() {
            self.pos += 1;
        }
        Ok(())
    }

    fn next(&self) -> Option<&Record> {
        self.tuples.get(self.pos).map(|(record, _)| record)
    }

    fn is_end(&self) -> bool {
        self.pos >= self.tuples.len()
    }

    fn cols(&self) -> &[ColumnMeta] {
        self.prev.cols()
    }

    fn tuple_len(&self) -> usize {
        self.prev.tuple_len()
    }

    fn rid(&self) -> Option<Rid> {
        self.tuples.get(self.pos).and_then(|(_, rid)| *rid)
    }

    fn executor_type(&self) -> &'static str {
        "SortExecutor"
    }
}
