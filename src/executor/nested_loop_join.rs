use tracing::debug;

use crate::{
    executor::{
        BoxedExecutor, Executor, join_cols,
        predicate::{BoundCondition, Condition, bind_conditions, eval_conditions},
    },
    storage::schema::ColumnMeta,
    types::{
        error::{DatabaseError, Result},
        record::Record,
    },
};

/// Tuple-at-a-time nested-loop join. The right child is rescanned once per
/// left tuple.
pub struct NestedLoopJoinExecutor {
    left: BoxedExecutor,
    right: BoxedExecutor,
    left_len: usize,
    len: usize,
    cols: Vec<ColumnMeta>,
    conds: Vec<BoundCondition>,
    joined: Record,
    is_end: bool,
}

impl NestedLoopJoinExecutor {
    pub fn new(left: BoxedExecutor, right: BoxedExecutor, conds: &[Condition]) -> Result<Self> {
        let left_len = left.tuple_len();
        let len = left_len + right.tuple_len();
        let cols = join_cols(left.cols(), right.cols(), left_len);
        let conds = bind_conditions(conds, &cols)?;
        Ok(Self {
            left,
            right,
            left_len,
            len,
            cols,
            conds,
            joined: Record::new(len),
            is_end: true,
        })
    }

    /// Writes the current left and right tuples into the joined buffer.
    fn fill_joined(&mut self) -> Result<bool> {
        let (Some(left), Some(right)) = (self.left.next(), self.right.next()) else {
            return Ok(false);
        };
        if left.len() + right.len() != self.len {
            return Err(DatabaseError::InvalidRecordSize {
                expected: self.len,
                actual: left.len() + right.len(),
            });
        }
        let data = self.joined.data_mut();
        data[..self.left_len].copy_from_slice(left.data());
        data[self.left_len..].copy_from_slice(right.data());
        Ok(true)
    }

    /// Moves to the next (left, right) pair, rewinding the right child when
    /// it runs out.
    fn step(&mut self) -> Result<()> {
        self.right.next_tuple()?;
        if !self.right.is_end() {
            return Ok(());
        }
        self.left.next_tuple()?;
        if self.left.is_end() {
            self.is_end = true;
            return Ok(());
        }
        self.right.begin_tuple()?;
        if self.right.is_end() {
            self.is_end = true;
        }
        Ok(())
    }

    /// Advances until the current pair satisfies every condition.
    fn seek(&mut self) -> Result<()> {
        while !self.is_end {
            if !self.fill_joined()? {
                self.is_end = true;
                break;
            }
            if eval_conditions(&self.conds, self.joined.data()) {
                break;
            }
            self.step()?;
        }
        Ok(())
    }
}

impl Executor for NestedLoopJoinExecutor {
    fn begin_tuple(&mut self) -> Result<()> {
        self.is_end = false;
        self.right.begin_tuple()?;
        if self.right.is_end() {
            debug!("right input empty, join produces nothing");
            self.is_end = true;
            return Ok(());
        }
        self.left.begin_tuple()?;
        if self.left.is_end() {
            self.is_end = true;
            return Ok(());
        }
        self.seek()
    }

    fn next_tuple(&mut self) -> Result<()> {
        if self.is_end {
            return Ok(());
        }
        self.step()?;
        self.seek()
    }

    fn next(&self) -> Option<&Record> {
        if self.is_end { None } else { Some(&self.joined) }
    }

    fn is_end(&self) -> bool {
        self.is_end
    }

    fn cols(&self) -> &[ColumnMeta] {
        &self.cols
    }

    fn tuple_len(&self) -> usize {
        self.len
    }

    fn executor_type(&self) -> &'static str {
        "NestedLoopJoinExecutor"
    }
}
