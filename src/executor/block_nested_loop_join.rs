//! Block nested-loop join.
//!
//! Both inputs are copied into blocks of temporary buffer pool pages. Every
//! left block is joined against every right block, so the right child is
//! rescanned once per left block instead of once per left tuple.
//!
//! ```text
//! left block                      right block
//! +--------+--------+---+         +--------+--------+---+
//! | page 0 | page 1 |...|   x     | page 0 | page 1 |...|
//! +--------+--------+---+         +--------+--------+---+
//!   ^ left_page/left_slot           ^ right_page/right_slot
//! ```
//!
//! The four cursors are saved between calls, so each `next_tuple` resumes the
//! scan exactly where the previous match was found. At most `budget` pages are
//! pinned at any time, half for each side. An odd page goes to the left
//! block, which cuts the number of right rescans.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::{
    config::ExecutionConfig,
    executor::{
        BoxedExecutor, Executor, join_cols,
        predicate::{BoundCondition, Condition, bind_conditions, eval_conditions},
    },
    storage::{
        buffer_pool::{BufferPool, TempPage},
        schema::ColumnMeta,
    },
    types::{
        TEMP_FILE_ID,
        error::{DatabaseError, Result},
        record::Record,
    },
};

/// A run of one child's tuples packed into temporary pages.
struct Block {
    tuple_len: usize,
    per_page: usize,
    max_pages: usize,
    pages: Vec<TempPage>,
    /// Tuples held by each page, aligned with `pages`.
    counts: Vec<usize>,
    /// Pages filled by the most recent load.
    active: usize,
}

impl Block {
    fn new(tuple_len: usize, per_page: usize, max_pages: usize) -> Self {
        Self {
            tuple_len,
            per_page,
            max_pages,
            pages: Vec::with_capacity(max_pages),
            counts: Vec::with_capacity(max_pages),
            active: 0,
        }
    }

    /// Copies tuples from `child`, starting at its current position, until the
    /// child ends or the block is full. Pages are allocated on first use and
    /// reused by later loads.
    fn load(&mut self, child: &mut dyn Executor, pool: &Arc<BufferPool>) -> Result<()> {
        self.active = 0;
        while self.active < self.max_pages && !child.is_end() {
            if self.active == self.pages.len() {
                self.pages.push(pool.new_temp_page(TEMP_FILE_ID)?);
                self.counts.push(0);
            }
            let mut count = 0;
            {
                let mut data = self.pages[self.active].write();
                while count < self.per_page && !child.is_end() {
                    let Some(record) = child.next() else {
                        return Err(DatabaseError::InvalidExecutorState {
                            executor: child.executor_type().to_string(),
                            reason: "no current tuple before end of input".to_string(),
                        });
                    };
                    if record.len() != self.tuple_len {
                        return Err(DatabaseError::InvalidRecordSize {
                            expected: self.tuple_len,
                            actual: record.len(),
                        });
                    }
                    let start = count * self.tuple_len;
                    data[start..start + self.tuple_len].copy_from_slice(record.data());
                    count += 1;
                    child.next_tuple()?;
                }
            }
            self.counts[self.active] = count;
            self.active += 1;
        }
        trace!(pages = self.active, tuples = self.tuples(), "loaded block");
        Ok(())
    }

    fn tuples(&self) -> usize {
        self.counts[..self.active].iter().sum()
    }

    fn is_empty(&self) -> bool {
        self.active == 0
    }

    fn copy_tuple(&self, page: usize, slot: usize, out: &mut [u8]) {
        let start = slot * self.tuple_len;
        out.copy_from_slice(&self.pages[page].read()[start..start + self.tuple_len]);
    }

    /// Unpins every page.
    fn release(&mut self) {
        self.pages.clear();
        self.counts.clear();
        self.active = 0;
    }

    fn pinned(&self) -> usize {
        self.pages.len()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct BlockCursor {
    left_page: usize,
    left_slot: usize,
    right_page: usize,
    right_slot: usize,
}

pub struct BlockNestedLoopJoinExecutor {
    left: BoxedExecutor,
    right: BoxedExecutor,
    left_len: usize,
    len: usize,
    cols: Vec<ColumnMeta>,
    conds: Vec<BoundCondition>,
    pool: Arc<BufferPool>,
    left_block: Block,
    right_block: Block,
    cursor: BlockCursor,
    joined: Record,
    is_end: bool,
}

impl BlockNestedLoopJoinExecutor {
    /// Joins with a budget of half the pool's frames.
    pub fn new(
        left: BoxedExecutor,
        right: BoxedExecutor,
        conds: &[Condition],
        pool: Arc<BufferPool>,
    ) -> Result<Self> {
        let budget = pool.capacity() / 2;
        Self::with_budget(left, right, conds, pool, budget)
    }

    pub fn from_config(
        left: BoxedExecutor,
        right: BoxedExecutor,
        conds: &[Condition],
        pool: Arc<BufferPool>,
        config: &ExecutionConfig,
    ) -> Result<Self> {
        Self::with_budget(left, right, conds, pool, config.join_pool_pages())
    }

    /// Joins pinning at most `budget` pages, split evenly between the sides
    /// with any odd page given to the left.
    pub fn with_budget(
        left: BoxedExecutor,
        right: BoxedExecutor,
        conds: &[Condition],
        pool: Arc<BufferPool>,
        budget: usize,
    ) -> Result<Self> {
        if budget < 2 {
            return Err(DatabaseError::Config {
                details: format!("block join needs a budget of at least 2 pages, got {}", budget),
            });
        }
        let page_size = pool.page_size();
        let left_len = left.tuple_len();
        let right_len = right.tuple_len();
        for len in [left_len, right_len] {
            if len == 0 || len > page_size {
                return Err(DatabaseError::RecordTooLarge { len, page_size });
            }
        }
        let right_pages = budget / 2;
        let left_pages = budget - right_pages;
        let len = left_len + right_len;
        let cols = join_cols(left.cols(), right.cols(), left_len);
        let conds = bind_conditions(conds, &cols)?;
        debug!(
            budget,
            left_per_page = page_size / left_len,
            right_per_page = page_size / right_len,
            "block join configured"
        );
        Ok(Self {
            left,
            right,
            left_len,
            len,
            cols,
            conds,
            left_block: Block::new(left_len, page_size / left_len, left_pages),
            right_block: Block::new(right_len, page_size / right_len, right_pages),
            pool,
            cursor: BlockCursor::default(),
            joined: Record::new(len),
            is_end: true,
        })
    }

    /// Pages this join may pin at once.
    pub fn budget(&self) -> usize {
        self.left_block.max_pages + self.right_block.max_pages
    }

    /// Pages currently pinned by this join.
    pub fn pinned_pages(&self) -> usize {
        self.left_block.pinned() + self.right_block.pinned()
    }

    fn release_blocks(&mut self) {
        let pinned = self.pinned_pages();
        self.left_block.release();
        self.right_block.release();
        if pinned > 0 {
            trace!(pinned, "released join blocks");
        }
    }

    fn finish(&mut self) {
        self.is_end = true;
        self.release_blocks();
        debug!("block join exhausted");
    }

    fn start(&mut self) -> Result<()> {
        self.right.begin_tuple()?;
        self.right_block.load(self.right.as_mut(), &self.pool)?;
        self.left.begin_tuple()?;
        self.left_block.load(self.left.as_mut(), &self.pool)?;
        if self.left_block.is_empty() || self.right_block.is_empty() {
            self.finish();
            return Ok(());
        }
        self.advance()
    }

    /// Runs the block loop until a match is found or both inputs are used up.
    fn advance(&mut self) -> Result<()> {
        loop {
            if self.scan_blocks() {
                return Ok(());
            }
            if !self.right.is_end() {
                self.right_block.load(self.right.as_mut(), &self.pool)?;
                self.cursor = BlockCursor::default();
                continue;
            }
            if self.left.is_end() {
                self.finish();
                return Ok(());
            }
            self.left_block.load(self.left.as_mut(), &self.pool)?;
            self.right.begin_tuple()?;
            self.right_block.load(self.right.as_mut(), &self.pool)?;
            self.cursor = BlockCursor::default();
        }
    }

    /// Continues the nested scan of the current blocks from the saved cursor.
    /// Returns true with `joined` holding the match, or false once every pair
    /// has been tried.
    fn scan_blocks(&mut self) -> bool {
        let Self {
            left_block,
            right_block,
            cursor,
            joined,
            conds,
            left_len,
            ..
        } = self;
        let left_len = *left_len;
        let tuple_len = right_block.tuple_len;
        while cursor.left_page < left_block.active {
            while cursor.left_slot < left_block.counts[cursor.left_page] {
                left_block.copy_tuple(
                    cursor.left_page,
                    cursor.left_slot,
                    &mut joined.data_mut()[..left_len],
                );
                while cursor.right_page < right_block.active {
                    let count = right_block.counts[cursor.right_page];
                    let page = right_block.pages[cursor.right_page].read();
                    while cursor.right_slot < count {
                        let start = cursor.right_slot * tuple_len;
                        joined.data_mut()[left_len..]
                            .copy_from_slice(&page[start..start + tuple_len]);
                        cursor.right_slot += 1;
                        if eval_conditions(conds, joined.data()) {
                            return true;
                        }
                    }
                    cursor.right_page += 1;
                    cursor.right_slot = 0;
                }
                cursor.right_page = 0;
                cursor.left_slot += 1;
            }
            cursor.left_page += 1;
            cursor.left_slot = 0;
        }
        false
    }
}

impl Executor for BlockNestedLoopJoinExecutor {
    fn begin_tuple(&mut self) -> Result<()> {
        self.release_blocks();
        self.cursor = BlockCursor::default();
        self.is_end = false;
        if let Err(e) = self.start() {
            self.is_end = true;
            self.release_blocks();
            return Err(e);
        }
        Ok(())
    }

    fn next_tuple(&mut self) -> Result<()> {
        if self.is_end {
            return Ok(());
        }
        if let Err(e) = self.advance() {
            self.is_end = true;
            self.release_blocks();
            return Err(e);
        }
        Ok(())
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
        "BlockNestedLoopJoinExecutor"
    }
}
