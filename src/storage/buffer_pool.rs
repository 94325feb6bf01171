//! Bounded pool of page frames.
//!
//! Executors borrow temporary pages from the pool for spill space. Every page
//! handed out is pinned; pins are dropped through [`TempPage`], which unpins
//! on drop, so a page cannot leak on an early return or an error path.

use std::{collections::HashMap, sync::Arc};

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::trace;

use crate::{
    config::ExecutionConfig,
    types::{
        FileId, PAGE_SIZE, PageId, PageNo, TEMP_FILE_ID,
        error::{DatabaseError, Result},
    },
};

type FrameId = usize;
type PageBuf = Arc<RwLock<Box<[u8]>>>;

struct Frame {
    page_id: Option<PageId>,
    pin_count: u32,
    data: PageBuf,
}

struct PoolState {
    frames: Vec<Frame>,
    free_list: Vec<FrameId>,
    page_table: HashMap<PageId, FrameId>,
    next_temp_page_no: PageNo,
    pinned: usize,
    peak_pinned: usize,
}

pub struct BufferPool {
    capacity: usize,
    page_size: usize,
    state: Mutex<PoolState>,
}

impl BufferPool {
    pub fn new(capacity: usize) -> Arc<Self> {
        Self::with_page_size(capacity, PAGE_SIZE)
    }

    /// A pool whose frames hold `page_size` bytes instead of `PAGE_SIZE`.
    pub fn with_page_size(capacity: usize, page_size: usize) -> Arc<Self> {
        let frames = (0..capacity)
            .map(|_| Frame {
                page_id: None,
                pin_count: 0,
                data: Arc::new(RwLock::new(vec![0u8; page_size].into_boxed_slice())),
            })
            .collect();
        // pop() hands out frame 0 first
        let free_list = (0..capacity).rev().collect();
        Arc::new(Self {
            capacity,
            page_size,
            state: Mutex::new(PoolState {
                frames,
                free_list,
                page_table: HashMap::new(),
                next_temp_page_no: 0,
                pinned: 0,
                peak_pinned: 0,
            }),
        })
    }

    pub fn from_config(config: &ExecutionConfig) -> Arc<Self> {
        Self::with_page_size(config.buffer_pool_size, config.page_size)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of frames currently pinned.
    pub fn pinned_count(&self) -> usize {
        self.state.lock().pinned
    }

    /// Highest pinned count observed since creation or the last `reset_peak`.
    pub fn peak_pinned(&self) -> usize {
        self.state.lock().peak_pinned
    }

    pub fn reset_peak(&self) {
        let mut state = self.state.lock();
        state.peak_pinned = state.pinned;
    }

    pub fn free_frames(&self) -> usize {
        self.state.lock().free_list.len()
    }

    /// Allocates a zeroed, pinned temporary page under the `fd` sentinel.
    pub fn new_temp_page(self: &Arc<Self>, fd: FileId) -> Result<TempPage> {
        if fd != TEMP_FILE_ID {
            return Err(DatabaseError::InvalidTempFile { fd });
        }
        let mut state = self.state.lock();
        let frame_id = state.free_list.pop().ok_or(DatabaseError::BufferPoolExhausted {
            capacity: self.capacity,
        })?;
        let page_id = PageId::new(fd, state.next_temp_page_no);
        state.next_temp_page_no += 1;

        let frame = &mut state.frames[frame_id];
        frame.page_id = Some(page_id);
        frame.pin_count = 1;
        frame.data.write().fill(0);
        let data = Arc::clone(&frame.data);

        state.page_table.insert(page_id, frame_id);
        state.pinned += 1;
        state.peak_pinned = state.peak_pinned.max(state.pinned);
        trace!(%page_id, frame_id, pinned = state.pinned, "allocated temp page");

        Ok(TempPage {
            pool: Arc::clone(self),
            page_id,
            data,
        })
    }

    /// Drops one pin on a temporary page. Temporary pages have no backing
    /// file, so a page whose pin count reaches zero is discarded and its frame
    /// returns to the free list. Returns false if the page is not resident or
    /// not pinned.
    pub fn unpin_temp_page(&self, page_id: PageId) -> bool {
        let mut state = self.state.lock();
        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return false;
        };
        let frame = &mut state.frames[frame_id];
        if frame.pin_count == 0 {
            return false;
        }
        frame.pin_count -= 1;
        if frame.pin_count == 0 {
            frame.page_id = None;
            state.page_table.remove(&page_id);
            state.free_list.push(frame_id);
            state.pinned -= 1;
            trace!(%page_id, frame_id, pinned = state.pinned, "released temp page");
        }
        true
    }
}

/// A pinned temporary page. Unpins itself when dropped.
pub struct TempPage {
    pool: Arc<BufferPool>,
    page_id: PageId,
    data: PageBuf,
}

impl TempPage {
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Box<[u8]>> {
        self.data.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Box<[u8]>> {
        self.data.write()
    }
}

impl Drop for TempPage {
    fn drop(&mut self) {
        self.pool.unpin_temp_page(self.page_id);
    }
}
