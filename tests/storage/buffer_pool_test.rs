use cangkul::{
    storage::buffer_pool::BufferPool,
    types::{TEMP_FILE_ID, error::DatabaseError},
};

#[test]
fn test_temp_pages_are_pinned_and_zeroed() -> Result<(), DatabaseError> {
    let pool = BufferPool::with_page_size(4, 64);
    let page = pool.new_temp_page(TEMP_FILE_ID)?;
    assert_eq!(page.page_id().fd, TEMP_FILE_ID);
    assert_eq!(page.read().len(), 64);
    assert!(page.read().iter().all(|b| *b == 0));
    assert_eq!(pool.pinned_count(), 1);
    assert_eq!(pool.free_frames(), 3);
    Ok(())
}

#[test]
fn test_dropping_page_unpins_it() -> Result<(), DatabaseError> {
    let pool = BufferPool::with_page_size(2, 32);
    {
        let a = pool.new_temp_page(TEMP_FILE_ID)?;
        let b = pool.new_temp_page(TEMP_FILE_ID)?;
        assert_ne!(a.page_id(), b.page_id());
        assert_eq!(pool.pinned_count(), 2);
    }
    assert_eq!(pool.pinned_count(), 0);
    assert_eq!(pool.peak_pinned(), 2);
    pool.reset_peak();
    assert_eq!(pool.peak_pinned(), 0);
    Ok(())
}

#[test]
fn test_reused_frames_are_zeroed() -> Result<(), DatabaseError> {
    let pool = BufferPool::with_page_size(1, 16);
    {
        let page = pool.new_temp_page(TEMP_FILE_ID)?;
        page.write().fill(0xab);
    }
    let page = pool.new_temp_page(TEMP_FILE_ID)?;
    assert!(page.read().iter().all(|b| *b == 0));
    Ok(())
}

#[test]
fn test_exhausted_pool_errors() -> Result<(), DatabaseError> {
    let pool = BufferPool::with_page_size(1, 16);
    let _held = pool.new_temp_page(TEMP_FILE_ID)?;
    let err = pool.new_temp_page(TEMP_FILE_ID).err();
    assert!(matches!(err, Some(DatabaseError::BufferPoolExhausted { capacity: 1 })));
    Ok(())
}

#[test]
fn test_temp_pages_require_sentinel_fd() {
    let pool = BufferPool::new(2);
    let err = pool.new_temp_page(0).err();
    assert!(matches!(err, Some(DatabaseError::InvalidTempFile { fd: 0 })));
    assert_eq!(pool.pinned_count(), 0);
}

#[test]
fn test_unpin_unknown_page_is_rejected() -> Result<(), DatabaseError> {
    let pool = BufferPool::with_page_size(2, 16);
    let page = pool.new_temp_page(TEMP_FILE_ID)?;
    let page_id = page.page_id();
    drop(page);
    assert!(!pool.unpin_temp_page(page_id));
    Ok(())
}
