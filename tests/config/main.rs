use cangkul::{
    config::ExecutionConfig,
    storage::buffer_pool::BufferPool,
    types::{BUFFER_POOL_SIZE, PAGE_SIZE, error::DatabaseError},
};
use tempfile::tempdir;

#[test]
fn test_defaults_follow_engine_constants() -> Result<(), DatabaseError> {
    let config = ExecutionConfig::default();
    assert_eq!(config.buffer_pool_size, BUFFER_POOL_SIZE);
    assert_eq!(config.page_size, PAGE_SIZE);
    assert_eq!(config.join_pool_pages(), BUFFER_POOL_SIZE / 2);
    config.validate()?;
    Ok(())
}

#[test]
fn test_partial_toml_keeps_defaults() -> Result<(), DatabaseError> {
    let config = ExecutionConfig::from_toml_str("buffer_pool_size = 16\njoin_pool_pages = 4\n")?;
    assert_eq!(config.buffer_pool_size, 16);
    assert_eq!(config.page_size, PAGE_SIZE);
    assert_eq!(config.join_pool_pages(), 4);

    let pool = BufferPool::from_config(&config);
    assert_eq!(pool.capacity(), 16);
    assert_eq!(pool.page_size(), PAGE_SIZE);
    Ok(())
}

#[test]
fn test_invalid_configs_are_rejected() {
    for contents in [
        "buffer_pool_size = 0",
        "page_size = 0",
        "buffer_pool_size = 8\njoin_pool_pages = 9",
        "join_pool_pages = 1",
        "buffer_pool_size = \"many\"",
    ] {
        assert!(
            matches!(
                ExecutionConfig::from_toml_str(contents),
                Err(DatabaseError::Config { .. })
            ),
            "accepted {:?}",
            contents
        );
    }
}

#[test]
fn test_load_from_file() -> Result<(), DatabaseError> {
    let dir = tempdir()?;
    let missing = ExecutionConfig::load_from_file(&dir.path().join("absent.toml"))?;
    assert_eq!(missing, ExecutionConfig::default());

    let path = dir.path().join("cangkul.toml");
    std::fs::write(&path, "page_size = 512\n")?;
    let config = ExecutionConfig::load_from_file(&path)?;
    assert_eq!(config.page_size, 512);
    Ok(())
}
