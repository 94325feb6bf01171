pub mod buffer_pool;
pub mod header;
pub mod schema;
pub mod storage_manager;
pub mod table_file;

const TABLE_HEADER_SIZE: usize = 100;
const TABLE_MAGIC: &[u8; 16] = b"CANGKUL TBL v1\0\0";
const CATALOG_FILE_NAME: &str = "catalog.meta";
