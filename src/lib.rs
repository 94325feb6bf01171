pub mod config;
pub mod executor;
pub mod storage;
pub mod txn;
pub mod types;
pub mod utils;
