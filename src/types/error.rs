use thiserror::Error;

use crate::types::{FileId, PageId, Rid, TransactionId};

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Incompatible types: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Unexpected comparison operator code {code}")]
    UnknownOperator { code: u8 },

    #[error("Transaction {txn_id} aborted: {reason}")]
    TransactionAborted { txn_id: TransactionId, reason: String },

    #[error("Buffer pool exhausted: all {capacity} frames are pinned")]
    BufferPoolExhausted { capacity: usize },

    #[error("File id {fd} is not the temporary page sentinel")]
    InvalidTempFile { fd: FileId },

    #[error("Table '{name}' not found")]
    TableNotFound { name: String },

    #[error("Table '{name}' already exists")]
    TableExists { name: String },

    #[error("Column '{name}' not found in table '{table}'")]
    ColumnNotFound { name: String, table: String },

    #[error("Column '{name}' defined more than once in table '{table}'")]
    DuplicateColumn { name: String, table: String },

    #[error("Record {rid} not found")]
    RecordNotFound { rid: Rid },

    #[error("Invalid record size: expected {expected} bytes, got {actual} bytes")]
    InvalidRecordSize { expected: usize, actual: usize },

    #[error("Expected {expected} values, got {actual}")]
    InvalidValueCount { expected: usize, actual: usize },

    #[error("Record of {len} bytes does not fit in a {page_size} byte page")]
    RecordTooLarge { len: usize, page_size: usize },

    #[error("String of {len} bytes overflows column of {max} bytes")]
    StringOverflow { len: usize, max: usize },

    #[error("Corrupted page: page_id={page_id}, reason={reason}")]
    CorruptedPage { page_id: PageId, reason: String },

    #[error("Invalid file header: {reason}")]
    InvalidHeader { reason: String },

    #[error("{executor} is in an invalid state: {reason}")]
    InvalidExecutorState { executor: String, reason: String },

    #[error("Configuration error: {details}")]
    Config { details: String },

    #[error("Serialization/deserialization error: {details}")]
    Serialization { details: String },
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
