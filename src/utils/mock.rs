use std::path::Path;

use tempfile::TempDir;

use crate::{
    executor::Executor,
    storage::{
        schema::{ColumnDef, ColumnMeta, TableSchema},
        storage_manager::StorageManager,
    },
    types::{
        Rid,
        error::Result,
        record::Record,
        value::Value,
    },
};

/// A database in a scratch directory that is removed on drop.
pub struct TempDatabase {
    dir: TempDir,
    pub storage_manager: Option<StorageManager>,
}

impl TempDatabase {
    pub fn new() -> Result<Self> {
        Self::with_prefix("cangkul_test")
    }

    pub fn with_prefix(prefix: &str) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix(prefix).tempdir()?;
        Ok(Self {
            dir,
            storage_manager: None,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn create_storage_manager(&mut self) -> Result<&mut StorageManager> {
        let sm = StorageManager::open(self.dir.path())?;
        Ok(self.storage_manager.insert(sm))
    }

    pub fn get_storage_manager(&mut self) -> Option<&mut StorageManager> {
        self.storage_manager.as_mut()
    }
}

impl Drop for TempDatabase {
    fn drop(&mut self) {
        // close table files before the directory goes away
        self.storage_manager = None;
    }
}

/// Yields a fixed list of in-memory records. `begin_tuple` only resets a
/// cursor, so the executor can be rescanned cheaply.
pub struct ValuesExecutor {
    cols: Vec<ColumnMeta>,
    len: usize,
    rows: Vec<(Record, Option<Rid>)>,
    pos: usize,
}

impl ValuesExecutor {
    /// Encodes `rows` against a schema built from `defs`.
    pub fn new(table: &str, defs: &[ColumnDef], rows: Vec<Vec<Value>>) -> Result<Self> {
        let schema = TableSchema::new(table, 0, defs)?;
        let len = schema.record_size();
        let rows = rows
            .into_iter()
            .map(|values| -> Result<(Record, Option<Rid>)> {
                Ok((Record::from_values(&schema.cols, len, &values)?, None))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            cols: schema.cols,
            len,
            rows,
            pos: 0,
        })
    }

    /// Attaches a rid to each row, in order.
    pub fn with_rids(mut self, rids: &[Rid]) -> Self {
        for ((_, slot), rid) in self.rows.iter_mut().zip(rids) {
            *slot = Some(*rid);
        }
        self
    }

    pub fn boxed(self) -> Box<dyn Executor> {
        Box::new(self)
    }
}

impl Executor for ValuesExecutor {
    fn begin_tuple(&mut self) -> Result<()> {
        self.pos = 0;
        Ok(())
    }

    fn next_tuple(&mut self) -> Result<()> {
        if self.pos < self.rows.len() {
            self.pos += 1;
        }
        Ok(())
    }

    fn next(&self) -> Option<&Record> {
        self.rows.get(self.pos).map(|(record, _)| record)
    }

    fn is_end(&self) -> bool {
        self.pos >= self.rows.len()
    }

    fn cols(&self) -> &[ColumnMeta] {
        &self.cols
    }

    fn tuple_len(&self) -> usize {
        self.len
    }

    fn rid(&self) -> Option<Rid> {
        self.rows.get(self.pos).and_then(|(_, rid)| *rid)
    }

    fn executor_type(&self) -> &'static str {
        "ValuesExecutor"
    }
}

/// Decodes every column of `record`.
pub fn decode_record(cols: &[ColumnMeta], record: &Record) -> Result<Vec<Value>> {
    cols.iter()
        .map(|col| Value::from_raw(record.column(col), col.col_type))
        .collect()
}
