use std::sync::Arc;

use tracing::debug;

use crate::{
    executor::Executor,
    storage::{
        schema::{ColumnMeta, TabCol, TableSchema},
        storage_manager::StorageManager,
        table_file::TableFile,
    },
    types::{
        Rid,
        error::{DatabaseError, Result},
        record::Record,
        value::Value,
    },
    txn::Context,
};

/// `lhs = rhs` in an UPDATE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SetClause {
    pub lhs: TabCol,
    pub rhs: Value,
    /// Encoded form of `rhs`, when the planner has already produced it.
    pub raw: Option<Vec<u8>>,
}

impl SetClause {
    pub fn new(lhs: TabCol, rhs: Value) -> Self {
        Self { lhs, rhs, raw: None }
    }

    pub fn with_raw(lhs: TabCol, rhs: Value, raw: Vec<u8>) -> Self {
        Self {
            lhs,
            rhs,
            raw: Some(raw),
        }
    }
}

/// Overwrites columns of already selected rows in place. Produces no tuples.
pub struct UpdateExecutor {
    schema: TableSchema,
    file: Arc<TableFile>,
    set_clauses: Vec<SetClause>,
    rids: Vec<Rid>,
    context: Context,
    updated: usize,
    done: bool,
}

impl UpdateExecutor {
    pub fn new(
        storage_manager: &StorageManager,
        table_name: &str,
        set_clauses: Vec<SetClause>,
        rids: Vec<Rid>,
        context: Context,
    ) -> Result<Self> {
        let schema = storage_manager.get_table(table_name)?.clone();
        let file = storage_manager.table_file(table_name)?;
        Ok(Self {
            schema,
            file,
            set_clauses,
            rids,
            context,
            updated: 0,
            done: false,
        })
    }

    /// Rows written by the last run.
    pub fn updated(&self) -> usize {
        self.updated
    }

    /// Resolves every clause to a column and the bytes to store in it.
    fn resolve(&self) -> Result<Vec<(ColumnMeta, Vec<u8>)>> {
        self.set_clauses
            .iter()
            .map(|clause| -> Result<(ColumnMeta, Vec<u8>)> {
                if !clause.lhs.tab_name.is_empty() && clause.lhs.tab_name != self.schema.name {
                    return Err(DatabaseError::ColumnNotFound {
                        name: clause.lhs.col_name.clone(),
                        table: clause.lhs.tab_name.clone(),
                    });
                }
                let col = self.schema.get_col(&clause.lhs.col_name)?;
                let promoted = clause.rhs.col_type() != col.col_type;
                let value = clause.rhs.clone().coerce_to(col.col_type)?;
                let raw = match &clause.raw {
                    Some(raw) if !promoted => {
                        if raw.len() != col.len {
                            return Err(DatabaseError::InvalidRecordSize {
                                expected: col.len,
                                actual: raw.len(),
                            });
                        }
                        raw.clone()
                    }
                    _ => value.to_raw(col.len)?,
                };
                Ok((col.clone(), raw))
            })
            .collect()
    }

    /// Applies the update and returns the number of rows written. Every clause
    /// is checked before the first row is touched.
    pub fn execute(&mut self) -> Result<usize> {
        self.context
            .lock_mgr
            .lock_exclusive_on_table(&self.context.txn, self.file.fd())?;
        let assignments = self.resolve()?;
        self.updated = 0;
        for rid in &self.rids {
            let mut record: Record = self.file.get_record(*rid)?;
            for (col, raw) in &assignments {
                record.set_column(col, raw)?;
            }
            self.file.update_record(*rid, record.data())?;
            self.updated += 1;
        }
        debug!(
            table = %self.schema.name,
            txn_id = self.context.txn.id(),
            rows = self.updated,
            "update applied"
        );
        Ok(self.updated)
    }
}

impl Executor for UpdateExecutor {
    fn begin_tuple(&mut self) -> Result<()> {
        if !self.done {
            self.done = true;
            self.execute()?;
        }
        Ok(())
    }

    fn next_tuple(&mut self) -> Result<()> {
        Ok(())
    }

    fn next(&self) -> Option<&Record> {
        None
    }

    fn is_end(&self) -> bool {
        true
    }

    fn cols(&self) -> &[ColumnMeta] {
        &self.schema.cols
    }

    fn tuple_len(&self) -> usize {
        self.schema.record_size()
    }

    fn executor_type(&self) -> &'static str {
        "UpdateExecutor"
    }
}
