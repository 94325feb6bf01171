use std::sync::Arc;

use tracing::debug;

use crate::{
    executor::{
        Executor,
        predicate::{BoundCondition, Condition, bind_conditions, eval_conditions},
    },
    storage::{schema::ColumnMeta, storage_manager::StorageManager, table_file::TableFile},
    types::{Rid, error::Result, record::Record},
    txn::Context,
};

/// Scans a table file in rid order, yielding the records that satisfy every
/// condition.
pub struct SeqScanExecutor {
    table_name: String,
    file: Arc<TableFile>,
    cols: Vec<ColumnMeta>,
    len: usize,
    conds: Vec<BoundCondition>,
    context: Option<Context>,
    rid: Option<Rid>,
    current: Option<Record>,
}

impl SeqScanExecutor {
    pub fn new(
        storage_manager: &StorageManager,
        table_name: &str,
        conds: &[Condition],
        context: Option<Context>,
    ) -> Result<Self> {
        let schema = storage_manager.get_table(table_name)?;
        let file = storage_manager.table_file(table_name)?;
        let conds = bind_conditions(conds, &schema.cols)?;
        Ok(Self {
            table_name: table_name.to_string(),
            file,
            cols: schema.cols.clone(),
            len: schema.record_size(),
            conds,
            context,
            rid: None,
            current: None,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Moves to the first qualifying record strictly after `after`.
    fn seek_from(&mut self, mut after: Option<Rid>) -> Result<()> {
        while let Some(rid) = self.file.next_rid(after)? {
            let record = self.file.get_record(rid)?;
            if eval_conditions(&self.conds, record.data()) {
                self.rid = Some(rid);
                self.current = Some(record);
                return Ok(());
            }
            after = Some(rid);
        }
        self.rid = None;
        self.current = None;
        Ok(())
    }
}

impl Executor for SeqScanExecutor {
    fn begin_tuple(&mut self) -> Result<()> {
        if let Some(ctx) = &self.context {
            ctx.lock_mgr.lock_shared_on_table(&ctx.txn, self.file.fd())?;
        }
        debug!(table = %self.table_name, conds = self.conds.len(), "starting sequential scan");
        self.seek_from(None)
    }

    fn next_tuple(&mut self) -> Result<()> {
        match self.rid {
            Some(rid) => self.seek_from(Some(rid)),
            None => Ok(()),
        }
    }

    fn next(&self) -> Option<&Record> {
        self.current.as_ref()
    }

    fn is_end(&self) -> bool {
        self.current.is_none()
    }

    fn cols(&self) -> &[ColumnMeta] {
        &self.cols
    }

    fn tuple_len(&self) -> usize {
        self.len
    }

    fn rid(&self) -> Option<Rid> {
        self.rid
    }

    fn executor_type(&self) -> &'static str {
        "SeqScanExecutor"
    }
}
