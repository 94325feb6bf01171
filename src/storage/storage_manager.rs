use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::info;

use crate::{
    storage::{
        CATALOG_FILE_NAME,
        schema::{Catalog, ColumnDef, TableSchema},
        table_file::TableFile,
    },
    types::{
        Rid,
        error::{DatabaseError, Result},
        record::Record,
        value::Value,
    },
};

/// A database directory: one catalog snapshot plus one file per table.
pub struct StorageManager {
    dir: PathBuf,
    catalog: Catalog,
    files: HashMap<String, Arc<TableFile>>,
}

impl StorageManager {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let catalog_path = dir.join(CATALOG_FILE_NAME);
        let catalog = if catalog_path.exists() {
            info!("Opening existing database at path: {}", dir.display());
            Catalog::load(&catalog_path)?
        } else {
            info!("Creating new database at path: {}", dir.display());
            Catalog::new()
        };
        let mut files = HashMap::new();
        for name in catalog.table_names() {
            let schema = catalog.get_table(name)?;
            let file = TableFile::open(Self::table_path(dir, name), schema.fd)?;
            if file.record_size() != schema.record_size() {
                return Err(DatabaseError::InvalidHeader {
                    reason: format!(
                        "table '{}' file holds {} byte records, catalog says {}",
                        name,
                        file.record_size(),
                        schema.record_size()
                    ),
                });
            }
            files.insert(name.to_string(), Arc::new(file));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            catalog,
            files,
        })
    }

    fn table_path(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{}.tbl", name))
    }

    fn save_catalog(&self) -> Result<()> {
        self.catalog.save(&self.dir.join(CATALOG_FILE_NAME))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn get_table(&self, name: &str) -> Result<&TableSchema> {
        self.catalog.get_table(name)
    }

    pub fn create_table(&mut self, name: &str, defs: &[ColumnDef]) -> Result<&TableSchema> {
        let (fd, record_size) = {
            let schema = self.catalog.create_table(name, defs)?;
            (schema.fd, schema.record_size())
        };
        let file = match TableFile::create(Self::table_path(&self.dir, name), fd, record_size) {
            Ok(file) => file,
            Err(e) => {
                self.catalog.drop_table(name)?;
                return Err(e);
            }
        };
        self.files.insert(name.to_string(), Arc::new(file));
        self.save_catalog()?;
        info!(table = name, fd, record_size, "created table");
        self.catalog.get_table(name)
    }

    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        self.catalog.drop_table(name)?;
        if let Some(file) = self.files.remove(name) {
            fs::remove_file(file.path())?;
        }
        self.save_catalog()
    }

    /// Storage handle of a table, shared with the executors that use it.
    pub fn table_file(&self, name: &str) -> Result<Arc<TableFile>> {
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| DatabaseError::TableNotFound {
                name: name.to_string(),
            })
    }

    /// Encodes one value per column, in schema order, and appends the record.
    pub fn insert_record(&self, table: &str, values: &[Value]) -> Result<Rid> {
        let schema = self.catalog.get_table(table)?;
        let record = Record::from_values(&schema.cols, schema.record_size(), values)?;
        self.table_file(table)?.insert_record(record.data())
    }
}
