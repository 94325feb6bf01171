use std::{collections::HashMap, fmt, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::types::{
    FileId,
    error::{DatabaseError, Result},
    value::ColType,
};

/// Qualified column reference as written by the planner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TabCol {
    pub tab_name: String,
    pub col_name: String,
}

impl TabCol {
    pub fn new(tab_name: impl Into<String>, col_name: impl Into<String>) -> Self {
        Self {
            tab_name: tab_name.into(),
            col_name: col_name.into(),
        }
    }
}

impl fmt::Display for TabCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.tab_name, self.col_name)
    }
}

/// Where a column lives inside a fixed-length record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub tab_name: String,
    pub name: String,
    pub col_type: ColType,
    pub len: usize,
    pub offset: usize,
}

impl ColumnMeta {
    pub fn matches(&self, target: &TabCol) -> bool {
        self.tab_name == target.tab_name && self.name == target.col_name
    }
}

/// Column definition handed to `create_table`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub col_type: ColType,
    pub len: usize,
}

impl ColumnDef {
    /// Fixed-width column; the width comes from the type.
    pub fn new(name: impl Into<String>, col_type: ColType) -> Self {
        Self {
            name: name.into(),
            col_type,
            len: col_type.fixed_len().unwrap_or(0),
        }
    }

    pub fn text(name: impl Into<String>, len: usize) -> Self {
        Self {
            name: name.into(),
            col_type: ColType::Text,
            len,
        }
    }
}

/// Represents a complete table schema with all column definitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub fd: FileId,
    pub cols: Vec<ColumnMeta>,
}

impl TableSchema {
    /// Lays the columns out back to back, so offsets never overlap and the last
    /// column ends exactly at the record size.
    pub fn new(name: impl Into<String>, fd: FileId, defs: &[ColumnDef]) -> Result<Self> {
        let name = name.into();
        let mut cols = Vec::with_capacity(defs.len());
        let mut offset = 0;
        for def in defs {
            if def.len == 0 {
                return Err(DatabaseError::InvalidRecordSize {
                    expected: 1,
                    actual: 0,
                });
            }
            if cols.iter().any(|col: &ColumnMeta| col.name == def.name) {
                return Err(DatabaseError::DuplicateColumn {
                    name: def.name.clone(),
                    table: name,
                });
            }
            if let Some(width) = def.col_type.fixed_len() {
                if width != def.len {
                    return Err(DatabaseError::InvalidRecordSize {
                        expected: width,
                        actual: def.len,
                    });
                }
            }
            cols.push(ColumnMeta {
                tab_name: name.clone(),
                name: def.name.clone(),
                col_type: def.col_type,
                len: def.len,
                offset,
            });
            offset += def.len;
        }
        Ok(Self { name, fd, cols })
    }

    pub fn record_size(&self) -> usize {
        self.cols.iter().map(|c| c.offset + c.len).max().unwrap_or(0)
    }

    /// Get column by name
    pub fn get_col(&self, name: &str) -> Result<&ColumnMeta> {
        self.cols
            .iter()
            .find(|col| col.name == name)
            .ok_or_else(|| DatabaseError::ColumnNotFound {
                name: name.to_string(),
                table: self.name.clone(),
            })
    }

    pub fn is_col(&self, name: &str) -> bool {
        self.cols.iter().any(|col| col.name == name)
    }

    /// Get all column names in order
    pub fn column_names(&self) -> Vec<String> {
        self.cols.iter().map(|col| col.name.clone()).collect()
    }
}

/// Table schemas by name, plus the next free file id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    tables: HashMap<String, TableSchema>,
    next_fd: FileId,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_table(&mut self, name: &str, defs: &[ColumnDef]) -> Result<&TableSchema> {
        if self.tables.contains_key(name) {
            return Err(DatabaseError::TableExists {
                name: name.to_string(),
            });
        }
        let schema = TableSchema::new(name, self.next_fd, defs)?;
        self.next_fd += 1;
        Ok(self.tables.entry(name.to_string()).or_insert(schema))
    }

    pub fn get_table(&self, name: &str) -> Result<&TableSchema> {
        self.tables.get(name).ok_or_else(|| DatabaseError::TableNotFound {
            name: name.to_string(),
        })
    }

    pub fn drop_table(&mut self, name: &str) -> Result<TableSchema> {
        self.tables.remove(name).ok_or_else(|| DatabaseError::TableNotFound {
            name: name.to_string(),
        })
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Get all table names
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(|s| s.as_str()).collect()
    }

    /// Writes a bincode snapshot of the catalog to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = bincode::serde::encode_to_vec(self, bincode::config::standard()).map_err(
            |e| DatabaseError::Serialization {
                details: e.to_string(),
            },
        )?;
        fs::write(path, bytes)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let (catalog, _) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard()).map_err(
                |e| DatabaseError::Serialization {
                    details: e.to_string(),
                },
            )?;
        Ok(catalog)
    }
}
