use crate::{
    storage::schema::ColumnMeta,
    types::{
        error::{DatabaseError, Result},
        value::Value,
    },
};

/// A fixed-length tuple. Its layout is defined entirely by the column
/// metadata of whoever produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    data: Vec<u8>,
}

impl Record {
    /// A zeroed record of `len` bytes.
    pub fn new(len: usize) -> Self {
        Self { data: vec![0; len] }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self { data: bytes.to_vec() }
    }

    /// Encodes one value per column into a record of `len` bytes. Integral
    /// values are promoted for float columns.
    pub fn from_values(cols: &[ColumnMeta], len: usize, values: &[Value]) -> Result<Self> {
        if values.len() != cols.len() {
            return Err(DatabaseError::InvalidValueCount {
                expected: cols.len(),
                actual: values.len(),
            });
        }
        let mut record = Self::new(len);
        for (col, value) in cols.iter().zip(values) {
            let raw = value.clone().coerce_to(col.col_type)?.to_raw(col.len)?;
            record.set_column(col, &raw)?;
        }
        Ok(record)
    }

    /// Joined layout: left bytes immediately followed by right bytes.
    pub fn join(left: &Record, right: &Record) -> Self {
        let mut data = Vec::with_capacity(left.len() + right.len());
        data.extend_from_slice(&left.data);
        data.extend_from_slice(&right.data);
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Raw bytes of one column.
    pub fn column(&self, col: &ColumnMeta) -> &[u8] {
        &self.data[col.offset..col.offset + col.len]
    }

    /// Overwrites the byte range of `col`, leaving every other byte untouched.
    pub fn set_column(&mut self, col: &ColumnMeta, raw: &[u8]) -> Result<()> {
        if raw.len() != col.len {
            return Err(DatabaseError::InvalidRecordSize {
                expected: col.len,
                actual: raw.len(),
            });
        }
        if col.offset + col.len > self.data.len() {
            return Err(DatabaseError::InvalidRecordSize {
                expected: col.offset + col.len,
                actual: self.data.len(),
            });
        }
        self.data[col.offset..col.offset + col.len].copy_from_slice(raw);
        Ok(())
    }
}

impl AsRef<[u8]> for Record {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
