use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::error::{DatabaseError, Result};

/// Declared type of a column. Text carries no width here; the width lives in
/// the column metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColType {
    Int,
    BigInt,
    Float,
    Text,
}

impl ColType {
    /// Encoded width for fixed-size types, `None` for text.
    pub fn fixed_len(&self) -> Option<usize> {
        match self {
            ColType::Int => Some(4),
            ColType::BigInt | ColType::Float => Some(8),
            ColType::Text => None,
        }
    }
}

impl fmt::Display for ColType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColType::Int => "INT",
            ColType::BigInt => "BIGINT",
            ColType::Float => "FLOAT",
            ColType::Text => "CHAR",
        };
        f.write_str(name)
    }
}

/// A typed literal, as produced by the planner for conditions and SET clauses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i32),
    BigInt(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn col_type(&self) -> ColType {
        match self {
            Value::Int(_) => ColType::Int,
            Value::BigInt(_) => ColType::BigInt,
            Value::Float(_) => ColType::Float,
            Value::Text(_) => ColType::Text,
        }
    }

    /// Converts the literal so it can be stored in a column of type `target`.
    ///
    /// Integral literals are promoted when the target is floating point; every
    /// other pairing must match exactly.
    pub fn coerce_to(self, target: ColType) -> Result<Value> {
        match (self, target) {
            (Value::Int(v), ColType::Float) => Ok(Value::Float(v as f64)),
            (Value::BigInt(v), ColType::Float) => Ok(Value::Float(v as f64)),
            (value, target) if value.col_type() == target => Ok(value),
            (value, target) => Err(DatabaseError::TypeMismatch {
                expected: target.to_string(),
                actual: value.col_type().to_string(),
            }),
        }
    }

    /// Encodes the literal into exactly `len` bytes, the layout a record uses.
    pub fn to_raw(&self, len: usize) -> Result<Vec<u8>> {
        if let Some(width) = self.col_type().fixed_len() {
            if width != len {
                return Err(DatabaseError::InvalidRecordSize {
                    expected: len,
                    actual: width,
                });
            }
        }
        let raw = match self {
            Value::Int(v) => v.to_le_bytes().to_vec(),
            Value::BigInt(v) => v.to_le_bytes().to_vec(),
            Value::Float(v) => v.to_le_bytes().to_vec(),
            Value::Text(s) => {
                if s.len() > len {
                    return Err(DatabaseError::StringOverflow { len: s.len(), max: len });
                }
                let mut buf = vec![0u8; len];
                buf[..s.len()].copy_from_slice(s.as_bytes());
                buf
            }
        };
        Ok(raw)
    }

    /// Decodes a value of type `col_type` from its raw column bytes.
    pub fn from_raw(raw: &[u8], col_type: ColType) -> Result<Value> {
        if let Some(width) = col_type.fixed_len() {
            if raw.len() < width {
                return Err(DatabaseError::InvalidRecordSize {
                    expected: width,
                    actual: raw.len(),
                });
            }
        }
        let value = match col_type {
            ColType::Int => Value::Int(i32::from_le_bytes(fixed(raw))),
            ColType::BigInt => Value::BigInt(i64::from_le_bytes(fixed(raw))),
            ColType::Float => Value::Float(f64::from_le_bytes(fixed(raw))),
            ColType::Text => {
                let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
                let text = std::str::from_utf8(&raw[..end]).map_err(|e| {
                    DatabaseError::Serialization {
                        details: format!("invalid utf-8 in text column: {}", e),
                    }
                })?;
                Value::Text(text.to_string())
            }
        };
        Ok(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::BigInt(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{:?}", v),
            Value::Text(s) => write!(f, "'{}'", s),
        }
    }
}

/// Copies the leading `N` bytes of `raw`. Callers guarantee the length.
pub(crate) fn fixed<const N: usize>(raw: &[u8]) -> [u8; N] {
    let mut buf = [0u8; N];
    buf.copy_from_slice(&raw[..N]);
    buf
}
