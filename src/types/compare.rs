use std::cmp::Ordering;

use crate::types::value::{ColType, fixed};

/// Three-way comparison of two encoded column values of the same declared type.
///
/// Both slices must hold at least `len` bytes (or the fixed width of the type).
/// Strings compare bytewise over the full declared length, so zero padding
/// sorts before any printable character.
pub fn compare(a: &[u8], b: &[u8], col_type: ColType, len: usize) -> Ordering {
    match col_type {
        ColType::Int => i32::from_le_bytes(fixed(a)).cmp(&i32::from_le_bytes(fixed(b))),
        ColType::BigInt => i64::from_le_bytes(fixed(a)).cmp(&i64::from_le_bytes(fixed(b))),
        ColType::Float => {
            let x = f64::from_le_bytes(fixed(a));
            let y = f64::from_le_bytes(fixed(b));
            x.partial_cmp(&y).unwrap_or_else(|| x.total_cmp(&y))
        }
        ColType::Text => a[..len].cmp(&b[..len]),
    }
}
