use std::fmt;

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use crate::types::{
    FileId, PAGE_SIZE, PageNo, SlotNo,
    error::{DatabaseError, Result},
};

/// Identity of a page: the file it belongs to and its number within that file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId {
    pub fd: FileId,
    pub page_no: PageNo,
}

impl PageId {
    pub fn new(fd: FileId, page_no: PageNo) -> Self {
        Self { fd, page_no }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.fd, self.page_no)
    }
}

/// Storage location of a persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rid {
    pub page_no: PageNo,
    pub slot_no: SlotNo,
}

impl Rid {
    pub fn new(page_no: PageNo, slot_no: SlotNo) -> Self {
        Self { page_no, slot_no }
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.page_no, self.slot_no)
    }
}

pub const DATA_PAGE_HEADER_SIZE: usize = 8; // num_records(4) + checksum(4)

/// Slot geometry shared by every data page of one table file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    pub record_size: usize,
    pub records_per_page: usize,
    pub bitmap_size: usize,
}

impl RecordLayout {
    pub fn new(record_size: usize) -> Result<Self> {
        if record_size == 0 {
            return Err(DatabaseError::InvalidRecordSize {
                expected: 1,
                actual: 0,
            });
        }
        // n slots need n * record_size bytes plus ceil(n / 8) bitmap bytes
        let records_per_page = (PAGE_SIZE - DATA_PAGE_HEADER_SIZE) * 8 / (record_size * 8 + 1);
        if records_per_page == 0 {
            return Err(DatabaseError::RecordTooLarge {
                len: record_size,
                page_size: PAGE_SIZE,
            });
        }
        Ok(Self {
            record_size,
            records_per_page,
            bitmap_size: records_per_page.div_ceil(8),
        })
    }

    fn slot_offset(&self, slot: SlotNo) -> usize {
        DATA_PAGE_HEADER_SIZE + self.bitmap_size + slot as usize * self.record_size
    }
}

/*
 * Data Page Layout on Disk (fixed-length slots)
 * ┌─────────────────────────────────────────────────────────────────┐
 * │                    PAGE HEADER (8 bytes)                        │
 * │  num_records(4) | checksum(4)                                   │
 * ├─────────────────────────────────────────────────────────────────┤
 * │                    SLOT BITMAP                                  │
 * │  ceil(records_per_page / 8) bytes, bit i set = slot i in use    │
 * ├─────────────────────────────────────────────────────────────────┤
 * │                    SLOTS                                        │
 * │  [slot 0][slot 1] ... [slot records_per_page - 1]   (padding)   │
 * └─────────────────────────────────────────────────────────────────┘
 */

pub struct DataPage {
    pub page_no: PageNo,
    layout: RecordLayout,
    data: Vec<u8>,
}

impl DataPage {
    pub fn new(page_no: PageNo, layout: RecordLayout) -> Self {
        Self {
            page_no,
            layout,
            data: vec![0; PAGE_SIZE],
        }
    }

    /// Parses a page read from disk, verifying its checksum.
    pub fn from_bytes(page_id: PageId, bytes: &[u8], layout: RecordLayout) -> Result<Self> {
        if bytes.len() != PAGE_SIZE {
            return Err(DatabaseError::CorruptedPage {
                page_id,
                reason: format!("expected {} bytes, got {}", PAGE_SIZE, bytes.len()),
            });
        }
        let stored = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let actual = Self::checksum_of(bytes);
        if stored != actual {
            return Err(DatabaseError::CorruptedPage {
                page_id,
                reason: format!("checksum mismatch (stored {:#010x}, computed {:#010x})", stored, actual),
            });
        }
        Ok(Self {
            page_no: page_id.page_no,
            layout,
            data: bytes.to_vec(),
        })
    }

    /// Serializes the page, stamping a fresh checksum.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = self.data.clone();
        let checksum = Self::checksum_of(&buffer);
        buffer[4..8].copy_from_slice(&checksum.to_le_bytes());
        buffer
    }

    fn checksum_of(bytes: &[u8]) -> u32 {
        let mut hasher = Hasher::new();
        hasher.update(&bytes[0..4]);
        hasher.update(&bytes[DATA_PAGE_HEADER_SIZE..]);
        hasher.finalize()
    }

    pub fn num_records(&self) -> usize {
        u32::from_le_bytes([self.data[0], self.data[1], self.data[2], self.data[3]]) as usize
    }

    fn set_num_records(&mut self, n: usize) {
        self.data[0..4].copy_from_slice(&(n as u32).to_le_bytes());
    }

    pub fn is_full(&self) -> bool {
        self.num_records() >= self.layout.records_per_page
    }

    pub fn is_occupied(&self, slot: SlotNo) -> bool {
        let slot = slot as usize;
        if slot >= self.layout.records_per_page {
            return false;
        }
        self.data[DATA_PAGE_HEADER_SIZE + slot / 8] & (1 << (slot % 8)) != 0
    }

    fn set_occupied(&mut self, slot: SlotNo) {
        let slot = slot as usize;
        self.data[DATA_PAGE_HEADER_SIZE + slot / 8] |= 1 << (slot % 8);
    }

    pub fn first_free_slot(&self) -> Option<SlotNo> {
        (0..self.layout.records_per_page as SlotNo).find(|slot| !self.is_occupied(*slot))
    }

    /// First occupied slot at or after `from`.
    pub fn next_occupied(&self, from: SlotNo) -> Option<SlotNo> {
        (from..self.layout.records_per_page as SlotNo).find(|slot| self.is_occupied(*slot))
    }

    pub fn slot(&self, slot: SlotNo) -> &[u8] {
        let start = self.layout.slot_offset(slot);
        &self.data[start..start + self.layout.record_size]
    }

    /// Writes `bytes` into a free slot and marks it used.
    pub fn insert(&mut self, slot: SlotNo, bytes: &[u8]) {
        let start = self.layout.slot_offset(slot);
        self.data[start..start + self.layout.record_size].copy_from_slice(bytes);
        self.set_occupied(slot);
        let n = self.num_records();
        self.set_num_records(n + 1);
    }

    /// Overwrites an occupied slot in place.
    pub fn overwrite(&mut self, slot: SlotNo, bytes: &[u8]) {
        let start = self.layout.slot_offset(slot);
        self.data[start..start + self.layout.record_size].copy_from_slice(bytes);
    }
}
