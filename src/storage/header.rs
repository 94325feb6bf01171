use crate::{
    storage::{TABLE_HEADER_SIZE, TABLE_MAGIC},
    types::{PAGE_SIZE, error::DatabaseError},
};

/// First `TABLE_HEADER_SIZE` bytes of every table file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFileHeader {
    pub magic: [u8; 16],
    pub page_size: u16,
    pub format_version: u8,
    pub record_size: u32,
    pub records_per_page: u32,
    pub num_pages: u32,
    pub num_records: u64,
}

impl TableFileHeader {
    pub fn new(record_size: usize, records_per_page: usize) -> Self {
        Self {
            magic: *TABLE_MAGIC,
            page_size: PAGE_SIZE as u16,
            format_version: 1,
            record_size: record_size as u32,
            records_per_page: records_per_page as u32,
            num_pages: 0,
            num_records: 0,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(TABLE_HEADER_SIZE);

        buffer.extend_from_slice(&self.magic);
        buffer.extend_from_slice(&self.page_size.to_be_bytes());
        buffer.push(self.format_version);
        buffer.extend_from_slice(&self.record_size.to_be_bytes());
        buffer.extend_from_slice(&self.records_per_page.to_be_bytes());
        buffer.extend_from_slice(&self.num_pages.to_be_bytes());
        buffer.extend_from_slice(&self.num_records.to_be_bytes());

        buffer.resize(TABLE_HEADER_SIZE, 0);
        buffer
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DatabaseError> {
        if bytes.len() < TABLE_HEADER_SIZE {
            return Err(DatabaseError::InvalidHeader {
                reason: "Header too short".to_string(),
            });
        }

        let mut offset = 0;

        let mut magic = [0u8; 16];
        magic.copy_from_slice(&bytes[offset..offset + 16]);
        if &magic != TABLE_MAGIC {
            return Err(DatabaseError::InvalidHeader {
                reason: "Invalid table file magic number".to_string(),
            });
        }
        offset += 16;

        let page_size = u16::from_be_bytes([bytes[offset], bytes[offset + 1]]);
        if page_size != PAGE_SIZE as u16 {
            return Err(DatabaseError::InvalidHeader {
                reason: format!("Unsupported page size: {}", page_size),
            });
        }
        offset += 2;

        let format_version = bytes[offset];
        if format_version != 1 {
            return Err(DatabaseError::InvalidHeader {
                reason: format!("Unsupported format version: {}", format_version),
            });
        }
        offset += 1;

        let record_size = read_u32(bytes, &mut offset);
        let records_per_page = read_u32(bytes, &mut offset);
        let num_pages = read_u32(bytes, &mut offset);

        let mut num_records = [0u8; 8];
        num_records.copy_from_slice(&bytes[offset..offset + 8]);

        Ok(Self {
            magic,
            page_size,
            format_version,
            record_size,
            records_per_page,
            num_pages,
            num_records: u64::from_be_bytes(num_records),
        })
    }
}

fn read_u32(bytes: &[u8], offset: &mut usize) -> u32 {
    let value = u32::from_be_bytes([
        bytes[*offset],
        bytes[*offset + 1],
        bytes[*offset + 2],
        bytes[*offset + 3],
    ]);
    *offset += 4;
    value
}
