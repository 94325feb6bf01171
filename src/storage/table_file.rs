use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use parking_lot::Mutex;
use tracing::trace;

use crate::{
    storage::{TABLE_HEADER_SIZE, header::TableFileHeader},
    types::{
        FileId, PAGE_SIZE, PageId, PageNo, Rid,
        error::{DatabaseError, Result},
        page::{DataPage, RecordLayout},
        record::Record,
    },
};

struct TableFileInner {
    file: File,
    header: TableFileHeader,
}

/// Heap file of fixed-length records: the storage handle executors fetch
/// and update records through.
pub struct TableFile {
    fd: FileId,
    path: PathBuf,
    layout: RecordLayout,
    inner: Mutex<TableFileInner>,
}

impl TableFile {
    pub fn create<P: AsRef<Path>>(path: P, fd: FileId, record_size: usize) -> Result<Self> {
        let path = path.as_ref();
        let layout = RecordLayout::new(record_size)?;
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .read(true)
            .truncate(true)
            .open(path)?;
        let header = TableFileHeader::new(record_size, layout.records_per_page);
        file.write_all(&header.to_bytes())?;
        file.flush()?;
        Ok(Self {
            fd,
            path: path.to_path_buf(),
            layout,
            inner: Mutex::new(TableFileInner { file, header }),
        })
    }

    pub fn open<P: AsRef<Path>>(path: P, fd: FileId) -> Result<Self> {
        let path = path.as_ref();
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;
        let mut header_buffer = vec![0u8; TABLE_HEADER_SIZE];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut header_buffer)?;
        let header = TableFileHeader::from_bytes(&header_buffer)?;
        let layout = RecordLayout::new(header.record_size as usize)?;
        if layout.records_per_page != header.records_per_page as usize {
            return Err(DatabaseError::InvalidHeader {
                reason: format!(
                    "records per page {} does not match record size {}",
                    header.records_per_page, header.record_size
                ),
            });
        }
        let expected_len = TABLE_HEADER_SIZE as u64 + header.num_pages as u64 * PAGE_SIZE as u64;
        if file.metadata()?.len() < expected_len {
            return Err(DatabaseError::InvalidHeader {
                reason: "File size doesn't match header".to_string(),
            });
        }
        Ok(Self {
            fd,
            path: path.to_path_buf(),
            layout,
            inner: Mutex::new(TableFileInner { file, header }),
        })
    }

    pub fn fd(&self) -> FileId {
        self.fd
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record_size(&self) -> usize {
        self.layout.record_size
    }

    pub fn num_pages(&self) -> usize {
        self.inner.lock().header.num_pages as usize
    }

    pub fn num_records(&self) -> u64 {
        self.inner.lock().header.num_records
    }

    fn page_offset(page_no: PageNo) -> u64 {
        TABLE_HEADER_SIZE as u64 + page_no as u64 * PAGE_SIZE as u64
    }

    fn read_page(&self, inner: &mut TableFileInner, page_no: PageNo) -> Result<DataPage> {
        let page_id = PageId::new(self.fd, page_no);
        if page_no < 0 || page_no as u32 >= inner.header.num_pages {
            return Err(DatabaseError::CorruptedPage {
                page_id,
                reason: format!("page beyond end of file ({} pages)", inner.header.num_pages),
            });
        }
        let mut buffer = vec![0u8; PAGE_SIZE];
        inner.file.seek(SeekFrom::Start(Self::page_offset(page_no)))?;
        inner.file.read_exact(&mut buffer)?;
        DataPage::from_bytes(page_id, &buffer, self.layout)
    }

    fn write_page(inner: &mut TableFileInner, page: &DataPage) -> Result<()> {
        inner.file.seek(SeekFrom::Start(Self::page_offset(page.page_no)))?;
        inner.file.write_all(&page.to_bytes())?;
        inner.file.flush()?;
        Ok(())
    }

    fn write_header(inner: &mut TableFileInner) -> Result<()> {
        let bytes = inner.header.to_bytes();
        inner.file.seek(SeekFrom::Start(0))?;
        inner.file.write_all(&bytes)?;
        inner.file.flush()?;
        Ok(())
    }

    fn check_len(&self, bytes: &[u8]) -> Result<()> {
        if bytes.len() != self.layout.record_size {
            return Err(DatabaseError::InvalidRecordSize {
                expected: self.layout.record_size,
                actual: bytes.len(),
            });
        }
        Ok(())
    }

    /// Appends a record. Records are never deleted, so only the last page can
    /// have a free slot.
    pub fn insert_record(&self, bytes: &[u8]) -> Result<Rid> {
        self.check_len(bytes)?;
        let mut inner = self.inner.lock();
        let num_pages = inner.header.num_pages as PageNo;
        let mut page = if num_pages > 0 {
            let last = self.read_page(&mut inner, num_pages - 1)?;
            if last.is_full() {
                DataPage::new(num_pages, self.layout)
            } else {
                last
            }
        } else {
            DataPage::new(0, self.layout)
        };
        let slot = page.first_free_slot().ok_or_else(|| DatabaseError::CorruptedPage {
            page_id: PageId::new(self.fd, page.page_no),
            reason: "page reports free space but has no free slot".to_string(),
        })?;
        page.insert(slot, bytes);
        Self::write_page(&mut inner, &page)?;
        if page.page_no >= num_pages {
            inner.header.num_pages += 1;
        }
        inner.header.num_records += 1;
        Self::write_header(&mut inner)?;
        let rid = Rid::new(page.page_no, slot);
        trace!(fd = self.fd, %rid, "inserted record");
        Ok(rid)
    }

    /// Reads the page holding `rid`. Only a rid outside the file or an empty
    /// slot is `RecordNotFound`; I/O and checksum failures pass through.
    fn page_holding(&self, inner: &mut TableFileInner, rid: Rid) -> Result<DataPage> {
        if rid.page_no < 0 || rid.page_no as u32 >= inner.header.num_pages {
            return Err(DatabaseError::RecordNotFound { rid });
        }
        let page = self.read_page(inner, rid.page_no)?;
        if !page.is_occupied(rid.slot_no) {
            return Err(DatabaseError::RecordNotFound { rid });
        }
        Ok(page)
    }

    pub fn get_record(&self, rid: Rid) -> Result<Record> {
        let mut inner = self.inner.lock();
        let page = self.page_holding(&mut inner, rid)?;
        Ok(Record::from_bytes(page.slot(rid.slot_no)))
    }

    pub fn update_record(&self, rid: Rid, bytes: &[u8]) -> Result<()> {
        self.check_len(bytes)?;
        let mut inner = self.inner.lock();
        let mut page = self.page_holding(&mut inner, rid)?;
        page.overwrite(rid.slot_no, bytes);
        Self::write_page(&mut inner, &page)?;
        trace!(fd = self.fd, %rid, "updated record");
        Ok(())
    }

    pub fn is_record(&self, rid: Rid) -> Result<bool> {
        let mut inner = self.inner.lock();
        if rid.page_no < 0 || rid.page_no as u32 >= inner.header.num_pages {
            return Ok(false);
        }
        Ok(self.read_page(&mut inner, rid.page_no)?.is_occupied(rid.slot_no))
    }

    /// The first occupied rid strictly after `after`, or the very first one.
    pub fn next_rid(&self, after: Option<Rid>) -> Result<Option<Rid>> {
        let mut inner = self.inner.lock();
        let num_pages = inner.header.num_pages as PageNo;
        let (mut page_no, mut slot) = match after {
            Some(rid) => (rid.page_no, rid.slot_no + 1),
            None => (0, 0),
        };
        while page_no < num_pages {
            let page = self.read_page(&mut inner, page_no)?;
            if let Some(found) = page.next_occupied(slot) {
                return Ok(Some(Rid::new(page_no, found)));
            }
            page_no += 1;
            slot = 0;
        }
        Ok(None)
    }

    pub fn scan(&self) -> RecordScan<'_> {
        RecordScan {
            file: self,
            last: None,
            done: false,
        }
    }
}

/// Iterates the rids of a table file in storage order.
pub struct RecordScan<'a> {
    file: &'a TableFile,
    last: Option<Rid>,
    done: bool,
}

impl Iterator for RecordScan<'_> {
    type Item = Result<Rid>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.file.next_rid(self.last) {
            Ok(Some(rid)) => {
                self.last = Some(rid);
                Some(Ok(rid))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
