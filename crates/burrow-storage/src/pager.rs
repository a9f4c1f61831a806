//! Page store: maps page numbers to resident byte buffers.
//!
//! The backing file is an implicit array of 4096-byte pages. A page is
//! loaded into the cache on first reference (zero-filled if it lies
//! beyond the current file length) and stays resident for the life of
//! the connection. Mutations happen in place on the cached buffer;
//! durability is reached only when the page is flushed back to its
//! `page_num * PAGE_SIZE` offset.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, trace};

use crate::error::{PagerError, PagerResult};

/// Size of a single page in bytes.
pub const PAGE_SIZE: usize = 4096;

/// Hard cap on the number of addressable pages.
pub const TABLE_MAX_PAGES: usize = 100;

/// A raw page buffer.
pub type Page = [u8; PAGE_SIZE];

/// Owns the backing file and the in-memory page cache.
#[derive(Debug)]
pub struct Pager {
    file: File,
    /// Number of whole pages on disk when the file was opened.
    pages_on_disk: usize,
    /// High-water mark of pages known to exist (resident or on disk).
    num_pages: usize,
    /// Cache slots, indexed by page number.
    pages: Vec<Option<Box<Page>>>,
}

impl Pager {
    /// Opens (creating if necessary) the backing file.
    ///
    /// Fails if the existing file length is not a whole number of
    /// pages — a partial page means the file was not produced by an
    /// orderly close.
    pub fn open(path: &Path) -> PagerResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        let file_len = file.metadata()?.len();
        if file_len % PAGE_SIZE as u64 != 0 {
            return Err(PagerError::CorruptFile);
        }
        let pages_on_disk = (file_len / PAGE_SIZE as u64) as usize;

        debug!(path = %path.display(), pages = pages_on_disk, "opened database file");

        let mut pages = Vec::with_capacity(TABLE_MAX_PAGES);
        pages.resize_with(TABLE_MAX_PAGES, || None);

        Ok(Self {
            file,
            pages_on_disk,
            num_pages: pages_on_disk,
            pages,
        })
    }

    /// Returns the resident buffer for page `page_num`, loading it
    /// from the file on first reference.
    pub fn get_page(&mut self, page_num: usize) -> PagerResult<&mut Page> {
        if page_num >= TABLE_MAX_PAGES {
            return Err(PagerError::PageOutOfBounds {
                page_num,
                max: TABLE_MAX_PAGES,
            });
        }

        if self.pages[page_num].is_none() {
            // Cache miss: zero-fill, then overlay file content if the
            // page exists on disk.
            let mut page: Box<Page> = Box::new([0u8; PAGE_SIZE]);
            if page_num < self.pages_on_disk {
                self.file
                    .seek(SeekFrom::Start((page_num * PAGE_SIZE) as u64))?;
                read_full_page(&mut self.file, &mut page[..])?;
            }
            trace!(page_num, "loaded page into cache");
            self.pages[page_num] = Some(page);

            if page_num >= self.num_pages {
                self.num_pages = page_num + 1;
            }
        }

        match self.pages[page_num].as_deref_mut() {
            Some(page) => Ok(page),
            None => Err(PagerError::PageNotResident(page_num)),
        }
    }

    /// Writes the resident buffer for page `page_num` back to the file.
    pub fn flush(&mut self, page_num: usize) -> PagerResult<()> {
        let page = self.pages[page_num]
            .as_deref()
            .ok_or(PagerError::PageNotResident(page_num))?;

        self.file
            .seek(SeekFrom::Start((page_num * PAGE_SIZE) as u64))?;
        self.file.write_all(page)?;
        trace!(page_num, "flushed page");
        Ok(())
    }

    /// Flushes every resident page.
    pub fn flush_all(&mut self) -> PagerResult<()> {
        for page_num in 0..self.num_pages {
            if self.pages[page_num].is_some() {
                self.flush(page_num)?;
            }
        }
        self.file.flush()?;
        debug!(pages = self.num_pages, "flushed all resident pages");
        Ok(())
    }

    /// Number of pages currently known to exist (high-water mark, not
    /// the file's physical length).
    pub fn page_count(&self) -> usize {
        self.num_pages
    }

    /// Page number a new allocation would take. New pages are appended
    /// at the high-water mark; there is no free list.
    pub fn unused_page_num(&self) -> usize {
        self.num_pages
    }
}

/// Reads exactly one page worth of bytes, surfacing a short read as a
/// distinct fault.
fn read_full_page(file: &mut File, buf: &mut [u8]) -> PagerResult<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(PagerError::ShortRead {
                    expected: buf.len(),
                    actual: filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
