//! Allocation table
//!
//! The table is the only metadata on the device: an ordered list of file
//! extents, each starting on a sector boundary after the previous one.
//!
//! - [`codec`] - on-device byte format and validation
//! - [`store`] - loading from and persisting to sector 0

pub mod codec;
pub mod store;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use heapless::Vec;

use crate::address::{
    join_last_address, page_to_address, sector_ceiling, split_last_address, to_page,
};

pub use codec::{TableError, ENTRY_SIZE, HEADER_SIZE, MAX_ENCODED_SIZE, TABLE_MAGIC};

/// Maximum number of files the table can hold
pub const MAX_FILES: usize = 32;

/// One file's extent on the device
///
/// `end_page`/`end_offset` locate the last byte written (inclusive), so a
/// file of `n` bytes starting at `s` records `s + n - 1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FileEntry {
    /// First page of the file (24 bit)
    pub start_page: u32,
    /// Page holding the last written byte (24 bit)
    pub end_page: u32,
    /// Offset of the last written byte inside `end_page`
    pub end_offset: u8,
}

impl FileEntry {
    /// Stand-in for "the previous file" when the table is empty
    ///
    /// Its last byte is the final byte of the table sector, so the first
    /// real file lands on [`crate::address::FIRST_FILE_ADDRESS`].
    pub const SENTINEL: FileEntry = FileEntry {
        start_page: 0,
        end_page: 0x0F,
        end_offset: 0xFF,
    };

    /// Create an entry from raw table fields
    pub const fn new(start_page: u32, end_page: u32, end_offset: u8) -> Self {
        Self {
            start_page,
            end_page,
            end_offset,
        }
    }

    /// Fresh entry for a file about to be written at `address`
    pub const fn starting_at(address: u32) -> Self {
        let page = to_page(address);
        Self {
            start_page: page,
            end_page: page,
            end_offset: 0,
        }
    }

    /// First byte address
    pub const fn start_address(&self) -> u32 {
        page_to_address(self.start_page)
    }

    /// Address of the last written byte
    pub const fn last_address(&self) -> u32 {
        join_last_address(self.end_page, self.end_offset)
    }

    /// One past the last written byte
    pub const fn end_address(&self) -> u32 {
        self.last_address().saturating_add(1)
    }

    /// File length in bytes
    pub const fn len(&self) -> u32 {
        self.end_address().saturating_sub(self.start_address())
    }

    /// Whether no bytes were ever committed to the file
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record the write cursor (one past the last byte) as the file end
    pub fn set_end(&mut self, end_address: u32) {
        let (page, offset) = split_last_address(end_address.wrapping_sub(1));
        self.end_page = page;
        self.end_offset = offset;
    }

    /// Sector-aligned start for the file created after this one
    pub const fn next_start_address(&self) -> u32 {
        // An empty file records start - 1; never hand its sector out twice
        let last = self.last_address();
        let start = self.start_address();
        sector_ceiling(if last > start { last } else { start })
    }
}

/// Ordered list of files on the device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AllocationTable {
    files: Vec<FileEntry, MAX_FILES>,
}

impl AllocationTable {
    /// Create an empty table
    pub const fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Number of files
    pub fn num_files(&self) -> u8 {
        self.files.len() as u8
    }

    /// Whether the table has no files
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Whether another file can be created
    pub fn is_full(&self) -> bool {
        self.files.is_full()
    }

    /// Entry for file `index`
    pub fn get(&self, index: u8) -> Option<&FileEntry> {
        self.files.get(index as usize)
    }

    /// All entries in creation order
    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    /// Iterate entries in creation order
    pub fn iter(&self) -> core::slice::Iter<'_, FileEntry> {
        self.files.iter()
    }

    /// Most recently created file
    pub fn last(&self) -> Option<&FileEntry> {
        self.files.last()
    }

    pub(crate) fn last_mut(&mut self) -> Option<&mut FileEntry> {
        self.files.last_mut()
    }

    /// Most recently created file, or [`FileEntry::SENTINEL`] when empty
    pub fn last_or_sentinel(&self) -> FileEntry {
        self.files.last().copied().unwrap_or(FileEntry::SENTINEL)
    }

    /// Where the next file will be placed
    pub fn next_start_address(&self) -> u32 {
        self.last_or_sentinel().next_start_address()
    }

    /// Sum of all file lengths
    pub fn bytes_used(&self) -> u32 {
        self.files.iter().map(FileEntry::len).sum()
    }

    /// Append an entry, returning its index
    pub fn push(&mut self, entry: FileEntry) -> Result<u8, TableError> {
        self.files
            .push(entry)
            .map_err(|_| TableError::TooManyFiles)?;
        Ok(self.num_files() - 1)
    }

    /// Drop the most recently created file
    pub fn pop(&mut self) -> Option<FileEntry> {
        self.files.pop()
    }

    /// Drop all files
    pub fn clear(&mut self) {
        self.files.clear();
    }
}

impl<'a> IntoIterator for &'a AllocationTable {
    type Item = &'a FileEntry;
    type IntoIter = core::slice::Iter<'a, FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}
