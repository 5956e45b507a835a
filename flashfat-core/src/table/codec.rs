//! On-device table format
//!
//! ```text
//! ┌───────┬───────┬────────────────────────────────────────┐
//! │ MAGIC │ COUNT │ ENTRY × COUNT                          │
//! │ "FAT" │ 1B    │ start page 3B BE │ end page 3B BE │ 1B │
//! └───────┴───────┴────────────────────────────────────────┘
//! ```
//!
//! The whole table fits in the first page of sector 0. Decoding also
//! validates placement so a half-written or foreign control block is not
//! mistaken for a usable table.

use heapless::Vec;

use super::{AllocationTable, FileEntry, MAX_FILES};
use crate::address::{is_sector_aligned, FIRST_FILE_ADDRESS, MAX_PAGE, PAGE_SIZE};

/// Identifier at the start of a valid table
pub const TABLE_MAGIC: [u8; 3] = *b"FAT";

/// Magic plus file count
pub const HEADER_SIZE: usize = 4;

/// Bytes per file entry
pub const ENTRY_SIZE: usize = 7;

/// Largest encoded table
pub const MAX_ENCODED_SIZE: usize = HEADER_SIZE + MAX_FILES * ENTRY_SIZE;

const _: () = assert!(MAX_ENCODED_SIZE <= PAGE_SIZE as usize);
const _: () = assert!(MAX_FILES <= u8::MAX as usize);

/// Errors from encoding or decoding the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TableError {
    /// Identifier bytes do not spell "FAT"
    BadMagic,
    /// File count exceeds [`MAX_FILES`]
    TooManyFiles,
    /// Fewer bytes than the file count requires
    Truncated,
    /// Output buffer too small for encoding
    BufferTooSmall,
    /// Page index does not fit in 24 bits
    PageOutOfRange,
    /// Entries overlap, are out of order, or are not sector aligned
    Misplaced,
}

fn put_u24(buffer: &mut [u8], value: u32) {
    buffer[0] = (value >> 16) as u8;
    buffer[1] = (value >> 8) as u8;
    buffer[2] = value as u8;
}

fn get_u24(buffer: &[u8]) -> u32 {
    (u32::from(buffer[0]) << 16) | (u32::from(buffer[1]) << 8) | u32::from(buffer[2])
}

impl AllocationTable {
    /// Size of this table once encoded
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.files.len() * ENTRY_SIZE
    }

    /// Encode into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, TableError> {
        let len = self.encoded_len();
        if buffer.len() < len {
            return Err(TableError::BufferTooSmall);
        }

        buffer[..3].copy_from_slice(&TABLE_MAGIC);
        buffer[3] = self.num_files();

        for (entry, chunk) in self
            .files
            .iter()
            .zip(buffer[HEADER_SIZE..len].chunks_exact_mut(ENTRY_SIZE))
        {
            if entry.start_page > MAX_PAGE || entry.end_page > MAX_PAGE {
                return Err(TableError::PageOutOfRange);
            }
            put_u24(&mut chunk[0..3], entry.start_page);
            put_u24(&mut chunk[3..6], entry.end_page);
            chunk[6] = entry.end_offset;
        }

        Ok(len)
    }

    /// Encode into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_ENCODED_SIZE>, TableError> {
        let mut buffer = [0u8; MAX_ENCODED_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| TableError::BufferTooSmall)?;
        Ok(vec)
    }

    /// Decode and validate a table
    ///
    /// Trailing bytes after the last entry are ignored, so the whole first
    /// page can be passed in.
    pub fn decode(bytes: &[u8]) -> Result<Self, TableError> {
        if bytes.len() < HEADER_SIZE || bytes[..3] != TABLE_MAGIC {
            return Err(TableError::BadMagic);
        }

        let count = bytes[3] as usize;
        if count > MAX_FILES {
            return Err(TableError::TooManyFiles);
        }
        let len = HEADER_SIZE + count * ENTRY_SIZE;
        if bytes.len() < len {
            return Err(TableError::Truncated);
        }

        let mut table = AllocationTable::new();
        for chunk in bytes[HEADER_SIZE..len].chunks_exact(ENTRY_SIZE) {
            let entry = FileEntry::new(get_u24(&chunk[0..3]), get_u24(&chunk[3..6]), chunk[6]);
            table.push(entry)?;
        }

        table.validate()?;
        Ok(table)
    }

    /// Check entries are sector aligned, ordered and non-overlapping
    pub fn validate(&self) -> Result<(), TableError> {
        let mut floor = FIRST_FILE_ADDRESS;
        let mut previous_start = None;

        for entry in &self.files {
            let start = entry.start_address();
            if !is_sector_aligned(start) || start < floor {
                return Err(TableError::Misplaced);
            }
            if previous_start.is_some_and(|p| start <= p) {
                return Err(TableError::Misplaced);
            }
            if entry.end_address() < start {
                return Err(TableError::Misplaced);
            }
            floor = entry.end_address();
            previous_start = Some(start);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::SECTOR_SIZE;

    fn entry(start: u32, len: u32) -> FileEntry {
        let mut e = FileEntry::starting_at(start);
        e.set_end(start + len);
        e
    }

    fn full_table() -> AllocationTable {
        let mut table = AllocationTable::new();
        for i in 0..MAX_FILES as u32 {
            table.push(entry(SECTOR_SIZE * (2 * i + 1), 300 + i)).unwrap();
        }
        table
    }

    #[test]
    fn test_encode_empty() {
        let table = AllocationTable::new();
        let encoded = table.encode_to_vec().unwrap();
        assert_eq!(&encoded[..], b"FAT\0");
    }

    #[test]
    fn test_encode_layout() {
        let mut table = AllocationTable::new();
        table.push(entry(0x1000, 512)).unwrap();

        let mut buffer = [0xFFu8; 16];
        let len = table.encode(&mut buffer).unwrap();

        assert_eq!(len, 11);
        assert_eq!(&buffer[..4], &[b'F', b'A', b'T', 1]);
        // Start page 0x000010, end page 0x000011, offset 0xFF
        assert_eq!(&buffer[4..11], &[0x00, 0x00, 0x10, 0x00, 0x00, 0x11, 0xFF]);
        // Untouched past the table
        assert_eq!(buffer[11], 0xFF);
    }

    #[test]
    fn test_encode_big_endian_pages() {
        let mut table = AllocationTable::new();
        table.push(FileEntry::new(0x12_3450, 0x12_3456, 7)).unwrap();

        let encoded = table.encode_to_vec().unwrap();
        assert_eq!(&encoded[4..], &[0x12, 0x34, 0x50, 0x12, 0x34, 0x56, 7]);
    }

    #[test]
    fn test_roundtrip_sizes() {
        let mut one = AllocationTable::new();
        one.push(entry(0x1000, 512)).unwrap();

        for table in [AllocationTable::new(), one, full_table()] {
            let encoded = table.encode_to_vec().unwrap();
            assert_eq!(encoded.len(), table.encoded_len());
            assert_eq!(AllocationTable::decode(&encoded), Ok(table));
        }
    }

    #[test]
    fn test_full_table_fits_one_page() {
        let encoded = full_table().encode_to_vec().unwrap();
        assert_eq!(encoded.len(), 4 + 32 * 7);
        assert!(encoded.len() <= PAGE_SIZE as usize);
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut page = [0xFFu8; PAGE_SIZE as usize];
        let mut table = AllocationTable::new();
        table.push(entry(0x1000, 10)).unwrap();
        table.encode(&mut page).unwrap();

        assert_eq!(AllocationTable::decode(&page), Ok(table));
    }

    #[test]
    fn test_decode_erased_page() {
        let page = [0xFFu8; PAGE_SIZE as usize];
        assert_eq!(AllocationTable::decode(&page), Err(TableError::BadMagic));
        assert_eq!(AllocationTable::decode(b"FA"), Err(TableError::BadMagic));
    }

    #[test]
    fn test_decode_rejects_bad_count() {
        let mut page = [0u8; PAGE_SIZE as usize];
        page[..3].copy_from_slice(&TABLE_MAGIC);
        page[3] = MAX_FILES as u8 + 1;
        assert_eq!(AllocationTable::decode(&page), Err(TableError::TooManyFiles));

        assert_eq!(
            AllocationTable::decode(&[b'F', b'A', b'T', 2, 0, 0, 0x10]),
            Err(TableError::Truncated)
        );
    }

    #[test]
    fn test_decode_rejects_overlap() {
        // Second file starts inside the first
        let bytes = [
            b'F', b'A', b'T', 2, //
            0x00, 0x00, 0x10, 0x00, 0x00, 0x2F, 0xFF, // 0x1000..0x3000
            0x00, 0x00, 0x20, 0x00, 0x00, 0x20, 0x00, // 0x2000
        ];
        assert_eq!(AllocationTable::decode(&bytes), Err(TableError::Misplaced));
    }

    #[test]
    fn test_decode_rejects_table_sector_and_misalignment() {
        // File inside the table sector
        let bytes = [b'F', b'A', b'T', 1, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10];
        assert_eq!(AllocationTable::decode(&bytes), Err(TableError::Misplaced));

        // Not on a sector boundary
        let bytes = [b'F', b'A', b'T', 1, 0x00, 0x00, 0x11, 0x00, 0x00, 0x11, 0x10];
        assert_eq!(AllocationTable::decode(&bytes), Err(TableError::Misplaced));
    }

    #[test]
    fn test_encode_rejects_oversized_page() {
        let mut table = AllocationTable::new();
        table.push(FileEntry::new(0x100_0000, 0x100_0000, 0)).unwrap();
        assert_eq!(table.encode_to_vec(), Err(TableError::PageOutOfRange));
    }

    #[test]
    fn test_buffer_too_small() {
        let mut table = AllocationTable::new();
        table.push(entry(0x1000, 1)).unwrap();
        let mut buffer = [0u8; 8];
        assert_eq!(table.encode(&mut buffer), Err(TableError::BufferTooSmall));
    }
}
