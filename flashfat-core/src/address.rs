//! Address translation
//!
//! The table stores file positions as 24-bit page indices plus a byte
//! offset. Everything else in the engine works with linear byte
//! addresses; these helpers convert between the two and compute sector
//! boundaries.

/// Program page size in bytes (smallest write unit)
pub const PAGE_SIZE: u32 = 256;

/// log2(PAGE_SIZE)
pub const PAGE_SHIFT: u32 = 8;

/// Erase sector size in bytes (smallest erase unit)
pub const SECTOR_SIZE: u32 = 4096;

/// Pages in one sector
pub const PAGES_PER_SECTOR: u32 = SECTOR_SIZE / PAGE_SIZE;

/// Address of the allocation table (occupies the whole first sector)
pub const TABLE_ADDRESS: u32 = 0;

/// Canonical start of the first file: the sector right after the table
pub const FIRST_FILE_ADDRESS: u32 = TABLE_ADDRESS + SECTOR_SIZE;

/// Largest page index the 3-byte table fields can hold
pub const MAX_PAGE: u32 = 0x00FF_FFFF;

/// Page index containing `address`
pub const fn to_page(address: u32) -> u32 {
    address >> PAGE_SHIFT
}

/// First byte address of `page`
pub const fn page_to_address(page: u32) -> u32 {
    page << PAGE_SHIFT
}

/// Byte offset of `address` inside its page
pub const fn page_offset(address: u32) -> u8 {
    (address & (PAGE_SIZE - 1)) as u8
}

/// Start of the sector containing `address`
pub const fn sector_start(address: u32) -> u32 {
    address & !(SECTOR_SIZE - 1)
}

/// Whether `address` is the first byte of a sector
pub const fn is_sector_aligned(address: u32) -> bool {
    address & (SECTOR_SIZE - 1) == 0
}

/// Start of the first sector strictly after the one holding `address`
///
/// A new file is placed here so it never shares a sector with the last
/// byte of the previous file, even when that byte ends exactly on a
/// boundary. Saturates at `u32::MAX` at the top of the address space.
pub const fn sector_ceiling(address: u32) -> u32 {
    sector_start(address).saturating_add(SECTOR_SIZE)
}

/// Split an inclusive last-byte address into `(page, offset)`
pub const fn split_last_address(last: u32) -> (u32, u8) {
    (to_page(last), page_offset(last))
}

/// Rebuild an inclusive last-byte address from `(page, offset)`
pub const fn join_last_address(page: u32, offset: u8) -> u32 {
    page_to_address(page) | offset as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_conversion() {
        assert_eq!(to_page(0x1000), 0x10);
        assert_eq!(to_page(0x10FF), 0x10);
        assert_eq!(to_page(0x1100), 0x11);
        assert_eq!(page_to_address(0x10), 0x1000);
        assert_eq!(page_offset(0x12AB), 0xAB);
    }

    #[test]
    fn test_sector_ceiling() {
        // Anywhere inside the table sector moves to the first data sector
        assert_eq!(sector_ceiling(0), FIRST_FILE_ADDRESS);
        assert_eq!(sector_ceiling(0x0FFF), FIRST_FILE_ADDRESS);

        // A file ending on the last byte of a sector still gets a new one
        assert_eq!(sector_ceiling(0x1FFF), 0x2000);

        // Exactly on a boundary: strictly greater sector
        assert_eq!(sector_ceiling(0x2000), 0x3000);
        assert_eq!(sector_ceiling(0x21FF), 0x3000);
    }

    #[test]
    fn test_sector_ceiling_saturates() {
        assert_eq!(sector_ceiling(u32::MAX), u32::MAX);
    }

    #[test]
    fn test_sector_alignment() {
        assert!(is_sector_aligned(0));
        assert!(is_sector_aligned(0x3000));
        assert!(!is_sector_aligned(0x3100));
        assert_eq!(sector_start(0x3FFF), 0x3000);
        assert_eq!(PAGES_PER_SECTOR, 16);
    }

    #[test]
    fn test_last_address_split_join() {
        // 512 bytes written from 0x1000: last byte is 0x11FF
        let (page, offset) = split_last_address(0x1000 + 512 - 1);
        assert_eq!(page, 0x11);
        assert_eq!(offset, 0xFF);
        assert_eq!(join_last_address(page, offset), 0x11FF);
    }
}
