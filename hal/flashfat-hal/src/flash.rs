//! NOR flash device abstraction
//!
//! Models the command set shared by common SPI NOR chips (W25Qxx, MX25R,
//! ...): byte-addressed reads, page programs into erased memory, 4KB sector
//! erases, and a status register busy bit.

/// Errors from raw flash operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// Bus transfer to the chip failed
    Bus,
    /// Address range lies outside the device
    OutOfBounds,
    /// Program operation crosses a page boundary
    PageOverflow,
    /// Program targets bytes that have not been erased
    NotErased,
    /// Command issued while a previous erase/program is still running
    Busy,
}

/// Raw NOR flash device
///
/// Erase and program commands return as soon as the command has been
/// issued; the chip keeps working in the background and reports completion
/// through [`FlashDevice::is_busy`]. Callers are expected to poll until the
/// device is idle before issuing the next command.
///
/// The chip-select line (and any other wiring) is owned by the
/// implementation, so none of the methods take a pin.
pub trait FlashDevice {
    /// Bring the chip out of power-down and verify it responds
    fn init(&mut self) -> Result<(), FlashError>;

    /// Read `buffer.len()` bytes starting at `address`
    fn read(&mut self, address: u32, buffer: &mut [u8]) -> Result<(), FlashError>;

    /// Program `data` starting at `address`
    ///
    /// The range must lie inside a single page and must have been erased
    /// beforehand. At most one page (256 bytes) is written per call.
    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), FlashError>;

    /// Start erasing the 4KB sector containing `address`
    fn erase_sector(&mut self, address: u32) -> Result<(), FlashError>;

    /// Check the status register busy flag
    ///
    /// Takes `&mut self` because reading status is a bus transaction.
    fn is_busy(&mut self) -> bool;
}

impl<T: FlashDevice + ?Sized> FlashDevice for &mut T {
    fn init(&mut self) -> Result<(), FlashError> {
        T::init(self)
    }

    fn read(&mut self, address: u32, buffer: &mut [u8]) -> Result<(), FlashError> {
        T::read(self, address, buffer)
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), FlashError> {
        T::write(self, address, data)
    }

    fn erase_sector(&mut self, address: u32) -> Result<(), FlashError> {
        T::erase_sector(self, address)
    }

    fn is_busy(&mut self) -> bool {
        T::is_busy(self)
    }
}
