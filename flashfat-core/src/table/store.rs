//! Table persistence
//!
//! The table lives at [`TABLE_ADDRESS`] and owns the whole first sector.
//! Persisting is a sector erase followed by one page program; it is not
//! atomic, so a reset in between leaves no table at all.

use embedded_hal::delay::DelayNs;
use flashfat_hal::FlashDevice;

use super::{AllocationTable, MAX_ENCODED_SIZE};
use crate::address::{PAGE_SIZE, TABLE_ADDRESS};
use crate::device::Device;
use crate::error::FlashFatError;
use crate::observer::Observer;

impl AllocationTable {
    /// Read and validate the table from the device
    pub fn load<F, D, O>(device: &mut Device<F, D, O>) -> Result<Self, FlashFatError>
    where
        F: FlashDevice,
        D: DelayNs,
        O: Observer,
    {
        let mut page = [0u8; PAGE_SIZE as usize];
        device.read(TABLE_ADDRESS, &mut page)?;

        let table = AllocationTable::decode(&page)?;
        device.observer_mut().table_loaded(&table);
        Ok(table)
    }

    /// Erase the table sector and write this table into it
    pub fn persist<F, D, O>(&self, device: &mut Device<F, D, O>) -> Result<(), FlashFatError>
    where
        F: FlashDevice,
        D: DelayNs,
        O: Observer,
    {
        let mut buffer = [0u8; MAX_ENCODED_SIZE];
        let len = self.encode(&mut buffer)?;

        device.erase_sector(TABLE_ADDRESS)?;
        device.program(TABLE_ADDRESS, &buffer[..len])?;
        device.wait_idle()?;

        device.observer_mut().table_persisted(self);
        Ok(())
    }
}
