//! Diagnostic hooks
//!
//! The engine reports what it does to the flash through an [`Observer`]
//! instead of printing. Every hook has an empty default body, so an
//! implementation only overrides what it cares about.

use crate::session::Mode;
use crate::table::AllocationTable;

/// Receives engine events
pub trait Observer {
    /// Table read and validated from the device
    fn table_loaded(&mut self, _table: &AllocationTable) {}

    /// Table written back to the device
    fn table_persisted(&mut self, _table: &AllocationTable) {}

    /// Erase issued for the sector starting at `address`
    fn sector_erased(&mut self, _address: u32) {}

    /// `len` bytes programmed at `address`
    fn page_programmed(&mut self, _address: u32, _len: usize) {}

    /// Session opened with its starting cursor and bound
    fn session_opened(&mut self, _mode: Mode, _cursor: u32, _bound: u32) {}

    /// Session closed with its final cursor
    fn session_closed(&mut self, _mode: Mode, _cursor: u32) {}

    /// Device stayed busy for `waited_us` and the operation was abandoned
    fn busy_timeout(&mut self, _waited_us: u32) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {}

impl<T: Observer + ?Sized> Observer for &mut T {
    fn table_loaded(&mut self, table: &AllocationTable) {
        T::table_loaded(self, table)
    }

    fn table_persisted(&mut self, table: &AllocationTable) {
        T::table_persisted(self, table)
    }

    fn sector_erased(&mut self, address: u32) {
        T::sector_erased(self, address)
    }

    fn page_programmed(&mut self, address: u32, len: usize) {
        T::page_programmed(self, address, len)
    }

    fn session_opened(&mut self, mode: Mode, cursor: u32, bound: u32) {
        T::session_opened(self, mode, cursor, bound)
    }

    fn session_closed(&mut self, mode: Mode, cursor: u32) {
        T::session_closed(self, mode, cursor)
    }

    fn busy_timeout(&mut self, waited_us: u32) {
        T::busy_timeout(self, waited_us)
    }
}

/// Observer that logs through defmt
#[cfg(feature = "defmt")]
#[derive(Debug, Clone, Copy, Default)]
pub struct DefmtObserver;

#[cfg(feature = "defmt")]
impl Observer for DefmtObserver {
    fn table_loaded(&mut self, table: &AllocationTable) {
        defmt::info!("FAT loaded: {} files", table.num_files());
        for (i, file) in table.iter().enumerate() {
            defmt::debug!(
                "  file {}: start page {=u32:#x}, end page {=u32:#x}, offset {}",
                i,
                file.start_page,
                file.end_page,
                file.end_offset
            );
        }
    }

    fn table_persisted(&mut self, table: &AllocationTable) {
        defmt::debug!("FAT written: {} files", table.num_files());
    }

    fn sector_erased(&mut self, address: u32) {
        defmt::trace!("Erase sector {=u32:#x}", address);
    }

    fn page_programmed(&mut self, address: u32, len: usize) {
        defmt::trace!("Program {} bytes at {=u32:#x}", len, address);
    }

    fn session_opened(&mut self, mode: Mode, cursor: u32, bound: u32) {
        defmt::debug!(
            "Open {}: cursor {=u32:#x}, bound {=u32:#x}",
            mode,
            cursor,
            bound
        );
    }

    fn session_closed(&mut self, mode: Mode, cursor: u32) {
        defmt::debug!("Close {}: cursor {=u32:#x}", mode, cursor);
    }

    fn busy_timeout(&mut self, waited_us: u32) {
        defmt::warn!("Flash still busy after {}us", waited_us);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        erases: usize,
    }

    impl Observer for Counter {
        fn sector_erased(&mut self, _address: u32) {
            self.erases += 1;
        }
    }

    fn notify(mut observer: impl Observer) {
        observer.sector_erased(0);
        observer.page_programmed(0, 256);
    }

    #[test]
    fn test_borrowed_observer_forwards() {
        let mut counter = Counter::default();
        notify(&mut counter);
        notify(&mut counter);
        assert_eq!(counter.erases, 2);
    }
}
