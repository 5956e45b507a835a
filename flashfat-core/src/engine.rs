//! Storage engine
//!
//! [`FlashFat`] owns the device, the in-memory allocation table and the
//! single open session. It is the only type applications need.
//!
//! ```text
//!            open_file_write()
//!     ┌──────────────────────────────┐
//!     │                              ▼
//!  ┌──────┐  open_file_read(i)  ┌────────┐
//!  │ Idle │ ──────────────────▶ │  Read  │
//!  └──────┘ ◀────────────────── └────────┘
//!     ▲           close()
//!     │ close()                 ┌────────┐
//!     └──────────────────────── │ Write  │
//!                               └────────┘
//! ```
//!
//! Opening a session from any state closes the current one first.

use embedded_hal::delay::DelayNs;
use flashfat_hal::FlashDevice;

use crate::address::SECTOR_SIZE;
use crate::cache::WriteCache;
use crate::config::EngineConfig;
use crate::device::Device;
use crate::error::FlashFatError;
use crate::observer::{NoopObserver, Observer};
use crate::session::{Mode, Session};
use crate::table::{AllocationTable, FileEntry, TableError};

/// Append-only file table on a NOR flash device
pub struct FlashFat<F, D, O = NoopObserver> {
    device: Device<F, D, O>,
    table: AllocationTable,
    session: Session,
    cache: WriteCache,
}

impl<F: FlashDevice, D: DelayNs> FlashFat<F, D, NoopObserver> {
    /// Create an engine without diagnostics
    ///
    /// Call [`FlashFat::init`] before anything else.
    pub fn new(flash: F, delay: D, config: EngineConfig) -> Self {
        Self::with_observer(flash, delay, config, NoopObserver)
    }
}

impl<F: FlashDevice, D: DelayNs, O: Observer> FlashFat<F, D, O> {
    /// Create an engine reporting to `observer`
    pub fn with_observer(flash: F, delay: D, config: EngineConfig, observer: O) -> Self {
        Self {
            device: Device::new(flash, delay, observer, config),
            table: AllocationTable::new(),
            session: Session::idle(),
            cache: WriteCache::new(),
        }
    }

    /// Initialize the chip and the table
    ///
    /// With `force_reinit` an empty table is written regardless of what the
    /// device holds. Otherwise the table is loaded; if that fails the error
    /// is returned and the engine keeps an empty in-memory table, so the
    /// caller can still recover with [`FlashFat::erase_all_files`] or
    /// `init(true)`.
    ///
    /// An open session is closed first. A failed close is ignored since the
    /// table is reset or reloaded right after.
    pub fn init(&mut self, force_reinit: bool) -> Result<(), FlashFatError> {
        self.device.config().validate()?;
        let _ = self.close();
        self.device.init()?;

        self.session = Session::idle();
        self.cache.clear();
        self.table = AllocationTable::new();

        if force_reinit {
            return self.table.persist(&mut self.device);
        }

        let table = AllocationTable::load(&mut self.device)?;
        let capacity = self.device.capacity();
        if table.iter().any(|file| file.end_address() > capacity) {
            return Err(FlashFatError::CorruptTable(TableError::Misplaced));
        }
        self.table = table;
        Ok(())
    }

    /// Create a new file after the last one and open it for writing
    ///
    /// Returns the new file's index. An empty table places the file at
    /// [`crate::address::FIRST_FILE_ADDRESS`] via [`FileEntry::SENTINEL`].
    pub fn open_file_write(&mut self) -> Result<u8, FlashFatError> {
        if self.table.is_full() {
            return Err(FlashFatError::NoMoreSpace);
        }
        self.close()?;

        let start = self.table.next_start_address();
        if u64::from(start) + u64::from(SECTOR_SIZE) > u64::from(self.device.capacity()) {
            return Err(FlashFatError::NoMoreSpace);
        }

        let index = self
            .table
            .push(FileEntry::starting_at(start))
            .map_err(|_| FlashFatError::NoMoreSpace)?;
        if let Err(e) = self.table.persist(&mut self.device) {
            self.table.pop();
            return Err(e);
        }

        self.device.erase_sector(start)?;
        self.session = Session::writing(start);
        self.device
            .observer_mut()
            .session_opened(Mode::Write, self.session.cursor(), self.session.bound());
        Ok(index)
    }

    /// Open file `index` for reading from its first byte
    ///
    /// An invalid index leaves the current session untouched.
    pub fn open_file_read(&mut self, index: u8) -> Result<(), FlashFatError> {
        if self.table.get(index).is_none() {
            return Err(FlashFatError::BadFileDescriptor);
        }
        self.close()?;

        // Closing a write session finalizes the newest entry
        let entry = *self
            .table
            .get(index)
            .ok_or(FlashFatError::BadFileDescriptor)?;
        self.session = Session::reading(&entry);
        self.device
            .observer_mut()
            .session_opened(Mode::Read, self.session.cursor(), self.session.bound());
        Ok(())
    }

    /// Append `data` to the file open for writing
    pub fn write(&mut self, data: &[u8]) -> Result<(), FlashFatError> {
        self.session.require(Mode::Write)?;
        self.cache.feed(&mut self.device, &mut self.session, data)
    }

    /// Read the next bytes of the file open for reading
    ///
    /// Returns how many bytes were read, which is less than `buffer.len()`
    /// near the end of the file and zero once it is exhausted.
    pub fn read(&mut self, buffer: &mut [u8]) -> Result<usize, FlashFatError> {
        self.session.require(Mode::Read)?;

        let len = self.session.clamp_read(buffer.len());
        if len == 0 {
            return Ok(0);
        }

        self.device.read(self.session.cursor(), &mut buffer[..len])?;
        self.session.advance(len as u32);
        Ok(len)
    }

    /// Bytes left to read in the open file
    ///
    /// In write mode this is the erased room ahead of the cursor.
    pub fn peek(&self) -> u32 {
        self.session.remaining()
    }

    /// Close the open session
    ///
    /// Closing a write session flushes the cache, records the file end and
    /// persists the table. If that fails the session is dropped anyway and
    /// the error returned.
    pub fn close(&mut self) -> Result<(), FlashFatError> {
        let mode = self.session.mode();
        let result = match mode {
            Mode::Idle => return Ok(()),
            Mode::Read => Ok(()),
            Mode::Write => self.finish_write(),
        };

        self.device
            .observer_mut()
            .session_closed(mode, self.session.cursor());
        self.session = Session::idle();
        self.cache.clear();
        result
    }

    fn finish_write(&mut self) -> Result<(), FlashFatError> {
        self.cache.flush(&mut self.device, &mut self.session)?;

        let end = self.session.cursor();
        if let Some(file) = self.table.last_mut() {
            file.set_end(end);
        }
        self.table.persist(&mut self.device)
    }

    /// Forget the most recently created file
    ///
    /// Only the table entry goes away; the data stays on flash and the next
    /// new file is placed over it. Returns the remaining file count.
    pub fn erase_last_file(&mut self) -> Result<u8, FlashFatError> {
        self.close()?;
        self.table.pop();
        self.table.persist(&mut self.device)?;
        Ok(self.table.num_files())
    }

    /// Forget every file
    ///
    /// Placement restarts at the first data sector.
    pub fn erase_all_files(&mut self) -> Result<(), FlashFatError> {
        self.close()?;
        self.table.clear();
        self.table.persist(&mut self.device)
    }

    /// Borrow the allocation table
    pub fn table(&self) -> &AllocationTable {
        &self.table
    }

    /// Copy of the allocation table
    pub fn get_table(&self) -> AllocationTable {
        self.table.clone()
    }

    /// Current session mode
    pub fn mode(&self) -> Mode {
        self.session.mode()
    }

    /// Current session (cursor and bound)
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Bytes waiting in the write cache
    pub fn cached(&self) -> usize {
        self.cache.fill()
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        self.device.config()
    }

    /// Get access to the underlying flash
    pub fn flash(&self) -> &F {
        self.device.flash()
    }

    /// Get mutable access to the underlying flash
    pub fn flash_mut(&mut self) -> &mut F {
        self.device.flash_mut()
    }

    /// Get access to the observer
    pub fn observer(&self) -> &O {
        self.device.observer()
    }

    /// Tear the engine down and return its parts
    ///
    /// Any open session is abandoned without flushing; call
    /// [`FlashFat::close`] first to keep buffered data.
    pub fn release(self) -> (F, D, O) {
        self.device.into_parts()
    }
}
