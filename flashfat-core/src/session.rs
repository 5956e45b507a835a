//! Session state
//!
//! At most one file is open at a time, either for reading or for
//! appending. The session holds the cursor and the bound that limits it:
//!
//! - `Read`: bound is one past the file's last byte
//! - `Write`: bound is the high-water erase mark; everything below it has
//!   been erased and is safe to program

use crate::address::SECTOR_SIZE;
use crate::error::FlashFatError;
use crate::table::FileEntry;

/// Session mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// No file open
    #[default]
    Idle,
    /// File open for sequential reading
    Read,
    /// Newest file open for appending
    Write,
}

/// The single open session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Session {
    mode: Mode,
    cursor: u32,
    bound: u32,
}

impl Session {
    /// No session open
    pub const fn idle() -> Self {
        Self {
            mode: Mode::Idle,
            cursor: 0,
            bound: 0,
        }
    }

    /// Read session over `entry`
    pub const fn reading(entry: &FileEntry) -> Self {
        Self {
            mode: Mode::Read,
            cursor: entry.start_address(),
            bound: entry.end_address(),
        }
    }

    /// Write session for a file starting at `start`
    ///
    /// The caller must have erased the sector at `start`.
    pub const fn writing(start: u32) -> Self {
        Self {
            mode: Mode::Write,
            cursor: start,
            bound: start + SECTOR_SIZE,
        }
    }

    /// Current mode
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Next address to read or program
    pub const fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Read limit or erase high-water mark, depending on mode
    pub const fn bound(&self) -> u32 {
        self.bound
    }

    /// Bytes between cursor and bound
    ///
    /// For a read session this is what is left of the file.
    pub const fn remaining(&self) -> u32 {
        self.bound.saturating_sub(self.cursor)
    }

    /// Fail with `ModeMismatch` unless the session is in `mode`
    pub fn require(&self, mode: Mode) -> Result<(), FlashFatError> {
        if self.mode == mode {
            Ok(())
        } else {
            Err(FlashFatError::ModeMismatch)
        }
    }

    /// Clamp a read request to what is left of the file
    pub fn clamp_read(&self, requested: usize) -> usize {
        let remaining = self.remaining() as usize;
        requested.min(remaining)
    }

    /// Move the cursor forward
    pub fn advance(&mut self, len: u32) {
        self.cursor += len;
    }

    /// Move the erase mark forward by one sector
    pub fn extend_bound(&mut self) {
        self.bound += SECTOR_SIZE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_by_default() {
        let session = Session::default();
        assert_eq!(session, Session::idle());
        assert_eq!(session.mode(), Mode::Idle);
        assert_eq!(session.remaining(), 0);
    }

    #[test]
    fn test_read_session_bounds() {
        let mut entry = FileEntry::starting_at(0x1000);
        entry.set_end(0x1000 + 512);

        let mut session = Session::reading(&entry);
        assert_eq!(session.mode(), Mode::Read);
        assert_eq!(session.remaining(), 512);

        assert_eq!(session.clamp_read(100), 100);
        session.advance(500);
        assert_eq!(session.clamp_read(100), 12);
        session.advance(12);
        assert_eq!(session.clamp_read(100), 0);
    }

    #[test]
    fn test_empty_file_reads_nothing() {
        let mut entry = FileEntry::starting_at(0x2000);
        entry.set_end(0x2000);
        let session = Session::reading(&entry);
        assert_eq!(session.remaining(), 0);
        assert_eq!(session.clamp_read(10), 0);
    }

    #[test]
    fn test_write_session_erase_mark() {
        let mut session = Session::writing(0x3000);
        assert_eq!(session.mode(), Mode::Write);
        assert_eq!(session.bound(), 0x4000);
        session.extend_bound();
        assert_eq!(session.bound(), 0x5000);
    }

    #[test]
    fn test_require_mode() {
        let session = Session::writing(0x1000);
        assert!(session.require(Mode::Write).is_ok());
        assert_eq!(session.require(Mode::Read), Err(FlashFatError::ModeMismatch));
        assert_eq!(
            Session::idle().require(Mode::Write),
            Err(FlashFatError::ModeMismatch)
        );
    }
}
