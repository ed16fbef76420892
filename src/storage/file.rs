//! File-backed byte store.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use parking_lot::Mutex;

use crate::{Error, Result};

use super::Storage;

/// A [`Storage`] over an open [`File`].
///
/// The handle lives behind a `parking_lot::Mutex` so positioned reads and
/// writes stay portable (seek + exact I/O as one critical section) and
/// the store can be used from `&self` across threads. I/O failures are
/// propagated unchanged as [`Error::Io`].
pub struct FileStorage {
    file: Mutex<File>,
}

impl FileStorage {
    /// Open `path` for reading and writing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self::from_file(file))
    }

    /// Open `path` read-only. Writes will fail with the OS error.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::from_file(file))
    }

    /// Wrap an already-open handle.
    pub fn from_file(file: File) -> Self {
        Self {
            file: Mutex::new(file),
        }
    }
}

impl Storage for FileStorage {
    fn read(&self, offset: i64, dest: &mut [u8]) -> Result<()> {
        if dest.is_empty() {
            return Ok(());
        }
        if offset < 0 {
            return Err(Error::InvalidRange);
        }
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset as u64))?;
        file.read_exact(dest)?;
        Ok(())
    }

    fn write(&self, offset: i64, src: &[u8]) -> Result<()> {
        if src.is_empty() {
            return Ok(());
        }
        if offset < 0 {
            return Err(Error::InvalidRange);
        }
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset as u64))?;
        file.write_all(src)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.file.lock().sync_data()?;
        Ok(())
    }

    fn len(&self) -> Result<i64> {
        Ok(self.file.lock().metadata()?.len() as i64)
    }

    fn set_len(&self, size: i64) -> Result<()> {
        if size < 0 {
            return Err(Error::InvalidRange);
        }
        self.file.lock().set_len(size as u64)?;
        Ok(())
    }
}
