//! In-memory byte store.

use parking_lot::RwLock;

use crate::Result;

use super::{Storage, check_range};

/// A `Vec<u8>`-backed [`Storage`].
///
/// Interior mutability via `parking_lot::RwLock`, so a single instance
/// can serve concurrent readers from `&self`. Suitable for unit tests,
/// small metadata tables, and staging buffers; container files belong in
/// [`super::FileStorage`].
pub struct MemoryStorage {
    data: RwLock<Vec<u8>>,
}

impl MemoryStorage {
    /// Create a zero-filled store of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self::from_vec(vec![0u8; size])
    }

    /// Take ownership of an existing buffer.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Consume the store and return its buffer.
    pub fn into_inner(self) -> Vec<u8> {
        self.data.into_inner()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, offset: i64, dest: &mut [u8]) -> Result<()> {
        if dest.is_empty() {
            return Ok(());
        }
        let data = self.data.read();
        check_range(offset, dest.len(), data.len() as i64)?;
        let start = offset as usize;
        dest.copy_from_slice(&data[start..start + dest.len()]);
        Ok(())
    }

    fn write(&self, offset: i64, src: &[u8]) -> Result<()> {
        if src.is_empty() {
            return Ok(());
        }
        let mut data = self.data.write();
        check_range(offset, src.len(), data.len() as i64)?;
        let start = offset as usize;
        data[start..start + src.len()].copy_from_slice(src);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn len(&self) -> Result<i64> {
        Ok(self.data.read().len() as i64)
    }

    fn set_len(&self, size: i64) -> Result<()> {
        if size < 0 {
            return Err(crate::Error::InvalidRange);
        }
        self.data.write().resize(size as usize, 0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write_round_trip() {
        let store = MemoryStorage::new(64);
        store.write(16, &[1, 2, 3, 4]).unwrap();
        let mut buf = [0u8; 4];
        store.read(16, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
    }

    #[test]
    fn rejects_out_of_range() {
        let store = MemoryStorage::new(16);
        let mut buf = [0u8; 8];
        assert!(store.read(12, &mut buf).is_err());
        assert!(store.read(-1, &mut buf).is_err());
        assert!(store.write(16, &[0]).is_err());
    }

    #[test]
    fn zero_length_always_succeeds() {
        let store = MemoryStorage::new(4);
        store.read(100, &mut []).unwrap();
        store.write(-5, &[]).unwrap();
    }

    #[test]
    fn resize_changes_len() {
        let store = MemoryStorage::new(4);
        store.set_len(32).unwrap();
        assert_eq!(store.len().unwrap(), 32);
        assert!(store.set_len(-1).is_err());
    }
}
