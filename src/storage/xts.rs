//! AES-XTS sector-transforming storage decorator.

use tracing::debug;

use crate::crypto::xts::{BLOCK_SIZE, Direction, XtsCipher};
use crate::{Error, Result};

use super::Storage;

/// A [`Storage`] decorator that XTS-encrypts on write and decrypts on
/// read, one sector at a time.
///
/// Accesses must start on a sector boundary. The length may end with a
/// partial final sector of at least one block; a non-multiple-of-16 tail
/// engages ciphertext stealing inside that sector. Arbitrary byte ranges
/// go through [`super::AlignedStorage`].
pub struct XtsStorage<S> {
    base: S,
    cipher: XtsCipher,
}

impl<S: Storage> XtsStorage<S> {
    /// Decorate `base` with `cipher`.
    pub fn new(base: S, cipher: XtsCipher) -> Self {
        debug!(
            sector_size = cipher.sector_size(),
            "opening XTS storage view"
        );
        Self { base, cipher }
    }

    /// Sector size of the underlying cipher; the alignment unit of this
    /// storage.
    pub fn sector_size(&self) -> usize {
        self.cipher.sector_size()
    }

    /// Validate the access contract and return the starting sector index.
    fn check_access(&self, offset: i64, len: usize) -> Result<u64> {
        let sector_size = self.cipher.sector_size() as i64;
        if offset < 0 || offset % sector_size != 0 {
            return Err(Error::InvalidArgument(
                "XTS accesses must start on a sector boundary",
            ));
        }
        // Only the final sector may be partial, and ciphertext stealing
        // needs at least one full block of it.
        if len % BLOCK_SIZE != 0 && len % self.cipher.sector_size() < BLOCK_SIZE {
            return Err(Error::InvalidArgument(
                "XTS tail sectors must cover at least one block",
            ));
        }
        Ok((offset / sector_size) as u64)
    }

    /// Apply `direction` to `buf` sector by sector.
    fn transform(&self, buf: &mut [u8], first_sector: u64, direction: Direction) {
        for (i, sector) in buf.chunks_mut(self.cipher.sector_size()).enumerate() {
            self.cipher.transform(sector, first_sector + i as u64, direction);
        }
    }
}

impl<S: Storage> Storage for XtsStorage<S> {
    fn read(&self, offset: i64, dest: &mut [u8]) -> Result<()> {
        if dest.is_empty() {
            return Ok(());
        }
        let first_sector = self.check_access(offset, dest.len())?;
        if let Err(e) = self.base.read(offset, dest) {
            // Never hand back partially-transformed bytes as plaintext.
            dest.fill(0);
            return Err(e);
        }
        self.transform(dest, first_sector, Direction::Decrypt);
        Ok(())
    }

    fn write(&self, offset: i64, src: &[u8]) -> Result<()> {
        if src.is_empty() {
            return Ok(());
        }
        let first_sector = self.check_access(offset, src.len())?;
        let mut buf = src.to_vec();
        self.transform(&mut buf, first_sector, Direction::Encrypt);
        self.base.write(offset, &buf)
    }

    fn flush(&self) -> Result<()> {
        self.base.flush()
    }

    fn len(&self) -> Result<i64> {
        self.base.len()
    }

    fn set_len(&self, _size: i64) -> Result<()> {
        Err(Error::UnsupportedSetSize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::xts::TweakOrder;
    use crate::storage::MemoryStorage;

    const SECTOR: usize = 0x200;

    fn storage(size: usize) -> XtsStorage<MemoryStorage> {
        let cipher =
            XtsCipher::new(&[0xAAu8; 16], &[0xBBu8; 16], SECTOR, TweakOrder::Standard).unwrap();
        XtsStorage::new(MemoryStorage::new(size), cipher)
    }

    #[test]
    fn round_trip_multiple_sectors() {
        let store = storage(SECTOR * 4);
        let plain: Vec<u8> = (0..SECTOR * 2).map(|i| (i % 251) as u8).collect();
        store.write(SECTOR as i64, &plain).unwrap();

        let mut back = vec![0u8; plain.len()];
        store.read(SECTOR as i64, &mut back).unwrap();
        assert_eq!(back, plain);
    }

    #[test]
    fn round_trip_partial_tail_sector() {
        let store = storage(SECTOR * 2);
        let plain: Vec<u8> = (0..SECTOR + 40 + 7).map(|i| (i * 7) as u8).collect();
        store.write(0, &plain).unwrap();

        let mut back = vec![0u8; plain.len()];
        store.read(0, &mut back).unwrap();
        assert_eq!(back, plain);
    }

    #[test]
    fn ciphertext_differs_per_sector() {
        let store = storage(SECTOR * 2);
        store.write(0, &vec![0u8; SECTOR * 2]).unwrap();

        let base = store.base.into_inner();
        assert_ne!(base[..SECTOR], base[SECTOR..]);
    }

    #[test]
    fn rejects_misaligned_offset_and_short_tail() {
        let store = storage(SECTOR * 2);
        let mut buf = [0u8; 32];
        assert!(matches!(
            store.read(8, &mut buf),
            Err(Error::InvalidArgument(_))
        ));
        // 5-byte tail sector cannot be ciphertext-stolen.
        let mut short = [0u8; 5];
        assert!(matches!(
            store.read(0, &mut short),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            store.write(0, &[0u8; SECTOR + 5]),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn set_len_is_unsupported() {
        let store = storage(SECTOR);
        assert!(matches!(store.set_len(0), Err(Error::UnsupportedSetSize)));
    }

    #[test]
    fn failed_read_clears_destination() {
        let store = storage(SECTOR);
        let mut buf = vec![0x5Au8; SECTOR * 2];
        assert!(store.read(0, &mut buf).is_err());
        assert!(buf.iter().all(|&b| b == 0));
    }
}
