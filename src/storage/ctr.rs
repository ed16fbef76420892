//! AES-CTR stream-transforming storage decorator.

use tracing::debug;

use crate::crypto::CtrCipher;
use crate::crypto::xts::BLOCK_SIZE;
use crate::{Error, Result};

use super::Storage;

/// A [`Storage`] decorator that CTR-transforms data on every access.
///
/// Offsets and lengths must be multiples of the 16-byte block size;
/// arbitrary byte ranges go through [`super::AlignedStorage`]. The
/// keystream depends only on the absolute offset, so any aligned range
/// can be read or written independently and in any order.
pub struct CtrStorage<S> {
    base: S,
    cipher: CtrCipher,
}

impl<S: Storage> CtrStorage<S> {
    /// Decorate `base` with `cipher`.
    pub fn new(base: S, cipher: CtrCipher) -> Self {
        debug!("opening CTR storage view");
        Self { base, cipher }
    }

    fn check_access(offset: i64, len: usize) -> Result<()> {
        if offset < 0 || offset % BLOCK_SIZE as i64 != 0 || len % BLOCK_SIZE != 0 {
            return Err(Error::InvalidArgument(
                "CTR accesses must be block-aligned",
            ));
        }
        Ok(())
    }
}

impl<S: Storage> Storage for CtrStorage<S> {
    fn read(&self, offset: i64, dest: &mut [u8]) -> Result<()> {
        if dest.is_empty() {
            return Ok(());
        }
        Self::check_access(offset, dest.len())?;
        if let Err(e) = self.base.read(offset, dest) {
            // Never hand back partially-transformed bytes as plaintext.
            dest.fill(0);
            return Err(e);
        }
        self.cipher.apply(offset as u64, dest);
        Ok(())
    }

    fn write(&self, offset: i64, src: &[u8]) -> Result<()> {
        if src.is_empty() {
            return Ok(());
        }
        Self::check_access(offset, src.len())?;
        let mut buf = src.to_vec();
        self.cipher.apply(offset as u64, &mut buf);
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
