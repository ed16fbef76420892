//! Random-access byte stores and the cipher decorators over them.
//!
//! Everything in this module speaks one contract: [`Storage`], a
//! synchronous random-access byte range store. Cipher decorators wrap a
//! base store and transform data on every access, so higher layers
//! (filesystem parsers, hash verifiers) only ever see plaintext bytes.
//!
//! ```text
//! caller -> AlignedStorage -> CtrExStorage -> CtrCipher -> base Storage
//!                          \-> XtsStorage  -> XtsCipher -> base Storage
//! ```
//!
//! ## Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`memory`]  | `Vec<u8>`-backed store for tests and small tables |
//! | [`file`]    | `std::fs::File`-backed store for container files |
//! | [`xts`]     | AES-XTS sector-transforming decorator |
//! | [`ctr`]     | AES-CTR stream-transforming decorator |
//! | [`ctr_ex`]  | CTR with per-subsection counter generations (patches) |
//! | [`aligned`] | Arbitrary-range bridge over alignment-requiring stores |

pub mod aligned;
pub mod ctr;
pub mod ctr_ex;
pub mod file;
pub mod memory;
pub mod xts;

pub use aligned::AlignedStorage;
pub use ctr::CtrStorage;
pub use ctr_ex::{CounterEntry, CounterIndex, CtrExStorage};
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use xts::XtsStorage;

use crate::{Error, Result};

/// A synchronous random-access byte range store.
///
/// All methods take `&self`; implementors that mutate use interior
/// mutability, so a store can be shared across threads wherever it is
/// `Sync`. Offsets are signed to match the container formats' on-disk
/// fields; negative offsets are always out of range.
///
/// Zero-length reads and writes succeed as no-ops regardless of offset.
/// Failures from a wrapped store are propagated unchanged.
pub trait Storage {
    /// Fill `dest` from `[offset, offset + dest.len())`.
    fn read(&self, offset: i64, dest: &mut [u8]) -> Result<()>;

    /// Write `src` to `[offset, offset + src.len())`.
    fn write(&self, offset: i64, src: &[u8]) -> Result<()>;

    /// Push buffered state down to the backing medium.
    fn flush(&self) -> Result<()>;

    /// Current logical size in bytes.
    fn len(&self) -> Result<i64>;

    /// Resize to `size` bytes. Encrypted views are fixed-size and return
    /// [`Error::UnsupportedSetSize`].
    fn set_len(&self, size: i64) -> Result<()>;
}

impl<S: Storage + ?Sized> Storage for &S {
    fn read(&self, offset: i64, dest: &mut [u8]) -> Result<()> {
        (**self).read(offset, dest)
    }
    fn write(&self, offset: i64, src: &[u8]) -> Result<()> {
        (**self).write(offset, src)
    }
    fn flush(&self) -> Result<()> {
        (**self).flush()
    }
    fn len(&self) -> Result<i64> {
        (**self).len()
    }
    fn set_len(&self, size: i64) -> Result<()> {
        (**self).set_len(size)
    }
}

impl<S: Storage + ?Sized> Storage for std::sync::Arc<S> {
    fn read(&self, offset: i64, dest: &mut [u8]) -> Result<()> {
        (**self).read(offset, dest)
    }
    fn write(&self, offset: i64, src: &[u8]) -> Result<()> {
        (**self).write(offset, src)
    }
    fn flush(&self) -> Result<()> {
        (**self).flush()
    }
    fn len(&self) -> Result<i64> {
        (**self).len()
    }
    fn set_len(&self, size: i64) -> Result<()> {
        (**self).set_len(size)
    }
}

/// Validate that `[offset, offset + len)` lies within `[0, size)`.
#[inline]
pub(crate) fn check_range(offset: i64, len: usize, size: i64) -> Result<()> {
    if offset < 0 {
        return Err(Error::InvalidRange);
    }
    match offset.checked_add(len as i64) {
        Some(end) if end <= size => Ok(()),
        _ => Err(Error::InvalidRange),
    }
}
