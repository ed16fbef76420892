//! Arbitrary-range bridge over alignment-requiring stores.

use tracing::{debug, trace};

use crate::utils::align_down;
use crate::{Error, Result};

use super::Storage;

/// A [`Storage`] decorator that services arbitrary byte ranges against a
/// base store whose accesses must fall on fixed-size unit boundaries
/// (an encrypted sector or block view).
///
/// A request is split into a maximal aligned core, forwarded straight
/// through, plus at most one partial unit on each side. Partial units
/// are staged in a scratch buffer of at least one unit; partial writes
/// are read-modify-write, so the rest of the touched unit must hold
/// valid, readable content.
///
/// The [`Storage`] impl allocates a scratch buffer per call. Callers
/// with a hot path can reuse one via [`read_with`](Self::read_with) and
/// [`write_with`](Self::write_with).
pub struct AlignedStorage<S> {
    base: S,
    alignment: usize,
}

impl<S: Storage> AlignedStorage<S> {
    /// Decorate `base`, whose accesses must be multiples of `alignment`.
    ///
    /// A zero alignment fails with [`Error::InvalidArgument`].
    pub fn new(base: S, alignment: usize) -> Result<Self> {
        if alignment == 0 {
            return Err(Error::InvalidArgument("alignment must be non-zero"));
        }
        debug!(alignment, "opening aligned storage view");
        Ok(Self { base, alignment })
    }

    /// The base store's alignment unit in bytes.
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Read `[offset, offset + dest.len())` using `scratch` for partial
    /// units.
    ///
    /// `scratch` must be at least one alignment unit long; a shorter
    /// buffer is a caller bug and panics.
    pub fn read_with(&self, offset: i64, dest: &mut [u8], scratch: &mut [u8]) -> Result<()> {
        assert!(
            scratch.len() >= self.alignment,
            "scratch buffer must cover one alignment unit"
        );
        if dest.is_empty() {
            return Ok(());
        }
        if offset < 0 {
            return Err(Error::InvalidRange);
        }
        let align = self.alignment as i64;
        let end = offset
            .checked_add(dest.len() as i64)
            .ok_or(Error::InvalidRange)?;
        let scratch = &mut scratch[..self.alignment];

        let mut pos = offset;
        let mut filled = 0usize;

        // Head partial unit.
        if pos % align != 0 {
            trace!(offset, len = dest.len(), "bridging partial head unit");
            let unit = align_down(pos, align);
            self.base.read(unit, scratch)?;
            let lo = (pos - unit) as usize;
            let hi = usize::min(self.alignment, lo + dest.len());
            let n = hi - lo;
            dest[..n].copy_from_slice(&scratch[lo..hi]);
            pos += n as i64;
            filled = n;
        }

        // Aligned core, forwarded straight into `dest`.
        let core_end = align_down(end, align);
        if pos < core_end {
            let n = (core_end - pos) as usize;
            self.base.read(pos, &mut dest[filled..filled + n])?;
            pos += n as i64;
            filled += n;
        }

        // Tail partial unit.
        if filled < dest.len() {
            let n = dest.len() - filled;
            self.base.read(pos, scratch)?;
            dest[filled..].copy_from_slice(&scratch[..n]);
        }
        Ok(())
    }

    /// Write `src` to `[offset, offset + src.len())` using `scratch` for
    /// partial units.
    ///
    /// Same scratch contract as [`read_with`](Self::read_with). Partial
    /// units are read, patched, and written back whole.
    pub fn write_with(&self, offset: i64, src: &[u8], scratch: &mut [u8]) -> Result<()> {
        assert!(
            scratch.len() >= self.alignment,
            "scratch buffer must cover one alignment unit"
        );
        if src.is_empty() {
            return Ok(());
        }
        if offset < 0 {
            return Err(Error::InvalidRange);
        }
        let align = self.alignment as i64;
        let end = offset
            .checked_add(src.len() as i64)
            .ok_or(Error::InvalidRange)?;
        let scratch = &mut scratch[..self.alignment];

        let mut pos = offset;
        let mut taken = 0usize;

        // Head partial unit: read-modify-write.
        if pos % align != 0 {
            trace!(offset, len = src.len(), "read-modify-write of partial head unit");
            let unit = align_down(pos, align);
            self.base.read(unit, scratch)?;
            let lo = (pos - unit) as usize;
            let hi = usize::min(self.alignment, lo + src.len());
            let n = hi - lo;
            scratch[lo..hi].copy_from_slice(&src[..n]);
            self.base.write(unit, scratch)?;
            pos += n as i64;
            taken = n;
        }

        // Aligned core.
        let core_end = align_down(end, align);
        if pos < core_end {
            let n = (core_end - pos) as usize;
            self.base.write(pos, &src[taken..taken + n])?;
            pos += n as i64;
            taken += n;
        }

        // Tail partial unit: read-modify-write.
        if taken < src.len() {
            let n = src.len() - taken;
            self.base.read(pos, scratch)?;
            scratch[..n].copy_from_slice(&src[taken..]);
            self.base.write(pos, scratch)?;
        }
        Ok(())
    }
}

impl<S: Storage> Storage for AlignedStorage<S> {
    fn read(&self, offset: i64, dest: &mut [u8]) -> Result<()> {
        let mut scratch = vec![0u8; self.alignment];
        self.read_with(offset, dest, &mut scratch)
    }

    fn write(&self, offset: i64, src: &[u8]) -> Result<()> {
        let mut scratch = vec![0u8; self.alignment];
        self.write_with(offset, src, &mut scratch)
    }

    fn flush(&self) -> Result<()> {
        self.base.flush()
    }

    fn len(&self) -> Result<i64> {
        self.base.len()
    }

    fn set_len(&self, size: i64) -> Result<()> {
        self.base.set_len(size)
    }
}
