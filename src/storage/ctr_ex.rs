//! AES-CTR storage with per-subsection counter generations.
//!
//! Patched content stores its regions under distinct counter
//! generations: the 32-bit generation of the subsection covering an
//! offset is substituted into bytes `[4..8)` of the counter before the
//! keystream for that offset is produced. A sorted table of
//! `(offset, generation)` entries describes the subsection layout.
//!
//! The view is read-only. Patches are assembled out-of-band; writing
//! through a generation table has no defined meaning.

use std::io::Read;

use tracing::{debug, warn};

use crate::crypto::CtrCipher;
use crate::crypto::xts::BLOCK_SIZE;
use crate::utils::{le_i64, le_u32};
use crate::{Error, Result};

use super::{Storage, check_range};

/// One subsection: the counter generation in force from `offset` up to
/// the next entry's offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterEntry {
    /// Absolute byte offset where this subsection starts. Block-aligned.
    pub offset: i64,
    /// Value substituted into counter bytes `[4..8)`, big-endian.
    pub generation: u32,
}

/// Sorted subsection table for a [`CtrExStorage`].
///
/// Construction validates the table shape: at least one entry, the
/// first at offset zero, offsets block-aligned and strictly increasing.
/// Whether an entry lies within the storage's logical end is checked at
/// read time, when the entry is actually consulted.
pub struct CounterIndex {
    entries: Vec<CounterEntry>,
    end_offset: i64,
}

impl CounterIndex {
    /// Build an index from an entry table and the storage's logical end.
    pub fn new(entries: Vec<CounterEntry>, end_offset: i64) -> Result<Self> {
        if entries.is_empty() {
            return Err(Error::InvalidArgument(
                "counter index must contain at least one entry",
            ));
        }
        if end_offset <= 0 {
            return Err(Error::InvalidArgument(
                "counter index end offset must be positive",
            ));
        }
        if entries[0].offset != 0 {
            return Err(Error::InvalidIndirectEntryOffset);
        }
        let mut prev = entries[0].offset;
        for entry in &entries[1..] {
            if entry.offset <= prev || entry.offset % BLOCK_SIZE as i64 != 0 {
                return Err(Error::InvalidIndirectEntryOffset);
            }
            prev = entry.offset;
        }
        Ok(Self {
            entries,
            end_offset,
        })
    }

    /// Parse `entry_count` fixed 16-byte records from `r`.
    ///
    /// Record layout, all little-endian: `offset: i64`, four reserved
    /// bytes, `generation: u32`.
    pub fn parse<R: Read>(r: &mut R, entry_count: usize, end_offset: i64) -> Result<Self> {
        let mut entries = Vec::with_capacity(entry_count);
        for _ in 0..entry_count {
            let offset = le_i64(r)?;
            let _reserved = le_u32(r)?;
            let generation = le_u32(r)?;
            entries.push(CounterEntry { offset, generation });
        }
        Self::new(entries, end_offset)
    }

    /// The validated entry table, ascending by offset.
    pub fn entries(&self) -> &[CounterEntry] {
        &self.entries
    }

    /// Exclusive end of the last subsection; the storage's logical size.
    pub fn end_offset(&self) -> i64 {
        self.end_offset
    }

    /// Index of the entry covering `offset`.
    ///
    /// `offset` must be non-negative; the first entry starts at zero, so
    /// a covering entry always exists.
    pub fn find_floor(&self, offset: i64) -> usize {
        self.entries.partition_point(|e| e.offset <= offset) - 1
    }
}

/// A read-only [`Storage`] over CTR data whose counter generation
/// changes per subsection.
///
/// Accesses must be block-aligned, like [`super::CtrStorage`]; the
/// logical size is the index's end offset regardless of how large the
/// base storage is.
pub struct CtrExStorage<S> {
    base: S,
    cipher: CtrCipher,
    index: CounterIndex,
}

impl<S: Storage> CtrExStorage<S> {
    /// Decorate `base` with `cipher`, dividing it per `index`.
    pub fn new(base: S, cipher: CtrCipher, index: CounterIndex) -> Self {
        debug!(
            subsections = index.entries().len(),
            end_offset = index.end_offset(),
            "opening extended CTR storage view"
        );
        Self {
            base,
            cipher,
            index,
        }
    }

    /// Read and decrypt subsection by subsection. The caller clears
    /// `dest` if this fails partway through.
    fn read_subsections(&self, offset: i64, dest: &mut [u8]) -> Result<()> {
        let mut idx = self.index.find_floor(offset);
        let mut pos = offset;
        let mut filled = 0usize;
        while filled < dest.len() {
            let sub_end = match self.index.entries().get(idx + 1) {
                Some(next) => next.offset,
                None => self.index.end_offset(),
            };
            if sub_end > self.index.end_offset() {
                warn!(
                    entry_offset = sub_end,
                    end_offset = self.index.end_offset(),
                    "counter index entry lies beyond the storage end"
                );
                return Err(Error::InvalidIndirectEntryOffset);
            }

            let chunk_len = ((sub_end - pos) as usize).min(dest.len() - filled);
            let chunk = &mut dest[filled..filled + chunk_len];
            self.base.read(pos, chunk)?;

            let mut upper = self.cipher.upper();
            upper[4..8].copy_from_slice(&self.index.entries()[idx].generation.to_be_bytes());
            self.cipher.apply_with_upper(upper, pos as u64, chunk);

            pos += chunk_len as i64;
            filled += chunk_len;
            idx += 1;
        }
        Ok(())
    }
}

impl<S: Storage> Storage for CtrExStorage<S> {
    fn read(&self, offset: i64, dest: &mut [u8]) -> Result<()> {
        if dest.is_empty() {
            return Ok(());
        }
        if offset % BLOCK_SIZE as i64 != 0 || dest.len() % BLOCK_SIZE != 0 {
            return Err(Error::InvalidArgument(
                "extended CTR accesses must be block-aligned",
            ));
        }
        check_range(offset, dest.len(), self.index.end_offset())?;
        if let Err(e) = self.read_subsections(offset, dest) {
            // Never hand back partially-transformed bytes as plaintext.
            dest.fill(0);
            return Err(e);
        }
        Ok(())
    }

    fn write(&self, _offset: i64, _src: &[u8]) -> Result<()> {
        Err(Error::UnsupportedWrite)
    }

    fn flush(&self) -> Result<()> {
        self.base.flush()
    }

    fn len(&self) -> Result<i64> {
        Ok(self.index.end_offset())
    }

    fn set_len(&self, _size: i64) -> Result<()> {
        Err(Error::UnsupportedSetSize)
    }
}
