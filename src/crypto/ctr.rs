//! AES-128-CTR stream transform with offset-derived counters.
//!
//! CTR mode turns the block cipher into a stream cipher by encrypting a
//! counter value per 16-byte block and XORing the result into the data.
//! Encryption and decryption are the same operation.
//!
//! ## Counter layout
//! ```text
//! [0..8)  upper value  - caller-chosen, constant for the whole storage
//!         [0..4)  secure value (per-section nonce material)
//!         [4..8)  generation   - substituted per subsection by the
//!                               extended counter storage
//! [8..16) block index  - offset / 16, big-endian
//! ```
//!
//! The counter is derived from the absolute byte offset on every call; it
//! is never accumulated across calls, so concurrent callers and repeated
//! reads of the same range always see the same keystream. Within one call
//! a local counter increments across consecutive blocks.

use aes::Aes128;
use aes::cipher::{BlockEncrypt, KeyInit};

use crate::utils::xor_block;
use crate::{Error, Result};

use super::xts::BLOCK_SIZE;

/// AES-128-CTR transform.
///
/// Owns one 128-bit key and the 8-byte upper half of the IV template.
/// Holds no per-call state: one instance may be shared freely across
/// threads.
pub struct CtrCipher {
    cipher: Aes128,
    upper: [u8; 8],
}

impl CtrCipher {
    /// Create a cipher from a 16-byte key and a 16-byte IV template.
    ///
    /// `iv[0..8)` is the constant upper value; `iv[8..16)` is the counter
    /// portion, conventionally zero at construction and always re-derived
    /// from the offset per call. Wrong lengths fail with
    /// [`Error::InvalidArgument`].
    pub fn new(key: &[u8], iv: &[u8]) -> Result<Self> {
        let cipher = Aes128::new_from_slice(key)
            .map_err(|_| Error::InvalidArgument("CTR key must be 16 bytes"))?;
        let iv: [u8; 16] = iv
            .try_into()
            .map_err(|_| Error::InvalidArgument("CTR IV must be 16 bytes"))?;
        let mut upper = [0u8; 8];
        upper.copy_from_slice(&iv[..8]);
        Ok(Self { cipher, upper })
    }

    /// The constant upper half of the counter.
    pub fn upper(&self) -> [u8; 8] {
        self.upper
    }

    /// XOR the keystream for `[offset, offset + buf.len())` into `buf`.
    ///
    /// `offset` is the absolute byte position of `buf[0]` in the storage
    /// and must be 16-byte aligned (enforced by the storage layer; a
    /// violation here is a caller bug and panics). The length may end
    /// mid-block; the trailing keystream bytes are simply discarded.
    pub fn apply(&self, offset: u64, buf: &mut [u8]) {
        self.apply_with_upper(self.upper, offset, buf);
    }

    /// Like [`apply`](Self::apply) with the upper counter half replaced
    /// for this call only. Used by the extended counter storage to
    /// substitute the per-subsection generation.
    pub(crate) fn apply_with_upper(&self, upper: [u8; 8], offset: u64, buf: &mut [u8]) {
        assert!(
            offset % BLOCK_SIZE as u64 == 0,
            "CTR offsets must be 16-byte aligned"
        );

        // Compose the starting counter on the stack: upper half as given,
        // lower half the big-endian block index.
        let mut iv = [0u8; BLOCK_SIZE];
        iv[..8].copy_from_slice(&upper);
        iv[8..].copy_from_slice(&(offset / BLOCK_SIZE as u64).to_be_bytes());
        let mut counter = u128::from_be_bytes(iv);

        for chunk in buf.chunks_mut(BLOCK_SIZE) {
            let mut keystream = counter.to_be_bytes();
            self.cipher
                .encrypt_block(aes::Block::from_mut_slice(&mut keystream));
            xor_block(chunk, &keystream);
            counter = counter.wrapping_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_key_and_iv() {
        assert!(matches!(
            CtrCipher::new(&[0u8; 15], &[0u8; 16]),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            CtrCipher::new(&[0u8; 16], &[0u8; 8]),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn round_trip_is_symmetric() {
        let ctr = CtrCipher::new(&[0x42u8; 16], &[0x99u8; 16]).unwrap();
        let plain: Vec<u8> = (0..0x80).map(|i| i as u8).collect();
        let mut buf = plain.clone();
        ctr.apply(0x40, &mut buf);
        assert_ne!(buf, plain);
        ctr.apply(0x40, &mut buf);
        assert_eq!(buf, plain);
    }

    #[test]
    fn keystream_depends_on_offset_not_call_history() {
        let ctr = CtrCipher::new(&[7u8; 16], &[0u8; 16]).unwrap();
        // One call over two blocks...
        let mut joined = [0u8; 32];
        ctr.apply(0x100, &mut joined);
        // ...equals two independent calls over each block.
        let mut split = [0u8; 32];
        ctr.apply(0x100, &mut split[..16]);
        ctr.apply(0x110, &mut split[16..]);
        assert_eq!(joined, split);
    }

    #[test]
    fn known_vector_counters() {
        // upper = 0x0102030405060708, zero key: block n must be the
        // AES-ECB encryption of 0x0102030405060708_000000000000000n.
        let key = [0u8; 16];
        let mut iv = [0u8; 16];
        iv[..8].copy_from_slice(&0x0102030405060708u64.to_be_bytes());
        let ctr = CtrCipher::new(&key, &iv).unwrap();

        let ecb = Aes128::new_from_slice(&key).unwrap();
        for block_index in [0u64, 1] {
            let mut expected = [0u8; 16];
            expected[..8].copy_from_slice(&0x0102030405060708u64.to_be_bytes());
            expected[8..].copy_from_slice(&block_index.to_be_bytes());
            ecb.encrypt_block(aes::Block::from_mut_slice(&mut expected));

            // Encrypting zeroes exposes the raw keystream.
            let mut buf = [0u8; 16];
            ctr.apply(block_index * 16, &mut buf);
            assert_eq!(buf, expected, "block {block_index}");
        }
    }

    #[test]
    fn substituted_upper_changes_keystream() {
        let ctr = CtrCipher::new(&[1u8; 16], &[0u8; 16]).unwrap();
        let mut a = [0u8; 16];
        let mut b = [0u8; 16];
        ctr.apply_with_upper([0, 0, 0, 0, 0, 0, 0, 1], 0, &mut a);
        ctr.apply_with_upper([0, 0, 0, 0, 0, 0, 0, 2], 0, &mut b);
        assert_ne!(a, b);
    }
}
