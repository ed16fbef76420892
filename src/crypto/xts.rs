//! AES-128-XTS sector transform with ciphertext stealing.
//!
//! XTS (XEX-based Tweaked-codebook mode with ciphertext Stealing, IEEE
//! 1619-2007) encrypts fixed-size sectors so that identical plaintext at
//! different sector indices produces different ciphertext, while every
//! sector stays independently decryptable for random access.
//!
//! ## Tweak
//! * Tweak 0 for a sector is the AES-ECB encryption of the sector index
//!   under the tweak key. The index is serialized little-endian per the
//!   standard; NCA headers use Nintendo's byte-reversed variant, selected
//!   with [`TweakOrder::Nintendo`].
//! * Each following 16-byte block multiplies the tweak by x in GF(2^128)
//!   mod x^128 + x^7 + x^2 + x + 1 (0x87 feedback on overflow).
//!
//! ## Ciphertext stealing
//! A final sector whose length is not a multiple of 16 borrows bytes from
//! its last full block instead of padding. Encryption and decryption are
//! *not* symmetric in which block is processed first; see
//! [`XtsCipher::transform`].

use aes::Aes128;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};

use crate::utils::xor_block;
use crate::{Error, Result};

/// AES block size in bytes. Sector sizes must be a multiple of this.
pub const BLOCK_SIZE: usize = 16;

/// Whether a transform turns plaintext into ciphertext or back.
///
/// Carried as a tagged value (not a bool) because ciphertext stealing
/// swaps blocks in a different order in each direction, and the two
/// branches need to stay individually auditable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

/// Byte order of the sector index inside the 16-byte tweak seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TweakOrder {
    /// Little-endian 128-bit sector index (IEEE 1619).
    #[default]
    Standard,
    /// Big-endian sector index, as used by NCA header sectors.
    Nintendo,
}

/// AES-128-XTS transform over fixed-size sectors.
///
/// Owns the two independent 128-bit keys (data key and tweak key) and the
/// sector size. Holds no per-call state: one instance may be shared
/// freely across threads.
pub struct XtsCipher {
    data_cipher: Aes128,
    tweak_cipher: Aes128,
    sector_size: usize,
    tweak_order: TweakOrder,
}

impl XtsCipher {
    /// Create a cipher from two independent 16-byte keys.
    ///
    /// `sector_size` must be a nonzero multiple of 16. Returns
    /// [`Error::InvalidArgument`] on a wrong-length key or bad sector
    /// size.
    pub fn new(
        key1: &[u8],
        key2: &[u8],
        sector_size: usize,
        tweak_order: TweakOrder,
    ) -> Result<Self> {
        if sector_size == 0 || sector_size % BLOCK_SIZE != 0 {
            return Err(Error::InvalidArgument(
                "XTS sector size must be a nonzero multiple of 16",
            ));
        }
        let data_cipher = Aes128::new_from_slice(key1)
            .map_err(|_| Error::InvalidArgument("XTS data key must be 16 bytes"))?;
        let tweak_cipher = Aes128::new_from_slice(key2)
            .map_err(|_| Error::InvalidArgument("XTS tweak key must be 16 bytes"))?;
        Ok(Self {
            data_cipher,
            tweak_cipher,
            sector_size,
            tweak_order,
        })
    }

    /// Create a cipher from one 32-byte key split into halves:
    /// `key1 = key[0..16]` (data), `key2 = key[16..32]` (tweak).
    ///
    /// This matches the `header_key` convention of NCA headers.
    pub fn from_combined_key(
        key: &[u8],
        sector_size: usize,
        tweak_order: TweakOrder,
    ) -> Result<Self> {
        if key.len() != 32 {
            return Err(Error::InvalidArgument("XTS combined key must be 32 bytes"));
        }
        Self::new(&key[..16], &key[16..], sector_size, tweak_order)
    }

    /// Sector size this cipher was constructed with.
    pub fn sector_size(&self) -> usize {
        self.sector_size
    }

    /// Encrypt or decrypt one logical sector range in place.
    ///
    /// `buf` covers bytes starting at the beginning of sector
    /// `sector_index` and must be either empty, or at least one block
    /// long. A length that is not a multiple of 16 engages ciphertext
    /// stealing on the final two blocks:
    ///
    /// * **Encrypt**: block m-1 is XEX-processed with tweak m-1 first;
    ///   the head of that ciphertext becomes the trailing partial output,
    ///   its tail is spliced after the partial plaintext, and the spliced
    ///   block is processed with tweak m into position m-1.
    /// * **Decrypt**: the mirror image - position m-1 is processed with
    ///   tweak m first, then the splice, then tweak m-1.
    ///
    /// The transform cannot fail after construction; length-contract
    /// violations are caller bugs and panic.
    pub fn transform(&self, buf: &mut [u8], sector_index: u64, direction: Direction) {
        if buf.is_empty() {
            return;
        }
        assert!(
            buf.len() >= BLOCK_SIZE,
            "XTS buffers must cover at least one block"
        );

        let leftover = buf.len() % BLOCK_SIZE;
        // Full blocks processed with the plain XEX loop. When a partial
        // block trails, its predecessor is held back for stealing.
        let lim = if leftover == 0 {
            buf.len() / BLOCK_SIZE
        } else {
            buf.len() / BLOCK_SIZE - 1
        };

        let mut tweak = self.initial_tweak(sector_index);
        for block in buf[..lim * BLOCK_SIZE].chunks_exact_mut(BLOCK_SIZE) {
            self.xex(block, &tweak, direction);
            gf128_mul_x(&mut tweak);
        }

        if leftover != 0 {
            let (last_full, partial) = buf[lim * BLOCK_SIZE..].split_at_mut(BLOCK_SIZE);
            match direction {
                Direction::Encrypt => {
                    // CC = XEX(tweak m-1, P[m-1])
                    let mut stolen = [0u8; BLOCK_SIZE];
                    stolen.copy_from_slice(last_full);
                    self.xex(&mut stolen, &tweak, Direction::Encrypt);
                    // Splice: partial plaintext followed by CC's tail.
                    let mut spliced = [0u8; BLOCK_SIZE];
                    spliced[..leftover].copy_from_slice(partial);
                    spliced[leftover..].copy_from_slice(&stolen[leftover..]);
                    // CC's head is the partial ciphertext output.
                    partial.copy_from_slice(&stolen[..leftover]);
                    // C[m-1] = XEX(tweak m, splice)
                    gf128_mul_x(&mut tweak);
                    self.xex(&mut spliced, &tweak, Direction::Encrypt);
                    last_full.copy_from_slice(&spliced);
                }
                Direction::Decrypt => {
                    // DD = XEX^-1(tweak m, C[m-1]) - tweak m comes first.
                    let mut next_tweak = tweak;
                    gf128_mul_x(&mut next_tweak);
                    let mut stolen = [0u8; BLOCK_SIZE];
                    stolen.copy_from_slice(last_full);
                    self.xex(&mut stolen, &next_tweak, Direction::Decrypt);
                    // Splice: partial ciphertext followed by DD's tail.
                    let mut spliced = [0u8; BLOCK_SIZE];
                    spliced[..leftover].copy_from_slice(partial);
                    spliced[leftover..].copy_from_slice(&stolen[leftover..]);
                    // DD's head is the partial plaintext output.
                    partial.copy_from_slice(&stolen[..leftover]);
                    // P[m-1] = XEX^-1(tweak m-1, splice)
                    self.xex(&mut spliced, &tweak, Direction::Decrypt);
                    last_full.copy_from_slice(&spliced);
                }
            }
        }
    }

    /// Tweak 0 for a sector: the sector index serialized in the
    /// configured byte order, AES-ECB encrypted under the tweak key.
    fn initial_tweak(&self, sector_index: u64) -> [u8; BLOCK_SIZE] {
        let mut tweak = match self.tweak_order {
            TweakOrder::Standard => (sector_index as u128).to_le_bytes(),
            TweakOrder::Nintendo => (sector_index as u128).to_be_bytes(),
        };
        self.tweak_cipher
            .encrypt_block(aes::Block::from_mut_slice(&mut tweak));
        tweak
    }

    /// XEX on one 16-byte block: XOR tweak, block cipher, XOR tweak.
    fn xex(&self, block: &mut [u8], tweak: &[u8; BLOCK_SIZE], direction: Direction) {
        xor_block(block, tweak);
        let b = aes::Block::from_mut_slice(block);
        match direction {
            Direction::Encrypt => self.data_cipher.encrypt_block(b),
            Direction::Decrypt => self.data_cipher.decrypt_block(b),
        }
        xor_block(block, tweak);
    }
}

/// Multiply a 128-bit tweak by x in GF(2^128).
///
/// The tweak bytes are the little-endian representation of the field
/// element: shift the whole value left one bit and, if the top bit fell
/// off, XOR the low byte with the 0x87 reduction feedback.
#[inline]
fn gf128_mul_x(tweak: &mut [u8; BLOCK_SIZE]) {
    let v = u128::from_le_bytes(*tweak);
    let mut shifted = v << 1;
    if v >> 127 != 0 {
        shifted ^= 0x87;
    }
    *tweak = shifted.to_le_bytes();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher(sector_size: usize) -> XtsCipher {
        XtsCipher::new(&[0x11u8; 16], &[0x22u8; 16], sector_size, TweakOrder::Standard).unwrap()
    }

    #[test]
    fn rejects_bad_construction() {
        assert!(matches!(
            XtsCipher::new(&[0u8; 15], &[0u8; 16], 0x200, TweakOrder::Standard),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            XtsCipher::new(&[0u8; 16], &[0u8; 16], 0x201, TweakOrder::Standard),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            XtsCipher::new(&[0u8; 16], &[0u8; 16], 0, TweakOrder::Standard),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            XtsCipher::from_combined_key(&[0u8; 33], 0x200, TweakOrder::Standard),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn round_trip_full_sector() {
        let xts = cipher(0x200);
        let plain: Vec<u8> = (0..0x200).map(|i| i as u8).collect();
        let mut buf = plain.clone();
        xts.transform(&mut buf, 7, Direction::Encrypt);
        assert_ne!(buf, plain);
        xts.transform(&mut buf, 7, Direction::Decrypt);
        assert_eq!(buf, plain);
    }

    #[test]
    fn round_trip_single_block() {
        let xts = cipher(16);
        let plain = [0xA5u8; 16];
        let mut buf = plain;
        xts.transform(&mut buf, 0, Direction::Encrypt);
        xts.transform(&mut buf, 0, Direction::Decrypt);
        assert_eq!(buf, plain);
    }

    #[test]
    fn round_trip_ciphertext_stealing() {
        let xts = cipher(0x200);
        // Every partial tail length from 1 to 15 over one full block.
        for tail in 1..16usize {
            let plain: Vec<u8> = (0..16 + tail).map(|i| (i * 3) as u8).collect();
            let mut buf = plain.clone();
            xts.transform(&mut buf, 3, Direction::Encrypt);
            assert_ne!(buf, plain, "tail {tail}");
            xts.transform(&mut buf, 3, Direction::Decrypt);
            assert_eq!(buf, plain, "tail {tail}");
        }
        // And over several full blocks.
        let plain: Vec<u8> = (0..0x100 + 9).map(|i| (i ^ 0x5C) as u8).collect();
        let mut buf = plain.clone();
        xts.transform(&mut buf, 12, Direction::Encrypt);
        xts.transform(&mut buf, 12, Direction::Decrypt);
        assert_eq!(buf, plain);
    }

    #[test]
    fn stealing_keeps_full_block_prefix_identical() {
        // The blocks before the final two are unaffected by stealing.
        let xts = cipher(0x200);
        let plain = [0x77u8; 48 + 5];
        let mut with_tail = plain.to_vec();
        xts.transform(&mut with_tail, 1, Direction::Encrypt);
        let mut without_tail = plain[..32].to_vec();
        xts.transform(&mut without_tail, 1, Direction::Encrypt);
        assert_eq!(with_tail[..32], without_tail[..32]);
    }

    #[test]
    fn tweak_distinctness_across_sectors() {
        let xts = cipher(0x200);
        let plain = [0u8; 0x200];
        let mut s0 = plain;
        let mut s1 = plain;
        xts.transform(&mut s0, 0, Direction::Encrypt);
        xts.transform(&mut s1, 1, Direction::Encrypt);
        assert_ne!(s0[..], s1[..]);
    }

    #[test]
    fn nintendo_tweak_order_differs_from_standard() {
        let std_xts = cipher(0x200);
        let nin_xts =
            XtsCipher::new(&[0x11u8; 16], &[0x22u8; 16], 0x200, TweakOrder::Nintendo).unwrap();
        let mut a = [0u8; 0x200];
        let mut b = [0u8; 0x200];
        std_xts.transform(&mut a, 1, Direction::Encrypt);
        nin_xts.transform(&mut b, 1, Direction::Encrypt);
        assert_ne!(a[..], b[..]);
        // Sector 0 serializes to all zeroes in both orders.
        let mut c = [0u8; 0x200];
        let mut d = [0u8; 0x200];
        std_xts.transform(&mut c, 0, Direction::Encrypt);
        nin_xts.transform(&mut d, 0, Direction::Encrypt);
        assert_eq!(c[..], d[..]);
    }

    #[test]
    fn gf128_shift_and_feedback() {
        let mut t = [0u8; 16];
        t[0] = 1;
        gf128_mul_x(&mut t);
        assert_eq!(t[0], 2);

        let mut t = [0u8; 16];
        t[15] = 0x80;
        gf128_mul_x(&mut t);
        assert_eq!(t[0], 0x87);
        assert_eq!(t[15], 0x00);
    }
}
