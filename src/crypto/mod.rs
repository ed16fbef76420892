//! Cipher transforms for Nintendo content storage.
//!
//! This module contains the block-cipher transforms applied by the
//! storage decorators in [`crate::storage`]. All types accept
//! already-loaded key material as plain byte slices; key derivation and
//! key-file loading are out of scope.
//!
//! The transforms are built on the RustCrypto [`aes`] block primitive;
//! the mode logic (tweak arithmetic, ciphertext stealing, counter
//! composition) lives here because Nintendo's counter layouts are not
//! served by off-the-shelf mode crates.
//!
//! ## Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`xts`] | AES-128-XTS sector transform with ciphertext stealing |
//! | [`ctr`] | AES-128-CTR stream transform with offset-derived counters |

pub mod ctr;
pub mod xts;

pub use ctr::CtrCipher;
pub use xts::{Direction, TweakOrder, XtsCipher};
