//! **hacstor** - encrypted storage virtualization for Nintendo content
//! archives.
//!
//! Container files (NCAs, partitions, save data) hold regions encrypted
//! with AES-XTS or AES-CTR. This crate exposes those regions as plain
//! random-access byte stores: cipher decorators stack on top of a base
//! [`storage::Storage`] and transform data on every access, so higher
//! layers only ever see plaintext.
//!
//! # Layers
//! | Module | Purpose |
//! |--------|---------|
//! | [`storage`] | The [`storage::Storage`] contract, file/memory stores, cipher decorators, alignment bridge |
//! | [`crypto`]  | AES-XTS and AES-CTR transforms with Nintendo counter layouts |
//!
//! # Example
//! ```no_run
//! use hacstor::crypto::xts::{TweakOrder, XtsCipher};
//! use hacstor::storage::{AlignedStorage, FileStorage, Storage, XtsStorage};
//!
//! # fn main() -> hacstor::Result<()> {
//! let cipher = XtsCipher::new(&[0u8; 16], &[1u8; 16], 0x200, TweakOrder::Nintendo)?;
//! let store = AlignedStorage::new(
//!     XtsStorage::new(FileStorage::open("header.bin")?, cipher),
//!     0x200,
//! )?;
//!
//! let mut magic = [0u8; 4];
//! store.read(0x200, &mut magic)?;
//! # Ok(())
//! # }
//! ```

pub mod crypto;
pub mod error;
pub mod storage;
pub(crate) mod utils;

pub use error::{Error, Result};
pub use storage::Storage;
