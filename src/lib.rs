//! Vaultarq crypt - password-based authenticated encryption
//!
//! A password and arbitrary plaintext become a single portable text blob
//! (`salt:nonce:tag:ciphertext`, base64 fields) that only the same password
//! can open. Keys are derived with Argon2id; data is sealed with AES-256-GCM.
//!
//! ```no_run
//! use vaultarq_crypt::secretcrypt;
//!
//! let blob = secretcrypt::encrypt(b"correct-horse", b"hello world")?;
//! let plaintext = secretcrypt::decrypt(b"correct-horse", &blob)?;
//! assert_eq!(plaintext, b"hello world");
//! # Ok::<(), vaultarq_crypt::error::VaultarqError>(())
//! ```
//!
//! Each call spends roughly 64 MiB and a noticeable fraction of a second in
//! key derivation. Calls share no state and may run concurrently; bound the
//! concurrency to bound memory.

#![forbid(unsafe_code)]

pub mod blob;
pub mod error;
pub mod file_ops;
pub mod kdf;
pub mod passphrase;
pub mod secretcrypt;

pub use error::{ErrorCategory, ErrorKind, Result, VaultarqError};
