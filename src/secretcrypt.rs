//! Encryption/decryption using Argon2id + AES-256-GCM
//!
//! This module implements password-based encryption using:
//! - Argon2id for key derivation from password (see [`crate::kdf`])
//! - AES-256-GCM for authenticated encryption, with no associated data
//!
//! Every call draws a fresh salt and a fresh nonce from the OS random
//! source. Since the key is derived from the salt, a fresh salt per call
//! also means a fresh key per call, so a nonce is never reused under the
//! same key.
//!
//! The output is a [`Blob`] rendered as text: `salt:nonce:tag:ciphertext`.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use rand::rngs::OsRng;
use tracing::{debug, instrument};

use crate::blob::{Blob, NONCE_LEN, TAG_LEN};
use crate::error::{ErrorCategory, ErrorKind, Result, VaultarqError};
use crate::kdf::{self, DerivedKey, SALT_LEN};

/// The single message reported for any tag verification failure.
pub const AUTHENTICATION_FAILED_MSG: &str =
    "decryption failed: incorrect password or corrupted data";

fn cipher_for(key: &DerivedKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()))
}

fn fill_random(buf: &mut [u8], what: &str) -> Result<()> {
    OsRng.try_fill_bytes(buf).map_err(|e| {
        VaultarqError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::RandomUnavailable,
            format!("failed to generate random {}", what),
            e,
        )
    })
}

/// Encrypt plaintext with a password using random salt and nonce
///
/// Returns the blob text: `salt:nonce:tag:ciphertext`, each field base64.
pub fn encrypt(password: &[u8], plaintext: &[u8]) -> Result<String> {
    let mut salt = [0u8; SALT_LEN];
    fill_random(&mut salt, "salt")?;

    let mut nonce = [0u8; NONCE_LEN];
    fill_random(&mut nonce, "nonce")?;

    encrypt_deterministic(password, plaintext, &salt, &nonce)
}

/// Encrypt plaintext with a password using provided salt and nonce
///
/// This function is ONLY for testing purposes to generate deterministic output.
/// NEVER use this in production - always use `encrypt()` which generates random salt/nonce.
pub fn encrypt_deterministic(
    password: &[u8],
    plaintext: &[u8],
    salt: &[u8; SALT_LEN],
    nonce: &[u8; NONCE_LEN],
) -> Result<String> {
    Ok(encrypt_blob(password, plaintext, salt, nonce)?.render())
}

/// Like [`encrypt_deterministic`], but returns the unrendered [`Blob`].
#[instrument(level = "debug", skip_all, fields(plaintext_len = plaintext.len()))]
pub fn encrypt_blob(
    password: &[u8],
    plaintext: &[u8],
    salt: &[u8; SALT_LEN],
    nonce: &[u8; NONCE_LEN],
) -> Result<Blob> {
    let key = kdf::derive_key(password, salt)?;
    let cipher = cipher_for(&key);

    // aes-gcm appends the tag to the ciphertext
    let mut sealed = cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| {
            VaultarqError::with_kind(
                ErrorCategory::User,
                ErrorKind::EncryptionFailed,
                format!("encryption failed: {}", e),
            )
        })?;

    let tag_start = sealed.len() - TAG_LEN;
    let tag: [u8; TAG_LEN] = sealed[tag_start..].try_into().map_err(|_| {
        VaultarqError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::EncryptionFailed,
            "cipher output shorter than authentication tag",
        )
    })?;
    sealed.truncate(tag_start);

    debug!(ciphertext_len = sealed.len(), "sealed plaintext");

    Ok(Blob {
        salt: *salt,
        nonce: *nonce,
        tag,
        ciphertext: sealed,
    })
}

/// Decrypt blob text with a password
///
/// A malformed blob is rejected before any key derivation takes place.
/// Plaintext is only returned once the tag has been verified.
pub fn decrypt(password: &[u8], blob: &str) -> Result<Vec<u8>> {
    let blob = Blob::parse(blob)?;
    decrypt_blob(password, &blob)
}

/// Decrypt an already parsed [`Blob`].
#[instrument(level = "debug", skip_all, fields(ciphertext_len = blob.ciphertext.len()))]
pub fn decrypt_blob(password: &[u8], blob: &Blob) -> Result<Vec<u8>> {
    let key = kdf::derive_key(password, &blob.salt)?;
    let cipher = cipher_for(&key);

    let mut sealed = Vec::with_capacity(blob.ciphertext.len() + TAG_LEN);
    sealed.extend_from_slice(&blob.ciphertext);
    sealed.extend_from_slice(&blob.tag);

    // Wrong password and tampering are deliberately indistinguishable.
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&blob.nonce), sealed.as_slice())
        .map_err(|_| {
            VaultarqError::with_kind(
                ErrorCategory::User,
                ErrorKind::AuthenticationFailed,
                AUTHENTICATION_FAILED_MSG,
            )
        })?;

    debug!(plaintext_len = plaintext.len(), "opened blob");
    Ok(plaintext)
}

/// Decrypt blob text and interpret the plaintext as UTF-8.
pub fn decrypt_to_string(password: &[u8], blob: &str) -> Result<String> {
    let plaintext = decrypt(password, blob)?;
    String::from_utf8(plaintext).map_err(|e| {
        VaultarqError::with_source(ErrorCategory::User, "decrypted data is not valid UTF-8", e)
    })
}
