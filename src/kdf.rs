//! Password-based key derivation using Argon2id
//!
//! The cost parameters are fixed and are not recorded in the blob: every
//! blob ever produced assumes exactly this set, so changing any constant
//! below makes all existing blobs undecryptable.

use argon2::{Algorithm, Argon2, Params, Version};
use tracing::debug;
use zeroize::ZeroizeOnDrop;

use crate::error::{ErrorCategory, ErrorKind, Result, VaultarqError};

/// Length of salt in bytes
pub const SALT_LEN: usize = 16;

/// Length of derived key in bytes (AES-256)
pub const KEY_LEN: usize = 32;

/// Argon2 memory cost in KiB (64 MiB)
pub const MEMORY_COST_KIB: u32 = 65536;

/// Argon2 time cost (iterations)
pub const TIME_COST: u32 = 3;

/// Argon2 degree of parallelism
pub const PARALLELISM: u32 = 1;

/// A symmetric key derived from a password. Wiped from memory on drop.
#[derive(ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_LEN],
}

impl DerivedKey {
    /// Raw key bytes. Use only for immediate cipher construction.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// The fixed Argon2 parameter set shared by encryption and decryption.
pub fn params() -> Result<Params> {
    Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, Some(KEY_LEN)).map_err(|e| {
        VaultarqError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::KeyDerivationFailed,
            format!("invalid argon2 parameters: {}", e),
        )
    })
}

/// Derive a 32-byte key from a password and salt using Argon2id.
///
/// Deterministic: the same password and salt always yield the same key,
/// which is what lets decryption recover the key from the embedded salt.
pub fn derive_key(password: &[u8], salt: &[u8; SALT_LEN]) -> Result<DerivedKey> {
    let params = params()?;
    debug!(
        m_cost_kib = params.m_cost(),
        t_cost = params.t_cost(),
        p_cost = params.p_cost(),
        "deriving key"
    );

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = DerivedKey { key: [0u8; KEY_LEN] };
    argon2
        .hash_password_into(password, salt, &mut key.key)
        .map_err(|e| {
            VaultarqError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::KeyDerivationFailed,
                format!("argon2 key derivation failed: {}", e),
            )
        })?;

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_is_deterministic() {
        let salt = [7u8; SALT_LEN];

        let k1 = derive_key(b"correct-horse", &salt).unwrap();
        let k2 = derive_key(b"correct-horse", &salt).unwrap();

        assert_eq!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn test_different_salt_different_key() {
        let k1 = derive_key(b"correct-horse", &[1u8; SALT_LEN]).unwrap();
        let k2 = derive_key(b"correct-horse", &[2u8; SALT_LEN]).unwrap();

        assert_ne!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn test_different_password_different_key() {
        let salt = [3u8; SALT_LEN];

        let k1 = derive_key(b"correct-horse", &salt).unwrap();
        let k2 = derive_key(b"wrong-password", &salt).unwrap();

        assert_ne!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn test_empty_password_is_accepted() {
        let key = derive_key(b"", &[0u8; SALT_LEN]).unwrap();
        assert_eq!(key.as_bytes().len(), KEY_LEN);
    }

    #[test]
    fn test_fixed_params() {
        let p = params().unwrap();
        assert_eq!(p.m_cost(), 65536);
        assert_eq!(p.t_cost(), 3);
        assert_eq!(p.p_cost(), 1);
        assert_eq!(p.output_len(), Some(32));
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = derive_key(b"hunter2", &[9u8; SALT_LEN]).unwrap();
        let shown = format!("{:?}", key);

        assert_eq!(shown, "DerivedKey { key: \"[REDACTED]\" }");
    }
}
