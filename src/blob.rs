//! Text encoding of encrypted data
//!
//! A blob is a single line of ASCII text:
//!
//! ```text
//! <base64 salt>:<base64 nonce>:<base64 tag>:<base64 ciphertext>
//! ```
//!
//! Each field uses the standard base64 alphabet with padding. The field
//! order and separator are fixed; blobs produced by other implementations
//! of the scheme must parse here byte-for-byte, and vice versa.
//!
//! The format is:
//! - Free of whitespace (including newlines)
//! - Safe to store in a text file or environment variable
//! - Unversioned: the Argon2 parameters are implied, not stored

use std::fmt;
use std::str::FromStr;

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::error::{ErrorCategory, ErrorKind, Result, VaultarqError};
use crate::kdf::SALT_LEN;

/// Length of the AES-GCM nonce in bytes
pub const NONCE_LEN: usize = 12;

/// Length of the AES-GCM authentication tag in bytes
pub const TAG_LEN: usize = 16;

/// Separator between the four fields
pub const FIELD_SEPARATOR: char = ':';

const FIELD_COUNT: usize = 4;

/// The four components of an encrypted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
    pub tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

impl Blob {
    /// Parse blob text. Never performs key derivation.
    ///
    /// The ciphertext field may be empty (empty plaintext); the other three
    /// must be present and decode to exactly their fixed lengths.
    pub fn parse(text: &str) -> Result<Self> {
        let fields: Vec<&str> = text.split(FIELD_SEPARATOR).collect();
        if fields.len() != FIELD_COUNT {
            return Err(malformed(format!(
                "invalid encrypted data format: expected {} fields separated by '{}', found {}",
                FIELD_COUNT,
                FIELD_SEPARATOR,
                fields.len()
            )));
        }

        let salt = decode_fixed::<SALT_LEN>("salt", fields[0])?;
        let nonce = decode_fixed::<NONCE_LEN>("nonce", fields[1])?;
        let tag = decode_fixed::<TAG_LEN>("tag", fields[2])?;
        let ciphertext = decode_field("ciphertext", fields[3])?;

        Ok(Self {
            salt,
            nonce,
            tag,
            ciphertext,
        })
    }

    /// Render the blob as text, without a trailing newline.
    pub fn render(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}{sep}{}",
            STANDARD.encode(self.salt),
            STANDARD.encode(self.nonce),
            STANDARD.encode(self.tag),
            STANDARD.encode(&self.ciphertext),
            sep = FIELD_SEPARATOR
        )
    }
}

impl fmt::Display for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl FromStr for Blob {
    type Err = VaultarqError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn decode_field(name: &str, field: &str) -> Result<Vec<u8>> {
    STANDARD.decode(field).map_err(|e| {
        VaultarqError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::MalformedBlob,
            format!("invalid encrypted data format: {} is not valid base64", name),
            e,
        )
    })
}

fn decode_fixed<const N: usize>(name: &str, field: &str) -> Result<[u8; N]> {
    if field.is_empty() {
        return Err(malformed(format!(
            "invalid encrypted data format: {} field is empty",
            name
        )));
    }
    let bytes = decode_field(name, field)?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| {
        malformed(format!(
            "invalid encrypted data format: {} must be {} bytes, got {}",
            name, N, len
        ))
    })
}

fn malformed(msg: String) -> VaultarqError {
    VaultarqError::with_kind(ErrorCategory::User, ErrorKind::MalformedBlob, msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Blob {
        Blob {
            salt: [0x42; SALT_LEN],
            nonce: [0x24; NONCE_LEN],
            tag: [0x01; TAG_LEN],
            ciphertext: b"hello".to_vec(),
        }
    }

    #[test]
    fn test_render_exact() {
        assert_eq!(
            sample().render(),
            "QkJCQkJCQkJCQkJCQkJCQg==:JCQkJCQkJCQkJCQk:AQEBAQEBAQEBAQEBAQEBAQ==:aGVsbG8="
        );
    }

    #[test]
    fn test_parse_rendered() {
        let blob = sample();
        let parsed: Blob = blob.to_string().parse().unwrap();
        assert_eq!(parsed, blob);
    }

    #[test]
    fn test_empty_ciphertext_field() {
        let blob = Blob {
            ciphertext: Vec::new(),
            ..sample()
        };
        let text = blob.render();
        assert!(text.ends_with(':'));

        let parsed = Blob::parse(&text).unwrap();
        assert!(parsed.ciphertext.is_empty());
    }

    #[test]
    fn test_no_whitespace() {
        let blob = Blob {
            ciphertext: vec![0xFFu8; 300],
            ..sample()
        };
        let text = blob.render();

        assert!(!text.contains(' '));
        assert!(!text.contains('\n'));
        assert!(!text.contains('\t'));
        assert_eq!(text.matches(FIELD_SEPARATOR).count(), 3);
    }

    #[test]
    fn test_too_few_fields() {
        for text in ["", "abc", "QkJC:JCQk", "a:b:c"] {
            let err = Blob::parse(text).expect_err("expected malformed blob");
            assert_eq!(err.kind, Some(ErrorKind::MalformedBlob), "input {:?}", text);
        }
    }

    #[test]
    fn test_too_many_fields() {
        let text = format!("{}:extra", sample().render());
        let err = Blob::parse(&text).expect_err("expected malformed blob");
        assert_eq!(err.kind, Some(ErrorKind::MalformedBlob));
    }

    #[test]
    fn test_empty_required_field() {
        let err = Blob::parse(":JCQkJCQkJCQkJCQk:AQEBAQEBAQEBAQEBAQEBAQ==:aGVsbG8=")
            .expect_err("expected malformed blob");
        assert_eq!(err.kind, Some(ErrorKind::MalformedBlob));
    }

    #[test]
    fn test_bad_base64() {
        let err = Blob::parse(
            "QkJCQkJCQkJCQkJCQkJCQg==:JCQkJCQkJCQkJCQk:AQEBAQEBAQEBAQEBAQEBAQ==:bad$$",
        )
        .expect_err("expected malformed blob");
        assert_eq!(err.kind, Some(ErrorKind::MalformedBlob));
        assert!(err.source_error().is_some());
    }

    #[test]
    fn test_wrong_field_length() {
        // 15-byte salt
        let err = Blob::parse(
            "QkJCQkJCQkJCQkJCQkJC:JCQkJCQkJCQkJCQk:AQEBAQEBAQEBAQEBAQEBAQ==:aGVsbG8=",
        )
        .expect_err("expected malformed blob");
        assert_eq!(err.kind, Some(ErrorKind::MalformedBlob));
        assert!(err.message().contains("salt must be 16 bytes"));
    }

    #[test]
    fn test_trailing_newline_is_rejected() {
        let text = format!("{}\n", sample().render());
        let err = Blob::parse(&text).expect_err("expected malformed blob");
        assert_eq!(err.kind, Some(ErrorKind::MalformedBlob));
    }
}
