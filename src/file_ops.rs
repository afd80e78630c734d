//! File and stream encryption/decryption operations
//!
//! This module provides high-level operations for encrypting, decrypting,
//! and updating data held in files or passed through stdin/stdout.

use crate::error::{ErrorCategory, ErrorKind, Result, VaultarqError};
use crate::passphrase::PassphraseReader;
use crate::secretcrypt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where input is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Stdin,
    File(PathBuf),
}

impl Source {
    pub fn from_arg(path: Option<PathBuf>) -> Self {
        path.map_or(Source::Stdin, Source::File)
    }

    fn read(&self) -> Result<Vec<u8>> {
        match self {
            Source::Stdin => {
                let mut buf = Vec::new();
                io::stdin().read_to_end(&mut buf).map_err(|e| {
                    VaultarqError::with_kind_and_source(
                        ErrorCategory::Internal,
                        ErrorKind::Io,
                        "failed to read from stdin",
                        e,
                    )
                })?;
                Ok(buf)
            }
            Source::File(path) => fs::read(path).map_err(|e| read_error(path, e)),
        }
    }
}

/// Where output is written to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    Stdout,
    File(PathBuf),
}

impl Sink {
    pub fn from_arg(path: Option<PathBuf>) -> Self {
        path.map_or(Sink::Stdout, Sink::File)
    }

    fn write(&self, contents: &[u8]) -> Result<()> {
        match self {
            Sink::Stdout => {
                let mut stdout = io::stdout().lock();
                stdout
                    .write_all(contents)
                    .and_then(|_| stdout.flush())
                    .map_err(|e| {
                        VaultarqError::with_kind_and_source(
                            ErrorCategory::Internal,
                            ErrorKind::Io,
                            "failed to write to stdout",
                            e,
                        )
                    })
            }
            Sink::File(path) => write_file_secure(path, contents)
                .map_err(|e| e.with_context(format!("failed to write to {}", path.display()))),
        }
    }
}

/// Encrypt with a password
///
/// Reads plaintext bytes verbatim from `source`, encrypts them using a
/// password from `passphrase_reader`, and writes the blob to `sink`. When
/// writing to stdout a trailing newline is added; files receive the blob
/// exactly.
///
/// Output files are created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn encrypt_file(
    source: &Source,
    sink: &Sink,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let plaintext = source.read()?;
    let passphrase = passphrase_reader.read_passphrase()?;
    let mut blob = secretcrypt::encrypt(&passphrase, &plaintext)
        .map_err(|e| e.with_context("encryption failed"))?;
    if *sink == Sink::Stdout {
        blob.push('\n');
    }
    sink.write(blob.as_bytes())?;

    info!(plaintext_len = plaintext.len(), "encrypted");
    Ok(())
}

/// Decrypt with a password
///
/// Reads a blob from `source` (surrounding whitespace ignored), decrypts
/// it using a password from `passphrase_reader`, and writes the plaintext
/// bytes to `sink`. Nothing is written unless decryption succeeds.
///
/// Output files are created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn decrypt_file(
    source: &Source,
    sink: &Sink,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let blob = read_blob(source)?;
    let passphrase = passphrase_reader.read_passphrase()?;
    let plaintext = secretcrypt::decrypt(&passphrase, &blob)
        .map_err(|e| e.with_context("failed to decrypt"))?;
    sink.write(&plaintext)?;

    info!(plaintext_len = plaintext.len(), "decrypted");
    Ok(())
}

/// Update an encrypted file with new plaintext using the same password
///
/// This function:
/// 1. Decrypts the existing file at `crypt_path` to validate the password
/// 2. Reads new plaintext from `source`
/// 3. Encrypts the new plaintext with the validated password (fresh salt and nonce)
/// 4. Atomically writes to `crypt_path` (tempfile + fsync + rename)
///
/// Either the old file or the new file exists afterwards, never a partial
/// one. Validating first prevents an accidental password change.
pub fn update_file(
    source: &Source,
    crypt_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let blob = read_blob(&Source::File(crypt_path.to_path_buf()))?;
    let passphrase = passphrase_reader.read_passphrase()?;

    // Validate password by decrypting existing file (discard plaintext)
    secretcrypt::decrypt(&passphrase, &blob).map_err(|e| e.with_context("failed to decrypt"))?;
    debug!(path = %crypt_path.display(), "password validated against existing file");

    let new_plaintext = source.read()?;
    let new_blob = secretcrypt::encrypt(&passphrase, &new_plaintext)
        .map_err(|e| e.with_context("failed to encrypt"))?;

    replace_atomically(crypt_path, new_blob.as_bytes())?;

    info!(path = %crypt_path.display(), "updated");
    Ok(())
}

fn read_blob(source: &Source) -> Result<String> {
    let bytes = source.read()?;
    let text = String::from_utf8(bytes).map_err(|e| {
        VaultarqError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::MalformedBlob,
            "encrypted input is not valid UTF-8",
            e,
        )
    })?;
    Ok(text.trim().to_string())
}

fn io_error(msg: impl Into<String>, err: io::Error) -> VaultarqError {
    VaultarqError::with_kind_and_source(ErrorCategory::Internal, ErrorKind::Io, msg, err)
}

fn replace_atomically(crypt_path: &Path, contents: &[u8]) -> Result<()> {
    let crypt_dir = match crypt_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::Builder::new()
        .prefix(".vaultarq-update")
        .tempfile_in(crypt_dir)
        .map_err(|e| io_error("failed to create tempfile", e))?;

    temp_file
        .write_all(contents)
        .map_err(|e| io_error("failed to write to tempfile", e))?;
    // Flush and fsync() such that the rename, if it succeeds, always
    // points to a valid file.
    temp_file
        .flush()
        .map_err(|e| io_error("failed to flush tempfile", e))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| io_error("failed to sync file prior to rename", e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| io_error("failed to set tempfile permissions", e))?;
    }

    temp_file.persist(crypt_path).map_err(|e| {
        VaultarqError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to rename to target file {}", crypt_path.display()),
            e,
        )
    })?;
    Ok(())
}

/// Write file with secure permissions (0o600 on Unix)
fn write_file_secure(path: &Path, contents: &[u8]) -> Result<()> {
    #[cfg(unix)]
    {
        use std::fs::OpenOptions;
        use std::os::unix::fs::OpenOptionsExt;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .map_err(|e| {
                VaultarqError::with_kind_and_source(
                    ErrorCategory::User,
                    ErrorKind::Io,
                    format!("failed to open {}", path.display()),
                    e,
                )
            })?;

        file.write_all(contents)
            .map_err(|e| io_error(format!("failed to write {}", path.display()), e))?;
        Ok(())
    }

    #[cfg(not(unix))]
    {
        fs::write(path, contents).map_err(|e| {
            VaultarqError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::Io,
                format!("failed to write {}", path.display()),
                e,
            )
        })
    }
}

fn read_error(path: &Path, err: io::Error) -> VaultarqError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    VaultarqError::with_kind_and_source(
        category,
        ErrorKind::Io,
        format!("failed to read from {}", path.display()),
        err,
    )
}
