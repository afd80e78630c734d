//! Password acquisition
//!
//! The cipher itself only ever sees a byte slice; these readers are how
//! callers obtain one. Every reader hands out the password wrapped in
//! `Zeroizing` so it is wiped from memory when dropped.

use crate::error::{ErrorCategory, ErrorKind, Result, VaultarqError};
use std::io::{self, Read};
use zeroize::Zeroizing;

/// Trait for reading passwords from various sources
pub trait PassphraseReader {
    /// Read a password as arbitrary bytes (not necessarily UTF-8)
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>>;
}

/// Returns a fixed password, e.g. one given on the command line
pub struct ConstantPassphraseReader {
    passphrase: Zeroizing<Vec<u8>>,
}

impl ConstantPassphraseReader {
    pub fn new(passphrase: Vec<u8>) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase),
        }
    }
}

impl PassphraseReader for ConstantPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new((*self.passphrase).clone()))
    }
}

/// Reads a password from any io::Read source, such as a password file
///
/// A single trailing line ending (`\n` or `\r\n`) is stripped, so a file
/// written with `echo` yields the password without the newline.
pub struct ReaderPassphraseReader {
    reader: Box<dyn Read>,
}

impl ReaderPassphraseReader {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self { reader }
    }
}

impl PassphraseReader for ReaderPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let mut data = Zeroizing::new(Vec::new());
        self.reader.read_to_end(&mut data).map_err(|e| {
            VaultarqError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::PassphraseUnavailable,
                "error reading password",
                e,
            )
        })?;
        if data.ends_with(b"\n") {
            data.pop();
            if data.ends_with(b"\r") {
                data.pop();
            }
        }
        Ok(data)
    }
}

/// Prompts for a password, returning what was typed.
pub type Prompter = Box<dyn FnMut(&str) -> io::Result<String>>;

const PROMPT: &str = "Password (vaultarq): ";

/// Reads a password from the controlling terminal with no echo
///
/// The prompt goes through the terminal device rather than stdin, so
/// stdin stays free to carry the payload.
pub struct TerminalPassphraseReader {
    prompt: Prompter,
}

impl TerminalPassphraseReader {
    pub fn new() -> Self {
        Self::with_prompter(Box::new(|prompt: &str| rpassword::prompt_password(prompt)))
    }

    pub fn with_prompter(prompt: Prompter) -> Self {
        Self { prompt }
    }
}

impl Default for TerminalPassphraseReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PassphraseReader for TerminalPassphraseReader {
    /// Note: terminal input is limited to UTF-8 due to rpassword.
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let password = (self.prompt)(PROMPT).map_err(|e| {
            VaultarqError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::PassphraseUnavailable,
                "cannot prompt for password on the terminal; use --password or --password-file",
                e,
            )
        })?;

        Ok(Zeroizing::new(password.into_bytes()))
    }
}

/// Wraps another PassphraseReader and caches the result
///
/// The upstream reader is called only until it first succeeds; later
/// calls return the cached value. Errors are not cached.
pub struct CachingPassphraseReader {
    upstream: Box<dyn PassphraseReader>,
    cached: Option<Zeroizing<Vec<u8>>>,
}

impl CachingPassphraseReader {
    pub fn new(upstream: Box<dyn PassphraseReader>) -> Self {
        Self {
            upstream,
            cached: None,
        }
    }
}

impl PassphraseReader for CachingPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        if let Some(cached) = &self.cached {
            return Ok(Zeroizing::new((**cached).clone()));
        }
        let passphrase = self.upstream.read_passphrase()?;
        let copy = Zeroizing::new((*passphrase).clone());
        self.cached = Some(passphrase);
        Ok(copy)
    }
}
