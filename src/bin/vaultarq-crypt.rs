//! vaultarq-crypt CLI - password-based encryption of secrets
//!
//! Encrypts and decrypts data using AES-256-GCM with Argon2id key
//! derivation. Input defaults to stdin and output to stdout.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use vaultarq_crypt::file_ops::{self, Sink, Source};
use vaultarq_crypt::passphrase::{
    ConstantPassphraseReader, PassphraseReader, ReaderPassphraseReader, TerminalPassphraseReader,
};
use vaultarq_crypt::{ErrorCategory, ErrorKind, Result, VaultarqError};

#[derive(Parser)]
#[command(name = "vaultarq-crypt")]
#[command(version)]
#[command(about = "Password-based encryption for vaultarq secrets.", long_about = None)]
struct Cli {
    #[command(flatten)]
    password: PasswordArgs,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

// At most one of --password-file and --password (VAULTARQ_PASSWORD counts
// as --password); with neither, the password is prompted for on the terminal.
#[derive(Args)]
struct PasswordArgs {
    /// Read the password from a file (a single trailing newline is ignored)
    #[arg(long, global = true, value_name = "FILE", conflicts_with = "password")]
    password_file: Option<PathBuf>,

    /// Password to use
    #[arg(long, global = true, env = "VAULTARQ_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt data into a blob
    #[command(alias = "e")]
    Encrypt {
        /// File whose contents is to be encrypted [default: stdin]
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// File to write the blob to [default: stdout]
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Decrypt a blob
    #[command(alias = "d")]
    Decrypt {
        /// File holding the blob [default: stdin]
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// File to write the plaintext to [default: stdout]
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Update an encrypted file with new content, while validating
    /// that the password is not accidentally changed.
    #[command(alias = "u")]
    Update {
        /// File whose contents is to be encrypted [default: stdin]
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Existing encrypted file to replace
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = get_passphrase_reader(&cli.password).and_then(|mut reader| match cli.command {
        Commands::Encrypt { input, output } => file_ops::encrypt_file(
            &Source::from_arg(input),
            &Sink::from_arg(output),
            &mut *reader,
        ),
        Commands::Decrypt { input, output } => file_ops::decrypt_file(
            &Source::from_arg(input),
            &Sink::from_arg(output),
            &mut *reader,
        ),
        Commands::Update { input, output } => {
            file_ops::update_file(&Source::from_arg(input), &output, &mut *reader)
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {}", error_chain(&e));
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    // RUST_LOG, when set, takes precedence over -v
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_env_filter(filter)
        .init();
}

fn get_passphrase_reader(args: &PasswordArgs) -> Result<Box<dyn PassphraseReader>> {
    if let Some(path) = &args.password_file {
        let file = File::open(path).map_err(|e| {
            VaultarqError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::PassphraseUnavailable,
                format!("failed to open password file {}", path.display()),
                e,
            )
        })?;
        return Ok(Box::new(ReaderPassphraseReader::new(Box::new(file))));
    }
    if let Some(password) = &args.password {
        return Ok(Box::new(ConstantPassphraseReader::new(
            password.clone().into_bytes(),
        )));
    }
    Ok(Box::new(TerminalPassphraseReader::new()))
}

/// Joins the error with its sources: "outer: inner: innermost".
fn error_chain(err: &VaultarqError) -> String {
    let mut msg = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
