//! Command-line argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// MedChain document registry client.
#[derive(Parser, Debug)]
#[command(
    name = "medchain",
    version,
    about = "Register and verify medical documents by their SHA-256 digest",
    long_about = "Hashes documents locally and registers only the digest. Each digest can be\n\
                  registered once; anyone can later check whether a document is registered."
)]
pub struct Args {
    /// Path to configuration file.
    #[arg(short, long, default_value = "medchain.toml", env = "MEDCHAIN_CONFIG")]
    pub config: PathBuf,

    /// Registry database file. Overrides `[storage] path`.
    #[arg(long, env = "MEDCHAIN_DB")]
    pub db: Option<PathBuf>,

    /// Per-call timeout in milliseconds. Overrides `[client] call_timeout_ms`.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Enable debug logging.
    #[arg(long)]
    pub debug: bool,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a signing key.
    Keygen {
        /// Write the key to this file instead of stdout. Never overwrites.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print the digest of a document.
    Hash {
        file: PathBuf,
    },

    /// Register a document's digest.
    Register {
        file: PathBuf,

        /// Key file written by `medchain keygen`.
        #[arg(short, long, env = "MEDCHAIN_KEY_FILE")]
        key: PathBuf,
    },

    /// Check whether a document is registered. Exits 1 if it is not.
    Verify {
        file: PathBuf,
    },

    /// Look up a digest. Exits 1 if it is not registered.
    Lookup {
        /// Hex digest, with or without a 0x prefix.
        digest: String,
    },

    /// Show registry status.
    Status,
}
