//! Command implementations.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use medchain::core::digest_file;
use medchain::store::{SqliteStore, Store};
use medchain::{Digest, IdentityWatch, Keypair, Registry, RegistryError};
use tracing::{debug, warn};

use crate::cli::{Args, Command};
use crate::config::{Config, ConfigError};
use crate::exit::Outcome;
use crate::output::Printer;

/// Load configuration, then run the selected command.
pub async fn run(args: Args) -> Result<Outcome> {
    let mut config = Config::load(&args.config)?;
    config.merge_args(&args);
    config.validate()?;
    debug!(?config, "configuration loaded");

    let printer = Printer::new(args.json);

    match &args.command {
        Command::Keygen { out } => keygen(out.as_deref(), &printer),
        Command::Hash { file } => hash(&config, file, &printer),
        Command::Register { file, key } => register(&config, file, key, &printer).await,
        Command::Verify { file } => verify(&config, file, &printer).await,
        Command::Lookup { digest } => lookup(&config, digest, &printer).await,
        Command::Status => status(&config, &printer).await,
    }
}

fn keygen(out: Option<&Path>, printer: &Printer) -> Result<Outcome> {
    let keypair = Keypair::generate();
    let seed_hex = hex::encode(keypair.seed());
    let registrant = keypair.registrant().to_hex();

    match out {
        Some(path) => {
            let mut file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
                .with_context(|| format!("creating key file {}", path.display()))?;
            writeln!(file, "{}", seed_hex)
                .with_context(|| format!("writing key file {}", path.display()))?;
            printer.key(&registrant, Some(&path.display().to_string()), None);
        }
        None => printer.key(&registrant, None, Some(&seed_hex)),
    }
    Ok(Outcome::Done)
}

/// Read a key file written by `keygen`. Blank lines and `#` comments are ignored.
pub fn load_key(path: &Path) -> Result<Keypair, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Key {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let seed = contents
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .ok_or_else(|| ConfigError::Key {
            path: path.to_path_buf(),
            reason: "file is empty".into(),
        })?;
    Keypair::from_seed_hex(seed).map_err(|e| ConfigError::Key {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn hash(config: &Config, file: &Path, printer: &Printer) -> Result<Outcome> {
    let hashed = digest_file(file, &config.input_policy())
        .map_err(RegistryError::from)
        .with_context(|| format!("hashing {}", file.display()))?;
    printer.hashed(&hashed);
    Ok(Outcome::Done)
}

fn open_registry(config: &Config, identity: IdentityWatch) -> Result<Registry<SqliteStore>> {
    let store = SqliteStore::open(&config.storage.path)
        .map_err(RegistryError::from)
        .with_context(|| format!("opening registry {}", config.storage.path.display()))?;
    Ok(Registry::new(store, identity, config.registry_config()))
}

/// Close the registry, then hand back the command's result. A failed close
/// is logged; it never replaces the outcome of a call that already completed.
async fn finish<S: Store, T>(registry: Registry<S>, result: Result<T>) -> Result<T> {
    if let Err(e) = registry.close().await {
        warn!(error = %e, "closing registry failed");
    }
    result
}

async fn register(config: &Config, file: &Path, key: &Path, printer: &Printer) -> Result<Outcome> {
    let keypair = load_key(key)?;
    let registry = open_registry(config, IdentityWatch::connected(keypair))?;

    let result = registry
        .register_file(file)
        .await
        .with_context(|| format!("registering {}", file.display()));
    let receipt = finish(registry, result).await?;

    printer.receipt(&receipt);
    Ok(Outcome::Done)
}

async fn verify(config: &Config, file: &Path, printer: &Printer) -> Result<Outcome> {
    let registry = open_registry(config, IdentityWatch::disconnected())?;

    let result = registry
        .verify_file(file)
        .await
        .with_context(|| format!("verifying {}", file.display()));
    let verification = finish(registry, result).await?;

    printer.verification(&verification);
    Ok(if verification.is_registered() {
        Outcome::Done
    } else {
        Outcome::NotFound
    })
}

async fn lookup(config: &Config, digest: &str, printer: &Printer) -> Result<Outcome> {
    let digest = Digest::from_hex(digest).map_err(RegistryError::from)?;
    let registry = open_registry(config, IdentityWatch::disconnected())?;

    let result = registry.lookup(&digest).await.map_err(anyhow::Error::from);
    let record = finish(registry, result).await?;
    printer.lookup(&digest, record.as_ref());
    Ok(if record.is_some() {
        Outcome::Done
    } else {
        Outcome::NotFound
    })
}

async fn status(config: &Config, printer: &Printer) -> Result<Outcome> {
    let registry = open_registry(config, IdentityWatch::disconnected())?;

    let result = registry.count().await.map_err(anyhow::Error::from);
    let count = finish(registry, result).await?;

    printer.status(config, count);
    Ok(Outcome::Done)
}
