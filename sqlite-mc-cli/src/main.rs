//! `sqlite-mc` developer CLI.
//!
//! ```text
//! sqlite-mc presets [NAME]
//! sqlite-mc check  --db vault.db --preset sqlcipher-v4 --key ...
//! sqlite-mc rekey  --db vault.db --preset sqlcipher-v4 --key ... --new-key ...
//! sqlite-mc keygen --cipher chacha20
//! ```
//!
//! Keys can come from the environment (`SQLITE_MC_KEY`, `SQLITE_MC_NEW_KEY`)
//! so they stay out of shell history. Logging follows `RUST_LOG`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use eyre::{bail, eyre, Result, WrapErr};
use serde::Serialize;
use sqlite_mc::config::presets;
use sqlite_mc::{CipherAlgorithm, KeyMaterial, McConfig, Properties};

#[derive(Debug, Parser)]
#[command(name = "sqlite-mc", version, about = "sqlite3mc encrypted database tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the property-bag form of one preset, or of all of them.
    Presets {
        /// Preset name (for example `sqlcipher-v4`).
        name: Option<String>,
    },
    /// Open a database, verify the key and run an integrity check.
    Check(DbArgs),
    /// Re-encrypt a database under a new key.
    Rekey {
        #[command(flatten)]
        db: DbArgs,
        /// New passphrase.
        #[arg(long, env = "SQLITE_MC_NEW_KEY", hide_env_values = true, conflicts_with = "new_hex_key")]
        new_key: Option<String>,
        /// New key as hex digits.
        #[arg(long)]
        new_hex_key: Option<String>,
    },
    /// Generate a random raw 32 byte key for a cipher.
    Keygen {
        /// Cipher the key is tagged for.
        #[arg(long, default_value = "chacha20")]
        cipher: String,
    },
}

#[derive(Debug, Args)]
struct DbArgs {
    /// Database file.
    #[arg(long)]
    db: PathBuf,
    /// Preset providing the cipher parameters.
    #[arg(long, default_value = "chacha20", conflicts_with = "config")]
    preset: String,
    /// JSON file with a configuration in property-bag form.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Passphrase.
    #[arg(long, env = "SQLITE_MC_KEY", hide_env_values = true, conflicts_with = "hex_key")]
    key: Option<String>,
    /// Key as hex digits.
    #[arg(long)]
    hex_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    path: String,
    cipher: Option<String>,
    schema_entries: i64,
    integrity: Vec<String>,
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    match cli.command {
        Command::Presets { name } => {
            let output = preset_properties(name.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Check(args) => {
            let report = check(&args)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.integrity.is_empty() {
                bail!("integrity check reported {} problem(s)", report.integrity.len());
            }
        }
        Command::Rekey {
            db,
            new_key,
            new_hex_key,
        } => {
            let new_key = key_material(new_key.as_deref(), new_hex_key.as_deref())?
                .ok_or_else(|| eyre!("--new-key or --new-hex-key is required"))?;
            rekey(&db, &new_key)?;
            eprintln!("rekeyed {}", db.db.display());
        }
        Command::Keygen { cipher } => {
            let cipher = CipherAlgorithm::resolve(&cipher)?;
            let key = KeyMaterial::generate_raw_unsalted(cipher)?;
            println!("{}", key.expose());
        }
    }
    Ok(())
}

fn preset_properties(name: Option<&str>) -> Result<BTreeMap<String, Properties>> {
    let all = presets::all();
    let selected: Vec<_> = match name {
        Some(name) => {
            let found: Vec<_> = all.into_iter().filter(|(preset, _)| *preset == name).collect();
            if found.is_empty() {
                bail!("unknown preset {name}");
            }
            found
        }
        None => all,
    };
    Ok(selected
        .into_iter()
        .map(|(preset, builder)| (preset.to_string(), builder.build().to_properties()))
        .collect())
}

fn key_material(key: Option<&str>, hex_key: Option<&str>) -> Result<Option<KeyMaterial>> {
    match (key, hex_key) {
        (Some(key), None) => Ok(Some(KeyMaterial::passphrase(key)?)),
        (None, Some(hex_key)) => Ok(Some(KeyMaterial::hex(hex_key)?)),
        (None, None) => Ok(None),
        (Some(_), Some(_)) => bail!("pass either a passphrase or a hex key, not both"),
    }
}

fn load_config(path: &Path) -> Result<McConfig> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).wrap_err_with(|| format!("parsing {}", path.display()))
}

fn resolve_config(args: &DbArgs) -> Result<McConfig> {
    let key = key_material(args.key.as_deref(), args.hex_key.as_deref())?;
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => presets::by_name(&args.preset)
            .ok_or_else(|| eyre!("unknown preset {}", args.preset))?
            .build(),
    };
    match key {
        Some(key) => Ok(config.with_rekeyed(key)),
        None if config.key().is_some() => Ok(config),
        None => bail!("a key is required (--key, --hex-key or SQLITE_MC_KEY)"),
    }
}

fn check(args: &DbArgs) -> Result<CheckReport> {
    let config = resolve_config(args)?;
    let conn = sqlite_mc::open_verified(&args.db, &config)
        .wrap_err_with(|| format!("opening {}", args.db.display()))?;
    let schema_entries = conn.query_row("SELECT count(*) FROM sqlite_master", |stmt| {
        Ok(stmt.column_i64(0))
    })?;
    let integrity = conn.integrity_check()?;
    Ok(CheckReport {
        path: args.db.display().to_string(),
        cipher: config.cipher().map(|c| c.name().to_owned()),
        schema_entries,
        integrity,
    })
}

fn rekey(args: &DbArgs, new_key: &KeyMaterial) -> Result<()> {
    let config = resolve_config(args)?;
    let mut conn = sqlite_mc::open_verified(&args.db, &config)
        .wrap_err_with(|| format!("opening {}", args.db.display()))?;
    conn.rekey(new_key)?;
    tracing::info!(path = %args.db.display(), "rekey complete");
    Ok(())
}
