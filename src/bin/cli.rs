//! filekv CLI
//!
//! Command-line interface for reading and writing records in a filekv
//! directory.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use filekv::{Config, IdentityPlacer, JsonMarshaler, Marshaler, StaleTmpPolicy, Store, YamlMarshaler};
use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

/// filekv CLI
#[derive(Parser, Debug)]
#[command(name = "filekv-cli")]
#[command(about = "CLI for the filekv one-file-per-key store")]
#[command(version)]
struct Args {
    /// Base directory
    #[arg(short, long, default_value = "./filekv_data")]
    data_dir: PathBuf,

    /// Record format
    #[arg(short, long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Skip fsync of temp files and directories
    #[arg(long)]
    no_sync: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a JSON value as the record for a key
    Put {
        /// The key to write
        key: String,

        /// The value, as JSON text
        value: String,
    },

    /// Print the record for a key as JSON
    Get {
        /// The key to read
        key: String,
    },

    /// Print the on-disk path of a key's record
    Path {
        /// The key to resolve
        key: String,
    },

    /// List (or remove) temp files left by interrupted writes
    Sweep {
        /// Delete the files instead of listing them
        #[arg(long)]
        remove: bool,
    },
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,filekv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .base_dir(&args.data_dir)
        .sync_writes(!args.no_sync)
        .stale_tmp_policy(StaleTmpPolicy::Ignore)
        .build();

    let result = match args.format {
        Format::Json => Store::open_with(config, JsonMarshaler::default(), IdentityPlacer)
            .and_then(|store| run(&store, args.command)),
        Format::Yaml => Store::open_with(config, YamlMarshaler, IdentityPlacer)
            .and_then(|store| run(&store, args.command)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run<M: Marshaler>(store: &Store<M, IdentityPlacer>, command: Commands) -> filekv::Result<()> {
    match command {
        Commands::Put { key, value } => {
            let value: Value = serde_json::from_str(&value)
                .map_err(|e| filekv::KvError::Serialization(format!("value is not JSON: {}", e)))?;
            store.write(&key, &value)?;
            tracing::info!("Wrote {}", store.record_path(&key)?.display());
        }
        Commands::Get { key } => {
            let value: Value = store.read(&key)?;
            let text = serde_json::to_string_pretty(&value)
                .map_err(|e| filekv::KvError::Serialization(e.to_string()))?;
            println!("{}", text);
        }
        Commands::Path { key } => {
            println!("{}", store.record_path(&key)?.display());
        }
        Commands::Sweep { remove } => {
            if remove {
                let removed = store.remove_stale_tmp()?;
                println!("removed {} stale temp file(s)", removed);
            } else {
                for path in store.scan_stale_tmp()? {
                    println!("{}", path.display());
                }
            }
        }
    }
    Ok(())
}
