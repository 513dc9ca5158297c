//! relay-keyloader - wallet key importer for relay miners
//!
//! Loads wallet key specifications (mnemonic ranges or hex private keys),
//! imports every derived key into a keyring under its bech32 address, and
//! registers the key names in a relay miner configuration.
//!
//! Both documents come from local files or from a Kubernetes Secret and
//! ConfigMap. Running twice with the same input imports nothing new.
//!
//! # Usage
//!
//! ```bash
//! # Import keys.json into ./shannon-keyring-loader, register them from
//! # config.yaml into generated.config.yaml
//! relay-keyloader
//!
//! # Or with a config file
//! relay-keyloader --config /etc/relay-keyloader/config.toml
//!
//! # Inside a cluster
//! KEYLOADER_CONFIG_SOURCE=kubernetes KEYLOADER_RELAY_MINER__OUTPUT_PATH=/tmp/config.yaml relay-keyloader
//! ```

mod config;
mod crypto;
mod errors;
mod keystore;
mod pipeline;
mod relay;
mod security;
mod source;

use crate::config::{Config, LoggingConfig};
use crate::crypto::AddressCodec;
use crate::errors::{KeyLoaderError, Result};
use crate::pipeline::{parse_wallet_keys, ImportPipeline};
use crate::relay::RelayMinerConfig;
use crate::source::SourceKind;
use std::env;
use std::fs;
use std::path::Path;
use tracing::{error, info};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine, a broken one is not
    config::load_dotenv(Path::new(".env"))?;

    // Load configuration
    let config_path = config_path_arg();
    let mut config = Config::load(config_path.as_deref())?;

    // Initialize logging
    init_logging(&config.logging);

    info!("Starting relay-keyloader v{}", VERSION);

    if let Err(e) = run(&mut config).await {
        error!(error = %e, "Key import failed");
        return Err(e);
    }

    Ok(())
}

async fn run(config: &mut Config) -> Result<()> {
    config.validate()?;
    let codec = AddressCodec::new(&config.address_prefix)?;
    let source_kind = config.source_kind()?;
    info!(
        source = source_kind.as_str(),
        address_prefix = codec.prefix(),
        keyring_backend = %config.keyring.backend,
        keyring_dir = %config.keyring.dir.display(),
        "Configuration loaded"
    );

    let source = source::from_kind(source_kind)?;

    let keys_data = source.fetch(&config.keys.resource()).await?;
    let specs = parse_wallet_keys(&keys_data)?;
    info!(entries = specs.len(), "Wallet keys loaded");

    let mut document = if config.relay_miner.generate {
        let data = source.fetch(&config.relay_miner.resource()).await?;
        Some(RelayMinerConfig::from_yaml(&data)?)
    } else {
        info!("Relay miner config generation disabled, keys are imported only");
        None
    };

    let mut keyring = keystore::open(&config.keyring)?;
    let report = ImportPipeline::new(keyring.as_mut(), &codec).run(&specs, document.as_mut())?;

    if let Some(document) = document {
        // Keep the mode of a local input file on the generated output
        let permissions = match source_kind {
            SourceKind::File => {
                let input = &config.relay_miner.file_path;
                let metadata = fs::metadata(input).map_err(|e| {
                    KeyLoaderError::StorageError(format!(
                        "Unable to get config file info for {}: {}",
                        input.display(),
                        e
                    ))
                })?;
                Some(metadata.permissions())
            }
            SourceKind::Kubernetes => None,
        };
        document.write_to(&config.relay_miner.output_path, permissions)?;
    }

    info!(
        imported = report.imported,
        existing = report.existing,
        "All keys processed"
    );
    Ok(())
}

/// Value of `--config <path>` or `--config=<path>`, if given
fn config_path_arg() -> Option<String> {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next();
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(path.to_string());
        }
    }
    None
}

/// Initialize logging
fn init_logging(logging: &LoggingConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().with_ansi(logging.color)).init();
    }
}
