//! Import pipeline
//!
//! Drives every wallet key entry through derive, import and register, in
//! order, stopping at the first error. Nothing is rolled back: keys imported
//! and names registered before a failure stay where they are.

use crate::crypto::{derive_from_hex, AddressCodec, DerivedKey, HdSeed};
use crate::errors::{KeyLoaderError, Result};
use crate::keystore::{Keyring, KeyringImporter};
use crate::relay::{register, RelayMinerConfig};
use serde::Deserialize;
use tracing::{debug, info};

/// One entry of the wallet keys document
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WalletKeySpec {
    pub mnemonic: Option<String>,
    /// First HD index, inclusive
    pub start_index: u32,
    /// Last HD index, inclusive
    pub end_index: u32,
    pub hex: Option<String>,
    /// Service groups to register every key of this entry for. Absent or
    /// empty means the default signing keys.
    pub service_id: Option<Vec<String>>,
}

/// Where an entry's keys come from
enum KeyOrigin<'a> {
    Mnemonic(&'a str),
    Hex(&'a str),
}

impl WalletKeySpec {
    fn origin(&self, entry: usize) -> Result<KeyOrigin<'_>> {
        let mnemonic = self.mnemonic.as_deref().filter(|m| !m.trim().is_empty());
        let hex = self.hex.as_deref().filter(|h| !h.trim().is_empty());

        match (mnemonic, hex) {
            (Some(mnemonic), None) => Ok(KeyOrigin::Mnemonic(mnemonic)),
            (None, Some(hex)) => Ok(KeyOrigin::Hex(hex.trim())),
            _ => Err(KeyLoaderError::MalformedEntry { entry }),
        }
    }

    /// Service ids to register against; the empty id is the default bucket
    fn service_ids(&self) -> Vec<&str> {
        match self.service_id.as_deref() {
            Some(ids) if !ids.is_empty() => ids.iter().map(String::as_str).collect(),
            _ => vec![""],
        }
    }
}

/// Parse the wallet keys document, a JSON array of entries
pub fn parse_wallet_keys(data: &[u8]) -> Result<Vec<WalletKeySpec>> {
    serde_json::from_slice(data)
        .map_err(|e| KeyLoaderError::ParseError(format!("Failed to parse wallet keys: {}", e)))
}

/// Counters of a pipeline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub entries: usize,
    pub keys: usize,
    pub imported: usize,
    pub existing: usize,
    pub registrations: usize,
}

/// Imports keys into a keyring and registers them in a relay miner config
pub struct ImportPipeline<'a, K: Keyring + ?Sized> {
    importer: KeyringImporter<'a, K>,
}

impl<'a, K: Keyring + ?Sized> ImportPipeline<'a, K> {
    pub fn new(keyring: &'a mut K, codec: &'a AddressCodec) -> Self {
        Self {
            importer: KeyringImporter::new(keyring, codec),
        }
    }

    /// Process `specs` in order. Registration is skipped when `document` is
    /// `None`.
    pub fn run(
        &mut self,
        specs: &[WalletKeySpec],
        mut document: Option<&mut RelayMinerConfig>,
    ) -> Result<ImportReport> {
        let mut report = ImportReport {
            entries: specs.len(),
            ..Default::default()
        };

        for (entry, spec) in specs.iter().enumerate() {
            match spec.origin(entry)? {
                KeyOrigin::Mnemonic(phrase) => {
                    let seed = HdSeed::from_mnemonic(phrase)
                        .map_err(|_| KeyLoaderError::InvalidMnemonic { entry })?;

                    if spec.start_index > spec.end_index {
                        debug!(
                            entry,
                            start_index = spec.start_index,
                            end_index = spec.end_index,
                            "Empty index range, no keys derived"
                        );
                    }

                    for index in spec.start_index..=spec.end_index {
                        let key = seed.derive(index).map_err(|e| {
                            KeyLoaderError::DerivationFailure {
                                entry,
                                index,
                                reason: e.to_string(),
                            }
                        })?;
                        self.process_key(&key, spec, document.as_deref_mut(), &mut report)?;
                    }
                }
                KeyOrigin::Hex(encoded) => {
                    let key = derive_from_hex(encoded)
                        .map_err(|source| KeyLoaderError::InvalidHexEncoding { entry, source })?;
                    self.process_key(&key, spec, document.as_deref_mut(), &mut report)?;
                }
            }
        }

        info!(
            entries = report.entries,
            keys = report.keys,
            imported = report.imported,
            existing = report.existing,
            registrations = report.registrations,
            "Key import finished"
        );
        Ok(report)
    }

    fn process_key(
        &mut self,
        key: &DerivedKey,
        spec: &WalletKeySpec,
        document: Option<&mut RelayMinerConfig>,
        report: &mut ImportReport,
    ) -> Result<()> {
        let imported = self.importer.import_key(key)?;
        debug!(name = %imported.name, address = %imported.address, "Key ready");
        report.keys += 1;
        if imported.newly_imported {
            report.imported += 1;
        } else {
            report.existing += 1;
        }

        if let Some(document) = document {
            for service_id in spec.service_ids() {
                register(document, &imported.name, service_id)?;
                report.registrations += 1;
            }
        }
        Ok(())
    }
}
