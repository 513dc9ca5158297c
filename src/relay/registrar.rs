//! Signing key registration
//!
//! Appends key names to the relay miner configuration. Appends only; names
//! are never removed or deduplicated.

use crate::errors::{KeyLoaderError, Result};
use crate::relay::RelayMinerConfig;
use tracing::debug;

/// Register `name` for `service_id`.
///
/// An empty `service_id` appends to `default_signing_key_names`. Otherwise
/// the name is appended to every supplier serving `service_id`, and it is an
/// error if there is none.
pub fn register(document: &mut RelayMinerConfig, name: &str, service_id: &str) -> Result<()> {
    if service_id.is_empty() {
        document.default_signing_key_names.push(name.to_string());
        debug!(name, "Registered key as default signing key");
        return Ok(());
    }

    let mut matched = 0usize;
    for supplier in document
        .suppliers
        .iter_mut()
        .filter(|supplier| supplier.service_id == service_id)
    {
        supplier.signing_key_names.push(name.to_string());
        matched += 1;
    }

    if matched == 0 {
        return Err(KeyLoaderError::UnknownServiceGroup {
            service_id: service_id.to_string(),
        });
    }

    debug!(name, service_id, suppliers = matched, "Registered key for service");
    Ok(())
}
