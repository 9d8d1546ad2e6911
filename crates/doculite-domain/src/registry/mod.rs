//! Driver registry (spec §4.7 ambient addition): a `linkme`-based
//! `distributed_slice` discovers every linked `DatabaseProvider`
//! implementation by name, defaulting to `"sqlite"`. Grounded on
//! `mcb_domain::registry::database::DATABASE_CONNECTION_PROVIDERS`,
//! narrowed from a multi-bundle repository registry down to one
//! driver-provider slot, which is all doculite needs.

use std::sync::Arc;

use crate::error::Error;
use crate::ports::database::DatabaseProvider;

/// Default driver name, used when no override is configured.
pub const DEFAULT_DRIVER_NAME: &str = "sqlite";

/// One registered driver provider.
pub struct DriverProviderEntry {
    /// Unique provider name, e.g. `"sqlite"`.
    pub name: &'static str,
    /// Factory building a fresh provider instance.
    pub build: fn() -> Arc<dyn DatabaseProvider>,
}

#[linkme::distributed_slice]
pub static DRIVER_PROVIDERS: [DriverProviderEntry] = [..];

/// Resolve a registered driver provider by name.
///
/// # Errors
///
/// Returns [`Error::Config`] when no provider of that name is linked.
pub fn resolve_driver(name: &str) -> crate::error::Result<Arc<dyn DatabaseProvider>> {
    for entry in DRIVER_PROVIDERS {
        if entry.name == name {
            return Ok((entry.build)());
        }
    }
    let available: Vec<&str> = DRIVER_PROVIDERS.iter().map(|e| e.name).collect();
    Err(Error::config(format!(
        "unknown driver provider '{name}'; available: {available:?}"
    )))
}

/// List all registered driver provider names.
#[must_use]
pub fn list_drivers() -> Vec<&'static str> {
    DRIVER_PROVIDERS.iter().map(|e| e.name).collect()
}
