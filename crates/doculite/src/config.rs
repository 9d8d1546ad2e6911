//! Configuration surface (spec §6), loaded through `figment`. Grounded
//! on `mcb_infrastructure::config::loader::ConfigLoader`'s
//! `new()/with_config_path()/load()` builder shape, adapted from the
//! teacher's Loco-YAML resolution back to the `figment` TOML+env layer
//! the teacher's own test suite (`config_figment_tests.rs`, ADR-025)
//! still documents: `DOCULITE__`-prefixed, double-underscore-nested env
//! vars override a TOML file.

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use doculite_domain::error::{Error, Result};
pub use doculite_domain::ports::database::{EnginePragmas, PoolOptions};

/// Remote-replica auth/sync options (spec §6: "remote auth token and
/// sync URL"), for pooled drivers that replicate to a remote endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RemoteOptions {
    pub sync_url: Option<String>,
    pub auth_token: Option<String>,
}

/// Full configuration surface for opening a doculite database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DoculiteConfig {
    /// File path, or `":memory:"`.
    pub path: String,
    /// Force an in-memory database regardless of `path`.
    pub memory: bool,
    /// Driver name, resolved through `doculite_domain::registry`.
    pub driver: String,
    pub pool: PoolOptions,
    pub pragmas: EnginePragmas,
    pub remote: RemoteOptions,
}

impl Default for DoculiteConfig {
    fn default() -> Self {
        Self {
            path: "doculite.db".to_owned(),
            memory: false,
            driver: doculite_domain::registry::DEFAULT_DRIVER_NAME.to_owned(),
            pool: PoolOptions::default(),
            pragmas: EnginePragmas::default(),
            remote: RemoteOptions::default(),
        }
    }
}

impl DoculiteConfig {
    /// True if this config resolves to an in-memory database.
    #[must_use]
    pub fn is_memory(&self) -> bool {
        self.memory || self.path == ":memory:"
    }
}

/// Builder/loader for [`DoculiteConfig`], merging (lowest to highest
/// priority): struct defaults, an optional TOML file, then
/// `DOCULITE__`-prefixed environment variables, then the `DOCULITE_DRIVER`
/// override (spec §6: "a variable that overrides the driver selection").
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Start a loader with no explicit file; env vars and defaults only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from this explicit TOML file, overridable by
    /// environment variables.
    #[must_use]
    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Resolve the final [`DoculiteConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the TOML file is present but fails
    /// to parse, or a declared value has the wrong shape.
    pub fn load(&self) -> Result<DoculiteConfig> {
        let mut figment = Figment::from(Serialized::defaults(DoculiteConfig::default()));

        if let Some(path) = &self.config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("DOCULITE__").split("__"));

        let mut config: DoculiteConfig = figment
            .extract()
            .map_err(|e| Error::config(format!("failed to load configuration: {e}")))?;

        if let Ok(driver_override) = std::env::var("DOCULITE_DRIVER") {
            config.driver = driver_override;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_resolve_to_sqlite_file_backed() {
        let config = DoculiteConfig::default();
        assert_eq!(config.driver, "sqlite");
        assert!(!config.is_memory());
    }

    #[test]
    fn memory_flag_or_path_marks_in_memory() {
        let mut config = DoculiteConfig::default();
        config.path = ":memory:".to_owned();
        assert!(config.is_memory());
    }

    #[test]
    #[serial]
    fn driver_env_var_overrides_loaded_config() {
        // SAFETY: test runs with #[serial], no concurrent env mutation.
        #[allow(unsafe_code)]
        unsafe {
            std::env::set_var("DOCULITE_DRIVER", "memory-test-driver");
        }
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config.driver, "memory-test-driver");
        #[allow(unsafe_code)]
        unsafe {
            std::env::remove_var("DOCULITE_DRIVER");
        }
    }

    #[test]
    #[serial]
    fn nested_env_var_overrides_pool_option() {
        #[allow(unsafe_code)]
        unsafe {
            std::env::set_var("DOCULITE__POOL__MAX_CONNECTIONS", "42");
        }
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config.pool.max_connections, 42);
        #[allow(unsafe_code)]
        unsafe {
            std::env::remove_var("DOCULITE__POOL__MAX_CONNECTIONS");
        }
    }
}
