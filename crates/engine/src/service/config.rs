//! Store configuration via `termstore.toml`
//!
//! On first open a commented default `termstore.toml` is written into the
//! data directory. To change settings, edit the file and reopen.

use serde::{Deserialize, Serialize};
use std::path::Path;
use termstore_core::{Error, Result};
use termstore_storage::{ProviderOptions, ProviderRegistry, Traversal, LOG_PROVIDER, MEMORY_PROVIDER};

/// Config file name placed in the store data directory.
pub const CONFIG_FILE_NAME: &str = "termstore.toml";

/// Store configuration loaded from `termstore.toml`.
///
/// # Example
///
/// ```toml
/// provider = "log"
/// sync_on_write = false
/// traversal = "parallel"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Provider name: `"log"` or `"memory"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Sync every log record to disk before the write returns.
    #[serde(default)]
    pub sync_on_write: bool,
    /// Default traversal for full-store processing: `"parallel"` or `"sequential"`.
    #[serde(default = "default_traversal")]
    pub traversal: String,
}

fn default_provider() -> String {
    LOG_PROVIDER.to_string()
}

fn default_traversal() -> String {
    Traversal::default().name().to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            sync_on_write: false,
            traversal: default_traversal(),
        }
    }
}

impl StoreConfig {
    /// Configuration for a memory-only store
    pub fn ephemeral() -> Self {
        Self {
            provider: MEMORY_PROVIDER.to_string(),
            ..Self::default()
        }
    }

    /// Parse the traversal string.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the string is not `"parallel"` or `"sequential"`.
    pub fn traversal_mode(&self) -> Result<Traversal> {
        Traversal::parse(&self.traversal).ok_or_else(|| {
            Error::Config(format!(
                "Invalid traversal '{}' in {}. Expected \"parallel\" or \"sequential\".",
                self.traversal, CONFIG_FILE_NAME
            ))
        })
    }

    /// Check every field against the built-in providers and traversals.
    ///
    /// # Errors
    ///
    /// Returns `Config` for an unknown provider or traversal name.
    pub fn validate(&self) -> Result<()> {
        self.validate_with(&ProviderRegistry::with_defaults())
    }

    /// Check every field, accepting any provider registered in `registry`.
    pub fn validate_with(&self, registry: &ProviderRegistry) -> Result<()> {
        if registry.get(&self.provider).is_none() {
            return Err(Error::Config(format!(
                "Invalid provider '{}' in {}. Expected one of {:?}.",
                self.provider,
                CONFIG_FILE_NAME,
                registry.names()
            )));
        }
        self.traversal_mode()?;
        Ok(())
    }

    /// Options for creating the configured provider under `data_dir`.
    pub fn provider_options(&self, data_dir: Option<&Path>) -> ProviderOptions {
        ProviderOptions {
            data_dir: data_dir.map(Path::to_path_buf),
            sync_on_write: self.sync_on_write,
        }
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# termstore configuration
#
# Store provider: "log" (default) or "memory"
#   "log"    = append-only entities.log in this directory, replayed on start
#   "memory" = nothing is written; contents are lost when the process exits
provider = "log"

# Sync every log record to disk before the write returns (default: false)
sync_on_write = false

# Default traversal for full-store processing: "parallel" (default) or "sequential"
traversal = "parallel"
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: StoreConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
