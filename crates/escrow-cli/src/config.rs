//! # CLI Configuration
//!
//! Optional YAML file selected with `--config`:
//!
//! ```yaml
//! ledger_path: .escrow/ledger.json
//! wallet_dir: .escrow/wallets
//! program_id: 5f0c...e1   # optional, 64 hex chars
//! ```
//!
//! Ledger path precedence: `--ledger` flag, then `ESCROW_LEDGER`, then
//! the file, then the built-in default.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use escrow_core::Address;

/// Environment variable overriding the ledger path.
pub const LEDGER_ENV: &str = "ESCROW_LEDGER";

/// Resolved CLI settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// JSON file holding the persisted local ledger.
    pub ledger_path: PathBuf,
    /// Directory of `<name>.key` wallet files.
    pub wallet_dir: PathBuf,
    /// Program identity as hex; defaults to the engine's built-in id.
    pub program_id: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            ledger_path: PathBuf::from(".escrow/ledger.json"),
            wallet_dir: PathBuf::from(".escrow/wallets"),
            program_id: None,
        }
    }
}

impl CliConfig {
    /// Read the YAML file at `path`, or the defaults when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Apply `ESCROW_LEDGER` and then the `--ledger` flag.
    pub fn with_overrides(mut self, env_ledger: Option<String>, flag: Option<PathBuf>) -> Self {
        if let Some(path) = env_ledger.filter(|p| !p.is_empty()) {
            self.ledger_path = PathBuf::from(path);
        }
        if let Some(path) = flag {
            self.ledger_path = path;
        }
        self
    }

    /// The configured program identity.
    pub fn program_id(&self) -> Result<Address> {
        match &self.program_id {
            Some(hex) => Address::from_hex(hex).context("invalid program_id in config"),
            None => Ok(escrow_engine::default_program_id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let config = CliConfig::load(None).unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.program_id().unwrap(), escrow_engine::default_program_id());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("escrow.yaml");
        std::fs::write(&path, "wallet_dir: /tmp/keys\n").unwrap();
        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.wallet_dir, PathBuf::from("/tmp/keys"));
        assert_eq!(config.ledger_path, CliConfig::default().ledger_path);
    }

    #[test]
    fn program_id_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("escrow.yaml");
        let id = Address::new([0xab; 32]);
        std::fs::write(&path, format!("program_id: \"{id}\"\n")).unwrap();
        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.program_id().unwrap(), id);
    }

    #[test]
    fn invalid_program_id_is_an_error() {
        let config = CliConfig {
            program_id: Some("zz".to_string()),
            ..CliConfig::default()
        };
        assert!(config.program_id().is_err());
    }

    #[test]
    fn flag_beats_environment() {
        let config = CliConfig::default()
            .with_overrides(Some("/env/ledger.json".to_string()), None);
        assert_eq!(config.ledger_path, PathBuf::from("/env/ledger.json"));

        let config = CliConfig::default().with_overrides(
            Some("/env/ledger.json".to_string()),
            Some(PathBuf::from("/flag/ledger.json")),
        );
        assert_eq!(config.ledger_path, PathBuf::from("/flag/ledger.json"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CliConfig::load(Some(&dir.path().join("absent.yaml"))).is_err());
    }
}
