pub mod common;
pub mod env;

use common::bridge::BridgeConfig;
use common::casper::{default_casper_networks, CasperConfig};
use common::database::DatabaseConfig;
use common::evm::{default_evm_networks, EvmConfig};
use common::key_store::KeyStoreConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Names the JSON file overriding the environment defaults.
pub const BRIDGE_CONFIG_PATH_ENV_VAR: &str = "BRIDGE_CONFIG_PATH";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
	#[serde(default)]
	pub database: DatabaseConfig,
	#[serde(default)]
	pub key_store: KeyStoreConfig,
	#[serde(default)]
	pub bridge: BridgeConfig,
	#[serde(default = "default_evm_networks")]
	pub evm: Vec<EvmConfig>,
	#[serde(default = "default_casper_networks")]
	pub casper: Vec<CasperConfig>,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			database: DatabaseConfig::default(),
			key_store: KeyStoreConfig::default(),
			bridge: BridgeConfig::default(),
			evm: default_evm_networks(),
			casper: default_casper_networks(),
		}
	}
}

impl Config {
	/// Loads the file named by `BRIDGE_CONFIG_PATH` when set, the environment otherwise.
	pub fn load() -> Result<Self, anyhow::Error> {
		match std::env::var(BRIDGE_CONFIG_PATH_ENV_VAR) {
			Ok(path) if !path.is_empty() => Self::from_file(path),
			_ => Ok(Self::default()),
		}
	}

	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
		let path = path.as_ref();
		let raw = std::fs::read_to_string(path)
			.map_err(|e| anyhow::anyhow!("Failed to read config file {}: {e}", path.display()))?;
		let config = Self::from_json_str(&raw)?;
		tracing::info!("Bridge config loaded from {}", path.display());
		Ok(config)
	}

	/// Parses a JSON document; missing fields take their environment defaults.
	pub fn from_json_str(raw: &str) -> Result<Self, anyhow::Error> {
		serde_json::from_str(raw).map_err(|e| anyhow::anyhow!("Invalid bridge config: {e}"))
	}
}
