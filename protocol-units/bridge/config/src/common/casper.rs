use super::{
	DEFAULT_ESTIMATED_CONFIRMATION, DEFAULT_FEE_PERCENTAGE, DEFAULT_SIGNATURE_VALIDITY_SECS,
};
use crate::env::env_is_set;
use crate::env_default;
use serde::{Deserialize, Serialize};

const DEFAULT_CASPER_CHAIN_NAME: &str = "CASPER-TEST";
const DEFAULT_CASPER_RPC_NODE_ADDRESS: &str = "http://localhost:7777/rpc";
const DEFAULT_CASPER_EVENT_NODE_ADDRESS: &str = "http://localhost:9999/events/main";
const DEFAULT_CASPER_GAS_LIMIT: u64 = 3_000_000_000;
const DEFAULT_BRIDGE_IN_PREFIX: &str = "TRICORN_BRIDGE_IN";
const DEFAULT_TRANSFER_OUT_PREFIX: &str = "TRICORN_TRANSFER_OUT";

/// One Casper network served by the bridge.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CasperConfig {
	#[serde(default = "default_casper_chain_name")]
	pub chain_name: String,
	#[serde(default = "default_casper_is_testnet")]
	pub is_testnet: bool,

	// Connection config.
	#[serde(default = "default_casper_rpc_node_address")]
	pub rpc_node_address: String,
	/// SSE endpoint streaming `DeployProcessed` frames.
	#[serde(default = "default_casper_event_node_address")]
	pub event_node_address: String,

	// Contract config.
	/// Hex contract hash of the bridge, also the `bridge_hash` of signature payloads.
	#[serde(default = "default_casper_bridge_contract_address")]
	pub bridge_contract_address: String,
	/// Transform key under which the bridge writes its events, e.g. `uref-...-007`.
	#[serde(default = "default_bridge_events_hash")]
	pub bridge_events_hash: String,
	#[serde(default = "default_bridge_in_prefix")]
	pub bridge_in_prefix: String,
	#[serde(default = "default_transfer_out_prefix")]
	pub transfer_out_prefix: String,

	/// Payment attached to outbound deploys, in motes.
	#[serde(default = "default_casper_gas_limit")]
	pub gas_limit: u64,
	#[serde(default = "default_casper_fee_percentage")]
	pub fee_percentage: String,
	/// Minutes.
	#[serde(default = "default_casper_estimated_confirmation")]
	pub estimated_confirmation: u32,
	/// Seconds a bridge-in signature stays valid.
	#[serde(default = "default_casper_signature_validity_time")]
	pub signature_validity_time: u64,
}

impl Default for CasperConfig {
	fn default() -> Self {
		Self {
			chain_name: default_casper_chain_name(),
			is_testnet: default_casper_is_testnet(),
			rpc_node_address: default_casper_rpc_node_address(),
			event_node_address: default_casper_event_node_address(),
			bridge_contract_address: default_casper_bridge_contract_address(),
			bridge_events_hash: default_bridge_events_hash(),
			bridge_in_prefix: default_bridge_in_prefix(),
			transfer_out_prefix: default_transfer_out_prefix(),
			gas_limit: default_casper_gas_limit(),
			fee_percentage: default_casper_fee_percentage(),
			estimated_confirmation: default_casper_estimated_confirmation(),
			signature_validity_time: default_casper_signature_validity_time(),
		}
	}
}

/// The Casper section built from the environment, present only when `RPC_NODE_ADDRESS` is set.
pub fn default_casper_networks() -> Vec<CasperConfig> {
	if env_is_set("RPC_NODE_ADDRESS") {
		vec![CasperConfig::default()]
	} else {
		Vec::new()
	}
}

env_default!(
	default_casper_chain_name,
	"CASPER_CHAIN_NAME",
	String,
	DEFAULT_CASPER_CHAIN_NAME.to_string()
);

env_default!(default_casper_is_testnet, "CASPER_IS_TESTNET", bool, true);

env_default!(
	default_casper_rpc_node_address,
	"RPC_NODE_ADDRESS",
	String,
	DEFAULT_CASPER_RPC_NODE_ADDRESS.to_string()
);

env_default!(
	default_casper_event_node_address,
	"EVENT_NODE_ADDRESS",
	String,
	DEFAULT_CASPER_EVENT_NODE_ADDRESS.to_string()
);

env_default!(
	default_casper_bridge_contract_address,
	"CASPER_BRIDGE_CONTRACT_ADDRESS",
	String,
	String::new()
);

env_default!(default_bridge_events_hash, "BRIDGE_EVENTS_HASH", String, String::new());

env_default!(
	default_bridge_in_prefix,
	"BRIDGE_IN_PREFIX",
	String,
	DEFAULT_BRIDGE_IN_PREFIX.to_string()
);

env_default!(
	default_transfer_out_prefix,
	"TRANSFER_OUT_PREFIX",
	String,
	DEFAULT_TRANSFER_OUT_PREFIX.to_string()
);

env_default!(default_casper_gas_limit, "CASPER_GAS_LIMIT", u64, DEFAULT_CASPER_GAS_LIMIT);

env_default!(
	default_casper_fee_percentage,
	"CASPER_FEE_PERCENTAGE",
	String,
	DEFAULT_FEE_PERCENTAGE.to_string()
);

env_default!(
	default_casper_estimated_confirmation,
	"CASPER_ESTIMATED_CONFIRMATION",
	u32,
	DEFAULT_ESTIMATED_CONFIRMATION
);

env_default!(
	default_casper_signature_validity_time,
	"CASPER_SIGNATURE_VALIDITY_TIME",
	u64,
	DEFAULT_SIGNATURE_VALIDITY_SECS
);
