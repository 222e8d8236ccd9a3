use super::{
	DEFAULT_ESTIMATED_CONFIRMATION, DEFAULT_FEE_PERCENTAGE, DEFAULT_SIGNATURE_VALIDITY_SECS,
};
use crate::env::env_is_set;
use crate::env_default;
use serde::{Deserialize, Serialize};

const DEFAULT_EVM_CHAIN_NAME: &str = "GOERLI";
const DEFAULT_EVM_NODE_ADDRESS: &str = "http://localhost:8545";
const DEFAULT_EVM_WS_NODE_ADDRESS: &str = "ws://localhost:8545";
const DEFAULT_EVM_GAS_LIMIT: u64 = 500_000;

/// One EVM-family network served by the bridge.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvmConfig {
	#[serde(default = "default_evm_chain_name")]
	pub chain_name: String,
	#[serde(default = "default_evm_chain_id")]
	pub chain_id: u64,
	#[serde(default = "default_evm_is_testnet")]
	pub is_testnet: bool,

	// Connection config.
	#[serde(default = "default_evm_node_address")]
	pub node_address: String,
	#[serde(default = "default_evm_ws_node_address")]
	pub ws_node_address: String,

	// Contract config.
	#[serde(default = "default_evm_bridge_contract_address")]
	pub bridge_contract_address: String,
	/// Topic of the `FundsIn` event; empty selects the hash of the bound event signature.
	#[serde(default = "default_fund_in_event_hash")]
	pub fund_in_event_hash: String,
	#[serde(default = "default_fund_out_event_hash")]
	pub fund_out_event_hash: String,

	#[serde(default = "default_evm_gas_limit")]
	pub gas_limit: u64,
	#[serde(default = "default_evm_fee_percentage")]
	pub fee_percentage: String,
	/// Minutes.
	#[serde(default = "default_evm_estimated_confirmation")]
	pub estimated_confirmation: u32,
	/// Seconds a bridge-in signature stays valid.
	#[serde(default = "default_evm_signature_validity_time")]
	pub signature_validity_time: u64,
}

impl Default for EvmConfig {
	fn default() -> Self {
		Self {
			chain_name: default_evm_chain_name(),
			chain_id: default_evm_chain_id(),
			is_testnet: default_evm_is_testnet(),
			node_address: default_evm_node_address(),
			ws_node_address: default_evm_ws_node_address(),
			bridge_contract_address: default_evm_bridge_contract_address(),
			fund_in_event_hash: default_fund_in_event_hash(),
			fund_out_event_hash: default_fund_out_event_hash(),
			gas_limit: default_evm_gas_limit(),
			fee_percentage: default_evm_fee_percentage(),
			estimated_confirmation: default_evm_estimated_confirmation(),
			signature_validity_time: default_evm_signature_validity_time(),
		}
	}
}

/// The EVM section built from the environment, present only when `NODE_ADDRESS` is set.
pub fn default_evm_networks() -> Vec<EvmConfig> {
	if env_is_set("NODE_ADDRESS") {
		vec![EvmConfig::default()]
	} else {
		Vec::new()
	}
}

env_default!(default_evm_chain_name, "CHAIN_NAME", String, DEFAULT_EVM_CHAIN_NAME.to_string());

env_default!(default_evm_chain_id, "CHAIN_ID", u64, 5);

env_default!(default_evm_is_testnet, "IS_TESTNET", bool, true);

env_default!(
	default_evm_node_address,
	"NODE_ADDRESS",
	String,
	DEFAULT_EVM_NODE_ADDRESS.to_string()
);

env_default!(
	default_evm_ws_node_address,
	"WS_NODE_ADDRESS",
	String,
	DEFAULT_EVM_WS_NODE_ADDRESS.to_string()
);

env_default!(
	default_evm_bridge_contract_address,
	"BRIDGE_CONTRACT_ADDRESS",
	String,
	String::new()
);

env_default!(default_fund_in_event_hash, "FUND_IN_EVENT_HASH", String, String::new());

env_default!(default_fund_out_event_hash, "FUND_OUT_EVENT_HASH", String, String::new());

env_default!(default_evm_gas_limit, "GAS_LIMIT", u64, DEFAULT_EVM_GAS_LIMIT);

env_default!(
	default_evm_fee_percentage,
	"FEE_PERCENTAGE",
	String,
	DEFAULT_FEE_PERCENTAGE.to_string()
);

env_default!(
	default_evm_estimated_confirmation,
	"ESTIMATED_CONFIRMATION",
	u32,
	DEFAULT_ESTIMATED_CONFIRMATION
);

env_default!(
	default_evm_signature_validity_time,
	"SIGNATURE_VALIDITY_TIME",
	u64,
	DEFAULT_SIGNATURE_VALIDITY_SECS
);
