//! Static network registry and network aware address conversion.

use base58::{FromBase58, ToBase58};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Casper key tag of an account hash.
pub const CASPER_TAG_ACCOUNT: u8 = 0x01;
/// Casper key tag of a contract (package) hash.
pub const CASPER_TAG_HASH: u8 = 0x02;

const CASPER_PREFIXES: [&str; 2] = ["account-hash-", "hash-"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
	#[error("Network is not supported or its name invalid: {0}")]
	UnknownName(String),
	#[error("Network is not supported or its id invalid: {0}")]
	UnknownId(u32),
	#[error("Network is not supported or its type invalid: {0}")]
	UnknownType(String),
	#[error("Invalid address {address} for {network_type}: {reason}")]
	InvalidAddress { network_type: NetworkType, address: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkType {
	#[serde(rename = "NT_EVM")]
	Evm,
	#[serde(rename = "NT_CASPER")]
	Casper,
	#[serde(rename = "NT_SOLANA")]
	Solana,
}

impl NetworkType {
	pub fn as_str(&self) -> &'static str {
		match self {
			NetworkType::Evm => "NT_EVM",
			NetworkType::Casper => "NT_CASPER",
			NetworkType::Solana => "NT_SOLANA",
		}
	}
}

impl fmt::Display for NetworkType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for NetworkType {
	type Err = NetworkError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"NT_EVM" => Ok(NetworkType::Evm),
			"NT_CASPER" => Ok(NetworkType::Casper),
			"NT_SOLANA" => Ok(NetworkType::Solana),
			other => Err(NetworkError::UnknownType(other.to_string())),
		}
	}
}

/// Registry entry of a network the bridge knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkInfo {
	pub id: u32,
	pub name: &'static str,
	pub network_type: NetworkType,
	pub is_testnet: bool,
}

pub const NETWORKS: [NetworkInfo; 12] = [
	NetworkInfo { id: 0, name: "CASPER", network_type: NetworkType::Casper, is_testnet: false },
	NetworkInfo { id: 1, name: "ETH", network_type: NetworkType::Evm, is_testnet: false },
	NetworkInfo { id: 2, name: "SOLANA", network_type: NetworkType::Solana, is_testnet: false },
	NetworkInfo { id: 3, name: "POLYGON", network_type: NetworkType::Evm, is_testnet: false },
	NetworkInfo { id: 4, name: "CASPER-TEST", network_type: NetworkType::Casper, is_testnet: true },
	NetworkInfo { id: 5, name: "GOERLI", network_type: NetworkType::Evm, is_testnet: true },
	NetworkInfo { id: 6, name: "SOLANA-TEST", network_type: NetworkType::Solana, is_testnet: true },
	NetworkInfo { id: 7, name: "MUMBAI", network_type: NetworkType::Evm, is_testnet: true },
	NetworkInfo { id: 8, name: "BNB", network_type: NetworkType::Evm, is_testnet: false },
	NetworkInfo { id: 9, name: "BNB-TEST", network_type: NetworkType::Evm, is_testnet: true },
	NetworkInfo { id: 10, name: "AVALANCHE", network_type: NetworkType::Evm, is_testnet: false },
	NetworkInfo { id: 11, name: "AVALANCHE-TEST", network_type: NetworkType::Evm, is_testnet: true },
];

pub fn network_by_name(name: &str) -> Result<&'static NetworkInfo, NetworkError> {
	NETWORKS
		.iter()
		.find(|n| n.name == name)
		.ok_or_else(|| NetworkError::UnknownName(name.to_string()))
}

pub fn network_by_id(id: u32) -> Result<&'static NetworkInfo, NetworkError> {
	NETWORKS.iter().find(|n| n.id == id).ok_or(NetworkError::UnknownId(id))
}

/// Runtime description of a connected network, as reported by its connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
	pub id: u32,
	pub name: String,
	#[serde(rename = "type")]
	pub network_type: NetworkType,
	pub is_testnet: bool,
	pub node_address: String,
	pub bridge_contract: String,
	pub gas_limit: u64,
}

/// A textual address qualified by the name of its network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkAddress {
	pub network_name: String,
	pub address: String,
}

impl NetworkAddress {
	pub fn new(network_name: impl Into<String>, address: impl Into<String>) -> Self {
		NetworkAddress { network_name: network_name.into(), address: address.into() }
	}

	pub fn network(&self) -> Result<&'static NetworkInfo, NetworkError> {
		network_by_name(&self.network_name)
	}

	/// Decodes the address text with the rules of its network.
	pub fn to_bytes(&self) -> Result<Vec<u8>, NetworkError> {
		string_to_bytes(self.network()?.network_type, &self.address)
	}
}

impl fmt::Display for NetworkAddress {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.network_name, self.address)
	}
}

/// Converts an address string to bytes. EVM and Casper are hex with an optional
/// `0x`, `account-hash-` or `hash-` prefix, Solana is base58.
pub fn string_to_bytes(network_type: NetworkType, address: &str) -> Result<Vec<u8>, NetworkError> {
	let invalid = |reason: String| NetworkError::InvalidAddress {
		network_type,
		address: address.to_string(),
		reason,
	};
	match network_type {
		NetworkType::Evm | NetworkType::Casper => {
			let mut body = address.trim();
			body = body.strip_prefix("0x").unwrap_or(body);
			for prefix in CASPER_PREFIXES {
				if let Some(stripped) = body.strip_prefix(prefix) {
					body = stripped;
					break;
				}
			}
			hex::decode(body).map_err(|e| invalid(e.to_string()))
		}
		NetworkType::Solana => address.from_base58().map_err(|e| invalid(format!("{e:?}"))),
	}
}

/// Inverse of [`string_to_bytes`]. EVM output carries the `0x` prefix.
pub fn bytes_to_string(network_type: NetworkType, bytes: &[u8]) -> String {
	match network_type {
		NetworkType::Evm => format!("0x{}", hex::encode(bytes)),
		NetworkType::Casper => hex::encode(bytes),
		NetworkType::Solana => bytes.to_base58(),
	}
}

/// Strips the Casper key tag from a tagged 33 byte key. Other networks and
/// untagged values are returned as is.
pub fn address_body(network_type: NetworkType, bytes: &[u8]) -> Vec<u8> {
	match (network_type, bytes) {
		(NetworkType::Casper, [tag, body @ ..])
			if body.len() == 32 && (*tag == CASPER_TAG_ACCOUNT || *tag == CASPER_TAG_HASH) =>
		{
			body.to_vec()
		}
		_ => bytes.to_vec(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn registry_is_consistent() {
		for (idx, network) in NETWORKS.iter().enumerate() {
			assert_eq!(network.id as usize, idx);
			assert_eq!(network_by_name(network.name).unwrap().id, network.id);
		}
		assert_eq!(network_by_name("GOERLI").unwrap().network_type, NetworkType::Evm);
		assert!(network_by_name("CASPER-TEST").unwrap().is_testnet);
		assert!(network_by_name("goerli").is_err());
		assert_eq!(network_by_id(12), Err(NetworkError::UnknownId(12)));
	}

	#[test]
	fn network_type_wire_names() {
		assert_eq!("NT_CASPER".parse::<NetworkType>().unwrap(), NetworkType::Casper);
		assert_eq!(serde_json::to_string(&NetworkType::Solana).unwrap(), "\"NT_SOLANA\"");
		assert!("NT_BTC".parse::<NetworkType>().is_err());
	}

	#[test]
	fn hex_prefixes_are_stripped() {
		let expected = vec![0xab; 32];
		let body = "ab".repeat(32);
		for text in [
			body.clone(),
			format!("0x{body}"),
			format!("account-hash-{body}"),
			format!("hash-{body}"),
		] {
			assert_eq!(string_to_bytes(NetworkType::Casper, &text).unwrap(), expected);
		}
		assert_eq!(
			string_to_bytes(NetworkType::Evm, "0x0E26df2BaaFBC976a104EE3cbcf1B467ff1b7a69")
				.unwrap()
				.len(),
			20
		);
		assert!(string_to_bytes(NetworkType::Evm, "0xzz").is_err());
	}

	#[test]
	fn solana_uses_base58() {
		let bytes = vec![1u8; 32];
		let text = bytes_to_string(NetworkType::Solana, &bytes);
		assert_eq!(string_to_bytes(NetworkType::Solana, &text).unwrap(), bytes);
		assert!(string_to_bytes(NetworkType::Solana, "0OIl").is_err());
	}

	#[test]
	fn casper_tag_is_stripped() {
		let mut tagged = vec![CASPER_TAG_ACCOUNT];
		tagged.extend([7u8; 32]);
		assert_eq!(address_body(NetworkType::Casper, &tagged), vec![7u8; 32]);
		assert_eq!(address_body(NetworkType::Casper, &[7u8; 32]), vec![7u8; 32]);
		assert_eq!(address_body(NetworkType::Evm, &tagged), tagged);
	}
}
