//! Construction of signed `bridge_out` deploys.
//!
//! Hashes are blake2b-256 over the byte representation; the node receives the
//! JSON form.

use super::bytesrepr::{big_uint_bytes, write_bytes, write_string, write_u32, write_u64};
use alloy::primitives::U256;
use bridge_util::networks::CASPER_TAG_ACCOUNT;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

pub const DEPLOY_TTL_MS: u64 = 30 * 60 * 1000;
const DEPLOY_TTL_TEXT: &str = "30m";
const GAS_PRICE: u64 = 1;
const BRIDGE_OUT_ENTRY_POINT: &str = "bridge_out";

/// Ed25519 key and signature tag in Casper's `PublicKey` and `Signature`.
const ED25519_TAG: u8 = 0x01;
const KEY_ACCOUNT_TAG: u8 = 0x00;

const MODULE_BYTES_TAG: u8 = 0;
const STORED_CONTRACT_BY_HASH_TAG: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CLType {
	U256,
	U512,
	String,
	Key,
	ByteArray(u32),
}

impl CLType {
	fn write(&self, out: &mut Vec<u8>) {
		match self {
			CLType::U256 => out.push(7),
			CLType::U512 => out.push(8),
			CLType::String => out.push(10),
			CLType::Key => out.push(11),
			CLType::ByteArray(len) => {
				out.push(15);
				write_u32(out, *len);
			}
		}
	}

	fn to_json(self) -> Value {
		match self {
			CLType::U256 => json!("U256"),
			CLType::U512 => json!("U512"),
			CLType::String => json!("String"),
			CLType::Key => json!("Key"),
			CLType::ByteArray(len) => json!({ "ByteArray": len }),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CLValue {
	pub cl_type: CLType,
	pub bytes: Vec<u8>,
	pub parsed: Value,
}

impl CLValue {
	pub fn u256(value: U256) -> Self {
		CLValue { cl_type: CLType::U256, bytes: big_uint_bytes(value), parsed: json!(value.to_string()) }
	}

	pub fn u512(value: u64) -> Self {
		CLValue {
			cl_type: CLType::U512,
			bytes: big_uint_bytes(U256::from(value)),
			parsed: json!(value.to_string()),
		}
	}

	pub fn string(value: &str) -> Self {
		let mut bytes = Vec::new();
		write_string(&mut bytes, value);
		CLValue { cl_type: CLType::String, bytes, parsed: json!(value) }
	}

	pub fn account_key(account_hash: &[u8; 32]) -> Self {
		let mut bytes = vec![KEY_ACCOUNT_TAG];
		bytes.extend_from_slice(account_hash);
		CLValue {
			cl_type: CLType::Key,
			bytes,
			parsed: json!({ "Account": format!("account-hash-{}", hex::encode(account_hash)) }),
		}
	}

	pub fn byte_array(value: &[u8; 32]) -> Self {
		CLValue { cl_type: CLType::ByteArray(32), bytes: value.to_vec(), parsed: json!(hex::encode(value)) }
	}

	fn write(&self, out: &mut Vec<u8>) {
		write_bytes(out, &self.bytes);
		self.cl_type.write(out);
	}

	fn to_json(&self) -> Value {
		json!({
			"cl_type": self.cl_type.to_json(),
			"bytes": hex::encode(&self.bytes),
			"parsed": self.parsed,
		})
	}
}

/// Ordered named arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeArgs(pub Vec<(String, CLValue)>);

impl RuntimeArgs {
	pub fn push(&mut self, name: &str, value: CLValue) {
		self.0.push((name.to_string(), value));
	}

	fn write(&self, out: &mut Vec<u8>) {
		write_u32(out, self.0.len() as u32);
		for (name, value) in &self.0 {
			write_string(out, name);
			value.write(out);
		}
	}

	fn to_json(&self) -> Value {
		Value::Array(self.0.iter().map(|(name, value)| json!([name, value.to_json()])).collect())
	}
}

/// Arguments of the bridge contract's `bridge_out` entry point.
pub struct BridgeOutArgs<'a> {
	pub token: [u8; 32],
	pub amount: U256,
	pub transaction_id: U256,
	pub source_chain: &'a str,
	pub source_address: &'a str,
	pub recipient: [u8; 32],
}

impl BridgeOutArgs<'_> {
	pub fn runtime_args(&self) -> RuntimeArgs {
		let mut args = RuntimeArgs::default();
		args.push("token_contract", CLValue::byte_array(&self.token));
		args.push("amount", CLValue::u256(self.amount));
		args.push("transaction_id", CLValue::u256(self.transaction_id));
		args.push("source_chain", CLValue::string(self.source_chain));
		args.push("source_address", CLValue::string(self.source_address));
		args.push("recipient", CLValue::account_key(&self.recipient));
		args
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approval {
	pub signer: Vec<u8>,
	pub signature: Vec<u8>,
}

/// Deploy calling a stored contract, paid with standard payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deploy {
	account: [u8; 32],
	timestamp_ms: u64,
	chain_name: String,
	payment: RuntimeArgs,
	contract_hash: [u8; 32],
	entry_point: String,
	session: RuntimeArgs,
	body_hash: [u8; 32],
	hash: [u8; 32],
	approvals: Vec<Approval>,
}

fn blake2b256(data: &[u8]) -> [u8; 32] {
	let digest = blake2b_simd::Params::new().hash_length(32).hash(data);
	let mut out = [0u8; 32];
	out.copy_from_slice(digest.as_bytes());
	out
}

fn tagged_ed25519(body: &[u8]) -> Vec<u8> {
	let mut out = Vec::with_capacity(body.len() + 1);
	out.push(ED25519_TAG);
	out.extend_from_slice(body);
	out
}

impl Deploy {
	/// `account` is the ed25519 public key paying for and approving the deploy.
	pub fn bridge_out(
		account: [u8; 32],
		chain_name: &str,
		timestamp_ms: u64,
		payment_amount: u64,
		contract_hash: [u8; 32],
		args: &BridgeOutArgs<'_>,
	) -> Deploy {
		let mut payment = RuntimeArgs::default();
		payment.push("amount", CLValue::u512(payment_amount));

		let mut deploy = Deploy {
			account,
			timestamp_ms,
			chain_name: chain_name.to_lowercase(),
			payment,
			contract_hash,
			entry_point: BRIDGE_OUT_ENTRY_POINT.to_string(),
			session: args.runtime_args(),
			body_hash: [0u8; 32],
			hash: [0u8; 32],
			approvals: Vec::new(),
		};
		deploy.body_hash = blake2b256(&deploy.body_bytes());
		deploy.hash = blake2b256(&deploy.header_bytes());
		deploy
	}

	pub fn hash(&self) -> [u8; 32] {
		self.hash
	}

	pub fn approve(&mut self, signature: &[u8]) {
		self.approvals.push(Approval {
			signer: tagged_ed25519(&self.account),
			signature: tagged_ed25519(signature),
		});
	}

	fn body_bytes(&self) -> Vec<u8> {
		let mut out = Vec::new();
		out.push(MODULE_BYTES_TAG);
		write_bytes(&mut out, &[]);
		self.payment.write(&mut out);

		out.push(STORED_CONTRACT_BY_HASH_TAG);
		out.extend_from_slice(&self.contract_hash);
		write_string(&mut out, &self.entry_point);
		self.session.write(&mut out);
		out
	}

	fn header_bytes(&self) -> Vec<u8> {
		let mut out = Vec::new();
		out.push(CASPER_TAG_ACCOUNT);
		out.extend_from_slice(&self.account);
		write_u64(&mut out, self.timestamp_ms);
		write_u64(&mut out, DEPLOY_TTL_MS);
		write_u64(&mut out, GAS_PRICE);
		out.extend_from_slice(&self.body_hash);
		write_u32(&mut out, 0);
		write_string(&mut out, &self.chain_name);
		out
	}

	pub fn to_json(&self) -> Value {
		let timestamp = i64::try_from(self.timestamp_ms)
			.ok()
			.and_then(DateTime::<Utc>::from_timestamp_millis)
			.unwrap_or_default()
			.to_rfc3339_opts(SecondsFormat::Millis, true);
		json!({
			"hash": hex::encode(self.hash),
			"header": {
				"account": hex::encode(tagged_ed25519(&self.account)),
				"timestamp": timestamp,
				"ttl": DEPLOY_TTL_TEXT,
				"gas_price": GAS_PRICE,
				"body_hash": hex::encode(self.body_hash),
				"dependencies": [],
				"chain_name": self.chain_name,
			},
			"payment": {
				"ModuleBytes": { "module_bytes": "", "args": self.payment.to_json() }
			},
			"session": {
				"StoredContractByHash": {
					"hash": hex::encode(self.contract_hash),
					"entry_point": self.entry_point,
					"args": self.session.to_json(),
				}
			},
			"approvals": self.approvals.iter().map(|approval| json!({
				"signer": hex::encode(&approval.signer),
				"signature": hex::encode(&approval.signature),
			})).collect::<Vec<_>>(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn args() -> BridgeOutArgs<'static> {
		BridgeOutArgs {
			token: [0xf0; 32],
			amount: U256::from(1000u64),
			transaction_id: U256::from(7u64),
			source_chain: "GOERLI",
			source_address: "0x0101",
			recipient: [0x5e; 32],
		}
	}

	fn deploy() -> Deploy {
		Deploy::bridge_out([0x11; 32], "CASPER-TEST", 1_672_943_628_000, 2_500_000_000, [0x23; 32], &args())
	}

	#[test]
	fn payment_amount_is_u512() {
		let value = CLValue::u512(2_500_000_000);
		assert_eq!(hex::encode(&value.bytes), "0400f90295");
		let mut out = Vec::new();
		value.write(&mut out);
		assert_eq!(hex::encode(out), "050000000400f9029508");
	}

	#[test]
	fn key_and_byte_array_layouts() {
		let mut out = Vec::new();
		CLValue::account_key(&[0xab; 32]).write(&mut out);
		assert_eq!(&out[..5], &[33, 0, 0, 0, KEY_ACCOUNT_TAG]);
		assert_eq!(out[out.len() - 1], 11);

		let mut out = Vec::new();
		CLValue::byte_array(&[1; 32]).write(&mut out);
		assert_eq!(&out[out.len() - 5..], &[15, 32, 0, 0, 0]);
	}

	#[test]
	fn hashes_cover_header_and_body() {
		let base = deploy();
		assert_eq!(base.hash, blake2b256(&base.header_bytes()));
		assert_eq!(base.body_hash, blake2b256(&base.body_bytes()));

		let other_amount = Deploy::bridge_out(
			[0x11; 32],
			"CASPER-TEST",
			1_672_943_628_000,
			2_500_000_000,
			[0x23; 32],
			&BridgeOutArgs { amount: U256::from(1001u64), ..args() },
		);
		assert_ne!(base.body_hash, other_amount.body_hash);
		assert_ne!(base.hash, other_amount.hash);

		let later =
			Deploy::bridge_out([0x11; 32], "CASPER-TEST", 1_672_943_628_001, 2_500_000_000, [0x23; 32], &args());
		assert_eq!(base.body_hash, later.body_hash);
		assert_ne!(base.hash, later.hash);
	}

	#[test]
	fn header_layout() {
		let header = deploy().header_bytes();
		assert_eq!(header[0], CASPER_TAG_ACCOUNT);
		assert_eq!(&header[33..41], &1_672_943_628_000u64.to_le_bytes());
		assert_eq!(&header[41..49], &DEPLOY_TTL_MS.to_le_bytes());
		assert_eq!(&header[49..57], &1u64.to_le_bytes());
		assert!(header.ends_with(b"casper-test"));
	}

	#[test]
	fn json_form_carries_the_approval() {
		let mut deploy = deploy();
		deploy.approve(&[0x77; 64]);
		let json = deploy.to_json();

		assert_eq!(json["hash"], hex::encode(deploy.hash()));
		assert_eq!(json["header"]["chain_name"], "casper-test");
		assert_eq!(json["header"]["timestamp"], "2023-01-05T18:33:48.000Z");
		assert_eq!(json["header"]["ttl"], "30m");
		assert_eq!(json["header"]["account"], format!("01{}", "11".repeat(32)));
		assert_eq!(json["approvals"][0]["signature"], format!("01{}", "77".repeat(64)));

		let session = &json["session"]["StoredContractByHash"];
		assert_eq!(session["entry_point"], "bridge_out");
		let names: Vec<_> =
			session["args"].as_array().unwrap().iter().map(|arg| arg[0].clone()).collect();
		assert_eq!(
			names,
			vec![
				"token_contract",
				"amount",
				"transaction_id",
				"source_chain",
				"source_address",
				"recipient"
			]
		);
		assert_eq!(session["args"][0][1]["cl_type"], json!({ "ByteArray": 32 }));
		assert_eq!(json["payment"]["ModuleBytes"]["args"][0][1]["bytes"], "0400f90295");
	}
}
