//! Authorisations checked by the bridge contract with `ecrecover`.
//!
//! Fields are packed the way `abi.encodePacked` lays them out, hashed with
//! keccak-256 and signed as an EIP-191 personal message.

use alloy::primitives::{keccak256, Address, B256, U256};
use bridge_signer::{PayloadKind, Signing};
use bridge_util::signature::{eth_signed_message, to_evm_signature};
use bridge_util::{ConnectorError, ConnectorResult, NetworkType};

pub struct BridgeInFields<'a> {
	pub user: Address,
	pub token: Address,
	pub amount: U256,
	pub gas_commission: U256,
	pub destination_chain: &'a str,
	pub destination_address: &'a str,
	pub deadline: U256,
	pub nonce: U256,
}

pub struct CancelFields {
	pub token: Address,
	pub recipient: Address,
	pub amount: U256,
	pub commission: U256,
	pub nonce: U256,
}

pub fn bridge_in_digest(fields: &BridgeInFields<'_>) -> B256 {
	let mut packed = Vec::with_capacity(20 * 2 + 32 * 4 + 64);
	packed.extend_from_slice(fields.user.as_slice());
	packed.extend_from_slice(fields.token.as_slice());
	packed.extend_from_slice(&fields.amount.to_be_bytes::<32>());
	packed.extend_from_slice(&fields.gas_commission.to_be_bytes::<32>());
	packed.extend_from_slice(fields.destination_chain.as_bytes());
	packed.extend_from_slice(fields.destination_address.as_bytes());
	packed.extend_from_slice(&fields.deadline.to_be_bytes::<32>());
	packed.extend_from_slice(&fields.nonce.to_be_bytes::<32>());
	keccak256(packed)
}

pub fn cancel_digest(fields: &CancelFields) -> B256 {
	let mut packed = Vec::with_capacity(20 * 2 + 32 * 3);
	packed.extend_from_slice(fields.token.as_slice());
	packed.extend_from_slice(fields.recipient.as_slice());
	packed.extend_from_slice(&fields.amount.to_be_bytes::<32>());
	packed.extend_from_slice(&fields.commission.to_be_bytes::<32>());
	packed.extend_from_slice(&fields.nonce.to_be_bytes::<32>());
	keccak256(packed)
}

/// Signs `digest` as a personal message and returns `r || s || v` with `v` in `{27, 28}`.
pub async fn sign_detached(signer: &dyn Signing, digest: B256) -> ConnectorResult<Vec<u8>> {
	let message = eth_signed_message(digest.as_slice());
	let raw = signer
		.sign(NetworkType::Evm, &message, PayloadKind::DetachedMessage)
		.await
		.map_err(|e| ConnectorError::Signer(e.to_string()))?;
	to_evm_signature(&raw).map_err(|e| ConnectorError::Signer(e.to_string()))
}
