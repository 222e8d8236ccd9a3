//! Authorisations verified by the Casper bridge contract: SHA-256 over a
//! prefixed payload, signed with the secp256k1 authoriser key.

use super::bytesrepr::write_big_uint;
use alloy::primitives::U256;
use bridge_signer::{PayloadKind, Signing};
use bridge_util::signature::without_v;
use bridge_util::{ConnectorError, ConnectorResult, NetworkType};
use sha2::{Digest, Sha256};

pub struct BridgeInPayload<'a> {
	pub prefix: &'a str,
	pub bridge_hash: &'a [u8],
	pub token: &'a [u8],
	pub account: &'a [u8],
	pub amount: U256,
	pub gas_commission: U256,
	/// Unix milliseconds.
	pub deadline: U256,
	pub nonce: U256,
	pub destination_chain: &'a str,
	pub destination_address: &'a str,
}

pub struct TransferOutPayload<'a> {
	pub prefix: &'a str,
	pub bridge_hash: &'a [u8],
	pub token: &'a [u8],
	pub account: &'a [u8],
	pub recipient: &'a [u8],
	pub amount: U256,
	pub gas_commission: U256,
	pub nonce: U256,
}

pub fn bridge_in_digest(payload: &BridgeInPayload<'_>) -> [u8; 32] {
	let mut data = payload.prefix.as_bytes().to_vec();
	data.extend_from_slice(payload.bridge_hash);
	data.extend_from_slice(payload.token);
	data.extend_from_slice(payload.account);
	write_big_uint(&mut data, payload.amount);
	write_big_uint(&mut data, payload.gas_commission);
	write_big_uint(&mut data, payload.deadline);
	write_big_uint(&mut data, payload.nonce);
	data.extend_from_slice(payload.destination_chain.as_bytes());
	data.extend_from_slice(payload.destination_address.as_bytes());
	Sha256::digest(&data).into()
}

pub fn transfer_out_digest(payload: &TransferOutPayload<'_>) -> [u8; 32] {
	let mut data = payload.prefix.as_bytes().to_vec();
	data.extend_from_slice(payload.bridge_hash);
	data.extend_from_slice(payload.token);
	data.extend_from_slice(payload.account);
	// Account key variant of the recipient.
	data.push(0);
	data.extend_from_slice(payload.recipient);
	write_big_uint(&mut data, payload.amount);
	write_big_uint(&mut data, payload.gas_commission);
	write_big_uint(&mut data, payload.nonce);
	Sha256::digest(&data).into()
}

/// Signs a digest with the authoriser key. Recoverable secp256k1 signatures
/// lose their `v`; ed25519 ones are returned as is.
pub async fn sign_digest(signer: &dyn Signing, digest: &[u8; 32]) -> ConnectorResult<Vec<u8>> {
	let raw = signer
		.sign(NetworkType::Casper, digest, PayloadKind::DetachedMessage)
		.await
		.map_err(|e| ConnectorError::Signer(e.to_string()))?;
	if raw.len() == 64 {
		return Ok(raw);
	}
	without_v(&raw).map_err(|e| ConnectorError::Signer(e.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use bridge_signer::{InMemoryKeyStore, KeyCipher, KeyStore, KeyType, Signer};

	const AUTHORISER: &str = "cc903a2179a5c47acef21d732c0693848c6c33e626fd6651b3773732bde6e127";
	const ACCOUNT: &str = "5e681784dab76326249cf0d5f413806c366bbe4ed04508349a2e4b162fdcea5a";

	async fn signer() -> Signer<InMemoryKeyStore> {
		let store = InMemoryKeyStore::new(KeyCipher::new(&[9u8; 32]).unwrap());
		store
			.create(NetworkType::Casper, KeyType::Signature, &hex::decode(AUTHORISER).unwrap())
			.await
			.unwrap();
		Signer::new(store)
	}

	#[tokio::test]
	async fn bridge_in_vector() {
		let bridge_hash =
			hex::decode("23e2dafc78abbb9a5159aef578eafd1794774838ddae2cfc8ed5165ee67b471d").unwrap();
		let token =
			hex::decode("c62925cefa47af5eb44a2c46de1055315b9371e3b34c47cb4ec6e30d5ab18ef6").unwrap();
		let account = hex::decode(ACCOUNT).unwrap();

		let digest = bridge_in_digest(&BridgeInPayload {
			prefix: "TRICORN_BRIDGE_IN",
			bridge_hash: &bridge_hash,
			token: &token,
			account: &account,
			amount: U256::from(1_000_000_000_000u64),
			gas_commission: U256::from(1000u64),
			deadline: U256::from(1_672_943_628u64),
			nonce: U256::from(555u64),
			destination_chain: "DEST",
			destination_address: "DESTADDR",
		});
		let signature = sign_digest(&signer().await, &digest).await.unwrap();
		assert_eq!(
			hex::encode(signature),
			"704a998ecd23af18ea1e6b61139975982fd8cedb5625eac9451b47b4658e48df24441537f57102d9f050448de5279d0ee7e4e24cac5e5deaa9c3eeeecbb1fb82"
		);
	}

	#[tokio::test]
	async fn transfer_out_vector() {
		let token =
			hex::decode("f7d8a923e6de29974a313945d5feedf9b43732ccad5e635d43a4b8b239e6a16f").unwrap();
		let account = hex::decode(ACCOUNT).unwrap();
		let recipient =
			hex::decode("e94daaff79c2ab8d9c31d9c3058d7d0a0dd31204a5638dc1451fa67b2e3fb88c").unwrap();

		let digest = transfer_out_digest(&TransferOutPayload {
			prefix: "BBCSP/TR_OUT",
			bridge_hash: &[],
			token: &token,
			account: &account,
			recipient: &recipient,
			amount: U256::from(969_999_999_000u64),
			gas_commission: U256::from(30_000_001_000u64),
			nonce: U256::from(556u64),
		});
		let signature = sign_digest(&signer().await, &digest).await.unwrap();
		assert_eq!(
			hex::encode(signature),
			"613cec1ab8d753f495f7e512659f4156655ce2a216fc2c67f003530a5b0d18362212fb1fff7ee6a35c54ff8bf3c865a12bab6e872138c424bf5134105fb39618"
		);
	}

	#[tokio::test]
	async fn ed25519_authoriser_keeps_the_full_signature() {
		let store = InMemoryKeyStore::new(KeyCipher::new(&[9u8; 32]).unwrap());
		let mut keypair = [0x21u8; 64];
		let public = ed25519_dalek::SigningKey::from_bytes(&[0x21; 32]).verifying_key().to_bytes();
		keypair[32..].copy_from_slice(&public);
		store.create(NetworkType::Casper, KeyType::Signature, &keypair).await.unwrap();

		let signature = sign_digest(&Signer::new(store), &[1u8; 32]).await.unwrap();
		assert_eq!(signature.len(), 64);
	}
}
