use crate::key_store::{KeyStore, KeyStoreError, KeyType, Secret};
use alloy::primitives::keccak256;
use bridge_util::NetworkType;
use ed25519_dalek::Signer as _;
use thiserror::Error;

/// What the payload handed to [`Signing::sign`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
	/// A 32 byte transaction or deploy hash, signed with the transaction key.
	TransactionDigest,
	/// A bridge contract authorisation, signed with the signature key.
	DetachedMessage,
}

impl PayloadKind {
	pub fn key_type(&self) -> KeyType {
		match self {
			PayloadKind::TransactionDigest => KeyType::Transaction,
			PayloadKind::DetachedMessage => KeyType::Signature,
		}
	}
}

#[derive(Debug, Error)]
pub enum SignerError {
	#[error("No {key_type} key for {network_type}")]
	NoKey { network_type: NetworkType, key_type: KeyType },
	#[error("Signing is not supported for {0}")]
	UnsupportedNetwork(NetworkType),
	#[error("Invalid key material: {0}")]
	InvalidKey(String),
	#[error("Invalid payload: {0}")]
	InvalidPayload(String),
	#[error("Key store failure: {0}")]
	KeyStore(KeyStoreError),
}

impl From<KeyStoreError> for SignerError {
	fn from(e: KeyStoreError) -> Self {
		match e {
			KeyStoreError::NoKey { network_type, key_type } => {
				SignerError::NoKey { network_type, key_type }
			}
			other => SignerError::KeyStore(other),
		}
	}
}

/// Signing operations the connectors rely on.
#[async_trait::async_trait]
pub trait Signing: Send + Sync {
	async fn sign(
		&self,
		network_type: NetworkType,
		payload: &[u8],
		kind: PayloadKind,
	) -> Result<Vec<u8>, SignerError>;

	async fn public_key(&self, network_type: NetworkType) -> Result<Vec<u8>, SignerError>;
}

/// Signs with keys fetched from a [`KeyStore`] on every call.
pub struct Signer<K> {
	key_store: K,
}

impl<K: KeyStore> Signer<K> {
	pub fn new(key_store: K) -> Self {
		Signer { key_store }
	}

	pub fn key_store(&self) -> &K {
		&self.key_store
	}

	async fn key(&self, network_type: NetworkType, key_type: KeyType) -> Result<Secret, SignerError> {
		Ok(self.key_store.get(network_type, key_type).await?)
	}
}

fn digest32(payload: &[u8]) -> Result<&[u8], SignerError> {
	if payload.len() != 32 {
		return Err(SignerError::InvalidPayload(format!(
			"expected a 32 byte digest, got {} bytes",
			payload.len()
		)));
	}
	Ok(payload)
}

fn secp256k1_key(secret: &[u8]) -> Result<k256::ecdsa::SigningKey, SignerError> {
	k256::ecdsa::SigningKey::from_slice(secret).map_err(|e| SignerError::InvalidKey(e.to_string()))
}

/// `r || s || v` with `v` in `{0, 1}`, low-s, RFC6979 nonce.
fn secp256k1_sign(secret: &[u8], prehash: &[u8]) -> Result<Vec<u8>, SignerError> {
	let key = secp256k1_key(secret)?;
	let (signature, recovery_id) = key
		.sign_prehash_recoverable(prehash)
		.map_err(|e| SignerError::InvalidPayload(e.to_string()))?;
	let mut out = signature.to_bytes().to_vec();
	out.push(recovery_id.to_byte());
	Ok(out)
}

/// Accepts a 32 byte seed or 64 bytes of seed followed by the public key.
fn ed25519_key(secret: &[u8]) -> Result<ed25519_dalek::SigningKey, SignerError> {
	match secret.len() {
		32 => {
			let mut seed = [0u8; 32];
			seed.copy_from_slice(secret);
			Ok(ed25519_dalek::SigningKey::from_bytes(&seed))
		}
		64 => {
			let mut keypair = [0u8; 64];
			keypair.copy_from_slice(secret);
			ed25519_dalek::SigningKey::from_keypair_bytes(&keypair)
				.map_err(|e| SignerError::InvalidKey(e.to_string()))
		}
		len => Err(SignerError::InvalidKey(format!("ed25519 key of {len} bytes"))),
	}
}

#[async_trait::async_trait]
impl<K: KeyStore> Signing for Signer<K> {
	async fn sign(
		&self,
		network_type: NetworkType,
		payload: &[u8],
		kind: PayloadKind,
	) -> Result<Vec<u8>, SignerError> {
		if network_type == NetworkType::Solana {
			return Err(SignerError::UnsupportedNetwork(network_type));
		}
		let secret = self.key(network_type, kind.key_type()).await?;

		match (network_type, kind) {
			(NetworkType::Evm, PayloadKind::TransactionDigest) => {
				secp256k1_sign(&secret, digest32(payload)?)
			}
			(NetworkType::Evm, PayloadKind::DetachedMessage) => {
				secp256k1_sign(&secret, keccak256(payload).as_slice())
			}
			(NetworkType::Casper, PayloadKind::TransactionDigest) => {
				Ok(ed25519_key(&secret)?.sign(digest32(payload)?).to_bytes().to_vec())
			}
			(NetworkType::Casper, PayloadKind::DetachedMessage) => match secret.len() {
				32 => secp256k1_sign(&secret, digest32(payload)?),
				_ => Ok(ed25519_key(&secret)?.sign(payload).to_bytes().to_vec()),
			},
			(NetworkType::Solana, _) => Err(SignerError::UnsupportedNetwork(network_type)),
		}
	}

	async fn public_key(&self, network_type: NetworkType) -> Result<Vec<u8>, SignerError> {
		match network_type {
			NetworkType::Evm => {
				let secret = self.key(network_type, KeyType::Transaction).await?;
				let point = secp256k1_key(&secret)?.verifying_key().to_encoded_point(false);
				Ok(point.as_bytes()[1..].to_vec())
			}
			NetworkType::Casper => {
				let secret = self.key(network_type, KeyType::Transaction).await?;
				Ok(ed25519_key(&secret)?.verifying_key().to_bytes().to_vec())
			}
			NetworkType::Solana => Err(SignerError::UnsupportedNetwork(network_type)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::key_store::{InMemoryKeyStore, KeyCipher};
	use bridge_util::signature::{public_key_to_evm_address, recover_evm_address};
	use ed25519_dalek::Verifier;

	async fn signer() -> Signer<InMemoryKeyStore> {
		let store = InMemoryKeyStore::new(KeyCipher::new(&[7u8; 32]).unwrap());
		store.create(NetworkType::Evm, KeyType::Transaction, &[0x11; 32]).await.unwrap();
		store.create(NetworkType::Evm, KeyType::Signature, &[0x22; 32]).await.unwrap();
		store.create(NetworkType::Casper, KeyType::Transaction, &[0x33; 32]).await.unwrap();
		store.create(NetworkType::Casper, KeyType::Signature, &[0x44; 32]).await.unwrap();
		Signer::new(store)
	}

	#[tokio::test]
	async fn evm_detached_message_is_keccak_then_signed() {
		let signer = signer().await;
		let message = b"\x19Ethereum Signed Message:\n4test".to_vec();
		let signature =
			signer.sign(NetworkType::Evm, &message, PayloadKind::DetachedMessage).await.unwrap();
		assert_eq!(signature.len(), 65);
		assert!(signature[64] <= 1);

		let expected = {
			let key = k256::ecdsa::SigningKey::from_slice(&[0x22; 32]).unwrap();
			let point = key.verifying_key().to_encoded_point(false);
			public_key_to_evm_address(&point.as_bytes()[1..]).unwrap()
		};
		assert_eq!(recover_evm_address(b"test", &signature).unwrap(), expected);
	}

	#[tokio::test]
	async fn evm_digest_requires_32_bytes() {
		let signer = signer().await;
		let res = signer.sign(NetworkType::Evm, &[1u8; 31], PayloadKind::TransactionDigest).await;
		assert!(matches!(res, Err(SignerError::InvalidPayload(_))));

		let signature =
			signer.sign(NetworkType::Evm, &[1u8; 32], PayloadKind::TransactionDigest).await.unwrap();
		assert_eq!(signature.len(), 65);
		assert_eq!(signer.public_key(NetworkType::Evm).await.unwrap().len(), 64);
	}

	#[tokio::test]
	async fn casper_deploy_hash_is_ed25519_signed() {
		let signer = signer().await;
		let digest = [9u8; 32];
		let signature = signer
			.sign(NetworkType::Casper, &digest, PayloadKind::TransactionDigest)
			.await
			.unwrap();
		let public_key = signer.public_key(NetworkType::Casper).await.unwrap();

		let verifying =
			ed25519_dalek::VerifyingKey::from_bytes(&public_key.try_into().unwrap()).unwrap();
		let signature = ed25519_dalek::Signature::from_slice(&signature).unwrap();
		assert!(verifying.verify(&digest, &signature).is_ok());
	}

	#[tokio::test]
	async fn casper_detached_secp256k1_key_gives_65_bytes() {
		let signer = signer().await;
		let signature =
			signer.sign(NetworkType::Casper, &[5u8; 32], PayloadKind::DetachedMessage).await.unwrap();
		assert_eq!(signature.len(), 65);
	}

	#[tokio::test]
	async fn solana_and_missing_keys() {
		let signer = signer().await;
		assert!(matches!(
			signer.sign(NetworkType::Solana, &[0u8; 32], PayloadKind::TransactionDigest).await,
			Err(SignerError::UnsupportedNetwork(NetworkType::Solana))
		));
		assert!(matches!(
			signer.public_key(NetworkType::Solana).await,
			Err(SignerError::UnsupportedNetwork(_))
		));

		let empty = Signer::new(InMemoryKeyStore::new(KeyCipher::new(&[7u8; 32]).unwrap()));
		assert!(matches!(
			empty.public_key(NetworkType::Evm).await,
			Err(SignerError::NoKey { key_type: KeyType::Transaction, .. })
		));
	}
}
