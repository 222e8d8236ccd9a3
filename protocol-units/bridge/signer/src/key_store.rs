//! Encrypted storage of the bridge's private keys.
//!
//! Entries are keyed by network type and key purpose. The store never
//! interprets the secrets, it only encrypts them at rest.

use bridge_util::NetworkType;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use rand::RngCore;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use thiserror::Error;
use zeroize::Zeroizing;

pub const NONCE_LENGTH: usize = 24;
pub const MASTER_KEY_LENGTH: usize = 32;

/// Plain secret as returned by a store, wiped on drop.
pub type Secret = Zeroizing<Vec<u8>>;

#[derive(Debug, Error)]
pub enum KeyStoreError {
	#[error("No {key_type} key for {network_type}")]
	NoKey { network_type: NetworkType, key_type: KeyType },
	#[error("A {key_type} key for {network_type} already exists")]
	AlreadyExists { network_type: NetworkType, key_type: KeyType },
	#[error("Invalid master key: {0}")]
	InvalidMasterKey(String),
	#[error("Key encryption failure: {0}")]
	Crypto(String),
	#[error("Key store database error: {0}")]
	Database(String),
}

impl KeyStoreError {
	pub fn generic<E: std::error::Error>(e: E) -> Self {
		Self::Database(e.to_string())
	}
}

/// Purpose of a key: signing chain transactions or detached bridge contract
/// authorisations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
	Transaction,
	Signature,
}

impl KeyType {
	pub fn as_str(&self) -> &'static str {
		match self {
			KeyType::Transaction => "DT_TRANSACTION",
			KeyType::Signature => "DT_SIGNATURE",
		}
	}
}

impl fmt::Display for KeyType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for KeyType {
	type Err = KeyStoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"DT_TRANSACTION" => Ok(KeyType::Transaction),
			"DT_SIGNATURE" => Ok(KeyType::Signature),
			other => Err(KeyStoreError::Database(format!("unknown key type {other}"))),
		}
	}
}

#[async_trait::async_trait]
pub trait KeyStore: Send + Sync {
	async fn create(
		&self,
		network_type: NetworkType,
		key_type: KeyType,
		secret: &[u8],
	) -> Result<(), KeyStoreError>;

	async fn get(&self, network_type: NetworkType, key_type: KeyType)
		-> Result<Secret, KeyStoreError>;

	async fn update(
		&self,
		network_type: NetworkType,
		key_type: KeyType,
		secret: &[u8],
	) -> Result<(), KeyStoreError>;
}

/// Ciphertext with the nonce it was sealed under.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedKey {
	pub nonce: Vec<u8>,
	pub ciphertext: Vec<u8>,
}

impl fmt::Debug for EncryptedKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EncryptedKey")
			.field("nonce", &hex::encode(&self.nonce))
			.field("ciphertext", &"<redacted>")
			.finish()
	}
}

/// XChaCha20-Poly1305 under the configured master key.
#[derive(Clone)]
pub struct KeyCipher {
	key: Zeroizing<[u8; MASTER_KEY_LENGTH]>,
}

impl fmt::Debug for KeyCipher {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("KeyCipher").field("key", &"<redacted>").finish()
	}
}

impl KeyCipher {
	pub fn new(master_key: &[u8]) -> Result<Self, KeyStoreError> {
		let key: [u8; MASTER_KEY_LENGTH] = master_key.try_into().map_err(|_| {
			KeyStoreError::InvalidMasterKey(format!(
				"expected {MASTER_KEY_LENGTH} bytes, got {}",
				master_key.len()
			))
		})?;
		Ok(KeyCipher { key: Zeroizing::new(key) })
	}

	pub fn from_hex(master_key: &str) -> Result<Self, KeyStoreError> {
		let bytes = Zeroizing::new(
			hex::decode(master_key.trim_start_matches("0x"))
				.map_err(|e| KeyStoreError::InvalidMasterKey(e.to_string()))?,
		);
		Self::new(&bytes)
	}

	fn cipher(&self) -> Result<XChaCha20Poly1305, KeyStoreError> {
		XChaCha20Poly1305::new_from_slice(self.key.as_slice())
			.map_err(|e| KeyStoreError::InvalidMasterKey(e.to_string()))
	}

	/// Seals `secret` under a fresh random nonce.
	pub fn encrypt(&self, secret: &[u8]) -> Result<EncryptedKey, KeyStoreError> {
		let mut nonce = [0u8; NONCE_LENGTH];
		rand::thread_rng().fill_bytes(&mut nonce);
		let ciphertext = self
			.cipher()?
			.encrypt(XNonce::from_slice(&nonce), secret)
			.map_err(|e| KeyStoreError::Crypto(e.to_string()))?;
		Ok(EncryptedKey { nonce: nonce.to_vec(), ciphertext })
	}

	pub fn decrypt(&self, entry: &EncryptedKey) -> Result<Secret, KeyStoreError> {
		if entry.nonce.len() != NONCE_LENGTH {
			return Err(KeyStoreError::Crypto(format!("bad nonce length {}", entry.nonce.len())));
		}
		let plain = self
			.cipher()?
			.decrypt(XNonce::from_slice(&entry.nonce), entry.ciphertext.as_slice())
			.map_err(|e| KeyStoreError::Crypto(e.to_string()))?;
		Ok(Zeroizing::new(plain))
	}
}

/// Process local store, mostly for tests and single node setups.
#[derive(Debug)]
pub struct InMemoryKeyStore {
	cipher: KeyCipher,
	entries: Mutex<HashMap<(NetworkType, KeyType), EncryptedKey>>,
}

impl InMemoryKeyStore {
	pub fn new(cipher: KeyCipher) -> Self {
		InMemoryKeyStore { cipher, entries: Mutex::new(HashMap::new()) }
	}

	fn entries(
		&self,
	) -> std::sync::MutexGuard<'_, HashMap<(NetworkType, KeyType), EncryptedKey>> {
		self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}
}

#[async_trait::async_trait]
impl KeyStore for InMemoryKeyStore {
	async fn create(
		&self,
		network_type: NetworkType,
		key_type: KeyType,
		secret: &[u8],
	) -> Result<(), KeyStoreError> {
		let sealed = self.cipher.encrypt(secret)?;
		let mut entries = self.entries();
		if entries.contains_key(&(network_type, key_type)) {
			return Err(KeyStoreError::AlreadyExists { network_type, key_type });
		}
		entries.insert((network_type, key_type), sealed);
		Ok(())
	}

	async fn get(
		&self,
		network_type: NetworkType,
		key_type: KeyType,
	) -> Result<Secret, KeyStoreError> {
		let sealed = self
			.entries()
			.get(&(network_type, key_type))
			.cloned()
			.ok_or(KeyStoreError::NoKey { network_type, key_type })?;
		self.cipher.decrypt(&sealed)
	}

	async fn update(
		&self,
		network_type: NetworkType,
		key_type: KeyType,
		secret: &[u8],
	) -> Result<(), KeyStoreError> {
		let sealed = self.cipher.encrypt(secret)?;
		match self.entries().get_mut(&(network_type, key_type)) {
			Some(entry) => {
				*entry = sealed;
				Ok(())
			}
			None => Err(KeyStoreError::NoKey { network_type, key_type }),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn cipher() -> KeyCipher {
		KeyCipher::new(&[42u8; 32]).unwrap()
	}

	#[test]
	fn sealing_uses_fresh_nonces() {
		let cipher = cipher();
		let first = cipher.encrypt(b"secret").unwrap();
		let second = cipher.encrypt(b"secret").unwrap();
		assert_eq!(first.nonce.len(), NONCE_LENGTH);
		assert_ne!(first.nonce, second.nonce);
		assert_ne!(first.ciphertext, b"secret".to_vec());
		assert_eq!(cipher.decrypt(&first).unwrap().as_slice(), b"secret");
	}

	#[test]
	fn wrong_master_key_fails() {
		let sealed = cipher().encrypt(b"secret").unwrap();
		let other = KeyCipher::new(&[1u8; 32]).unwrap();
		assert!(matches!(other.decrypt(&sealed), Err(KeyStoreError::Crypto(_))));
		assert!(matches!(KeyCipher::new(&[1u8; 16]), Err(KeyStoreError::InvalidMasterKey(_))));
		assert!(!format!("{:?}", cipher()).contains("42"));
	}

	#[tokio::test]
	async fn missing_entries_report_no_key() {
		let store = InMemoryKeyStore::new(cipher());
		assert!(matches!(
			store.get(NetworkType::Evm, KeyType::Signature).await,
			Err(KeyStoreError::NoKey { .. })
		));
		assert!(matches!(
			store.update(NetworkType::Evm, KeyType::Signature, b"k").await,
			Err(KeyStoreError::NoKey { .. })
		));
	}

	#[tokio::test]
	async fn create_get_update() {
		let store = InMemoryKeyStore::new(cipher());
		store.create(NetworkType::Casper, KeyType::Transaction, b"one").await.unwrap();
		assert!(matches!(
			store.create(NetworkType::Casper, KeyType::Transaction, b"two").await,
			Err(KeyStoreError::AlreadyExists { .. })
		));
		assert_eq!(
			store.get(NetworkType::Casper, KeyType::Transaction).await.unwrap().as_slice(),
			b"one"
		);

		store.update(NetworkType::Casper, KeyType::Transaction, b"two").await.unwrap();
		assert_eq!(
			store.get(NetworkType::Casper, KeyType::Transaction).await.unwrap().as_slice(),
			b"two"
		);
		assert!(store.get(NetworkType::Casper, KeyType::Signature).await.is_err());
	}

	#[tokio::test]
	async fn debug_output_hides_ciphertext() {
		let store = InMemoryKeyStore::new(cipher());
		store.create(NetworkType::Evm, KeyType::Transaction, b"plain secret").await.unwrap();
		let sealed = cipher().encrypt(b"plain secret").unwrap();

		let rendered = format!("{store:?} {sealed:?}");
		assert!(rendered.contains("<redacted>"));
		assert!(!rendered.contains(&hex::encode(&sealed.ciphertext)));
		assert!(!rendered.contains("plain secret"));
	}
}
