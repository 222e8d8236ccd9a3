//! Signature and key helpers shared by the EVM and Casper adapters.

use alloy::primitives::{keccak256, Address, B256};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use thiserror::Error;

/// Message users sign to prove ownership of an address when listing history.
pub const AUTHENTICATION_MESSAGE: &[u8] = b"Bridge Authentication Proof";

const EVM_SIGNATURE_LENGTH: usize = 65;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
	#[error("Invalid signature length: expected {expected}, got {actual}")]
	InvalidLength { expected: usize, actual: usize },
	#[error("Invalid recovery id: {0}")]
	InvalidRecoveryId(u8),
	#[error("Signature recovery failed: {0}")]
	Recovery(String),
	#[error("Invalid public key: {0}")]
	InvalidPublicKey(String),
}

fn check_evm_length(signature: &[u8]) -> Result<(), SignatureError> {
	if signature.len() != EVM_SIGNATURE_LENGTH {
		return Err(SignatureError::InvalidLength {
			expected: EVM_SIGNATURE_LENGTH,
			actual: signature.len(),
		});
	}
	Ok(())
}

/// Trims `r || s || v` to `r || s`.
pub fn without_v(signature: &[u8]) -> Result<Vec<u8>, SignatureError> {
	check_evm_length(signature)?;
	Ok(signature[..64].to_vec())
}

/// Shifts a `0/1` recovery byte to the `27/28` form EVM contracts expect.
pub fn to_evm_signature(signature: &[u8]) -> Result<Vec<u8>, SignatureError> {
	check_evm_length(signature)?;
	let mut out = signature.to_vec();
	match out[64] {
		0 | 1 => out[64] += 27,
		27 | 28 => {}
		v => return Err(SignatureError::InvalidRecoveryId(v)),
	}
	Ok(out)
}

/// EIP-191 personal message: `"\x19Ethereum Signed Message:\n" || len || message`.
pub fn eth_signed_message(message: &[u8]) -> Vec<u8> {
	let mut data = format!("\x19Ethereum Signed Message:\n{}", message.len()).into_bytes();
	data.extend_from_slice(message);
	data
}

pub fn eth_signed_message_hash(message: &[u8]) -> B256 {
	keccak256(eth_signed_message(message))
}

/// Recovers the signer of an EIP-191 wrapped `message`. `v` may be `0/1` or `27/28`.
pub fn recover_evm_address(message: &[u8], signature: &[u8]) -> Result<Address, SignatureError> {
	check_evm_length(signature)?;
	let v = signature[64];
	let recovery_byte = match v {
		0 | 1 => v,
		27 | 28 => v - 27,
		_ => return Err(SignatureError::InvalidRecoveryId(v)),
	};
	let recovery_id =
		RecoveryId::from_byte(recovery_byte).ok_or(SignatureError::InvalidRecoveryId(v))?;
	let sig = Signature::from_slice(&signature[..64])
		.map_err(|e| SignatureError::Recovery(e.to_string()))?;
	let (sig, recovery_id) = match sig.normalize_s() {
		Some(normalized) => (
			normalized,
			RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced()),
		),
		None => (sig, recovery_id),
	};

	let hash = eth_signed_message_hash(message);
	let key = VerifyingKey::recover_from_prehash(hash.as_slice(), &sig, recovery_id)
		.map_err(|e| SignatureError::Recovery(e.to_string()))?;
	let point = key.to_encoded_point(false);
	public_key_to_evm_address(&point.as_bytes()[1..])
}

/// Address of a 64 byte `x || y` or 65 byte SEC1 uncompressed public key.
pub fn public_key_to_evm_address(public_key: &[u8]) -> Result<Address, SignatureError> {
	let xy = match public_key.len() {
		64 => public_key,
		65 if public_key[0] == 0x04 => &public_key[1..],
		len => return Err(SignatureError::InvalidPublicKey(format!("length {len}"))),
	};
	Ok(Address::from_slice(&keccak256(xy)[12..]))
}

/// Casper account hash of an ed25519 public key.
pub fn public_key_to_account_hash(public_key: &[u8]) -> Result<[u8; 32], SignatureError> {
	let key = match public_key.len() {
		32 => public_key,
		33 if public_key[0] == 0x01 => &public_key[1..],
		len => return Err(SignatureError::InvalidPublicKey(format!("length {len}"))),
	};
	let mut preimage = b"ed25519".to_vec();
	preimage.push(0);
	preimage.extend_from_slice(key);
	let digest = blake2b_simd::Params::new().hash_length(32).hash(&preimage);
	let mut out = [0u8; 32];
	out.copy_from_slice(digest.as_bytes());
	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;
	use k256::ecdsa::SigningKey;

	#[test]
	fn eip191_hash_vector() {
		assert_eq!(
			hex::encode(eth_signed_message_hash(b"1212")),
			"c4e8036a01f1b83ad304f8738e5cf0cf99dbe114cb05083ec89ce18c5860844e"
		);
	}

	#[test]
	fn recovers_the_signing_address() {
		let key = SigningKey::random(&mut rand::thread_rng());
		let expected =
			public_key_to_evm_address(&key.verifying_key().to_encoded_point(false).as_bytes()[1..])
				.unwrap();

		let hash = eth_signed_message_hash(AUTHENTICATION_MESSAGE);
		let (sig, recid) = key.sign_prehash_recoverable(hash.as_slice()).unwrap();
		let mut raw = sig.to_bytes().to_vec();
		raw.push(recid.to_byte());

		assert_eq!(recover_evm_address(AUTHENTICATION_MESSAGE, &raw).unwrap(), expected);
		let shifted = to_evm_signature(&raw).unwrap();
		assert_eq!(recover_evm_address(AUTHENTICATION_MESSAGE, &shifted).unwrap(), expected);
		assert_ne!(
			recover_evm_address(b"another message", &raw).ok(),
			Some(expected),
			"a different message must not recover the signer"
		);
	}

	#[test]
	fn wallet_signature_recovers() {
		let signature = hex::decode(
			"d29bb47954dc2c0d67778507d9a96852bd0da75dce2337009fcce23a6dedb5625ad5541523ac3c2959c0d31b60b62b980a3c778fd903cedf9f17a99ba9d2152e1b",
		)
		.unwrap();
		let address = recover_evm_address(AUTHENTICATION_MESSAGE, &signature).unwrap();

		let mut tampered = signature.clone();
		tampered[10] ^= 0xff;
		assert_ne!(recover_evm_address(AUTHENTICATION_MESSAGE, &tampered).ok(), Some(address));
	}

	#[test]
	fn signature_length_and_v_are_checked() {
		let sig = [0u8; 65];
		assert_eq!(without_v(&sig).unwrap().len(), 64);
		assert_eq!(to_evm_signature(&sig).unwrap()[64], 27);
		let mut bad_v = sig;
		bad_v[64] = 5;
		assert_eq!(to_evm_signature(&bad_v), Err(SignatureError::InvalidRecoveryId(5)));
		assert_eq!(
			without_v(&[0u8; 64]),
			Err(SignatureError::InvalidLength { expected: 65, actual: 64 })
		);
	}

	#[test]
	fn account_hash_accepts_tagged_keys() {
		let key = [9u8; 32];
		let mut tagged = vec![0x01];
		tagged.extend_from_slice(&key);
		assert_eq!(
			public_key_to_account_hash(&key).unwrap(),
			public_key_to_account_hash(&tagged).unwrap()
		);
		assert!(public_key_to_account_hash(&[1u8; 10]).is_err());
	}
}
