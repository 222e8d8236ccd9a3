//! Transaction signer backed by the bridge key store.
//!
//! The provider wallet never sees key material: every transaction digest is
//! handed to [`Signing`] with the EVM transaction key.

use alloy::consensus::SignableTransaction;
use alloy::primitives::{hex, Address, ChainId, Signature, B256};
use alloy::signers::{sign_transaction_with_chain_id, Signer};
use bridge_signer::{PayloadKind, SignerError, Signing};
use bridge_util::signature::public_key_to_evm_address;
use bridge_util::NetworkType;
use std::fmt;
use std::sync::Arc;

pub struct BridgeTxSigner {
	signer: Arc<dyn Signing>,
	public_key: Vec<u8>,
	address: Address,
	chain_id: Option<ChainId>,
}

impl fmt::Debug for BridgeTxSigner {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BridgeTxSigner")
			.field("chain_id", &self.chain_id)
			.field("public_key", &hex::encode(&self.public_key))
			.field("address", &self.address)
			.finish()
	}
}

impl BridgeTxSigner {
	/// Fetches the EVM public key and derives the owner address from it.
	pub async fn new(
		signer: Arc<dyn Signing>,
		chain_id: Option<ChainId>,
	) -> Result<BridgeTxSigner, SignerError> {
		let public_key = signer.public_key(NetworkType::Evm).await?;
		let address = public_key_to_evm_address(&public_key)
			.map_err(|e| SignerError::InvalidKey(e.to_string()))?;
		Ok(BridgeTxSigner { signer, public_key, address, chain_id })
	}

	pub fn owner(&self) -> Address {
		self.address
	}

	/// Signs a transaction digest and applies EIP-155 when a chain id is set.
	pub async fn sign_digest(&self, digest: &B256) -> Result<Signature, SignerError> {
		let raw = self
			.signer
			.sign(NetworkType::Evm, digest.as_slice(), PayloadKind::TransactionDigest)
			.await?;
		let mut signature = Signature::try_from(raw.as_slice())
			.map_err(|e| SignerError::InvalidPayload(e.to_string()))?;
		if let Some(chain_id) = self.chain_id {
			signature = signature.with_chain_id(chain_id);
		}
		Ok(signature)
	}
}

#[async_trait::async_trait]
impl alloy_network::TxSigner<Signature> for BridgeTxSigner {
	fn address(&self) -> Address {
		self.address
	}

	async fn sign_transaction(
		&self,
		tx: &mut dyn SignableTransaction<Signature>,
	) -> alloy::signers::Result<Signature> {
		sign_transaction_with_chain_id!(self, tx, self.sign_hash(&tx.signature_hash()).await)
	}
}

#[async_trait::async_trait]
impl Signer for BridgeTxSigner {
	async fn sign_hash(&self, hash: &B256) -> alloy::signers::Result<Signature> {
		self.sign_digest(hash).await.map_err(alloy::signers::Error::other)
	}

	#[inline]
	fn address(&self) -> Address {
		self.address
	}

	#[inline]
	fn chain_id(&self) -> Option<ChainId> {
		self.chain_id
	}

	#[inline]
	fn set_chain_id(&mut self, chain_id: Option<ChainId>) {
		self.chain_id = chain_id;
	}
}
