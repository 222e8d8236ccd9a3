//! Repository traits over the bridge tables.
//!
//! Every method is async; the Postgres implementation moves the diesel work to
//! the blocking pool, the in-memory one resolves immediately.

use crate::models::{
	NetworkToken, NewTokenTransfer, NewTransaction, Token, TokenTransfer, Transaction,
};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
	#[error("Transfer not found")]
	NoTransfer,
	#[error("Nonce not found for network {0}")]
	NoNonce(u32),
	#[error("Token not found")]
	NoToken,
	#[error("Last seen block not found for network {0}")]
	NoNetworkBlock(u32),
	#[error("Transaction not found")]
	NoTransaction,
	#[error("Row already exists")]
	AlreadyExists,
	#[error("Transfer {0} is final and can not be updated")]
	FinalTransfer(i64),
	#[error("Database error: {0}")]
	Database(String),
}

impl StoreError {
	pub fn generic<E: std::error::Error>(e: E) -> Self {
		Self::Database(e.to_string())
	}

	/// True for the "row is missing" family of errors.
	pub fn is_not_found(&self) -> bool {
		matches!(
			self,
			StoreError::NoTransfer
				| StoreError::NoNonce(_)
				| StoreError::NoToken
				| StoreError::NoNetworkBlock(_)
				| StoreError::NoTransaction
		)
	}
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait::async_trait]
pub trait Tokens: Send + Sync {
	async fn create_token(&self, short_name: &str, long_name: &str) -> StoreResult<i64>;

	async fn get_token(&self, id: i64) -> StoreResult<Token>;

	/// Tokens with a contract on `network_id`.
	async fn list_tokens(&self, network_id: u32) -> StoreResult<Vec<Token>>;
}

#[async_trait::async_trait]
pub trait NetworkTokens: Send + Sync {
	async fn create_network_token(&self, token: NetworkToken) -> StoreResult<()>;

	async fn get_network_token(&self, network_id: u32, token_id: i64) -> StoreResult<NetworkToken>;

	async fn list_network_tokens(&self, token_id: i64) -> StoreResult<Vec<NetworkToken>>;
}

#[async_trait::async_trait]
pub trait Transactions: Send + Sync {
	/// `Ok` when `(network_id, tx_hash)` is unknown, `AlreadyExists` otherwise.
	async fn transaction_exists(&self, network_id: u32, tx_hash: &[u8]) -> StoreResult<()>;

	async fn create_transaction(&self, transaction: NewTransaction) -> StoreResult<i64>;

	async fn get_transaction(&self, id: i64) -> StoreResult<Transaction>;
}

#[async_trait::async_trait]
pub trait TokenTransfers: Send + Sync {
	async fn create_transfer(&self, transfer: NewTokenTransfer) -> StoreResult<i64>;

	async fn get_transfer(&self, id: i64) -> StoreResult<TokenTransfer>;

	/// Transfer triggered by, or else completed by, the given transaction.
	async fn get_transfer_by_network_and_tx(
		&self,
		network_id: u32,
		tx_hash: &[u8],
	) -> StoreResult<TokenTransfer>;

	/// Newest `confirming` transfer with this fingerprint.
	async fn get_transfer_by_params(
		&self,
		token_id: i64,
		amount: &[u8],
		sender: &[u8],
		recipient: &[u8],
	) -> StoreResult<TokenTransfer>;

	/// Rejects updates of finished or cancelled transfers.
	async fn update_transfer(&self, transfer: TokenTransfer) -> StoreResult<()>;

	/// Transfers sent by `address`, newest triggering transaction first.
	async fn list_transfers_by_user(
		&self,
		offset: u64,
		limit: u64,
		address: &[u8],
		network_id: u32,
	) -> StoreResult<Vec<TokenTransfer>>;

	async fn count_transfers_by_user(&self, network_id: u32, address: &[u8]) -> StoreResult<u64>;
}

#[async_trait::async_trait]
pub trait Nonces: Send + Sync {
	async fn create_nonce(&self, network_id: u32, nonce: u64) -> StoreResult<()>;

	async fn get_nonce(&self, network_id: u32) -> StoreResult<u64>;

	/// Atomically bumps the counter and returns the value that was consumed.
	async fn increment_nonce(&self, network_id: u32) -> StoreResult<u64>;
}

#[async_trait::async_trait]
pub trait NetworkBlocks: Send + Sync {
	async fn create_network_block(&self, network_id: u32, block: u64) -> StoreResult<()>;

	async fn get_network_block(&self, network_id: u32) -> StoreResult<u64>;

	/// Moves the cursor forward; a lower block leaves it untouched.
	async fn update_network_block(&self, network_id: u32, block: u64) -> StoreResult<()>;
}

/// Everything the bridge service needs from persistence.
pub trait BridgeStore:
	Tokens + NetworkTokens + Transactions + TokenTransfers + Nonces + NetworkBlocks
{
}

impl<T> BridgeStore for T where
	T: Tokens + NetworkTokens + Transactions + TokenTransfers + Nonces + NetworkBlocks
{
}
