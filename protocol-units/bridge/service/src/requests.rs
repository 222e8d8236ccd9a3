//! User facing queries and signature requests.

use crate::connectors::Connectors;
use alloy::primitives::utils::parse_ether;
use alloy::primitives::U256;
use bridge_indexer_db::models::TokenTransfer;
use bridge_indexer_db::{BridgeStore, StoreError};
use bridge_util::networks::{
	address_body, bytes_to_string, network_by_id, network_by_name, string_to_bytes, NetworkInfo,
};
use bridge_util::signature::{
	public_key_to_account_hash, recover_evm_address, AUTHENTICATION_MESSAGE,
};
use bridge_util::types::{
	amount_from_bytes, parse_amount, AmountError, BridgeInSignatureRequest,
	BridgeInSignatureResponse, CancelSignatureRequest, Estimation,
};
use bridge_util::{
	Connector, ConnectorError, Network, NetworkAddress, NetworkError, NetworkType, TransferStatus,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RequestError {
	#[error("Network {0} is not connected")]
	NotConnectedNetwork(String),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Transfer is {0}, only waiting transfers can be cancelled")]
	InvalidTransferStatus(TransferStatus),
	#[error(transparent)]
	Store(#[from] StoreError),
	#[error(transparent)]
	Connector(#[from] ConnectorError),
	#[error("Internal error: {0}")]
	Internal(String),
}

impl RequestError {
	pub fn generic<E: std::error::Error>(e: E) -> Self {
		Self::Internal(e.to_string())
	}

	/// HTTP status the gateway answers with.
	pub fn status_code(&self) -> u16 {
		match self {
			RequestError::NotConnectedNetwork(_) => 404,
			RequestError::InvalidArgument(_) | RequestError::InvalidTransferStatus(_) => 400,
			RequestError::Store(e) if e.is_not_found() => 404,
			RequestError::Connector(ConnectorError::InvalidArgument(_)) => 400,
			RequestError::Store(_) | RequestError::Connector(_) | RequestError::Internal(_) => 500,
		}
	}
}

impl From<NetworkError> for RequestError {
	fn from(e: NetworkError) -> Self {
		RequestError::InvalidArgument(e.to_string())
	}
}

impl From<AmountError> for RequestError {
	fn from(e: AmountError) -> Self {
		RequestError::InvalidArgument(e.to_string())
	}
}

pub type RequestResult<T> = Result<T, RequestError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAddress {
	pub network_id: u32,
	pub address: String,
	pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedToken {
	pub id: i64,
	pub short_name: String,
	pub long_name: String,
	pub addresses: Vec<TokenAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxHash {
	pub network_name: String,
	pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferView {
	pub id: i64,
	pub amount: String,
	pub sender: NetworkAddress,
	pub recipient: NetworkAddress,
	pub status: TransferStatus,
	pub triggering_tx: TxHash,
	pub outbound_tx: Option<TxHash>,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
	pub transfers: Vec<TransferView>,
	pub offset: u64,
	pub limit: u64,
	pub total_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelTransferResponse {
	pub status: TransferStatus,
	pub nonce: u64,
	pub signature: Vec<u8>,
	pub token: Vec<u8>,
	pub recipient: Vec<u8>,
	pub commission: String,
	pub amount: String,
}

fn network_address(network_id: u32, address: &[u8]) -> NetworkAddress {
	match network_by_id(network_id) {
		Ok(network) => {
			NetworkAddress::new(network.name, bytes_to_string(network.network_type, address))
		}
		Err(_) => NetworkAddress::new(network_id.to_string(), hex::encode(address)),
	}
}

fn tx_hash(network_id: u32, hash: &[u8]) -> TxHash {
	let (network_name, network_type) = match network_by_id(network_id) {
		Ok(network) => (network.name.to_string(), network.network_type),
		Err(_) => (network_id.to_string(), NetworkType::Casper),
	};
	TxHash { network_name, hash: bytes_to_string(network_type, hash) }
}

/// Commission in base units. Integer fees are taken as is, decimal ones as an
/// amount of the native 18 decimal coin.
fn commission_from_fee(fee: &str) -> RequestResult<U256> {
	match parse_amount(fee) {
		Ok(commission) => Ok(commission),
		Err(AmountError::NotInteger(_)) => parse_ether(fee)
			.map_err(|e| RequestError::Internal(format!("could not parse commission {fee}: {e}"))),
		Err(e) => Err(RequestError::Internal(format!("could not parse commission {fee}: {e}"))),
	}
}

/// Request surface over the store and the connected networks.
pub struct Requests<S, C> {
	store: Arc<S>,
	connectors: Arc<Connectors<C>>,
}

impl<S, C> Clone for Requests<S, C> {
	fn clone(&self) -> Self {
		Requests { store: self.store.clone(), connectors: self.connectors.clone() }
	}
}

impl<S: BridgeStore, C: Connector> Requests<S, C> {
	pub fn new(store: Arc<S>, connectors: Arc<Connectors<C>>) -> Self {
		Requests { store, connectors }
	}

	fn connected_by_name(&self, name: &str) -> RequestResult<(&'static NetworkInfo, Arc<C>)> {
		let network = network_by_name(name)?;
		let connector = self
			.connectors
			.get(network.name)
			.ok_or_else(|| RequestError::NotConnectedNetwork(network.name.to_string()))?;
		Ok((network, connector))
	}

	fn connected_by_id(&self, id: u32) -> RequestResult<(&'static NetworkInfo, Arc<C>)> {
		let network =
			network_by_id(id).map_err(|_| RequestError::NotConnectedNetwork(id.to_string()))?;
		self.connected_by_name(network.name)
	}

	pub fn list_connected_networks(&self) -> Vec<Network> {
		self.connectors.networks()
	}

	pub async fn list_supported_tokens(&self, network_id: u32) -> RequestResult<Vec<SupportedToken>> {
		let (network, _) = self.connected_by_id(network_id)?;
		let tokens = self.store.list_tokens(network.id).await?;

		let mut supported = Vec::with_capacity(tokens.len());
		for token in tokens {
			let addresses = self
				.store
				.list_network_tokens(token.id)
				.await?
				.into_iter()
				.map(|network_token| {
					let address = match network_by_id(network_token.network_id) {
						Ok(info) => bytes_to_string(info.network_type, &network_token.contract_address),
						Err(_) => hex::encode(&network_token.contract_address),
					};
					TokenAddress {
						network_id: network_token.network_id,
						address,
						decimals: network_token.decimals,
					}
				})
				.collect();
			supported.push(SupportedToken {
				id: token.id,
				short_name: token.short_name,
				long_name: token.long_name,
				addresses,
			});
		}
		Ok(supported)
	}

	async fn render(&self, transfers: Vec<TokenTransfer>) -> RequestResult<Vec<TransferView>> {
		let mut views = Vec::with_capacity(transfers.len());
		for transfer in transfers {
			let triggering = self.store.get_transaction(transfer.triggering_tx).await?;
			let outbound_tx = match transfer.outbound_tx {
				Some(id) => {
					let outbound = self.store.get_transaction(id).await?;
					Some(tx_hash(outbound.network_id, &outbound.tx_hash))
				}
				None => None,
			};
			views.push(TransferView {
				id: transfer.id,
				amount: amount_from_bytes(&transfer.amount)?.to_string(),
				sender: network_address(transfer.sender_network_id, &transfer.sender_address),
				recipient: network_address(transfer.recipient_network_id, &transfer.recipient_address),
				status: transfer.status,
				triggering_tx: tx_hash(triggering.network_id, &triggering.tx_hash),
				outbound_tx,
				created_at: triggering.seen_at,
			});
		}
		Ok(views)
	}

	/// Transfer triggered or completed by `tx_hash` on `network_name`.
	pub async fn transfer_info(
		&self,
		network_name: &str,
		tx_hash: &str,
	) -> RequestResult<Vec<TransferView>> {
		let (network, _) = self.connected_by_name(network_name)?;
		let hash = string_to_bytes(network.network_type, tx_hash)?;
		let transfer = self.store.get_transfer_by_network_and_tx(network.id, &hash).await?;
		self.render(vec![transfer]).await
	}

	pub async fn estimate_transfer(
		&self,
		sender_network: &str,
		recipient_network: &str,
		token_id: i64,
		amount: &str,
	) -> RequestResult<Estimation> {
		self.connected_by_name(sender_network)?;
		let (recipient, connector) = self.connected_by_name(recipient_network)?;
		parse_amount(amount)?;
		self.store.get_network_token(recipient.id, token_id).await?;
		Ok(connector.estimate_transfer().await?)
	}

	pub async fn bridge_in_signature(
		&self,
		sender: NetworkAddress,
		token_id: i64,
		amount: &str,
		destination: NetworkAddress,
	) -> RequestResult<BridgeInSignatureResponse> {
		let (network, connector) = self.connected_by_name(&sender.network_name)?;
		destination.network()?;
		let amount = parse_amount(amount)?;
		let user = sender.to_bytes()?;
		let token = self.store.get_network_token(network.id, token_id).await?;

		let nonce = self.store.increment_nonce(network.id).await?;
		tracing::info!(network = %network.name, nonce, "Issuing bridge-in signature");

		Ok(connector
			.bridge_in_signature(BridgeInSignatureRequest {
				user,
				nonce: U256::from(nonce),
				token: token.contract_address,
				amount,
				destination,
				gas_commission: U256::ZERO,
			})
			.await?)
	}

	/// Signature returning the funds of a waiting transfer to its sender.
	/// `signature` is the hash of the transaction that created the transfer.
	pub async fn cancel_transfer(
		&self,
		transfer_id: i64,
		signature: &[u8],
		network_id: u32,
		public_key: &[u8],
	) -> RequestResult<CancelTransferResponse> {
		let (network, connector) = self.connected_by_id(network_id)?;
		let transfer = self.store.get_transfer_by_network_and_tx(network.id, signature).await?;
		if transfer.id != transfer_id {
			return Err(RequestError::InvalidArgument(format!(
				"transaction belongs to transfer {}, not {transfer_id}",
				transfer.id
			)));
		}
		if transfer.status != TransferStatus::Waiting {
			return Err(RequestError::InvalidTransferStatus(transfer.status));
		}
		tracing::debug!(
			network = %network.name,
			transfer = transfer.id,
			public_key = %hex::encode(public_key),
			"Cancelling transfer"
		);

		let token = self.store.get_network_token(network.id, transfer.token_id).await?;
		let estimation = connector.estimate_transfer().await?;
		let commission = commission_from_fee(&estimation.fee)?;
		let amount = amount_from_bytes(&transfer.amount)?;

		let nonce = self.store.increment_nonce(network.id).await?;
		let response = connector
			.cancel_signature(CancelSignatureRequest {
				nonce: U256::from(nonce),
				token: token.contract_address.clone(),
				recipient: transfer.sender_address.clone(),
				commission,
				amount,
			})
			.await?;

		Ok(CancelTransferResponse {
			status: transfer.status,
			nonce,
			signature: response.signature,
			token: token.contract_address,
			recipient: transfer.sender_address,
			commission: commission.to_string(),
			amount: amount.to_string(),
		})
	}

	/// Transfers of the authenticated user. EVM users prove their address with a
	/// signature over the authentication message, Casper users pass their key.
	pub async fn history(
		&self,
		offset: u64,
		limit: u64,
		signature: &[u8],
		public_key: &[u8],
		network_id: u32,
	) -> RequestResult<Page> {
		let (network, _) = self.connected_by_id(network_id)?;
		let mut page = Page { transfers: Vec::new(), offset, limit, total_count: 0 };

		let address = match network.network_type {
			NetworkType::Evm => match recover_evm_address(AUTHENTICATION_MESSAGE, signature) {
				Ok(address) => address.to_vec(),
				Err(e) => {
					tracing::debug!(network = %network.name, "History signature rejected: {e}");
					return Ok(page);
				}
			},
			NetworkType::Casper => casper_account(public_key),
			NetworkType::Solana => public_key.to_vec(),
		};

		let transfers =
			self.store.list_transfers_by_user(offset, limit, &address, network.id).await?;
		page.transfers = self.render(transfers).await?;
		page.total_count = self.store.count_transfers_by_user(network.id, &address).await?;
		Ok(page)
	}
}

/// Account hash stored for a Casper user: derived from a tagged ed25519 key,
/// or the key itself when it already is an account hash.
fn casper_account(public_key: &[u8]) -> Vec<u8> {
	match public_key_to_account_hash(public_key) {
		Ok(hash) if public_key.len() == 33 => hash.to_vec(),
		_ => address_body(NetworkType::Casper, public_key),
	}
}
