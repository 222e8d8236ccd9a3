//! Reaction to bridge events: persistence of transactions and transfers and the
//! outbound release on the destination network.

use crate::connectors::Connectors;
use alloy::primitives::U256;
use bridge_indexer_db::models::{NewTokenTransfer, NewTransaction};
use bridge_indexer_db::{BridgeStore, StoreError};
use bridge_util::networks::{address_body, NetworkError};
use bridge_util::types::{amount_to_bytes, parse_amount, AmountError, TokenOutRequest};
use bridge_util::{
	Connector, ConnectorError, EventVariant, FundsIn, FundsOut, Network, NetworkAddress,
	TransactionInfo, TransferStatus,
};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
	#[error(transparent)]
	Network(#[from] NetworkError),
	#[error("Invalid amount: {0}")]
	Amount(#[from] AmountError),
	#[error("Network {0} is not connected")]
	NotConnected(String),
	#[error(transparent)]
	Store(#[from] StoreError),
	#[error(transparent)]
	Connector(#[from] ConnectorError),
}

/// What happened to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	Processed,
	/// The triggering transaction was already recorded.
	Duplicate,
	/// A release that matches no confirming transfer.
	Unmatched,
}

pub struct TransferOrchestrator<S, C> {
	store: Arc<S>,
	connectors: Arc<Connectors<C>>,
	token_id: i64,
}

impl<S: BridgeStore, C: Connector> TransferOrchestrator<S, C> {
	pub fn new(store: Arc<S>, connectors: Arc<Connectors<C>>, token_id: i64) -> Self {
		TransferOrchestrator { store, connectors, token_id }
	}

	pub async fn handle(
		&self,
		network: &Network,
		event: EventVariant,
	) -> Result<Outcome, TransferError> {
		match event {
			EventVariant::FundsIn(event) => self.funds_in(network, event).await,
			EventVariant::FundsOut(event) => self.funds_out(network, event).await,
		}
	}

	/// Records the transaction unless it was seen before.
	async fn record_transaction(
		&self,
		network: &Network,
		tx: &TransactionInfo,
		sender: Vec<u8>,
	) -> Result<Option<i64>, TransferError> {
		match self.store.transaction_exists(network.id, &tx.hash).await {
			Ok(()) => {}
			Err(StoreError::AlreadyExists) => {
				tracing::debug!(
					network = %network.name,
					tx = %hex::encode(&tx.hash),
					"Transaction already processed"
				);
				return Ok(None);
			}
			Err(e) => return Err(e.into()),
		}

		let id = self
			.store
			.create_transaction(NewTransaction {
				network_id: network.id,
				tx_hash: tx.hash.clone(),
				sender,
				block_number: tx.block_number,
				seen_at: Utc::now(),
			})
			.await?;
		Ok(Some(id))
	}

	async fn funds_in(&self, network: &Network, event: FundsIn) -> Result<Outcome, TransferError> {
		let destination = event.to.network()?;
		let recipient = address_body(destination.network_type, &event.to.to_bytes()?);
		let amount = parse_amount(&event.amount)?;
		let sender = address_body(network.network_type, &event.from);

		let Some(triggering_tx) =
			self.record_transaction(network, &event.tx, sender.clone()).await?
		else {
			return Ok(Outcome::Duplicate);
		};

		let transfer_id = self
			.store
			.create_transfer(NewTokenTransfer {
				triggering_tx,
				outbound_tx: None,
				token_id: self.token_id,
				amount: amount_to_bytes(amount),
				status: TransferStatus::Confirming,
				sender_network_id: network.id,
				sender_address: sender,
				recipient_network_id: destination.id,
				recipient_address: recipient.clone(),
			})
			.await?;
		tracing::info!(
			network = %network.name,
			transfer = transfer_id,
			destination = %event.to,
			%amount,
			"Transfer confirming"
		);

		let token = self.store.get_network_token(destination.id, self.token_id).await?;
		let connector = self
			.connectors
			.get(destination.name)
			.ok_or_else(|| TransferError::NotConnected(destination.name.to_string()))?;

		let tx_hash = connector
			.bridge_out(TokenOutRequest {
				amount,
				token: token.contract_address,
				to: recipient,
				from: NetworkAddress::new(network.name.clone(), hex::encode(&event.from)),
				transaction_id: U256::from(triggering_tx),
			})
			.await?;
		tracing::info!(
			network = %destination.name,
			transfer = transfer_id,
			tx = %hex::encode(&tx_hash),
			"bridge_out submitted"
		);
		Ok(Outcome::Processed)
	}

	async fn funds_out(&self, network: &Network, event: FundsOut) -> Result<Outcome, TransferError> {
		let source = event.from.network()?;
		let sender = address_body(source.network_type, &event.from.to_bytes()?);
		let recipient = address_body(network.network_type, &event.to);
		let amount = amount_to_bytes(parse_amount(&event.amount)?);

		let Some(outbound_tx) =
			self.record_transaction(network, &event.tx, event.tx.sender.clone()).await?
		else {
			return Ok(Outcome::Duplicate);
		};

		let mut transfer = match self
			.store
			.get_transfer_by_params(self.token_id, &amount, &sender, &recipient)
			.await
		{
			Ok(transfer) => transfer,
			Err(StoreError::NoTransfer) => {
				tracing::warn!(
					network = %network.name,
					tx = %hex::encode(&event.tx.hash),
					from = %event.from,
					"Release matches no confirming transfer"
				);
				return Ok(Outcome::Unmatched);
			}
			Err(e) => return Err(e.into()),
		};

		transfer.status = TransferStatus::Finished;
		transfer.outbound_tx = Some(outbound_tx);
		let transfer_id = transfer.id;
		self.store.update_transfer(transfer).await?;
		tracing::info!(network = %network.name, transfer = transfer_id, "Transfer finished");
		Ok(Outcome::Processed)
	}
}
