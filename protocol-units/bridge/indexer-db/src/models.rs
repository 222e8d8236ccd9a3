use crate::schema::{network_tokens, token_transfers, tokens, transactions};
use crate::store::StoreError;
use bridge_util::TransferStatus;
use chrono::{DateTime, Utc};
use diesel::{AsChangeset, Insertable, Queryable, Selectable};

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = tokens)]
pub struct Token {
	pub id: i64,
	pub short_name: String,
	pub long_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkToken {
	pub network_id: u32,
	pub token_id: i64,
	pub contract_address: Vec<u8>,
	pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
	pub network_id: u32,
	pub tx_hash: Vec<u8>,
	pub sender: Vec<u8>,
	pub block_number: u64,
	pub seen_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
	pub id: i64,
	pub network_id: u32,
	pub tx_hash: Vec<u8>,
	pub sender: Vec<u8>,
	pub block_number: u64,
	pub seen_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTokenTransfer {
	pub triggering_tx: i64,
	pub outbound_tx: Option<i64>,
	pub token_id: i64,
	/// Unsigned big-endian, no leading zeros.
	pub amount: Vec<u8>,
	pub status: TransferStatus,
	pub sender_network_id: u32,
	pub sender_address: Vec<u8>,
	pub recipient_network_id: u32,
	pub recipient_address: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTransfer {
	pub id: i64,
	pub triggering_tx: i64,
	pub outbound_tx: Option<i64>,
	pub token_id: i64,
	pub amount: Vec<u8>,
	pub status: TransferStatus,
	pub sender_network_id: u32,
	pub sender_address: Vec<u8>,
	pub recipient_network_id: u32,
	pub recipient_address: Vec<u8>,
}

impl TokenTransfer {
	pub fn from_new(id: i64, new: NewTokenTransfer) -> Self {
		TokenTransfer {
			id,
			triggering_tx: new.triggering_tx,
			outbound_tx: new.outbound_tx,
			token_id: new.token_id,
			amount: new.amount,
			status: new.status,
			sender_network_id: new.sender_network_id,
			sender_address: new.sender_address,
			recipient_network_id: new.recipient_network_id,
			recipient_address: new.recipient_address,
		}
	}
}

// Database rows. Network ids are INTEGER and block numbers BIGINT in Postgres.

pub(crate) fn to_network_id(id: i32) -> Result<u32, StoreError> {
	u32::try_from(id).map_err(|_| StoreError::Database(format!("negative network id {id}")))
}

pub(crate) fn from_network_id(id: u32) -> Result<i32, StoreError> {
	i32::try_from(id).map_err(|_| StoreError::Database(format!("network id {id} out of range")))
}

pub(crate) fn from_block_number(block: u64) -> Result<i64, StoreError> {
	i64::try_from(block).map_err(|_| StoreError::Database(format!("block {block} out of range")))
}

#[derive(Insertable)]
#[diesel(table_name = tokens)]
pub(crate) struct NewTokenRow<'a> {
	pub short_name: &'a str,
	pub long_name: &'a str,
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = network_tokens)]
pub(crate) struct NetworkTokenRow {
	pub network_id: i32,
	pub token_id: i64,
	pub contract_address: Vec<u8>,
	pub decimals: i16,
}

impl NetworkTokenRow {
	pub fn from_model(model: &NetworkToken) -> Result<Self, StoreError> {
		Ok(NetworkTokenRow {
			network_id: from_network_id(model.network_id)?,
			token_id: model.token_id,
			contract_address: model.contract_address.clone(),
			decimals: i16::from(model.decimals),
		})
	}

	pub fn into_model(self) -> Result<NetworkToken, StoreError> {
		Ok(NetworkToken {
			network_id: to_network_id(self.network_id)?,
			token_id: self.token_id,
			contract_address: self.contract_address,
			decimals: u8::try_from(self.decimals)
				.map_err(|_| StoreError::Database(format!("bad decimals {}", self.decimals)))?,
		})
	}
}

#[derive(Insertable)]
#[diesel(table_name = transactions)]
pub(crate) struct NewTransactionRow {
	pub network_id: i32,
	pub tx_hash: Vec<u8>,
	pub sender: Vec<u8>,
	pub block_number: i64,
	pub seen_at: DateTime<Utc>,
}

impl NewTransactionRow {
	pub fn from_model(model: NewTransaction) -> Result<Self, StoreError> {
		Ok(NewTransactionRow {
			network_id: from_network_id(model.network_id)?,
			tx_hash: model.tx_hash,
			sender: model.sender,
			block_number: from_block_number(model.block_number)?,
			seen_at: model.seen_at,
		})
	}
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = transactions)]
pub(crate) struct TransactionRow {
	pub id: i64,
	pub network_id: i32,
	pub tx_hash: Vec<u8>,
	pub sender: Vec<u8>,
	pub block_number: i64,
	pub seen_at: DateTime<Utc>,
}

impl TransactionRow {
	pub fn into_model(self) -> Result<Transaction, StoreError> {
		Ok(Transaction {
			id: self.id,
			network_id: to_network_id(self.network_id)?,
			tx_hash: self.tx_hash,
			sender: self.sender,
			block_number: u64::try_from(self.block_number)
				.map_err(|_| StoreError::Database(format!("bad block {}", self.block_number)))?,
			seen_at: self.seen_at,
		})
	}
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = token_transfers, treat_none_as_null = true)]
pub(crate) struct TokenTransferChanges {
	pub triggering_tx: i64,
	pub outbound_tx: Option<i64>,
	pub token_id: i64,
	pub amount: Vec<u8>,
	pub status: String,
	pub sender_network_id: i32,
	pub sender_address: Vec<u8>,
	pub recipient_network_id: i32,
	pub recipient_address: Vec<u8>,
}

impl TokenTransferChanges {
	pub fn from_new(model: NewTokenTransfer) -> Result<Self, StoreError> {
		Ok(TokenTransferChanges {
			triggering_tx: model.triggering_tx,
			outbound_tx: model.outbound_tx,
			token_id: model.token_id,
			amount: model.amount,
			status: model.status.as_str().to_string(),
			sender_network_id: from_network_id(model.sender_network_id)?,
			sender_address: model.sender_address,
			recipient_network_id: from_network_id(model.recipient_network_id)?,
			recipient_address: model.recipient_address,
		})
	}
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = token_transfers)]
pub(crate) struct TokenTransferRow {
	pub id: i64,
	pub triggering_tx: i64,
	pub outbound_tx: Option<i64>,
	pub token_id: i64,
	pub amount: Vec<u8>,
	pub status: String,
	pub sender_network_id: i32,
	pub sender_address: Vec<u8>,
	pub recipient_network_id: i32,
	pub recipient_address: Vec<u8>,
}

impl TokenTransferRow {
	pub fn into_model(self) -> Result<TokenTransfer, StoreError> {
		Ok(TokenTransfer {
			id: self.id,
			triggering_tx: self.triggering_tx,
			outbound_tx: self.outbound_tx,
			token_id: self.token_id,
			amount: self.amount,
			status: self.status.parse().map_err(StoreError::generic)?,
			sender_network_id: to_network_id(self.sender_network_id)?,
			sender_address: self.sender_address,
			recipient_network_id: to_network_id(self.recipient_network_id)?,
			recipient_address: self.recipient_address,
		})
	}
}
