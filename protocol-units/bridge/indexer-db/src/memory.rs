use crate::models::*;
use crate::store::*;
use bridge_util::TransferStatus;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct State {
	tokens: BTreeMap<i64, Token>,
	network_tokens: BTreeMap<(u32, i64), NetworkToken>,
	transactions: BTreeMap<i64, Transaction>,
	transfers: BTreeMap<i64, TokenTransfer>,
	nonces: HashMap<u32, u64>,
	blocks: HashMap<u32, u64>,
	next_token_id: i64,
	next_transaction_id: i64,
	next_transfer_id: i64,
}

/// Store kept in process memory with the same semantics as [`crate::PgStore`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
	state: Mutex<State>,
}

impl InMemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	fn state(&self) -> MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	/// Row counts of the transactions and transfers tables.
	pub fn counts(&self) -> (usize, usize) {
		let state = self.state();
		(state.transactions.len(), state.transfers.len())
	}
}

fn next_id(counter: &mut i64) -> i64 {
	*counter += 1;
	*counter
}

#[async_trait::async_trait]
impl Tokens for InMemoryStore {
	async fn create_token(&self, short_name: &str, long_name: &str) -> StoreResult<i64> {
		let mut state = self.state();
		let id = next_id(&mut state.next_token_id);
		state.tokens.insert(
			id,
			Token { id, short_name: short_name.to_string(), long_name: long_name.to_string() },
		);
		Ok(id)
	}

	async fn get_token(&self, id: i64) -> StoreResult<Token> {
		self.state().tokens.get(&id).cloned().ok_or(StoreError::NoToken)
	}

	async fn list_tokens(&self, network_id: u32) -> StoreResult<Vec<Token>> {
		let state = self.state();
		Ok(state
			.network_tokens
			.keys()
			.filter(|(network, _)| *network == network_id)
			.filter_map(|(_, token_id)| state.tokens.get(token_id).cloned())
			.collect())
	}
}

#[async_trait::async_trait]
impl NetworkTokens for InMemoryStore {
	async fn create_network_token(&self, token: NetworkToken) -> StoreResult<()> {
		let mut state = self.state();
		let key = (token.network_id, token.token_id);
		if state.network_tokens.contains_key(&key) {
			return Err(StoreError::AlreadyExists);
		}
		state.network_tokens.insert(key, token);
		Ok(())
	}

	async fn get_network_token(&self, network_id: u32, token_id: i64) -> StoreResult<NetworkToken> {
		self.state()
			.network_tokens
			.get(&(network_id, token_id))
			.cloned()
			.ok_or(StoreError::NoToken)
	}

	async fn list_network_tokens(&self, token_id: i64) -> StoreResult<Vec<NetworkToken>> {
		Ok(self
			.state()
			.network_tokens
			.values()
			.filter(|token| token.token_id == token_id)
			.cloned()
			.collect())
	}
}

fn find_transaction(state: &State, network_id: u32, tx_hash: &[u8]) -> Option<i64> {
	state
		.transactions
		.values()
		.find(|tx| tx.network_id == network_id && tx.tx_hash == tx_hash)
		.map(|tx| tx.id)
}

#[async_trait::async_trait]
impl Transactions for InMemoryStore {
	async fn transaction_exists(&self, network_id: u32, tx_hash: &[u8]) -> StoreResult<()> {
		match find_transaction(&self.state(), network_id, tx_hash) {
			Some(_) => Err(StoreError::AlreadyExists),
			None => Ok(()),
		}
	}

	async fn create_transaction(&self, transaction: NewTransaction) -> StoreResult<i64> {
		let mut state = self.state();
		if find_transaction(&state, transaction.network_id, &transaction.tx_hash).is_some() {
			return Err(StoreError::AlreadyExists);
		}
		let id = next_id(&mut state.next_transaction_id);
		state.transactions.insert(
			id,
			Transaction {
				id,
				network_id: transaction.network_id,
				tx_hash: transaction.tx_hash,
				sender: transaction.sender,
				block_number: transaction.block_number,
				seen_at: transaction.seen_at,
			},
		);
		Ok(id)
	}

	async fn get_transaction(&self, id: i64) -> StoreResult<Transaction> {
		self.state().transactions.get(&id).cloned().ok_or(StoreError::NoTransaction)
	}
}

#[async_trait::async_trait]
impl TokenTransfers for InMemoryStore {
	async fn create_transfer(&self, transfer: NewTokenTransfer) -> StoreResult<i64> {
		let mut state = self.state();
		let id = next_id(&mut state.next_transfer_id);
		state.transfers.insert(id, TokenTransfer::from_new(id, transfer));
		Ok(id)
	}

	async fn get_transfer(&self, id: i64) -> StoreResult<TokenTransfer> {
		self.state().transfers.get(&id).cloned().ok_or(StoreError::NoTransfer)
	}

	async fn get_transfer_by_network_and_tx(
		&self,
		network_id: u32,
		tx_hash: &[u8],
	) -> StoreResult<TokenTransfer> {
		let state = self.state();
		let tx_id = find_transaction(&state, network_id, tx_hash).ok_or(StoreError::NoTransfer)?;
		state
			.transfers
			.values()
			.find(|t| t.triggering_tx == tx_id)
			.or_else(|| state.transfers.values().find(|t| t.outbound_tx == Some(tx_id)))
			.cloned()
			.ok_or(StoreError::NoTransfer)
	}

	async fn get_transfer_by_params(
		&self,
		token_id: i64,
		amount: &[u8],
		sender: &[u8],
		recipient: &[u8],
	) -> StoreResult<TokenTransfer> {
		self.state()
			.transfers
			.values()
			.rev()
			.find(|t| {
				t.status == TransferStatus::Confirming
					&& t.token_id == token_id
					&& t.amount == amount
					&& t.sender_address == sender
					&& t.recipient_address == recipient
			})
			.cloned()
			.ok_or(StoreError::NoTransfer)
	}

	async fn update_transfer(&self, transfer: TokenTransfer) -> StoreResult<()> {
		let mut state = self.state();
		let current = state.transfers.get_mut(&transfer.id).ok_or(StoreError::NoTransfer)?;
		if current.status.is_final() {
			return Err(StoreError::FinalTransfer(transfer.id));
		}
		*current = transfer;
		Ok(())
	}

	async fn list_transfers_by_user(
		&self,
		offset: u64,
		limit: u64,
		address: &[u8],
		network_id: u32,
	) -> StoreResult<Vec<TokenTransfer>> {
		let state = self.state();
		let mut matching: Vec<(chrono::DateTime<chrono::Utc>, TokenTransfer)> = state
			.transfers
			.values()
			.filter(|t| t.sender_network_id == network_id && t.sender_address == address)
			.filter_map(|t| {
				state.transactions.get(&t.triggering_tx).map(|tx| (tx.seen_at, t.clone()))
			})
			.collect();
		matching.sort_by(|(a_seen, a), (b_seen, b)| b_seen.cmp(a_seen).then(b.id.cmp(&a.id)));
		Ok(matching
			.into_iter()
			.skip(usize::try_from(offset).unwrap_or(usize::MAX))
			.take(usize::try_from(limit).unwrap_or(usize::MAX))
			.map(|(_, t)| t)
			.collect())
	}

	async fn count_transfers_by_user(&self, network_id: u32, address: &[u8]) -> StoreResult<u64> {
		Ok(self
			.state()
			.transfers
			.values()
			.filter(|t| t.sender_network_id == network_id && t.sender_address == address)
			.count() as u64)
	}
}

#[async_trait::async_trait]
impl Nonces for InMemoryStore {
	async fn create_nonce(&self, network_id: u32, nonce: u64) -> StoreResult<()> {
		let mut state = self.state();
		if state.nonces.contains_key(&network_id) {
			return Err(StoreError::AlreadyExists);
		}
		state.nonces.insert(network_id, nonce);
		Ok(())
	}

	async fn get_nonce(&self, network_id: u32) -> StoreResult<u64> {
		self.state().nonces.get(&network_id).copied().ok_or(StoreError::NoNonce(network_id))
	}

	async fn increment_nonce(&self, network_id: u32) -> StoreResult<u64> {
		let mut state = self.state();
		let nonce = state.nonces.get_mut(&network_id).ok_or(StoreError::NoNonce(network_id))?;
		let consumed = *nonce;
		*nonce += 1;
		Ok(consumed)
	}
}

#[async_trait::async_trait]
impl NetworkBlocks for InMemoryStore {
	async fn create_network_block(&self, network_id: u32, block: u64) -> StoreResult<()> {
		let mut state = self.state();
		if state.blocks.contains_key(&network_id) {
			return Err(StoreError::AlreadyExists);
		}
		state.blocks.insert(network_id, block);
		Ok(())
	}

	async fn get_network_block(&self, network_id: u32) -> StoreResult<u64> {
		self.state().blocks.get(&network_id).copied().ok_or(StoreError::NoNetworkBlock(network_id))
	}

	async fn update_network_block(&self, network_id: u32, block: u64) -> StoreResult<()> {
		let mut state = self.state();
		let cursor =
			state.blocks.get_mut(&network_id).ok_or(StoreError::NoNetworkBlock(network_id))?;
		if block > *cursor {
			*cursor = block;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{Duration, Utc};
	use std::sync::Arc;

	fn new_tx(network_id: u32, hash: u8, seen_offset: i64) -> NewTransaction {
		NewTransaction {
			network_id,
			tx_hash: vec![hash; 32],
			sender: vec![1; 20],
			block_number: 10,
			seen_at: Utc::now() + Duration::seconds(seen_offset),
		}
	}

	fn new_transfer(triggering_tx: i64, status: TransferStatus) -> NewTokenTransfer {
		NewTokenTransfer {
			triggering_tx,
			outbound_tx: None,
			token_id: 1,
			amount: vec![0x03, 0xe8],
			status,
			sender_network_id: 5,
			sender_address: vec![0xaa; 20],
			recipient_network_id: 4,
			recipient_address: vec![0xbb; 32],
		}
	}

	#[tokio::test]
	async fn nonces_are_consumed_without_gaps() {
		let store = Arc::new(InMemoryStore::new());
		store.create_nonce(5, 0).await.unwrap();

		let mut handles = Vec::new();
		for _ in 0..16 {
			let store = store.clone();
			handles.push(tokio::spawn(async move { store.increment_nonce(5).await.unwrap() }));
		}
		let mut consumed = Vec::new();
		for handle in handles {
			consumed.push(handle.await.unwrap());
		}
		consumed.sort();
		assert_eq!(consumed, (0..16).collect::<Vec<u64>>());
		assert_eq!(store.get_nonce(5).await.unwrap(), 16);
		assert_eq!(store.increment_nonce(9).await, Err(StoreError::NoNonce(9)));
	}

	#[tokio::test]
	async fn block_cursor_never_moves_back() {
		let store = InMemoryStore::new();
		assert_eq!(store.update_network_block(4, 10).await, Err(StoreError::NoNetworkBlock(4)));
		store.create_network_block(4, 0).await.unwrap();
		store.update_network_block(4, 120).await.unwrap();
		store.update_network_block(4, 100).await.unwrap();
		assert_eq!(store.get_network_block(4).await.unwrap(), 120);
	}

	#[tokio::test]
	async fn transactions_are_unique_per_network() {
		let store = InMemoryStore::new();
		store.transaction_exists(5, &[7; 32]).await.unwrap();
		store.create_transaction(new_tx(5, 7, 0)).await.unwrap();
		assert_eq!(store.transaction_exists(5, &[7; 32]).await, Err(StoreError::AlreadyExists));
		assert_eq!(store.create_transaction(new_tx(5, 7, 0)).await, Err(StoreError::AlreadyExists));
		store.create_transaction(new_tx(4, 7, 0)).await.unwrap();
	}

	#[tokio::test]
	async fn params_lookup_only_sees_confirming_transfers() {
		let store = InMemoryStore::new();
		let tx = store.create_transaction(new_tx(5, 1, 0)).await.unwrap();
		store.create_transfer(new_transfer(tx, TransferStatus::Waiting)).await.unwrap();
		let transfer = new_transfer(tx, TransferStatus::Waiting);
		assert_eq!(
			store
				.get_transfer_by_params(
					1,
					&transfer.amount,
					&transfer.sender_address,
					&transfer.recipient_address
				)
				.await,
			Err(StoreError::NoTransfer)
		);

		let id = store.create_transfer(new_transfer(tx, TransferStatus::Confirming)).await.unwrap();
		let found = store
			.get_transfer_by_params(
				1,
				&transfer.amount,
				&transfer.sender_address,
				&transfer.recipient_address,
			)
			.await
			.unwrap();
		assert_eq!(found.id, id);
	}

	#[tokio::test]
	async fn final_transfers_are_frozen() {
		let store = InMemoryStore::new();
		let tx = store.create_transaction(new_tx(5, 1, 0)).await.unwrap();
		let id = store.create_transfer(new_transfer(tx, TransferStatus::Confirming)).await.unwrap();

		let mut transfer = store.get_transfer(id).await.unwrap();
		transfer.status = TransferStatus::Finished;
		store.update_transfer(transfer.clone()).await.unwrap();

		transfer.status = TransferStatus::Confirming;
		assert_eq!(store.update_transfer(transfer).await, Err(StoreError::FinalTransfer(id)));
	}

	#[tokio::test]
	async fn lookup_by_triggering_or_outbound_tx() {
		let store = InMemoryStore::new();
		let trigger = store.create_transaction(new_tx(5, 1, 0)).await.unwrap();
		let outbound = store.create_transaction(new_tx(4, 2, 0)).await.unwrap();
		let id =
			store.create_transfer(new_transfer(trigger, TransferStatus::Confirming)).await.unwrap();
		let mut transfer = store.get_transfer(id).await.unwrap();
		transfer.outbound_tx = Some(outbound);
		transfer.status = TransferStatus::Finished;
		store.update_transfer(transfer).await.unwrap();

		assert_eq!(store.get_transfer_by_network_and_tx(5, &[1; 32]).await.unwrap().id, id);
		assert_eq!(store.get_transfer_by_network_and_tx(4, &[2; 32]).await.unwrap().id, id);
		assert_eq!(
			store.get_transfer_by_network_and_tx(4, &[1; 32]).await,
			Err(StoreError::NoTransfer)
		);
	}

	#[tokio::test]
	async fn user_history_is_newest_first() {
		let store = InMemoryStore::new();
		let mut ids = Vec::new();
		for (hash, offset) in [(1u8, -30i64), (2, 0), (3, -60)] {
			let tx = store.create_transaction(new_tx(5, hash, offset)).await.unwrap();
			ids.push(
				store.create_transfer(new_transfer(tx, TransferStatus::Confirming)).await.unwrap(),
			);
		}

		let page = store.list_transfers_by_user(0, 2, &[0xaa; 20], 5).await.unwrap();
		assert_eq!(page.iter().map(|t| t.id).collect::<Vec<_>>(), vec![ids[1], ids[0]]);
		let rest = store.list_transfers_by_user(2, 2, &[0xaa; 20], 5).await.unwrap();
		assert_eq!(rest.iter().map(|t| t.id).collect::<Vec<_>>(), vec![ids[2]]);
		assert_eq!(store.count_transfers_by_user(5, &[0xaa; 20]).await.unwrap(), 3);
		assert_eq!(store.count_transfers_by_user(4, &[0xaa; 20]).await.unwrap(), 0);
	}
}
