use crate::migrations::run_migrations;
use crate::models::*;
use crate::schema::*;
use crate::store::*;
use bridge_util::TransferStatus;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

impl From<DieselError> for StoreError {
	fn from(e: DieselError) -> Self {
		match e {
			DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
				StoreError::AlreadyExists
			}
			other => StoreError::generic(other),
		}
	}
}

fn to_i64(value: u64) -> StoreResult<i64> {
	i64::try_from(value).map_err(|_| StoreError::Database(format!("{value} out of range")))
}

fn to_u64(value: i64) -> StoreResult<u64> {
	u64::try_from(value).map_err(|_| StoreError::Database(format!("negative value {value}")))
}

/// Postgres implementation of the bridge repositories.
#[derive(Clone)]
pub struct PgStore {
	pool: Pool<ConnectionManager<PgConnection>>,
}

impl PgStore {
	pub fn new(pool: Pool<ConnectionManager<PgConnection>>) -> Self {
		Self { pool }
	}

	/// Builds the pool and applies pending migrations.
	pub fn connect(url: &str, pool_size: u32) -> Result<Self, anyhow::Error> {
		let pool = Pool::builder()
			.max_size(pool_size)
			.build(ConnectionManager::<PgConnection>::new(url))
			.map_err(|e| anyhow::anyhow!("Failed to create bridge db pool: {e}"))?;
		let mut conn = pool.get()?;
		run_migrations(&mut conn)?;
		Ok(Self::new(pool))
	}

	async fn run<T, F>(&self, f: F) -> StoreResult<T>
	where
		F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
		T: Send + 'static,
	{
		let pool = self.pool.clone();
		tokio::task::spawn_blocking(move || {
			let mut conn = pool.get().map_err(StoreError::generic)?;
			f(&mut conn)
		})
		.await
		.map_err(StoreError::generic)?
	}
}

#[async_trait::async_trait]
impl Tokens for PgStore {
	async fn create_token(&self, short_name: &str, long_name: &str) -> StoreResult<i64> {
		let (short_name, long_name) = (short_name.to_string(), long_name.to_string());
		self.run(move |conn| {
			Ok(diesel::insert_into(tokens::table)
				.values(NewTokenRow { short_name: &short_name, long_name: &long_name })
				.returning(tokens::id)
				.get_result(conn)?)
		})
		.await
	}

	async fn get_token(&self, id: i64) -> StoreResult<Token> {
		self.run(move |conn| {
			tokens::table
				.find(id)
				.select(Token::as_select())
				.first(conn)
				.optional()?
				.ok_or(StoreError::NoToken)
		})
		.await
	}

	async fn list_tokens(&self, network_id: u32) -> StoreResult<Vec<Token>> {
		let network_id = from_network_id(network_id)?;
		self.run(move |conn| {
			Ok(tokens::table
				.inner_join(network_tokens::table)
				.filter(network_tokens::network_id.eq(network_id))
				.order(tokens::id.asc())
				.select(Token::as_select())
				.load(conn)?)
		})
		.await
	}
}

#[async_trait::async_trait]
impl NetworkTokens for PgStore {
	async fn create_network_token(&self, token: NetworkToken) -> StoreResult<()> {
		let row = NetworkTokenRow::from_model(&token)?;
		self.run(move |conn| {
			diesel::insert_into(network_tokens::table).values(&row).execute(conn)?;
			Ok(())
		})
		.await
	}

	async fn get_network_token(&self, network_id: u32, token_id: i64) -> StoreResult<NetworkToken> {
		let network_id = from_network_id(network_id)?;
		self.run(move |conn| {
			network_tokens::table
				.find((network_id, token_id))
				.select(NetworkTokenRow::as_select())
				.first(conn)
				.optional()?
				.ok_or(StoreError::NoToken)?
				.into_model()
		})
		.await
	}

	async fn list_network_tokens(&self, token_id: i64) -> StoreResult<Vec<NetworkToken>> {
		self.run(move |conn| {
			network_tokens::table
				.filter(network_tokens::token_id.eq(token_id))
				.order(network_tokens::network_id.asc())
				.select(NetworkTokenRow::as_select())
				.load(conn)?
				.into_iter()
				.map(NetworkTokenRow::into_model)
				.collect()
		})
		.await
	}
}

#[async_trait::async_trait]
impl Transactions for PgStore {
	async fn transaction_exists(&self, network_id: u32, tx_hash: &[u8]) -> StoreResult<()> {
		let network_id = from_network_id(network_id)?;
		let tx_hash = tx_hash.to_vec();
		let exists: bool = self
			.run(move |conn| {
				Ok(diesel::select(diesel::dsl::exists(
					transactions::table
						.filter(transactions::network_id.eq(network_id))
						.filter(transactions::tx_hash.eq(tx_hash)),
				))
				.get_result(conn)?)
			})
			.await?;
		if exists {
			return Err(StoreError::AlreadyExists);
		}
		Ok(())
	}

	async fn create_transaction(&self, transaction: NewTransaction) -> StoreResult<i64> {
		let row = NewTransactionRow::from_model(transaction)?;
		self.run(move |conn| {
			Ok(diesel::insert_into(transactions::table)
				.values(&row)
				.returning(transactions::id)
				.get_result(conn)?)
		})
		.await
	}

	async fn get_transaction(&self, id: i64) -> StoreResult<Transaction> {
		self.run(move |conn| {
			transactions::table
				.find(id)
				.select(TransactionRow::as_select())
				.first(conn)
				.optional()?
				.ok_or(StoreError::NoTransaction)?
				.into_model()
		})
		.await
	}
}

#[async_trait::async_trait]
impl TokenTransfers for PgStore {
	async fn create_transfer(&self, transfer: NewTokenTransfer) -> StoreResult<i64> {
		let row = TokenTransferChanges::from_new(transfer)?;
		self.run(move |conn| {
			Ok(diesel::insert_into(token_transfers::table)
				.values(&row)
				.returning(token_transfers::id)
				.get_result(conn)?)
		})
		.await
	}

	async fn get_transfer(&self, id: i64) -> StoreResult<TokenTransfer> {
		self.run(move |conn| {
			token_transfers::table
				.find(id)
				.select(TokenTransferRow::as_select())
				.first(conn)
				.optional()?
				.ok_or(StoreError::NoTransfer)?
				.into_model()
		})
		.await
	}

	async fn get_transfer_by_network_and_tx(
		&self,
		network_id: u32,
		tx_hash: &[u8],
	) -> StoreResult<TokenTransfer> {
		let network_id = from_network_id(network_id)?;
		let tx_hash = tx_hash.to_vec();
		self.run(move |conn| {
			let tx_id: i64 = transactions::table
				.filter(transactions::network_id.eq(network_id))
				.filter(transactions::tx_hash.eq(tx_hash))
				.select(transactions::id)
				.first(conn)
				.optional()?
				.ok_or(StoreError::NoTransfer)?;

			let triggered = token_transfers::table
				.filter(token_transfers::triggering_tx.eq(tx_id))
				.select(TokenTransferRow::as_select())
				.first(conn)
				.optional()?;
			let row = match triggered {
				Some(row) => row,
				None => token_transfers::table
					.filter(token_transfers::outbound_tx.eq(tx_id))
					.select(TokenTransferRow::as_select())
					.first(conn)
					.optional()?
					.ok_or(StoreError::NoTransfer)?,
			};
			row.into_model()
		})
		.await
	}

	async fn get_transfer_by_params(
		&self,
		token_id: i64,
		amount: &[u8],
		sender: &[u8],
		recipient: &[u8],
	) -> StoreResult<TokenTransfer> {
		let (amount, sender, recipient) = (amount.to_vec(), sender.to_vec(), recipient.to_vec());
		self.run(move |conn| {
			token_transfers::table
				.filter(token_transfers::token_id.eq(token_id))
				.filter(token_transfers::amount.eq(amount))
				.filter(token_transfers::sender_address.eq(sender))
				.filter(token_transfers::recipient_address.eq(recipient))
				.filter(token_transfers::status.eq(TransferStatus::Confirming.as_str()))
				.order(token_transfers::id.desc())
				.select(TokenTransferRow::as_select())
				.first(conn)
				.optional()?
				.ok_or(StoreError::NoTransfer)?
				.into_model()
		})
		.await
	}

	async fn update_transfer(&self, transfer: TokenTransfer) -> StoreResult<()> {
		let id = transfer.id;
		let changes = TokenTransferChanges::from_new(NewTokenTransfer {
			triggering_tx: transfer.triggering_tx,
			outbound_tx: transfer.outbound_tx,
			token_id: transfer.token_id,
			amount: transfer.amount,
			status: transfer.status,
			sender_network_id: transfer.sender_network_id,
			sender_address: transfer.sender_address,
			recipient_network_id: transfer.recipient_network_id,
			recipient_address: transfer.recipient_address,
		})?;
		self.run(move |conn| {
			conn.transaction::<_, StoreError, _>(|conn| {
				let current: String = token_transfers::table
					.find(id)
					.select(token_transfers::status)
					.for_update()
					.first(conn)
					.optional()?
					.ok_or(StoreError::NoTransfer)?;
				let current: TransferStatus = current.parse().map_err(StoreError::generic)?;
				if current.is_final() {
					return Err(StoreError::FinalTransfer(id));
				}
				diesel::update(token_transfers::table.find(id)).set(&changes).execute(conn)?;
				Ok(())
			})
		})
		.await
	}

	async fn list_transfers_by_user(
		&self,
		offset: u64,
		limit: u64,
		address: &[u8],
		network_id: u32,
	) -> StoreResult<Vec<TokenTransfer>> {
		let network_id = from_network_id(network_id)?;
		let (offset, limit) = (to_i64(offset)?, to_i64(limit)?);
		let address = address.to_vec();
		self.run(move |conn| {
			token_transfers::table
				.inner_join(
					transactions::table.on(token_transfers::triggering_tx.eq(transactions::id)),
				)
				.filter(token_transfers::sender_network_id.eq(network_id))
				.filter(token_transfers::sender_address.eq(address))
				.order((transactions::seen_at.desc(), token_transfers::id.desc()))
				.limit(limit)
				.offset(offset)
				.select(TokenTransferRow::as_select())
				.load(conn)?
				.into_iter()
				.map(TokenTransferRow::into_model)
				.collect()
		})
		.await
	}

	async fn count_transfers_by_user(&self, network_id: u32, address: &[u8]) -> StoreResult<u64> {
		let network_id = from_network_id(network_id)?;
		let address = address.to_vec();
		let count: i64 = self
			.run(move |conn| {
				Ok(token_transfers::table
					.filter(token_transfers::sender_network_id.eq(network_id))
					.filter(token_transfers::sender_address.eq(address))
					.count()
					.get_result(conn)?)
			})
			.await?;
		to_u64(count)
	}
}

#[async_trait::async_trait]
impl Nonces for PgStore {
	async fn create_nonce(&self, network_id: u32, nonce: u64) -> StoreResult<()> {
		let network_id = from_network_id(network_id)?;
		let nonce = to_i64(nonce)?;
		self.run(move |conn| {
			diesel::insert_into(network_nonces::table)
				.values((network_nonces::network_id.eq(network_id), network_nonces::nonce.eq(nonce)))
				.execute(conn)?;
			Ok(())
		})
		.await
	}

	async fn get_nonce(&self, network_id: u32) -> StoreResult<u64> {
		let id = from_network_id(network_id)?;
		let nonce: i64 = self
			.run(move |conn| {
				network_nonces::table
					.find(id)
					.select(network_nonces::nonce)
					.first(conn)
					.optional()?
					.ok_or(StoreError::NoNonce(network_id))
			})
			.await?;
		to_u64(nonce)
	}

	async fn increment_nonce(&self, network_id: u32) -> StoreResult<u64> {
		let id = from_network_id(network_id)?;
		let consumed: i64 = self
			.run(move |conn| {
				diesel::update(network_nonces::table.find(id))
					.set(network_nonces::nonce.eq(network_nonces::nonce + 1i64))
					.returning(network_nonces::nonce - 1i64)
					.get_result(conn)
					.optional()?
					.ok_or(StoreError::NoNonce(network_id))
			})
			.await?;
		to_u64(consumed)
	}
}

#[async_trait::async_trait]
impl NetworkBlocks for PgStore {
	async fn create_network_block(&self, network_id: u32, block: u64) -> StoreResult<()> {
		let network_id = from_network_id(network_id)?;
		let block = from_block_number(block)?;
		self.run(move |conn| {
			diesel::insert_into(network_blocks::table)
				.values((
					network_blocks::network_id.eq(network_id),
					network_blocks::last_seen_block.eq(block),
				))
				.execute(conn)?;
			Ok(())
		})
		.await
	}

	async fn get_network_block(&self, network_id: u32) -> StoreResult<u64> {
		let id = from_network_id(network_id)?;
		let block: i64 = self
			.run(move |conn| {
				network_blocks::table
					.find(id)
					.select(network_blocks::last_seen_block)
					.first(conn)
					.optional()?
					.ok_or(StoreError::NoNetworkBlock(network_id))
			})
			.await?;
		to_u64(block)
	}

	async fn update_network_block(&self, network_id: u32, block: u64) -> StoreResult<()> {
		let id = from_network_id(network_id)?;
		let block = from_block_number(block)?;
		self.run(move |conn| {
			let updated = diesel::update(
				network_blocks::table
					.find(id)
					.filter(network_blocks::last_seen_block.lt(block)),
			)
			.set(network_blocks::last_seen_block.eq(block))
			.execute(conn)?;
			if updated == 0 {
				let exists: bool =
					diesel::select(diesel::dsl::exists(network_blocks::table.find(id)))
						.get_result(conn)?;
				if !exists {
					return Err(StoreError::NoNetworkBlock(network_id));
				}
			}
			Ok(())
		})
		.await
	}
}
