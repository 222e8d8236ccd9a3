use crate::key_store::{EncryptedKey, KeyCipher, KeyStore, KeyStoreError, KeyType, Secret};
use bridge_util::NetworkType;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

diesel::table! {
	private_keys (network_type, key_type) {
		network_type -> Text,
		key_type -> Text,
		nonce -> Bytea,
		ciphertext -> Bytea,
		created_at -> Timestamp,
		updated_at -> Timestamp,
	}
}

#[derive(Insertable)]
#[diesel(table_name = private_keys)]
struct NewPrivateKey<'a> {
	network_type: &'a str,
	key_type: &'a str,
	nonce: &'a [u8],
	ciphertext: &'a [u8],
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = private_keys)]
struct PrivateKeyRow {
	nonce: Vec<u8>,
	ciphertext: Vec<u8>,
}

/// Postgres backed key store. Queries run on the blocking pool.
#[derive(Clone)]
pub struct PgKeyStore {
	pool: Pool<ConnectionManager<PgConnection>>,
	cipher: KeyCipher,
}

impl PgKeyStore {
	pub fn new(pool: Pool<ConnectionManager<PgConnection>>, cipher: KeyCipher) -> Self {
		PgKeyStore { pool, cipher }
	}

	/// Connects and brings the `private_keys` table up to date.
	pub fn connect(url: &str, cipher: KeyCipher) -> Result<Self, KeyStoreError> {
		let pool = Pool::builder()
			.max_size(2)
			.build(ConnectionManager::<PgConnection>::new(url))
			.map_err(KeyStoreError::generic)?;
		let mut conn = pool.get().map_err(KeyStoreError::generic)?;
		conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
			KeyStoreError::Database(format!("Failed to run key store migrations: {e}"))
		})?;
		tracing::info!("Key store migrations applied");
		Ok(Self::new(pool, cipher))
	}

	async fn run<T, F>(&self, f: F) -> Result<T, KeyStoreError>
	where
		F: FnOnce(&mut PgConnection) -> Result<T, KeyStoreError> + Send + 'static,
		T: Send + 'static,
	{
		let pool = self.pool.clone();
		tokio::task::spawn_blocking(move || {
			let mut conn = pool.get().map_err(KeyStoreError::generic)?;
			f(&mut conn)
		})
		.await
		.map_err(KeyStoreError::generic)?
	}
}

#[async_trait::async_trait]
impl KeyStore for PgKeyStore {
	async fn create(
		&self,
		network_type: NetworkType,
		key_type: KeyType,
		secret: &[u8],
	) -> Result<(), KeyStoreError> {
		let sealed = self.cipher.encrypt(secret)?;
		self.run(move |conn| {
			diesel::insert_into(private_keys::table)
				.values(NewPrivateKey {
					network_type: network_type.as_str(),
					key_type: key_type.as_str(),
					nonce: &sealed.nonce,
					ciphertext: &sealed.ciphertext,
				})
				.execute(conn)
				.map_err(|e| match e {
					DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
						KeyStoreError::AlreadyExists { network_type, key_type }
					}
					other => KeyStoreError::generic(other),
				})?;
			Ok(())
		})
		.await
	}

	async fn get(
		&self,
		network_type: NetworkType,
		key_type: KeyType,
	) -> Result<Secret, KeyStoreError> {
		let row = self
			.run(move |conn| {
				private_keys::table
					.find((network_type.as_str(), key_type.as_str()))
					.select(PrivateKeyRow::as_select())
					.first(conn)
					.optional()
					.map_err(KeyStoreError::generic)
			})
			.await?
			.ok_or(KeyStoreError::NoKey { network_type, key_type })?;
		self.cipher.decrypt(&EncryptedKey { nonce: row.nonce, ciphertext: row.ciphertext })
	}

	async fn update(
		&self,
		network_type: NetworkType,
		key_type: KeyType,
		secret: &[u8],
	) -> Result<(), KeyStoreError> {
		let sealed = self.cipher.encrypt(secret)?;
		let updated = self
			.run(move |conn| {
				diesel::update(
					private_keys::table.find((network_type.as_str(), key_type.as_str())),
				)
				.set((
					private_keys::nonce.eq(sealed.nonce),
					private_keys::ciphertext.eq(sealed.ciphertext),
					private_keys::updated_at.eq(diesel::dsl::now),
				))
				.execute(conn)
				.map_err(KeyStoreError::generic)
			})
			.await?;
		if updated == 0 {
			return Err(KeyStoreError::NoKey { network_type, key_type });
		}
		Ok(())
	}
}
