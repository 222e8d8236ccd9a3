pub mod client;
pub mod memory;
pub mod migrations;
pub mod models;
pub mod schema;
pub mod store;

pub use crate::client::PgStore;
pub use crate::memory::InMemoryStore;
pub use crate::store::{
	BridgeStore, NetworkBlocks, NetworkTokens, Nonces, StoreError, StoreResult, TokenTransfers,
	Tokens, Transactions,
};
