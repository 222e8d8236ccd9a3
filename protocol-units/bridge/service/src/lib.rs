pub mod bridge;
pub mod chains;
pub mod connectors;
pub mod dispatcher;
pub mod requests;
pub mod rest;
pub mod transfers;

pub use crate::bridge::{Bridge, BridgeError};
pub use crate::chains::AnyConnector;
pub use crate::requests::{RequestError, Requests};
pub use crate::transfers::{TransferError, TransferOrchestrator};

use bridge_indexer_db::{BridgeStore, StoreResult};
use bridge_util::types::KnownToken;

/// Token contracts registered for `network_id`.
pub async fn known_tokens<S: BridgeStore>(store: &S, network_id: u32) -> StoreResult<Vec<KnownToken>> {
	let mut known = Vec::new();
	for token in store.list_tokens(network_id).await? {
		let contract = store.get_network_token(network_id, token.id).await?;
		let Ok(id) = u32::try_from(token.id) else {
			tracing::warn!(network_id, token = token.id, "Token id out of range, skipped");
			continue;
		};
		known.push(KnownToken { id, address: contract.contract_address });
	}
	Ok(known)
}
