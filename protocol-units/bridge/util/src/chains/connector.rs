use crate::chains::subscriber::{EventPublisher, EventSubscriber};
use crate::events::EventVariant;
use crate::networks::Network;
use crate::types::{
	BridgeInSignatureRequest, BridgeInSignatureResponse, CancelSignatureRequest,
	CancelSignatureResponse, Estimation, KnownToken, TokenOutRequest,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectorError {
	#[error("Blockchain rework at block {0}")]
	BlockchainRework(u64),
	#[error("Upstream node error: {0}")]
	Upstream(String),
	#[error("Failed to decode chain data: {0}")]
	Decode(String),
	#[error("Unsupported operation: {0}")]
	Unsupported(String),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Signer failure: {0}")]
	Signer(String),
}

impl ConnectorError {
	pub fn generic<E: std::error::Error>(e: E) -> Self {
		Self::Upstream(e.to_string())
	}

	pub fn decode<E: std::error::Error>(e: E) -> Self {
		Self::Decode(e.to_string())
	}
}

pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Per-network adapter. Events are published to subscribers, outbound
/// operations are request/response.
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
	fn network(&self) -> Network;

	fn known_tokens(&self) -> Vec<KnownToken>;

	/// Replays `[from_block, head]` and follows live events until both finish
	/// or `shutdown` is cancelled. `from_block == 0` skips the replay.
	async fn event_stream(&self, from_block: u64, shutdown: CancellationToken)
		-> ConnectorResult<()>;

	/// Submits the release transaction and returns its hash.
	async fn bridge_out(&self, request: TokenOutRequest) -> ConnectorResult<Vec<u8>>;

	async fn estimate_transfer(&self) -> ConnectorResult<Estimation>;

	async fn bridge_in_signature(
		&self,
		request: BridgeInSignatureRequest,
	) -> ConnectorResult<BridgeInSignatureResponse>;

	async fn cancel_signature(
		&self,
		request: CancelSignatureRequest,
	) -> ConnectorResult<CancelSignatureResponse>;

	fn publisher(&self) -> &EventPublisher;

	fn add_event_subscriber(&self) -> EventSubscriber {
		self.publisher().subscribe()
	}

	fn remove_event_subscriber(&self, id: Uuid) {
		self.publisher().unsubscribe(id)
	}

	async fn notify(&self, event: EventVariant, shutdown: &CancellationToken) {
		self.publisher().notify(event, shutdown).await
	}
}
