pub mod casper;
pub mod evm;
pub mod solana;

use bridge_util::types::{
	BridgeInSignatureRequest, BridgeInSignatureResponse, CancelSignatureRequest,
	CancelSignatureResponse, Estimation, KnownToken, TokenOutRequest,
};
use bridge_util::{Connector, ConnectorResult, EventPublisher, Network};
use tokio_util::sync::CancellationToken;

pub use casper::CasperConnector;
pub use evm::EvmConnector;
pub use solana::SolanaConnector;

/// Every chain family the service can be wired to.
pub enum AnyConnector {
	Evm(EvmConnector),
	Casper(CasperConnector),
	Solana(SolanaConnector),
}

macro_rules! delegate {
	($self:ident, $connector:ident => $call:expr) => {
		match $self {
			AnyConnector::Evm($connector) => $call,
			AnyConnector::Casper($connector) => $call,
			AnyConnector::Solana($connector) => $call,
		}
	};
}

impl From<EvmConnector> for AnyConnector {
	fn from(connector: EvmConnector) -> Self {
		AnyConnector::Evm(connector)
	}
}

impl From<CasperConnector> for AnyConnector {
	fn from(connector: CasperConnector) -> Self {
		AnyConnector::Casper(connector)
	}
}

impl From<SolanaConnector> for AnyConnector {
	fn from(connector: SolanaConnector) -> Self {
		AnyConnector::Solana(connector)
	}
}

#[async_trait::async_trait]
impl Connector for AnyConnector {
	fn network(&self) -> Network {
		delegate!(self, c => c.network())
	}

	fn known_tokens(&self) -> Vec<KnownToken> {
		delegate!(self, c => c.known_tokens())
	}

	async fn event_stream(
		&self,
		from_block: u64,
		shutdown: CancellationToken,
	) -> ConnectorResult<()> {
		delegate!(self, c => c.event_stream(from_block, shutdown).await)
	}

	async fn bridge_out(&self, request: TokenOutRequest) -> ConnectorResult<Vec<u8>> {
		delegate!(self, c => c.bridge_out(request).await)
	}

	async fn estimate_transfer(&self) -> ConnectorResult<Estimation> {
		delegate!(self, c => c.estimate_transfer().await)
	}

	async fn bridge_in_signature(
		&self,
		request: BridgeInSignatureRequest,
	) -> ConnectorResult<BridgeInSignatureResponse> {
		delegate!(self, c => c.bridge_in_signature(request).await)
	}

	async fn cancel_signature(
		&self,
		request: CancelSignatureRequest,
	) -> ConnectorResult<CancelSignatureResponse> {
		delegate!(self, c => c.cancel_signature(request).await)
	}

	fn publisher(&self) -> &EventPublisher {
		delegate!(self, c => c.publisher())
	}
}
