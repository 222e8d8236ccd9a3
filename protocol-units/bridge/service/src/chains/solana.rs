use bridge_util::networks::network_by_name;
use bridge_util::types::{
	BridgeInSignatureRequest, BridgeInSignatureResponse, CancelSignatureRequest,
	CancelSignatureResponse, Estimation, KnownToken, TokenOutRequest,
};
use bridge_util::{
	Connector, ConnectorError, ConnectorResult, EventPublisher, Network, NetworkType,
};
use tokio_util::sync::CancellationToken;

/// Placeholder for Solana networks: registers the network, emits nothing and
/// refuses every outbound operation.
pub struct SolanaConnector {
	network: Network,
	publisher: EventPublisher,
}

impl SolanaConnector {
	pub fn new(chain_name: &str, publisher: EventPublisher) -> ConnectorResult<Self> {
		let info = network_by_name(chain_name)
			.map_err(|e| ConnectorError::InvalidArgument(e.to_string()))?;
		if info.network_type != NetworkType::Solana {
			return Err(ConnectorError::InvalidArgument(format!(
				"{} is a {} network",
				info.name, info.network_type
			)));
		}
		let network = Network {
			id: info.id,
			name: info.name.to_string(),
			network_type: NetworkType::Solana,
			is_testnet: info.is_testnet,
			node_address: String::new(),
			bridge_contract: String::new(),
			gas_limit: 0,
		};
		Ok(SolanaConnector { network, publisher })
	}

	fn unsupported<T>(&self, operation: &str) -> ConnectorResult<T> {
		Err(ConnectorError::Unsupported(format!("{operation} on {}", self.network.name)))
	}
}

#[async_trait::async_trait]
impl Connector for SolanaConnector {
	fn network(&self) -> Network {
		self.network.clone()
	}

	fn known_tokens(&self) -> Vec<KnownToken> {
		Vec::new()
	}

	async fn event_stream(
		&self,
		_from_block: u64,
		shutdown: CancellationToken,
	) -> ConnectorResult<()> {
		shutdown.cancelled().await;
		Ok(())
	}

	async fn bridge_out(&self, _request: TokenOutRequest) -> ConnectorResult<Vec<u8>> {
		self.unsupported("bridge_out")
	}

	async fn estimate_transfer(&self) -> ConnectorResult<Estimation> {
		self.unsupported("estimate_transfer")
	}

	async fn bridge_in_signature(
		&self,
		_request: BridgeInSignatureRequest,
	) -> ConnectorResult<BridgeInSignatureResponse> {
		self.unsupported("bridge_in_signature")
	}

	async fn cancel_signature(
		&self,
		_request: CancelSignatureRequest,
	) -> ConnectorResult<CancelSignatureResponse> {
		self.unsupported("cancel_signature")
	}

	fn publisher(&self) -> &EventPublisher {
		&self.publisher
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[tokio::test]
	async fn stream_idles_until_shutdown() {
		let connector = SolanaConnector::new("SOLANA-TEST", EventPublisher::new(1)).unwrap();
		assert!(connector.network().is_testnet);

		let shutdown = CancellationToken::new();
		let idle = tokio::time::timeout(
			Duration::from_millis(20),
			connector.event_stream(1, shutdown.clone()),
		)
		.await;
		assert!(idle.is_err());

		shutdown.cancel();
		connector.event_stream(1, shutdown).await.unwrap();
	}

	#[tokio::test]
	async fn outbound_operations_are_unsupported() {
		let connector = SolanaConnector::new("SOLANA", EventPublisher::new(1)).unwrap();
		assert!(matches!(connector.estimate_transfer().await, Err(ConnectorError::Unsupported(_))));
		assert!(SolanaConnector::new("GOERLI", EventPublisher::new(1)).is_err());
	}
}
