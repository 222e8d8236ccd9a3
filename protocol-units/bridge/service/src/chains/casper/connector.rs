use super::deploy::{BridgeOutArgs, Deploy};
use super::events::BridgeEvent;
use super::rpc::{CasperRpc, HttpCasperRpc};
use super::signatures::{
	bridge_in_digest, sign_digest, transfer_out_digest, BridgeInPayload, TransferOutPayload,
};
use super::sse::{parse_line, DeployProcessed, ExecutionResult, LineBuffer};
use alloy::primitives::U256;
use bridge_config::common::casper::CasperConfig;
use bridge_signer::{PayloadKind, Signing};
use bridge_util::networks::{address_body, network_by_name, string_to_bytes};
use bridge_util::types::{
	BridgeInSignatureRequest, BridgeInSignatureResponse, CancelSignatureRequest,
	CancelSignatureResponse, Estimation, KnownToken, TokenOutRequest,
};
use bridge_util::{
	Connector, ConnectorError, ConnectorResult, EventPublisher, Network, NetworkType,
	TransactionInfo,
};
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn array32(bytes: &[u8], what: &str) -> ConnectorResult<[u8; 32]> {
	let body = address_body(NetworkType::Casper, bytes);
	body.as_slice().try_into().map_err(|_| {
		ConnectorError::InvalidArgument(format!("{what} must be 32 bytes, got {}", body.len()))
	})
}

fn signer_error(e: impl std::fmt::Display) -> ConnectorError {
	ConnectorError::Signer(e.to_string())
}

/// Connector for one Casper network.
pub struct CasperConnector {
	config: CasperConfig,
	network: Network,
	bridge_hash: Vec<u8>,
	rpc: Arc<dyn CasperRpc>,
	signer: Arc<dyn Signing>,
	publisher: EventPublisher,
	tokens: Vec<KnownToken>,
}

impl CasperConnector {
	pub fn new(
		config: CasperConfig,
		rpc: Arc<dyn CasperRpc>,
		signer: Arc<dyn Signing>,
		publisher: EventPublisher,
		tokens: Vec<KnownToken>,
	) -> ConnectorResult<Self> {
		let info = network_by_name(&config.chain_name)
			.map_err(|e| ConnectorError::InvalidArgument(e.to_string()))?;
		if info.network_type != NetworkType::Casper {
			return Err(ConnectorError::InvalidArgument(format!(
				"{} is a {} network",
				info.name, info.network_type
			)));
		}
		let bridge_hash = string_to_bytes(NetworkType::Casper, &config.bridge_contract_address)
			.map_err(|e| ConnectorError::InvalidArgument(e.to_string()))?;
		let network = Network {
			id: info.id,
			name: info.name.to_string(),
			network_type: NetworkType::Casper,
			is_testnet: config.is_testnet,
			node_address: config.rpc_node_address.clone(),
			bridge_contract: config.bridge_contract_address.clone(),
			gas_limit: config.gas_limit,
		};

		Ok(CasperConnector { config, network, bridge_hash, rpc, signer, publisher, tokens })
	}

	pub fn connect(
		config: CasperConfig,
		signer: Arc<dyn Signing>,
		subscriber_capacity: usize,
		tokens: Vec<KnownToken>,
	) -> Result<Self, anyhow::Error> {
		let rpc = HttpCasperRpc::new(&config.rpc_node_address, &config.event_node_address);
		tracing::info!(
			"Casper client for {} uses node {} and events {}",
			config.chain_name,
			config.rpc_node_address,
			config.event_node_address
		);
		Ok(Self::new(config, Arc::new(rpc), signer, EventPublisher::new(subscriber_capacity), tokens)?)
	}

	fn transaction_info(
		deploy_hash: &str,
		account: &str,
		block_number: u64,
	) -> ConnectorResult<TransactionInfo> {
		Ok(TransactionInfo {
			hash: hex::decode(deploy_hash).map_err(ConnectorError::decode)?,
			block_number,
			sender: hex::decode(account).map_err(ConnectorError::decode)?,
		})
	}

	async fn publish_results(
		&self,
		results: &[ExecutionResult],
		tx: &TransactionInfo,
		shutdown: &CancellationToken,
	) -> ConnectorResult<()> {
		for result in results {
			for blob in result.event_blobs(&self.config.bridge_events_hash) {
				let event = BridgeEvent::decode(&blob)?.into_event(tx.clone());
				tracing::debug!(network = %self.network.name, "Publishing {event}");
				self.notify(event, shutdown).await;
			}
		}
		Ok(())
	}

	async fn publish_processed(
		&self,
		deploy: DeployProcessed,
		shutdown: &CancellationToken,
	) -> ConnectorResult<()> {
		let results = [deploy.execution_result];
		if results[0].event_blobs(&self.config.bridge_events_hash).is_empty() {
			return Ok(());
		}
		let block_number = self.rpc.block_height_by_hash(&deploy.block_hash).await?;
		let tx = Self::transaction_info(&deploy.deploy_hash, &deploy.account, block_number)?;
		self.publish_results(&results, &tx, shutdown).await
	}

	async fn replay(&self, from_block: u64, shutdown: &CancellationToken) -> ConnectorResult<()> {
		if from_block == 0 {
			return Ok(());
		}
		let head = self.rpc.latest_block_height().await?;
		if from_block > head {
			tracing::info!(network = %self.network.name, from_block, head, "Nothing to replay");
			return Ok(());
		}
		tracing::info!(network = %self.network.name, from_block, head, "Replaying bridge events");

		for height in from_block..=head {
			if shutdown.is_cancelled() {
				return Ok(());
			}
			let block = self.rpc.block_by_height(height).await?;
			for deploy_hash in &block.deploy_hashes {
				let deploy = self.rpc.deploy(deploy_hash).await?;
				let tx = Self::transaction_info(&deploy.hash, &deploy.account, height)?;
				if let Err(e) = self.publish_results(&deploy.execution_results, &tx, shutdown).await {
					tracing::error!(network = %self.network.name, block = height, "Replay aborted: {e}");
					return Err(e);
				}
			}
		}
		Ok(())
	}

	async fn follow(&self, shutdown: &CancellationToken) -> ConnectorResult<()> {
		let mut stream = self.rpc.event_stream().await?;
		let mut lines = LineBuffer::default();
		loop {
			tokio::select! {
				biased;
				_ = shutdown.cancelled() => return Ok(()),
				chunk = stream.next() => match chunk {
					Some(Ok(bytes)) => {
						for deploy in lines.push(&bytes).iter().filter_map(|line| parse_line(line)) {
							let deploy_hash = deploy.deploy_hash.clone();
							if let Err(e) = self.publish_processed(deploy, shutdown).await {
								tracing::warn!(
									network = %self.network.name,
									deploy = %deploy_hash,
									"Live event skipped: {e}"
								);
							}
						}
					}
					Some(Err(e)) => {
						tracing::error!(network = %self.network.name, "Event stream failed: {e}");
						return Err(e);
					}
					None => {
						tracing::warn!(network = %self.network.name, "Event stream ended");
						return Ok(());
					}
				}
			}
		}
	}

	fn deadline_ms(&self) -> u64 {
		let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();
		now.saturating_add(self.config.signature_validity_time.saturating_mul(1000))
	}
}

#[async_trait::async_trait]
impl Connector for CasperConnector {
	fn network(&self) -> Network {
		self.network.clone()
	}

	fn known_tokens(&self) -> Vec<KnownToken> {
		self.tokens.clone()
	}

	async fn event_stream(
		&self,
		from_block: u64,
		shutdown: CancellationToken,
	) -> ConnectorResult<()> {
		let (replayed, followed) =
			tokio::join!(self.replay(from_block, &shutdown), self.follow(&shutdown));
		replayed?;
		followed
	}

	async fn bridge_out(&self, request: TokenOutRequest) -> ConnectorResult<Vec<u8>> {
		let public_key = self.signer.public_key(NetworkType::Casper).await.map_err(signer_error)?;
		let account: [u8; 32] = public_key.as_slice().try_into().map_err(|_| {
			ConnectorError::Signer(format!("unexpected public key length {}", public_key.len()))
		})?;
		let args = BridgeOutArgs {
			token: array32(&request.token, "token")?,
			amount: request.amount,
			transaction_id: request.transaction_id,
			source_chain: &request.from.network_name,
			source_address: &request.from.address,
			recipient: array32(&request.to, "recipient")?,
		};
		let timestamp_ms = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();
		let mut deploy = Deploy::bridge_out(
			account,
			&self.config.chain_name,
			timestamp_ms,
			self.config.gas_limit,
			array32(&self.bridge_hash, "bridge contract hash")?,
			&args,
		);

		let signature = self
			.signer
			.sign(NetworkType::Casper, &deploy.hash(), PayloadKind::TransactionDigest)
			.await
			.map_err(signer_error)?;
		deploy.approve(&signature);

		let deploy_hash = self.rpc.put_deploy(deploy.to_json()).await?;
		tracing::info!(
			network = %self.network.name,
			transaction_id = %request.transaction_id,
			"bridge_out deploy sent: {deploy_hash}"
		);
		hex::decode(&deploy_hash).map_err(ConnectorError::decode)
	}

	async fn estimate_transfer(&self) -> ConnectorResult<Estimation> {
		Ok(Estimation {
			fee: self.config.gas_limit.to_string(),
			fee_percentage: self.config.fee_percentage.clone(),
			estimated_confirmation: self.config.estimated_confirmation,
		})
	}

	async fn bridge_in_signature(
		&self,
		request: BridgeInSignatureRequest,
	) -> ConnectorResult<BridgeInSignatureResponse> {
		let deadline = U256::from(self.deadline_ms());
		let token = address_body(NetworkType::Casper, &request.token);
		let account = address_body(NetworkType::Casper, &request.user);

		let digest = bridge_in_digest(&BridgeInPayload {
			prefix: &self.config.bridge_in_prefix,
			bridge_hash: &self.bridge_hash,
			token: &token,
			account: &account,
			amount: request.amount,
			gas_commission: request.gas_commission,
			deadline,
			nonce: request.nonce,
			destination_chain: &request.destination.network_name,
			destination_address: &request.destination.address,
		});
		let signature = sign_digest(self.signer.as_ref(), &digest).await?;

		Ok(BridgeInSignatureResponse {
			token: request.token,
			amount: request.amount,
			gas_commission: request.gas_commission.to_string(),
			destination: request.destination,
			deadline: deadline.to_string(),
			nonce: request.nonce,
			signature,
		})
	}

	async fn cancel_signature(
		&self,
		request: CancelSignatureRequest,
	) -> ConnectorResult<CancelSignatureResponse> {
		let token = address_body(NetworkType::Casper, &request.token);
		let recipient = address_body(NetworkType::Casper, &request.recipient);

		let digest = transfer_out_digest(&TransferOutPayload {
			prefix: &self.config.transfer_out_prefix,
			bridge_hash: &self.bridge_hash,
			token: &token,
			account: &recipient,
			recipient: &recipient,
			amount: request.amount,
			gas_commission: request.commission,
			nonce: request.nonce,
		});
		let signature = sign_digest(self.signer.as_ref(), &digest).await?;
		Ok(CancelSignatureResponse { signature })
	}

	fn publisher(&self) -> &EventPublisher {
		&self.publisher
	}
}
