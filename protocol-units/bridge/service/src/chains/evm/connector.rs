use super::client::{AlloyRpc, BridgeOutCall, EvmRpc};
use super::event_monitoring::{
	block_ranges, live_filter, parse_log, replay_filter, EventTopics, LISTENING_LIMIT,
};
use super::signatures::{bridge_in_digest, cancel_digest, sign_detached, BridgeInFields, CancelFields};
use super::types::evm_address;
use alloy::primitives::utils::format_ether;
use alloy::primitives::{Address, U256};
use alloy::rpc::types::Log;
use bridge_config::common::evm::EvmConfig;
use bridge_signer::Signing;
use bridge_util::networks::network_by_name;
use bridge_util::types::{
	BridgeInSignatureRequest, BridgeInSignatureResponse, CancelSignatureRequest,
	CancelSignatureResponse, Estimation, KnownToken, TokenOutRequest,
};
use bridge_util::{
	Connector, ConnectorError, ConnectorResult, EventPublisher, Network, NetworkType,
};
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Connector for one EVM-family chain.
pub struct EvmConnector {
	config: EvmConfig,
	network: Network,
	bridge_contract: Address,
	topics: EventTopics,
	rpc: Arc<dyn EvmRpc>,
	signer: Arc<dyn Signing>,
	publisher: EventPublisher,
	tokens: Vec<KnownToken>,
}

impl EvmConnector {
	pub fn new(
		config: EvmConfig,
		rpc: Arc<dyn EvmRpc>,
		signer: Arc<dyn Signing>,
		publisher: EventPublisher,
		tokens: Vec<KnownToken>,
	) -> ConnectorResult<Self> {
		let info = network_by_name(&config.chain_name)
			.map_err(|e| ConnectorError::InvalidArgument(e.to_string()))?;
		if info.network_type != NetworkType::Evm {
			return Err(ConnectorError::InvalidArgument(format!(
				"{} is a {} network",
				info.name, info.network_type
			)));
		}
		let bridge_contract = config.bridge_contract_address.parse::<Address>().map_err(|e| {
			ConnectorError::InvalidArgument(format!(
				"invalid bridge contract {}: {e}",
				config.bridge_contract_address
			))
		})?;
		let topics = EventTopics::from_config(&config)?;
		let network = Network {
			id: info.id,
			name: info.name.to_string(),
			network_type: NetworkType::Evm,
			is_testnet: config.is_testnet,
			node_address: config.node_address.clone(),
			bridge_contract: config.bridge_contract_address.clone(),
			gas_limit: config.gas_limit,
		};

		Ok(EvmConnector { config, network, bridge_contract, topics, rpc, signer, publisher, tokens })
	}

	/// Opens the node connections described by `config`.
	pub async fn connect(
		config: EvmConfig,
		signer: Arc<dyn Signing>,
		subscriber_capacity: usize,
		tokens: Vec<KnownToken>,
	) -> Result<Self, anyhow::Error> {
		let rpc = AlloyRpc::new(&config, signer.clone()).await?;
		Ok(Self::new(config, Arc::new(rpc), signer, EventPublisher::new(subscriber_capacity), tokens)?)
	}

	async fn publish_log(&self, log: &Log, shutdown: &CancellationToken) -> ConnectorResult<()> {
		match parse_log(log, &self.topics) {
			Ok(event) => {
				tracing::debug!(network = %self.network.name, "Publishing {event}");
				self.notify(event, shutdown).await;
				Ok(())
			}
			Err(ConnectorError::BlockchainRework(block)) => {
				tracing::warn!(network = %self.network.name, block, "Removed log skipped");
				Ok(())
			}
			Err(e) => Err(e),
		}
	}

	async fn replay(&self, from_block: u64, shutdown: &CancellationToken) -> ConnectorResult<()> {
		if from_block == 0 {
			return Ok(());
		}
		let head = self.rpc.block_number().await?;
		if from_block > head {
			tracing::info!(network = %self.network.name, from_block, head, "Nothing to replay");
			return Ok(());
		}
		tracing::info!(network = %self.network.name, from_block, head, "Replaying bridge logs");

		for (from, to) in block_ranges(from_block, head, LISTENING_LIMIT) {
			if shutdown.is_cancelled() {
				return Ok(());
			}
			let logs = self.rpc.logs(&replay_filter(self.bridge_contract, &self.topics, from, to)).await?;
			for log in &logs {
				if let Err(e) = self.publish_log(log, shutdown).await {
					tracing::error!(network = %self.network.name, from, to, "Replay aborted: {e}");
					return Err(e);
				}
			}
		}
		Ok(())
	}

	async fn follow(&self, shutdown: &CancellationToken) -> ConnectorResult<()> {
		let mut logs =
			self.rpc.subscribe_logs(&live_filter(self.bridge_contract, &self.topics)).await?;
		loop {
			tokio::select! {
				biased;
				_ = shutdown.cancelled() => return Ok(()),
				next = logs.next() => match next {
					Some(log) => {
						if let Err(e) = self.publish_log(&log, shutdown).await {
							tracing::warn!(network = %self.network.name, "Live log skipped: {e}");
						}
					}
					None => {
						tracing::warn!(network = %self.network.name, "Log subscription ended");
						return Ok(());
					}
				}
			}
		}
	}
}

/// `format_ether` pads to 18 decimals; keep only the significant ones.
fn trim_decimal(value: String) -> String {
	if !value.contains('.') {
		return value;
	}
	value.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[async_trait::async_trait]
impl Connector for EvmConnector {
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
		let call = BridgeOutCall {
			token: evm_address(&request.token)?,
			recipient: evm_address(&request.to)?,
			amount: request.amount,
			transaction_id: request.transaction_id,
			source_chain: request.from.network_name,
			source_address: request.from.address,
		};
		let tx_hash = self.rpc.bridge_out(call).await?;
		tracing::info!(
			network = %self.network.name,
			transaction_id = %request.transaction_id,
			"bridgeOut sent: {tx_hash}"
		);
		Ok(tx_hash.to_vec())
	}

	async fn estimate_transfer(&self) -> ConnectorResult<Estimation> {
		let gas_price = self.rpc.gas_price().await?;
		let fee = U256::from(gas_price) * U256::from(self.config.gas_limit);
		Ok(Estimation {
			fee: trim_decimal(format_ether(fee)),
			fee_percentage: self.config.fee_percentage.clone(),
			estimated_confirmation: self.config.estimated_confirmation,
		})
	}

	async fn bridge_in_signature(
		&self,
		request: BridgeInSignatureRequest,
	) -> ConnectorResult<BridgeInSignatureResponse> {
		if request.amount <= request.gas_commission {
			return Err(ConnectorError::InvalidArgument(format!(
				"amount {} does not exceed the gas commission {}",
				request.amount, request.gas_commission
			)));
		}
		let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
		let deadline = U256::from(now.saturating_add(self.config.signature_validity_time));

		let digest = bridge_in_digest(&BridgeInFields {
			user: evm_address(&request.user)?,
			token: evm_address(&request.token)?,
			amount: request.amount,
			gas_commission: request.gas_commission,
			destination_chain: &request.destination.network_name,
			destination_address: &request.destination.address,
			deadline,
			nonce: request.nonce,
		});
		let signature = sign_detached(self.signer.as_ref(), digest).await?;

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
		let digest = cancel_digest(&CancelFields {
			token: evm_address(&request.token)?,
			recipient: evm_address(&request.recipient)?,
			amount: request.amount,
			commission: request.commission,
			nonce: request.nonce,
		});
		let signature = sign_detached(self.signer.as_ref(), digest).await?;
		Ok(CancelSignatureResponse { signature })
	}

	fn publisher(&self) -> &EventPublisher {
		&self.publisher
	}
}

#[cfg(test)]
mod tests {
	use super::super::client::LogStream;
	use super::super::event_monitoring::tests::{funds_in_data, rpc_log};
	use super::*;
	use alloy::primitives::B256;
	use alloy::rpc::types::Filter;
	use bridge_signer::{InMemoryKeyStore, KeyCipher, KeyStore, KeyType, Signer};
	use bridge_util::signature::recover_evm_address;
	use bridge_util::{EventVariant, NetworkAddress};
	use std::sync::Mutex;

	#[derive(Default)]
	struct MockRpc {
		head: u64,
		history: Vec<Log>,
		live: Vec<Log>,
		gas_price: u128,
		ranges: Mutex<Vec<(u64, u64)>>,
		sent: Mutex<Vec<BridgeOutCall>>,
	}

	#[async_trait::async_trait]
	impl EvmRpc for MockRpc {
		async fn block_number(&self) -> ConnectorResult<u64> {
			Ok(self.head)
		}

		async fn logs(&self, filter: &Filter) -> ConnectorResult<Vec<Log>> {
			let from = filter.get_from_block().unwrap_or_default();
			let to = filter.get_to_block().unwrap_or(u64::MAX);
			self.ranges.lock().unwrap().push((from, to));
			Ok(self
				.history
				.iter()
				.filter(|log| (from..=to).contains(&log.block_number.unwrap_or_default()))
				.cloned()
				.collect())
		}

		async fn subscribe_logs(&self, _filter: &Filter) -> ConnectorResult<LogStream> {
			Ok(futures::stream::iter(self.live.clone()).boxed())
		}

		async fn gas_price(&self) -> ConnectorResult<u128> {
			Ok(self.gas_price)
		}

		async fn bridge_out(&self, call: BridgeOutCall) -> ConnectorResult<B256> {
			self.sent.lock().unwrap().push(call);
			Ok(B256::repeat_byte(0xee))
		}
	}

	fn config() -> EvmConfig {
		EvmConfig {
			chain_name: "GOERLI".to_string(),
			bridge_contract_address: format!("{}", Address::repeat_byte(0xbb)),
			fund_in_event_hash: String::new(),
			fund_out_event_hash: String::new(),
			gas_limit: 500_000,
			fee_percentage: "0.5".to_string(),
			estimated_confirmation: 3,
			signature_validity_time: 600,
			..EvmConfig::default()
		}
	}

	async fn connector(rpc: Arc<MockRpc>) -> EvmConnector {
		let store = InMemoryKeyStore::new(KeyCipher::new(&[3u8; 32]).unwrap());
		store.create(NetworkType::Evm, KeyType::Signature, &[0x31; 32]).await.unwrap();
		let signer: Arc<dyn Signing> = Arc::new(Signer::new(store));
		EvmConnector::new(config(), rpc, signer, EventPublisher::new(16), vec![]).unwrap()
	}

	fn deposit(block: u64, tx: u8) -> Log {
		rpc_log(
			funds_in_data(Address::repeat_byte(0x01), Address::repeat_byte(0x02), 100),
			block,
			B256::repeat_byte(tx),
		)
	}

	#[tokio::test]
	async fn replay_then_live_events_reach_the_subscriber() {
		let mut removed = deposit(6_000, 0x03);
		removed.removed = true;
		let rpc = Arc::new(MockRpc {
			head: 6_000,
			history: vec![deposit(5, 0x01), deposit(4_000, 0x02), removed],
			live: vec![deposit(6_001, 0x04)],
			..MockRpc::default()
		});
		let connector = connector(rpc.clone()).await;
		let mut subscriber = connector.add_event_subscriber();

		connector.event_stream(10, CancellationToken::new()).await.unwrap();

		assert_eq!(*rpc.ranges.lock().unwrap(), vec![(10, 2_509), (2_510, 5_009), (5_010, 6_000)]);
		let mut blocks = vec![
			subscriber.recv().await.unwrap().block_number(),
			subscriber.recv().await.unwrap().block_number(),
		];
		blocks.sort();
		assert_eq!(blocks, vec![4_000, 6_001]);
		connector.remove_event_subscriber(subscriber.id());
		assert!(subscriber.recv().await.is_none());
	}

	#[tokio::test]
	async fn zero_cursor_skips_the_replay() {
		let rpc = Arc::new(MockRpc { head: 100, history: vec![deposit(50, 0x01)], ..MockRpc::default() });
		let connector = connector(rpc.clone()).await;
		let _subscriber = connector.add_event_subscriber();

		connector.event_stream(0, CancellationToken::new()).await.unwrap();
		assert!(rpc.ranges.lock().unwrap().is_empty());

		connector.event_stream(101, CancellationToken::new()).await.unwrap();
		assert!(rpc.ranges.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn live_event_is_decoded_for_the_destination() {
		let rpc = Arc::new(MockRpc { live: vec![deposit(7, 0x09)], ..MockRpc::default() });
		let connector = connector(rpc).await;
		let mut subscriber = connector.add_event_subscriber();

		connector.event_stream(0, CancellationToken::new()).await.unwrap();
		let EventVariant::FundsIn(event) = subscriber.recv().await.unwrap() else {
			panic!("expected FundsIn")
		};
		assert_eq!(event.to, NetworkAddress::new("CASPER-TEST", "account-hash-5e68"));
		assert_eq!(event.tx.hash, vec![0x09; 32]);
	}

	#[tokio::test]
	async fn bridge_out_passes_the_source_address() {
		let rpc = Arc::new(MockRpc::default());
		let connector = connector(rpc.clone()).await;

		let tx_hash = connector
			.bridge_out(TokenOutRequest {
				amount: U256::from(1000u64),
				token: vec![0x0e; 20],
				to: vec![0x0f; 20],
				from: NetworkAddress::new("CASPER-TEST", "aabb"),
				transaction_id: U256::from(12u64),
			})
			.await
			.unwrap();
		assert_eq!(tx_hash, vec![0xee; 32]);

		let sent = rpc.sent.lock().unwrap();
		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0].recipient, Address::repeat_byte(0x0f));
		assert_eq!(sent[0].transaction_id, U256::from(12u64));
		assert_eq!(sent[0].source_chain, "CASPER-TEST");
		assert_eq!(sent[0].source_address, "aabb");
	}

	#[tokio::test]
	async fn bridge_out_rejects_non_evm_recipients() {
		let connector = connector(Arc::new(MockRpc::default())).await;
		let res = connector
			.bridge_out(TokenOutRequest {
				amount: U256::from(1u64),
				token: vec![0x0e; 20],
				to: vec![0x0f; 32],
				from: NetworkAddress::new("CASPER-TEST", "aabb"),
				transaction_id: U256::from(1u64),
			})
			.await;
		assert!(matches!(res, Err(ConnectorError::InvalidArgument(_))));
	}

	#[tokio::test]
	async fn estimate_is_gas_price_times_limit_in_ether() {
		let rpc = Arc::new(MockRpc { gas_price: 20_000_000_000, ..MockRpc::default() });
		let connector = connector(rpc).await;

		let estimation = connector.estimate_transfer().await.unwrap();
		assert_eq!(estimation.fee, "0.01");
		assert_eq!(estimation.fee_percentage, "0.5");
		assert_eq!(estimation.estimated_confirmation, 3);
	}

	#[test]
	fn decimals_are_trimmed() {
		assert_eq!(trim_decimal("0.010000".to_string()), "0.01");
		assert_eq!(trim_decimal("2.000".to_string()), "2");
		assert_eq!(trim_decimal("100".to_string()), "100");
	}

	fn bridge_in_request(amount: u64, gas_commission: u64) -> BridgeInSignatureRequest {
		BridgeInSignatureRequest {
			user: vec![0x01; 20],
			nonce: U256::from(8u64),
			token: vec![0x02; 20],
			amount: U256::from(amount),
			destination: NetworkAddress::new("CASPER-TEST", "account-hash-5e68"),
			gas_commission: U256::from(gas_commission),
		}
	}

	#[tokio::test]
	async fn bridge_in_signature_is_valid_until_the_deadline() {
		let connector = connector(Arc::new(MockRpc::default())).await;
		let before = chrono::Utc::now().timestamp() as u64;

		let response = connector.bridge_in_signature(bridge_in_request(1000, 0)).await.unwrap();
		let deadline: u64 = response.deadline.parse().unwrap();
		assert!(deadline >= before + 600 && deadline <= before + 605);
		assert_eq!(response.gas_commission, "0");
		assert_eq!(response.nonce, U256::from(8u64));

		let digest = bridge_in_digest(&BridgeInFields {
			user: Address::repeat_byte(0x01),
			token: Address::repeat_byte(0x02),
			amount: U256::from(1000u64),
			gas_commission: U256::ZERO,
			destination_chain: "CASPER-TEST",
			destination_address: "account-hash-5e68",
			deadline: U256::from(deadline),
			nonce: U256::from(8u64),
		});
		assert!(recover_evm_address(digest.as_slice(), &response.signature).is_ok());
	}

	#[tokio::test]
	async fn amount_must_exceed_gas_commission() {
		let connector = connector(Arc::new(MockRpc::default())).await;
		let res = connector.bridge_in_signature(bridge_in_request(100, 100)).await;
		assert!(matches!(res, Err(ConnectorError::InvalidArgument(_))));
	}

	#[test]
	fn casper_chain_name_is_rejected() {
		let signer: Arc<dyn Signing> = Arc::new(Signer::new(InMemoryKeyStore::new(
			KeyCipher::new(&[3u8; 32]).unwrap(),
		)));
		let config = EvmConfig { chain_name: "CASPER-TEST".to_string(), ..config() };
		let res = EvmConnector::new(
			config,
			Arc::new(MockRpc::default()),
			signer,
			EventPublisher::new(1),
			vec![],
		);
		assert!(matches!(res, Err(ConnectorError::InvalidArgument(_))));
	}
}
