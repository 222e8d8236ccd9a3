use super::signer::BridgeTxSigner;
use super::types::{AlloyProvider, Bridge};
use alloy::network::EthereumWallet;
use alloy::primitives::{Address, B256, U256};
use alloy::providers::fillers::{ChainIdFiller, GasFiller, NonceFiller};
use alloy::providers::{Provider, ProviderBuilder, WsConnect};
use alloy::rpc::types::{Filter, Log};
use bridge_config::common::evm::EvmConfig;
use bridge_signer::Signing;
use bridge_util::{ConnectorError, ConnectorResult};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;

pub type LogStream = Pin<Box<dyn Stream<Item = Log> + Send>>;

/// Arguments of the contract's `bridgeOut`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOutCall {
	pub token: Address,
	pub recipient: Address,
	pub amount: U256,
	pub transaction_id: U256,
	pub source_chain: String,
	pub source_address: String,
}

/// Node access used by the EVM connector.
#[async_trait::async_trait]
pub trait EvmRpc: Send + Sync {
	async fn block_number(&self) -> ConnectorResult<u64>;

	async fn logs(&self, filter: &Filter) -> ConnectorResult<Vec<Log>>;

	/// Live logs matching `filter` until the socket closes.
	async fn subscribe_logs(&self, filter: &Filter) -> ConnectorResult<LogStream>;

	async fn gas_price(&self) -> ConnectorResult<u128>;

	/// Signs and broadcasts `bridgeOut`, returning the transaction hash.
	async fn bridge_out(&self, call: BridgeOutCall) -> ConnectorResult<B256>;
}

/// Alloy backed [`EvmRpc`]: HTTP for requests, WebSocket for subscriptions.
#[derive(Clone)]
pub struct AlloyRpc {
	rpc_provider: AlloyProvider,
	ws_url: String,
	bridge_contract: Address,
	signer_address: Address,
}

impl AlloyRpc {
	pub async fn new(config: &EvmConfig, signer: Arc<dyn Signing>) -> Result<Self, anyhow::Error> {
		let bridge_contract: Address = config.bridge_contract_address.parse()?;
		let tx_signer = BridgeTxSigner::new(signer, Some(config.chain_id)).await?;
		let signer_address = tx_signer.owner();
		let rpc_provider = ProviderBuilder::new()
			.filler(GasFiller)
			.filler(NonceFiller::default())
			.filler(ChainIdFiller::default())
			.wallet(EthereumWallet::from(tx_signer))
			.on_builtin(config.node_address.as_str())
			.await?;

		tracing::info!(
			"EVM client for {} uses bridge {} and owner {}",
			config.chain_name,
			bridge_contract,
			signer_address
		);

		Ok(AlloyRpc {
			rpc_provider,
			ws_url: config.ws_node_address.clone(),
			bridge_contract,
			signer_address,
		})
	}
}

#[async_trait::async_trait]
impl EvmRpc for AlloyRpc {
	async fn block_number(&self) -> ConnectorResult<u64> {
		self.rpc_provider.get_block_number().await.map_err(ConnectorError::generic)
	}

	async fn logs(&self, filter: &Filter) -> ConnectorResult<Vec<Log>> {
		self.rpc_provider.get_logs(filter).await.map_err(ConnectorError::generic)
	}

	async fn subscribe_logs(&self, filter: &Filter) -> ConnectorResult<LogStream> {
		let ws = ProviderBuilder::new()
			.on_ws(WsConnect::new(self.ws_url.clone()))
			.await
			.map_err(ConnectorError::generic)?;
		let subscription = ws.subscribe_logs(filter).await.map_err(ConnectorError::generic)?;
		let stream = async_stream::stream! {
			// The subscription lives as long as its provider.
			let _provider = ws;
			let mut logs = subscription.into_stream();
			while let Some(log) = logs.next().await {
				yield log;
			}
		};
		Ok(Box::pin(stream))
	}

	async fn gas_price(&self) -> ConnectorResult<u128> {
		self.rpc_provider.get_gas_price().await.map_err(ConnectorError::generic)
	}

	async fn bridge_out(&self, call: BridgeOutCall) -> ConnectorResult<B256> {
		let contract = Bridge::new(self.bridge_contract, self.rpc_provider.clone());
		let call_builder = contract
			.bridgeOut(
				call.token,
				call.recipient,
				call.amount,
				call.transaction_id,
				call.source_chain,
				call.source_address,
			)
			.from(self.signer_address);

		// Initial estimates run short on congested nodes, add 20%.
		let estimate = call_builder.estimate_gas().await.map_err(ConnectorError::generic)?;
		let call_builder = call_builder.gas(estimate + estimate / 5);
		let pending = call_builder.send().await.map_err(ConnectorError::generic)?;
		Ok(*pending.tx_hash())
	}
}
