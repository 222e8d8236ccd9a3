#![allow(dead_code)]

use alloy::primitives::U256;
use bridge_indexer_db::models::NetworkToken;
use bridge_indexer_db::{InMemoryStore, NetworkTokens, Tokens};
use bridge_service::Bridge;
use bridge_signer::{InMemoryKeyStore, KeyCipher, Signer, Signing};
use bridge_util::networks::network_by_name;
use bridge_util::types::{
	BridgeInSignatureRequest, BridgeInSignatureResponse, CancelSignatureRequest,
	CancelSignatureResponse, Estimation, KnownToken, TokenOutRequest,
};
use bridge_util::{
	Connector, ConnectorResult, EventPublisher, EventVariant, FundsIn, FundsOut, Network,
	NetworkAddress, TransactionInfo,
};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const EVM_NETWORK: &str = "GOERLI";
pub const CASPER_NETWORK: &str = "CASPER-TEST";
pub const EVM_TOKEN: [u8; 20] = [0x7a; 20];
pub const CASPER_TOKEN: [u8; 32] = [0x7b; 32];

/// Connector that replays a scripted list of events and records outbound calls.
pub struct MockConnector {
	network: Network,
	publisher: EventPublisher,
	script: Mutex<Vec<EventVariant>>,
	pub started_from: Mutex<Vec<u64>>,
	pub bridge_outs: Mutex<Vec<TokenOutRequest>>,
	pub cancels: Mutex<Vec<CancelSignatureRequest>>,
	pub fee: String,
}

impl MockConnector {
	pub fn new(name: &str, script: Vec<EventVariant>) -> Self {
		let info = network_by_name(name).unwrap();
		MockConnector {
			network: Network {
				id: info.id,
				name: info.name.to_string(),
				network_type: info.network_type,
				is_testnet: info.is_testnet,
				node_address: format!("mock://{name}"),
				bridge_contract: String::new(),
				gas_limit: 30_000,
			},
			publisher: EventPublisher::new(8),
			script: Mutex::new(script),
			started_from: Mutex::new(Vec::new()),
			bridge_outs: Mutex::new(Vec::new()),
			cancels: Mutex::new(Vec::new()),
			fee: "30000".to_string(),
		}
	}

	pub fn bridge_out_count(&self) -> usize {
		self.bridge_outs.lock().unwrap().len()
	}
}

#[async_trait::async_trait]
impl Connector for MockConnector {
	fn network(&self) -> Network {
		self.network.clone()
	}

	fn known_tokens(&self) -> Vec<KnownToken> {
		Vec::new()
	}

	async fn event_stream(
		&self,
		from_block: u64,
		shutdown: CancellationToken,
	) -> ConnectorResult<()> {
		self.started_from.lock().unwrap().push(from_block);
		let script: Vec<EventVariant> = self.script.lock().unwrap().drain(..).collect();
		for event in script {
			self.notify(event, &shutdown).await;
		}
		shutdown.cancelled().await;
		Ok(())
	}

	async fn bridge_out(&self, request: TokenOutRequest) -> ConnectorResult<Vec<u8>> {
		self.bridge_outs.lock().unwrap().push(request);
		Ok(vec![0xee; 32])
	}

	async fn estimate_transfer(&self) -> ConnectorResult<Estimation> {
		Ok(Estimation {
			fee: self.fee.clone(),
			fee_percentage: "0".to_string(),
			estimated_confirmation: 1,
		})
	}

	async fn bridge_in_signature(
		&self,
		request: BridgeInSignatureRequest,
	) -> ConnectorResult<BridgeInSignatureResponse> {
		Ok(BridgeInSignatureResponse {
			token: request.token,
			amount: request.amount,
			gas_commission: request.gas_commission.to_string(),
			destination: request.destination,
			deadline: "0".to_string(),
			nonce: request.nonce,
			signature: request.nonce.to_be_bytes::<32>().to_vec(),
		})
	}

	async fn cancel_signature(
		&self,
		request: CancelSignatureRequest,
	) -> ConnectorResult<CancelSignatureResponse> {
		let signature = request.nonce.to_be_bytes::<32>().to_vec();
		self.cancels.lock().unwrap().push(request);
		Ok(CancelSignatureResponse { signature })
	}

	fn publisher(&self) -> &EventPublisher {
		&self.publisher
	}
}

pub fn casper_account(byte: u8) -> Vec<u8> {
	let mut account = vec![0x01];
	account.extend_from_slice(&[byte; 32]);
	account
}

pub fn tx(hash: u8, block_number: u64, sender: &[u8]) -> TransactionInfo {
	TransactionInfo { hash: vec![hash; 32], block_number, sender: sender.to_vec() }
}

/// Deposit on the EVM network heading to a Casper account.
pub fn evm_deposit(hash: u8, block: u64, amount: u64, user: [u8; 20], recipient: u8) -> EventVariant {
	EventVariant::FundsIn(FundsIn {
		from: user.to_vec(),
		to: NetworkAddress::new(CASPER_NETWORK, hex::encode(casper_account(recipient))),
		amount: amount.to_string(),
		token: EVM_TOKEN.to_vec(),
		tx: tx(hash, block, &user),
	})
}

/// Release on Casper completing a deposit made by `user` on the EVM network.
pub fn casper_release(hash: u8, block: u64, amount: u64, user: [u8; 20], recipient: u8) -> EventVariant {
	EventVariant::FundsOut(FundsOut {
		from: NetworkAddress::new(EVM_NETWORK, format!("0x{}", hex::encode(user))),
		to: casper_account(recipient),
		amount: amount.to_string(),
		token: CASPER_TOKEN.to_vec(),
		tx: tx(hash, block, &casper_account(0x5e)),
	})
}

/// Store holding token 1 on both test networks.
pub async fn seeded_store() -> Arc<InMemoryStore> {
	let store = Arc::new(InMemoryStore::new());
	let token_id = store.create_token("TKN", "Bridge test token").await.unwrap();
	for (network, address) in
		[(EVM_NETWORK, EVM_TOKEN.to_vec()), (CASPER_NETWORK, CASPER_TOKEN.to_vec())]
	{
		store
			.create_network_token(NetworkToken {
				network_id: network_by_name(network).unwrap().id,
				token_id,
				contract_address: address,
				decimals: 18,
			})
			.await
			.unwrap();
	}
	store
}

pub fn empty_signer() -> Arc<dyn Signing> {
	Arc::new(Signer::new(InMemoryKeyStore::new(KeyCipher::new(&[1u8; 32]).unwrap())))
}

pub fn bridge<C: Connector>(store: Arc<InMemoryStore>) -> Bridge<InMemoryStore, C> {
	Bridge::new(store, empty_signer(), 1)
}

/// Polls `check` until it holds, panicking after two seconds.
pub async fn eventually<F, Fut>(what: &str, mut check: F)
where
	F: FnMut() -> Fut,
	Fut: Future<Output = bool>,
{
	let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
	while !check().await {
		if tokio::time::Instant::now() > deadline {
			panic!("timed out waiting for {what}");
		}
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
}

pub fn amount(value: u64) -> U256 {
	U256::from(value)
}
