use anyhow::Result;
use bridge_config::Config;
use bridge_indexer_db::PgStore;
use bridge_service::chains::{AnyConnector, CasperConnector, EvmConnector};
use bridge_service::rest::BridgeRest;
use bridge_service::{known_tokens, Bridge};
use bridge_signer::{KeyCipher, PgKeyStore, Signer, Signing};
use bridge_util::networks::network_by_name;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
	use tracing_subscriber::EnvFilter;

	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.init();

	tracing::info!("Start Bridge");

	let config = Config::load()?;
	tracing::info!("Bridge config loaded: {config:?}");

	let store = Arc::new(PgStore::connect(&config.database.url, config.database.pool_size)?);

	let master_key = config
		.key_store
		.master_key
		.as_deref()
		.ok_or_else(|| anyhow::anyhow!("KEY_STORE_MASTER_KEY is not set"))?;
	let key_store = PgKeyStore::connect(&config.key_store.url, KeyCipher::from_hex(master_key)?)?;
	let signer: Arc<dyn Signing> = Arc::new(Signer::new(key_store));

	let bridge: Arc<Bridge<PgStore, AnyConnector>> =
		Arc::new(Bridge::new(store.clone(), signer.clone(), config.bridge.token_id));
	let capacity = config.bridge.subscriber_capacity;

	for evm in config.evm.clone() {
		let network = network_by_name(&evm.chain_name)?;
		let tokens = known_tokens(store.as_ref(), network.id).await?;
		let connector = EvmConnector::connect(evm, signer.clone(), capacity, tokens).await?;
		bridge.add_connector(connector.into()).await?;
	}
	for casper in config.casper.clone() {
		let network = network_by_name(&casper.chain_name)?;
		let tokens = known_tokens(store.as_ref(), network.id).await?;
		let connector = CasperConnector::connect(casper, signer.clone(), capacity, tokens)?;
		bridge.add_connector(connector.into()).await?;
	}

	let rest_service = BridgeRest::new(config.bridge.rest_listener_url(), bridge.clone());
	let rest_service_future = rest_service.run_service();
	let rest = tokio::spawn(rest_service_future);

	tracing::info!("Bridge connectors started, waiting for Ctrl-C");
	tokio::signal::ctrl_c().await?;
	tracing::info!("Shutting down bridge");

	rest.abort();
	bridge.shutdown(Duration::from_secs(config.bridge.shutdown_deadline_secs)).await;
	Ok(())
}
