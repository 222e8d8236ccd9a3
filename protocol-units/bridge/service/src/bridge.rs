use crate::connectors::Connectors;
use crate::dispatcher::{run_dispatcher, DispatchError};
use crate::requests::Requests;
use crate::transfers::TransferOrchestrator;
use bridge_indexer_db::{BridgeStore, StoreError};
use bridge_signer::{PayloadKind, SignerError, Signing};
use bridge_util::{Connector, NetworkType};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum BridgeError {
	#[error("Network {0} is already connected")]
	AlreadyConnected(String),
	#[error("Network {0} is not connected")]
	NotConnected(String),
	#[error(transparent)]
	Store(#[from] StoreError),
	#[error(transparent)]
	Signer(#[from] SignerError),
	#[error("Bridge error: {0}")]
	Generic(String),
}

impl BridgeError {
	pub fn generic<E: std::error::Error>(e: E) -> Self {
		Self::Generic(e.to_string())
	}
}

struct Dispatcher {
	handle: JoinHandle<Result<(), DispatchError>>,
	shutdown: CancellationToken,
}

/// Owns the connectors and their dispatchers.
pub struct Bridge<S, C> {
	store: Arc<S>,
	signer: Arc<dyn Signing>,
	connectors: Arc<Connectors<C>>,
	orchestrator: Arc<TransferOrchestrator<S, C>>,
	dispatchers: Mutex<HashMap<String, Dispatcher>>,
	shutdown: CancellationToken,
}

impl<S, C> Bridge<S, C>
where
	S: BridgeStore + 'static,
	C: Connector,
{
	pub fn new(store: Arc<S>, signer: Arc<dyn Signing>, token_id: i64) -> Self {
		let connectors = Arc::new(Connectors::new());
		let orchestrator =
			Arc::new(TransferOrchestrator::new(store.clone(), connectors.clone(), token_id));
		Bridge {
			store,
			signer,
			connectors,
			orchestrator,
			dispatchers: Mutex::new(HashMap::new()),
			shutdown: CancellationToken::new(),
		}
	}

	fn dispatchers(&self) -> MutexGuard<'_, HashMap<String, Dispatcher>> {
		self.dispatchers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	pub fn requests(&self) -> Requests<S, C> {
		Requests::new(self.store.clone(), self.connectors.clone())
	}

	pub fn connectors(&self) -> &Arc<Connectors<C>> {
		&self.connectors
	}

	/// Registers the connector, makes sure its network has a nonce row and starts
	/// its dispatcher.
	pub async fn add_connector(&self, connector: C) -> Result<(), BridgeError> {
		let network = connector.network();
		if self.connectors.contains(&network.name) {
			return Err(BridgeError::AlreadyConnected(network.name));
		}
		match self.store.get_nonce(network.id).await {
			Ok(_) => {}
			Err(e) if e.is_not_found() => self.store.create_nonce(network.id, 0).await?,
			Err(e) => return Err(e.into()),
		}

		let connector = Arc::new(connector);
		if !self.connectors.insert(connector.clone()) {
			return Err(BridgeError::AlreadyConnected(network.name));
		}

		let shutdown = self.shutdown.child_token();
		let handle = tokio::spawn(run_dispatcher(
			self.store.clone(),
			self.orchestrator.clone(),
			connector,
			shutdown.clone(),
		));
		self.dispatchers().insert(network.name.clone(), Dispatcher { handle, shutdown });
		tracing::info!(network = %network.name, "Connector added");
		Ok(())
	}

	/// Stops the network's dispatcher and forgets its connector.
	pub async fn remove_connector(&self, name: &str) -> Result<(), BridgeError> {
		let dispatcher = self.dispatchers().remove(name);
		if self.connectors.remove(name).is_none() {
			return Err(BridgeError::NotConnected(name.to_string()));
		}
		if let Some(dispatcher) = dispatcher {
			dispatcher.shutdown.cancel();
			match dispatcher.handle.await {
				Ok(Ok(())) => {}
				Ok(Err(e)) => tracing::warn!(network = name, "Dispatcher had stopped with: {e}"),
				Err(e) => tracing::warn!(network = name, "Dispatcher task failed: {e}"),
			}
		}
		tracing::info!(network = name, "Connector removed");
		Ok(())
	}

	pub fn is_connector_connected(&self, name: &str) -> bool {
		self.connectors.contains(name)
	}

	/// True while every connected network has a live dispatcher.
	pub fn is_healthy(&self) -> bool {
		let dispatchers = self.dispatchers();
		!dispatchers.is_empty() && dispatchers.values().all(|d| !d.handle.is_finished())
	}

	pub async fn sign(
		&self,
		network_type: NetworkType,
		payload: &[u8],
		kind: PayloadKind,
	) -> Result<Vec<u8>, BridgeError> {
		Ok(self.signer.sign(network_type, payload, kind).await?)
	}

	pub async fn public_key(&self, network_type: NetworkType) -> Result<Vec<u8>, BridgeError> {
		Ok(self.signer.public_key(network_type).await?)
	}

	/// Cancels every dispatcher and waits for them, giving up after `deadline`.
	pub async fn shutdown(&self, deadline: Duration) {
		self.shutdown.cancel();
		let dispatchers: Vec<(String, Dispatcher)> = self.dispatchers().drain().collect();

		let join_all = async {
			for (name, dispatcher) in dispatchers {
				match dispatcher.handle.await {
					Ok(Ok(())) => tracing::info!(network = %name, "Dispatcher stopped"),
					Ok(Err(e)) => tracing::warn!(network = %name, "Dispatcher stopped with: {e}"),
					Err(e) => tracing::error!(network = %name, "Dispatcher task failed: {e}"),
				}
			}
		};
		if tokio::time::timeout(deadline, join_all).await.is_err() {
			tracing::warn!("Shutdown deadline of {deadline:?} reached, abandoning dispatchers");
		}
	}
}
