//! Per-network loop feeding connector events to the orchestrator and moving the
//! network's block cursor.

use crate::transfers::{TransferError, TransferOrchestrator};
use bridge_indexer_db::{BridgeStore, StoreError};
use bridge_util::{Connector, ConnectorError};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum DispatchError {
	#[error(transparent)]
	Store(#[from] StoreError),
	#[error("Event stream failed: {0}")]
	Stream(#[from] ConnectorError),
	#[error("Event handling failed at block {block}: {source}")]
	Transfer { block: u64, source: TransferError },
}

/// Block to resume from, creating the cursor at 0 for a new network.
async fn resume_block<S: BridgeStore>(store: &S, network_id: u32) -> Result<u64, StoreError> {
	match store.get_network_block(network_id).await {
		Ok(block) => Ok(block),
		Err(e) if e.is_not_found() => {
			store.create_network_block(network_id, 0).await?;
			Ok(0)
		}
		Err(e) => Err(e),
	}
}

/// Runs until shutdown, channel close, the end of the event stream or the first
/// failed event. A failed event leaves the cursor where it was so a restart
/// replays it. Buffered events are drained before the stream's end is observed.
pub async fn run_dispatcher<S, C>(
	store: Arc<S>,
	orchestrator: Arc<TransferOrchestrator<S, C>>,
	connector: Arc<C>,
	shutdown: CancellationToken,
) -> Result<(), DispatchError>
where
	S: BridgeStore + 'static,
	C: Connector,
{
	let network = connector.network();
	let from_block = resume_block(store.as_ref(), network.id).await?;
	tracing::info!(network = %network.name, from_block, "Dispatcher started");

	let mut subscriber = connector.add_event_subscriber();
	let stream_shutdown = shutdown.child_token();
	let mut stream = {
		let connector = connector.clone();
		let shutdown = stream_shutdown.clone();
		tokio::spawn(async move { connector.event_stream(from_block, shutdown).await })
	};
	let mut stream_running = true;

	let result = loop {
		let event = tokio::select! {
			biased;
			_ = shutdown.cancelled() => {
				tracing::info!(network = %network.name, "Dispatcher shutting down");
				break Ok(());
			}
			event = subscriber.recv() => event,
			joined = &mut stream, if stream_running => {
				stream_running = false;
				match joined {
					Ok(Ok(())) => {
						tracing::warn!(network = %network.name, "Event stream ended");
						break Ok(());
					}
					Ok(Err(e)) => {
						tracing::error!(network = %network.name, "Event stream failed: {e}");
						break Err(e.into());
					}
					Err(e) => {
						tracing::error!(network = %network.name, "Event stream task failed: {e}");
						break Err(DispatchError::Stream(ConnectorError::generic(e)));
					}
				}
			}
		};
		let Some(event) = event else {
			tracing::warn!(network = %network.name, "Event channel closed");
			break Ok(());
		};

		let block = event.block_number();
		tracing::debug!(network = %network.name, "Dispatching {event}");
		if let Err(source) = orchestrator.handle(&network, event).await {
			tracing::error!(network = %network.name, block, "Event handling failed: {source}");
			break Err(DispatchError::Transfer { block, source });
		}
		if let Err(e) = store.update_network_block(network.id, block).await {
			tracing::error!(network = %network.name, block, "Cursor update failed: {e}");
			break Err(e.into());
		}
	};

	connector.remove_event_subscriber(subscriber.id());
	stream_shutdown.cancel();
	if stream_running {
		if let Ok(Err(e)) = stream.await {
			tracing::warn!(network = %network.name, "Event stream stopped with: {e}");
		}
	}
	result
}
