use super::sse::ExecutionResult;
use bridge_util::{ConnectorError, ConnectorResult};
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::pin::Pin;

pub type ByteStream = Pin<Box<dyn Stream<Item = ConnectorResult<Vec<u8>>> + Send>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
	pub height: u64,
	pub deploy_hashes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DeployInfo {
	pub hash: String,
	/// Hex public key of the deploy's account, tag included.
	pub account: String,
	pub execution_results: Vec<ExecutionResult>,
}

/// Node access used by the Casper connector.
#[async_trait::async_trait]
pub trait CasperRpc: Send + Sync {
	async fn latest_block_height(&self) -> ConnectorResult<u64>;

	async fn block_by_height(&self, height: u64) -> ConnectorResult<BlockInfo>;

	async fn block_height_by_hash(&self, block_hash: &str) -> ConnectorResult<u64>;

	async fn deploy(&self, deploy_hash: &str) -> ConnectorResult<DeployInfo>;

	/// Submits a signed deploy in its JSON form, returning the deploy hash.
	async fn put_deploy(&self, deploy: Value) -> ConnectorResult<String>;

	/// Raw bytes of the node's server-sent event stream.
	async fn event_stream(&self) -> ConnectorResult<ByteStream>;
}

#[derive(Deserialize)]
struct RpcResponse<T> {
	result: Option<T>,
	error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
	code: i64,
	message: String,
}

#[derive(Deserialize)]
struct GetBlockResult {
	block: Option<Block>,
}

#[derive(Deserialize)]
struct Block {
	header: BlockHeader,
	body: BlockBody,
}

#[derive(Deserialize)]
struct BlockHeader {
	height: u64,
}

#[derive(Deserialize)]
struct BlockBody {
	#[serde(default)]
	deploy_hashes: Vec<String>,
}

#[derive(Deserialize)]
struct GetDeployResult {
	deploy: DeployJson,
	#[serde(default)]
	execution_results: Vec<BlockExecutionResult>,
}

#[derive(Deserialize)]
struct DeployJson {
	hash: String,
	header: DeployHeaderJson,
}

#[derive(Deserialize)]
struct DeployHeaderJson {
	account: String,
}

#[derive(Deserialize)]
struct BlockExecutionResult {
	result: ExecutionResult,
}

#[derive(Deserialize)]
struct PutDeployResult {
	deploy_hash: String,
}

/// JSON-RPC over HTTP plus the SSE endpoint, both through `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpCasperRpc {
	client: reqwest::Client,
	rpc_url: String,
	events_url: String,
}

impl HttpCasperRpc {
	pub fn new(rpc_url: impl Into<String>, events_url: impl Into<String>) -> Self {
		HttpCasperRpc { client: reqwest::Client::new(), rpc_url: rpc_url.into(), events_url: events_url.into() }
	}

	async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> ConnectorResult<T> {
		let request = json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": params });
		let response: RpcResponse<T> = self
			.client
			.post(&self.rpc_url)
			.json(&request)
			.send()
			.await
			.map_err(ConnectorError::generic)?
			.json()
			.await
			.map_err(ConnectorError::decode)?;

		match (response.result, response.error) {
			(Some(result), _) => Ok(result),
			(None, Some(error)) => Err(ConnectorError::Upstream(format!(
				"{method} failed with {}: {}",
				error.code, error.message
			))),
			(None, None) => Err(ConnectorError::Decode(format!("{method} returned no result"))),
		}
	}

	async fn block(&self, params: Value) -> ConnectorResult<BlockInfo> {
		let result: GetBlockResult = self.call("chain_get_block", params).await?;
		let block =
			result.block.ok_or_else(|| ConnectorError::Upstream("block not found".to_string()))?;
		Ok(BlockInfo { height: block.header.height, deploy_hashes: block.body.deploy_hashes })
	}
}

#[async_trait::async_trait]
impl CasperRpc for HttpCasperRpc {
	async fn latest_block_height(&self) -> ConnectorResult<u64> {
		Ok(self.block(json!([])).await?.height)
	}

	async fn block_by_height(&self, height: u64) -> ConnectorResult<BlockInfo> {
		self.block(json!({ "block_identifier": { "Height": height } })).await
	}

	async fn block_height_by_hash(&self, block_hash: &str) -> ConnectorResult<u64> {
		Ok(self.block(json!({ "block_identifier": { "Hash": block_hash } })).await?.height)
	}

	async fn deploy(&self, deploy_hash: &str) -> ConnectorResult<DeployInfo> {
		let result: GetDeployResult =
			self.call("info_get_deploy", json!({ "deploy_hash": deploy_hash })).await?;
		Ok(DeployInfo {
			hash: result.deploy.hash,
			account: result.deploy.header.account,
			execution_results: result.execution_results.into_iter().map(|r| r.result).collect(),
		})
	}

	async fn put_deploy(&self, deploy: Value) -> ConnectorResult<String> {
		let result: PutDeployResult = self.call("account_put_deploy", json!({ "deploy": deploy })).await?;
		Ok(result.deploy_hash)
	}

	async fn event_stream(&self) -> ConnectorResult<ByteStream> {
		let response = self
			.client
			.get(&self.events_url)
			.send()
			.await
			.and_then(|response| response.error_for_status())
			.map_err(ConnectorError::generic)?;
		let stream = response
			.bytes_stream()
			.map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(ConnectorError::generic));
		Ok(Box::pin(stream))
	}
}
