//! Node event stream frames and the execution effects carried by deploys.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SseFrame {
	#[serde(rename = "DeployProcessed")]
	pub deploy_processed: DeployProcessed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeployProcessed {
	pub deploy_hash: String,
	pub account: String,
	pub block_hash: String,
	pub execution_result: ExecutionResult,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutionResult {
	#[serde(rename = "Success", alias = "success", default)]
	pub success: Option<ExecutionSuccess>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionSuccess {
	pub effect: Effect,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Effect {
	#[serde(default)]
	pub transforms: Vec<TransformEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransformEntry {
	pub key: String,
	pub transform: serde_json::Value,
}

impl ExecutionResult {
	/// Raw `WriteCLValue` bytes written under `events_key`. Failed executions
	/// and undecodable hex yield nothing.
	pub fn event_blobs(&self, events_key: &str) -> Vec<Vec<u8>> {
		let Some(success) = &self.success else {
			return Vec::new();
		};
		success
			.effect
			.transforms
			.iter()
			.filter(|entry| entry.key == events_key)
			.filter_map(|entry| entry.transform.get("WriteCLValue")?.get("bytes")?.as_str())
			.filter_map(|bytes| match hex::decode(bytes) {
				Ok(blob) => Some(blob),
				Err(e) => {
					tracing::warn!("Event bytes under {events_key} are not hex: {e}");
					None
				}
			})
			.collect()
	}
}

/// Extracts a `DeployProcessed` frame from one stream line. Comments, keep
/// alives and other frame kinds give `None`.
pub fn parse_line(line: &str) -> Option<DeployProcessed> {
	let line = line.trim();
	if line.starts_with(':') || line.len() < 5 {
		return None;
	}
	let payload = line.strip_prefix("data:").unwrap_or(line).trim_start();
	serde_json::from_str::<SseFrame>(payload).ok().map(|frame| frame.deploy_processed)
}

/// Splits a chunked byte stream into lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
	pending: Vec<u8>,
}

impl LineBuffer {
	pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
		self.pending.extend_from_slice(chunk);
		let mut lines = Vec::new();
		while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
			let line: Vec<u8> = self.pending.drain(..=pos).collect();
			lines.push(String::from_utf8_lossy(&line).trim_end().to_string());
		}
		lines
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use serde_json::json;

	pub(crate) const EVENTS_KEY: &str = "uref-7f3a000000000000000000000000000000000000000000000000000000000000-007";

	pub(crate) fn execution_result(blob: &[u8]) -> serde_json::Value {
		json!({
			"Success": {
				"effect": {
					"transforms": [
						{ "key": "account-hash-00", "transform": "Identity" },
						{ "key": EVENTS_KEY, "transform": { "WriteCLValue": {
							"cl_type": { "List": "U8" },
							"bytes": hex::encode(blob),
							"parsed": null
						} } }
					]
				},
				"cost": "100"
			}
		})
	}

	pub(crate) fn deploy_processed_line(blob: &[u8], deploy_hash: &str) -> String {
		let frame = json!({
			"DeployProcessed": {
				"deploy_hash": deploy_hash,
				"account": format!("01{}", "5e".repeat(32)),
				"block_hash": "b1".repeat(32),
				"execution_result": execution_result(blob),
			}
		});
		format!("data:{frame}")
	}

	#[test]
	fn deploy_processed_frame_yields_the_event_bytes() {
		let deploy = parse_line(&deploy_processed_line(&[1, 2, 3], "aa")).unwrap();
		assert_eq!(deploy.deploy_hash, "aa");
		assert_eq!(deploy.execution_result.event_blobs(EVENTS_KEY), vec![vec![1, 2, 3]]);
		assert!(deploy.execution_result.event_blobs("uref-other").is_empty());
	}

	#[test]
	fn other_lines_are_skipped() {
		assert!(parse_line(":keep-alive").is_none());
		assert!(parse_line("id:").is_none());
		assert!(parse_line(r#"data:{"ApiVersion":"1.4.5"}"#).is_none());
		assert!(parse_line(r#"data:{"BlockAdded":{"block_hash":"00"}}"#).is_none());
		assert!(parse_line("data:{not json").is_none());
	}

	#[test]
	fn failed_execution_has_no_events() {
		let frame = json!({
			"DeployProcessed": {
				"deploy_hash": "aa",
				"account": "01",
				"block_hash": "bb",
				"execution_result": { "Failure": { "error_message": "User error: 1" } }
			}
		});
		let deploy = parse_line(&format!("data:{frame}")).unwrap();
		assert!(deploy.execution_result.event_blobs(EVENTS_KEY).is_empty());
	}

	#[test]
	fn chunks_are_joined_into_lines() {
		let mut buffer = LineBuffer::default();
		assert!(buffer.push(b"data:{\"a\"").is_empty());
		assert_eq!(buffer.push(b":1}\r\n:\nid:"), vec!["data:{\"a\":1}".to_string(), ":".to_string()]);
		assert_eq!(buffer.push(b"5\n"), vec!["id:5".to_string()]);
	}
}
