use crate::env_default;
use serde::{Deserialize, Serialize};

const DEFAULT_TOKEN_ID: i64 = 1;
const DEFAULT_SUBSCRIBER_CAPACITY: usize = 64;
const DEFAULT_SHUTDOWN_DEADLINE_SECS: u64 = 10;
const DEFAULT_REST_LISTENER_HOSTNAME: &str = "0.0.0.0";
const DEFAULT_REST_LISTENER_PORT: u16 = 30884;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
	/// Token recorded on transfers created from chain events.
	#[serde(default = "default_token_id")]
	pub token_id: i64,
	/// Capacity of each connector subscriber channel.
	#[serde(default = "default_subscriber_capacity")]
	pub subscriber_capacity: usize,
	/// Hard deadline for the graceful stop.
	#[serde(default = "default_shutdown_deadline_secs")]
	pub shutdown_deadline_secs: u64,

	#[serde(default = "default_rest_listener_hostname")]
	pub rest_listener_hostname: String,
	#[serde(default = "default_rest_listener_port")]
	pub rest_port: u16,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			token_id: default_token_id(),
			subscriber_capacity: default_subscriber_capacity(),
			shutdown_deadline_secs: default_shutdown_deadline_secs(),
			rest_listener_hostname: default_rest_listener_hostname(),
			rest_port: default_rest_listener_port(),
		}
	}
}

impl BridgeConfig {
	pub fn rest_listener_url(&self) -> String {
		format!("{}:{}", self.rest_listener_hostname, self.rest_port)
	}
}

env_default!(default_token_id, "BRIDGE_TOKEN_ID", i64, DEFAULT_TOKEN_ID);

env_default!(
	default_subscriber_capacity,
	"SUBSCRIBER_CAPACITY",
	usize,
	DEFAULT_SUBSCRIBER_CAPACITY
);

env_default!(
	default_shutdown_deadline_secs,
	"SHUTDOWN_DEADLINE_SECS",
	u64,
	DEFAULT_SHUTDOWN_DEADLINE_SECS
);

env_default!(
	default_rest_listener_hostname,
	"REST_LISTENER_HOSTNAME",
	String,
	DEFAULT_REST_LISTENER_HOSTNAME.to_string()
);

env_default!(default_rest_listener_port, "REST_LISTENER_PORT", u16, DEFAULT_REST_LISTENER_PORT);
