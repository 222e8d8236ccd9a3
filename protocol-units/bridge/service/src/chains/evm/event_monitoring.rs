use super::types::Bridge;
use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, B256};
use alloy::rpc::types::{Filter, Log};
use alloy::sol_types::SolEvent;
use bridge_config::common::evm::EvmConfig;
use bridge_util::{
	ConnectorError, ConnectorResult, EventVariant, FundsIn, FundsOut, NetworkAddress,
	TransactionInfo,
};

/// Largest block span requested from `eth_getLogs` at once.
pub const LISTENING_LIMIT: u64 = 2_500;

/// `topics[0]` values of the two bridge events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventTopics {
	pub funds_in: B256,
	pub funds_out: B256,
}

impl Default for EventTopics {
	fn default() -> Self {
		EventTopics {
			funds_in: Bridge::BridgeFundsIn::SIGNATURE_HASH,
			funds_out: Bridge::BridgeFundsOut::SIGNATURE_HASH,
		}
	}
}

impl EventTopics {
	/// Configured hashes are used verbatim; an empty value falls back to the
	/// hash of the bound event signature.
	pub fn from_config(config: &EvmConfig) -> ConnectorResult<Self> {
		let defaults = EventTopics::default();
		Ok(EventTopics {
			funds_in: parse_topic(&config.fund_in_event_hash, defaults.funds_in)?,
			funds_out: parse_topic(&config.fund_out_event_hash, defaults.funds_out)?,
		})
	}
}

fn parse_topic(raw: &str, default: B256) -> ConnectorResult<B256> {
	if raw.trim().is_empty() {
		return Ok(default);
	}
	raw.trim().parse::<B256>().map_err(|e| {
		ConnectorError::InvalidArgument(format!("invalid event topic {raw}: {e}"))
	})
}

/// Splits `[from, to]` into inclusive chunks of at most `limit` blocks.
pub fn block_ranges(from: u64, to: u64, limit: u64) -> Vec<(u64, u64)> {
	let limit = limit.max(1);
	let mut ranges = Vec::new();
	let mut start = from;
	while start <= to {
		let end = start.saturating_add(limit - 1).min(to);
		ranges.push((start, end));
		if end == u64::MAX {
			break;
		}
		start = end + 1;
	}
	ranges
}

pub fn bridge_filter(bridge_contract: Address, topics: &EventTopics) -> Filter {
	Filter::new()
		.address(bridge_contract)
		.event_signature(vec![topics.funds_in, topics.funds_out])
}

pub fn replay_filter(bridge_contract: Address, topics: &EventTopics, from: u64, to: u64) -> Filter {
	bridge_filter(bridge_contract, topics).from_block(from).to_block(to)
}

pub fn live_filter(bridge_contract: Address, topics: &EventTopics) -> Filter {
	bridge_filter(bridge_contract, topics).from_block(BlockNumberOrTag::Latest)
}

/// Converts a bridge log into the canonical event. Logs dropped by a reorg
/// yield [`ConnectorError::BlockchainRework`].
pub fn parse_log(log: &Log, topics: &EventTopics) -> ConnectorResult<EventVariant> {
	let block_number = log.block_number.unwrap_or_default();
	if log.removed {
		return Err(ConnectorError::BlockchainRework(block_number));
	}

	let topic = log.topics().first().ok_or_else(|| ConnectorError::Decode("log without topics".into()))?;
	let tx = TransactionInfo {
		hash: log.transaction_hash.map(|hash| hash.to_vec()).unwrap_or_default(),
		block_number,
		sender: log.address().to_vec(),
	};

	if *topic == topics.funds_in {
		let event = Bridge::BridgeFundsIn::decode_log_data(log.data(), false)
			.map_err(ConnectorError::decode)?;
		Ok(EventVariant::FundsIn(FundsIn {
			from: event.sender.to_vec(),
			to: NetworkAddress::new(event.destinationChain, event.destinationAddress),
			amount: event.amount.to_string(),
			token: event.token.to_vec(),
			tx,
		}))
	} else if *topic == topics.funds_out {
		let event = Bridge::BridgeFundsOut::decode_log_data(log.data(), false)
			.map_err(ConnectorError::decode)?;
		Ok(EventVariant::FundsOut(FundsOut {
			from: NetworkAddress::new(event.sourceChain, event.sourceAddress),
			to: event.recipient.to_vec(),
			amount: event.amount.to_string(),
			token: event.token.to_vec(),
			tx,
		}))
	} else {
		Err(ConnectorError::Decode(format!("unknown log topic {topic}")))
	}
}
