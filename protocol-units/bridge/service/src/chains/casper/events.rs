//! Decoder of the event blob the bridge contract writes on every deposit and
//! release.

use super::bytesrepr::{BytesreprError, Reader};
use alloy::primitives::U256;
use bridge_util::networks::{CASPER_TAG_ACCOUNT, CASPER_TAG_HASH};
use bridge_util::{EventVariant, FundsIn, FundsOut, NetworkAddress, TransactionInfo};

const FUNDS_IN: u8 = 0;
const FUNDS_OUT: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundsInBlob {
	pub token: [u8; 32],
	pub destination_chain: String,
	pub destination_address: String,
	pub amount: U256,
	pub gas_commission: U256,
	pub stable_commission_percent: U256,
	pub nonce: U256,
	pub sender: [u8; 32],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundsOutBlob {
	pub token: [u8; 32],
	pub source_chain: String,
	pub source_address: String,
	pub amount: U256,
	pub transaction_id: U256,
	pub recipient: [u8; 32],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
	FundsIn(FundsInBlob),
	FundsOut(FundsOutBlob),
}

fn tagged(tag: u8, body: &[u8; 32]) -> Vec<u8> {
	let mut out = Vec::with_capacity(33);
	out.push(tag);
	out.extend_from_slice(body);
	out
}

impl BridgeEvent {
	/// Decodes `u32 length || body`; bytes past the declared length are ignored.
	pub fn decode(bytes: &[u8]) -> Result<BridgeEvent, BytesreprError> {
		let mut outer = Reader::new(bytes);
		let len = outer.u32("event length")? as usize;
		let mut reader = Reader::new(outer.take(len, "event body")?);

		let kind = reader.u8("event type")?;
		let token = reader.array32("token")?;
		let chain = reader.string("chain name")?;
		let address = reader.string("chain address")?;
		let amount = reader.u256("amount")?;

		let event = match kind {
			FUNDS_IN => {
				let gas_commission = reader.u256("gas commission")?;
				let stable_commission_percent = reader.u256("stable commission percent")?;
				let nonce = reader.u256("nonce")?;
				reader.u8("sender key tag")?;
				BridgeEvent::FundsIn(FundsInBlob {
					token,
					destination_chain: chain,
					destination_address: address,
					amount,
					gas_commission,
					stable_commission_percent,
					nonce,
					sender: reader.array32("sender")?,
				})
			}
			FUNDS_OUT => {
				let transaction_id = reader.u256("transaction id")?;
				reader.u8("recipient key tag")?;
				BridgeEvent::FundsOut(FundsOutBlob {
					token,
					source_chain: chain,
					source_address: address,
					amount,
					transaction_id,
					recipient: reader.array32("recipient")?,
				})
			}
			tag => return Err(BytesreprError::UnknownTag { field: "event type", tag }),
		};
		Ok(event)
	}

	/// Canonical event; the token carries the hash tag, the user the account tag.
	pub fn into_event(self, tx: TransactionInfo) -> EventVariant {
		match self {
			BridgeEvent::FundsIn(blob) => EventVariant::FundsIn(FundsIn {
				from: tagged(CASPER_TAG_ACCOUNT, &blob.sender),
				to: NetworkAddress::new(blob.destination_chain, blob.destination_address),
				amount: blob.amount.to_string(),
				token: tagged(CASPER_TAG_HASH, &blob.token),
				tx,
			}),
			BridgeEvent::FundsOut(blob) => EventVariant::FundsOut(FundsOut {
				from: NetworkAddress::new(blob.source_chain, blob.source_address),
				to: tagged(CASPER_TAG_ACCOUNT, &blob.recipient),
				amount: blob.amount.to_string(),
				token: tagged(CASPER_TAG_HASH, &blob.token),
				tx,
			}),
		}
	}

	#[cfg(test)]
	pub(crate) fn encode(&self) -> Vec<u8> {
		use super::bytesrepr::{write_big_uint, write_string, write_u32};

		let mut body = Vec::new();
		match self {
			BridgeEvent::FundsIn(blob) => {
				body.push(FUNDS_IN);
				body.extend_from_slice(&blob.token);
				write_string(&mut body, &blob.destination_chain);
				write_string(&mut body, &blob.destination_address);
				write_big_uint(&mut body, blob.amount);
				write_big_uint(&mut body, blob.gas_commission);
				write_big_uint(&mut body, blob.stable_commission_percent);
				write_big_uint(&mut body, blob.nonce);
				body.push(0);
				body.extend_from_slice(&blob.sender);
			}
			BridgeEvent::FundsOut(blob) => {
				body.push(FUNDS_OUT);
				body.extend_from_slice(&blob.token);
				write_string(&mut body, &blob.source_chain);
				write_string(&mut body, &blob.source_address);
				write_big_uint(&mut body, blob.amount);
				write_big_uint(&mut body, blob.transaction_id);
				body.push(0);
				body.extend_from_slice(&blob.recipient);
			}
		}
		let mut out = Vec::with_capacity(body.len() + 4);
		write_u32(&mut out, body.len() as u32);
		out.extend(body);
		out
	}
}
