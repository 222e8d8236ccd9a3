use crate::networks::NetworkAddress;
use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmountError {
	#[error("Amount is negative: {0}")]
	Negative(String),
	#[error("Amount is not an integer: {0}")]
	NotInteger(String),
	#[error("Amount does not fit 256 bits")]
	Overflow,
}

/// Parses a non negative decimal integer.
pub fn parse_amount(amount: &str) -> Result<U256, AmountError> {
	let amount = amount.trim();
	if amount.starts_with('-') {
		return Err(AmountError::Negative(amount.to_string()));
	}
	if amount.is_empty() || !amount.bytes().all(|b| b.is_ascii_digit()) {
		return Err(AmountError::NotInteger(amount.to_string()));
	}
	U256::from_str_radix(amount, 10).map_err(|_| AmountError::Overflow)
}

/// Minimal unsigned big-endian encoding, empty for zero.
pub fn amount_to_bytes(amount: U256) -> Vec<u8> {
	let bytes = amount.to_be_bytes::<32>();
	let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
	bytes[start..].to_vec()
}

pub fn amount_from_bytes(bytes: &[u8]) -> Result<U256, AmountError> {
	U256::try_from_be_slice(bytes).ok_or(AmountError::Overflow)
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown transfer status: {0}")]
pub struct UnknownStatus(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
	Waiting,
	Confirming,
	Cancelled,
	Finished,
}

impl TransferStatus {
	/// Persisted form.
	pub fn as_str(&self) -> &'static str {
		match self {
			TransferStatus::Waiting => "waiting",
			TransferStatus::Confirming => "confirming",
			TransferStatus::Cancelled => "cancelled",
			TransferStatus::Finished => "finished",
		}
	}

	pub fn is_final(&self) -> bool {
		matches!(self, TransferStatus::Cancelled | TransferStatus::Finished)
	}

	/// Allowed moves: waiting to confirming or cancelled, confirming to finished.
	pub fn can_transition_to(&self, next: TransferStatus) -> bool {
		matches!(
			(self, next),
			(TransferStatus::Waiting, TransferStatus::Confirming)
				| (TransferStatus::Waiting, TransferStatus::Cancelled)
				| (TransferStatus::Confirming, TransferStatus::Finished)
		)
	}
}

impl fmt::Display for TransferStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for TransferStatus {
	type Err = UnknownStatus;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"waiting" => Ok(TransferStatus::Waiting),
			"confirming" => Ok(TransferStatus::Confirming),
			"cancelled" => Ok(TransferStatus::Cancelled),
			"finished" => Ok(TransferStatus::Finished),
			_ => Err(UnknownStatus(s.to_string())),
		}
	}
}

/// Token contract a connector knows on its own network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownToken {
	pub id: u32,
	pub address: Vec<u8>,
}

/// Release of funds on the destination network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenOutRequest {
	pub amount: U256,
	pub token: Vec<u8>,
	pub to: Vec<u8>,
	pub from: NetworkAddress,
	pub transaction_id: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimation {
	pub fee: String,
	pub fee_percentage: String,
	pub estimated_confirmation: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeInSignatureRequest {
	pub user: Vec<u8>,
	pub nonce: U256,
	pub token: Vec<u8>,
	pub amount: U256,
	pub destination: NetworkAddress,
	pub gas_commission: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeInSignatureResponse {
	pub token: Vec<u8>,
	pub amount: U256,
	pub gas_commission: String,
	pub destination: NetworkAddress,
	pub deadline: String,
	pub nonce: U256,
	pub signature: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelSignatureRequest {
	pub nonce: U256,
	pub token: Vec<u8>,
	pub recipient: Vec<u8>,
	pub commission: U256,
	pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelSignatureResponse {
	pub signature: Vec<u8>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn amounts_parse_as_non_negative_integers() {
		assert_eq!(parse_amount("1000").unwrap(), U256::from(1000u64));
		assert_eq!(parse_amount("0").unwrap(), U256::ZERO);
		assert!(matches!(parse_amount("-1"), Err(AmountError::Negative(_))));
		assert!(matches!(parse_amount("1.5"), Err(AmountError::NotInteger(_))));
		assert!(matches!(parse_amount(""), Err(AmountError::NotInteger(_))));
		assert_eq!(parse_amount(&"9".repeat(80)), Err(AmountError::Overflow));
	}

	#[test]
	fn amount_bytes_are_minimal_big_endian() {
		assert_eq!(amount_to_bytes(U256::from(0x0102u64)), vec![0x01, 0x02]);
		assert!(amount_to_bytes(U256::ZERO).is_empty());
		assert_eq!(amount_from_bytes(&[0x01, 0x02]).unwrap(), U256::from(0x0102u64));
		assert_eq!(amount_from_bytes(&[]).unwrap(), U256::ZERO);
	}

	#[test]
	fn status_closure() {
		use TransferStatus::*;
		assert!(Waiting.can_transition_to(Confirming));
		assert!(Waiting.can_transition_to(Cancelled));
		assert!(Confirming.can_transition_to(Finished));
		for status in [Cancelled, Finished] {
			assert!(status.is_final());
			for next in [Waiting, Confirming, Cancelled, Finished] {
				assert!(!status.can_transition_to(next));
			}
		}
		assert_eq!("FINISHED".parse::<TransferStatus>().unwrap(), Finished);
		assert_eq!(serde_json::to_string(&Confirming).unwrap(), "\"CONFIRMING\"");
	}
}
