use crate::networks::NetworkAddress;
use std::fmt;

/// Chain transaction that carried an event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransactionInfo {
	pub hash: Vec<u8>,
	pub block_number: u64,
	pub sender: Vec<u8>,
}

/// Funds locked on the source network, heading to `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundsIn {
	pub from: Vec<u8>,
	pub to: NetworkAddress,
	pub amount: String,
	pub token: Vec<u8>,
	pub tx: TransactionInfo,
}

/// Funds released on the destination network, coming from `from`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundsOut {
	pub from: NetworkAddress,
	pub to: Vec<u8>,
	pub amount: String,
	pub token: Vec<u8>,
	pub tx: TransactionInfo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventVariant {
	FundsIn(FundsIn),
	FundsOut(FundsOut),
}

impl EventVariant {
	pub fn tx(&self) -> &TransactionInfo {
		match self {
			EventVariant::FundsIn(event) => &event.tx,
			EventVariant::FundsOut(event) => &event.tx,
		}
	}

	pub fn block_number(&self) -> u64 {
		self.tx().block_number
	}
}

impl fmt::Display for EventVariant {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let kind = match self {
			EventVariant::FundsIn(_) => "FundsIn",
			EventVariant::FundsOut(_) => "FundsOut",
		};
		write!(f, "{kind} tx: 0x{} block: {}", hex::encode(&self.tx().hash), self.block_number())
	}
}
