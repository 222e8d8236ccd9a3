//! Casper byte representation: little-endian integers, `u32` length
//! prefixed strings and `u8` length prefixed big integers.

use alloy::primitives::U256;
use bridge_util::ConnectorError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BytesreprError {
	#[error("{field}: needs {needed} bytes, {remaining} left")]
	EarlyEnd { field: &'static str, needed: usize, remaining: usize },
	#[error("{field}: invalid utf8")]
	InvalidUtf8 { field: &'static str },
	#[error("{field}: {len} byte integer does not fit 256 bits")]
	Overflow { field: &'static str, len: usize },
	#[error("{field}: unknown tag {tag}")]
	UnknownTag { field: &'static str, tag: u8 },
}

impl From<BytesreprError> for ConnectorError {
	fn from(e: BytesreprError) -> Self {
		ConnectorError::Decode(e.to_string())
	}
}

/// Cursor over a byte slice; every read names the field it decodes.
#[derive(Debug)]
pub struct Reader<'a> {
	bytes: &'a [u8],
}

impl<'a> Reader<'a> {
	pub fn new(bytes: &'a [u8]) -> Self {
		Reader { bytes }
	}

	pub fn remaining(&self) -> usize {
		self.bytes.len()
	}

	pub fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], BytesreprError> {
		if self.bytes.len() < len {
			return Err(BytesreprError::EarlyEnd {
				field,
				needed: len,
				remaining: self.bytes.len(),
			});
		}
		let (head, tail) = self.bytes.split_at(len);
		self.bytes = tail;
		Ok(head)
	}

	pub fn u8(&mut self, field: &'static str) -> Result<u8, BytesreprError> {
		Ok(self.take(1, field)?[0])
	}

	pub fn u32(&mut self, field: &'static str) -> Result<u32, BytesreprError> {
		let mut raw = [0u8; 4];
		raw.copy_from_slice(self.take(4, field)?);
		Ok(u32::from_le_bytes(raw))
	}

	pub fn array32(&mut self, field: &'static str) -> Result<[u8; 32], BytesreprError> {
		let mut out = [0u8; 32];
		out.copy_from_slice(self.take(32, field)?);
		Ok(out)
	}

	pub fn string(&mut self, field: &'static str) -> Result<String, BytesreprError> {
		let len = self.u32(field)? as usize;
		let raw = self.take(len, field)?;
		String::from_utf8(raw.to_vec()).map_err(|_| BytesreprError::InvalidUtf8 { field })
	}

	pub fn u256(&mut self, field: &'static str) -> Result<U256, BytesreprError> {
		let len = self.u8(field)? as usize;
		let raw = self.take(len, field)?;
		U256::try_from_le_slice(raw).ok_or(BytesreprError::Overflow { field, len })
	}
}

pub fn write_u32(out: &mut Vec<u8>, value: u32) {
	out.extend_from_slice(&value.to_le_bytes());
}

pub fn write_u64(out: &mut Vec<u8>, value: u64) {
	out.extend_from_slice(&value.to_le_bytes());
}

pub fn write_string(out: &mut Vec<u8>, value: &str) {
	write_bytes(out, value.as_bytes());
}

pub fn write_bytes(out: &mut Vec<u8>, value: &[u8]) {
	write_u32(out, value.len() as u32);
	out.extend_from_slice(value);
}

/// Length byte then the little-endian bytes without trailing zeros. Zero is a
/// single `00`. U128 and U512 share the layout.
pub fn write_big_uint(out: &mut Vec<u8>, value: U256) {
	let le = value.to_le_bytes::<32>();
	let len = le.iter().rposition(|b| *b != 0).map(|i| i + 1).unwrap_or(0);
	out.push(len as u8);
	out.extend_from_slice(&le[..len]);
}

pub fn big_uint_bytes(value: U256) -> Vec<u8> {
	let mut out = Vec::new();
	write_big_uint(&mut out, value);
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn big_uint_layout() {
		assert_eq!(hex::encode(big_uint_bytes(U256::from(2_500_000_000u64))), "0400f90295");
		assert_eq!(big_uint_bytes(U256::ZERO), vec![0]);
		assert_eq!(big_uint_bytes(U256::from(0x0100u64)), vec![2, 0x00, 0x01]);
		assert_eq!(big_uint_bytes(U256::MAX).len(), 33);
	}

	#[test]
	fn reader_reports_the_short_field() {
		let mut bytes = Vec::new();
		write_string(&mut bytes, "CASPER");
		bytes.extend_from_slice(&[3, 1, 2]);

		let mut reader = Reader::new(&bytes);
		assert_eq!(reader.string("chain").unwrap(), "CASPER");
		assert_eq!(
			reader.u256("amount"),
			Err(BytesreprError::EarlyEnd { field: "amount", needed: 3, remaining: 2 })
		);
	}

	#[test]
	fn integers_round_trip_through_the_reader() {
		let mut bytes = Vec::new();
		write_u32(&mut bytes, 7);
		write_big_uint(&mut bytes, U256::from(1_000_000_000_000u64));
		let mut reader = Reader::new(&bytes);
		assert_eq!(reader.u32("count").unwrap(), 7);
		assert_eq!(reader.u256("amount").unwrap(), U256::from(1_000_000_000_000u64));
		assert_eq!(reader.remaining(), 0);
	}

	#[test]
	fn invalid_utf8_and_oversized_integers() {
		let mut bytes = Vec::new();
		write_bytes(&mut bytes, &[0xff, 0xfe]);
		assert_eq!(
			Reader::new(&bytes).string("address"),
			Err(BytesreprError::InvalidUtf8 { field: "address" })
		);

		let mut big = vec![33u8];
		big.extend([1u8; 33]);
		assert_eq!(
			Reader::new(&big).u256("amount"),
			Err(BytesreprError::Overflow { field: "amount", len: 33 })
		);
	}
}
