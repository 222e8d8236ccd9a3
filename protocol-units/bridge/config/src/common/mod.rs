pub mod bridge;
pub mod casper;
pub mod database;
pub mod evm;
pub mod key_store;

pub const DEFAULT_SIGNATURE_VALIDITY_SECS: u64 = 60 * 60;
pub const DEFAULT_FEE_PERCENTAGE: &str = "0";
pub const DEFAULT_ESTIMATED_CONFIRMATION: u32 = 1;
