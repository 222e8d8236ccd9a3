pub mod client;
pub mod connector;
pub mod event_monitoring;
pub mod signatures;
pub mod signer;
pub mod types;

pub use client::{AlloyRpc, EvmRpc};
pub use connector::EvmConnector;
