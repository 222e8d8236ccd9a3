//! Casper adapter: block replay over JSON-RPC, live deploys over the node's
//! event stream, `bridge_out` deploys and contract authorisations.

pub mod bytesrepr;
pub mod connector;
pub mod deploy;
pub mod events;
pub mod rpc;
pub mod signatures;
pub mod sse;

pub use connector::CasperConnector;
pub use rpc::{CasperRpc, HttpCasperRpc};
