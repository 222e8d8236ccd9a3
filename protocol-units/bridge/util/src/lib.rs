pub mod chains;
pub mod events;
pub mod networks;
pub mod signature;
pub mod types;

pub use crate::chains::connector::Connector;
pub use crate::chains::connector::ConnectorError;
pub use crate::chains::connector::ConnectorResult;
pub use crate::chains::subscriber::EventPublisher;
pub use crate::chains::subscriber::EventSubscriber;
pub use crate::events::EventVariant;
pub use crate::events::FundsIn;
pub use crate::events::FundsOut;
pub use crate::events::TransactionInfo;
pub use crate::networks::Network;
pub use crate::networks::NetworkAddress;
pub use crate::networks::NetworkError;
pub use crate::networks::NetworkType;
pub use crate::types::TransferStatus;
