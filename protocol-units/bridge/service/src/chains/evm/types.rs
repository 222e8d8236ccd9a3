use alloy::network::{Ethereum, EthereumWallet};
use alloy::primitives::Address;
use alloy::providers::fillers::{
	ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, WalletFiller,
};
use alloy::providers::RootProvider;
use alloy::transports::BoxTransport;
use bridge_util::ConnectorError;

pub const EVM_ADDRESS_LEN: usize = 20;

// Bindings for the deployed bridge contract.
alloy::sol!(
	#[allow(missing_docs)]
	#[sol(rpc)]
	contract Bridge {
		event BridgeFundsIn(
			address indexed sender,
			uint256 indexed nonce,
			address token,
			uint256 amount,
			uint256 stableCommissionPercent,
			uint256 gasCommission,
			string destinationChain,
			string destinationAddress
		);

		event BridgeFundsOut(
			address indexed recipient,
			address token,
			uint256 amount,
			uint256 transactionId,
			string sourceChain,
			string sourceAddress
		);

		function bridgeOut(
			address token,
			address recipient,
			uint256 amount,
			uint256 transactionId,
			string calldata sourceChain,
			string calldata sourceAddress
		) external;
	}
);

pub type AlloyProvider = FillProvider<
	JoinFill<
		JoinFill<
			JoinFill<JoinFill<alloy::providers::Identity, GasFiller>, NonceFiller>,
			ChainIdFiller,
		>,
		WalletFiller<EthereumWallet>,
	>,
	RootProvider<BoxTransport>,
	BoxTransport,
	Ethereum,
>;

/// Interprets raw bytes as a 20 byte account or contract address.
pub fn evm_address(bytes: &[u8]) -> Result<Address, ConnectorError> {
	if bytes.len() != EVM_ADDRESS_LEN {
		return Err(ConnectorError::InvalidArgument(format!(
			"expected a {EVM_ADDRESS_LEN} byte address, got {} bytes",
			bytes.len()
		)));
	}
	Ok(Address::from_slice(bytes))
}
