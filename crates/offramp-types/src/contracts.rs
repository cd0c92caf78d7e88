//! Solidity bindings for the contracts the pipeline talks to.
//!
//! These match the on-chain ABIs so calls encode and events decode exactly as
//! the deployed contracts expect.

use alloy_sol_types::sol;

sol! {
	/// Minimal ERC-20 surface: approval and balance reads.
	interface IERC20 {
		function approve(address spender, uint256 amount) external returns (bool);
		function balanceOf(address account) external view returns (uint256);
	}

	/// Gateway contract that accepts off-ramp orders.
	interface IGateway {
		/// Emitted once per created order.
		event OrderCreated(
			address indexed sender,
			address indexed token,
			uint256 indexed amount,
			uint256 protocolFee,
			bytes32 orderId,
			uint256 rate,
			string messageHash
		);

		function createOrder(
			address _token,
			uint256 _amount,
			uint96 _rate,
			address _senderFeeRecipient,
			uint256 _senderFee,
			address _refundAddress,
			string messageHash
		) external returns (bytes32 orderId);
	}

	/// One call inside a smart-account batch.
	struct SmartAccountCall {
		address target;
		uint256 value;
		bytes data;
	}

	/// Smart account executing a batch of calls in a single transaction.
	interface ISmartAccount {
		function executeBatch(SmartAccountCall[] calldata calls) external payable;
	}
}
