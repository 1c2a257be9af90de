//! Ledger domain - the external chain that holds tokens, allowances and the router

mod ledger_interface;

pub use ledger_interface::Ledger;

use alloy_primitives::{Address, U256};

/// Arguments of the router's `addLiquidity`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddLiquidityCall {
    pub token_a: Address,
    pub token_b: Address,
    pub amount_a_desired: U256,
    pub amount_b_desired: U256,
    pub amount_a_min: U256,
    pub amount_b_min: U256,
    pub to: Address,
}

/// Arguments of the router's `swapExactTokensForTokens`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapCall {
    pub amount_in: U256,
    pub amount_out_min: U256,
    pub path: Vec<Address>,
    pub to: Address,
}

/// Arguments of the router's `removeLiquidity`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveLiquidityCall {
    pub token_a: Address,
    pub token_b: Address,
    pub liquidity: U256,
    pub amount_a_min: U256,
    pub amount_b_min: U256,
    pub to: Address,
    /// Unix timestamp after which the router refuses the call
    pub deadline: U256,
}
