//! Ledger interface trait

use alloy_primitives::{Address, U256};
use async_trait::async_trait;

use crate::shared::errors::LedgerError;
use crate::shared::types::TxReceipt;
use super::{AddLiquidityCall, RemoveLiquidityCall, SwapCall};

/// Read and write access to the chain on behalf of an account.
///
/// Reads are idempotent. Every write is a new transaction; implementations
/// resolve only once the ledger has accepted it and must report a revert as
/// an error rather than a receipt.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Amount of `token` that `spender` may move on behalf of `owner`.
    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, LedgerError>;

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, LedgerError>;

    /// Router price preview. Display only, never a slippage bound.
    async fn get_amount_out(
        &self,
        router: Address,
        amount_in: U256,
        token_in: Address,
        token_out: Address,
    ) -> Result<U256, LedgerError>;

    /// Pair (liquidity-position token) for two tokens, `None` if the factory has none.
    async fn get_pair(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
    ) -> Result<Option<Address>, LedgerError>;

    /// ERC-20 `approve(spender, amount)` signed by `owner`.
    async fn approve(
        &self,
        owner: Address,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxReceipt, LedgerError>;

    async fn add_liquidity(
        &self,
        owner: Address,
        router: Address,
        call: AddLiquidityCall,
    ) -> Result<TxReceipt, LedgerError>;

    async fn swap_exact_tokens_for_tokens(
        &self,
        owner: Address,
        router: Address,
        call: SwapCall,
    ) -> Result<TxReceipt, LedgerError>;

    async fn remove_liquidity(
        &self,
        owner: Address,
        router: Address,
        call: RemoveLiquidityCall,
    ) -> Result<TxReceipt, LedgerError>;
}
