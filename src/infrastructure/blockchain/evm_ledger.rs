//! Ledger implementation backed by an EVM JSON-RPC node

use std::time::Duration;

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::domain::ledger::{AddLiquidityCall, Ledger, RemoveLiquidityCall, SwapCall};
use crate::shared::errors::LedgerError;
use crate::shared::types::{TxHash, TxReceipt};
use super::contracts::{IPairFactory, IPoolRouter, IERC20};
use super::rpc_client::JsonRpcClient;

/// Receipt polling configuration
#[derive(Debug, Clone)]
pub struct ConfirmationConfig {
    pub poll_interval: Duration,
    /// `None` waits for as long as the node takes
    pub timeout: Option<Duration>,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            timeout: None,
        }
    }
}

/// Reads via `eth_call`, writes via `eth_sendTransaction` + receipt polling
pub struct EvmLedger {
    rpc: JsonRpcClient,
    confirmation: ConfirmationConfig,
}

impl EvmLedger {
    pub fn new(rpc_url: impl Into<String>, confirmation: ConfirmationConfig) -> Self {
        Self {
            rpc: JsonRpcClient::new(rpc_url),
            confirmation,
        }
    }

    async fn view<C: SolCall>(&self, to: Address, call: C) -> Result<C::Return, LedgerError> {
        let data = call.abi_encode();
        let bytes = self.rpc.eth_call(to, &data).await?;
        C::abi_decode_returns(&bytes)
            .map_err(|e| LedgerError::Decode(format!("{} returned bad data: {}", C::SIGNATURE, e)))
    }

    async fn transact<C: SolCall>(
        &self,
        from: Address,
        to: Address,
        call: C,
    ) -> Result<TxReceipt, LedgerError> {
        let data = call.abi_encode();
        let tx_hash = self.rpc.send_transaction(from, to, &data).await?;
        info!("📤 {} sent: {}", C::SIGNATURE, tx_hash);

        match self.confirmation.timeout {
            Some(limit) => tokio::time::timeout(limit, self.wait_for_receipt(tx_hash))
                .await
                .map_err(|_| LedgerError::Timeout(tx_hash))?,
            None => self.wait_for_receipt(tx_hash).await,
        }
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt, LedgerError> {
        let mut interval = tokio::time::interval(self.confirmation.poll_interval);
        loop {
            interval.tick().await;
            match self.rpc.get_transaction_receipt(tx_hash).await? {
                Some(receipt) if receipt.succeeded() => {
                    let receipt = receipt.into_receipt();
                    info!(
                        "✅ Transaction {} included in block {:?}",
                        tx_hash, receipt.block_number
                    );
                    return Ok(receipt);
                }
                Some(_) => {
                    warn!("❌ Transaction {} reverted", tx_hash);
                    return Err(LedgerError::Reverted { tx_hash });
                }
                None => debug!("Transaction {} still pending", tx_hash),
            }
        }
    }
}

#[async_trait]
impl Ledger for EvmLedger {
    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, LedgerError> {
        self.view(token, IERC20::allowanceCall { owner, spender })
            .await
    }

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, LedgerError> {
        self.view(token, IERC20::balanceOfCall { owner }).await
    }

    async fn get_amount_out(
        &self,
        router: Address,
        amount_in: U256,
        token_in: Address,
        token_out: Address,
    ) -> Result<U256, LedgerError> {
        self.view(
            router,
            IPoolRouter::getAmountOutCall {
                amountIn: amount_in,
                tokenIn: token_in,
                tokenOut: token_out,
            },
        )
        .await
    }

    async fn get_pair(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
    ) -> Result<Option<Address>, LedgerError> {
        let pair = self
            .view(
                factory,
                IPairFactory::getPairCall {
                    tokenA: token_a,
                    tokenB: token_b,
                },
            )
            .await?;
        Ok((!pair.is_zero()).then_some(pair))
    }

    async fn approve(
        &self,
        owner: Address,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxReceipt, LedgerError> {
        self.transact(owner, token, IERC20::approveCall { spender, amount })
            .await
    }

    async fn add_liquidity(
        &self,
        owner: Address,
        router: Address,
        call: AddLiquidityCall,
    ) -> Result<TxReceipt, LedgerError> {
        self.transact(
            owner,
            router,
            IPoolRouter::addLiquidityCall {
                tokenA: call.token_a,
                tokenB: call.token_b,
                amountADesired: call.amount_a_desired,
                amountBDesired: call.amount_b_desired,
                amountAMin: call.amount_a_min,
                amountBMin: call.amount_b_min,
                to: call.to,
            },
        )
        .await
    }

    async fn swap_exact_tokens_for_tokens(
        &self,
        owner: Address,
        router: Address,
        call: SwapCall,
    ) -> Result<TxReceipt, LedgerError> {
        self.transact(
            owner,
            router,
            IPoolRouter::swapExactTokensForTokensCall {
                amountIn: call.amount_in,
                amountOutMin: call.amount_out_min,
                path: call.path,
                to: call.to,
            },
        )
        .await
    }

    async fn remove_liquidity(
        &self,
        owner: Address,
        router: Address,
        call: RemoveLiquidityCall,
    ) -> Result<TxReceipt, LedgerError> {
        self.transact(
            owner,
            router,
            IPoolRouter::removeLiquidityCall {
                tokenA: call.token_a,
                tokenB: call.token_b,
                liquidity: call.liquidity,
                amountAMin: call.amount_a_min,
                amountBMin: call.amount_b_min,
                to: call.to,
                deadline: call.deadline,
            },
        )
        .await
    }
}
