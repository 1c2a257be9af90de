//! Test doubles: a scripted ledger and a fixed token set

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use alloy_primitives::{address, Address, B256, U256};
use async_trait::async_trait;
use tokio::sync::Notify;

use crate::domain::ledger::{AddLiquidityCall, Ledger, RemoveLiquidityCall, SwapCall};
use crate::shared::config::RouterConfig;
use crate::shared::errors::LedgerError;
use crate::shared::types::{Token, TxHash, TxReceipt};

pub const OWNER: Address = address!("00000000000000000000000000000000000000aa");
pub const ROUTER: Address = address!("37c44edadc5a4296ab502df231a938276c97d46c");
pub const FACTORY: Address = address!("bbeb32ca887288fb8a1e0ac5f547b598f8b14e10");

pub fn token_a() -> Token {
    Token::new(address!("1b534ed99500c2cf49f6c2574b2adaff497aef7c"), "TKNA", 18)
}

/// Six decimals, so scaling differences between the two sides show up
pub fn token_b() -> Token {
    Token::new(address!("db68629086f858e119e4e4d61745780d50bc1368"), "TKNB", 6)
}

pub fn lp_token() -> Token {
    Token::new(address!("00000000000000000000000000000000000000cc"), "TKNA-TKNB-LP", 18)
}

pub fn test_config() -> RouterConfig {
    RouterConfig {
        router: ROUTER,
        factory: Some(FACTORY),
        tokens: vec![token_a(), token_b()],
        deadline_secs: 1200,
        display_decimals: 6,
    }
}

pub fn tx_hash(n: u64) -> TxHash {
    TxHash(B256::left_padding_from(&n.to_be_bytes()))
}

/// Every call the ledger saw, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    Allowance {
        token: Address,
        owner: Address,
        spender: Address,
    },
    BalanceOf {
        token: Address,
        owner: Address,
    },
    GetAmountOut {
        amount_in: U256,
        token_in: Address,
        token_out: Address,
    },
    GetPair {
        token_a: Address,
        token_b: Address,
    },
    Approve {
        owner: Address,
        token: Address,
        spender: Address,
        amount: U256,
    },
    AddLiquidity(AddLiquidityCall),
    Swap(SwapCall),
    RemoveLiquidity(RemoveLiquidityCall),
}

/// In-memory ledger with scripted reads and outcomes.
///
/// Successful approvals overwrite the stored allowance, like ERC-20 `approve`.
#[derive(Default)]
pub struct ScriptedLedger {
    allowances: Mutex<HashMap<Address, U256>>,
    failing_reads: Mutex<HashMap<Address, LedgerError>>,
    rejected_approvals: Mutex<Vec<Address>>,
    action_failure: Mutex<Option<LedgerError>>,
    balances: Mutex<HashMap<Address, U256>>,
    amount_out: Mutex<Option<U256>>,
    pairs: Mutex<HashMap<(Address, Address), Address>>,
    approval_hold: Mutex<Option<Arc<Notify>>>,
    calls: Mutex<Vec<LedgerCall>>,
    next_tx: AtomicU64,
}

impl ScriptedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allowance(self, token: Address, amount: U256) -> Self {
        self.allowances.lock().unwrap().insert(token, amount);
        self
    }

    pub fn failing_allowance_read(self, token: Address, err: LedgerError) -> Self {
        self.failing_reads.lock().unwrap().insert(token, err);
        self
    }

    pub fn rejecting_approval(self, token: Address) -> Self {
        self.rejected_approvals.lock().unwrap().push(token);
        self
    }

    pub fn rejecting_actions(self, err: LedgerError) -> Self {
        *self.action_failure.lock().unwrap() = Some(err);
        self
    }

    pub fn with_balance(self, token: Address, amount: U256) -> Self {
        self.balances.lock().unwrap().insert(token, amount);
        self
    }

    pub fn with_amount_out(self, amount: U256) -> Self {
        *self.amount_out.lock().unwrap() = Some(amount);
        self
    }

    pub fn with_pair(self, token_a: Address, token_b: Address, pair: Address) -> Self {
        self.pairs.lock().unwrap().insert((token_a, token_b), pair);
        self
    }

    pub fn clear_action_failure(&self) {
        *self.action_failure.lock().unwrap() = None;
    }

    /// Park every approval until the returned handle is notified
    pub fn hold_approvals(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.approval_hold.lock().unwrap() = Some(notify.clone());
        notify
    }

    pub fn calls(&self) -> Vec<LedgerCall> {
        self.calls.lock().unwrap().clone()
    }

    /// (token, spender, amount) of every approval submitted
    pub fn approvals(&self) -> Vec<(Address, Address, U256)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                LedgerCall::Approve {
                    token,
                    spender,
                    amount,
                    ..
                } => Some((token, spender, amount)),
                _ => None,
            })
            .collect()
    }

    pub fn action_calls(&self) -> Vec<LedgerCall> {
        self.calls()
            .into_iter()
            .filter(|call| {
                matches!(
                    call,
                    LedgerCall::AddLiquidity(_) | LedgerCall::Swap(_) | LedgerCall::RemoveLiquidity(_)
                )
            })
            .collect()
    }

    pub fn current_allowance(&self, token: Address) -> U256 {
        self.allowances
            .lock()
            .unwrap()
            .get(&token)
            .copied()
            .unwrap_or_default()
    }

    fn record(&self, call: LedgerCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn receipt(&self) -> TxReceipt {
        let n = self.next_tx.fetch_add(1, Ordering::SeqCst) + 1;
        TxReceipt {
            tx_hash: tx_hash(n),
            block_number: Some(n),
            gas_used: Some(21_000),
        }
    }

    fn action_outcome(&self) -> Result<TxReceipt, LedgerError> {
        match self.action_failure.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(self.receipt()),
        }
    }
}

#[async_trait]
impl Ledger for ScriptedLedger {
    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, LedgerError> {
        self.record(LedgerCall::Allowance {
            token,
            owner,
            spender,
        });
        if let Some(err) = self.failing_reads.lock().unwrap().get(&token) {
            return Err(err.clone());
        }
        Ok(self.current_allowance(token))
    }

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, LedgerError> {
        self.record(LedgerCall::BalanceOf { token, owner });
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(&token)
            .copied()
            .unwrap_or_default())
    }

    async fn get_amount_out(
        &self,
        _router: Address,
        amount_in: U256,
        token_in: Address,
        token_out: Address,
    ) -> Result<U256, LedgerError> {
        self.record(LedgerCall::GetAmountOut {
            amount_in,
            token_in,
            token_out,
        });
        (*self.amount_out.lock().unwrap())
            .ok_or_else(|| LedgerError::Rpc {
                code: 3,
                message: "execution reverted: INSUFFICIENT_LIQUIDITY".to_string(),
            })
    }

    async fn get_pair(
        &self,
        _factory: Address,
        token_a: Address,
        token_b: Address,
    ) -> Result<Option<Address>, LedgerError> {
        self.record(LedgerCall::GetPair { token_a, token_b });
        let pairs = self.pairs.lock().unwrap();
        Ok(pairs
            .get(&(token_a, token_b))
            .or_else(|| pairs.get(&(token_b, token_a)))
            .copied())
    }

    async fn approve(
        &self,
        owner: Address,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxReceipt, LedgerError> {
        self.record(LedgerCall::Approve {
            owner,
            token,
            spender,
            amount,
        });
        let hold = self.approval_hold.lock().unwrap().clone();
        if let Some(notify) = hold {
            notify.notified().await;
        }
        if self.rejected_approvals.lock().unwrap().contains(&token) {
            return Err(LedgerError::Rejected("User rejected the request".to_string()));
        }
        self.allowances.lock().unwrap().insert(token, amount);
        Ok(self.receipt())
    }

    async fn add_liquidity(
        &self,
        _owner: Address,
        _router: Address,
        call: AddLiquidityCall,
    ) -> Result<TxReceipt, LedgerError> {
        self.record(LedgerCall::AddLiquidity(call));
        self.action_outcome()
    }

    async fn swap_exact_tokens_for_tokens(
        &self,
        _owner: Address,
        _router: Address,
        call: SwapCall,
    ) -> Result<TxReceipt, LedgerError> {
        self.record(LedgerCall::Swap(call));
        self.action_outcome()
    }

    async fn remove_liquidity(
        &self,
        _owner: Address,
        _router: Address,
        call: RemoveLiquidityCall,
    ) -> Result<TxReceipt, LedgerError> {
        self.record(LedgerCall::RemoveLiquidity(call));
        self.action_outcome()
    }
}
