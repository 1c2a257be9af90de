//! Conditional ERC-20 approval in front of router actions

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use tracing::{debug, info, warn};

use crate::domain::ledger::Ledger;
use crate::shared::config::RouterConfig;
use crate::shared::errors::AllowanceError;
use crate::shared::types::{Token, TxReceipt};

/// Result of an allowance check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalOutcome {
    pub token: Address,
    /// Whether an approval transaction was submitted
    pub did_approve: bool,
    /// Allowance observed before any approval
    pub current_allowance: U256,
    pub approval_tx: Option<TxReceipt>,
}

/// Makes sure the spender may move the required amount before an action runs.
///
/// The allowance is read fresh on every call; nothing is cached between
/// sequences. No retries happen here.
pub struct AllowanceGate {
    ledger: Arc<dyn Ledger>,
    config: Arc<RouterConfig>,
}

impl AllowanceGate {
    pub fn new(ledger: Arc<dyn Ledger>, config: Arc<RouterConfig>) -> Self {
        Self { ledger, config }
    }

    /// Ensure the configured router may spend `required` of `token` for `owner`.
    pub async fn ensure_router_allowance(
        &self,
        token: &Token,
        owner: Address,
        required: U256,
    ) -> Result<ApprovalOutcome, AllowanceError> {
        self.ensure_allowance(token, owner, self.config.router, required)
            .await
    }

    /// Read the current allowance and approve exactly `required` if it falls short.
    ///
    /// The approval requests exactly `required`: not unlimited, not added to
    /// the existing allowance.
    pub async fn ensure_allowance(
        &self,
        token: &Token,
        owner: Address,
        spender: Address,
        required: U256,
    ) -> Result<ApprovalOutcome, AllowanceError> {
        let current = self
            .ledger
            .allowance(token.address, owner, spender)
            .await
            .map_err(|source| {
                warn!("Allowance read failed for {}: {}", token.symbol, source);
                AllowanceError::ReadFailed {
                    token: token.address,
                    source,
                }
            })?;

        debug!(
            "Allowance {} -> {} for {}: current={} required={}",
            owner, spender, token.symbol, current, required
        );

        if current >= required {
            debug!("Sufficient allowance for {}, skipping approval", token.symbol);
            return Ok(ApprovalOutcome {
                token: token.address,
                did_approve: false,
                current_allowance: current,
                approval_tx: None,
            });
        }

        info!(
            "Approving {} {} for spender {}",
            crate::domain::amount::to_display(required, token.decimals),
            token.symbol,
            spender
        );

        let receipt = self
            .ledger
            .approve(owner, token.address, spender, required)
            .await
            .map_err(|source| {
                warn!("Approval of {} failed: {}", token.symbol, source);
                AllowanceError::ApprovalRejected {
                    token: token.address,
                    source,
                }
            })?;

        info!("✅ Approval of {} confirmed: {}", token.symbol, receipt.tx_hash);

        Ok(ApprovalOutcome {
            token: token.address,
            did_approve: true,
            current_allowance: current,
            approval_tx: Some(receipt),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::errors::LedgerError;
    use crate::testing::{test_config, token_a, LedgerCall, ScriptedLedger, OWNER};

    fn gate(ledger: &Arc<ScriptedLedger>) -> AllowanceGate {
        AllowanceGate::new(ledger.clone(), Arc::new(test_config()))
    }

    #[tokio::test]
    async fn test_sufficient_allowance_submits_nothing() {
        let token = token_a();
        let ledger = Arc::new(ScriptedLedger::new().with_allowance(token.address, U256::from(1000u64)));

        let outcome = gate(&ledger)
            .ensure_router_allowance(&token, OWNER, U256::from(1000u64))
            .await
            .unwrap();

        assert!(!outcome.did_approve);
        assert_eq!(outcome.current_allowance, U256::from(1000u64));
        assert!(outcome.approval_tx.is_none());
        assert!(ledger.approvals().is_empty());
    }

    #[tokio::test]
    async fn test_insufficient_allowance_approves_exact_amount() {
        let token = token_a();
        let ledger = Arc::new(ScriptedLedger::new().with_allowance(token.address, U256::from(500u64)));

        let outcome = gate(&ledger)
            .ensure_router_allowance(&token, OWNER, U256::from(1000u64))
            .await
            .unwrap();

        assert!(outcome.did_approve);
        assert!(outcome.approval_tx.is_some());
        assert_eq!(
            ledger.approvals(),
            vec![(token.address, test_config().router, U256::from(1000u64))]
        );
    }

    #[tokio::test]
    async fn test_missing_allowance_approves_once() {
        let token = token_a();
        let ledger = Arc::new(ScriptedLedger::new());

        gate(&ledger)
            .ensure_router_allowance(&token, OWNER, U256::from(7u8))
            .await
            .unwrap();

        assert_eq!(ledger.approvals().len(), 1);
        assert_eq!(
            ledger.calls()[0],
            LedgerCall::Allowance {
                token: token.address,
                owner: OWNER,
                spender: test_config().router,
            }
        );
    }

    #[tokio::test]
    async fn test_read_failure_is_surfaced_without_approval() {
        let token = token_a();
        let ledger = Arc::new(
            ScriptedLedger::new()
                .failing_allowance_read(token.address, LedgerError::Transport("connection reset".into())),
        );

        let err = gate(&ledger)
            .ensure_router_allowance(&token, OWNER, U256::from(1u8))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            AllowanceError::ReadFailed {
                token: token.address,
                source: LedgerError::Transport("connection reset".into()),
            }
        );
        assert!(ledger.approvals().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_approval_is_surfaced() {
        let token = token_a();
        let ledger = Arc::new(ScriptedLedger::new().rejecting_approval(token.address));

        let err = gate(&ledger)
            .ensure_router_allowance(&token, OWNER, U256::from(1u8))
            .await
            .unwrap_err();

        assert!(matches!(err, AllowanceError::ApprovalRejected { token: t, .. } if t == token.address));
    }

    #[tokio::test]
    async fn test_rechecking_after_approval_is_a_no_op() {
        let token = token_a();
        let ledger = Arc::new(ScriptedLedger::new());
        let gate = gate(&ledger);

        gate.ensure_router_allowance(&token, OWNER, U256::from(10u8)).await.unwrap();
        let second = gate.ensure_router_allowance(&token, OWNER, U256::from(10u8)).await.unwrap();

        assert!(!second.did_approve);
        assert_eq!(ledger.approvals().len(), 1);
    }
}
