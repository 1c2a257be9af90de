//! Approve-then-act state machine
//!
//! One sequencer runs at most one sequence at a time. Every gated token is
//! approved (or found sufficient) before the router action is submitted, and
//! the first failure ends the sequence in `Error` with the failing step.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::allowance::AllowanceGate;
use crate::domain::amount::to_base_units;
use crate::domain::ledger::{AddLiquidityCall, Ledger, RemoveLiquidityCall, SwapCall};
use crate::shared::config::RouterConfig;
use crate::shared::errors::{
    AmountErrorKind, InvalidAmount, LedgerError, OperationStep, SequencerError,
};
use crate::shared::types::{Token, TxReceipt};
use super::{
    AddLiquidityRequest, OperationError, OperationKind, OperationReceipt, OperationRequest,
    OperationStatus, RemoveLiquidityRequest, SequencerState, SwapRequest,
};

/// A token that must be approved before the action, and the status shown while it is
struct ApprovalStep {
    token: Token,
    amount: U256,
    status: OperationStatus,
}

enum RouterAction {
    Swap(SwapCall),
    AddLiquidity(AddLiquidityCall),
    RemoveLiquidity(RemoveLiquidityCall),
}

/// Validated sequence, ready to run
struct SequencePlan {
    kind: OperationKind,
    approvals: Vec<ApprovalStep>,
    action: RouterAction,
}

/// Claim on the sequencer for one sequence.
///
/// Dropped while armed (the `execute` future was cancelled mid-flight), it
/// moves a still-running sequence to `Error` so the instance can be reused.
struct SequenceGuard<'a> {
    state: &'a watch::Sender<SequencerState>,
    sequence_id: Uuid,
    armed: bool,
}

impl SequenceGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for SequenceGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let sequence_id = self.sequence_id;
        self.state.send_if_modified(|state| {
            if state.sequence_id != Some(sequence_id) || state.status.accepts_start() {
                return false;
            }
            let step = match state.status {
                OperationStatus::Approving
                | OperationStatus::ApprovingTokenA
                | OperationStatus::ApprovingTokenB => OperationStep::Approval,
                _ => OperationStep::Execution,
            };
            warn!("[{}] Sequence abandoned while {}", sequence_id, state.status);
            state.error = Some(OperationError {
                step,
                message: format!("sequence abandoned while {}", state.status),
            });
            state.status = OperationStatus::Error;
            true
        });
    }
}

pub struct OperationSequencer {
    ledger: Arc<dyn Ledger>,
    gate: AllowanceGate,
    config: Arc<RouterConfig>,
    state: watch::Sender<SequencerState>,
}

impl OperationSequencer {
    pub fn new(ledger: Arc<dyn Ledger>, config: Arc<RouterConfig>) -> Self {
        let gate = AllowanceGate::new(ledger.clone(), config.clone());
        let (state, _) = watch::channel(SequencerState::default());
        Self {
            ledger,
            gate,
            config,
            state,
        }
    }

    /// Read-only view of status changes
    pub fn subscribe(&self) -> watch::Receiver<SequencerState> {
        self.state.subscribe()
    }

    pub fn status(&self) -> OperationStatus {
        self.state.borrow().status
    }

    pub fn last_error(&self) -> Option<OperationError> {
        self.state.borrow().error.clone()
    }

    /// Return to `Idle` and clear the last error.
    ///
    /// Returns `false`, leaving the state untouched, while a sequence is in flight.
    pub fn reset(&self) -> bool {
        let mut applied = false;
        self.state.send_if_modified(|state| {
            if !state.status.accepts_start() {
                return false;
            }
            applied = true;
            let changed = *state != SequencerState::default();
            *state = SequencerState::default();
            changed
        });
        applied
    }

    /// Run one full approve-then-act sequence for `account`.
    ///
    /// Rejected with [`SequencerError::OperationInProgress`] unless the
    /// sequencer is `Idle` or `Error`. Input is then validated before anything
    /// touches the ledger or the state. Dropping the returned future mid-flight
    /// leaves the sequencer in `Error`.
    pub async fn execute(
        &self,
        account: Address,
        request: OperationRequest,
    ) -> Result<OperationReceipt, SequencerError> {
        let current = self.status();
        if !current.accepts_start() {
            warn!("Rejected new operation: sequencer is {}", current);
            return Err(SequencerError::OperationInProgress(current));
        }
        let plan = self.prepare(account, &request)?;
        let first_status = plan
            .approvals
            .first()
            .map(|step| step.status)
            .unwrap_or(OperationStatus::Approved);
        let guard = self.begin(first_status)?;
        let sequence_id = guard.sequence_id;

        info!(
            "[{}] Starting {} for {} ({} token approval(s) to check)",
            sequence_id,
            plan.kind,
            account,
            plan.approvals.len()
        );

        let mut approvals = Vec::with_capacity(plan.approvals.len());
        for step in &plan.approvals {
            self.transition(step.status);
            match self
                .gate
                .ensure_router_allowance(&step.token, account, step.amount)
                .await
            {
                Ok(outcome) => approvals.push(outcome),
                Err(err) => {
                    let err = self.fail(sequence_id, err.into());
                    guard.disarm();
                    return Err(err);
                }
            }
        }
        self.transition(OperationStatus::Approved);

        self.transition(OperationStatus::Executing);
        info!("[{}] Submitting {} to router {}", sequence_id, plan.kind, self.config.router);
        let action = match self.submit(account, plan.action).await {
            Ok(receipt) => receipt,
            Err(err) => {
                let err = self.fail(sequence_id, SequencerError::ExecutionRejected(err.to_string()));
                guard.disarm();
                return Err(err);
            }
        };

        self.transition(OperationStatus::Completed);
        info!("[{}] ✅ {} confirmed: {}", sequence_id, plan.kind, action.tx_hash);
        self.state.send_modify(|state| *state = SequencerState::default());
        guard.disarm();

        Ok(OperationReceipt {
            sequence_id,
            kind: plan.kind,
            approvals,
            action,
        })
    }

    /// Atomically claim the sequencer, clearing any previous error.
    fn begin(&self, status: OperationStatus) -> Result<SequenceGuard<'_>, SequencerError> {
        let sequence_id = Uuid::new_v4();
        let mut busy = None;
        self.state.send_if_modified(|state| {
            if !state.status.accepts_start() {
                busy = Some(state.status);
                return false;
            }
            *state = SequencerState {
                status,
                error: None,
                sequence_id: Some(sequence_id),
            };
            true
        });

        match busy {
            Some(current) => {
                warn!("Rejected new operation: sequencer is {}", current);
                Err(SequencerError::OperationInProgress(current))
            }
            None => Ok(SequenceGuard {
                state: &self.state,
                sequence_id,
                armed: true,
            }),
        }
    }

    fn transition(&self, status: OperationStatus) {
        self.state.send_if_modified(|state| {
            if state.status == status {
                return false;
            }
            state.status = status;
            true
        });
    }

    fn fail(&self, sequence_id: Uuid, err: SequencerError) -> SequencerError {
        error!("[{}] ❌ Sequence failed at {} step: {}", sequence_id, err.step().as_str(), err);
        let record = OperationError {
            step: err.step(),
            message: err.to_string(),
        };
        self.state.send_modify(|state| {
            state.status = OperationStatus::Error;
            state.error = Some(record);
        });
        err
    }

    async fn submit(&self, account: Address, action: RouterAction) -> Result<TxReceipt, LedgerError> {
        let router = self.config.router;
        match action {
            RouterAction::Swap(call) => {
                self.ledger
                    .swap_exact_tokens_for_tokens(account, router, call)
                    .await
            }
            RouterAction::AddLiquidity(call) => self.ledger.add_liquidity(account, router, call).await,
            RouterAction::RemoveLiquidity(call) => {
                self.ledger.remove_liquidity(account, router, call).await
            }
        }
    }

    fn prepare(&self, account: Address, request: &OperationRequest) -> Result<SequencePlan, SequencerError> {
        if account.is_zero() {
            return Err(SequencerError::InvalidRequest(
                "active account is the zero address".to_string(),
            ));
        }
        match request {
            OperationRequest::Swap(req) => self.prepare_swap(account, req),
            OperationRequest::AddLiquidity(req) => self.prepare_add_liquidity(account, req),
            OperationRequest::RemoveLiquidity(req) => self.prepare_remove_liquidity(account, req),
        }
    }

    fn prepare_swap(&self, account: Address, req: &SwapRequest) -> Result<SequencePlan, SequencerError> {
        ensure_distinct(&[&req.token_in, &req.token_out])?;
        let amount_in = positive_base_units(&req.amount_in, &req.token_in)?;
        let amount_out_min = to_base_units(&req.amount_out_min, req.token_out.decimals)?;

        Ok(SequencePlan {
            kind: OperationKind::Swap,
            approvals: vec![ApprovalStep {
                token: req.token_in.clone(),
                amount: amount_in,
                status: OperationStatus::Approving,
            }],
            action: RouterAction::Swap(SwapCall {
                amount_in,
                amount_out_min,
                path: vec![req.token_in.address, req.token_out.address],
                to: account,
            }),
        })
    }

    fn prepare_add_liquidity(
        &self,
        account: Address,
        req: &AddLiquidityRequest,
    ) -> Result<SequencePlan, SequencerError> {
        ensure_distinct(&[&req.token_a, &req.token_b])?;
        let amount_a_desired = positive_base_units(&req.amount_a_desired, &req.token_a)?;
        let amount_b_desired = positive_base_units(&req.amount_b_desired, &req.token_b)?;
        let amount_a_min = to_base_units(&req.amount_a_min, req.token_a.decimals)?;
        let amount_b_min = to_base_units(&req.amount_b_min, req.token_b.decimals)?;

        Ok(SequencePlan {
            kind: OperationKind::AddLiquidity,
            approvals: vec![
                ApprovalStep {
                    token: req.token_a.clone(),
                    amount: amount_a_desired,
                    status: OperationStatus::ApprovingTokenA,
                },
                ApprovalStep {
                    token: req.token_b.clone(),
                    amount: amount_b_desired,
                    status: OperationStatus::ApprovingTokenB,
                },
            ],
            action: RouterAction::AddLiquidity(AddLiquidityCall {
                token_a: req.token_a.address,
                token_b: req.token_b.address,
                amount_a_desired,
                amount_b_desired,
                amount_a_min,
                amount_b_min,
                to: account,
            }),
        })
    }

    fn prepare_remove_liquidity(
        &self,
        account: Address,
        req: &RemoveLiquidityRequest,
    ) -> Result<SequencePlan, SequencerError> {
        if !req.fraction.is_valid() {
            return Err(InvalidAmount::new(
                format!("{} bps", req.fraction.bps()),
                AmountErrorKind::FractionOutOfRange,
            )
            .into());
        }
        ensure_distinct(&[&req.token_a, &req.token_b, &req.position])?;

        let position = to_base_units(&req.position_amount, req.position.decimals)?;
        let liquidity = req.fraction.apply(position);
        if liquidity.is_zero() {
            return Err(InvalidAmount::new(
                format!("{} of {}", req.fraction, req.position_amount),
                AmountErrorKind::Zero,
            )
            .into());
        }
        let amount_a_min = to_base_units(&req.amount_a_min, req.token_a.decimals)?;
        let amount_b_min = to_base_units(&req.amount_b_min, req.token_b.decimals)?;

        let deadline = (chrono::Utc::now().timestamp().max(0) as u64)
            .saturating_add(self.config.deadline_secs);

        Ok(SequencePlan {
            kind: OperationKind::RemoveLiquidity,
            approvals: vec![ApprovalStep {
                token: req.position.clone(),
                amount: liquidity,
                status: OperationStatus::Approving,
            }],
            action: RouterAction::RemoveLiquidity(RemoveLiquidityCall {
                token_a: req.token_a.address,
                token_b: req.token_b.address,
                liquidity,
                amount_a_min,
                amount_b_min,
                to: account,
                deadline: U256::from(deadline),
            }),
        })
    }
}

fn positive_base_units(display: &str, token: &Token) -> Result<U256, SequencerError> {
    let value = to_base_units(display, token.decimals)?;
    if value.is_zero() {
        return Err(InvalidAmount::new(display, AmountErrorKind::Zero).into());
    }
    Ok(value)
}

fn ensure_distinct(tokens: &[&Token]) -> Result<(), SequencerError> {
    for (i, token) in tokens.iter().enumerate() {
        if token.address.is_zero() {
            return Err(SequencerError::InvalidRequest(format!(
                "token {} has no address",
                token.symbol
            )));
        }
        if tokens[..i].iter().any(|other| other.address == token.address) {
            return Err(SequencerError::InvalidRequest(format!(
                "token {} appears more than once",
                token.address
            )));
        }
    }
    Ok(())
}
