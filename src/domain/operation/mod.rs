//! Operation domain - approve-then-act sequences against the router

mod sequencer;

pub use sequencer::OperationSequencer;

use std::fmt;

use alloy_primitives::U256;
use uuid::Uuid;

use crate::domain::allowance::ApprovalOutcome;
use crate::shared::errors::OperationStep;
use crate::shared::types::{Token, TxReceipt};

/// Router action a sequence ends with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Swap,
    AddLiquidity,
    RemoveLiquidity,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Swap => "swap",
            OperationKind::AddLiquidity => "add-liquidity",
            OperationKind::RemoveLiquidity => "remove-liquidity",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step a sequencer is currently in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OperationStatus {
    #[default]
    Idle,
    /// Single-token approval (swap, remove-liquidity)
    Approving,
    ApprovingTokenA,
    ApprovingTokenB,
    Approved,
    Executing,
    Completed,
    Error,
}

impl OperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Idle => "Idle",
            OperationStatus::Approving => "Approving",
            OperationStatus::ApprovingTokenA => "ApprovingTokenA",
            OperationStatus::ApprovingTokenB => "ApprovingTokenB",
            OperationStatus::Approved => "Approved",
            OperationStatus::Executing => "Executing",
            OperationStatus::Completed => "Completed",
            OperationStatus::Error => "Error",
        }
    }

    /// A new sequence may start from this status
    pub fn accepts_start(&self) -> bool {
        matches!(self, OperationStatus::Idle | OperationStatus::Error)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure recorded by the last sequence, tagged with the step that failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationError {
    pub step: OperationStep,
    pub message: String,
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.step.as_str(), self.message)
    }
}

/// Observable sequencer state. Only the sequencer mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SequencerState {
    pub status: OperationStatus,
    pub error: Option<OperationError>,
    pub sequence_id: Option<Uuid>,
}

/// Share of a liquidity position to withdraw, in basis points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawalFraction(u16);

impl WithdrawalFraction {
    pub const FULL: WithdrawalFraction = WithdrawalFraction(10_000);

    /// Not validated here; the sequencer rejects 0 and anything above 10000.
    pub fn from_bps(bps: u16) -> Self {
        Self(bps)
    }

    pub fn from_percent(percent: u8) -> Self {
        Self(u16::from(percent) * 100)
    }

    pub fn bps(&self) -> u16 {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        (1..=10_000).contains(&self.0)
    }

    /// `amount * bps / 10000`, rounded down, without intermediate overflow.
    pub fn apply(&self, amount: U256) -> U256 {
        let bps = U256::from(self.0);
        let denom = U256::from(10_000u16);
        let whole = amount / denom;
        let rest = amount % denom;
        whole * bps + rest * bps / denom
    }
}

impl fmt::Display for WithdrawalFraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

/// Exact-input swap along `token_in -> token_out`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    pub token_in: Token,
    pub token_out: Token,
    pub amount_in: String,
    /// Explicit lower bound on the output; quotes are never used for this.
    pub amount_out_min: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddLiquidityRequest {
    pub token_a: Token,
    pub token_b: Token,
    pub amount_a_desired: String,
    pub amount_b_desired: String,
    pub amount_a_min: String,
    pub amount_b_min: String,
}

/// Withdraw a fraction of a liquidity position back into its two tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveLiquidityRequest {
    pub token_a: Token,
    pub token_b: Token,
    /// Liquidity-position token of the pair
    pub position: Token,
    /// Position size the fraction applies to
    pub position_amount: String,
    pub fraction: WithdrawalFraction,
    pub amount_a_min: String,
    pub amount_b_min: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationRequest {
    Swap(SwapRequest),
    AddLiquidity(AddLiquidityRequest),
    RemoveLiquidity(RemoveLiquidityRequest),
}

impl OperationRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationRequest::Swap(_) => OperationKind::Swap,
            OperationRequest::AddLiquidity(_) => OperationKind::AddLiquidity,
            OperationRequest::RemoveLiquidity(_) => OperationKind::RemoveLiquidity,
        }
    }
}

/// Outcome of a completed sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationReceipt {
    pub sequence_id: Uuid,
    pub kind: OperationKind,
    /// One entry per gated token, in the order they were checked
    pub approvals: Vec<ApprovalOutcome>,
    pub action: TxReceipt,
}
