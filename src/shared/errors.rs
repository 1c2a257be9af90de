//! Error handling for the application

use alloy_primitives::Address;
use thiserror::Error;

use crate::domain::operation::OperationStatus;
use crate::shared::types::TxHash;

/// Why a display amount could not be turned into base units
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountErrorKind {
    #[error("amount is empty")]
    Empty,

    #[error("amount is not a number")]
    Malformed,

    #[error("amount is negative")]
    Negative,

    #[error("amount is not finite")]
    NonFinite,

    #[error("amount exceeds the 256-bit range")]
    Overflow,

    #[error("token decimals {0} exceed the supported maximum")]
    DecimalsOutOfRange(u8),

    #[error("amount must be greater than zero")]
    Zero,

    #[error("withdrawal fraction must be between 1 and 10000 basis points")]
    FractionOutOfRange,
}

/// Malformed or out-of-range user input, caught before any ledger interaction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid amount '{input}': {kind}")]
pub struct InvalidAmount {
    pub input: String,
    pub kind: AmountErrorKind,
}

impl InvalidAmount {
    pub fn new(input: impl Into<String>, kind: AmountErrorKind) -> Self {
        Self {
            input: input.into(),
            kind,
        }
    }
}

/// Ledger-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Transaction rejected by signer: {0}")]
    Rejected(String),

    #[error("Transaction {tx_hash} reverted")]
    Reverted { tx_hash: TxHash },

    #[error("Decoding error: {0}")]
    Decode(String),

    #[error("Timed out waiting for transaction {0}")]
    Timeout(TxHash),
}

/// Allowance gate errors, surfaced to the caller unmodified
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllowanceError {
    #[error("Allowance read failed for token {token}: {source}")]
    ReadFailed {
        token: Address,
        #[source]
        source: LedgerError,
    },

    #[error("Approval rejected for token {token}: {source}")]
    ApprovalRejected {
        token: Address,
        #[source]
        source: LedgerError,
    },
}

/// The step of a sequence that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationStep {
    Validation,
    Approval,
    Execution,
}

impl OperationStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStep::Validation => "validation",
            OperationStep::Approval => "approval",
            OperationStep::Execution => "execution",
        }
    }
}

/// Operation sequencer errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequencerError {
    #[error(transparent)]
    InvalidAmount(#[from] InvalidAmount),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Allowance read failed for token {token}: {message}")]
    AllowanceReadFailed { token: Address, message: String },

    #[error("Approval rejected for token {token}: {message}")]
    ApprovalRejected { token: Address, message: String },

    #[error("Execution rejected: {0}")]
    ExecutionRejected(String),

    #[error("Operation already in progress (status: {0})")]
    OperationInProgress(OperationStatus),
}

impl SequencerError {
    /// Step that produced the error
    pub fn step(&self) -> OperationStep {
        match self {
            SequencerError::InvalidAmount(_)
            | SequencerError::InvalidRequest(_)
            | SequencerError::OperationInProgress(_) => OperationStep::Validation,
            SequencerError::AllowanceReadFailed { .. } | SequencerError::ApprovalRejected { .. } => {
                OperationStep::Approval
            }
            SequencerError::ExecutionRejected(_) => OperationStep::Execution,
        }
    }
}

impl From<AllowanceError> for SequencerError {
    fn from(err: AllowanceError) -> Self {
        match err {
            AllowanceError::ReadFailed { token, source } => SequencerError::AllowanceReadFailed {
                token,
                message: source.to_string(),
            },
            AllowanceError::ApprovalRejected { token, source } => {
                SequencerError::ApprovalRejected {
                    token,
                    message: source.to_string(),
                }
            }
        }
    }
}

/// Router service errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Sequencer(#[from] SequencerError),

    #[error(transparent)]
    InvalidAmount(#[from] InvalidAmount),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Unknown token: {0}")]
    UnknownToken(String),

    #[error("No pair exists for {0} / {1}")]
    PairNotFound(String, String),

    #[error("Invalid address '{0}'")]
    InvalidAddress(String),

    #[error("Factory address is not configured")]
    FactoryNotConfigured,

    #[error("{0} is not yet available")]
    NotYetAvailable(&'static str),
}

/// General application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid address '{0}'")]
    InvalidAddress(String),
}
