//! Infrastructure layer - external systems

pub mod blockchain;

pub use blockchain::{ConfirmationConfig, EvmLedger};
