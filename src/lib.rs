//! Poolrouter - approve-then-act client for a constant-product pool router
//! Built with Domain-Driven Design principles

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use application::RouterService;
pub use domain::allowance::AllowanceGate;
pub use domain::ledger::Ledger;
pub use domain::operation::OperationSequencer;
pub use infrastructure::EvmLedger;
