//! Domain layer - core business logic and entities

pub mod allowance;
pub mod amount;
pub mod ledger;
pub mod operation;
