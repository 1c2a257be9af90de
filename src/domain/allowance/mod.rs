//! Allowance domain - spending permission granted to the router

mod allowance_gate;

pub use allowance_gate::{AllowanceGate, ApprovalOutcome};
