//! Application layer - use cases and services

pub mod commands;
pub mod services;

pub use commands::{Cli, CommandExecutor, Commands, GlobalArgs};
pub use services::{Quote, RemoveLiquidityOrder, RouterService};
