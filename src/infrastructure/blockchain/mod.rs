//! EVM node access: contract bindings, JSON-RPC transport and the ledger on top

pub mod contracts;
pub mod evm_ledger;
pub mod rpc_client;

pub use evm_ledger::{ConfirmationConfig, EvmLedger};
pub use rpc_client::JsonRpcClient;
