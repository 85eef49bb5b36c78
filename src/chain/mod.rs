//! Ethereum-compatible chain access
//!
//! - `rpc`: JSON-RPC transport (`EthTransport`, `JsonRpcTransport`)
//! - `abi`: call-data encoding and return-value decoding
//! - `contract`: per-contract handle with the cached default caller
//! - `signer`: local key for raw EIP-155 transactions
//! - `units`: ether / wei conversion

pub mod abi;
pub mod address;
pub mod contract;
pub mod rpc;
pub mod signer;
pub mod units;

pub use address::Address;
pub use contract::{Contract, PendingTransaction, ReceiptPolling, TransactionReceipt, TxOptions};
pub use rpc::{EthTransport, JsonRpcTransport};
pub use signer::{LegacyTransaction, LocalSigner};
