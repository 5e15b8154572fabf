//! Chain-facing primitives: addresses, RLP, transactions, ABI, JSON-RPC.

pub mod abi;
pub mod rlp;
pub mod rpc;
pub mod tx;
pub mod types;

pub use abi::Abi;
pub use rpc::{ChainClient, EthRpcClient};
pub use tx::{contract_address, LegacyTransaction, SigningScheme};
pub use types::Address;
