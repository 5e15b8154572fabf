//! Contracter - smart-contract deployment gateway with custodial signing
//!
//! An HTTP service that lets an authenticated account trigger deployment of
//! an Ethereum smart contract whose signing key is held by a remote
//! custodial wallet service. The private key never enters this process:
//! signing digests go out, R/S/recovery components come back, and the
//! assembled signature is verified against the expected sender before
//! anything is broadcast.
//!
//! ## Pieces
//!
//! - **Identity gate**: JWT-based authentication with MongoDB-backed accounts
//! - **Custody client**: OAuth2 + REST client for the remote wallet service
//! - **Chain client**: JSON-RPC client for nonce, gas price, and broadcast
//! - **Deployer**: builds, signs, and broadcasts contract-creation transactions

pub mod auth;
pub mod chain;
pub mod config;
pub mod custody;
pub mod db;
pub mod deploy;
pub mod routes;
pub mod server;
pub mod services;
pub mod signer;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{ContracterError, Result};
