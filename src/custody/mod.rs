//! Remote custody service boundary.
//!
//! The custody service holds the private key material; this process never
//! does. `CustodyService` is the seam the signing adapter and the deployment
//! orchestrator depend on.

pub mod client;

pub use client::CustodyClient;

use async_trait::async_trait;
use serde::Deserialize;

use crate::types::Result;

/// A wallet record as the custody service reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct WalletInfo {
    pub id: String,
    /// Chain address the custody service binds to this wallet
    pub address: String,
}

/// Signature components as returned by the remote signer.
///
/// R and S are base64-encoded big-endian unsigned integers at the curve
/// coordinate width; `recovery` is a decimal string whose convention
/// (0/1 vs 27/28) is normalized by the signing adapter.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSignature {
    pub r: String,
    pub s: String,
    #[serde(rename = "recover")]
    pub recovery: String,
}

/// Operations consumed from the custody service.
///
/// All failures (network, credential, unknown wallet) are non-retryable
/// from the caller's perspective: they abort the current request.
#[async_trait]
pub trait CustodyService: Send + Sync {
    /// Resolve a wallet identifier to its record, including the chain
    /// address the custody service owns for it.
    async fn wallet(&self, wallet_id: &str) -> Result<WalletInfo>;

    /// Sign a base64-encoded digest with the named wallet.
    ///
    /// `passphrase` unlocks the wallet for this one operation; callers must
    /// not cache it or retry on failure.
    async fn sign(
        &self,
        wallet_id: &str,
        passphrase: &str,
        digest_b64: &str,
    ) -> Result<RemoteSignature>;
}
