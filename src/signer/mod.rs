//! Transaction Authorization Adapter.
//!
//! Bridges the transaction-signing protocol to the remote custody service:
//! the digest is computed locally, signed out-of-process, and the remote
//! reply is reassembled into the chain's 65-byte signature encoding. The
//! adapter refuses to sign for any address other than the one it was
//! constructed for, and signature attachment re-verifies recovery before
//! anything can be broadcast.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::chain::tx::{LegacyTransaction, SignedTransaction, SigningScheme};
use crate::chain::types::Address;
use crate::custody::{CustodyService, RemoteSignature};
use crate::types::{ContracterError, Result};

/// Signing strategy bound to one expected sender and one custodial wallet.
///
/// Stateless between invocations; safe to reuse across deployments that
/// share the same sender.
pub struct CustodialSigner {
    expected_sender: Address,
    wallet_id: String,
    passphrase: String,
    custody: Arc<dyn CustodyService>,
}

impl CustodialSigner {
    pub fn new(
        expected_sender: Address,
        wallet_id: String,
        passphrase: String,
        custody: Arc<dyn CustodyService>,
    ) -> Self {
        Self {
            expected_sender,
            wallet_id,
            passphrase,
            custody,
        }
    }

    pub fn expected_sender(&self) -> Address {
        self.expected_sender
    }

    /// Sign `tx` for `candidate` under `scheme`.
    ///
    /// Fails with an authorization error before any custody call when
    /// `candidate` is not the configured sender. Remote failures are
    /// terminal; nothing is cached or retried.
    pub async fn sign_transaction(
        &self,
        scheme: SigningScheme,
        candidate: Address,
        tx: LegacyTransaction,
    ) -> Result<SignedTransaction> {
        if candidate != self.expected_sender {
            warn!(
                "Refusing signature request for {} (wallet represents {})",
                candidate, self.expected_sender
            );
            return Err(ContracterError::Unauthorized(
                "not authorized to sign for this account".into(),
            ));
        }

        let digest = tx.sighash(scheme);
        let digest_b64 = BASE64.encode(digest);
        debug!(
            "Delegating digest to custody wallet {} for {}",
            self.wallet_id, self.expected_sender
        );

        let remote = self
            .custody
            .sign(&self.wallet_id, &self.passphrase, &digest_b64)
            .await?;

        let signature = assemble_signature(&remote)?;
        tx.with_signature(scheme, &signature, self.expected_sender)
    }
}

/// Reassemble the remote `{R, S, recovery}` reply into the chain's
/// `R(32) || S(32) || V(1)` layout.
pub fn assemble_signature(remote: &RemoteSignature) -> Result<[u8; 65]> {
    let r = decode_component(&remote.r, "R")?;
    let s = decode_component(&remote.s, "S")?;
    let recovery = normalize_recovery_id(&remote.recovery)?;

    let mut signature = [0u8; 65];
    signature[..32].copy_from_slice(&r);
    signature[32..64].copy_from_slice(&s);
    signature[64] = recovery;
    Ok(signature)
}

/// Decode one base64 signature component into a left-padded 32-byte word.
fn decode_component(encoded: &str, name: &str) -> Result<[u8; 32]> {
    let bytes = BASE64.decode(encoded.trim()).map_err(|e| {
        ContracterError::Signature(format!("signature component {} is not base64: {}", name, e))
    })?;
    if bytes.len() > 32 {
        return Err(ContracterError::Signature(format!(
            "signature component {} is {} bytes, exceeds curve width",
            name,
            bytes.len()
        )));
    }
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(word)
}

/// Normalize the remote recovery identifier to {0, 1}.
///
/// Both conventions seen in the wild are accepted: raw recovery bits
/// (0/1) and the legacy v encoding (27/28). Anything else is rejected
/// rather than guessed at.
fn normalize_recovery_id(raw: &str) -> Result<u8> {
    let value: u32 = raw.trim().parse().map_err(|_| {
        ContracterError::Signature(format!("recovery id '{}' is not an integer", raw))
    })?;
    match value {
        0 | 1 => Ok(value as u8),
        27 | 28 => Ok((value - 27) as u8),
        other => Err(ContracterError::Signature(format!(
            "recovery id must be 0/1 or 27/28, got {}",
            other
        ))),
    }
}
