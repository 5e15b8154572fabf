//! Contract-creation transactions: signing digests, signature attachment,
//! raw encoding, and address derivation.
//!
//! ECDSA recovery uses k256; digests are Keccak-256 over the transaction's
//! canonical RLP encoding.

use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey};
use sha3::{Digest, Keccak256};

use crate::chain::rlp;
use crate::chain::types::Address;
use crate::types::{ContracterError, Result};

/// Replay-protection encoding used for the signing digest.
///
/// The scheme chosen here must match the `v` encoding of the final
/// transaction, otherwise the signature silently fails recovery on-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningScheme {
    /// EIP-155: digest covers `(…, chain_id, 0, 0)`, `v = 35 + 2*chain_id + rec`
    Eip155 { chain_id: u64 },
    /// Pre-EIP-155: digest covers the six tx fields, `v = 27 + rec`
    Homestead,
}

/// An unsigned legacy-format transaction.
///
/// `to = None` marks contract creation; deployments always carry zero value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Option<Address>,
    pub value: u128,
    pub data: Vec<u8>,
}

/// A transaction with an attached, recovery-checked signature.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub tx: LegacyTransaction,
    pub v: u64,
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl LegacyTransaction {
    /// Keccak-256 digest the signature is computed over.
    pub fn sighash(&self, scheme: SigningScheme) -> [u8; 32] {
        let mut items = Vec::new();
        self.encode_fields(&mut items);
        if let SigningScheme::Eip155 { chain_id } = scheme {
            rlp::encode_uint(chain_id as u128, &mut items);
            rlp::encode_uint(0, &mut items);
            rlp::encode_uint(0, &mut items);
        }
        let mut encoded = Vec::new();
        rlp::encode_list(&items, &mut encoded);
        keccak256(&encoded)
    }

    /// Attach a 65-byte `R || S || V` signature, where V is a normalized
    /// recovery id in {0, 1}.
    ///
    /// The signature is recovered against this transaction's digest and the
    /// call fails if the recovered signer differs from `expected_sender`.
    /// That check is a precondition of broadcast, not a best-effort audit.
    pub fn with_signature(
        self,
        scheme: SigningScheme,
        signature: &[u8; 65],
        expected_sender: Address,
    ) -> Result<SignedTransaction> {
        let recovery = signature[64];
        if recovery > 1 {
            return Err(ContracterError::Signature(format!(
                "recovery byte must be 0 or 1, got {}",
                recovery
            )));
        }

        let prehash = self.sighash(scheme);
        let recovered = recover_address(&prehash, &signature[..64], recovery)?;
        if recovered != expected_sender {
            return Err(ContracterError::Signature(format!(
                "signature recovers to {} but sender is {}",
                recovered, expected_sender
            )));
        }

        let v = match scheme {
            SigningScheme::Eip155 { chain_id } => 35 + 2 * chain_id + recovery as u64,
            SigningScheme::Homestead => 27 + recovery as u64,
        };

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&signature[..32]);
        s.copy_from_slice(&signature[32..64]);

        Ok(SignedTransaction { tx: self, v, r, s })
    }

    fn encode_fields(&self, items: &mut Vec<u8>) {
        rlp::encode_uint(self.nonce as u128, items);
        rlp::encode_uint(self.gas_price, items);
        rlp::encode_uint(self.gas_limit as u128, items);
        match &self.to {
            Some(addr) => rlp::encode_bytes(addr.as_bytes(), items),
            None => rlp::encode_bytes(&[], items),
        }
        rlp::encode_uint(self.value, items);
        rlp::encode_bytes(&self.data, items);
    }
}

impl SignedTransaction {
    /// Canonical RLP encoding submitted to the chain.
    pub fn raw(&self) -> Vec<u8> {
        let mut items = Vec::new();
        self.tx.encode_fields(&mut items);
        rlp::encode_uint(self.v as u128, &mut items);
        rlp::encode_uint_be(&self.r, &mut items);
        rlp::encode_uint_be(&self.s, &mut items);
        let mut encoded = Vec::new();
        rlp::encode_list(&items, &mut encoded);
        encoded
    }

    /// Transaction hash (Keccak-256 of the raw encoding).
    pub fn hash(&self) -> [u8; 32] {
        keccak256(&self.raw())
    }

    /// Hex tx hash as reported to callers.
    pub fn hash_hex(&self) -> String {
        format!("0x{}", hex::encode(self.hash()))
    }
}

/// Keccak-256 convenience wrapper.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Recover the signer address from a 64-byte `R || S` signature, a digest,
/// and a normalized recovery id.
pub fn recover_address(prehash: &[u8; 32], signature: &[u8], recovery: u8) -> Result<Address> {
    let sig = EcdsaSignature::try_from(signature)
        .map_err(|e| ContracterError::Signature(format!("invalid ECDSA signature bytes: {}", e)))?;
    let recovery_id = RecoveryId::try_from(recovery)
        .map_err(|_| ContracterError::Signature("invalid recovery id".into()))?;
    let verifying_key = VerifyingKey::recover_from_prehash(prehash, &sig, recovery_id)
        .map_err(|e| ContracterError::Signature(format!("signer recovery failed: {}", e)))?;
    address_from_verifying_key(&verifying_key)
}

/// Derive the chain address of a secp256k1 public key:
/// last 20 bytes of Keccak-256 over the uncompressed point (without the
/// 0x04 tag byte).
pub fn address_from_verifying_key(key: &VerifyingKey) -> Result<Address> {
    let encoded = key.to_encoded_point(false);
    let pubkey = encoded.as_bytes();
    if pubkey.len() != 65 || pubkey[0] != 0x04 {
        return Err(ContracterError::Signature(
            "unexpected recovered public key format".into(),
        ));
    }
    let digest = keccak256(&pubkey[1..]);
    Address::from_slice(&digest[12..])
}

/// Address a contract created by `(sender, nonce)` lands at:
/// last 20 bytes of `keccak256(rlp([sender, nonce]))`.
pub fn contract_address(sender: Address, nonce: u64) -> Address {
    let mut items = Vec::new();
    rlp::encode_bytes(sender.as_bytes(), &mut items);
    rlp::encode_uint(nonce as u128, &mut items);
    let mut encoded = Vec::new();
    rlp::encode_list(&items, &mut encoded);
    let digest = keccak256(&encoded);
    Address::from_slice(&digest[12..]).expect("keccak digest always yields 20 bytes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    // The canonical EIP-155 example transaction (chain id 1, nonce 9).
    fn eip155_example() -> LegacyTransaction {
        LegacyTransaction {
            nonce: 9,
            gas_price: 20_000_000_000,
            gas_limit: 21_000,
            to: Some(
                "0x3535353535353535353535353535353535353535"
                    .parse()
                    .unwrap(),
            ),
            value: 1_000_000_000_000_000_000,
            data: Vec::new(),
        }
    }

    fn eip155_example_key() -> SigningKey {
        SigningKey::from_slice(&[0x46u8; 32]).unwrap()
    }

    #[test]
    fn test_eip155_sighash_vector() {
        let tx = eip155_example();
        let digest = tx.sighash(SigningScheme::Eip155 { chain_id: 1 });
        assert_eq!(
            hex::encode(digest),
            "daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );
    }

    #[test]
    fn test_eip155_signed_raw_vector() {
        let tx = eip155_example();
        let scheme = SigningScheme::Eip155 { chain_id: 1 };
        let digest = tx.sighash(scheme);

        let key = eip155_example_key();
        let sender = address_from_verifying_key(key.verifying_key()).unwrap();
        let (sig, recid) = key.sign_prehash_recoverable(&digest).unwrap();

        let mut assembled = [0u8; 65];
        assembled[..64].copy_from_slice(&sig.to_bytes());
        assembled[64] = recid.to_byte();

        let signed = tx.with_signature(scheme, &assembled, sender).unwrap();
        assert_eq!(signed.v, 37);

        let expected = concat!(
            "f86c098504a817c800825208943535353535353535353535353535353535353535",
            "880de0b6b3a76400008025",
            "a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276",
            "a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83",
        );
        assert_eq!(hex::encode(signed.raw()), expected);
    }

    #[test]
    fn test_signature_roundtrip_recovers_sender() {
        let key = SigningKey::from_slice(&[7u8; 32]).unwrap();
        let sender = address_from_verifying_key(key.verifying_key()).unwrap();

        let tx = LegacyTransaction {
            nonce: 0,
            gas_price: 1_000_000_000,
            gas_limit: 300_000,
            to: None,
            value: 0,
            data: vec![0x60, 0x80, 0x60, 0x40],
        };

        let scheme = SigningScheme::Eip155 { chain_id: 3 };
        let digest = tx.sighash(scheme);
        let (sig, recid) = key.sign_prehash_recoverable(&digest).unwrap();

        let mut assembled = [0u8; 65];
        assembled[..64].copy_from_slice(&sig.to_bytes());
        assembled[64] = recid.to_byte();

        let signed = tx.with_signature(scheme, &assembled, sender).unwrap();
        // v encodes chain id 3: 35 + 2*3 + rec
        assert!(signed.v == 41 || signed.v == 42);
        assert!(!signed.hash_hex().is_empty());
    }

    #[test]
    fn test_with_signature_rejects_wrong_sender() {
        let key = SigningKey::from_slice(&[7u8; 32]).unwrap();
        let other = SigningKey::from_slice(&[8u8; 32]).unwrap();
        let other_addr = address_from_verifying_key(other.verifying_key()).unwrap();

        let tx = LegacyTransaction {
            nonce: 1,
            gas_price: 1,
            gas_limit: 21_000,
            to: None,
            value: 0,
            data: Vec::new(),
        };

        let scheme = SigningScheme::Homestead;
        let digest = tx.sighash(scheme);
        let (sig, recid) = key.sign_prehash_recoverable(&digest).unwrap();

        let mut assembled = [0u8; 65];
        assembled[..64].copy_from_slice(&sig.to_bytes());
        assembled[64] = recid.to_byte();

        let err = tx.with_signature(scheme, &assembled, other_addr).unwrap_err();
        assert!(matches!(err, ContracterError::Signature(_)));
    }

    #[test]
    fn test_with_signature_rejects_bad_recovery_byte() {
        let tx = LegacyTransaction {
            nonce: 0,
            gas_price: 1,
            gas_limit: 21_000,
            to: None,
            value: 0,
            data: Vec::new(),
        };
        let sig = [0u8; 65];
        let mut bad = sig;
        bad[64] = 27; // callers must normalize before attachment
        let err = tx
            .with_signature(
                SigningScheme::Homestead,
                &bad,
                Address([0u8; 20]),
            )
            .unwrap_err();
        assert!(matches!(err, ContracterError::Signature(_)));
    }

    #[test]
    fn test_contract_address_vector() {
        let sender: Address = "0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0".parse().unwrap();
        assert_eq!(
            contract_address(sender, 0).to_string(),
            "0xcd234a471b72ba2f1ccf0a70fcaba648a5eecd8d"
        );
        assert_eq!(
            contract_address(sender, 1).to_string(),
            "0x343c43a37d37dff08ae8c4a11544c718abb4fcf8"
        );
    }
}
