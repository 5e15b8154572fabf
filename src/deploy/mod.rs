//! Deployment Orchestrator.
//!
//! Assembles an unsigned contract-creation transaction from configuration,
//! obtains nonce and gas price from the chain node, delegates signing to the
//! custodial adapter, and broadcasts the result. The nonce-fetch to
//! broadcast window is serialized behind an async mutex so concurrent
//! deployments for the configured sender cannot race on the same nonce.

use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::info;

use crate::chain::abi::Abi;
use crate::chain::rpc::ChainClient;
use crate::chain::tx::{contract_address, LegacyTransaction, SigningScheme};
use crate::chain::types::{decode_hex_payload, Address};
use crate::config::ContractConfig;
use crate::custody::CustodyService;
use crate::signer::CustodialSigner;
use crate::types::{ContracterError, Result};

/// Outcome of a successful deployment.
#[derive(Debug, Clone)]
pub struct DeploymentOutcome {
    pub contract_address: Address,
    pub tx_hash: String,
    pub sender: Address,
    pub nonce: u64,
}

/// Orchestrates contract deployments signed by the custody service.
pub struct Deployer {
    custody: Arc<dyn CustodyService>,
    chain: Arc<dyn ChainClient>,
    wallet_id: String,
    wallet_passphrase: String,
    contract: ContractConfig,
    /// Replay-protection chain id. Seeded from configuration when set,
    /// otherwise resolved from the node on first use and kept.
    chain_id: OnceCell<u64>,
    /// Serializes nonce fetch through broadcast for the single configured
    /// sender. Without it two concurrent deployments can fetch the same
    /// pending nonce and the chain rejects the loser.
    deploy_lock: Mutex<()>,
}

impl Deployer {
    pub fn new(
        custody: Arc<dyn CustodyService>,
        chain: Arc<dyn ChainClient>,
        wallet_id: String,
        wallet_passphrase: String,
        contract: ContractConfig,
        configured_chain_id: Option<u64>,
    ) -> Self {
        Self {
            custody,
            chain,
            wallet_id,
            wallet_passphrase,
            contract,
            chain_id: OnceCell::new_with(configured_chain_id),
            deploy_lock: Mutex::new(()),
        }
    }

    /// Deploy the configured contract. Any step failure aborts the whole
    /// deployment; there is no partial state to clean up.
    pub async fn deploy(&self) -> Result<DeploymentOutcome> {
        // The custody service owns the wallet-to-address binding.
        let wallet = self.custody.wallet(&self.wallet_id).await?;
        let sender: Address = wallet.address.parse().map_err(|_| {
            ContracterError::Custody(format!(
                "custody service returned invalid address '{}'",
                wallet.address
            ))
        })?;

        let abi = Abi::parse(&self.contract.abi_json)?;
        let bytecode = decode_hex_payload(&self.contract.bytecode_hex)
            .map_err(|e| ContracterError::Config(format!("invalid contract bytecode: {}", e)))?;
        if bytecode.is_empty() {
            return Err(ContracterError::Config("contract bytecode is empty".into()));
        }

        let mut payload = bytecode;
        payload.extend(abi.encode_constructor_args(&self.contract.constructor_args)?);

        let chain_id = *self
            .chain_id
            .get_or_try_init(|| self.chain.chain_id())
            .await?;
        let scheme = SigningScheme::Eip155 { chain_id };

        let signer = CustodialSigner::new(
            sender,
            self.wallet_id.clone(),
            self.wallet_passphrase.clone(),
            Arc::clone(&self.custody),
        );

        // Hold the lock across fetch, sign, and broadcast.
        let _guard = self.deploy_lock.lock().await;

        let nonce = self.chain.pending_nonce(&sender).await?;
        let gas_price = self.chain.gas_price().await?;

        let tx = LegacyTransaction {
            nonce,
            gas_price,
            gas_limit: self.contract.gas_limit,
            to: None,
            value: 0,
            data: payload,
        };

        let signed = signer.sign_transaction(scheme, sender, tx).await?;
        let tx_hash = self.chain.send_raw_transaction(&signed.raw()).await?;
        let deployed_at = contract_address(sender, nonce);

        info!(
            "Deployed contract {} from {} (nonce {}, tx {})",
            deployed_at, sender, nonce, tx_hash
        );

        Ok(DeploymentOutcome {
            contract_address: deployed_at,
            tx_hash,
            sender,
            nonce,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use k256::ecdsa::SigningKey;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex as StdMutex;

    use crate::chain::tx::{address_from_verifying_key, recover_address};
    use crate::custody::{RemoteSignature, WalletInfo};

    struct TestCustody {
        key: SigningKey,
    }

    impl TestCustody {
        fn new() -> Self {
            Self {
                key: SigningKey::from_slice(&[42u8; 32]).unwrap(),
            }
        }

        fn address(&self) -> Address {
            address_from_verifying_key(self.key.verifying_key()).unwrap()
        }
    }

    #[async_trait]
    impl CustodyService for TestCustody {
        async fn wallet(&self, wallet_id: &str) -> crate::types::Result<WalletInfo> {
            Ok(WalletInfo {
                id: wallet_id.to_string(),
                address: self.address().to_string(),
            })
        }

        async fn sign(
            &self,
            _wallet_id: &str,
            _passphrase: &str,
            digest_b64: &str,
        ) -> crate::types::Result<RemoteSignature> {
            let digest = BASE64.decode(digest_b64).unwrap();
            let (sig, recid) = self.key.sign_prehash_recoverable(&digest).unwrap();
            let bytes = sig.to_bytes();
            Ok(RemoteSignature {
                r: BASE64.encode(&bytes[..32]),
                s: BASE64.encode(&bytes[32..]),
                // 27/28 convention, as some custody services report it
                recovery: (recid.to_byte() + 27).to_string(),
            })
        }
    }

    /// Chain mock whose pending nonce only advances when a transaction
    /// lands, mimicking a node's pending pool.
    struct TestChain {
        nonce: AtomicU64,
        chain_id_calls: AtomicU64,
        submitted: StdMutex<Vec<Vec<u8>>>,
    }

    impl TestChain {
        fn new() -> Self {
            Self {
                nonce: AtomicU64::new(7),
                chain_id_calls: AtomicU64::new(0),
                submitted: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChainClient for TestChain {
        async fn pending_nonce(&self, _address: &Address) -> crate::types::Result<u64> {
            Ok(self.nonce.load(Ordering::SeqCst))
        }

        async fn gas_price(&self) -> crate::types::Result<u128> {
            Ok(1_000_000_000)
        }

        async fn chain_id(&self) -> crate::types::Result<u64> {
            self.chain_id_calls.fetch_add(1, Ordering::SeqCst);
            Ok(3)
        }

        async fn send_raw_transaction(&self, raw: &[u8]) -> crate::types::Result<String> {
            self.nonce.fetch_add(1, Ordering::SeqCst);
            self.submitted.lock().unwrap().push(raw.to_vec());
            Ok(format!(
                "0x{}",
                hex::encode(crate::chain::tx::keccak256(raw))
            ))
        }
    }

    fn contract_config() -> ContractConfig {
        ContractConfig {
            abi_json: r#"[{"type":"constructor","inputs":[{"name":"version","type":"string"}]}]"#
                .to_string(),
            bytecode_hex: "0x6080604052".to_string(),
            constructor_args: vec!["1.0".to_string()],
            gas_limit: 300_000,
        }
    }

    fn deployer(custody: Arc<TestCustody>, chain: Arc<TestChain>) -> Deployer {
        Deployer::new(
            custody,
            chain,
            "wallet-1".into(),
            "pass".into(),
            contract_config(),
            None,
        )
    }

    #[tokio::test]
    async fn test_deploy_produces_recoverable_transaction() {
        let custody = Arc::new(TestCustody::new());
        let chain = Arc::new(TestChain::new());
        let sender = custody.address();

        let outcome = deployer(Arc::clone(&custody), Arc::clone(&chain))
            .deploy()
            .await
            .unwrap();

        assert_eq!(outcome.sender, sender);
        assert_eq!(outcome.nonce, 7);
        assert_eq!(outcome.contract_address, contract_address(sender, 7));
        assert!(outcome.tx_hash.starts_with("0x"));

        let submitted = chain.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        // Payload carries bytecode followed by the encoded "1.0" argument
        let raw = &submitted[0];
        assert!(raw
            .windows(5)
            .any(|w| w == [0x60, 0x80, 0x60, 0x40, 0x52]));
    }

    #[tokio::test]
    async fn test_concurrent_deploys_use_distinct_nonces() {
        let custody = Arc::new(TestCustody::new());
        let chain = Arc::new(TestChain::new());
        let d = Arc::new(deployer(Arc::clone(&custody), Arc::clone(&chain)));

        let (a, b) = tokio::join!(
            {
                let d = Arc::clone(&d);
                async move { d.deploy().await }
            },
            {
                let d = Arc::clone(&d);
                async move { d.deploy().await }
            }
        );

        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.contract_address, b.contract_address);
        assert_eq!(chain.submitted.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_chain_id_is_resolved_once() {
        let custody = Arc::new(TestCustody::new());
        let chain = Arc::new(TestChain::new());
        let d = deployer(Arc::clone(&custody), Arc::clone(&chain));

        d.deploy().await.unwrap();
        d.deploy().await.unwrap();

        assert_eq!(chain.chain_id_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_configured_chain_id_skips_the_node() {
        let custody = Arc::new(TestCustody::new());
        let chain = Arc::new(TestChain::new());

        let d = Deployer::new(
            custody.clone(),
            chain.clone(),
            "wallet-1".into(),
            "pass".into(),
            contract_config(),
            Some(3),
        );
        d.deploy().await.unwrap();

        assert_eq!(chain.chain_id_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bad_abi_is_a_config_error() {
        let custody = Arc::new(TestCustody::new());
        let chain = Arc::new(TestChain::new());
        let mut config = contract_config();
        config.abi_json = "nonsense".into();

        let d = Deployer::new(
            custody,
            chain,
            "wallet-1".into(),
            "pass".into(),
            config,
            Some(3),
        );
        assert!(matches!(
            d.deploy().await.unwrap_err(),
            ContracterError::Config(_)
        ));
    }

    #[tokio::test]
    async fn test_chain_rejection_is_surfaced_as_chain_error() {
        struct RejectingChain;

        #[async_trait]
        impl ChainClient for RejectingChain {
            async fn pending_nonce(&self, _address: &Address) -> crate::types::Result<u64> {
                Ok(0)
            }
            async fn gas_price(&self) -> crate::types::Result<u128> {
                Ok(1)
            }
            async fn chain_id(&self) -> crate::types::Result<u64> {
                Ok(3)
            }
            async fn send_raw_transaction(&self, _raw: &[u8]) -> crate::types::Result<String> {
                Err(ContracterError::Chain(
                    "eth_sendRawTransaction rejected (-32000): insufficient funds".into(),
                ))
            }
        }

        let d = Deployer::new(
            Arc::new(TestCustody::new()),
            Arc::new(RejectingChain),
            "wallet-1".into(),
            "pass".into(),
            contract_config(),
            Some(3),
        );
        assert!(matches!(
            d.deploy().await.unwrap_err(),
            ContracterError::Chain(_)
        ));
    }

    #[tokio::test]
    async fn test_submitted_transaction_recovers_to_sender() {
        // Decode the raw submission far enough to re-verify the sender:
        // rebuild the unsigned tx from known inputs and check recovery.
        let custody = Arc::new(TestCustody::new());
        let chain = Arc::new(TestChain::new());
        let sender = custody.address();

        deployer(Arc::clone(&custody), Arc::clone(&chain))
            .deploy()
            .await
            .unwrap();

        let abi = Abi::parse(&contract_config().abi_json).unwrap();
        let mut payload = decode_hex_payload("0x6080604052").unwrap();
        payload.extend(
            abi.encode_constructor_args(&["1.0".to_string()])
                .unwrap(),
        );

        let tx = LegacyTransaction {
            nonce: 7,
            gas_price: 1_000_000_000,
            gas_limit: 300_000,
            to: None,
            value: 0,
            data: payload,
        };
        let digest = tx.sighash(SigningScheme::Eip155 { chain_id: 3 });

        // Ask the custody mock for the signature again; deterministic RFC6979
        // signing yields the same components for the same digest.
        let remote = custody
            .sign("wallet-1", "pass", &BASE64.encode(digest))
            .await
            .unwrap();
        let sig = crate::signer::assemble_signature(&remote).unwrap();
        let recovered = recover_address(&digest, &sig[..64], sig[64]).unwrap();
        assert_eq!(recovered, sender);
    }
}
