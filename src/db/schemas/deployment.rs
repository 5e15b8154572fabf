//! Deployment record schema
//!
//! Audit trail of contract deployments: who triggered one, which address
//! the contract landed at, and the transaction that created it.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for deployment records
pub const DEPLOYMENT_COLLECTION: &str = "deployments";

/// Record of one completed deployment
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct DeploymentDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Email of the account that triggered the deployment
    pub account_email: String,

    /// Address the deployed contract landed at (0x-prefixed hex)
    pub contract_address: String,

    /// Hash of the creating transaction
    pub tx_hash: String,

    /// Sender address the custodial wallet represents
    pub sender: String,

    /// Nonce the creating transaction was broadcast with
    pub nonce: u64,
}

impl DeploymentDoc {
    pub fn new(
        account_email: String,
        contract_address: String,
        tx_hash: String,
        sender: String,
        nonce: u64,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            account_email,
            contract_address,
            tx_hash,
            sender,
            nonce,
        }
    }
}

impl IntoIndexes for DeploymentDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Index on the triggering account for history queries
            (
                doc! { "account_email": 1 },
                Some(
                    IndexOptions::builder()
                        .name("account_email_index".to_string())
                        .build(),
                ),
            ),
            // Tx hashes are unique per chain
            (
                doc! { "tx_hash": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("tx_hash_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for DeploymentDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
