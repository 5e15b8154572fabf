//! Account document schema
//!
//! Stores account credentials and the activation state used by email
//! verification. Accounts start inactive and carry a one-time activation
//! token until verified.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for accounts
pub const ACCOUNT_COLLECTION: &str = "accounts";

/// Account document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct AccountDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Account email, unique across the collection
    pub email: String,

    /// Argon2 password hash
    pub password_hash: String,

    /// Given name
    #[serde(default)]
    pub first_name: String,

    /// Family name
    #[serde(default)]
    pub last_name: String,

    /// Whether the account has completed email verification
    #[serde(default)]
    pub active: bool,

    /// One-time activation token, cleared on verification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activation_token: Option<String>,
}

impl AccountDoc {
    /// Create a new, not-yet-activated account document
    pub fn new(
        email: String,
        password_hash: String,
        first_name: String,
        last_name: String,
        activation_token: String,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            email,
            password_hash,
            first_name,
            last_name,
            active: false,
            activation_token: Some(activation_token),
        }
    }
}

impl IntoIndexes for AccountDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on email
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
            // Index on activation_token for verification lookups
            (
                doc! { "activation_token": 1 },
                Some(
                    IndexOptions::builder()
                        .sparse(true)
                        .name("activation_token_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for AccountDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
