//! Account directory
//!
//! `AccountDirectory` is the seam between account logic and storage. The
//! MongoDB implementation backs production; the in-memory implementation
//! backs development mode and tests, and counts lookups so tests can assert
//! how many storage queries a path performs.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, DateTime};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::db::mongo::MongoCollection;
use crate::db::schemas::AccountDoc;
use crate::types::{ContracterError, Result};

/// Storage-independent view of one account.
#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub active: bool,
    pub activation_token: Option<String>,
}

impl From<AccountDoc> for AccountRecord {
    fn from(doc: AccountDoc) -> Self {
        Self {
            id: doc._id.map(|id| id.to_hex()).unwrap_or_default(),
            email: doc.email,
            password_hash: doc.password_hash,
            first_name: doc.first_name,
            last_name: doc.last_name,
            active: doc.active,
            activation_token: doc.activation_token,
        }
    }
}

/// Account storage operations.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Look up an account by email.
    async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>>;

    /// Look up an account by its id.
    async fn find_by_id(&self, id: &str) -> Result<Option<AccountRecord>>;

    /// Look up an account by a pending activation token.
    async fn find_by_activation_token(&self, token: &str) -> Result<Option<AccountRecord>>;

    /// Insert a new, inactive account. Fails with a conflict when the email
    /// is already registered.
    async fn insert(&self, account: AccountDoc) -> Result<AccountRecord>;

    /// Atomically consume an activation token: the matching account must
    /// still be inactive, and the token is cleared in the same operation so
    /// a second verification attempt finds nothing.
    async fn activate(&self, token: &str) -> Result<Option<AccountRecord>>;
}

/// MongoDB-backed directory.
pub struct MongoAccountDirectory {
    collection: MongoCollection<AccountDoc>,
}

impl MongoAccountDirectory {
    pub fn new(collection: MongoCollection<AccountDoc>) -> Self {
        Self { collection }
    }
}

#[async_trait]
impl AccountDirectory for MongoAccountDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>> {
        let doc = self.collection.find_one(doc! { "email": email }).await?;
        Ok(doc.map(AccountRecord::from))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<AccountRecord>> {
        let oid = match ObjectId::parse_str(id) {
            Ok(oid) => oid,
            // A malformed id cannot match any account
            Err(_) => return Ok(None),
        };
        let doc = self.collection.find_one(doc! { "_id": oid }).await?;
        Ok(doc.map(AccountRecord::from))
    }

    async fn find_by_activation_token(&self, token: &str) -> Result<Option<AccountRecord>> {
        let doc = self
            .collection
            .find_one(doc! { "activation_token": token })
            .await?;
        Ok(doc.map(AccountRecord::from))
    }

    async fn insert(&self, account: AccountDoc) -> Result<AccountRecord> {
        if self.find_by_email(&account.email).await?.is_some() {
            return Err(ContracterError::Conflict(
                "email is already registered".into(),
            ));
        }

        let mut record = AccountRecord::from(account.clone());
        // The unique email index catches the race between check and insert
        let id = self.collection.insert_one(account).await.map_err(|e| {
            if e.to_string().contains("E11000") {
                ContracterError::Conflict("email is already registered".into())
            } else {
                e
            }
        })?;
        record.id = id.to_hex();
        Ok(record)
    }

    async fn activate(&self, token: &str) -> Result<Option<AccountRecord>> {
        let updated = self
            .collection
            .find_one_and_update(
                doc! { "activation_token": token, "active": false },
                doc! {
                    "$set": { "active": true, "metadata.updated_at": DateTime::now() },
                    "$unset": { "activation_token": "" },
                },
            )
            .await?;
        // find_one_and_update returns the pre-update document; reflect the
        // activated state in the record handed back
        Ok(updated.map(|doc| {
            let mut record = AccountRecord::from(doc);
            record.active = true;
            record.activation_token = None;
            record
        }))
    }
}

/// In-memory directory for development mode and tests.
#[derive(Default)]
pub struct MemoryAccountDirectory {
    accounts: Mutex<HashMap<String, AccountRecord>>,
    queries: AtomicUsize,
}

impl MemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lookups performed so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountDirectory for MemoryAccountDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let accounts = self.accounts.lock().map_err(poisoned)?;
        Ok(accounts.get(email).cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<AccountRecord>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let accounts = self.accounts.lock().map_err(poisoned)?;
        Ok(accounts.values().find(|a| a.id == id).cloned())
    }

    async fn find_by_activation_token(&self, token: &str) -> Result<Option<AccountRecord>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let accounts = self.accounts.lock().map_err(poisoned)?;
        Ok(accounts
            .values()
            .find(|a| a.activation_token.as_deref() == Some(token))
            .cloned())
    }

    async fn insert(&self, account: AccountDoc) -> Result<AccountRecord> {
        let mut accounts = self.accounts.lock().map_err(poisoned)?;
        if accounts.contains_key(&account.email) {
            return Err(ContracterError::Conflict(
                "email is already registered".into(),
            ));
        }

        let mut record = AccountRecord::from(account);
        record.id = ObjectId::new().to_hex();
        accounts.insert(record.email.clone(), record.clone());
        Ok(record)
    }

    async fn activate(&self, token: &str) -> Result<Option<AccountRecord>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let mut accounts = self.accounts.lock().map_err(poisoned)?;
        let found = accounts
            .values_mut()
            .find(|a| !a.active && a.activation_token.as_deref() == Some(token));
        Ok(found.map(|record| {
            record.active = true;
            record.activation_token = None;
            record.clone()
        }))
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> ContracterError {
    ContracterError::Internal("account store lock poisoned".into())
}
