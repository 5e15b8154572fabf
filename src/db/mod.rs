//! Database layer: MongoDB wrapper, document schemas, and the account
//! directory abstraction.

pub mod accounts;
pub mod mongo;
pub mod schemas;

pub use accounts::{AccountDirectory, AccountRecord, MemoryAccountDirectory, MongoAccountDirectory};
pub use mongo::{MongoClient, MongoCollection};
