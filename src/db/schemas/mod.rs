//! Document schemas for MongoDB collections

pub mod account;
pub mod deployment;
pub mod metadata;

pub use account::{AccountDoc, ACCOUNT_COLLECTION};
pub use deployment::{DeploymentDoc, DEPLOYMENT_COLLECTION};
pub use metadata::Metadata;
