//! Application services

pub mod accounts;

pub use accounts::{AccountService, SigninRequest, SignupRequest};
