//! Authentication for Contracter
//!
//! Provides:
//! - JWT token generation and validation
//! - The identity gate protecting deployment endpoints
//! - Password hashing with Argon2

pub mod gate;
pub mod jwt;
pub mod password;

pub use gate::{authenticate, authenticate_account, extract_token, verify_request_token, RequestAuth};
pub use jwt::{Claims, JwtValidator, TokenInput, TokenValidationResult};
pub use password::{hash_password, verify_password};
