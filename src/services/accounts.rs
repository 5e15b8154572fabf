//! Account flows: signup, signin, and email verification.
//!
//! Storage goes through `AccountDirectory`; handlers stay thin and call in
//! here. There is no mailer, so the activation link is written to the log
//! for the operator to relay.

use rand::Rng;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::auth::jwt::{JwtValidator, TokenInput};
use crate::auth::password::{hash_password, verify_password};
use crate::db::accounts::{AccountDirectory, AccountRecord};
use crate::db::schemas::AccountDoc;
use crate::types::{ContracterError, Result};

/// Signup payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Signin payload.
#[derive(Debug, Clone, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

const MIN_PASSWORD_LEN: usize = 5;

/// Account signup / signin / verification flows.
pub struct AccountService {
    directory: Arc<dyn AccountDirectory>,
    jwt: JwtValidator,
    public_url: String,
}

impl AccountService {
    pub fn new(directory: Arc<dyn AccountDirectory>, jwt: JwtValidator, public_url: String) -> Self {
        Self {
            directory,
            jwt,
            public_url,
        }
    }

    pub fn directory(&self) -> &Arc<dyn AccountDirectory> {
        &self.directory
    }

    /// Create a new inactive account and log its activation link.
    pub async fn signup(&self, request: SignupRequest) -> Result<AccountRecord> {
        let email = request.email.trim().to_lowercase();
        if !is_plausible_email(&email) {
            return Err(ContracterError::Validation(
                "email address is not valid".into(),
            ));
        }
        if request.password.len() < MIN_PASSWORD_LEN {
            return Err(ContracterError::Validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let password_hash = hash_password(&request.password)?;
        let activation_token = generate_activation_token();

        let record = self
            .directory
            .insert(AccountDoc::new(
                email,
                password_hash,
                request.first_name.trim().to_string(),
                request.last_name.trim().to_string(),
                activation_token.clone(),
            ))
            .await?;

        // No mailer is wired up; surface the link through the log instead
        info!(
            "Account {} created; activation link: {}/auth/verify?token={}",
            record.email, self.public_url, activation_token
        );

        Ok(record)
    }

    /// Authenticate credentials and issue a session token.
    ///
    /// Unknown email and wrong password produce the same error so the
    /// endpoint cannot be used to probe which addresses are registered.
    pub async fn signin(&self, request: SigninRequest) -> Result<(AccountRecord, String)> {
        let email = request.email.trim().to_lowercase();

        let account = match self.directory.find_by_email(&email).await? {
            Some(a) => a,
            None => return Err(bad_credentials()),
        };

        if !verify_password(&request.password, &account.password_hash)? {
            return Err(bad_credentials());
        }

        if !account.active {
            return Err(ContracterError::Unauthorized("email not verified".into()));
        }

        let token = self.jwt.generate_token(TokenInput {
            account_id: account.id.clone(),
            email: account.email.clone(),
        })?;

        Ok((account, token))
    }

    /// Consume an activation token, flipping the account to active.
    ///
    /// The token is single use; a second attempt finds nothing and reports
    /// not-found, same as a token that never existed.
    pub async fn verify_email(&self, token: &str) -> Result<AccountRecord> {
        match self.directory.activate(token).await? {
            Some(account) => {
                info!("Account {} verified", account.email);
                Ok(account)
            }
            None => Err(ContracterError::NotFound(
                "unknown or already used activation token".into(),
            )),
        }
    }
}

fn bad_credentials() -> ContracterError {
    ContracterError::Unauthorized("invalid email or password".into())
}

/// Structural email check; deliverability is the account holder's problem.
fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

fn generate_activation_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::accounts::MemoryAccountDirectory;

    fn service() -> (AccountService, Arc<MemoryAccountDirectory>) {
        let directory = Arc::new(MemoryAccountDirectory::new());
        let jwt = JwtValidator::new("service-test-secret".into(), 3600).unwrap();
        let service = AccountService::new(
            directory.clone(),
            jwt,
            "http://localhost:8000".into(),
        );
        (service, directory)
    }

    fn signup_request(email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            email: email.into(),
            password: password.into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
        }
    }

    #[tokio::test]
    async fn test_signup_verify_signin_roundtrip() {
        let (service, directory) = service();

        let record = service
            .signup(signup_request("ada@example.com", "abcde"))
            .await
            .unwrap();
        assert!(!record.active);

        // Signin before verification is refused
        let err = service
            .signin(SigninRequest {
                email: "ada@example.com".into(),
                password: "abcde".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ContracterError::Unauthorized(_)));

        let token = directory
            .find_by_email("ada@example.com")
            .await
            .unwrap()
            .unwrap()
            .activation_token
            .unwrap();
        let verified = service.verify_email(&token).await.unwrap();
        assert!(verified.active);

        // Token is single use
        let err = service.verify_email(&token).await.unwrap_err();
        assert!(matches!(err, ContracterError::NotFound(_)));

        let (account, session) = service
            .signin(SigninRequest {
                email: "ada@example.com".into(),
                password: "abcde".into(),
            })
            .await
            .unwrap();
        assert_eq!(account.email, "ada@example.com");
        assert!(!session.is_empty());
    }

    #[tokio::test]
    async fn test_signin_failures_share_one_message() {
        let (service, directory) = service();
        service
            .signup(signup_request("ada@example.com", "abcde"))
            .await
            .unwrap();
        let token = directory
            .find_by_email("ada@example.com")
            .await
            .unwrap()
            .unwrap()
            .activation_token
            .unwrap();
        service.verify_email(&token).await.unwrap();

        let unknown = service
            .signin(SigninRequest {
                email: "ghost@example.com".into(),
                password: "abcde".into(),
            })
            .await
            .unwrap_err();
        let wrong_password = service
            .signin(SigninRequest {
                email: "ada@example.com".into(),
                password: "wrong".into(),
            })
            .await
            .unwrap_err();

        assert_eq!(unknown.to_string(), wrong_password.to_string());
    }

    #[tokio::test]
    async fn test_signup_validation() {
        let (service, _) = service();

        let err = service
            .signup(signup_request("not-an-email", "abcde"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContracterError::Validation(_)));

        let err = service
            .signup(signup_request("ada@example.com", "abcd"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContracterError::Validation(_)));
    }

    #[tokio::test]
    async fn test_duplicate_signup_conflicts() {
        let (service, _) = service();
        service
            .signup(signup_request("ada@example.com", "abcde"))
            .await
            .unwrap();

        let err = service
            .signup(signup_request("ada@example.com", "fghij"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContracterError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_email_normalized_to_lowercase() {
        let (service, directory) = service();
        service
            .signup(signup_request("Ada@Example.COM", "abcde"))
            .await
            .unwrap();

        assert!(directory
            .find_by_email("ada@example.com")
            .await
            .unwrap()
            .is_some());
    }
}
