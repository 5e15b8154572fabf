//! HTTP client for the custody service REST API.
//!
//! Each operation authenticates with a fresh OAuth2 password grant; tokens
//! and credentials are never cached between calls, so a revoked custody
//! account takes effect on the next request.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::config::CustodyArgs;
use crate::custody::{CustodyService, RemoteSignature, WalletInfo};
use crate::types::{ContracterError, Result};

/// Client for the remote custody (wallet) service.
pub struct CustodyClient {
    base_url: String,
    oauth_id: String,
    oauth_secret: String,
    username: String,
    password: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
}

impl CustodyClient {
    pub fn new(args: &CustodyArgs) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                ContracterError::Custody(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            base_url: args.custody_base_url.trim_end_matches('/').to_string(),
            oauth_id: args.custody_oauth_id.clone(),
            oauth_secret: args.custody_oauth_secret.clone(),
            username: args.custody_username.clone(),
            password: args.custody_password.clone(),
            http,
        })
    }

    /// Obtain a short-lived access token via the password grant.
    async fn access_token(&self) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/clientele/oauth2/token", self.base_url))
            .form(&[
                ("grant_type", "password"),
                ("scope", "read write"),
                ("client_id", &self.oauth_id),
                ("client_secret", &self.oauth_secret),
                ("username", &self.username),
                ("password", &self.password),
            ])
            .send()
            .await
            .map_err(|e| ContracterError::Custody(format!("custody service unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(ContracterError::Custody(format!(
                "custody authentication failed (status {})",
                response.status()
            )));
        }

        let token: OAuthTokenResponse = response
            .json()
            .await
            .map_err(|e| ContracterError::Custody(format!("invalid token response: {}", e)))?;

        Ok(token.access_token)
    }
}

#[async_trait]
impl CustodyService for CustodyClient {
    async fn wallet(&self, wallet_id: &str) -> Result<WalletInfo> {
        debug!("Resolving custody wallet {}", wallet_id);

        let token = self.access_token().await?;
        let response = self
            .http
            .get(format!("{}/kms/wallets/{}", self.base_url, wallet_id))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ContracterError::Custody(format!("custody service unreachable: {}", e)))?;

        match response.status() {
            status if status.is_success() => response.json::<WalletInfo>().await.map_err(|e| {
                ContracterError::Custody(format!("invalid wallet response: {}", e))
            }),
            reqwest::StatusCode::NOT_FOUND => Err(ContracterError::Custody(format!(
                "wallet {} not found",
                wallet_id
            ))),
            status => Err(ContracterError::Custody(format!(
                "wallet lookup failed (status {})",
                status
            ))),
        }
    }

    async fn sign(
        &self,
        wallet_id: &str,
        passphrase: &str,
        digest_b64: &str,
    ) -> Result<RemoteSignature> {
        debug!("Requesting remote signature from wallet {}", wallet_id);

        let token = self.access_token().await?;
        let response = self
            .http
            .post(format!("{}/kms/wallets/{}/sign", self.base_url, wallet_id))
            .bearer_auth(token)
            .json(&json!({
                "password": passphrase,
                "to_sign": digest_b64,
                "input_format": "base64",
                "output_format": "base64",
            }))
            .send()
            .await
            .map_err(|e| ContracterError::Custody(format!("custody service unreachable: {}", e)))?;

        if !response.status().is_success() {
            // Invalid credential and unknown wallet land here too; none of
            // these are retryable for the current request.
            return Err(ContracterError::Custody(format!(
                "remote signing failed (status {})",
                response.status()
            )));
        }

        response
            .json::<RemoteSignature>()
            .await
            .map_err(|e| ContracterError::Custody(format!("invalid signature response: {}", e)))
    }
}
