//! HTTP Routes for contract deployment
//!
//! POST /contracts/deploy is gated: only an activated account with a valid
//! token may trigger a deployment. The response is plain text carrying the
//! contract address and creating transaction hash.

use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;
use tracing::warn;

use crate::auth::authenticate;
use crate::db::schemas::DeploymentDoc;
use crate::routes::{cors_preflight, error_response, json_response, text_response, BoxBody, ErrorResponse};
use crate::server::AppState;

/// Route /contracts/* requests. Returns None for paths outside /contracts.
pub async fn handle_contract_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path();
    let method = req.method();

    if !path.starts_with("/contracts") {
        return None;
    }

    if method == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let path = path.split('?').next().unwrap_or(path).to_string();

    let response = match (method.clone(), path.as_str()) {
        (Method::POST, "/contracts/deploy") => handle_deploy(req, state).await,

        (_, "/contracts/deploy") => json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &ErrorResponse {
                error: "Method not allowed".into(),
            },
        ),

        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "Contract endpoint not found".into(),
            },
        ),
    };

    Some(response)
}

/// POST /contracts/deploy
async fn handle_deploy(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let account = match authenticate(&req, &state.jwt, state.directory.as_ref()).await {
        Ok(a) => a,
        Err(e) => return error_response(&e),
    };

    let outcome = match state.deployer.deploy().await {
        Ok(o) => o,
        Err(e) => return error_response(&e),
    };

    // Record the deployment; the contract is already on chain, so a failed
    // write is logged rather than turned into a client error
    if let Some(deployments) = &state.deployments {
        let record = DeploymentDoc::new(
            account.email.clone(),
            outcome.contract_address.to_string(),
            outcome.tx_hash.clone(),
            outcome.sender.to_string(),
            outcome.nonce,
        );
        if let Err(e) = deployments.insert_one(record).await {
            warn!("Failed to record deployment {}: {}", outcome.tx_hash, e);
        }
    }

    text_response(
        StatusCode::OK,
        format!(
            "Contract deployed at {} (tx {})",
            outcome.contract_address, outcome.tx_hash
        ),
    )
}
