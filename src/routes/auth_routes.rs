//! HTTP Routes for Authentication
//!
//! Provides REST API endpoints for account management:
//! - POST /auth/signup  - Create an inactive account, activation link is logged
//! - POST /auth/signin  - Authenticate and get JWT token
//! - GET  /auth/verify  - Consume an activation token
//! - GET  /auth/me      - Get current account info from token

use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::auth::authenticate;
use crate::routes::{
    cors_preflight, error_response, json_response, parse_json_body, query_param, BoxBody,
    ErrorResponse,
};
use crate::server::AppState;
use crate::services::accounts::{SigninRequest, SignupRequest};
use crate::types::ContracterError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    id: String,
    email: String,
    first_name: String,
    last_name: String,
    active: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SigninResponse {
    id: String,
    email: String,
    first_name: String,
    last_name: String,
    token: String,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

/// Route /auth/* requests. Returns None for paths outside /auth.
pub async fn handle_auth_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path();
    let method = req.method();

    if !path.starts_with("/auth") {
        return None;
    }

    if method == Method::OPTIONS {
        return Some(cors_preflight());
    }

    // Remove query string for matching
    let path = path.split('?').next().unwrap_or(path).to_string();

    let response = match (method.clone(), path.as_str()) {
        (Method::POST, "/auth/signup") => handle_signup(req, state).await,
        (Method::POST, "/auth/signin") => handle_signin(req, state).await,
        (Method::GET, "/auth/verify") => handle_verify(req, state).await,
        (Method::GET, "/auth/me") => handle_me(req, state).await,

        (_, "/auth/signup") | (_, "/auth/signin") | (_, "/auth/verify") | (_, "/auth/me") => {
            json_response(
                StatusCode::METHOD_NOT_ALLOWED,
                &ErrorResponse {
                    error: "Method not allowed".into(),
                },
            )
        }

        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "Auth endpoint not found".into(),
            },
        ),
    };

    Some(response)
}

/// POST /auth/signup
///
/// Creates an inactive account. The activation link goes to the process log;
/// there is no mailer.
async fn handle_signup(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let body: SignupRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    match state.accounts.signup(body).await {
        Ok(record) => json_response(
            StatusCode::CREATED,
            &AccountResponse {
                id: record.id,
                email: record.email,
                first_name: record.first_name,
                last_name: record.last_name,
                active: record.active,
            },
        ),
        Err(e) => error_response(&e),
    }
}

/// POST /auth/signin
async fn handle_signin(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let body: SigninRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    match state.accounts.signin(body).await {
        Ok((record, token)) => json_response(
            StatusCode::OK,
            &SigninResponse {
                id: record.id,
                email: record.email,
                first_name: record.first_name,
                last_name: record.last_name,
                token,
            },
        ),
        Err(e) => error_response(&e),
    }
}

/// GET /auth/verify?token=...
async fn handle_verify(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let token = match query_param(&req, "token") {
        Some(t) => t,
        None => {
            return error_response(&ContracterError::Validation(
                "missing token parameter".into(),
            ))
        }
    };

    match state.accounts.verify_email(&token).await {
        Ok(record) => json_response(
            StatusCode::OK,
            &MessageResponse {
                message: format!("email {} verified", record.email),
            },
        ),
        Err(e) => error_response(&e),
    }
}

/// GET /auth/me
///
/// Identity echo for the bearer of a valid token.
async fn handle_me(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    match authenticate(&req, &state.jwt, state.directory.as_ref()).await {
        Ok(record) => json_response(
            StatusCode::OK,
            &AccountResponse {
                id: record.id,
                email: record.email,
                first_name: record.first_name,
                last_name: record.last_name,
                active: record.active,
            },
        ),
        Err(e) => error_response(&e),
    }
}
