//! Identity gate for protected endpoints
//!
//! Two stages share the work. `verify_request_token` extracts and checks a
//! token, attaching the outcome to a request-scoped `RequestAuth` bag; it
//! never rejects on its own so unauthenticated routes can share the chain.
//! `authenticate_account` turns that bag into an account or a 401, using one
//! uniform message whether the token was absent, invalid, or pointed at an
//! account that does not exist or is not activated. The specific reason is
//! logged at debug level for operators.

use hyper::Request;
use tracing::debug;

use crate::auth::jwt::{Claims, JwtValidator};
use crate::db::accounts::{AccountDirectory, AccountRecord};
use crate::types::{ContracterError, Result};

/// Outcome of token verification, carried alongside the request.
#[derive(Debug, Clone, Default)]
pub struct RequestAuth {
    pub claims: Option<Claims>,
    pub error: Option<String>,
}

/// Extract a token from the request, checking the `jwt` cookie first,
/// then the `Authorization: Bearer` header, then a `jwt` query parameter.
pub fn extract_token<B>(req: &Request<B>) -> Option<String> {
    if let Some(token) = token_from_cookie(req) {
        return Some(token);
    }
    if let Some(token) = token_from_auth_header(req) {
        return Some(token);
    }
    token_from_query(req)
}

fn token_from_cookie<B>(req: &Request<B>) -> Option<String> {
    let header = req.headers().get(hyper::header::COOKIE)?.to_str().ok()?;
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name == "jwt" && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

fn token_from_auth_header<B>(req: &Request<B>) -> Option<String> {
    let header = req
        .headers()
        .get(hyper::header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn token_from_query<B>(req: &Request<B>) -> Option<String> {
    let query = req.uri().query()?;
    query.split('&').find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        if name == "jwt" && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

/// Stage one: verify whatever token the request carries.
///
/// Never fails; routes that do not require authentication read the same bag.
pub fn verify_request_token<B>(req: &Request<B>, jwt: &JwtValidator) -> RequestAuth {
    let token = match extract_token(req) {
        Some(t) => t,
        None => {
            return RequestAuth {
                claims: None,
                error: Some("no token provided".into()),
            }
        }
    };

    let result = jwt.verify_token(&token);
    RequestAuth {
        claims: result.claims.filter(|_| result.valid),
        error: result.error,
    }
}

/// Stage two: resolve the verified claims to an activated account.
pub async fn authenticate_account(
    auth: &RequestAuth,
    directory: &dyn AccountDirectory,
) -> Result<AccountRecord> {
    let claims = match &auth.claims {
        Some(c) => c,
        None => {
            debug!(
                "Gate rejection: {}",
                auth.error.as_deref().unwrap_or("no verified claims")
            );
            return Err(unauthorized());
        }
    };

    let account = match directory.find_by_id(&claims.sub).await? {
        Some(a) => a,
        None => {
            debug!("Gate rejection: token subject {} not found", claims.sub);
            return Err(unauthorized());
        }
    };

    if !account.active {
        debug!("Gate rejection: account {} is not activated", account.email);
        return Err(unauthorized());
    }

    Ok(account)
}

/// Run both gate stages against a request.
pub async fn authenticate<B>(
    req: &Request<B>,
    jwt: &JwtValidator,
    directory: &dyn AccountDirectory,
) -> Result<AccountRecord> {
    let auth = verify_request_token(req, jwt);
    authenticate_account(&auth, directory).await
}

/// The one error every gate failure maps to.
fn unauthorized() -> ContracterError {
    ContracterError::Unauthorized("authentication required".into())
}
