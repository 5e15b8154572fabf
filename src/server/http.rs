//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. Requests run under a
//! whole-request wall-clock budget; when it elapses the client gets a 504
//! while the handler task runs to completion in the background, so remote
//! custody and chain calls are never interrupted mid-flight.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::JwtValidator;
use crate::config::Args;
use crate::db::accounts::AccountDirectory;
use crate::db::schemas::DeploymentDoc;
use crate::db::{MongoClient, MongoCollection};
use crate::deploy::Deployer;
use crate::routes;
use crate::routes::{cors_preflight, json_response, BoxBody, ErrorResponse};
use crate::services::accounts::AccountService;
use crate::types::ContracterError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub mongo: Option<MongoClient>,
    /// Account storage, Mongo-backed in production, in-memory in dev mode
    pub directory: Arc<dyn AccountDirectory>,
    /// Session token validator shared by token issuance and the gate
    pub jwt: JwtValidator,
    pub accounts: AccountService,
    pub deployer: Arc<Deployer>,
    /// Deployment audit collection, absent when running without MongoDB
    pub deployments: Option<MongoCollection<DeploymentDoc>>,
}

impl AppState {
    pub fn new(
        args: Args,
        mongo: Option<MongoClient>,
        directory: Arc<dyn AccountDirectory>,
        jwt: JwtValidator,
        accounts: AccountService,
        deployer: Arc<Deployer>,
        deployments: Option<MongoCollection<DeploymentDoc>>,
    ) -> Self {
        Self {
            args,
            mongo,
            directory,
            jwt,
            accounts,
            deployer,
            deployments,
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), ContracterError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Contracter listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled - accounts are held in memory");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route one request under the configured time budget.
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    let budget = Duration::from_millis(state.args.request_timeout_ms);
    let handler = tokio::spawn(route(state, req));

    match tokio::time::timeout(budget, handler).await {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(join_err)) => {
            error!("Handler for {} {} panicked: {}", method, path, join_err);
            Ok(json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorResponse {
                    error: "Internal server error".into(),
                },
            ))
        }
        Err(_) => {
            // The spawned handler keeps running; only the response is given up
            warn!(
                "Request {} {} exceeded {} ms budget",
                method,
                path,
                budget.as_millis()
            );
            Ok(json_response(
                StatusCode::GATEWAY_TIMEOUT,
                &ErrorResponse {
                    error: "Request timed out".into(),
                },
            ))
        }
    }
}

/// Dispatch to the route handlers.
async fn route(state: Arc<AppState>, req: Request<Incoming>) -> Response<BoxBody> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    if path.starts_with("/auth") {
        if let Some(response) = routes::handle_auth_request(req, state).await {
            return response;
        }
        return not_found(&path);
    }

    if path.starts_with("/contracts") {
        if let Some(response) = routes::handle_contract_request(req, state).await {
            return response;
        }
        return not_found(&path);
    }

    match (method, path.as_str()) {
        // Liveness probe
        (Method::GET, "/health") | (Method::GET, "/healthz") => routes::health_check(state),

        // CORS preflight
        (Method::OPTIONS, _) => cors_preflight(),

        _ => not_found(&path),
    }
}

fn not_found(path: &str) -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &ErrorResponse {
            error: format!("No route for {}", path),
        },
    )
}
