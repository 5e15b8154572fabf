//! Health endpoint

use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::routes::{json_response, BoxBody};
use crate::server::AppState;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    dev_mode: bool,
    mongo_connected: bool,
}

/// GET /health - liveness probe
pub fn health_check(state: Arc<AppState>) -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            dev_mode: state.args.dev_mode,
            mongo_connected: state.mongo.is_some(),
        },
    )
}
