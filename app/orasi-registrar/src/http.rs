//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! HTTP endpoints for Orasi Registrar

use crate::error::RegistrarError;
use crate::registrar::Registrar;
use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Body returned after a successful weight update
pub const WEIGHT_UPDATED: &str = "update server weight success";

/// Query string of the weight update endpoint
#[derive(Debug, Deserialize)]
pub struct WeightQuery {
    pub weight: Option<String>,
}

/// HTTP server for registrar endpoints
#[derive(Clone)]
pub struct HttpServer {
    registrar: Arc<Registrar>,
}

impl HttpServer {
    /// Create new HTTP server
    pub fn new(registrar: Arc<Registrar>) -> Self {
        Self { registrar }
    }

    /// Create router with all endpoints
    pub fn create_router(&self) -> Router {
        Router::new()
            .route(
                "/weight",
                get(Self::update_weight).post(Self::update_weight),
            )
            .route("/server", get(Self::server_info))
            .route("/health/live", get(Self::health_live))
            .with_state(Arc::new(self.clone()))
    }

    /// Weight update endpoint
    async fn update_weight(
        State(server): State<Arc<Self>>,
        Query(query): Query<WeightQuery>,
    ) -> impl IntoResponse {
        let raw = query.weight.unwrap_or_default();

        match server.registrar.update_weight(&raw).await {
            Ok(weight) => {
                info!("Server weight set to {} over HTTP", weight);
                (StatusCode::OK, WEIGHT_UPDATED.to_string())
            }
            Err(e) => {
                let status = status_for(&e);
                if status.is_server_error() {
                    error!("Failed to update server weight: {}", e);
                } else {
                    warn!("Rejected weight update: {}", e);
                }
                (status, e.to_string())
            }
        }
    }

    /// Published descriptor endpoint
    async fn server_info(State(server): State<Arc<Self>>) -> impl IntoResponse {
        match server.registrar.get_server_info().await {
            Ok(Some(descriptor)) => {
                let response = json!({
                    "server": descriptor,
                    "timestamp": chrono::Utc::now().to_rfc3339()
                });
                (StatusCode::OK, Json(response))
            }
            Ok(None) => {
                let response = json!({
                    "error": "service is not registered",
                    "timestamp": chrono::Utc::now().to_rfc3339()
                });
                (StatusCode::NOT_FOUND, Json(response))
            }
            Err(e) => {
                error!("Failed to read server info: {}", e);
                let response = json!({
                    "error": e.to_string(),
                    "timestamp": chrono::Utc::now().to_rfc3339()
                });
                (status_for(&e), Json(response))
            }
        }
    }

    /// Liveness probe endpoint
    async fn health_live() -> impl IntoResponse {
        let response = json!({
            "status": "alive",
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        (StatusCode::OK, Json(response))
    }
}

fn status_for(err: &RegistrarError) -> StatusCode {
    match err {
        RegistrarError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        RegistrarError::NotRegistered => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&RegistrarError::InvalidArgument("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_for(&RegistrarError::NotRegistered), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&RegistrarError::Store("down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&RegistrarError::Encoding("bad".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
