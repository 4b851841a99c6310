//! Frontend configuration handler.

use crate::models::FrontendConfigResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;

/// Handler for GET /api/v1/config/frontend
///
/// Public. Tells the frontend where it is served from so it can build
/// redirect URIs for the identity provider.
pub async fn get_frontend_config(State(state): State<Arc<AppState>>) -> Json<FrontendConfigResponse> {
    Json(FrontendConfigResponse {
        frontend_url: state.config.frontend_url(),
    })
}
