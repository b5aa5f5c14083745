use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::config::Config;
use crate::error::SwapError;
use crate::orchestrator::SourcePayload;
use crate::service;

pub struct AppState {
    pub config: Config,
}

#[derive(Debug, Deserialize)]
pub struct SwapRequest {
    pub image: String,
    pub gender: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct SwapResponse {
    pub success: bool,
    pub image: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/roles", get(roles))
        .route("/swap", post(swap))
        .with_state(state)
}

pub async fn serve(config: Config, bind: &str) -> Result<()> {
    let app = router(Arc::new(AppState { config }));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    log::info!("listening on {bind}");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn root() -> &'static str {
    "roleswap face swap service\n"
}

async fn roles() -> Json<&'static catalog::Catalog> {
    Json(catalog::all())
}

async fn swap(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SwapRequest>, JsonRejection>,
) -> Result<Json<SwapResponse>, SwapError> {
    let Json(req) = payload.map_err(|e| SwapError::InvalidRequest(e.body_text()))?;

    // Resolve the preset before touching any image data.
    let target = catalog::resolve(&req.gender, &req.role, &state.config.asset_root)?;

    let config = state.config.clone();
    let image = tokio::task::spawn_blocking(move || {
        let service = service::shared(&config)?;
        service.swap(SourcePayload::Base64(&req.image), &target)
    })
    .await
    .map_err(|e| SwapError::Internal(anyhow::anyhow!("swap task failed: {e}")))??;

    Ok(Json(SwapResponse {
        success: true,
        image: format!("data:image/jpeg;base64,{image}"),
    }))
}
