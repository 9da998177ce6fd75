//! Render handlers. Every route acts on the caller's own renders.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};

use vidcraft_models::{Render, RenderId, TaskType};
use vidcraft_worker::{CreateRenderRequest, RenderFilter, RenderPage, RenderProgress};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CreateRenderResponse {
    pub task_id: String,
    pub render: Render,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub url: String,
}

/// Create a render for an owned project and queue it.
pub async fn create_render(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CreateRenderRequest>, JsonRejection>,
) -> ApiResult<Json<CreateRenderResponse>> {
    let Json(body) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let render = state
        .render
        .create_render(&user.uid, body)
        .await
        .map_err(|e| {
            if e.is_queue_full() {
                warn!(user_id = %user.uid, "Render queue full, rejecting render");
                metrics::record_queue_rejection("render");
            }
            ApiError::from(e)
        })?;

    metrics::record_task_submitted(TaskType::Render.as_str());
    info!(user_id = %user.uid, render_id = %render.id, "Render accepted");

    Ok(Json(CreateRenderResponse {
        task_id: render.id.to_string(),
        render,
    }))
}

pub async fn list_renders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<RenderFilter>,
) -> ApiResult<Json<RenderPage>> {
    Ok(Json(state.render.list_renders(&user.uid, &filter).await?))
}

pub async fn get_render(
    State(state): State<AppState>,
    user: AuthUser,
    Path(render_id): Path<String>,
) -> ApiResult<Json<Render>> {
    let id = RenderId::from_string(render_id);
    Ok(Json(state.render.get_render(&user.uid, &id).await?))
}

/// Delete the record and, once completed, its artifact.
pub async fn delete_render(
    State(state): State<AppState>,
    user: AuthUser,
    Path(render_id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = RenderId::from_string(render_id);
    state.render.delete_render(&user.uid, &id).await?;
    info!(user_id = %user.uid, render_id = %id, "Render deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_render_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(render_id): Path<String>,
) -> ApiResult<Json<RenderProgress>> {
    let id = RenderId::from_string(render_id);
    Ok(Json(state.render.get_render_status(&user.uid, &id).await?))
}

/// Presigned download URL for a completed render.
pub async fn download_render(
    State(state): State<AppState>,
    user: AuthUser,
    Path(render_id): Path<String>,
) -> ApiResult<Json<DownloadResponse>> {
    let id = RenderId::from_string(render_id);
    let url = state.render.download_render(&user.uid, &id).await?;
    Ok(Json(DownloadResponse { url }))
}
