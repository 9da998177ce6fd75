//! Narrative submission handlers.
//!
//! Each endpoint validates its body, hands a [`NarrativeRequest`] to the
//! pipeline and answers with the new task id. Work happens on the narrative
//! worker pool; clients poll `/task/:id/status`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use vidcraft_worker::NarrativeRequest;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct NovelToVideoRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "novel is required"))]
    pub novel: String,
}

/// Body shared by novel-to-all and generate-novel.
#[derive(Debug, Deserialize, Validate)]
pub struct NovelPromptRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "novel_prompt is required"))]
    pub novel_prompt: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TaskAccepted {
    pub task_id: String,
}

/// Story text straight to a narrated video.
pub async fn novel_to_video(
    State(state): State<AppState>,
    payload: Result<Json<NovelToVideoRequest>, JsonRejection>,
) -> ApiResult<Json<TaskAccepted>> {
    let Json(body) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    body.validate()?;

    submit(&state, NarrativeRequest::NovelToVideo { novel: body.novel }).await
}

/// Premise and title to a narrated video.
pub async fn novel_to_all(
    State(state): State<AppState>,
    payload: Result<Json<NovelPromptRequest>, JsonRejection>,
) -> ApiResult<Json<TaskAccepted>> {
    let Json(body) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    body.validate()?;

    submit(
        &state,
        NarrativeRequest::NovelToAll {
            novel_prompt: body.novel_prompt,
            title: body.title,
        },
    )
    .await
}

/// Premise and title to novel text only.
pub async fn generate_novel(
    State(state): State<AppState>,
    payload: Result<Json<NovelPromptRequest>, JsonRejection>,
) -> ApiResult<Json<TaskAccepted>> {
    let Json(body) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    body.validate()?;

    submit(
        &state,
        NarrativeRequest::GenerateNovel {
            novel_prompt: body.novel_prompt,
            title: body.title,
        },
    )
    .await
}

async fn submit(state: &AppState, request: NarrativeRequest) -> ApiResult<Json<TaskAccepted>> {
    let task_type = request.task_type();

    let task = state.narrative.submit(request).await.map_err(|e| {
        if e.is_queue_full() {
            warn!(task_type = task_type.as_str(), "Narrative queue full, rejecting task");
            metrics::record_queue_rejection("narrative");
        }
        ApiError::from(e)
    })?;

    metrics::record_task_submitted(task_type.as_str());
    info!(task_id = %task.id, task_type = task_type.as_str(), "Narrative task accepted");

    Ok(Json(TaskAccepted {
        task_id: task.id.to_string(),
    }))
}
