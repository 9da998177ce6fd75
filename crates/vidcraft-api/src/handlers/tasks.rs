//! Generic task status polling.

use axum::extract::{Path, State};
use axum::Json;

use vidcraft_models::{Task, TaskId};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Full task record. Unknown and expired ids are both 404.
pub async fn get_task_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<Task>> {
    let id = TaskId::from_string(task_id);
    state
        .narrative
        .task_status(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("task not found: {}", id)))
}
