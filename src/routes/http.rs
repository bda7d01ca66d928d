//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs its parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{Path, State}, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::error::EngineError;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, body), fields(%body.exercise_id, difficulty = ?body.difficulty, seed = ?body.seed))]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerateIn>,
) -> Result<Json<ExerciseOut>, EngineError> {
  let out = generate_exercise(&state, &body)?;
  info!(target: "exercise", id = %out.exercise_id, variant = %out.variant_id, difficulty = %out.difficulty, "HTTP exercise served");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_validate_template(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ValidateTemplateIn>,
) -> Result<Json<ValidateTemplateOut>, EngineError> {
  let report = validate_template(&state, &body)?;
  Ok(Json(ValidateTemplateOut { valid: report.is_valid(), report }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_catalog(
  State(state): State<Arc<AppState>>,
  Path(topic): Path<String>,
) -> Result<Json<CatalogOut>, EngineError> {
  let entries = catalog_for_topic(&state, &topic).await?;
  Ok(Json(CatalogOut { topic, entries }))
}

#[instrument(level = "info", skip(state, body), fields(topic = %body.topic))]
pub async fn http_put_source(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<SourceIn>,
) -> Result<Json<ReconcileAllOut>, EngineError> {
  let topics = upsert_source(&state, body.into_record(id)).await?;
  Ok(Json(ReconcileAllOut { topics }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_source(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<ReconcileOut>, EngineError> {
  let out = delete_source(&state, &id).await?;
  info!(target: "catalog", %id, topic = %out.topic, "HTTP source deleted");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_reconcile(State(state): State<Arc<AppState>>) -> Result<Json<ReconcileAllOut>, EngineError> {
  let topics = reconcile_all(state).await?;
  Ok(Json(ReconcileAllOut { topics }))
}
