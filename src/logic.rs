//! Core behaviors shared by the HTTP handlers and the startup path.
//!
//! This includes:
//!   - Generating an exercise (difficulty → variant → generator → render)
//!   - Validating a template at authoring time
//!   - The catalog lifecycle hook run after source writes, and the full sweep

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::catalog::{apply_plan, reconcile, Diagnostic};
use crate::difficulty::{coerce, normalize};
use crate::domain::{CatalogProjectionRecord, SourceExerciseRecord};
use crate::error::EngineError;
use crate::generators::GenerationParams;
use crate::protocol::{ExerciseOut, GenerateIn, ReconcileOut, ValidateTemplateIn};
use crate::state::AppState;
use crate::template::{render, validate, ValidationReport};
use crate::variant::{select, stable_u32};

/// Produce one rendered exercise.
///
/// The same request (definition, difficulty, seed, key) always renders the same
/// text. Without a seed, the generator seed is derived from the stable key.
#[instrument(level = "info", skip(state, req), fields(exercise_id = %req.exercise_id))]
pub fn generate_exercise(state: &AppState, req: &GenerateIn) -> Result<ExerciseOut, EngineError> {
  let def = state.definition(&req.exercise_id)?;
  let requested = normalize(req.difficulty.as_deref().unwrap_or_default())?;
  let generator = state.generators.get(&def.generator)?;
  let difficulty = coerce(requested, &generator.supported_difficulties());

  let stable_key = req.stable_key.clone().unwrap_or_else(|| format!("{}:{}", def.id, difficulty));
  let variant = select(&def.variants, req.seed, &stable_key, req.mode, req.variant_id.as_deref())?;

  let generator_seed = match req.seed {
    Some(s) => s as u64,
    None => u64::from(stable_u32(&stable_key, None)),
  };
  let bag = generator.generate(&GenerationParams { difficulty, seed: generator_seed })?;
  let rendered = render(&variant.payload, &bag)?;

  info!(target: "exercise", id = %def.id, %requested, %difficulty, variant = %variant.id, generator_seed, "Exercise generated");
  Ok(ExerciseOut {
    exercise_id: def.id.clone(),
    topic: def.topic.clone(),
    generator: def.generator.clone(),
    tier: def.tier,
    requested_difficulty: requested.to_string(),
    difficulty: difficulty.to_string(),
    variant_id: variant.id.clone(),
    generator_seed,
    prompt: rendered.prompt,
    answer: rendered.answer,
  })
}

/// Check a template before it is stored. The report always lists every problem.
#[instrument(level = "info", skip(state, req), fields(generator = ?req.generator))]
pub fn validate_template(state: &AppState, req: &ValidateTemplateIn) -> Result<ValidationReport, EngineError> {
  let bag = match (&req.variables, &req.generator) {
    (Some(bag), _) => bag.clone(),
    (None, Some(key)) => {
      let generator = state.generators.get(key)?;
      let requested = normalize(req.difficulty.as_deref().unwrap_or_default())?;
      let difficulty = coerce(requested, &generator.supported_difficulties());
      generator.generate(&GenerationParams { difficulty, seed: 0 })?
    }
    (None, None) => return Err(EngineError::InvalidRequest("either `variables` or `generator` is required".into())),
  };

  let report = validate(&req.template, &bag);
  if report.is_valid() {
    debug!(target: "exercise", unused = ?report.unused, "Template valid");
  } else {
    info!(target: "exercise", %report, "Template rejected");
  }
  Ok(report)
}

/// Lifecycle hook: bring the machine-derived projections of `topic` in line with
/// its sources. Runs under the topic lock, so read → plan → apply never
/// interleaves with another run on the same topic.
#[instrument(level = "info", skip(state))]
pub async fn on_source_changed(state: &AppState, topic: &str) -> Result<ReconcileOut, EngineError> {
  let lock = state.topic_locks.lock_for(topic);
  let _guard = lock.lock().await;

  let sources = state.store.dynamic_sources_for_topic(topic).await?;
  let existing = state.store.machine_projections_for_topic(topic).await?;
  let plan = reconcile(topic, &sources, &existing, Utc::now());

  for d in &plan.diagnostics {
    match d {
      Diagnostic::MissingGeneratorKey { source_id } => {
        warn!(target: "catalog", %topic, %source_id, "Dynamic source without generator key skipped")
      }
      Diagnostic::UnknownDifficulty { source_id, label } => {
        warn!(target: "catalog", %topic, %source_id, %label, "Unknown difficulty label left out of aggregate")
      }
    }
  }

  // Actions applied before a failure are committed, so the topic is dropped
  // from the cache either way.
  let applied = apply_plan(state.store.as_ref(), &plan).await;
  state.catalog_cache.invalidate(topic).await;
  let report = applied?;

  Ok(ReconcileOut { topic: topic.to_string(), plan, report })
}

/// Store a source record and reconcile every topic it touched (old and new).
#[instrument(level = "info", skip(state, record), fields(id = %record.id, topic = %record.topic))]
pub async fn upsert_source(state: &AppState, record: SourceExerciseRecord) -> Result<Vec<ReconcileOut>, EngineError> {
  let topic = record.topic.clone();
  let previous = state.store.upsert_source(record).await?;

  let mut out = vec![on_source_changed(state, &topic).await?];
  if let Some(prev) = previous.filter(|p| p.topic != topic) {
    info!(target: "catalog", from = %prev.topic, to = %topic, "Source moved between topics");
    out.push(on_source_changed(state, &prev.topic).await?);
  }
  Ok(out)
}

#[instrument(level = "info", skip(state))]
pub async fn delete_source(state: &AppState, id: &str) -> Result<ReconcileOut, EngineError> {
  let removed = state
    .store
    .delete_source(id)
    .await?
    .ok_or_else(|| EngineError::UnknownSource { id: id.to_string() })?;
  on_source_changed(state, &removed.topic).await
}

/// Reconcile every known topic, one task per topic.
#[instrument(level = "info", skip(state))]
pub async fn reconcile_all(state: Arc<AppState>) -> Result<Vec<ReconcileOut>, EngineError> {
  let topics = state.store.topics().await?;
  let mut set = JoinSet::new();
  for topic in topics {
    let state = state.clone();
    set.spawn(async move { on_source_changed(&state, &topic).await });
  }

  let mut out = Vec::new();
  while let Some(joined) = set.join_next().await {
    let outcome = joined.map_err(|e| EngineError::Internal(format!("reconcile task failed: {e}")))??;
    out.push(outcome);
  }
  out.sort_by(|a, b| a.topic.cmp(&b.topic));

  let changed = out.iter().filter(|o| !o.plan.is_empty()).count();
  info!(target: "catalog", topics = out.len(), changed, "Catalog sweep done");
  Ok(out)
}

/// Catalog entries of `topic`, hand-authored ones included, via the read cache.
#[instrument(level = "debug", skip(state))]
pub async fn catalog_for_topic(state: &AppState, topic: &str) -> Result<Vec<CatalogProjectionRecord>, EngineError> {
  if let Some(hit) = state.catalog_cache.get(topic).await {
    return Ok(hit);
  }

  // The miss path holds the topic lock: no reconcile lands between the store
  // read and the cache fill.
  let lock = state.topic_locks.lock_for(topic);
  let _guard = lock.lock().await;
  if let Some(hit) = state.catalog_cache.get(topic).await {
    return Ok(hit);
  }
  let mut records = state.store.projections_for_topic(topic).await?;
  records.sort_by(|a, b| a.generator.cmp(&b.generator).then_with(|| a.id.cmp(&b.id)));
  state.catalog_cache.put(topic, records.clone()).await;
  Ok(records)
}
