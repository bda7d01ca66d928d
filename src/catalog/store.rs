//! Storage port for source exercises and catalog projections, plus the in-memory
//! adapter used by the server and the tests.
//!
//! The port is the only place where reconciliation touches shared state. Adapters
//! must reject a second machine-derived projection for the same (topic, generator)
//! with `CatalogStoreError::Duplicate`; plan application relies on that check to
//! stay race-free.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::difficulty::DifficultyLevel;
use crate::domain::{AccessTier, CatalogProjectionRecord, SourceExerciseRecord};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogStoreError {
  /// A projection with this id, or a machine-derived one with the same key, exists.
  #[error("catalog projection already exists: {id}")]
  Duplicate { id: String },
  #[error("catalog record not found: {id}")]
  NotFound { id: String },
  #[error("catalog storage failure: {message}")]
  Backend { message: String },
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
  /// Source records of `topic` flagged dynamic.
  async fn dynamic_sources_for_topic(&self, topic: &str) -> Result<Vec<SourceExerciseRecord>, CatalogStoreError>;

  /// Machine-derived projections of `topic`.
  async fn machine_projections_for_topic(&self, topic: &str) -> Result<Vec<CatalogProjectionRecord>, CatalogStoreError>;

  /// Every projection of `topic`, hand-authored ones included.
  async fn projections_for_topic(&self, topic: &str) -> Result<Vec<CatalogProjectionRecord>, CatalogStoreError>;

  async fn insert_projection(&self, record: &CatalogProjectionRecord) -> Result<(), CatalogStoreError>;

  /// Overwrite only the aggregated fields and the refresh timestamp.
  async fn update_projection_aggregates(
    &self,
    id: &str,
    difficulties: &BTreeSet<DifficultyLevel>,
    tiers: &BTreeSet<AccessTier>,
    refreshed_at: DateTime<Utc>,
  ) -> Result<(), CatalogStoreError>;

  async fn delete_projection(&self, id: &str) -> Result<(), CatalogStoreError>;

  /// Insert or replace a source record; returns the previous version.
  async fn upsert_source(&self, record: SourceExerciseRecord) -> Result<Option<SourceExerciseRecord>, CatalogStoreError>;

  /// Remove a source record; returns it if it existed.
  async fn delete_source(&self, id: &str) -> Result<Option<SourceExerciseRecord>, CatalogStoreError>;

  /// Every topic that has a source record or a projection.
  async fn topics(&self) -> Result<Vec<String>, CatalogStoreError>;
}

/// `HashMap`s behind `RwLock`s. Uniqueness checks run under the write lock, which
/// gives insert the compare-and-swap behaviour the port requires.
#[derive(Clone, Default)]
pub struct InMemoryCatalogStore {
  sources: Arc<RwLock<HashMap<String, SourceExerciseRecord>>>,
  projections: Arc<RwLock<HashMap<String, CatalogProjectionRecord>>>,
}

impl InMemoryCatalogStore {
  pub fn new() -> Self { Self::default() }

  /// Number of projections currently stored (all provenances).
  pub async fn projection_count(&self) -> usize { self.projections.read().await.len() }
}

fn sorted_by_id(mut v: Vec<CatalogProjectionRecord>) -> Vec<CatalogProjectionRecord> {
  v.sort_by(|a, b| a.id.cmp(&b.id));
  v
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
  async fn dynamic_sources_for_topic(&self, topic: &str) -> Result<Vec<SourceExerciseRecord>, CatalogStoreError> {
    let sources = self.sources.read().await;
    let mut out: Vec<SourceExerciseRecord> =
      sources.values().filter(|s| s.topic == topic && s.dynamic).cloned().collect();
    out.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(out)
  }

  async fn machine_projections_for_topic(&self, topic: &str) -> Result<Vec<CatalogProjectionRecord>, CatalogStoreError> {
    let projections = self.projections.read().await;
    Ok(sorted_by_id(
      projections.values().filter(|p| p.topic == topic && p.is_machine_derived()).cloned().collect(),
    ))
  }

  async fn projections_for_topic(&self, topic: &str) -> Result<Vec<CatalogProjectionRecord>, CatalogStoreError> {
    let projections = self.projections.read().await;
    Ok(sorted_by_id(projections.values().filter(|p| p.topic == topic).cloned().collect()))
  }

  #[instrument(level = "debug", skip(self, record), fields(id = %record.id, topic = %record.topic, generator = %record.generator))]
  async fn insert_projection(&self, record: &CatalogProjectionRecord) -> Result<(), CatalogStoreError> {
    let mut projections = self.projections.write().await;
    if projections.contains_key(&record.id) {
      return Err(CatalogStoreError::Duplicate { id: record.id.clone() });
    }
    if record.is_machine_derived() {
      let clash = projections
        .values()
        .find(|p| p.is_machine_derived() && p.topic == record.topic && p.generator == record.generator);
      if let Some(existing) = clash {
        return Err(CatalogStoreError::Duplicate { id: existing.id.clone() });
      }
    }
    projections.insert(record.id.clone(), record.clone());
    debug!(target: "catalog", "Projection inserted");
    Ok(())
  }

  async fn update_projection_aggregates(
    &self,
    id: &str,
    difficulties: &BTreeSet<DifficultyLevel>,
    tiers: &BTreeSet<AccessTier>,
    refreshed_at: DateTime<Utc>,
  ) -> Result<(), CatalogStoreError> {
    let mut projections = self.projections.write().await;
    let record = projections.get_mut(id).ok_or_else(|| CatalogStoreError::NotFound { id: id.to_string() })?;
    record.difficulties = difficulties.clone();
    record.tiers = tiers.clone();
    record.refreshed_at = refreshed_at;
    Ok(())
  }

  async fn delete_projection(&self, id: &str) -> Result<(), CatalogStoreError> {
    match self.projections.write().await.remove(id) {
      Some(_) => Ok(()),
      None => Err(CatalogStoreError::NotFound { id: id.to_string() }),
    }
  }

  async fn upsert_source(&self, record: SourceExerciseRecord) -> Result<Option<SourceExerciseRecord>, CatalogStoreError> {
    Ok(self.sources.write().await.insert(record.id.clone(), record))
  }

  async fn delete_source(&self, id: &str) -> Result<Option<SourceExerciseRecord>, CatalogStoreError> {
    Ok(self.sources.write().await.remove(id))
  }

  async fn topics(&self) -> Result<Vec<String>, CatalogStoreError> {
    let mut topics: BTreeSet<String> = self.sources.read().await.values().map(|s| s.topic.clone()).collect();
    topics.extend(self.projections.read().await.values().map(|p| p.topic.clone()));
    Ok(topics.into_iter().collect())
  }
}
