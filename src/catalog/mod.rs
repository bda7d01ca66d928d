//! Catalog reconciliation: keeps the read-optimized projection collection in step
//! with the authored source exercises.
//!
//! Flow:
//! 1) `reconcile` groups a topic's dynamic sources by generator key and compares the
//!    aggregates with the existing machine-derived projections. It is pure and
//!    returns a `ReconciliationPlan`.
//! 2) `apply::apply_plan` executes the plan against a `CatalogStore`.
//!
//! Hand-authored projections are never read into the plan, so they can't be
//! updated or deleted by it.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::difficulty::{normalize, DifficultyLevel};
use crate::domain::{AccessTier, CatalogProjectionRecord, Provenance, SourceExerciseRecord};

pub mod apply;
pub mod cache;
pub mod store;

pub use apply::{apply_plan, ApplyReport};
pub use cache::CatalogCache;
pub use store::{CatalogStore, CatalogStoreError, InMemoryCatalogStore};

/// Namespace of machine-derived projection ids (UUID v5).
const PROJECTION_NAMESPACE: Uuid = Uuid::from_u128(0x6a1f_4c3e_9b27_5d10_8e44_c2f0_a7b3_1d59);

/// Deterministic id of the machine-derived projection for `(topic, generator)`.
pub fn projection_id(topic: &str, generator: &str) -> String {
  let name = format!("{topic}\u{1f}{generator}");
  Uuid::new_v5(&PROJECTION_NAMESPACE, name.as_bytes()).to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReconcileAction {
  Create {
    projection: CatalogProjectionRecord,
  },
  /// Touches only the aggregates and the refresh timestamp.
  Update {
    id: String,
    topic: String,
    generator: String,
    difficulties: BTreeSet<DifficultyLevel>,
    tiers: BTreeSet<AccessTier>,
    refreshed_at: DateTime<Utc>,
  },
  Delete {
    id: String,
    topic: String,
    generator: String,
  },
}

impl ReconcileAction {
  pub fn generator(&self) -> &str {
    match self {
      ReconcileAction::Create { projection } => &projection.generator,
      ReconcileAction::Update { generator, .. } | ReconcileAction::Delete { generator, .. } => generator,
    }
  }

  pub fn id(&self) -> &str {
    match self {
      ReconcileAction::Create { projection } => &projection.id,
      ReconcileAction::Update { id, .. } | ReconcileAction::Delete { id, .. } => id,
    }
  }
}

/// Source records that couldn't fully take part in aggregation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
  /// Dynamic record without a generator key; it can't be keyed.
  MissingGeneratorKey { source_id: String },
  /// Label outside the taxonomy; left out of the difficulty union.
  UnknownDifficulty { source_id: String, label: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReconciliationPlan {
  pub topic: String,
  pub actions: Vec<ReconcileAction>,
  pub diagnostics: Vec<Diagnostic>,
}

impl ReconciliationPlan {
  pub fn is_empty(&self) -> bool { self.actions.is_empty() }

  pub fn counts(&self) -> (usize, usize, usize) {
    let mut c = (0, 0, 0);
    for a in &self.actions {
      match a {
        ReconcileAction::Create { .. } => c.0 += 1,
        ReconcileAction::Update { .. } => c.1 += 1,
        ReconcileAction::Delete { .. } => c.2 += 1,
      }
    }
    c
  }
}

#[derive(Default)]
struct Aggregate {
  difficulties: BTreeSet<DifficultyLevel>,
  tiers: BTreeSet<AccessTier>,
}

/// Compute the actions that bring `existing` in line with `sources` for `topic`.
///
/// Records of other topics, non-dynamic sources and hand-authored projections are
/// ignored. Actions come out in generator-key order, creates/updates first, then
/// deletes, so the same input always yields the same plan.
pub fn reconcile(
  topic: &str,
  sources: &[SourceExerciseRecord],
  existing: &[CatalogProjectionRecord],
  now: DateTime<Utc>,
) -> ReconciliationPlan {
  let mut diagnostics = Vec::new();
  let mut groups: BTreeMap<&str, Aggregate> = BTreeMap::new();

  for source in sources.iter().filter(|s| s.topic == topic && s.dynamic) {
    let generator = match source.generator.as_deref().map(str::trim) {
      Some(g) if !g.is_empty() => g,
      _ => {
        diagnostics.push(Diagnostic::MissingGeneratorKey { source_id: source.id.clone() });
        continue;
      }
    };
    let agg = groups.entry(generator).or_default();
    agg.tiers.insert(source.tier);
    match normalize(&source.difficulty) {
      Ok(level) => {
        agg.difficulties.insert(level);
      }
      Err(_) => diagnostics.push(Diagnostic::UnknownDifficulty {
        source_id: source.id.clone(),
        label: source.difficulty.clone(),
      }),
    }
  }

  let mut by_key: BTreeMap<&str, Vec<&CatalogProjectionRecord>> = BTreeMap::new();
  for p in existing.iter().filter(|p| p.topic == topic && p.provenance == Provenance::MachineDerived) {
    by_key.entry(p.generator.as_str()).or_default().push(p);
  }

  let mut actions = Vec::new();
  let mut deletes = Vec::new();

  for (generator, agg) in groups {
    let derived = projection_id(topic, generator);
    match by_key.remove(generator) {
      None => actions.push(ReconcileAction::Create {
        projection: CatalogProjectionRecord {
          id: derived,
          topic: topic.to_string(),
          generator: generator.to_string(),
          difficulties: agg.difficulties,
          tiers: agg.tiers,
          provenance: Provenance::MachineDerived,
          refreshed_at: now,
        },
      }),
      Some(found) => {
        // Keep the record carrying the derived id, else the first; extras are duplicates.
        let keep = found.iter().position(|p| p.id == derived).unwrap_or(0);
        for (i, p) in found.iter().enumerate() {
          if i != keep {
            deletes.push(delete_action(p));
          }
        }
        let kept = found[keep];
        if !kept.same_aggregates(&agg.difficulties, &agg.tiers) {
          actions.push(ReconcileAction::Update {
            id: kept.id.clone(),
            topic: topic.to_string(),
            generator: generator.to_string(),
            difficulties: agg.difficulties,
            tiers: agg.tiers,
            refreshed_at: now,
          });
        }
      }
    }
  }

  // Whatever is left has no dynamic source any more.
  for orphans in by_key.into_values() {
    deletes.extend(orphans.into_iter().map(delete_action));
  }
  deletes.sort_by(|a, b| (a.generator(), a.id()).cmp(&(b.generator(), b.id())));
  actions.extend(deletes);

  ReconciliationPlan { topic: topic.to_string(), actions, diagnostics }
}

fn delete_action(p: &CatalogProjectionRecord) -> ReconcileAction {
  ReconcileAction::Delete { id: p.id.clone(), topic: p.topic.clone(), generator: p.generator.clone() }
}

/// One async mutex per topic, so read → plan → apply of a topic never interleaves
/// with another run for the same topic. Different topics don't contend.
#[derive(Default)]
pub struct TopicLocks {
  inner: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TopicLocks {
  pub fn new() -> Self { Self::default() }

  pub fn lock_for(&self, topic: &str) -> Arc<Mutex<()>> {
    let mut map = match self.inner.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    map.entry(topic.to_string()).or_default().clone()
  }
}
