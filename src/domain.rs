//! Domain models: authored source exercises, catalog projections and the exercise
//! definitions the generation path works from.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::difficulty::DifficultyLevel;
use crate::template::TemplateSpec;
use crate::variant::VariantCandidate;

/// Who may see an exercise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessTier {
  #[serde(alias = "free")]
  Gratuit,
  #[serde(alias = "paid")]
  Premium,
}
impl Default for AccessTier {
  fn default() -> Self { AccessTier::Gratuit }
}

/// Who owns a catalog record's lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
  /// Created, updated and deleted only by the reconciler.
  MachineDerived,
  /// Edited by people; the reconciler never touches it.
  HandAuthored,
}

/// One authored exercise, as stored by the authoring layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceExerciseRecord {
  pub id: String,
  /// Chapter/topic key, e.g. "4e-fractions".
  pub topic: String,
  /// `None` for hand-written fixed content.
  #[serde(default)]
  pub generator: Option<String>,
  /// Free-form label; normalized during reconciliation.
  #[serde(default)]
  pub difficulty: String,
  #[serde(default)]
  pub tier: AccessTier,
  /// Generated on demand (true) vs fixed content (false).
  #[serde(default)]
  pub dynamic: bool,
}

/// Read-optimized catalog entry keyed by (topic, generator).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProjectionRecord {
  pub id: String,
  pub topic: String,
  pub generator: String,
  pub difficulties: BTreeSet<DifficultyLevel>,
  pub tiers: BTreeSet<AccessTier>,
  pub provenance: Provenance,
  pub refreshed_at: DateTime<Utc>,
}

impl CatalogProjectionRecord {
  pub fn is_machine_derived(&self) -> bool { self.provenance == Provenance::MachineDerived }

  pub fn same_aggregates(&self, difficulties: &BTreeSet<DifficultyLevel>, tiers: &BTreeSet<AccessTier>) -> bool {
    &self.difficulties == difficulties && &self.tiers == tiers
  }
}

/// Where a definition came from.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionSource {
  /// From the TOML bank.
  LocalBank,
  /// Built-in seeds (last resort).
  Seed,
}

/// A generatable exercise: which generator feeds it and which text variants it has.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExerciseDefinition {
  pub id: String,
  pub topic: String,
  pub generator: String,
  #[serde(default)]
  pub tier: AccessTier,
  pub variants: Vec<VariantCandidate<TemplateSpec>>,
  pub source: DefinitionSource,
}
