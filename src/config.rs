//! Loading engine configuration (catalog cache + optional exercise bank) from TOML.
//!
//! Example:
//!
//! ```toml
//! [catalog]
//! cache_ttl_secs = 120
//!
//! [[exercises]]
//! topic = "5e-fractions"
//! generator = "fractions_simplification"
//! tier = "premium"
//!
//!   [[exercises.variants]]
//!   id = "courte"
//!   weight = 2
//!   prompt = "Simplifie {{{fraction_html}}}."
//!   answer = "{{numerateur_simplifie}}/{{denominateur_simplifie}}"
//!   raw_allowlist = ["fraction_html"]
//!
//! [[sources]]
//! id = "fr-12"
//! topic = "5e-fractions"
//! generator = "fractions_simplification"
//! difficulty = "facile"
//! tier = "gratuit"
//! dynamic = true
//!
//! [[hand_projections]]
//! id = "vitrine-fractions"
//! topic = "5e-fractions"
//! generator = "fractions_simplification"
//! difficulties = ["facile", "difficile"]
//! tiers = ["premium"]
//! ```

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::difficulty::normalize;
use crate::domain::{AccessTier, CatalogProjectionRecord, Provenance, SourceExerciseRecord};
use crate::template::TemplateSpec;
use crate::variant::VariantCandidate;

const DEFAULT_CACHE_TTL_SECS: u64 = 300;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct EngineConfig {
  #[serde(default)]
  pub catalog: CatalogCfg,
  #[serde(default)]
  pub exercises: Vec<ExerciseCfg>,
  #[serde(default)]
  pub sources: Vec<SourceExerciseRecord>,
  #[serde(default)]
  pub hand_projections: Vec<HandProjectionCfg>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CatalogCfg {
  #[serde(default = "default_cache_ttl_secs")]
  pub cache_ttl_secs: u64,
}

impl Default for CatalogCfg {
  fn default() -> Self { Self { cache_ttl_secs: DEFAULT_CACHE_TTL_SECS } }
}

impl CatalogCfg {
  pub fn cache_ttl(&self) -> Duration { Duration::from_secs(self.cache_ttl_secs) }
}

fn default_cache_ttl_secs() -> u64 { DEFAULT_CACHE_TTL_SECS }

/// Exercise entry accepted in the TOML bank.
#[derive(Clone, Debug, Deserialize)]
pub struct ExerciseCfg {
  /// Defaults to `"{topic}:{generator}"`.
  #[serde(default)] pub id: Option<String>,
  pub topic: String,
  pub generator: String,
  #[serde(default)] pub tier: AccessTier,
  #[serde(default)] pub variants: Vec<VariantCandidate<TemplateSpec>>,
}

impl ExerciseCfg {
  pub fn resolved_id(&self) -> String {
    self.id.clone().unwrap_or_else(|| format!("{}:{}", self.topic, self.generator))
  }
}

/// Hand-authored catalog entry; the reconciler never touches these.
#[derive(Clone, Debug, Deserialize)]
pub struct HandProjectionCfg {
  pub id: String,
  pub topic: String,
  pub generator: String,
  #[serde(default)] pub difficulties: Vec<String>,
  #[serde(default)] pub tiers: Vec<AccessTier>,
}

impl HandProjectionCfg {
  /// Unknown difficulty labels are dropped with a warning.
  pub fn to_record(&self) -> CatalogProjectionRecord {
    let mut difficulties = BTreeSet::new();
    for label in &self.difficulties {
      match normalize(label) {
        Ok(level) => {
          difficulties.insert(level);
        }
        Err(e) => warn!(target: "catalog", id = %self.id, error = %e, "Dropping label from hand-authored projection"),
      }
    }
    CatalogProjectionRecord {
      id: self.id.clone(),
      topic: self.topic.clone(),
      generator: self.generator.clone(),
      difficulties,
      tiers: self.tiers.iter().copied().collect(),
      provenance: Provenance::HandAuthored,
      refreshed_at: Utc::now(),
    }
  }
}

pub fn parse_engine_config(text: &str) -> Result<EngineConfig, toml::de::Error> { toml::from_str(text) }

/// Attempt to load `EngineConfig` from EXERCISE_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_engine_config_from_env() -> Option<EngineConfig> {
  let path = std::env::var("EXERCISE_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_engine_config(&s) {
      Ok(cfg) => {
        info!(target: "exomaths_backend", %path, exercises = cfg.exercises.len(), sources = cfg.sources.len(), "Loaded engine config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "exomaths_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "exomaths_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
