//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::catalog::{ApplyReport, ReconciliationPlan};
use crate::domain::{AccessTier, CatalogProjectionRecord, SourceExerciseRecord};
use crate::template::{TemplateSpec, ValidationReport, VariableBag};
use crate::variant::SelectionMode;

#[derive(Debug, Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

/// Body of `POST /api/v1/exercises/generate`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateIn {
    pub exercise_id: String,
    /// Any accepted label or synonym; missing means "moyen".
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub seed: Option<i64>,
    /// Overrides the default `"{exerciseId}:{difficulty}"` selection key.
    #[serde(default)]
    pub stable_key: Option<String>,
    #[serde(default)]
    pub mode: SelectionMode,
    #[serde(default)]
    pub variant_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseOut {
    pub exercise_id: String,
    pub topic: String,
    pub generator: String,
    pub tier: AccessTier,
    pub requested_difficulty: String,
    /// Level actually served after coercion.
    pub difficulty: String,
    pub variant_id: String,
    /// Seed handed to the generator.
    pub generator_seed: u64,
    pub prompt: String,
    pub answer: String,
}

/// Body of `POST /api/v1/templates/validate`.
///
/// Variables come from `variables` when given, otherwise from a sample run of
/// `generator` at `difficulty`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateTemplateIn {
    pub template: TemplateSpec,
    #[serde(default)]
    pub variables: Option<VariableBag>,
    #[serde(default)]
    pub generator: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateTemplateOut {
    pub valid: bool,
    pub report: ValidationReport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogOut {
    pub topic: String,
    pub entries: Vec<CatalogProjectionRecord>,
}

/// Body of `PUT /api/v1/sources/:id`; the id comes from the path.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceIn {
    pub topic: String,
    #[serde(default)]
    pub generator: Option<String>,
    pub difficulty: String,
    #[serde(default)]
    pub tier: AccessTier,
    #[serde(default)]
    pub dynamic: bool,
}

impl SourceIn {
    pub fn into_record(self, id: String) -> SourceExerciseRecord {
        SourceExerciseRecord {
            id,
            topic: self.topic,
            generator: self.generator,
            difficulty: self.difficulty,
            tier: self.tier,
            dynamic: self.dynamic,
        }
    }
}

/// Result of one topic reconciliation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOut {
    pub topic: String,
    pub plan: ReconciliationPlan,
    pub report: ApplyReport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileAllOut {
    pub topics: Vec<ReconcileOut>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOut {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub detail: serde_json::Value,
}
