//! Umbrella error for the service layer. HTTP mapping lives in `routes::error`.

use serde_json::{json, Value};
use thiserror::Error;

use crate::catalog::CatalogStoreError;
use crate::difficulty::DifficultyError;
use crate::generators::GeneratorError;
use crate::template::TemplateError;
use crate::variant::VariantError;

#[derive(Debug, Error)]
pub enum EngineError {
  #[error(transparent)]
  Difficulty(#[from] DifficultyError),
  #[error(transparent)]
  Variant(#[from] VariantError),
  #[error(transparent)]
  Template(#[from] TemplateError),
  #[error(transparent)]
  Generator(#[from] GeneratorError),
  #[error(transparent)]
  Storage(#[from] CatalogStoreError),
  #[error("unknown exercise '{id}'")]
  UnknownExercise { id: String },
  #[error("unknown source record '{id}'")]
  UnknownSource { id: String },
  #[error("invalid request: {0}")]
  InvalidRequest(String),
  #[error("internal error: {0}")]
  Internal(String),
}

/// Coarse classification used by callers to pick a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
  /// Caller or authoring input is wrong; the detail says exactly what.
  Input,
  NotFound,
  Internal,
}

impl EngineError {
  pub fn class(&self) -> ErrorClass {
    match self {
      EngineError::Difficulty(_)
      | EngineError::Variant(_)
      | EngineError::Template(_)
      | EngineError::Generator(GeneratorError::UnknownGenerator { .. })
      | EngineError::InvalidRequest(_) => ErrorClass::Input,
      EngineError::UnknownExercise { .. } | EngineError::UnknownSource { .. } => ErrorClass::NotFound,
      EngineError::Generator(GeneratorError::Failed { .. }) | EngineError::Storage(_) | EngineError::Internal(_) => {
        ErrorClass::Internal
      }
    }
  }

  /// Stable machine-readable kind.
  pub fn kind(&self) -> &'static str {
    match self {
      EngineError::Difficulty(DifficultyError::Unknown { .. }) => "unknown_difficulty",
      EngineError::Variant(VariantError::NoVariantsAvailable { .. }) => "no_variants_available",
      EngineError::Variant(VariantError::VariantNotFound { .. }) => "variant_not_found",
      EngineError::Variant(VariantError::MissingFixedId) => "missing_variant_id",
      EngineError::Template(TemplateError::ContractViolation(_)) => "template_contract_violation",
      EngineError::Generator(GeneratorError::UnknownGenerator { .. }) => "unknown_generator",
      EngineError::Generator(GeneratorError::Failed { .. }) => "generator_failed",
      EngineError::Storage(_) => "storage_error",
      EngineError::UnknownExercise { .. } => "unknown_exercise",
      EngineError::UnknownSource { .. } => "unknown_source",
      EngineError::InvalidRequest(_) => "invalid_request",
      EngineError::Internal(_) => "internal_error",
    }
  }

  /// Structured detail for input errors: every offending name, every available id.
  pub fn detail(&self) -> Value {
    match self {
      EngineError::Difficulty(DifficultyError::Unknown { label, accepted }) => {
        json!({ "label": label, "accepted": accepted })
      }
      EngineError::Variant(VariantError::VariantNotFound { requested, available }) => {
        json!({ "requested": requested, "available": available })
      }
      EngineError::Variant(VariantError::NoVariantsAvailable { stable_key }) => json!({ "stableKey": stable_key }),
      EngineError::Template(TemplateError::ContractViolation(report)) => {
        json!({ "missing": report.missing, "htmlViolations": report.html_violations })
      }
      EngineError::Generator(GeneratorError::UnknownGenerator { key, available }) => {
        json!({ "generator": key, "available": available })
      }
      EngineError::UnknownExercise { id } | EngineError::UnknownSource { id } => json!({ "id": id }),
      _ => Value::Null,
    }
  }
}
