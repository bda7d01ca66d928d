//! Generator port: a key-addressed registry of exercise generators.
//!
//! Each generator turns `(difficulty, seed)` into a `VariableBag`. The math content
//! is entirely the generator's business; the engine only checks the bag against
//! templates. Generators must be deterministic for a given seed.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::difficulty::DifficultyLevel;
use crate::template::VariableBag;

mod builtin;

pub use builtin::{AdditionEntiers, EquationPremierDegre, FractionsSimplification};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenerationParams {
  pub difficulty: DifficultyLevel,
  pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
  #[error("unknown generator '{key}' (available: {})", available.join(", "))]
  UnknownGenerator { key: String, available: Vec<String> },
  #[error("generator '{key}' failed: {message}")]
  Failed { key: String, message: String },
}

pub trait ExerciseGenerator: Send + Sync {
  fn key(&self) -> &str;

  fn supported_difficulties(&self) -> Vec<DifficultyLevel>;

  fn generate(&self, params: &GenerationParams) -> Result<VariableBag, GeneratorError>;
}

/// Explicit key → generator map, built at startup and injected where needed.
#[derive(Clone, Default)]
pub struct GeneratorRegistry {
  generators: BTreeMap<String, Arc<dyn ExerciseGenerator>>,
}

impl GeneratorRegistry {
  pub fn new() -> Self { Self::default() }

  /// Registry holding every generator shipped with the crate.
  pub fn with_builtins() -> Self {
    let mut registry = Self::new();
    registry.register(Arc::new(AdditionEntiers));
    registry.register(Arc::new(FractionsSimplification));
    registry.register(Arc::new(EquationPremierDegre));
    registry
  }

  /// Later registrations replace earlier ones with the same key.
  pub fn register(&mut self, generator: Arc<dyn ExerciseGenerator>) {
    self.generators.insert(generator.key().to_string(), generator);
  }

  pub fn get(&self, key: &str) -> Result<Arc<dyn ExerciseGenerator>, GeneratorError> {
    self.generators.get(key).cloned().ok_or_else(|| GeneratorError::UnknownGenerator {
      key: key.to_string(),
      available: self.keys(),
    })
  }

  pub fn keys(&self) -> Vec<String> { self.generators.keys().cloned().collect() }
}
