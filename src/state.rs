//! Application state: exercise definitions, generator registry, catalog store and cache.
//!
//! This module owns:
//!   - exercise definitions (TOML bank first, built-in seeds fill the gaps)
//!   - the generator registry
//!   - the catalog store behind the `CatalogStore` port
//!   - the per-topic catalog read cache and reconciliation locks
//!
//! Definitions are immutable after startup; everything mutable sits behind the store.

use std::{collections::HashMap, sync::Arc, time::Duration};
use tracing::{error, info, instrument, warn};

use crate::catalog::{CatalogCache, CatalogStore, InMemoryCatalogStore, TopicLocks};
use crate::config::{load_engine_config_from_env, EngineConfig};
use crate::domain::{DefinitionSource, ExerciseDefinition};
use crate::error::EngineError;
use crate::generators::{GenerationParams, GeneratorRegistry};
use crate::seeds::{seed_definitions, seed_sources};
use crate::template::validate;

pub struct AppState {
    pub definitions: HashMap<String, ExerciseDefinition>,
    pub generators: GeneratorRegistry,
    pub store: Arc<dyn CatalogStore>,
    pub catalog_cache: CatalogCache,
    pub topic_locks: TopicLocks,
}

impl AppState {
    /// Assemble state from parts. No store priming, no definition checks.
    pub fn from_parts(
        definitions: Vec<ExerciseDefinition>,
        generators: GeneratorRegistry,
        store: Arc<dyn CatalogStore>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            definitions: definitions.into_iter().map(|d| (d.id.clone(), d)).collect(),
            generators,
            store,
            catalog_cache: CatalogCache::new(cache_ttl),
            topic_locks: TopicLocks::new(),
        }
    }

    /// Build state from env: load config, merge definitions with seeds, prime the store.
    pub async fn from_env() -> Result<Self, EngineError> {
        Self::from_config(load_engine_config_from_env()).await
    }

    /// Build state from an optional config, backed by an in-memory store.
    #[instrument(level = "info", skip_all)]
    pub async fn from_config(cfg_opt: Option<EngineConfig>) -> Result<Self, EngineError> {
        let generators = GeneratorRegistry::with_builtins();
        let cfg = cfg_opt.unwrap_or_default();

        let mut id_map = HashMap::<String, ExerciseDefinition>::new();

        // Config bank entries win over seeds with the same id.
        for ec in &cfg.exercises {
            let id = ec.resolved_id();
            if ec.variants.is_empty() {
                error!(target: "exercise", %id, "Skipping bank item: no variants.");
                continue;
            }
            if let Err(e) = generators.get(&ec.generator) {
                error!(target: "exercise", %id, error = %e, "Skipping bank item: unknown generator.");
                continue;
            }
            let def = ExerciseDefinition {
                id: id.clone(),
                topic: ec.topic.clone(),
                generator: ec.generator.clone(),
                tier: ec.tier,
                variants: ec.variants.clone(),
                source: DefinitionSource::LocalBank,
            };
            id_map.insert(id, def);
        }

        for d in seed_definitions() {
            id_map.entry(d.id.clone()).or_insert(d);
        }

        let state = Self::from_parts(
            id_map.into_values().collect(),
            generators,
            Arc::new(InMemoryCatalogStore::new()),
            cfg.catalog.cache_ttl(),
        );
        state.check_definitions();

        // Prime the store: seed sources, then config sources (which replace seeds by id).
        for s in seed_sources().into_iter().chain(cfg.sources.iter().cloned()) {
            state.store.upsert_source(s).await?;
        }
        for hp in &cfg.hand_projections {
            state.store.insert_projection(&hp.to_record()).await?;
        }

        state.log_inventory();
        Ok(state)
    }

    /// Check every variant against a sample bag of its generator. Problems are
    /// logged; requests hitting a broken variant get the full report.
    fn check_definitions(&self) {
        for def in self.definitions.values() {
            let generator = match self.generators.get(&def.generator) {
                Ok(g) => g,
                Err(e) => {
                    error!(target: "exercise", id = %def.id, error = %e, "Definition references an unknown generator");
                    continue;
                }
            };
            for difficulty in generator.supported_difficulties() {
                let bag = match generator.generate(&GenerationParams { difficulty, seed: 0 }) {
                    Ok(b) => b,
                    Err(e) => {
                        warn!(target: "exercise", id = %def.id, %difficulty, error = %e, "Sample generation failed");
                        continue;
                    }
                };
                for v in &def.variants {
                    let report = validate(&v.payload, &bag);
                    if !report.is_valid() {
                        warn!(target: "exercise", id = %def.id, variant = %v.id, %difficulty, %report, "Variant breaks its template contract");
                    }
                }
            }
        }
    }

    fn log_inventory(&self) {
        // Inventory summary by topic/source.
        let mut count_by_topic: HashMap<&str, (usize, usize)> = HashMap::new();
        for def in self.definitions.values() {
            let entry = count_by_topic.entry(def.topic.as_str()).or_insert((0, 0));
            match def.source {
                DefinitionSource::LocalBank => entry.0 += 1,
                DefinitionSource::Seed => entry.1 += 1,
            }
        }
        for (topic, (bank, seed)) in count_by_topic {
            info!(target: "exercise", %topic, local_bank = bank, seed = seed, "Startup exercise inventory");
        }
        info!(target: "exomaths_backend", generators = ?self.generators.keys(), cache_ttl_secs = self.catalog_cache.ttl().as_secs(), "Engine state ready");
    }

    /// Read-only access to a definition by id.
    pub fn definition(&self, id: &str) -> Result<&ExerciseDefinition, EngineError> {
        self.definitions
            .get(id)
            .ok_or_else(|| EngineError::UnknownExercise { id: id.to_string() })
    }
}
