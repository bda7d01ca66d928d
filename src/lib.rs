//! Exercise generation consistency engine for school maths exercises.
//!
//! - `difficulty`: canonical levels, label normalization, coercion
//! - `variant`: deterministic weighted variant selection
//! - `template`: escaped/raw placeholder contract, validation and rendering
//! - `catalog`: reconciliation of machine-derived catalog projections
//! - `generators`: key-addressed exercise generators
//! - `routes`: the axum HTTP surface

pub mod catalog;
pub mod config;
pub mod difficulty;
pub mod domain;
pub mod error;
pub mod generators;
pub mod logic;
pub mod protocol;
pub mod routes;
pub mod seeds;
pub mod state;
pub mod telemetry;
pub mod template;
pub mod variant;

pub use error::EngineError;
