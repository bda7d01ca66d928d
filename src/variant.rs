//! Deterministic weighted choice of one content variant among siblings.
//!
//! Selection never touches a process-global RNG: the bucket index comes from a
//! SHA-256 digest of a versioned `(stable_key, seed)` string, so the same inputs
//! pick the same variant on every machine.

use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

/// Versioned prefix of the hashed input. Bump only together with a migration note:
/// changing it reshuffles every seeded exercise.
const SELECTION_DIGEST_VERSION: &str = "variant-select/v1";
const NO_SEED_MARKER: &str = "no-seed";

/// One content variant. `payload` is opaque to the selector.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VariantCandidate<P> {
  pub id: String,
  #[serde(default = "default_weight", deserialize_with = "lenient_weight")]
  pub weight: u32,
  #[serde(flatten)]
  pub payload: P,
}

impl<P> VariantCandidate<P> {
  pub fn new(id: impl Into<String>, weight: u32, payload: P) -> Self {
    Self { id: id.into(), weight, payload }
  }

  /// Weight used for bucketing; zero is treated as 1.
  pub fn effective_weight(&self) -> u64 {
    if self.weight == 0 { 1 } else { u64::from(self.weight) }
  }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
  #[default]
  SeededWeighted,
  Fixed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariantError {
  #[error("no variants available for '{stable_key}'")]
  NoVariantsAvailable { stable_key: String },
  #[error("variant '{requested}' not found (available: {})", available.join(", "))]
  VariantNotFound { requested: String, available: Vec<String> },
  #[error("fixed selection requires a variant id")]
  MissingFixedId,
}

/// Pick one candidate.
///
/// `Fixed` returns the candidate whose id equals `fixed_id`. `SeededWeighted`
/// buckets `stable_u32(stable_key, seed) % total_weight` over cumulative weights
/// in list order.
pub fn select<'a, P>(
  candidates: &'a [VariantCandidate<P>],
  seed: Option<i64>,
  stable_key: &str,
  mode: SelectionMode,
  fixed_id: Option<&str>,
) -> Result<&'a VariantCandidate<P>, VariantError> {
  if candidates.is_empty() {
    return Err(VariantError::NoVariantsAvailable { stable_key: stable_key.to_string() });
  }

  match mode {
    SelectionMode::Fixed => {
      let wanted = fixed_id.ok_or(VariantError::MissingFixedId)?;
      candidates.iter().find(|c| c.id == wanted).ok_or_else(|| VariantError::VariantNotFound {
        requested: wanted.to_string(),
        available: candidates.iter().map(|c| c.id.clone()).collect(),
      })
    }
    SelectionMode::SeededWeighted => {
      let total: u64 = candidates.iter().map(VariantCandidate::effective_weight).sum();
      let roll = u64::from(stable_u32(stable_key, seed)) % total;

      let mut upper = 0u64;
      for candidate in candidates {
        upper += candidate.effective_weight();
        if roll < upper {
          debug!(target: "exercise", %stable_key, ?seed, roll, total, chosen = %candidate.id, "Variant selected");
          return Ok(candidate);
        }
      }
      // roll < total, so the loop always returns before this.
      candidates
        .last()
        .ok_or_else(|| VariantError::NoVariantsAvailable { stable_key: stable_key.to_string() })
    }
  }
}

/// First four bytes (big-endian) of SHA-256 over the versioned selection input.
pub fn stable_u32(stable_key: &str, seed: Option<i64>) -> u32 {
  let seed_part = match seed {
    Some(s) => s.to_string(),
    None => NO_SEED_MARKER.to_string(),
  };
  let mut hasher = Sha256::new();
  hasher.update(SELECTION_DIGEST_VERSION.as_bytes());
  hasher.update(b":");
  hasher.update(stable_key.as_bytes());
  hasher.update(b":");
  hasher.update(seed_part.as_bytes());
  let digest = hasher.finalize();
  u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

fn default_weight() -> u32 { 1 }

/// Accept any JSON/TOML value for a weight; anything that isn't a positive integer
/// (including floats < 1, strings that don't parse, booleans) becomes 1.
fn lenient_weight<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum RawWeight {
    Int(i64),
    Float(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
  }

  let positive = |n: i64| if n > 0 { u32::try_from(n).unwrap_or(u32::MAX) } else { 1 };
  Ok(match RawWeight::deserialize(deserializer)? {
    RawWeight::Int(n) => positive(n),
    RawWeight::Float(f) if f.is_finite() && f >= 1.0 => positive(f.trunc() as i64),
    RawWeight::Float(_) => 1,
    RawWeight::Text(s) => s.trim().parse::<i64>().map(positive).unwrap_or(1),
    RawWeight::Other(_) => 1,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn two(w1: u32, w2: u32) -> Vec<VariantCandidate<()>> {
    vec![VariantCandidate::new("v1", w1, ()), VariantCandidate::new("v2", w2, ())]
  }

  #[test]
  fn empty_candidates_error() {
    let none: Vec<VariantCandidate<()>> = vec![];
    let err = select(&none, Some(1), "k", SelectionMode::SeededWeighted, None).unwrap_err();
    assert_eq!(err, VariantError::NoVariantsAvailable { stable_key: "k".into() });
  }

  #[test]
  fn fixed_mode_returns_exact_match() {
    let c = two(1, 1);
    let got = select(&c, None, "k", SelectionMode::Fixed, Some("v1")).unwrap();
    assert_eq!(got.id, "v1");
  }

  #[test]
  fn fixed_mode_lists_available_ids() {
    let c = two(1, 1);
    let err = select(&c, None, "k", SelectionMode::Fixed, Some("v3")).unwrap_err();
    assert_eq!(
      err,
      VariantError::VariantNotFound { requested: "v3".into(), available: vec!["v1".into(), "v2".into()] }
    );
    assert_eq!(err.to_string(), "variant 'v3' not found (available: v1, v2)");
  }

  #[test]
  fn fixed_mode_without_id_errors() {
    let c = two(1, 1);
    assert_eq!(select(&c, None, "k", SelectionMode::Fixed, None).unwrap_err(), VariantError::MissingFixedId);
  }

  #[test]
  fn seeded_selection_is_deterministic() {
    let c: Vec<_> = (0..5).map(|i| VariantCandidate::new(format!("v{i}"), i + 1, ())).collect();
    for seed in [None, Some(0), Some(-7), Some(i64::MAX)] {
      let a = select(&c, seed, "6e:addition", SelectionMode::SeededWeighted, None).unwrap();
      let b = select(&c, seed, "6e:addition", SelectionMode::SeededWeighted, None).unwrap();
      assert_eq!(a.id, b.id);
    }
  }

  #[test]
  fn digest_is_pinned() {
    // sha256("variant-select/v1:k:1") = 20c6435e...
    assert_eq!(stable_u32("k", Some(1)), 0x20c6_435e);
    // sha256("variant-select/v1:k:no-seed") = fbe4b2b2...
    assert_eq!(stable_u32("k", None), 0xfbe4_b2b2);
    assert_ne!(stable_u32("k", Some(1)), stable_u32("k", Some(2)));
  }

  #[test]
  fn heavier_variant_wins_more_often() {
    let c = two(1, 10);
    let mut counts = [0usize; 2];
    for seed in 0..1000i64 {
      let got = select(&c, Some(seed), "exo-42", SelectionMode::SeededWeighted, None).unwrap();
      counts[if got.id == "v1" { 0 } else { 1 }] += 1;
    }
    assert!(counts[1] > counts[0], "counts = {counts:?}");
  }

  #[test]
  fn zero_weight_counts_as_one() {
    let c = two(0, 0);
    let mut seen_v1 = false;
    let mut seen_v2 = false;
    for seed in 0..200i64 {
      match select(&c, Some(seed), "k", SelectionMode::SeededWeighted, None).unwrap().id.as_str() {
        "v1" => seen_v1 = true,
        _ => seen_v2 = true,
      }
    }
    assert!(seen_v1 && seen_v2);
  }

  #[test]
  fn lenient_weight_coerces_bad_values() {
    #[derive(Deserialize)]
    struct Row {
      #[serde(default = "default_weight", deserialize_with = "lenient_weight")]
      weight: u32,
    }
    let parse = |s: &str| serde_json::from_str::<Row>(s).unwrap().weight;
    assert_eq!(parse(r#"{"weight": 3}"#), 3);
    assert_eq!(parse(r#"{"weight": 0}"#), 1);
    assert_eq!(parse(r#"{"weight": -4}"#), 1);
    assert_eq!(parse(r#"{"weight": "5"}"#), 5);
    assert_eq!(parse(r#"{"weight": "lots"}"#), 1);
    assert_eq!(parse(r#"{"weight": 2.7}"#), 2);
    assert_eq!(parse(r#"{"weight": null}"#), 1);
    assert_eq!(parse(r#"{}"#), 1);
  }
}
