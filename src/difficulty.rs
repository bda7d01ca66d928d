//! Canonical difficulty vocabulary: normalization of free-form labels and the
//! downward fallback used when a generator can't serve the requested level.
//!
//! Only `facile`, `moyen` and `difficile` are canonical. Legacy and English labels
//! are folded onto them by `normalize`; anything else is rejected.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Ordered easiest → hardest. The derived `Ord` follows declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
  Facile,
  Moyen,
  Difficile,
}

impl DifficultyLevel {
  /// All canonical levels in canonical order.
  pub const ALL: [DifficultyLevel; 3] = [DifficultyLevel::Facile, DifficultyLevel::Moyen, DifficultyLevel::Difficile];

  pub fn as_str(self) -> &'static str {
    match self {
      DifficultyLevel::Facile => "facile",
      DifficultyLevel::Moyen => "moyen",
      DifficultyLevel::Difficile => "difficile",
    }
  }

  /// Next easier level, `None` for the easiest.
  pub fn easier(self) -> Option<DifficultyLevel> {
    match self {
      DifficultyLevel::Facile => None,
      DifficultyLevel::Moyen => Some(DifficultyLevel::Facile),
      DifficultyLevel::Difficile => Some(DifficultyLevel::Moyen),
    }
  }
}

impl Default for DifficultyLevel {
  fn default() -> Self { DifficultyLevel::Moyen }
}

impl fmt::Display for DifficultyLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl std::str::FromStr for DifficultyLevel {
  type Err = DifficultyError;

  fn from_str(s: &str) -> Result<Self, Self::Err> { normalize(s) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DifficultyError {
  #[error("unknown difficulty '{label}' (accepted: {})", accepted.join(", "))]
  Unknown { label: String, accepted: Vec<String> },
}

impl DifficultyError {
  fn unknown(label: &str) -> Self {
    DifficultyError::Unknown {
      label: label.to_string(),
      accepted: DifficultyLevel::ALL.iter().map(|d| d.as_str().to_string()).collect(),
    }
  }
}

/// Map a free-form label onto the canonical set.
/// Empty (or whitespace-only) input resolves to the middle level.
pub fn normalize(label: &str) -> Result<DifficultyLevel, DifficultyError> {
  let norm = label.trim().to_lowercase();
  match norm.as_str() {
    "" => Ok(DifficultyLevel::Moyen),
    "facile" | "easy" | "simple" => Ok(DifficultyLevel::Facile),
    "moyen" | "standard" | "medium" | "normal" | "intermediaire" | "intermédiaire" => Ok(DifficultyLevel::Moyen),
    "difficile" | "hard" | "difficult" => Ok(DifficultyLevel::Difficile),
    _ => Err(DifficultyError::unknown(label)),
  }
}

/// Resolve `requested` against what a generator supports.
///
/// Walks strictly downward from the requested level; the easiest level is the
/// ultimate fallback even when `supported` is empty. Any change is logged as a
/// coercion event on the `difficulty` target.
pub fn coerce(requested: DifficultyLevel, supported: &[DifficultyLevel]) -> DifficultyLevel {
  if supported.contains(&requested) {
    return requested;
  }

  let mut candidate = requested.easier();
  let resolved = loop {
    match candidate {
      Some(level) if supported.contains(&level) => break level,
      Some(level) => candidate = level.easier(),
      None => break DifficultyLevel::Facile,
    }
  };

  let supported_labels: Vec<&str> = supported.iter().map(|d| d.as_str()).collect();
  info!(
    target: "difficulty",
    requested = %requested,
    resolved = %resolved,
    supported = ?supported_labels,
    "Difficulty coerced"
  );
  resolved
}

/// Deduplicate and fill in missing canonical levels, in canonical order.
pub fn auto_complete(requested: &[DifficultyLevel]) -> Vec<DifficultyLevel> {
  let mut out: Vec<DifficultyLevel> = requested.to_vec();
  for level in DifficultyLevel::ALL {
    if !out.contains(&level) {
      out.push(level);
    }
  }
  out.sort();
  out.dedup();
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use rstest::rstest;
  use std::io;
  use std::sync::{Arc, Mutex};
  use DifficultyLevel::*;

  /// Shared buffer the fmt subscriber writes into.
  #[derive(Clone, Default)]
  struct Captured(Arc<Mutex<Vec<u8>>>);

  impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
      self.0.lock().unwrap().extend_from_slice(buf);
      Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> { Ok(()) }
  }

  fn coerce_with_logs(requested: DifficultyLevel, supported: &[DifficultyLevel]) -> (DifficultyLevel, String) {
    let sink = Captured::default();
    let writer = sink.clone();
    let subscriber = tracing_subscriber::fmt()
      .with_writer(move || writer.clone())
      .with_ansi(false)
      .with_target(true)
      .with_max_level(tracing::Level::TRACE)
      .finish();
    let resolved = tracing::subscriber::with_default(subscriber, || coerce(requested, supported));
    let logs = String::from_utf8(sink.0.lock().unwrap().clone()).unwrap();
    (resolved, logs)
  }

  #[test]
  fn coercion_emits_one_event_with_both_levels() {
    let (resolved, logs) = coerce_with_logs(Difficile, &[Facile, Moyen]);
    assert_eq!(resolved, Moyen);
    assert_eq!(logs.lines().count(), 1, "{logs}");
    assert!(logs.contains("difficulty:"), "{logs}");
    assert!(logs.contains("Difficulty coerced"), "{logs}");
    assert!(logs.contains("requested=difficile"), "{logs}");
    assert!(logs.contains("resolved=moyen"), "{logs}");
  }

  #[test]
  fn supported_level_is_served_silently() {
    let (resolved, logs) = coerce_with_logs(Moyen, &[Facile, Moyen]);
    assert_eq!(resolved, Moyen);
    assert!(logs.is_empty(), "{logs}");
  }

  #[rstest]
  #[case("facile", Facile)]
  #[case("  Facile ", Facile)]
  #[case("easy", Facile)]
  #[case("STANDARD", Moyen)]
  #[case("moyen", Moyen)]
  #[case("Intermédiaire", Moyen)]
  #[case("", Moyen)]
  #[case("   ", Moyen)]
  #[case("hard", Difficile)]
  #[case("DIFFICILE", Difficile)]
  fn normalize_maps_labels(#[case] input: &str, #[case] expected: DifficultyLevel) {
    assert_eq!(normalize(input), Ok(expected));
  }

  #[test]
  fn normalize_rejects_unknown_and_names_accepted_set() {
    let err = normalize("invalid").unwrap_err();
    let DifficultyError::Unknown { label, accepted } = &err;
    assert_eq!(label, "invalid");
    assert_eq!(accepted, &vec!["facile".to_string(), "moyen".into(), "difficile".into()]);
    assert!(err.to_string().contains("facile, moyen, difficile"));
  }

  #[rstest]
  #[case(Difficile, vec![Facile, Moyen], Moyen)]
  #[case(Difficile, vec![Facile], Facile)]
  #[case(Moyen, vec![Facile], Facile)]
  #[case(Moyen, vec![Moyen, Difficile], Moyen)]
  #[case(Moyen, vec![Difficile], Facile)]
  #[case(Difficile, vec![], Facile)]
  #[case(Facile, vec![], Facile)]
  fn coerce_walks_down(#[case] requested: DifficultyLevel, #[case] supported: Vec<DifficultyLevel>, #[case] expected: DifficultyLevel) {
    assert_eq!(coerce(requested, &supported), expected);
  }

  #[test]
  fn auto_complete_fills_and_orders() {
    assert_eq!(auto_complete(&[Difficile, Difficile]), vec![Facile, Moyen, Difficile]);
    assert_eq!(auto_complete(&[]), vec![Facile, Moyen, Difficile]);
  }

  #[test]
  fn auto_complete_is_idempotent() {
    let inputs: [&[DifficultyLevel]; 4] = [&[], &[Moyen], &[Difficile, Facile], &[Facile, Moyen, Difficile, Moyen]];
    for x in inputs {
      let once = auto_complete(x);
      assert_eq!(auto_complete(&once), once);
    }
  }

  #[test]
  fn serde_uses_french_labels() {
    assert_eq!(serde_json::to_string(&Difficile).unwrap(), "\"difficile\"");
    let d: DifficultyLevel = serde_json::from_str("\"facile\"").unwrap();
    assert_eq!(d, Facile);
  }
}
