//! Template placeholder contract: extraction, validation against a variable bag and
//! an HTML allow-list, then rendering.
//!
//! Two placeholder forms exist:
//!   - `{{name}}`   : value is HTML-escaped on render
//!   - `{{{name}}}` : value is inserted verbatim, only for allow-listed names
//!
//! `render` re-runs `validate` and refuses to produce output for an invalid
//! template, so the escaped/raw asymmetry can't be bypassed by skipping the check.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Text templates for one exercise variant plus the trusted raw-HTML allow-list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSpec {
  /// Statement shown to the pupil ("énoncé").
  pub prompt: String,
  /// Expected answer / correction.
  #[serde(default)]
  pub answer: String,
  #[serde(default)]
  pub raw_allowlist: BTreeSet<String>,
}

impl TemplateSpec {
  pub fn new(prompt: impl Into<String>, answer: impl Into<String>) -> Self {
    Self { prompt: prompt.into(), answer: answer.into(), raw_allowlist: BTreeSet::new() }
  }

  pub fn allow_raw(mut self, name: impl Into<String>) -> Self {
    self.raw_allowlist.insert(name.into());
    self
  }
}

/// Variables produced by a generator for one generation call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableBag(BTreeMap<String, String>);

impl VariableBag {
  pub fn new() -> Self { Self::default() }

  /// Insert any displayable value; it is stored in its `Display` form.
  pub fn insert(&mut self, name: impl Into<String>, value: impl fmt::Display) -> &mut Self {
    self.0.insert(name.into(), value.to_string());
    self
  }

  pub fn with(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
    self.insert(name, value);
    self
  }

  pub fn get(&self, name: &str) -> Option<&str> { self.0.get(name).map(String::as_str) }

  pub fn contains(&self, name: &str) -> bool { self.0.contains_key(name) }

  pub fn names(&self) -> impl Iterator<Item = &str> { self.0.keys().map(String::as_str) }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl<K: Into<String>, V: fmt::Display> FromIterator<(K, V)> for VariableBag {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    let mut bag = VariableBag::new();
    for (k, v) in iter {
      bag.insert(k, v);
    }
    bag
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderKind {
  Escaped,
  Raw,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateField {
  Prompt,
  Answer,
}

impl fmt::Display for TemplateField {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      TemplateField::Prompt => "prompt",
      TemplateField::Answer => "answer",
    })
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Placeholder {
  pub name: String,
  pub kind: PlaceholderKind,
  pub field: TemplateField,
}

/// A raw placeholder whose name isn't on the allow-list.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct HtmlViolation {
  pub placeholder: String,
  pub field: TemplateField,
  pub remediation: String,
}

/// Outcome of a contract check. Every problem is listed; nothing fails fast.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
  /// Referenced names absent from the bag (sorted, unique).
  pub missing: Vec<String>,
  pub html_violations: Vec<HtmlViolation>,
  /// Bag variables no placeholder refers to. Informational only.
  pub unused: Vec<String>,
}

impl ValidationReport {
  pub fn is_valid(&self) -> bool { self.missing.is_empty() && self.html_violations.is_empty() }
}

impl fmt::Display for ValidationReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut parts = Vec::new();
    if !self.missing.is_empty() {
      parts.push(format!("missing placeholders: {}", self.missing.join(", ")));
    }
    if !self.html_violations.is_empty() {
      let names: Vec<String> =
        self.html_violations.iter().map(|v| format!("{} ({})", v.placeholder, v.field)).collect();
      parts.push(format!("raw placeholders not allow-listed: {}", names.join(", ")));
    }
    if parts.is_empty() {
      f.write_str("template contract satisfied")
    } else {
      f.write_str(&parts.join("; "))
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
  #[error("template contract violated: {0}")]
  ContractViolation(ValidationReport),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RenderedTemplate {
  pub prompt: String,
  pub answer: String,
}

fn placeholder_regex() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  // Raw alternative first: at any given position the triple-brace form wins.
  RE.get_or_init(|| {
    Regex::new(r"\{\{\{\s*([A-Za-z_][A-Za-z0-9_.\-]*)\s*\}\}\}|\{\{\s*([A-Za-z_][A-Za-z0-9_.\-]*)\s*\}\}")
      .expect("placeholder pattern compiles")
  })
}

fn classify(caps: &Captures<'_>) -> Option<(String, PlaceholderKind)> {
  if let Some(m) = caps.get(1) {
    Some((m.as_str().to_string(), PlaceholderKind::Raw))
  } else {
    caps.get(2).map(|m| (m.as_str().to_string(), PlaceholderKind::Escaped))
  }
}

/// All placeholders of `text`, in order of appearance.
pub fn extract_placeholders(text: &str, field: TemplateField) -> Vec<Placeholder> {
  placeholder_regex()
    .captures_iter(text)
    .filter_map(|caps| classify(&caps))
    .map(|(name, kind)| Placeholder { name, kind, field })
    .collect()
}

fn all_placeholders(spec: &TemplateSpec) -> Vec<Placeholder> {
  let mut out = extract_placeholders(&spec.prompt, TemplateField::Prompt);
  out.extend(extract_placeholders(&spec.answer, TemplateField::Answer));
  out
}

/// Check that every placeholder of both halves is satisfiable by `bag` and that
/// every raw placeholder is allow-listed.
pub fn validate(spec: &TemplateSpec, bag: &VariableBag) -> ValidationReport {
  let placeholders = all_placeholders(spec);

  let mut missing = BTreeSet::new();
  let mut violations = BTreeSet::new();
  let mut referenced = BTreeSet::new();

  for p in &placeholders {
    referenced.insert(p.name.as_str());
    if !bag.contains(&p.name) {
      missing.insert(p.name.clone());
    }
    if p.kind == PlaceholderKind::Raw && !spec.raw_allowlist.contains(&p.name) {
      violations.insert(HtmlViolation {
        placeholder: p.name.clone(),
        field: p.field,
        remediation: format!(
          "add '{}' to raw_allowlist if its value is trusted HTML, or write it as {{{{{}}}}} to escape it",
          p.name, p.name
        ),
      });
    }
  }

  let unused = bag.names().filter(|n| !referenced.contains(n)).map(str::to_string).collect();

  ValidationReport { missing: missing.into_iter().collect(), html_violations: violations.into_iter().collect(), unused }
}

/// Validate, then substitute: escaped placeholders get HTML-escaped values, raw
/// placeholders get the value verbatim.
pub fn render(spec: &TemplateSpec, bag: &VariableBag) -> Result<RenderedTemplate, TemplateError> {
  let report = validate(spec, bag);
  if !report.is_valid() {
    return Err(TemplateError::ContractViolation(report));
  }
  Ok(RenderedTemplate { prompt: substitute(&spec.prompt, bag), answer: substitute(&spec.answer, bag) })
}

fn substitute(text: &str, bag: &VariableBag) -> String {
  placeholder_regex()
    .replace_all(text, |caps: &Captures<'_>| match classify(caps) {
      Some((name, PlaceholderKind::Raw)) => bag.get(&name).unwrap_or_default().to_string(),
      Some((name, PlaceholderKind::Escaped)) => escape_html(bag.get(&name).unwrap_or_default()),
      None => String::new(),
    })
    .into_owned()
}

/// Escape the five HTML-significant characters.
pub fn escape_html(input: &str) -> String {
  let mut out = String::with_capacity(input.len());
  for ch in input.chars() {
    match ch {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#x27;"),
      _ => out.push(ch),
    }
  }
  out
}
