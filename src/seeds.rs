//! Built-in exercise definitions and source records, so the service is usable
//! without any TOML bank.

use crate::domain::{AccessTier, DefinitionSource, ExerciseDefinition, SourceExerciseRecord};
use crate::template::TemplateSpec;
use crate::variant::VariantCandidate;

fn variant(id: &str, weight: u32, spec: TemplateSpec) -> VariantCandidate<TemplateSpec> {
  VariantCandidate::new(id, weight, spec)
}

/// One definition per built-in generator.
pub fn seed_definitions() -> Vec<ExerciseDefinition> {
  vec![
    ExerciseDefinition {
      id: "addition-entiers".into(),
      topic: "6e-nombres-entiers".into(),
      generator: "addition_entiers".into(),
      tier: AccessTier::Gratuit,
      source: DefinitionSource::Seed,
      variants: vec![
        variant("calcul", 3, TemplateSpec::new("Calcule {{expression}}.", "{{expression}} = {{resultat}}")),
        variant(
          "somme",
          1,
          TemplateSpec::new("Quelle est la somme des {{nb_termes}} nombres {{expression}} ?", "La somme vaut {{resultat}}."),
        ),
      ],
    },
    ExerciseDefinition {
      id: "fractions-simplification".into(),
      topic: "5e-fractions".into(),
      generator: "fractions_simplification".into(),
      tier: AccessTier::Gratuit,
      source: DefinitionSource::Seed,
      variants: vec![
        variant(
          "visuelle",
          2,
          TemplateSpec::new(
            "Simplifie la fraction {{{fraction_html}}}.",
            "{{{fraction_html}}} = {{{fraction_simplifiee_html}}} (on divise par {{facteur}})",
          )
          .allow_raw("fraction_html")
          .allow_raw("fraction_simplifiee_html"),
        ),
        variant(
          "texte",
          1,
          TemplateSpec::new(
            "Écris {{numerateur}}/{{denominateur}} sous forme irréductible.",
            "{{numerateur_simplifie}}/{{denominateur_simplifie}}",
          ),
        ),
      ],
    },
    ExerciseDefinition {
      id: "equation-premier-degre".into(),
      topic: "4e-equations".into(),
      generator: "equation_premier_degre".into(),
      tier: AccessTier::Premium,
      source: DefinitionSource::Seed,
      variants: vec![
        variant(
          "resous",
          1,
          TemplateSpec::new("Résous l'équation {{{equation_html}}}.", "x = {{solution}}").allow_raw("equation_html"),
        ),
        variant("trouve", 1, TemplateSpec::new("Trouve x tel que {{equation}}.", "La solution est {{solution}}.")),
      ],
    },
  ]
}

/// Authored records matching the seed definitions, used to prime the catalog.
pub fn seed_sources() -> Vec<SourceExerciseRecord> {
  let rec = |id: &str, topic: &str, generator: Option<&str>, difficulty: &str, tier: AccessTier, dynamic: bool| {
    SourceExerciseRecord {
      id: id.into(),
      topic: topic.into(),
      generator: generator.map(str::to_string),
      difficulty: difficulty.into(),
      tier,
      dynamic,
    }
  };
  vec![
    rec("seed-add-1", "6e-nombres-entiers", Some("addition_entiers"), "facile", AccessTier::Gratuit, true),
    rec("seed-add-2", "6e-nombres-entiers", Some("addition_entiers"), "difficile", AccessTier::Premium, true),
    rec("seed-frac-1", "5e-fractions", Some("fractions_simplification"), "moyen", AccessTier::Gratuit, true),
    rec("seed-frac-fixe", "5e-fractions", None, "facile", AccessTier::Gratuit, false),
    rec("seed-eq-1", "4e-equations", Some("equation_premier_degre"), "standard", AccessTier::Premium, true),
  ]
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::difficulty::DifficultyLevel;
  use crate::generators::{GenerationParams, GeneratorRegistry};
  use crate::template::validate;

  #[test]
  fn every_seed_variant_satisfies_its_generator() {
    let registry = GeneratorRegistry::with_builtins();
    for def in seed_definitions() {
      let generator = registry.get(&def.generator).unwrap();
      for difficulty in generator.supported_difficulties() {
        let bag = generator.generate(&GenerationParams { difficulty, seed: 7 }).unwrap();
        for v in &def.variants {
          let report = validate(&v.payload, &bag);
          assert!(report.is_valid(), "{} / {}: {report}", def.id, v.id);
        }
      }
    }
  }

  #[test]
  fn seed_sources_use_known_labels() {
    for s in seed_sources() {
      assert!(crate::difficulty::normalize(&s.difficulty).is_ok());
    }
    assert_eq!(crate::difficulty::normalize("standard"), Ok(DifficultyLevel::Moyen));
  }
}
