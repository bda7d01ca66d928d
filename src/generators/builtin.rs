//! Generators shipped with the crate. Each one seeds a `StdRng` from the request
//! seed, so a seed always reproduces the same numbers.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{ExerciseGenerator, GenerationParams, GeneratorError};
use crate::difficulty::DifficultyLevel;
use crate::template::{escape_html, VariableBag};

fn rng_for(params: &GenerationParams) -> StdRng { StdRng::seed_from_u64(params.seed) }

/// Signed term for display: `+ 5`, `- 5`.
fn signed(n: i64) -> String {
  if n < 0 { format!("- {}", -n) } else { format!("+ {n}") }
}

/// Wrap negatives in parentheses: `(-3)`.
fn operand(n: i64) -> String {
  if n < 0 { format!("({n})") } else { n.to_string() }
}

fn gcd(a: i64, b: i64) -> i64 {
  let (mut a, mut b) = (a.abs(), b.abs());
  while b != 0 {
    let t = a % b;
    a = b;
    b = t;
  }
  a
}

fn fraction_html(num: i64, den: i64) -> String {
  format!(r#"<span class="frac"><sup>{num}</sup>&frasl;<sub>{den}</sub></span>"#)
}

/// Sums of integers ("6e-nombres-entiers").
pub struct AdditionEntiers;

impl ExerciseGenerator for AdditionEntiers {
  fn key(&self) -> &str { "addition_entiers" }

  fn supported_difficulties(&self) -> Vec<DifficultyLevel> { DifficultyLevel::ALL.to_vec() }

  fn generate(&self, params: &GenerationParams) -> Result<VariableBag, GeneratorError> {
    let mut rng = rng_for(params);
    let terms: Vec<i64> = match params.difficulty {
      DifficultyLevel::Facile => (0..2).map(|_| rng.gen_range(1..=20)).collect(),
      DifficultyLevel::Moyen => (0..3).map(|_| rng.gen_range(10..=100)).collect(),
      DifficultyLevel::Difficile => (0..3).map(|_| rng.gen_range(-50..=50)).collect(),
    };
    let expression = terms.iter().map(|t| operand(*t)).collect::<Vec<_>>().join(" + ");
    let resultat: i64 = terms.iter().sum();

    Ok(
      VariableBag::new()
        .with("expression", expression)
        .with("resultat", resultat)
        .with("nb_termes", terms.len()),
    )
  }
}

/// Reduce a fraction to lowest terms ("5e-fractions").
pub struct FractionsSimplification;

impl ExerciseGenerator for FractionsSimplification {
  fn key(&self) -> &str { "fractions_simplification" }

  fn supported_difficulties(&self) -> Vec<DifficultyLevel> { vec![DifficultyLevel::Facile, DifficultyLevel::Moyen] }

  fn generate(&self, params: &GenerationParams) -> Result<VariableBag, GeneratorError> {
    let mut rng = rng_for(params);
    let (max_part, max_factor) = match params.difficulty {
      DifficultyLevel::Facile => (9, 5),
      _ => (15, 12),
    };

    // Draw an irreducible p/q with p != q, then scale it up.
    let mut p = rng.gen_range(1..=max_part);
    let mut q = rng.gen_range(2..=max_part);
    let mut guard = 0;
    while p == q || gcd(p, q) != 1 {
      p = rng.gen_range(1..=max_part);
      q = rng.gen_range(2..=max_part);
      guard += 1;
      if guard > 1_000 {
        return Err(GeneratorError::Failed {
          key: self.key().to_string(),
          message: "could not draw an irreducible fraction".into(),
        });
      }
    }
    let k = rng.gen_range(2..=max_factor);
    let (num, den) = (p * k, q * k);

    Ok(
      VariableBag::new()
        .with("numerateur", num)
        .with("denominateur", den)
        .with("numerateur_simplifie", p)
        .with("denominateur_simplifie", q)
        .with("facteur", k)
        .with("fraction_html", fraction_html(num, den))
        .with("fraction_simplifiee_html", fraction_html(p, q)),
    )
  }
}

/// `ax + b = c` (moyen) or `ax + b = cx + d` (difficile) with an integer solution.
pub struct EquationPremierDegre;

impl ExerciseGenerator for EquationPremierDegre {
  fn key(&self) -> &str { "equation_premier_degre" }

  fn supported_difficulties(&self) -> Vec<DifficultyLevel> { vec![DifficultyLevel::Moyen, DifficultyLevel::Difficile] }

  fn generate(&self, params: &GenerationParams) -> Result<VariableBag, GeneratorError> {
    let mut rng = rng_for(params);
    let x: i64 = rng.gen_range(-10..=10);
    let a: i64 = rng.gen_range(2..=9);
    let b: i64 = rng.gen_range(-20..=20);

    let (left, right) = match params.difficulty {
      DifficultyLevel::Difficile => {
        let mut c: i64 = rng.gen_range(1..=9);
        if c == a {
          c = a - 1;
        }
        // ax + b = cx + d  with  d = (a - c)x + b
        let d = (a - c) * x + b;
        (format!("{a}x {}", signed(b)), format!("{c}x {}", signed(d)))
      }
      _ => (format!("{a}x {}", signed(b)), (a * x + b).to_string()),
    };
    let equation = format!("{left} = {right}");
    let equation_html = escape_html(&equation).replace('x', "<var>x</var>");

    Ok(
      VariableBag::new()
        .with("equation", equation)
        .with("equation_html", equation_html)
        .with("solution", x),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn params(difficulty: DifficultyLevel, seed: u64) -> GenerationParams { GenerationParams { difficulty, seed } }

  fn int(bag: &VariableBag, name: &str) -> i64 { bag.get(name).unwrap().parse().unwrap() }

  #[test]
  fn addition_result_matches_expression() {
    for seed in 0..50 {
      let bag = AdditionEntiers.generate(&params(DifficultyLevel::Difficile, seed)).unwrap();
      let sum: i64 = bag
        .get("expression")
        .unwrap()
        .split(" + ")
        .map(|t| t.trim_matches(|c| c == '(' || c == ')').parse::<i64>().unwrap())
        .sum();
      assert_eq!(sum, int(&bag, "resultat"));
    }
  }

  #[test]
  fn fractions_reduce_to_lowest_terms() {
    for seed in 0..50 {
      let bag = FractionsSimplification.generate(&params(DifficultyLevel::Moyen, seed)).unwrap();
      let (n, d) = (int(&bag, "numerateur"), int(&bag, "denominateur"));
      let (p, q) = (int(&bag, "numerateur_simplifie"), int(&bag, "denominateur_simplifie"));
      assert_eq!(gcd(p, q), 1);
      assert_eq!(n * q, d * p);
      assert!(bag.get("fraction_html").unwrap().starts_with("<span"));
    }
  }

  #[test]
  fn equation_solution_satisfies_equation() {
    for difficulty in [DifficultyLevel::Moyen, DifficultyLevel::Difficile] {
      for seed in 0..50 {
        let bag = EquationPremierDegre.generate(&params(difficulty, seed)).unwrap();
        let x = int(&bag, "solution");
        let eq = bag.get("equation").unwrap().to_string();
        let (left, right) = eq.split_once(" = ").unwrap();
        assert_eq!(eval_linear(left, x), eval_linear(right, x), "{eq} with x = {x}");
      }
    }
  }

  /// Evaluates `ax + b`, `ax - b` or a constant.
  fn eval_linear(side: &str, x: i64) -> i64 {
    let parts: Vec<&str> = side.split_whitespace().collect();
    match parts.as_slice() {
      [konst] => konst.parse().unwrap(),
      [ax, op, b] => {
        let a: i64 = ax.trim_end_matches('x').parse().unwrap();
        let b: i64 = b.parse().unwrap();
        if *op == "-" { a * x - b } else { a * x + b }
      }
      _ => panic!("unexpected side {side}"),
    }
  }

  #[test]
  fn gcd_basics() {
    assert_eq!(gcd(12, 18), 6);
    assert_eq!(gcd(-4, 6), 2);
    assert_eq!(gcd(7, 0), 7);
  }
}
