//! Executes a `ReconciliationPlan` against a `CatalogStore`.
//!
//! Conflicts that mean "someone already did it" are counted, not raised:
//!   - `Create` rejected as `Duplicate` (a concurrent run inserted the key first)
//!   - `Update`/`Delete` on a row that is already gone
//! Every other storage error is returned unchanged; there is no retry here.

use serde::Serialize;
use tracing::{info, instrument, warn};

use super::store::{CatalogStore, CatalogStoreError};
use super::{ReconcileAction, ReconciliationPlan};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
  pub created: usize,
  pub updated: usize,
  pub deleted: usize,
  pub already_satisfied: usize,
}

impl ApplyReport {
  pub fn total(&self) -> usize { self.created + self.updated + self.deleted + self.already_satisfied }
}

#[instrument(level = "info", skip(store, plan), fields(topic = %plan.topic, actions = plan.actions.len()))]
pub async fn apply_plan(store: &dyn CatalogStore, plan: &ReconciliationPlan) -> Result<ApplyReport, CatalogStoreError> {
  let mut report = ApplyReport::default();

  for action in &plan.actions {
    match action {
      ReconcileAction::Create { projection } => match store.insert_projection(projection).await {
        Ok(()) => report.created += 1,
        Err(CatalogStoreError::Duplicate { id }) => {
          info!(target: "catalog", topic = %projection.topic, generator = %projection.generator, existing = %id, "Create lost to a concurrent run; already satisfied");
          report.already_satisfied += 1;
        }
        Err(e) => return Err(e),
      },
      ReconcileAction::Update { id, generator, difficulties, tiers, refreshed_at, .. } => {
        match store.update_projection_aggregates(id, difficulties, tiers, *refreshed_at).await {
          Ok(()) => report.updated += 1,
          Err(CatalogStoreError::NotFound { .. }) => {
            warn!(target: "catalog", %id, %generator, "Projection vanished before update; already satisfied");
            report.already_satisfied += 1;
          }
          Err(e) => return Err(e),
        }
      }
      ReconcileAction::Delete { id, generator, .. } => match store.delete_projection(id).await {
        Ok(()) => report.deleted += 1,
        Err(CatalogStoreError::NotFound { .. }) => {
          info!(target: "catalog", %id, %generator, "Projection already deleted");
          report.already_satisfied += 1;
        }
        Err(e) => return Err(e),
      },
    }
  }

  info!(
    target: "catalog",
    topic = %plan.topic,
    created = report.created,
    updated = report.updated,
    deleted = report.deleted,
    already_satisfied = report.already_satisfied,
    "Reconciliation plan applied"
  );
  Ok(report)
}
