//! Per-topic cache of catalog reads. Built once at startup and shared through
//! `AppState`; reconciliation invalidates the topic it touched.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::CatalogProjectionRecord;

struct CachedTopic {
  stored_at: Instant,
  records: Vec<CatalogProjectionRecord>,
}

pub struct CatalogCache {
  ttl: Duration,
  entries: RwLock<HashMap<String, CachedTopic>>,
}

impl CatalogCache {
  pub fn new(ttl: Duration) -> Self {
    Self { ttl, entries: RwLock::new(HashMap::new()) }
  }

  pub fn ttl(&self) -> Duration { self.ttl }

  /// Cached records for `topic` if they are younger than the TTL.
  pub async fn get(&self, topic: &str) -> Option<Vec<CatalogProjectionRecord>> {
    let entries = self.entries.read().await;
    let hit = entries.get(topic).filter(|e| e.stored_at.elapsed() < self.ttl)?;
    debug!(target: "catalog", %topic, "Catalog cache hit");
    Some(hit.records.clone())
  }

  pub async fn put(&self, topic: &str, records: Vec<CatalogProjectionRecord>) {
    self.entries.write().await.insert(topic.to_string(), CachedTopic { stored_at: Instant::now(), records });
  }

  pub async fn invalidate(&self, topic: &str) {
    if self.entries.write().await.remove(topic).is_some() {
      debug!(target: "catalog", %topic, "Catalog cache invalidated");
    }
  }

  pub async fn invalidate_all(&self) {
    self.entries.write().await.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn fresh_entries_hit_and_invalidate_removes_them() {
    let cache = CatalogCache::new(Duration::from_secs(300));
    assert!(cache.get("6e-entiers").await.is_none());
    cache.put("6e-entiers", vec![]).await;
    assert_eq!(cache.get("6e-entiers").await, Some(vec![]));
    cache.invalidate("6e-entiers").await;
    assert!(cache.get("6e-entiers").await.is_none());
  }

  #[tokio::test]
  async fn zero_ttl_never_hits() {
    let cache = CatalogCache::new(Duration::ZERO);
    cache.put("t", vec![]).await;
    assert!(cache.get("t").await.is_none());
  }

  #[tokio::test]
  async fn invalidate_all_clears_every_topic() {
    let cache = CatalogCache::new(Duration::from_secs(60));
    cache.put("a", vec![]).await;
    cache.put("b", vec![]).await;
    cache.invalidate_all().await;
    assert!(cache.get("a").await.is_none());
    assert!(cache.get("b").await.is_none());
  }
}
