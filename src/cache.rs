// Copyright 2024-2026 the Weft authors. MIT license.

use std::cell::Cell;
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// One value of a cache key. Text parts are hashed verbatim; Json parts
/// are serialized to their canonical compact form first, so structurally
/// equal values hash equally however they were produced.
#[derive(Debug, Clone)]
pub enum CacheKeyPart<'a> {
  Text(&'a str),
  Json(serde_json::Value),
}

/// Derives the content fingerprint for an ordered sequence of key parts.
///
/// Equal sequences produce equal fingerprints and any change to any part
/// changes the result. The digest is truncated to eight lowercase hex
/// characters: this is a cache key, not a security boundary, and the short
/// width accepts a small collision risk in exchange for compact keys.
pub fn fingerprint(parts: &[CacheKeyPart]) -> String {
  use sha2::Digest;
  use sha2::Sha256;
  let mut hasher = Sha256::new();
  for part in parts {
    let text = match part {
      CacheKeyPart::Text(text) => (*text).to_string(),
      CacheKeyPart::Json(value) => canonical_json(value).to_string(),
    };
    // length framed so adjacent parts cannot run together
    hasher.update((text.len() as u64).to_le_bytes());
    hasher.update(text.as_bytes());
  }
  let digest = format!("{:x}", hasher.finalize());
  digest[..8].to_string()
}

/// Rebuilds a value with object keys in sorted order at every depth.
/// Serialization is insertion ordered, so without this two equal objects
/// built in different orders would serialize, and hash, differently.
fn canonical_json(value: &serde_json::Value) -> serde_json::Value {
  match value {
    serde_json::Value::Object(map) => {
      let mut entries: Vec<_> = map.iter().collect();
      entries.sort_by_key(|(key, _)| *key);
      serde_json::Value::Object(
        entries
          .into_iter()
          .map(|(key, value)| (key.clone(), canonical_json(value)))
          .collect(),
      )
    }
    serde_json::Value::Array(items) => {
      serde_json::Value::Array(items.iter().map(canonical_json).collect())
    }
    other => other.clone(),
  }
}

/// An error surfaced by a cache store implementation. Stores are external
/// to the loader, so their failures are carried opaquely and never
/// interpreted.
#[derive(Debug, Clone, Error)]
#[error(transparent)]
pub struct CacheStoreError(Arc<dyn std::error::Error + Send + Sync>);

impl CacheStoreError {
  pub fn new(err: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self(Arc::new(err))
  }
}

/// Persistent storage for compiled artifacts, keyed by fingerprint. The
/// loader never retries or intercepts store failures; they propagate to
/// the caller unchanged.
///
/// Note: implementors should bust their cache when their version changes.
#[async_trait(?Send)]
pub trait CacheStore {
  async fn get(&self, key: &str) -> Result<Option<String>, CacheStoreError>;
  async fn set(&self, key: &str, value: String) -> Result<(), CacheStoreError>;
}

/// Handed to a cache producer so it can keep its result out of the store.
/// `no_store` is the only signal: the produced value is still returned to
/// the caller, it just is not persisted.
#[derive(Debug, Default, Clone)]
pub struct CacheControl {
  no_store: Rc<Cell<bool>>,
}

impl CacheControl {
  pub fn no_store(&self) {
    self.no_store.set(true);
  }

  fn should_store(&self) -> bool {
    !self.no_store.get()
  }
}

/// Memoizes `producer` through `store` under the fingerprint of `parts`.
///
/// Without a store this is a passthrough. On a hit the stored value is
/// returned and the producer never runs. On a miss the producer runs and
/// its result is persisted unless it invoked [`CacheControl::no_store`];
/// either way the produced value is returned. Store errors and producer
/// errors both propagate unchanged.
pub async fn with_cache<T, E, F, Fut>(
  store: Option<&dyn CacheStore>,
  parts: &[CacheKeyPart<'_>],
  producer: F,
) -> Result<T, E>
where
  T: Serialize + DeserializeOwned,
  E: From<CacheStoreError>,
  F: FnOnce(CacheControl) -> Fut,
  Fut: Future<Output = Result<T, E>>,
{
  let Some(store) = store else {
    return producer(CacheControl::default()).await;
  };
  let key = fingerprint(parts);
  if let Some(text) = store.get(&key).await? {
    match serde_json::from_str(&text) {
      Ok(value) => return Ok(value),
      Err(err) => {
        log::debug!("ignoring malformed cache entry {}: {}", key, err);
      }
    }
  }
  let control = CacheControl::default();
  let value = producer(control.clone()).await?;
  if control.should_store() {
    let text = serde_json::to_string(&value).map_err(CacheStoreError::new)?;
    store.set(&key, text).await?;
  }
  Ok(value)
}

/// A cache store holding its entries in memory, for tests and short lived
/// hosts that only want memoization within a process.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
  entries: RefCell<HashMap<String, String>>,
}

impl MemoryCacheStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.entries.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.borrow().is_empty()
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.entries.borrow().contains_key(key)
  }
}

#[async_trait(?Send)]
impl CacheStore for MemoryCacheStore {
  async fn get(&self, key: &str) -> Result<Option<String>, CacheStoreError> {
    Ok(self.entries.borrow().get(key).cloned())
  }

  async fn set(&self, key: &str, value: String) -> Result<(), CacheStoreError> {
    self.entries.borrow_mut().insert(key.to_string(), value);
    Ok(())
  }
}

#[cfg(test)]
mod test {
  use pretty_assertions::assert_eq;
  use serde_json::json;

  use super::*;

  #[test]
  fn test_fingerprint_deterministic() {
    let parts = [
      CacheKeyPart::Text("0.3.0"),
      CacheKeyPart::Text("let a = 1;"),
      CacheKeyPart::Text("/app/main.weft"),
    ];
    assert_eq!(fingerprint(&parts), fingerprint(&parts));
    assert_eq!(fingerprint(&parts).len(), 8);
    assert!(fingerprint(&parts)
      .chars()
      .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
  }

  #[test]
  fn test_fingerprint_sensitive_to_parts() {
    let base = fingerprint(&[CacheKeyPart::Text("a"), CacheKeyPart::Text("b")]);
    assert_ne!(
      base,
      fingerprint(&[CacheKeyPart::Text("b"), CacheKeyPart::Text("a")])
    );
    assert_ne!(base, fingerprint(&[CacheKeyPart::Text("a")]));
    assert_ne!(
      base,
      fingerprint(&[CacheKeyPart::Text("a"), CacheKeyPart::Text("b2")])
    );
  }

  #[test]
  fn test_fingerprint_frames_parts() {
    // "ab" + "c" must not collide with "a" + "bc"
    assert_ne!(
      fingerprint(&[CacheKeyPart::Text("ab"), CacheKeyPart::Text("c")]),
      fingerprint(&[CacheKeyPart::Text("a"), CacheKeyPart::Text("bc")])
    );
  }

  #[test]
  fn test_fingerprint_json_parts() {
    let a = fingerprint(&[CacheKeyPart::Json(json!({"k": 1, "v": [1, 2]}))]);
    let b = fingerprint(&[CacheKeyPart::Json(json!({"k": 1, "v": [1, 2]}))]);
    assert_eq!(a, b);
    assert_ne!(
      a,
      fingerprint(&[CacheKeyPart::Json(json!({"k": 1, "v": [1, 3]}))])
    );
  }

  #[test]
  fn test_fingerprint_json_ignores_key_insertion_order() {
    let a = json!({"alpha": 1, "beta": [{"x": 1, "y": 2}]});
    let b = json!({"beta": [{"y": 2, "x": 1}], "alpha": 1});
    assert_eq!(a, b, "the values themselves compare equal");
    assert_eq!(
      fingerprint(&[CacheKeyPart::Json(a)]),
      fingerprint(&[CacheKeyPart::Json(b)])
    );
  }

  #[tokio::test]
  async fn test_with_cache_passthrough_without_store() {
    let calls = Cell::new(0);
    for _ in 0..2 {
      let value: Result<u32, CacheStoreError> =
        with_cache(None, &[CacheKeyPart::Text("k")], |_control| {
          calls.set(calls.get() + 1);
          async { Ok(7) }
        })
        .await;
      assert_eq!(value.unwrap(), 7);
    }
    assert_eq!(calls.get(), 2);
  }

  #[tokio::test]
  async fn test_with_cache_hit_skips_producer() {
    let store = MemoryCacheStore::new();
    let calls = Cell::new(0);
    for _ in 0..2 {
      let value: Result<u32, CacheStoreError> = with_cache(
        Some(&store),
        &[CacheKeyPart::Text("k")],
        |_control| {
          calls.set(calls.get() + 1);
          async { Ok(7) }
        },
      )
      .await;
      assert_eq!(value.unwrap(), 7);
    }
    assert_eq!(calls.get(), 1);
    assert_eq!(store.len(), 1);
  }

  #[tokio::test]
  async fn test_with_cache_no_store_opt_out() {
    let store = MemoryCacheStore::new();
    let calls = Cell::new(0);
    for _ in 0..2 {
      let value: Result<u32, CacheStoreError> = with_cache(
        Some(&store),
        &[CacheKeyPart::Text("k")],
        |control| {
          calls.set(calls.get() + 1);
          async move {
            control.no_store();
            Ok(7)
          }
        },
      )
      .await;
      assert_eq!(value.unwrap(), 7);
    }
    assert_eq!(
      calls.get(),
      2,
      "opted out values must not be served from cache"
    );
    assert!(store.is_empty());
  }

  #[tokio::test]
  async fn test_with_cache_producer_error_propagates() {
    #[derive(Debug, Error)]
    #[error("producer exploded")]
    struct ProducerError;

    let store = MemoryCacheStore::new();
    let result: Result<u32, CacheStoreError> = with_cache(
      Some(&store),
      &[CacheKeyPart::Text("k")],
      |_control| async { Err(CacheStoreError::new(ProducerError)) },
    )
    .await;
    assert_eq!(result.unwrap_err().to_string(), "producer exploded");
    assert!(store.is_empty());
  }

  #[tokio::test]
  async fn test_with_cache_store_errors_propagate() {
    #[derive(Debug, Error)]
    #[error("disk on fire")]
    struct DiskError;

    struct FailingStore;

    #[async_trait(?Send)]
    impl CacheStore for FailingStore {
      async fn get(
        &self,
        _key: &str,
      ) -> Result<Option<String>, CacheStoreError> {
        Err(CacheStoreError::new(DiskError))
      }

      async fn set(
        &self,
        _key: &str,
        _value: String,
      ) -> Result<(), CacheStoreError> {
        Err(CacheStoreError::new(DiskError))
      }
    }

    let result: Result<u32, CacheStoreError> = with_cache(
      Some(&FailingStore),
      &[CacheKeyPart::Text("k")],
      |_control| async { Ok(7) },
    )
    .await;
    assert_eq!(result.unwrap_err().to_string(), "disk on fire");
  }

  #[tokio::test]
  async fn test_with_cache_malformed_entry_recomputes() {
    let store = MemoryCacheStore::new();
    let key = fingerprint(&[CacheKeyPart::Text("k")]);
    store.set(&key, "not json".to_string()).await.unwrap();
    let value: Result<u32, CacheStoreError> = with_cache(
      Some(&store),
      &[CacheKeyPart::Text("k")],
      |_control| async { Ok(7) },
    )
    .await;
    assert_eq!(value.unwrap(), 7);
    assert!(store.contains_key(&key));
  }
}
