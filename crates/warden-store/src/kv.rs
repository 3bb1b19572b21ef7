//! Namespaced byte-level key-value storage.
//!
//! The domain stores (approvals, sessions, transcript, audit) all sit on top
//! of the [`KvStore`] trait. Persistent keys are encoded
//! `"{namespace}\0{key}"`, which is why the NUL byte is reserved in both
//! parts.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};

fn validate_namespace(namespace: &str) -> StoreResult<()> {
    if namespace.is_empty() {
        return Err(StoreError::InvalidKey("namespace must not be empty".into()));
    }
    if namespace.contains('\0') {
        return Err(StoreError::InvalidKey(
            "namespace must not contain NUL".into(),
        ));
    }
    Ok(())
}

fn validate(namespace: &str, key: &str) -> StoreResult<()> {
    validate_namespace(namespace)?;
    if key.is_empty() {
        return Err(StoreError::InvalidKey("key must not be empty".into()));
    }
    if key.contains('\0') {
        return Err(StoreError::InvalidKey("key must not contain NUL".into()));
    }
    Ok(())
}

/// Namespaced byte-level storage.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch a value; `None` when absent.
    async fn get(&self, namespace: &str, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Insert or overwrite a value.
    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StoreResult<()>;

    /// Remove a key; `true` when it existed.
    async fn delete(&self, namespace: &str, key: &str) -> StoreResult<bool>;

    /// All keys currently present in a namespace, in no particular order.
    async fn list_keys(&self, namespace: &str) -> StoreResult<Vec<String>>;

    /// Remove every key in a namespace; returns how many were removed.
    async fn clear_namespace(&self, namespace: &str) -> StoreResult<u64>;
}

/// In-memory backend for tests and ephemeral deployments.
///
/// Values live in a nested map, namespace first.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    namespaces: RwLock<HashMap<String, HashMap<String, Vec<u8>>>>,
}

impl MemoryKvStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StoreResult<Option<Vec<u8>>> {
        validate(namespace, key)?;
        let map = self
            .namespaces
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(map.get(namespace).and_then(|ns| ns.get(key)).cloned())
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StoreResult<()> {
        validate(namespace, key)?;
        let mut map = self
            .namespaces
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        map.entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> StoreResult<bool> {
        validate(namespace, key)?;
        let mut map = self
            .namespaces
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(map
            .get_mut(namespace)
            .is_some_and(|ns| ns.remove(key).is_some()))
    }

    async fn list_keys(&self, namespace: &str) -> StoreResult<Vec<String>> {
        validate_namespace(namespace)?;
        let map = self
            .namespaces
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(map
            .get(namespace)
            .map(|ns| ns.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn clear_namespace(&self, namespace: &str) -> StoreResult<u64> {
        validate_namespace(namespace)?;
        let mut map = self
            .namespaces
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(map.remove(namespace).map_or(0, |ns| ns.len() as u64))
    }
}

/// Durable backend over an embedded `SurrealKV` tree.
///
/// Every operation runs in its own transaction.
pub struct SurrealKvStore {
    tree: surrealkv::Tree,
}

impl std::fmt::Debug for SurrealKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurrealKvStore").finish_non_exhaustive()
    }
}

fn kv_err(e: surrealkv::Error) -> StoreError {
    StoreError::Internal(e.to_string())
}

/// Composite key `"{namespace}\0{key}"` as bytes.
fn composite_key(namespace: &str, key: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(namespace.as_bytes());
    buf.push(0);
    buf.extend_from_slice(key.as_bytes());
    buf
}

/// Inclusive start of a namespace scan: `"{namespace}\0"`.
fn range_start(namespace: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(namespace.as_bytes());
    buf.push(0);
    buf
}

/// Exclusive end of a namespace scan: `"{namespace}\x01"`. Every composite
/// key in the namespace sorts between the two bounds.
fn range_end(namespace: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(namespace.as_bytes());
    buf.push(1);
    buf
}

impl SurrealKvStore {
    /// Open or create the on-disk tree at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] when the tree cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let tree = surrealkv::TreeBuilder::new()
            .with_path(path.as_ref().to_path_buf())
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self { tree })
    }

    /// Flush pending writes and close the tree.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Internal`] when the flush fails.
    pub async fn close(&self) -> StoreResult<()> {
        self.tree.close().await.map_err(kv_err)
    }
}

#[async_trait]
impl KvStore for SurrealKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StoreResult<Option<Vec<u8>>> {
        validate(namespace, key)?;
        let ck = composite_key(namespace, key);
        let tx = self
            .tree
            .begin_with_mode(surrealkv::Mode::ReadOnly)
            .map_err(kv_err)?;
        tx.get(&ck).map_err(kv_err)
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StoreResult<()> {
        validate(namespace, key)?;
        let ck = composite_key(namespace, key);
        let mut tx = self.tree.begin().map_err(kv_err)?;
        tx.set(&ck, &value).map_err(kv_err)?;
        tx.commit().await.map_err(kv_err)
    }

    async fn delete(&self, namespace: &str, key: &str) -> StoreResult<bool> {
        validate(namespace, key)?;
        let ck = composite_key(namespace, key);
        let mut tx = self.tree.begin().map_err(kv_err)?;
        let existed = tx.get(&ck).map_err(kv_err)?.is_some();
        if existed {
            tx.delete(&ck).map_err(kv_err)?;
            tx.commit().await.map_err(kv_err)?;
        }
        Ok(existed)
    }

    async fn list_keys(&self, namespace: &str) -> StoreResult<Vec<String>> {
        validate_namespace(namespace)?;
        let start = range_start(namespace);
        let end = range_end(namespace);
        let skip = namespace.len().saturating_add(1);

        let tx = self
            .tree
            .begin_with_mode(surrealkv::Mode::ReadOnly)
            .map_err(kv_err)?;
        let mut iter = tx.range(&start, &end).map_err(kv_err)?;
        iter.seek_first().map_err(kv_err)?;

        let mut keys = Vec::new();
        while iter.valid() {
            let raw = iter.key();
            if let Some(tail) = raw.get(skip..)
                && let Ok(text) = std::str::from_utf8(tail)
                && !text.is_empty()
            {
                keys.push(text.to_string());
            }
            iter.next().map_err(kv_err)?;
        }
        Ok(keys)
    }

    async fn clear_namespace(&self, namespace: &str) -> StoreResult<u64> {
        validate_namespace(namespace)?;
        let start = range_start(namespace);
        let end = range_end(namespace);

        let mut tx = self.tree.begin().map_err(kv_err)?;
        // The range iterator borrows the transaction; collect before deleting.
        let doomed = {
            let mut iter = tx.range(&start, &end).map_err(kv_err)?;
            iter.seek_first().map_err(kv_err)?;
            let mut keys = Vec::new();
            while iter.valid() {
                keys.push(iter.key());
                iter.next().map_err(kv_err)?;
            }
            keys
        };

        let count = doomed.len() as u64;
        for key in &doomed {
            tx.delete(key).map_err(kv_err)?;
        }
        if count > 0 {
            tx.commit().await.map_err(kv_err)?;
        }
        Ok(count)
    }
}
