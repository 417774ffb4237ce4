//! In-memory [`JsonStore`] for embedding hosts and tests.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use super::{JsonStore, StorageError, key_segments};

#[derive(Debug, Default)]
struct Inner {
    values: BTreeMap<String, serde_json::Value>,
    fail_writes: bool,
}

/// A [`JsonStore`] backed by a shared map.
///
/// Clones share the same map, so a test can hand one clone to a
/// coordinator and keep another to inspect writes or to make subsequent
/// writes fail with [`MemoryJsonStore::set_fail_writes`].
#[derive(Debug, Clone, Default)]
pub struct MemoryJsonStore {
    inner: Rc<RefCell<Inner>>,
}

impl MemoryJsonStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `write_json` fail with [`StorageError::Unavailable`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.borrow_mut().fail_writes = fail;
    }

    /// Return a copy of the value under `key`, if any.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.inner.borrow().values.get(key).cloned()
    }

    /// Insert a value directly, bypassing fault injection.
    pub fn insert(&self, key: impl Into<String>, value: serde_json::Value) {
        self.inner.borrow_mut().values.insert(key.into(), value);
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.borrow().values.keys().cloned().collect()
    }
}

impl JsonStore for MemoryJsonStore {
    fn read_json(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        key_segments(key)?;
        Ok(self.get(key))
    }

    fn write_json(&mut self, key: &str, value: &serde_json::Value) -> Result<(), StorageError> {
        key_segments(key)?;
        let mut inner = self.inner.borrow_mut();
        if inner.fail_writes {
            return Err(StorageError::Unavailable(format!(
                "write to {key:?} rejected"
            )));
        }
        inner.values.insert(key.to_owned(), value.clone());
        Ok(())
    }

    fn list(&self, namespace: &str) -> Result<Vec<String>, StorageError> {
        key_segments(namespace)?;
        let prefix = format!("{namespace}/");
        // BTreeMap keys are already sorted.
        Ok(self
            .inner
            .borrow()
            .values
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter(|rest| !rest.contains('/'))
            .map(str::to_owned)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clones_share_state() {
        let store = MemoryJsonStore::new();
        let mut handle = store.clone();
        handle.write_json("session", &json!({"current_preset": "a"})).unwrap();
        assert_eq!(store.get("session").unwrap()["current_preset"], "a");
    }

    #[test]
    fn fail_writes_rejects_and_keeps_old_value() {
        let mut store = MemoryJsonStore::new();
        store.write_json("groups/a", &json!(1)).unwrap();
        store.set_fail_writes(true);

        let err = store.write_json("groups/a", &json!(2)).unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
        assert_eq!(store.get("groups/a").unwrap(), json!(1));
    }

    #[test]
    fn list_is_scoped_to_direct_children() {
        let store = MemoryJsonStore::new();
        store.insert("extracted/b", json!({}));
        store.insert("extracted/a", json!({}));
        store.insert("extracted/a/nested", json!({}));
        store.insert("groups/a", json!({}));

        assert_eq!(store.list("extracted").unwrap(), vec!["a", "b"]);
    }
}
