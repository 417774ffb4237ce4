//! Preset store: preset name -> ordered prompts + prefix.
//!
//! The store is an in-memory view of every `extracted/<name>` record.
//! Prompt mutations write the whole preset record back synchronously.

pub mod extract;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{SessionError, StorageContext};
use crate::prompt::{Origin, Preset, PresetRecord, Prompt};
use crate::storage::{self, EXTRACTED_NS, JsonStore, StorageError};

pub use extract::{DirectoryExtractor, ExtractReport, Extractor};

/// Aggregate counts reported after a refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshStats {
    pub preset_count: usize,
    pub prompt_count: usize,
}

/// Check that `name` is usable as a preset name (and therefore as a key
/// segment in the store).
pub fn validate_preset_name(name: &str) -> Result<(), SessionError> {
    if name.trim().is_empty() {
        return Err(SessionError::validation("preset name must not be empty"));
    }
    if !storage::is_safe_segment(name) {
        return Err(SessionError::validation(format!(
            "preset name {name:?} must not start with '.' or contain path separators"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct PresetStore {
    presets: BTreeMap<String, Preset>,
}

impl PresetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every normalized preset record. Malformed records are skipped.
    pub fn load(store: &dyn JsonStore) -> Result<Self, StorageError> {
        let mut presets = BTreeMap::new();
        for name in store.list(EXTRACTED_NS)? {
            let key = storage::key(EXTRACTED_NS, &name);
            let value = match store.read_json(&key) {
                Ok(Some(value)) => value,
                Ok(None) => continue,
                Err(e) => {
                    warn!(preset = %name, error = %e, "skipping unreadable preset record");
                    continue;
                }
            };
            match serde_json::from_value::<PresetRecord>(value) {
                Ok(record) => {
                    presets.insert(name.clone(), Preset::from_record(name, record));
                }
                Err(e) => warn!(preset = %name, error = %e, "skipping malformed preset record"),
            }
        }
        info!(presets = presets.len(), "loaded preset store");
        Ok(Self { presets })
    }

    /// Preset names in ascending order.
    pub fn list_preset_names(&self) -> Vec<String> {
        self.presets.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.presets.contains_key(name)
    }

    /// Prompts of `name`, or an empty slice if the preset is unknown.
    pub fn get_prompts(&self, name: &str) -> &[Prompt] {
        self.presets
            .get(name)
            .map(|p| p.prompts.as_slice())
            .unwrap_or_default()
    }

    /// Prefix of `name`, or `""` if the preset is unknown.
    pub fn get_prefix(&self, name: &str) -> &str {
        self.presets
            .get(name)
            .map(|p| p.prefix.as_str())
            .unwrap_or_default()
    }

    pub fn stats(&self) -> RefreshStats {
        RefreshStats {
            preset_count: self.presets.len(),
            prompt_count: self.presets.values().map(|p| p.prompts.len()).sum(),
        }
    }

    /// Create an empty preset and persist its record.
    pub fn create_preset(
        &mut self,
        name: &str,
        store: &mut dyn JsonStore,
    ) -> Result<(), SessionError> {
        validate_preset_name(name)?;
        if self.presets.contains_key(name) {
            return Err(SessionError::validation(format!(
                "preset {name:?} already exists"
            )));
        }
        self.presets.insert(
            name.to_owned(),
            Preset {
                name: name.to_owned(),
                ..Preset::default()
            },
        );
        self.persist(name, store)
    }

    /// Re-run extraction and replace the whole in-memory store.
    ///
    /// Any prompt slices previously borrowed from the store are invalid
    /// afterwards (the borrow checker enforces this for in-process callers).
    pub fn refresh(
        &mut self,
        extractor: &mut dyn Extractor,
        store: &mut dyn JsonStore,
    ) -> Result<RefreshStats, SessionError> {
        let report = extractor
            .extract(store)
            .persist_context(|| "prompt extraction failed".to_owned())?;
        if !report.failed.is_empty() {
            warn!(failed = ?report.failed, "some preset files could not be extracted");
        }
        *self = Self::load(store).persist_context(|| "failed to reload presets".to_owned())?;
        Ok(self.stats())
    }

    /// Append a user-created prompt to `preset`.
    pub fn add_prompt(
        &mut self,
        preset: &str,
        name: &str,
        content: &str,
        store: &mut dyn JsonStore,
    ) -> Result<Prompt, SessionError> {
        let entry = self.preset_mut(preset)?;
        let prompt = Prompt::user(name, content);
        if entry.prompts.contains(&prompt) {
            return Err(SessionError::validation(format!(
                "preset {preset:?} already contains an identical prompt {name:?}"
            )));
        }
        entry.prompts.push(prompt.clone());
        self.persist(preset, store)?;
        Ok(prompt)
    }

    /// Replace the prompt at `index`. Returns `(old, new)`.
    ///
    /// Only [`Origin::UserCreated`] prompts can be updated.
    pub fn update_prompt(
        &mut self,
        preset: &str,
        index: usize,
        name: &str,
        content: &str,
        store: &mut dyn JsonStore,
    ) -> Result<(Prompt, Prompt), SessionError> {
        let entry = self.preset_mut(preset)?;
        let len = entry.prompts.len();
        ensure_mutable(entry.prompts.get(index).ok_or_else(|| out_of_range(index, len))?)?;

        let updated = Prompt::new(name, content, Origin::UserCreated);
        let duplicate = entry
            .prompts
            .iter()
            .enumerate()
            .any(|(i, p)| i != index && *p == updated);
        if duplicate {
            return Err(SessionError::validation(format!(
                "preset {preset:?} already contains an identical prompt {name:?}"
            )));
        }
        let old = std::mem::replace(&mut entry.prompts[index], updated.clone());
        self.persist(preset, store)?;
        Ok((old, updated))
    }

    /// Remove the prompt at `index`. Later prompts shift down by one.
    ///
    /// Only [`Origin::UserCreated`] prompts can be deleted.
    pub fn delete_prompt(
        &mut self,
        preset: &str,
        index: usize,
        store: &mut dyn JsonStore,
    ) -> Result<Prompt, SessionError> {
        let entry = self.preset_mut(preset)?;
        let len = entry.prompts.len();
        let prompt = entry
            .prompts
            .get(index)
            .ok_or_else(|| out_of_range(index, len))?;
        ensure_mutable(prompt)?;

        let removed = entry.prompts.remove(index);
        self.persist(preset, store)?;
        Ok(removed)
    }

    fn preset_mut(&mut self, name: &str) -> Result<&mut Preset, SessionError> {
        self.presets
            .get_mut(name)
            .ok_or_else(|| SessionError::not_found(format!("preset {name:?} does not exist")))
    }

    fn persist(&self, name: &str, store: &mut dyn JsonStore) -> Result<(), SessionError> {
        let preset = self
            .presets
            .get(name)
            .ok_or_else(|| SessionError::internal(format!("preset {name:?} vanished before save")))?;
        let value = serde_json::to_value(preset.to_record()).map_err(|e| {
            SessionError::internal(format!("failed to serialize preset {name:?}: {e}"))
        })?;
        store
            .write_json(&storage::key(EXTRACTED_NS, name), &value)
            .persist_context(|| format!("failed to save preset {name:?}"))
    }
}

fn out_of_range(index: usize, len: usize) -> SessionError {
    SessionError::validation(format!(
        "invalid prompt index {index} (preset has {len} prompts)"
    ))
}

fn ensure_mutable(prompt: &Prompt) -> Result<(), SessionError> {
    if prompt.origin.is_mutable() {
        Ok(())
    } else {
        Err(SessionError::validation(format!(
            "prompt {:?} is {} and cannot be modified",
            prompt.name, prompt.origin
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::storage::MemoryJsonStore;
    use serde_json::json;

    fn seeded_store() -> MemoryJsonStore {
        let store = MemoryJsonStore::new();
        store.insert(
            "extracted/rp",
            json!({
                "prompts": [
                    {"name": "A", "content": "a", "origin": "extracted"},
                    {"name": "B", "content": "b", "origin": "user-created"}
                ],
                "prefix": "SYS"
            }),
        );
        store.insert("extracted/assistant", json!({"prompts": []}));
        store.insert("extracted/broken", json!({"prompts": "nope"}));
        store
    }

    #[test]
    fn load_skips_malformed_records() {
        let store = PresetStore::load(&seeded_store()).unwrap();
        assert_eq!(store.list_preset_names(), vec!["assistant", "rp"]);
        assert_eq!(store.get_prompts("rp").len(), 2);
        assert_eq!(store.get_prefix("rp"), "SYS");
        assert_eq!(
            store.stats(),
            RefreshStats {
                preset_count: 2,
                prompt_count: 2
            }
        );
    }

    #[test]
    fn unknown_preset_reads_empty() {
        let store = PresetStore::new();
        assert!(store.get_prompts("nope").is_empty());
        assert_eq!(store.get_prefix("nope"), "");
    }

    #[test]
    fn create_preset_rejects_duplicates_and_bad_names() {
        let mut mem = seeded_store();
        let mut store = PresetStore::load(&mem).unwrap();

        store.create_preset("fresh", &mut mem).unwrap();
        assert!(store.contains("fresh"));
        assert_eq!(mem.get("extracted/fresh").unwrap(), json!({"prompts": [], "prefix": ""}));

        for bad in ["", "  ", "rp", "../x", ".hidden"] {
            let err = store.create_preset(bad, &mut mem).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "name {bad:?}");
        }
    }

    #[test]
    fn add_appends_user_prompt_and_persists() {
        let mut mem = seeded_store();
        let mut store = PresetStore::load(&mem).unwrap();

        let added = store.add_prompt("rp", "C", "c", &mut mem).unwrap();
        assert_eq!(added, Prompt::user("C", "c"));
        assert_eq!(store.get_prompts("rp")[2], added);

        let saved: PresetRecord = serde_json::from_value(mem.get("extracted/rp").unwrap()).unwrap();
        assert_eq!(saved.prompts.len(), 3);

        let dup = store.add_prompt("rp", "C", "c", &mut mem).unwrap_err();
        assert_eq!(dup.kind(), ErrorKind::Validation);
    }

    #[test]
    fn extracted_prompts_are_immutable() {
        let mut mem = seeded_store();
        let mut store = PresetStore::load(&mem).unwrap();

        assert!(store.update_prompt("rp", 0, "A2", "a2", &mut mem).is_err());
        assert!(store.delete_prompt("rp", 0, &mut mem).is_err());
        assert_eq!(store.get_prompts("rp")[0], Prompt::extracted("A", "a"));
    }

    #[test]
    fn update_and_delete_user_prompt() {
        let mut mem = seeded_store();
        let mut store = PresetStore::load(&mem).unwrap();

        let (old, new) = store.update_prompt("rp", 1, "B2", "b2", &mut mem).unwrap();
        assert_eq!(old, Prompt::user("B", "b"));
        assert_eq!(new, Prompt::user("B2", "b2"));

        let removed = store.delete_prompt("rp", 1, &mut mem).unwrap();
        assert_eq!(removed, new);
        assert_eq!(store.get_prompts("rp").len(), 1);

        let err = store.delete_prompt("rp", 5, &mut mem).unwrap_err();
        assert!(err.to_string().contains("invalid prompt index 5"));
    }

    #[test]
    fn update_rejects_identical_prompt_elsewhere() {
        let mut mem = seeded_store();
        let mut store = PresetStore::load(&mem).unwrap();
        store.add_prompt("rp", "C", "c", &mut mem).unwrap();

        let err = store.update_prompt("rp", 1, "C", "c", &mut mem).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(store.get_prompts("rp")[1], Prompt::user("B", "b"));

        let (old, new) = store.update_prompt("rp", 2, "C", "c", &mut mem).unwrap();
        assert_eq!(old, new);
    }

    #[test]
    fn write_failure_keeps_in_memory_change() {
        let mut mem = seeded_store();
        let mut store = PresetStore::load(&mem).unwrap();
        mem.set_fail_writes(true);

        let err = store.add_prompt("rp", "C", "c", &mut mem).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert_eq!(store.get_prompts("rp").len(), 3);
    }
}
