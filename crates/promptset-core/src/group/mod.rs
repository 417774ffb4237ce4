//! Named prompt groups for bulk activation.
//!
//! A group maps a name to an ordered, deduplicated list of prompt indices
//! in the current preset. Indices are range-checked when a group is
//! created or updated but never afterwards; when the prompt list shrinks
//! the coordinator skips stale indices at resolution time instead of
//! repairing the group.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{SessionError, StorageContext};
use crate::prompt::Prompt;
use crate::storage::{self, GROUPS_NS, JsonStore};

/// Group name -> prompt indices.
pub type GroupMap = BTreeMap<String, Vec<usize>>;

/// On-disk shape of `groups/<preset>`.
#[derive(Debug, Default, Serialize)]
struct GroupsFile {
    groups: GroupMap,
}

/// Lenient read shape: entries are checked individually.
#[derive(Deserialize)]
struct RawGroupsFile {
    #[serde(default)]
    groups: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default)]
pub struct GroupRegistry {
    groups: GroupMap,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_all_groups(&self) -> &GroupMap {
        &self.groups
    }

    /// `None` if the group does not exist; `Some(&[])` for an empty group.
    pub fn get_group(&self, name: &str) -> Option<&[usize]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// Create `name` and persist the registry for `preset_name`.
    pub fn create(
        &mut self,
        name: &str,
        indices: &[usize],
        preset_name: &str,
        all_prompts: &[Prompt],
        store: &mut dyn JsonStore,
    ) -> Result<(), SessionError> {
        validate_group_name(name)?;
        if self.groups.contains_key(name) {
            return Err(SessionError::validation(format!(
                "group {name:?} already exists"
            )));
        }
        let indices = normalize_indices(indices, all_prompts.len())?;
        self.groups.insert(name.to_owned(), indices);
        self.save(preset_name, store)?;
        info!(preset = %preset_name, group = %name, "created prompt group");
        Ok(())
    }

    /// Replace the indices of an existing group.
    pub fn update(
        &mut self,
        name: &str,
        indices: &[usize],
        preset_name: &str,
        all_prompts: &[Prompt],
        store: &mut dyn JsonStore,
    ) -> Result<(), SessionError> {
        if !self.groups.contains_key(name) {
            return Err(SessionError::not_found(format!(
                "group {name:?} does not exist"
            )));
        }
        let indices = normalize_indices(indices, all_prompts.len())?;
        self.groups.insert(name.to_owned(), indices);
        self.save(preset_name, store)?;
        info!(preset = %preset_name, group = %name, "updated prompt group");
        Ok(())
    }

    /// Remove `name`, returning its indices.
    pub fn delete(
        &mut self,
        name: &str,
        preset_name: &str,
        store: &mut dyn JsonStore,
    ) -> Result<Vec<usize>, SessionError> {
        let removed = self
            .groups
            .remove(name)
            .ok_or_else(|| SessionError::not_found(format!("group {name:?} does not exist")))?;
        self.save(preset_name, store)?;
        info!(preset = %preset_name, group = %name, "deleted prompt group");
        Ok(removed)
    }

    /// Replace the in-memory groups with those persisted for `preset_name`.
    ///
    /// A missing or unreadable file yields an empty registry. Entries whose
    /// indices do not parse are dropped one by one; the rest load, and the
    /// dropped ones disappear from the file on the next save. Returns the
    /// number of loaded groups.
    pub fn load(&mut self, preset_name: &str, store: &dyn JsonStore) -> usize {
        self.groups.clear();
        let key = storage::key(GROUPS_NS, preset_name);
        let raw = match store.read_json(&key) {
            Ok(Some(value)) => value,
            Ok(None) => return 0,
            Err(e) => {
                warn!(preset = %preset_name, error = %e, "could not read group file");
                return 0;
            }
        };
        let file = match serde_json::from_value::<RawGroupsFile>(raw) {
            Ok(file) => file,
            Err(e) => {
                warn!(preset = %preset_name, error = %e, "ignoring malformed group file");
                return 0;
            }
        };

        for (name, value) in file.groups {
            match serde_json::from_value::<Vec<usize>>(value) {
                Ok(indices) => {
                    self.groups.insert(name, indices);
                }
                Err(e) => warn!(
                    preset = %preset_name,
                    group = %name,
                    error = %e,
                    "dropping malformed group entry"
                ),
            }
        }
        self.groups.len()
    }

    /// Drop every group from memory without touching the store.
    pub fn reset(&mut self) {
        self.groups.clear();
    }

    fn save(&self, preset_name: &str, store: &mut dyn JsonStore) -> Result<(), SessionError> {
        let file = GroupsFile {
            groups: self.groups.clone(),
        };
        let value = serde_json::to_value(&file)
            .map_err(|e| SessionError::internal(format!("failed to serialize groups: {e}")))?;
        store
            .write_json(&storage::key(GROUPS_NS, preset_name), &value)
            .persist_context(|| format!("failed to save groups for preset {preset_name:?}"))
    }
}

/// Group names are referenced as `@name` by hosts, so they may not contain
/// `@` or whitespace.
pub fn validate_group_name(name: &str) -> Result<(), SessionError> {
    if name.is_empty() {
        return Err(SessionError::validation("group name must not be empty"));
    }
    if name.chars().any(|c| c == '@' || c.is_whitespace() || c.is_control()) {
        return Err(SessionError::validation(format!(
            "group name {name:?} must not contain '@' or whitespace"
        )));
    }
    Ok(())
}

/// Deduplicate `indices` (keeping first occurrences) and check each is
/// below `len`.
fn normalize_indices(indices: &[usize], len: usize) -> Result<Vec<usize>, SessionError> {
    let invalid: Vec<usize> = indices.iter().copied().filter(|&idx| idx >= len).collect();
    if !invalid.is_empty() {
        return Err(SessionError::invalid_indices("prompt", &invalid, len));
    }
    let mut seen = HashSet::new();
    Ok(indices.iter().copied().filter(|idx| seen.insert(*idx)).collect())
}
