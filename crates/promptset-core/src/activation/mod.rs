//! Activation tracking for the current preset.
//!
//! The active set is an ordered list of prompt *values*, in activation
//! order. It is persisted as [`PromptMarker`]s and restored by matching
//! each marker against the preset's current prompt list:
//!
//! ```text
//! Empty --activate--> Active(n) --deactivate(k)--> Active(n-k) | Empty
//!   ^                     |
//!   +------clear----------+
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::prompt::{Prompt, PromptMarker};
use crate::storage::{self, ACTIVATION_NS, JsonStore, StorageError};

/// On-disk shape of `activation/<preset>`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ActivationFile {
    #[serde(default)]
    active: Vec<PromptMarker>,
}

#[derive(Debug, Clone, Default)]
pub struct ActivationTracker {
    active: Vec<Prompt>,
}

impl ActivationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Active prompts in activation order.
    pub fn active(&self) -> &[Prompt] {
        &self.active
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn is_active(&self, prompt: &Prompt) -> bool {
        self.active.contains(prompt)
    }

    /// Append the prompts at `indices` that are not active yet.
    ///
    /// Indices are expected to be validated by the caller; any that fall
    /// outside `all_prompts` are ignored. Returns the newly appended
    /// prompts in input order. An empty result means everything was
    /// already active.
    pub fn activate(&mut self, all_prompts: &[Prompt], indices: &[usize]) -> Vec<Prompt> {
        let mut newly = Vec::new();
        for &idx in indices {
            let Some(prompt) = all_prompts.get(idx) else {
                continue;
            };
            if !self.active.contains(prompt) {
                self.active.push(prompt.clone());
                newly.push(prompt.clone());
            }
        }
        newly
    }

    /// Remove the entry at `active_index` (a position in the active list,
    /// not in the preset).
    pub fn deactivate(&mut self, active_index: usize) -> Option<Prompt> {
        (active_index < self.active.len()).then(|| self.active.remove(active_index))
    }

    /// Remove several active-list positions at once.
    ///
    /// Positions are deduplicated and removed from highest to lowest so
    /// earlier removals never shift later ones. Out-of-range positions are
    /// ignored. Returns the removed prompts in removal order.
    pub fn deactivate_many(&mut self, active_indices: &[usize]) -> Vec<Prompt> {
        let mut sorted: Vec<usize> = active_indices.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();
        sorted
            .into_iter()
            .filter_map(|idx| self.deactivate(idx))
            .collect()
    }

    /// Remove every active entry equal to one of `values`.
    pub fn deactivate_by_value(&mut self, values: &[Prompt]) -> Vec<Prompt> {
        let mut removed = Vec::new();
        self.active.retain(|p| {
            if values.contains(p) {
                removed.push(p.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// Swap `old` for `new` in place, keeping its activation position.
    /// Returns `false` if `old` was not active.
    pub fn replace(&mut self, old: &Prompt, new: Prompt) -> bool {
        if self.active.contains(&new) {
            // The new value is already active elsewhere; just drop the old one.
            return !self.deactivate_by_value(std::slice::from_ref(old)).is_empty();
        }
        match self.active.iter_mut().find(|p| **p == *old) {
            Some(slot) => {
                *slot = new;
                true
            }
            None => false,
        }
    }

    /// Drop every active entry (in memory only). Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let count = self.active.len();
        self.active.clear();
        count
    }

    /// Persist the active set of `preset_name` as markers.
    ///
    /// Entries no longer present in `all_prompts` are not written.
    pub fn save(
        &self,
        preset_name: &str,
        all_prompts: &[Prompt],
        store: &mut dyn JsonStore,
    ) -> Result<(), StorageError> {
        let active: Vec<PromptMarker> = self
            .active
            .iter()
            .filter(|p| {
                let present = all_prompts.contains(*p);
                if !present {
                    debug!(preset = %preset_name, prompt = %p.name, "not saving stale active prompt");
                }
                present
            })
            .map(Prompt::marker)
            .collect();
        let file = ActivationFile { active };
        let value = serde_json::to_value(&file).map_err(|source| StorageError::Json {
            key: storage::key(ACTIVATION_NS, preset_name),
            source,
        })?;
        store.write_json(&storage::key(ACTIVATION_NS, preset_name), &value)?;
        debug!(preset = %preset_name, count = file.active.len(), "saved activation state");
        Ok(())
    }

    /// Replace the in-memory set with the persisted state of `preset_name`.
    ///
    /// Markers that no longer match a prompt in `all_prompts` are dropped.
    /// A missing or unreadable activation file leaves the set empty.
    /// Returns the number of restored entries.
    pub fn load(
        &mut self,
        preset_name: &str,
        all_prompts: &[Prompt],
        store: &dyn JsonStore,
    ) -> usize {
        self.active.clear();

        let key = storage::key(ACTIVATION_NS, preset_name);
        let file = match store.read_json(&key) {
            Ok(Some(value)) => match serde_json::from_value::<ActivationFile>(value) {
                Ok(file) => file,
                Err(e) => {
                    warn!(preset = %preset_name, error = %e, "ignoring malformed activation file");
                    return 0;
                }
            },
            Ok(None) => return 0,
            Err(e) => {
                warn!(preset = %preset_name, error = %e, "could not read activation file");
                return 0;
            }
        };

        let mut dropped = 0usize;
        for marker in &file.active {
            match all_prompts.iter().find(|p| marker.matches(p)) {
                Some(prompt) if !self.active.contains(prompt) => self.active.push(prompt.clone()),
                Some(_) => {}
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!(preset = %preset_name, dropped, "dropped active prompts that no longer exist");
        }
        info!(preset = %preset_name, restored = self.active.len(), "restored activation state");
        self.active.len()
    }
}
