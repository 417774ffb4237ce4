//! The session coordinator: current preset plus every host-facing operation.
//!
//! Each public operation runs a private `try_*` method returning
//! `Result<(message, payload), SessionError>` and converts it into an
//! [`Outcome`] at the boundary, so hosts never see a Rust error.

mod indices;
mod outcome;
mod request;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::activation::ActivationTracker;
use crate::config::StoreConfig;
use crate::error::{ErrorKind, SessionError, StorageContext};
use crate::group::{GroupMap, GroupRegistry};
use crate::preset::{DirectoryExtractor, Extractor, PresetStore, RefreshStats};
use crate::prompt::Prompt;
use crate::storage::{FsJsonStore, JsonStore, SESSION_KEY};

pub use indices::parse_index_list;
pub use outcome::Outcome;
pub use request::compose_system_prompt;

/// Persisted under the `session` key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Empty when no preset is selected.
    #[serde(default)]
    pub current_preset: String,
}

type Attempt<T> = Result<(String, T), SessionError>;

pub struct SessionCoordinator {
    store: Box<dyn JsonStore>,
    extractor: Box<dyn Extractor>,
    presets: PresetStore,
    tracker: ActivationTracker,
    groups: GroupRegistry,
    state: SessionState,
}

impl SessionCoordinator {
    /// Load presets from `store` and restore the last session.
    ///
    /// The persisted current preset is reused if it still exists; otherwise
    /// the first preset (by name) becomes current. Groups and activation
    /// state of the current preset are then restored.
    pub fn new(
        store: Box<dyn JsonStore>,
        extractor: Box<dyn Extractor>,
    ) -> Result<Self, SessionError> {
        let presets = PresetStore::load(store.as_ref())
            .persist_context(|| "failed to load presets".to_owned())?;

        let mut coordinator = Self {
            store,
            extractor,
            presets,
            tracker: ActivationTracker::new(),
            groups: GroupRegistry::new(),
            state: SessionState::default(),
        };

        let first = coordinator.first_preset();
        coordinator.state.current_preset = match coordinator.read_session() {
            Some(saved) if coordinator.presets.contains(&saved) => saved,
            Some(saved) if !saved.is_empty() => {
                warn!(preset = %saved, "last used preset no longer exists");
                first
            }
            _ => first,
        };
        coordinator.load_preset_state();

        if coordinator.state.current_preset.is_empty() {
            warn!("no presets available; add preset files and refresh");
        } else {
            info!(
                preset = %coordinator.state.current_preset,
                active = coordinator.tracker.len(),
                groups = coordinator.groups.get_all_groups().len(),
                "session initialized"
            );
        }
        Ok(coordinator)
    }

    /// Coordinator over the filesystem layout described by `config`.
    pub fn open(config: &StoreConfig) -> Result<Self, SessionError> {
        Self::new(
            Box::new(FsJsonStore::new(config.state_dir())),
            Box::new(DirectoryExtractor::new(config.presets_dir())),
        )
    }

    // -----------------------------------------------------------------------
    // Read accessors
    // -----------------------------------------------------------------------

    pub fn preset_list(&self) -> Vec<String> {
        self.presets.list_preset_names()
    }

    /// Empty when no preset is selected.
    pub fn current_preset_name(&self) -> &str {
        &self.state.current_preset
    }

    pub fn current_prompts(&self) -> &[Prompt] {
        self.presets.get_prompts(&self.state.current_preset)
    }

    pub fn current_prefix(&self) -> &str {
        self.presets.get_prefix(&self.state.current_preset)
    }

    pub fn active_prompts(&self) -> &[Prompt] {
        self.tracker.active()
    }

    pub fn prompt_groups(&self) -> &GroupMap {
        self.groups.get_all_groups()
    }

    pub fn prompt_group(&self, name: &str) -> Option<&[usize]> {
        self.groups.get_group(name)
    }

    // -----------------------------------------------------------------------
    // Presets
    // -----------------------------------------------------------------------

    pub fn switch_preset(&mut self, index: usize) -> Outcome<()> {
        finish("switch_preset", self.try_switch_preset(index))
    }

    pub fn create_preset(&mut self, name: &str) -> Outcome<()> {
        finish("create_preset", self.try_create_preset(name))
    }

    pub fn refresh_prompts(&mut self) -> Outcome<RefreshStats> {
        finish("refresh_prompts", self.try_refresh_prompts())
    }

    fn try_switch_preset(&mut self, index: usize) -> Attempt<()> {
        let names = self.presets.list_preset_names();
        if names.is_empty() {
            return Err(SessionError::validation("no presets available"));
        }
        let name = names
            .get(index)
            .cloned()
            .ok_or_else(|| SessionError::invalid_indices("preset", &[index], names.len()))?;

        self.tracker.clear();
        self.state.current_preset = name;
        self.load_preset_state();
        self.save_session()?;
        Ok((
            format!("switched to preset {:?}", self.state.current_preset),
            (),
        ))
    }

    fn try_create_preset(&mut self, name: &str) -> Attempt<()> {
        self.presets.create_preset(name, self.store.as_mut())?;
        self.state.current_preset = name.to_owned();
        self.tracker.clear();
        self.groups.reset();
        self.save_session()?;
        Ok((format!("created preset {name:?}"), ()))
    }

    fn try_refresh_prompts(&mut self) -> Attempt<RefreshStats> {
        let stats = self
            .presets
            .refresh(self.extractor.as_mut(), self.store.as_mut())?;

        // Refresh starts clean: activation of the new current preset is
        // not restored.
        self.tracker.clear();
        self.state.current_preset = self.first_preset();
        if self.state.current_preset.is_empty() {
            self.groups.reset();
        } else {
            self.groups.load(&self.state.current_preset, self.store.as_ref());
        }
        self.save_session()?;

        let message = if stats.preset_count == 0 {
            "no presets found; check the preset files".to_owned()
        } else {
            format!(
                "reloaded {} presets with {} prompts",
                stats.preset_count, stats.prompt_count
            )
        };
        Ok((message, stats))
    }

    // -----------------------------------------------------------------------
    // Activation
    // -----------------------------------------------------------------------

    pub fn activate_prompt(&mut self, index: usize) -> Outcome<Option<Prompt>> {
        finish("activate_prompt", self.try_activate_prompt(index))
    }

    pub fn activate_prompts(&mut self, indices: &[usize]) -> Outcome<Vec<Prompt>> {
        finish("activate_prompts", self.try_activate_prompts(indices))
    }

    pub fn activate_prompt_group(&mut self, name: &str) -> Outcome<Vec<Prompt>> {
        finish("activate_prompt_group", self.try_activate_prompt_group(name))
    }

    pub fn deactivate_prompt(&mut self, active_index: usize) -> Outcome<Option<Prompt>> {
        finish("deactivate_prompt", self.try_deactivate_prompt(active_index))
    }

    pub fn deactivate_prompts(&mut self, active_indices: &[usize]) -> Outcome<Vec<Prompt>> {
        finish("deactivate_prompts", self.try_deactivate_prompts(active_indices))
    }

    pub fn deactivate_prompt_group(&mut self, name: &str) -> Outcome<Vec<Prompt>> {
        finish("deactivate_prompt_group", self.try_deactivate_prompt_group(name))
    }

    pub fn clear_active_prompts(&mut self) -> Outcome<usize> {
        finish("clear_active_prompts", self.try_clear_active_prompts())
    }

    fn try_activate_prompt(&mut self, index: usize) -> Attempt<Option<Prompt>> {
        let preset = self.require_preset()?;
        let prompts = self.presets.get_prompts(&preset);
        if prompts.is_empty() {
            return Err(no_prompts(&preset));
        }
        let prompt = prompts
            .get(index)
            .cloned()
            .ok_or_else(|| SessionError::invalid_indices("prompt", &[index], prompts.len()))?;

        if self.tracker.is_active(&prompt) {
            return Ok((
                format!("prompt {:?} is already active", prompt.name),
                Some(prompt),
            ));
        }
        if self.tracker.activate(prompts, &[index]).is_empty() {
            return Err(SessionError::internal(format!(
                "activating prompt {:?} changed nothing",
                prompt.name
            )));
        }
        self.save_activation()?;
        Ok((format!("activated prompt {:?}", prompt.name), Some(prompt)))
    }

    fn try_activate_prompts(&mut self, indices: &[usize]) -> Attempt<Vec<Prompt>> {
        if indices.is_empty() {
            return Err(SessionError::validation("index list must not be empty"));
        }
        let preset = self.require_preset()?;
        let prompts = self.presets.get_prompts(&preset);
        if prompts.is_empty() {
            return Err(no_prompts(&preset));
        }
        let invalid: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&idx| idx >= prompts.len())
            .collect();
        if !invalid.is_empty() {
            return Err(SessionError::invalid_indices("prompt", &invalid, prompts.len()));
        }

        let newly = self.tracker.activate(prompts, indices);
        if newly.is_empty() {
            return Ok(("all selected prompts are already active".to_owned(), newly));
        }
        self.save_activation()?;
        Ok((format!("activated {} prompts", newly.len()), newly))
    }

    fn try_activate_prompt_group(&mut self, name: &str) -> Attempt<Vec<Prompt>> {
        let preset = self.require_preset()?;
        let indices = self.group_indices(name)?;
        if indices.is_empty() {
            return Err(SessionError::validation(format!("group {name:?} is empty")));
        }
        let prompts = self.presets.get_prompts(&preset);
        if prompts.is_empty() {
            return Err(no_prompts(&preset));
        }
        let (valid, stale) = split_in_range(&indices, prompts.len());
        if valid.is_empty() {
            return Err(SessionError::validation(format!(
                "group {name:?} has no indices within the preset's {} prompts",
                prompts.len()
            )));
        }
        if !stale.is_empty() {
            warn!(preset = %preset, group = %name, ?stale, "skipping stale group indices");
        }

        let newly = self.tracker.activate(prompts, &valid);
        let mut message = if newly.is_empty() {
            format!("all prompts in group {name:?} are already active")
        } else {
            format!("activated {} prompts from group {name:?}", newly.len())
        };
        if !stale.is_empty() {
            message.push_str(&format!(" (skipped stale indices: {})", join_indices(&stale)));
        }
        if !newly.is_empty() {
            self.save_activation()?;
        }
        Ok((message, newly))
    }

    fn try_deactivate_prompt(&mut self, active_index: usize) -> Attempt<Option<Prompt>> {
        self.require_preset()?;
        if self.tracker.is_empty() {
            return Err(SessionError::validation("no prompts are active"));
        }
        if active_index >= self.tracker.len() {
            return Err(SessionError::invalid_indices(
                "active prompt",
                &[active_index],
                self.tracker.len(),
            ));
        }
        let removed = self.tracker.deactivate(active_index).ok_or_else(|| {
            SessionError::internal(format!("active prompt {active_index} vanished"))
        })?;
        self.save_activation()?;
        Ok((format!("deactivated prompt {:?}", removed.name), Some(removed)))
    }

    fn try_deactivate_prompts(&mut self, active_indices: &[usize]) -> Attempt<Vec<Prompt>> {
        if active_indices.is_empty() {
            return Err(SessionError::validation("index list must not be empty"));
        }
        self.require_preset()?;
        if self.tracker.is_empty() {
            return Err(SessionError::validation("no prompts are active"));
        }
        let (valid, invalid) = split_in_range(active_indices, self.tracker.len());
        if valid.is_empty() {
            return Err(SessionError::invalid_indices(
                "active prompt",
                &invalid,
                self.tracker.len(),
            ));
        }
        if !invalid.is_empty() {
            warn!(?invalid, "ignoring out-of-range active prompt indices");
        }

        let removed = self.tracker.deactivate_many(&valid);
        if removed.is_empty() {
            return Err(SessionError::internal("no prompts were deactivated"));
        }
        self.save_activation()?;
        Ok((format!("deactivated {} prompts", removed.len()), removed))
    }

    fn try_deactivate_prompt_group(&mut self, name: &str) -> Attempt<Vec<Prompt>> {
        let preset = self.require_preset()?;
        let indices = self.group_indices(name)?;
        if indices.is_empty() {
            return Ok((
                format!("group {name:?} is empty; nothing to deactivate"),
                Vec::new(),
            ));
        }
        let prompts = self.presets.get_prompts(&preset);
        let (valid, stale) = split_in_range(&indices, prompts.len());
        if !stale.is_empty() {
            warn!(preset = %preset, group = %name, ?stale, "skipping stale group indices");
        }
        if valid.is_empty() {
            return Err(SessionError::validation(format!(
                "group {name:?} has no indices within the preset's {} prompts",
                prompts.len()
            )));
        }

        let values: Vec<Prompt> = valid.iter().map(|&idx| prompts[idx].clone()).collect();
        let removed = self.tracker.deactivate_by_value(&values);
        let mut message = if removed.is_empty() {
            format!("no prompts in group {name:?} are active")
        } else {
            format!("deactivated {} prompts from group {name:?}", removed.len())
        };
        if !stale.is_empty() {
            message.push_str(&format!(" (skipped stale indices: {})", join_indices(&stale)));
        }
        if !removed.is_empty() {
            self.save_activation()?;
        }
        Ok((message, removed))
    }

    fn try_clear_active_prompts(&mut self) -> Attempt<usize> {
        let count = self.tracker.clear();
        if count == 0 {
            return Ok(("no prompts are active".to_owned(), 0));
        }
        if !self.state.current_preset.is_empty() {
            self.save_activation()?;
        }
        Ok((format!("cleared {count} active prompts"), count))
    }

    // -----------------------------------------------------------------------
    // Prompt CRUD
    // -----------------------------------------------------------------------

    pub fn add_prompt(&mut self, name: &str, content: &str) -> Outcome<Option<Prompt>> {
        finish("add_prompt", self.try_add_prompt(name, content))
    }

    pub fn update_prompt(
        &mut self,
        index: usize,
        name: &str,
        content: &str,
    ) -> Outcome<Option<Prompt>> {
        finish("update_prompt", self.try_update_prompt(index, name, content))
    }

    pub fn delete_prompt(&mut self, index: usize) -> Outcome<Option<Prompt>> {
        finish("delete_prompt", self.try_delete_prompt(index))
    }

    fn try_add_prompt(&mut self, name: &str, content: &str) -> Attempt<Option<Prompt>> {
        let preset = self.require_preset()?;
        validate_prompt_input(name, content)?;
        let prompt = self
            .presets
            .add_prompt(&preset, name, content, self.store.as_mut())?;
        Ok((format!("added prompt {name:?}"), Some(prompt)))
    }

    fn try_update_prompt(
        &mut self,
        index: usize,
        name: &str,
        content: &str,
    ) -> Attempt<Option<Prompt>> {
        let preset = self.require_preset()?;
        validate_prompt_input(name, content)?;

        let before = self.presets.get_prompts(&preset).get(index).cloned();
        let result = self
            .presets
            .update_prompt(&preset, index, name, content, self.store.as_mut());

        // A failed write still leaves the edit in memory; keep the active
        // set pointing at whatever value now sits at `index`.
        let after = self.presets.get_prompts(&preset).get(index).cloned();
        let mut replaced = false;
        if let (Some(before), Some(after)) = (before, after) {
            if before != after {
                replaced = self.tracker.replace(&before, after);
            }
        }

        let (_, updated) = result?;
        if replaced {
            self.save_activation()?;
        }
        Ok((format!("updated prompt {:?}", updated.name), Some(updated)))
    }

    fn try_delete_prompt(&mut self, index: usize) -> Attempt<Option<Prompt>> {
        let preset = self.require_preset()?;
        let before = self.presets.get_prompts(&preset).get(index).cloned();
        let result = self
            .presets
            .delete_prompt(&preset, index, self.store.as_mut());

        let mut dropped = false;
        if let Some(before) = before {
            if !self.presets.get_prompts(&preset).contains(&before) {
                dropped = !self
                    .tracker
                    .deactivate_by_value(std::slice::from_ref(&before))
                    .is_empty();
            }
        }

        let removed = result?;
        if dropped {
            self.save_activation()?;
        }
        Ok((format!("deleted prompt {:?}", removed.name), Some(removed)))
    }

    // -----------------------------------------------------------------------
    // Groups
    // -----------------------------------------------------------------------

    pub fn create_prompt_group(&mut self, name: &str, indices: &[usize]) -> Outcome<()> {
        finish("create_prompt_group", self.try_create_prompt_group(name, indices))
    }

    pub fn update_prompt_group(&mut self, name: &str, indices: &[usize]) -> Outcome<()> {
        finish("update_prompt_group", self.try_update_prompt_group(name, indices))
    }

    pub fn delete_prompt_group(&mut self, name: &str) -> Outcome<()> {
        finish("delete_prompt_group", self.try_delete_prompt_group(name))
    }

    fn try_create_prompt_group(&mut self, name: &str, indices: &[usize]) -> Attempt<()> {
        let preset = self.require_preset()?;
        let prompts = self.presets.get_prompts(&preset);
        self.groups
            .create(name, indices, &preset, prompts, self.store.as_mut())?;
        let count = self.groups.get_group(name).map_or(0, <[usize]>::len);
        Ok((format!("created group {name:?} with {count} prompts"), ()))
    }

    fn try_update_prompt_group(&mut self, name: &str, indices: &[usize]) -> Attempt<()> {
        let preset = self.require_preset()?;
        let prompts = self.presets.get_prompts(&preset);
        self.groups
            .update(name, indices, &preset, prompts, self.store.as_mut())?;
        Ok((format!("updated group {name:?}"), ()))
    }

    fn try_delete_prompt_group(&mut self, name: &str) -> Attempt<()> {
        let preset = self.require_preset()?;
        self.groups.delete(name, &preset, self.store.as_mut())?;
        Ok((format!("deleted group {name:?}"), ()))
    }

    // -----------------------------------------------------------------------
    // Request transform and shutdown
    // -----------------------------------------------------------------------

    /// Prepend the prefix and active prompts to `system`. `user` passes
    /// through unchanged. Never fails and never touches the store.
    pub fn process_llm_request(&self, system: &str, user: &str) -> (String, String) {
        let prefix = self.current_prefix();
        let active = self.tracker.active();
        let composed = compose_system_prompt(prefix, active, system);
        if !active.is_empty() || !prefix.is_empty() {
            debug!(
                preset = %self.state.current_preset,
                active = active.len(),
                has_prefix = !prefix.is_empty(),
                "prepended prompts to request"
            );
        }
        (composed, user.to_owned())
    }

    /// Drop in-memory activation state. Persisted state is left as is.
    pub fn terminate(&mut self) {
        let count = self.tracker.clear();
        info!(cleared = count, "session terminated");
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn require_preset(&self) -> Result<String, SessionError> {
        if self.state.current_preset.is_empty() {
            Err(SessionError::validation("no preset is selected"))
        } else {
            Ok(self.state.current_preset.clone())
        }
    }

    fn group_indices(&self, name: &str) -> Result<Vec<usize>, SessionError> {
        if name.is_empty() {
            return Err(SessionError::validation("group name must not be empty"));
        }
        self.groups
            .get_group(name)
            .map(<[usize]>::to_vec)
            .ok_or_else(|| SessionError::not_found(format!("group {name:?} does not exist")))
    }

    fn first_preset(&self) -> String {
        self.presets
            .list_preset_names()
            .into_iter()
            .next()
            .unwrap_or_default()
    }

    /// Load groups and activation state of the current preset.
    fn load_preset_state(&mut self) {
        let name = &self.state.current_preset;
        if name.is_empty() {
            self.groups.reset();
            self.tracker.clear();
            return;
        }
        self.groups.load(name, self.store.as_ref());
        let prompts = self.presets.get_prompts(name);
        self.tracker.load(name, prompts, self.store.as_ref());
    }

    fn save_activation(&mut self) -> Result<(), SessionError> {
        let name = &self.state.current_preset;
        let prompts = self.presets.get_prompts(name);
        self.tracker
            .save(name, prompts, self.store.as_mut())
            .persist_context(|| format!("failed to save activation state for preset {name:?}"))
    }

    fn read_session(&self) -> Option<String> {
        match self.store.read_json(SESSION_KEY) {
            Ok(Some(value)) => match serde_json::from_value::<SessionState>(value) {
                Ok(state) => Some(state.current_preset),
                Err(e) => {
                    warn!(error = %e, "ignoring malformed session record");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "could not read session record");
                None
            }
        }
    }

    fn save_session(&mut self) -> Result<(), SessionError> {
        let value = serde_json::to_value(&self.state)
            .map_err(|e| SessionError::internal(format!("failed to serialize session: {e}")))?;
        self.store
            .write_json(SESSION_KEY, &value)
            .persist_context(|| "failed to save session".to_owned())
    }
}

fn finish<T: Default>(op: &'static str, result: Attempt<T>) -> Outcome<T> {
    match result {
        Ok((message, payload)) => {
            info!(op, "{message}");
            Outcome::ok(message, payload)
        }
        Err(e) => {
            match e.kind() {
                ErrorKind::Persistence | ErrorKind::Internal => {
                    error!(op, error = %e, "operation failed");
                }
                ErrorKind::Validation | ErrorKind::NotFound => {
                    warn!(op, error = %e, "operation rejected");
                }
            }
            Outcome::failed(&e)
        }
    }
}

fn no_prompts(preset: &str) -> SessionError {
    SessionError::validation(format!("preset {preset:?} has no prompts"))
}

fn validate_prompt_input(name: &str, content: &str) -> Result<(), SessionError> {
    if name.trim().is_empty() {
        return Err(SessionError::validation("prompt name must not be empty"));
    }
    if content.trim().is_empty() {
        return Err(SessionError::validation("prompt content must not be empty"));
    }
    Ok(())
}

/// Partition `indices` into those below `len` and the rest, keeping order.
fn split_in_range(indices: &[usize], len: usize) -> (Vec<usize>, Vec<usize>) {
    indices.iter().partition(|&&idx| idx < len)
}

fn join_indices(indices: &[usize]) -> String {
    indices
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
