//! Shared test utilities for promptset integration tests.
//!
//! Two kinds of fixture:
//! - [`TestDataDir`]: a temporary data directory laid out like a real
//!   install (`presets/` raw files, `state/` JSON store), for tests that
//!   exercise the filesystem end to end.
//! - [`memory_session`]: a coordinator over a shared [`MemoryJsonStore`]
//!   seeded by a [`StaticExtractor`], for fast scenario tests with fault
//!   injection.

use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tempfile::TempDir;

use promptset_core::prompt::PresetRecord;
use promptset_core::storage::{self, EXTRACTED_NS};
use promptset_core::{
    ExtractReport, Extractor, JsonStore, MemoryJsonStore, Prompt, SessionCoordinator,
    StorageError, StoreConfig,
};

/// Three extracted prompts `A`, `B`, `C` with contents `alpha`, `beta`,
/// `gamma`.
pub fn sample_prompts() -> Vec<Prompt> {
    vec![
        Prompt::extracted("A", "alpha"),
        Prompt::extracted("B", "beta"),
        Prompt::extracted("C", "gamma"),
    ]
}

/// Raw preset file body (the format `DirectoryExtractor` reads) for `prompts`.
pub fn raw_preset(prompts: &[(&str, &str)], prefix: Option<&str>) -> Value {
    let prompts: Vec<Value> = prompts
        .iter()
        .map(|(name, content)| json!({"name": name, "content": content}))
        .collect();
    match prefix {
        Some(prefix) => json!({"prompts": prompts, "prefix": prefix}),
        None => json!({"prompts": prompts}),
    }
}

// ---------------------------------------------------------------------------
// StaticExtractor
// ---------------------------------------------------------------------------

/// Extractor that writes a fixed set of presets on every run.
///
/// Like the directory extractor it keeps user-created prompts already in
/// the store, so refresh scenarios behave the same way.
#[derive(Debug, Clone, Default)]
pub struct StaticExtractor {
    presets: Vec<(String, PresetRecord)>,
}

impl StaticExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a preset to the fixed set.
    pub fn with_preset(mut self, name: &str, prompts: Vec<Prompt>, prefix: &str) -> Self {
        self.presets.push((
            name.to_owned(),
            PresetRecord {
                prompts,
                prefix: prefix.to_owned(),
            },
        ));
        self
    }

    /// Replace the prompts of `name` for subsequent runs.
    pub fn set_prompts(&mut self, name: &str, prompts: Vec<Prompt>) {
        if let Some((_, record)) = self.presets.iter_mut().find(|(n, _)| n == name) {
            record.prompts = prompts;
        }
    }
}

impl Extractor for StaticExtractor {
    fn extract(&mut self, store: &mut dyn JsonStore) -> Result<ExtractReport, StorageError> {
        let mut report = ExtractReport::default();
        for (name, record) in &self.presets {
            let key = storage::key(EXTRACTED_NS, name);
            let kept: Vec<Prompt> = store
                .read_json(&key)?
                .and_then(|v| serde_json::from_value::<PresetRecord>(v).ok())
                .map(|existing| {
                    existing
                        .prompts
                        .into_iter()
                        .filter(|p| p.origin.is_mutable())
                        .collect()
                })
                .unwrap_or_default();

            let mut merged = record.clone();
            merged.prompts.extend(kept);
            let value = serde_json::to_value(&merged).map_err(|source| StorageError::Json {
                key: key.clone(),
                source,
            })?;
            match store.write_json(&key, &value) {
                Ok(()) => report.extracted.push(name.clone()),
                Err(_) => report.failed.push(name.clone()),
            }
        }
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Store seeded with preset `rp` (prompts [`sample_prompts`], prefix
/// `SYS`) and an empty preset `assistant`, plus a coordinator over it.
///
/// The returned store shares state with the coordinator's copy.
pub fn memory_session() -> (MemoryJsonStore, SessionCoordinator) {
    let extractor = StaticExtractor::new()
        .with_preset("rp", sample_prompts(), "SYS")
        .with_preset("assistant", Vec::new(), "");
    memory_session_with(extractor)
}

/// Like [`memory_session`] with a caller-supplied extractor, which is run
/// once to seed the store.
pub fn memory_session_with(mut extractor: StaticExtractor) -> (MemoryJsonStore, SessionCoordinator) {
    let mut store = MemoryJsonStore::new();
    extractor
        .extract(&mut store)
        .expect("seeding the memory store failed");
    let session = SessionCoordinator::new(Box::new(store.clone()), Box::new(extractor))
        .expect("failed to build coordinator");
    (store, session)
}

/// A temporary data directory with `presets/` and `state/` subdirectories.
///
/// The directory is removed when the fixture is dropped.
pub struct TestDataDir {
    _tmp: TempDir,
    config: StoreConfig,
}

impl TestDataDir {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let config = StoreConfig::new(tmp.path().join("data"));
        std::fs::create_dir_all(config.presets_dir()).expect("failed to create presets dir");
        Self { _tmp: tmp, config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        self.config.data_dir()
    }

    /// Write `<presets_dir>/<name>.json` and return its path.
    pub fn write_raw_preset(&self, name: &str, body: &Value) -> PathBuf {
        let path = self.config.presets_dir().join(format!("{name}.json"));
        std::fs::write(&path, body.to_string()).expect("failed to write raw preset");
        path
    }

    /// Read a persisted record straight from `state/`.
    pub fn read_state(&self, key: &str) -> Option<Value> {
        let path = self.config.state_dir().join(format!("{key}.json"));
        let contents = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&contents).ok()
    }

    /// Open a fresh coordinator over this directory (simulates a restart).
    pub fn open_session(&self) -> SessionCoordinator {
        SessionCoordinator::open(&self.config).expect("failed to open coordinator")
    }
}

impl Default for TestDataDir {
    fn default() -> Self {
        Self::new()
    }
}
