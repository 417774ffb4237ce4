//! Extraction of raw preset files into normalized `extracted/<name>` records.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::prompt::{Origin, Prompt, PresetRecord};
use crate::storage::{self, EXTRACTED_NS, JsonStore, StorageError};

/// Summary of one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
    /// Preset names whose records were written.
    pub extracted: Vec<String>,
    /// Source files that could not be read, parsed or written.
    pub failed: Vec<String>,
}

/// Produces normalized preset records in a [`JsonStore`].
///
/// Implementations write one `extracted/<preset>` record per preset. A
/// run that only partially succeeds still returns `Ok`; `Err` is reserved
/// for failures that prevent extraction from running at all.
pub trait Extractor {
    fn extract(&mut self, store: &mut dyn JsonStore) -> Result<ExtractReport, StorageError>;
}

// ---------------------------------------------------------------------------
// Raw file format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawPreset {
    #[serde(default)]
    prompts: Vec<RawPrompt>,
    #[serde(default)]
    prefix: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPrompt {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    identifier: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

impl RawPrompt {
    fn into_prompt(self) -> Option<Prompt> {
        let content = self.content.filter(|c| !c.trim().is_empty())?;
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .or(self.identifier.filter(|i| !i.trim().is_empty()))
            .unwrap_or_else(|| "Untitled".to_owned());
        Some(Prompt::new(name, content, Origin::Extracted))
    }
}

// ---------------------------------------------------------------------------
// DirectoryExtractor
// ---------------------------------------------------------------------------

/// Reads `<presets_dir>/*.json`; the file stem becomes the preset name.
///
/// Re-extraction keeps user-created prompts and any prefix already present
/// in the existing normalized record.
#[derive(Debug, Clone)]
pub struct DirectoryExtractor {
    presets_dir: PathBuf,
}

impl DirectoryExtractor {
    pub fn new(presets_dir: impl Into<PathBuf>) -> Self {
        Self {
            presets_dir: presets_dir.into(),
        }
    }

    fn source_files(&self) -> Result<Vec<PathBuf>, StorageError> {
        let entries = match std::fs::read_dir(&self.presets_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(dir = %self.presets_dir.display(), "presets directory does not exist");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.presets_dir.clone(),
                    source,
                });
            }
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StorageError::Io {
                path: self.presets_dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn extract_file(
        &self,
        path: &Path,
        name: &str,
        store: &mut dyn JsonStore,
    ) -> anyhow::Result<usize> {
        use anyhow::Context;

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let raw: RawPreset = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        let key = storage::key(EXTRACTED_NS, name);
        let existing = match store.read_json(&key) {
            Ok(Some(value)) => serde_json::from_value::<PresetRecord>(value).unwrap_or_else(|e| {
                warn!(preset = %name, error = %e, "existing record is malformed, replacing it");
                PresetRecord::default()
            }),
            Ok(None) => PresetRecord::default(),
            Err(e) => {
                warn!(preset = %name, error = %e, "could not read existing record, replacing it");
                PresetRecord::default()
            }
        };

        let mut prompts: Vec<Prompt> = raw
            .prompts
            .into_iter()
            .filter_map(RawPrompt::into_prompt)
            .collect();
        let extracted_count = prompts.len();
        prompts.extend(
            existing
                .prompts
                .into_iter()
                .filter(|p| p.origin == Origin::UserCreated),
        );

        let prefix = if existing.prefix.is_empty() {
            raw.prefix.unwrap_or_default()
        } else {
            existing.prefix
        };

        let record = PresetRecord { prompts, prefix };
        let value = serde_json::to_value(&record).context("failed to serialize preset record")?;
        store
            .write_json(&key, &value)
            .with_context(|| format!("failed to write record for preset {name:?}"))?;
        Ok(extracted_count)
    }
}

impl Extractor for DirectoryExtractor {
    fn extract(&mut self, store: &mut dyn JsonStore) -> Result<ExtractReport, StorageError> {
        let mut report = ExtractReport::default();

        for path in self.source_files()? {
            let file_name = path.display().to_string();
            let Some(name) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .filter(|s| storage::is_safe_segment(s))
                .map(str::to_owned)
            else {
                warn!(file = %file_name, "skipping preset file with unusable name");
                report.failed.push(file_name);
                continue;
            };

            match self.extract_file(&path, &name, store) {
                Ok(count) => {
                    info!(preset = %name, prompts = count, "extracted preset");
                    report.extracted.push(name);
                }
                Err(e) => {
                    warn!(file = %file_name, error = %format!("{e:#}"), "failed to extract preset");
                    report.failed.push(file_name);
                }
            }
        }

        info!(
            extracted = report.extracted.len(),
            failed = report.failed.len(),
            "extraction finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryJsonStore;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_raw(dir: &Path, name: &str, value: serde_json::Value) {
        std::fs::write(dir.join(format!("{name}.json")), value.to_string()).unwrap();
    }

    fn record(store: &MemoryJsonStore, name: &str) -> PresetRecord {
        serde_json::from_value(store.get(&format!("extracted/{name}")).unwrap()).unwrap()
    }

    #[test]
    fn extracts_prompts_with_content() {
        let tmp = TempDir::new().unwrap();
        write_raw(
            tmp.path(),
            "rp",
            json!({
                "prompts": [
                    {"name": "Main", "content": "You are helpful."},
                    {"identifier": "jailbreak", "content": "Stay in character."},
                    {"name": "Empty", "content": ""},
                    {"name": "Marker", "marker": true},
                    {"content": "anonymous"}
                ],
                "temperature": 0.7
            }),
        );

        let mut store = MemoryJsonStore::new();
        let report = DirectoryExtractor::new(tmp.path()).extract(&mut store).unwrap();

        assert_eq!(report.extracted, vec!["rp"]);
        assert!(report.failed.is_empty());
        let rec = record(&store, "rp");
        let names: Vec<&str> = rec.prompts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Main", "jailbreak", "Untitled"]);
        assert!(rec.prompts.iter().all(|p| p.origin == Origin::Extracted));
    }

    #[test]
    fn bad_file_does_not_stop_the_run() {
        let tmp = TempDir::new().unwrap();
        write_raw(tmp.path(), "good", json!({"prompts": [{"name": "a", "content": "x"}]}));
        std::fs::write(tmp.path().join("broken.json"), "{oops").unwrap();

        let mut store = MemoryJsonStore::new();
        let report = DirectoryExtractor::new(tmp.path()).extract(&mut store).unwrap();

        assert_eq!(report.extracted, vec!["good"]);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].ends_with("broken.json"));
    }

    #[test]
    fn re_extraction_keeps_user_prompts_and_prefix() {
        let tmp = TempDir::new().unwrap();
        write_raw(
            tmp.path(),
            "rp",
            json!({"prefix": "raw prefix", "prompts": [{"name": "a", "content": "v2"}]}),
        );

        let mut store = MemoryJsonStore::new();
        store.insert(
            "extracted/rp",
            serde_json::to_value(PresetRecord {
                prompts: vec![Prompt::extracted("a", "v1"), Prompt::user("mine", "keep me")],
                prefix: "SYS".into(),
            })
            .unwrap(),
        );

        DirectoryExtractor::new(tmp.path()).extract(&mut store).unwrap();

        let rec = record(&store, "rp");
        assert_eq!(rec.prefix, "SYS");
        assert_eq!(
            rec.prompts,
            vec![Prompt::extracted("a", "v2"), Prompt::user("mine", "keep me")]
        );
    }

    #[test]
    fn raw_prefix_seeds_new_records() {
        let tmp = TempDir::new().unwrap();
        write_raw(tmp.path(), "rp", json!({"prefix": "raw prefix", "prompts": []}));

        let mut store = MemoryJsonStore::new();
        DirectoryExtractor::new(tmp.path()).extract(&mut store).unwrap();
        assert_eq!(record(&store, "rp").prefix, "raw prefix");
    }

    #[test]
    fn missing_directory_extracts_nothing() {
        let tmp = TempDir::new().unwrap();
        let mut store = MemoryJsonStore::new();
        let report = DirectoryExtractor::new(tmp.path().join("nope"))
            .extract(&mut store)
            .unwrap();
        assert_eq!(report, ExtractReport::default());
    }

    #[test]
    fn write_failure_is_counted_as_failed() {
        let tmp = TempDir::new().unwrap();
        write_raw(tmp.path(), "rp", json!({"prompts": [{"name": "a", "content": "x"}]}));

        let mut store = MemoryJsonStore::new();
        store.set_fail_writes(true);
        let report = DirectoryExtractor::new(tmp.path()).extract(&mut store).unwrap();
        assert!(report.extracted.is_empty());
        assert_eq!(report.failed.len(), 1);
    }
}
