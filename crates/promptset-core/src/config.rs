use std::env;
use std::path::{Path, PathBuf};

/// Storage location configuration.
///
/// Reads from the `PROMPTSET_DATA_DIR` environment variable, falling back
/// to `<platform data dir>/promptset` when unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Root directory holding raw presets and persisted state.
    pub data_dir: PathBuf,
}

impl StoreConfig {
    /// Environment variable that overrides the data directory.
    pub const ENV_VAR: &str = "PROMPTSET_DATA_DIR";

    /// Build a config from the environment.
    ///
    /// Priority: `PROMPTSET_DATA_DIR` env var, then [`Self::default_data_dir`].
    pub fn from_env() -> Self {
        let data_dir = env::var_os(Self::ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(Self::default_data_dir);
        Self { data_dir }
    }

    /// Build a config from an explicit directory (useful for tests and CLI flags).
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// `dirs::data_dir()/promptset`, or `./promptset` when the platform has
    /// no data directory.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("promptset")
    }

    /// Directory scanned for raw preset files (`*.json`).
    pub fn presets_dir(&self) -> PathBuf {
        self.data_dir.join("presets")
    }

    /// Root of the [`crate::FsJsonStore`].
    pub fn state_dir(&self) -> PathBuf {
        self.data_dir.join("state")
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_dirs() {
        let cfg = StoreConfig::new("/tmp/ps");
        assert_eq!(cfg.presets_dir(), PathBuf::from("/tmp/ps/presets"));
        assert_eq!(cfg.state_dir(), PathBuf::from("/tmp/ps/state"));
    }

    #[test]
    fn default_dir_ends_with_crate_name() {
        assert!(StoreConfig::default_data_dir().ends_with("promptset"));
    }
}
