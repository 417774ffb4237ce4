//! Preset-scoped prompt activation.
//!
//! A *preset* is a named, ordered list of prompts plus a prefix string.
//! Any subset of the current preset's prompts can be activated; active
//! prompts are prepended to outbound LLM requests by
//! [`SessionCoordinator::process_llm_request`].
//!
//! # Architecture
//!
//! ```text
//! host (CLI, bot plugin, ...)
//!     |
//!     v
//! SessionCoordinator --- owns current preset name
//!     |        |            |
//!     v        v            v
//! PresetStore  GroupRegistry  ActivationTracker
//!     |        |            |
//!     +--------+------------+--> dyn JsonStore (extracted/, groups/, activation/, session)
//!     |
//!     +--> dyn Extractor (raw preset files -> extracted/)
//! ```

pub mod activation;
pub mod config;
pub mod error;
pub mod group;
pub mod preset;
pub mod prompt;
pub mod session;
pub mod storage;

pub use activation::ActivationTracker;
pub use config::StoreConfig;
pub use error::{ErrorKind, SessionError};
pub use group::{GroupMap, GroupRegistry};
pub use preset::{DirectoryExtractor, ExtractReport, Extractor, PresetStore, RefreshStats};
pub use prompt::{Origin, Preset, Prompt, PromptMarker};
pub use session::{Outcome, SessionCoordinator, parse_index_list};
pub use storage::{FsJsonStore, JsonStore, MemoryJsonStore, StorageError};
