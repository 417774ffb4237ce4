//! Prompt and preset value types.
//!
//! Prompts have no stable id. Two prompts are the same prompt when their
//! name, content and origin all match, so every membership test in the
//! crate goes through the derived [`PartialEq`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Origin
// ---------------------------------------------------------------------------

/// Where a prompt came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    /// Produced by extraction from a raw preset file. Read-only.
    Extracted,
    /// Added through [`crate::SessionCoordinator::add_prompt`].
    UserCreated,
}

impl Origin {
    /// Only user-created prompts may be edited or deleted.
    pub fn is_mutable(self) -> bool {
        matches!(self, Self::UserCreated)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Extracted => "extracted",
            Self::UserCreated => "user-created",
        };
        f.write_str(s)
    }
}

impl FromStr for Origin {
    type Err = OriginParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "extracted" => Ok(Self::Extracted),
            "user-created" => Ok(Self::UserCreated),
            other => Err(OriginParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Origin`] string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid prompt origin: {0:?}")]
pub struct OriginParseError(pub String);

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

/// A named text snippet belonging to a preset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Prompt {
    pub name: String,
    pub content: String,
    pub origin: Origin,
}

impl Prompt {
    pub fn new(name: impl Into<String>, content: impl Into<String>, origin: Origin) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            origin,
        }
    }

    /// Shorthand for an [`Origin::Extracted`] prompt.
    pub fn extracted(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(name, content, Origin::Extracted)
    }

    /// Shorthand for an [`Origin::UserCreated`] prompt.
    pub fn user(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(name, content, Origin::UserCreated)
    }

    /// Build the persisted marker for this prompt.
    pub fn marker(&self) -> PromptMarker {
        PromptMarker {
            name: self.name.clone(),
            origin: self.origin,
            digest: content_digest(&self.content),
        }
    }
}

// ---------------------------------------------------------------------------
// PromptMarker
// ---------------------------------------------------------------------------

/// Lightweight persisted reference to a prompt value.
///
/// Stores the content as a SHA-256 digest so activation files stay small
/// regardless of prompt length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMarker {
    pub name: String,
    pub origin: Origin,
    /// Lowercase hex SHA-256 of the prompt content.
    pub digest: String,
}

impl PromptMarker {
    /// Return `true` if `prompt` is the value this marker was taken from.
    pub fn matches(&self, prompt: &Prompt) -> bool {
        self.name == prompt.name
            && self.origin == prompt.origin
            && self.digest == content_digest(&prompt.content)
    }
}

/// Hex-encoded SHA-256 of `content`.
pub fn content_digest(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

// ---------------------------------------------------------------------------
// Preset
// ---------------------------------------------------------------------------

/// A named, ordered prompt list with its prefix text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preset {
    pub name: String,
    pub prompts: Vec<Prompt>,
    pub prefix: String,
}

/// On-disk shape of a normalized preset (`extracted/<name>`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetRecord {
    #[serde(default)]
    pub prompts: Vec<Prompt>,
    #[serde(default)]
    pub prefix: String,
}

impl Preset {
    pub fn from_record(name: impl Into<String>, record: PresetRecord) -> Self {
        Self {
            name: name.into(),
            prompts: record.prompts,
            prefix: record.prefix,
        }
    }

    pub fn to_record(&self) -> PresetRecord {
        PresetRecord {
            prompts: self.prompts.clone(),
            prefix: self.prefix.clone(),
        }
    }
}
