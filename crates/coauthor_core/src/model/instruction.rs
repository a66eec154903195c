//! Edit instruction model.
//!
//! # Responsibility
//! - Define the atomic document mutations an agent can request.
//! - Validate the per-kind field requirements before reconciliation.
//! - Convert loosely-typed JSON objects into instructions for stream previews.
//!
//! # Invariants
//! - `create_section` requires a title.
//! - `replace_section`/`append_to_section`/`clear_section` require a target
//!   id or title.
//! - `append_to_section` requires non-blank content.
//! - `switch_mode` requires a mode.

use crate::model::section::{DocumentMode, SectionId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Discriminator of an edit instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    #[serde(alias = "create-section")]
    CreateSection,
    #[serde(alias = "replace-section")]
    ReplaceSection,
    #[serde(alias = "append-to-section")]
    AppendToSection,
    #[serde(alias = "clear-section")]
    ClearSection,
    #[serde(alias = "switch-mode")]
    SwitchMode,
}

impl EditKind {
    /// Parses wire spellings, accepting both `snake_case` and `kebab-case`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "create_section" => Some(Self::CreateSection),
            "replace_section" => Some(Self::ReplaceSection),
            "append_to_section" => Some(Self::AppendToSection),
            "clear_section" => Some(Self::ClearSection),
            "switch_mode" => Some(Self::SwitchMode),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateSection => "create_section",
            Self::ReplaceSection => "replace_section",
            Self::AppendToSection => "append_to_section",
            Self::ClearSection => "clear_section",
            Self::SwitchMode => "switch_mode",
        }
    }
}

/// One atomic requested change to the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditInstruction {
    pub kind: EditKind,
    /// Preferred target; matched exactly against section ids.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<SectionId>,
    /// Fallback target, matched after whitespace/case normalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Only meaningful for `switch_mode`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<DocumentMode>,
}

/// Validation failures for [`EditInstruction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionError {
    MissingTitle,
    MissingTarget(EditKind),
    BlankContent,
    MissingMode,
}

impl Display for InstructionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingTitle => write!(f, "create_section requires a title"),
            Self::MissingTarget(kind) => {
                write!(f, "{} requires a section_id or title", kind.as_str())
            }
            Self::BlankContent => write!(f, "append_to_section requires non-blank content"),
            Self::MissingMode => write!(f, "switch_mode requires a mode"),
        }
    }
}

impl Error for InstructionError {}

impl EditInstruction {
    /// Creates an instruction of `kind` with every optional field unset.
    pub fn new(kind: EditKind) -> Self {
        Self {
            kind,
            section_id: None,
            title: None,
            content: None,
            mode: None,
        }
    }

    pub fn create(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: Some(content.into()),
            ..Self::new(EditKind::CreateSection)
        }
    }

    pub fn switch_mode(mode: DocumentMode) -> Self {
        Self {
            mode: Some(mode),
            ..Self::new(EditKind::SwitchMode)
        }
    }

    pub fn with_section_id(mut self, section_id: impl Into<SectionId>) -> Self {
        self.section_id = Some(section_id.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Returns the trimmed title when present and non-blank.
    pub fn usable_title(&self) -> Option<&str> {
        non_blank(self.title.as_deref())
    }

    /// Returns the trimmed section id when present and non-blank.
    pub fn usable_section_id(&self) -> Option<&str> {
        non_blank(self.section_id.as_deref())
    }

    /// Checks the per-kind field requirements.
    pub fn validate(&self) -> Result<(), InstructionError> {
        let has_target = self.usable_section_id().is_some() || self.usable_title().is_some();
        match self.kind {
            EditKind::CreateSection if self.usable_title().is_none() => {
                Err(InstructionError::MissingTitle)
            }
            EditKind::ReplaceSection | EditKind::ClearSection if !has_target => {
                Err(InstructionError::MissingTarget(self.kind))
            }
            EditKind::AppendToSection if !has_target => {
                Err(InstructionError::MissingTarget(self.kind))
            }
            EditKind::AppendToSection if non_blank(self.content.as_deref()).is_none() => {
                Err(InstructionError::BlankContent)
            }
            EditKind::SwitchMode if self.mode.is_none() => Err(InstructionError::MissingMode),
            _ => Ok(()),
        }
    }

    /// Builds an instruction from a loosely-typed JSON object.
    ///
    /// Returns `None` unless `kind` is a recognized discriminator. Other
    /// fields are taken only when they are strings; an unknown `mode` value
    /// is dropped rather than failing the whole object.
    pub fn from_json_object(object: &Map<String, Value>) -> Option<Self> {
        let kind = object.get("kind").and_then(Value::as_str).and_then(EditKind::parse)?;
        let text = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);
        Some(Self {
            kind,
            section_id: text("section_id"),
            title: text("title"),
            content: text("content"),
            mode: object
                .get("mode")
                .and_then(Value::as_str)
                .and_then(DocumentMode::parse),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
