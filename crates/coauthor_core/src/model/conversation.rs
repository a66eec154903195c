//! Conversation payload model.
//!
//! # Responsibility
//! - Define the final agent response and the chat transcript entries.
//! - Carry auxiliary response fields through untouched.
//!
//! # Invariants
//! - Fields the core does not interpret live in `extras` and are re-emitted
//!   at their original keys on serialization.
//! - One malformed entry in `edits` is dropped on its own; it never fails
//!   the whole response.
//! - `AgentResponse::validated_edits` never returns an instruction that
//!   fails `EditInstruction::validate()`.

use crate::model::instruction::EditInstruction;
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Key of the review-comment list inside agent responses.
pub const REVIEW_COMMENTS_FIELD: &str = "review_comments";

/// Parse failure of a final agent response.
#[derive(Debug)]
pub enum ResponseError {
    /// Payload is not valid JSON or does not match the response shape.
    Json(serde_json::Error),
}

impl Display for ResponseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "invalid agent response: {err}"),
        }
    }
}

impl Error for ResponseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for ResponseError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Final, complete agent response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Natural-language assistant message.
    pub message: String,
    #[serde(default, deserialize_with = "lenient_edits")]
    pub edits: Vec<EditInstruction>,
    /// Opaque auxiliary fields (suggestions, review comments, ...).
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl AgentResponse {
    /// Parses a complete response payload.
    pub fn from_json(payload: &str) -> Result<Self, ResponseError> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Returns instructions that pass validation, logging the rejected ones.
    pub fn validated_edits(&self) -> Vec<EditInstruction> {
        self.edits
            .iter()
            .enumerate()
            .filter_map(|(index, instruction)| match instruction.validate() {
                Ok(()) => Some(instruction.clone()),
                Err(err) => {
                    warn!(
                        "event=instruction_rejected module=model status=skipped index={} kind={} reason={}",
                        index,
                        instruction.kind.as_str(),
                        err
                    );
                    None
                }
            })
            .collect()
    }
}

/// Reads the `edits` array entry by entry, skipping entries that do not
/// describe a recognizable instruction.
fn lenient_edits<'de, D>(deserializer: D) -> Result<Vec<EditInstruction>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    let entries = match raw {
        Value::Array(entries) => entries,
        Value::Null => return Ok(Vec::new()),
        other => {
            warn!(
                "event=instruction_rejected module=model status=skipped index=all reason=edits_not_array value_type={}",
                json_type(&other)
            );
            return Ok(Vec::new());
        }
    };

    Ok(entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let instruction = entry
                .as_object()
                .and_then(EditInstruction::from_json_object);
            if instruction.is_none() {
                warn!(
                    "event=instruction_rejected module=model status=skipped index={} reason=unrecognized_entry",
                    index
                );
            }
            instruction
        })
        .collect())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    /// Edit instructions that came attached to an assistant message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edits: Option<Vec<EditInstruction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_comments: Option<Value>,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            edits: None,
            review_comments: None,
            extras: Map::new(),
        }
    }

    /// Builds the assistant transcript entry for a final response.
    ///
    /// Review comments are lifted into their own field; every other
    /// auxiliary field is passed through as-is.
    pub fn from_response(response: &AgentResponse) -> Self {
        let mut extras = response.extras.clone();
        let review_comments = extras.remove(REVIEW_COMMENTS_FIELD);
        Self {
            role: MessageRole::Assistant,
            content: response.message.clone(),
            edits: (!response.edits.is_empty()).then(|| response.edits.clone()),
            review_comments,
            extras,
        }
    }
}
