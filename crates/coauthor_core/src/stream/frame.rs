//! Best-effort extraction of the two response fields from a partial buffer.
//!
//! # Responsibility
//! - Return the assistant text decoded so far.
//! - Return every edit instruction that is complete, plus a preview of the
//!   trailing one still being received.
//!
//! # Invariants
//! - Pure: the same buffer always yields the same frame.
//! - Over a growing buffer the text only grows, and previously emitted
//!   instructions are never retracted.
//! - Nothing here returns an error; missing data yields empty values.

use crate::model::instruction::EditInstruction;
use crate::stream::cursor::{locate_field, Cursor};
use serde_json::{Map, Value};

/// Top-level key of the assistant text field.
pub const MESSAGE_FIELD: &str = "message";
/// Top-level key of the edit-instruction list field.
pub const EDITS_FIELD: &str = "edits";

/// Instruction fields accepted while their string value is still open.
const PARTIAL_FIELDS: &[&str] = &["content"];

/// Instruction recovered from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInstruction {
    pub instruction: EditInstruction,
    /// `false` for the trailing preview whose object has not closed yet.
    pub complete: bool,
}

/// Everything decodable from the buffer at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamFrame {
    pub text: String,
    pub instructions: Vec<DecodedInstruction>,
}

impl StreamFrame {
    /// Returns the instruction values, complete ones and preview alike.
    pub fn edit_instructions(&self) -> Vec<EditInstruction> {
        self.instructions
            .iter()
            .map(|decoded| decoded.instruction.clone())
            .collect()
    }

    /// Returns whether the trailing instruction is still being received.
    pub fn has_preview(&self) -> bool {
        self.instructions.iter().any(|decoded| !decoded.complete)
    }
}

/// Decodes both fields from `buffer`.
pub fn decode_frame(buffer: &str) -> StreamFrame {
    StreamFrame {
        text: extract_text_field(buffer),
        instructions: decode_instructions(buffer, EDITS_FIELD),
    }
}

/// Returns the assistant text decoded so far.
pub fn extract_text_field(buffer: &str) -> String {
    extract_text_field_named(buffer, MESSAGE_FIELD)
}

/// Returns the decoded prefix of the string value at top-level `key`.
///
/// Returns `""` while the key or its opening quote is missing, or when the
/// value is not a string.
pub fn extract_text_field_named(buffer: &str, key: &str) -> String {
    let Some(pos) = locate_field(buffer, key) else {
        return String::new();
    };
    let mut cursor = Cursor::at(buffer, pos);
    if cursor.peek() != Some(b'"') {
        return String::new();
    }
    cursor.read_string().value
}

/// Returns the edit instructions seen so far, including a trailing preview.
pub fn extract_list_field(buffer: &str) -> Vec<EditInstruction> {
    extract_list_field_named(buffer, EDITS_FIELD)
}

/// Returns the instructions of the list at top-level `key`.
pub fn extract_list_field_named(buffer: &str, key: &str) -> Vec<EditInstruction> {
    decode_instructions(buffer, key)
        .into_iter()
        .map(|decoded| decoded.instruction)
        .collect()
}

/// Walks the list at `key`, emitting one entry per usable object.
pub fn decode_instructions(buffer: &str, key: &str) -> Vec<DecodedInstruction> {
    let mut decoded = Vec::new();
    let Some(pos) = locate_field(buffer, key) else {
        return decoded;
    };
    let mut cursor = Cursor::at(buffer, pos);
    if !cursor.eat(b'[') {
        return decoded;
    }

    loop {
        cursor.skip_ws();
        match cursor.peek() {
            None | Some(b']') => break,
            Some(b',') => cursor.bump(),
            Some(b'{') => {
                let start = cursor.pos();
                if cursor.skip_container() {
                    if let Some(instruction) = parse_closed_object(&buffer[start..cursor.pos()]) {
                        decoded.push(DecodedInstruction {
                            instruction,
                            complete: true,
                        });
                    }
                } else {
                    if let Some(instruction) = parse_open_object(&buffer[start..]) {
                        decoded.push(DecodedInstruction {
                            instruction,
                            complete: false,
                        });
                    }
                    break;
                }
            }
            Some(_) => {
                if !cursor.skip_value() {
                    break;
                }
            }
        }
    }

    decoded
}

fn parse_closed_object(raw: &str) -> Option<EditInstruction> {
    let object = serde_json::from_str::<Map<String, Value>>(raw).ok()?;
    EditInstruction::from_json_object(&object)
}

/// Parses the string fields of an object whose closing brace has not
/// arrived.
///
/// Only `content` is accepted half-received; identity fields must be
/// closed so a truncated title can never resolve to the wrong section.
fn parse_open_object(raw: &str) -> Option<EditInstruction> {
    let mut cursor = Cursor::new(raw);
    if !cursor.eat(b'{') {
        return None;
    }

    let mut object = Map::new();
    loop {
        cursor.skip_ws();
        match cursor.peek() {
            None | Some(b'}') => break,
            Some(b',') => {
                cursor.bump();
                continue;
            }
            Some(b'"') => {}
            Some(_) => break,
        }

        let name = cursor.read_string();
        if !name.closed {
            break;
        }
        cursor.skip_ws();
        if !cursor.eat(b':') {
            break;
        }
        cursor.skip_ws();
        match cursor.peek() {
            None => break,
            Some(b'"') => {
                let value = cursor.read_string();
                if value.closed || PARTIAL_FIELDS.contains(&name.value.as_str()) {
                    object.insert(name.value, Value::String(value.value));
                }
                if !value.closed {
                    break;
                }
            }
            Some(_) => {
                if !cursor.skip_value() {
                    break;
                }
            }
        }
    }

    EditInstruction::from_json_object(&object)
}

#[cfg(test)]
mod tests {
    use super::{decode_frame, extract_list_field, extract_text_field};
    use crate::model::instruction::EditKind;

    #[test]
    fn text_is_empty_until_opening_quote_arrives() {
        assert_eq!(extract_text_field(""), "");
        assert_eq!(extract_text_field("{\"mess"), "");
        assert_eq!(extract_text_field("{\"message\":"), "");
        assert_eq!(extract_text_field("{\"message\": \""), "");
        assert_eq!(extract_text_field("{\"message\": \"Hel"), "Hel");
        assert_eq!(extract_text_field("{\"message\": null}"), "");
    }

    #[test]
    fn list_skips_objects_without_recognized_kind() {
        let buffer = r#"{"message": "ok", "edits": [
            {"title": "no kind"},
            "stray",
            {"kind": "clear_section", "title": "Risks"},
            {"kind": "explode"}
        ]}"#;
        let instructions = extract_list_field(buffer);
        assert_eq!(instructions.len(), 1);
        assert_eq!(instructions[0].kind, EditKind::ClearSection);
    }

    #[test]
    fn trailing_object_becomes_preview_with_partial_content() {
        let buffer = r#"{"message": "Drafting", "edits": [{"kind": "create_section", "title": "Plan", "content": "Step one\nSte"#;
        let frame = decode_frame(buffer);
        assert_eq!(frame.text, "Drafting");
        assert_eq!(frame.instructions.len(), 1);
        let preview = &frame.instructions[0];
        assert!(!preview.complete);
        assert_eq!(preview.instruction.title.as_deref(), Some("Plan"));
        assert_eq!(preview.instruction.content.as_deref(), Some("Step one\nSte"));
    }

    #[test]
    fn trailing_object_ignores_half_received_title() {
        let buffer = r#"{"message": "", "edits": [{"kind": "replace_section", "title": "Go"#;
        let instructions = extract_list_field(buffer);
        assert_eq!(instructions.len(), 1);
        assert_eq!(instructions[0].title, None);
    }

    #[test]
    fn trailing_object_without_kind_is_not_previewed() {
        let buffer = r#"{"message": "", "edits": [{"title": "Plan", "content": "x"#;
        assert!(extract_list_field(buffer).is_empty());
        let half_kind = r#"{"message": "", "edits": [{"kind": "create_sec"#;
        assert!(extract_list_field(half_kind).is_empty());
    }

    #[test]
    fn brackets_inside_strings_do_not_close_objects() {
        let buffer = r#"{"message": "x", "edits": [{"kind": "append_to_section", "title": "Code", "content": "fn main() { let v = [1, 2]; } \"}\""}, {"kind": "switch_mode", "mode": "code"}]}"#;
        let instructions = extract_list_field(buffer);
        assert_eq!(instructions.len(), 2);
        assert_eq!(
            instructions[0].content.as_deref(),
            Some("fn main() { let v = [1, 2]; } \"}\"")
        );
        assert_eq!(instructions[1].kind, EditKind::SwitchMode);
    }
}
