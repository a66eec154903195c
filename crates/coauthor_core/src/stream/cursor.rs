//! Tolerant cursor over a possibly-truncated JSON text.
//!
//! # Responsibility
//! - Walk JSON structure byte by byte without requiring the input to be
//!   complete.
//! - Report truncation as a normal `closed = false` result instead of an
//!   error.
//!
//! # Invariants
//! - The cursor never panics, whatever the input.
//! - Structural bytes are ASCII, so byte positions used for slicing are
//!   always char boundaries.

/// Value scanned from the buffer plus whether its terminator was seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scanned<T> {
    pub value: T,
    /// `false` when the buffer ended before the value was terminated.
    pub closed: bool,
}

impl<T> Scanned<T> {
    fn closed(value: T) -> Self {
        Self {
            value,
            closed: true,
        }
    }

    fn open(value: T) -> Self {
        Self {
            value,
            closed: false,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    pub(crate) fn at(src: &'a str, pos: usize) -> Self {
        Self {
            src,
            pos: pos.min(src.len()),
        }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    pub(crate) fn is_eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    pub(crate) fn bump(&mut self) {
        if !self.is_eof() {
            self.pos += 1;
        }
    }

    /// Consumes `byte` when it is next; returns whether it did.
    pub(crate) fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\n' | b'\r' | b'\t')) {
            self.pos += 1;
        }
    }

    /// Decodes the string literal starting at the cursor's opening quote.
    ///
    /// Decoding stops at the end of the buffer, including in the middle of
    /// an escape sequence. Unknown escapes are kept literally and malformed
    /// `\u` escapes become U+FFFD.
    pub(crate) fn read_string(&mut self) -> Scanned<String> {
        let mut out = String::new();
        if !self.eat(b'"') {
            return Scanned::open(out);
        }

        loop {
            let rest = &self.src[self.pos..];
            let Some(offset) = rest.find(['"', '\\']) else {
                out.push_str(rest);
                self.pos = self.src.len();
                return Scanned::open(out);
            };
            out.push_str(&rest[..offset]);
            self.pos += offset;

            if self.eat(b'"') {
                return Scanned::closed(out);
            }

            // At a backslash.
            match self.read_escape() {
                Some(decoded) => out.push(decoded),
                None => {
                    self.pos = self.src.len();
                    return Scanned::open(out);
                }
            }
        }
    }

    /// Decodes one escape sequence at the cursor's backslash.
    ///
    /// Returns `None` when the buffer ends before the sequence is complete.
    fn read_escape(&mut self) -> Option<char> {
        let bytes = self.src.as_bytes();
        let marker = *bytes.get(self.pos + 1)?;
        let simple = match marker {
            b'"' => Some('"'),
            b'\\' => Some('\\'),
            b'/' => Some('/'),
            b'b' => Some('\u{0008}'),
            b'f' => Some('\u{000C}'),
            b'n' => Some('\n'),
            b'r' => Some('\r'),
            b't' => Some('\t'),
            _ => None,
        };
        if let Some(decoded) = simple {
            self.pos += 2;
            return Some(decoded);
        }
        if marker != b'u' {
            // Unknown escape: keep the character itself. Step over the
            // backslash only, so a multi-byte char is not split.
            self.pos += 1;
            let decoded = self.src[self.pos..].chars().next()?;
            self.pos += decoded.len_utf8();
            return Some(decoded);
        }

        let unit = match self.hex_unit(self.pos + 2)? {
            Some(unit) => unit,
            None => {
                self.pos += 2;
                return Some(char::REPLACEMENT_CHARACTER);
            }
        };
        self.pos += 6;

        if !(0xD800..0xDC00).contains(&unit) {
            return Some(char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER));
        }

        // High surrogate: wait for the low half before committing.
        let pair_start = self.pos;
        let available = &bytes[pair_start.min(bytes.len())..];
        let prefix_len = available.len().min(2);
        if available[..prefix_len] != b"\\u"[..prefix_len] {
            return Some(char::REPLACEMENT_CHARACTER);
        }
        if available.len() < 2 {
            self.pos -= 6;
            return None;
        }
        let low = match self.hex_unit(pair_start + 2) {
            None => {
                self.pos -= 6;
                return None;
            }
            Some(None) => return Some(char::REPLACEMENT_CHARACTER),
            Some(Some(low)) => low,
        };
        if !(0xDC00..0xE000).contains(&low) {
            return Some(char::REPLACEMENT_CHARACTER);
        }
        self.pos += 6;
        let combined = 0x10000 + ((u32::from(unit) - 0xD800) << 10) + (u32::from(low) - 0xDC00);
        Some(char::from_u32(combined).unwrap_or(char::REPLACEMENT_CHARACTER))
    }

    /// Reads four hex digits at `start`.
    ///
    /// Outer `None`: buffer too short. Inner `None`: digits present but not hex.
    fn hex_unit(&self, start: usize) -> Option<Option<u16>> {
        let digits = self.src.as_bytes().get(start..start + 4);
        let Some(digits) = digits else {
            let tail = self.src.as_bytes().get(start..).unwrap_or_default();
            if tail.iter().all(u8::is_ascii_hexdigit) {
                return None;
            }
            return Some(None);
        };
        if !digits.iter().all(u8::is_ascii_hexdigit) {
            return Some(None);
        }
        let text = std::str::from_utf8(digits).ok();
        Some(text.and_then(|text| u16::from_str_radix(text, 16).ok()))
    }

    /// Skips a string literal without decoding it.
    fn skip_string(&mut self) -> bool {
        if !self.eat(b'"') {
            return false;
        }
        let bytes = self.src.as_bytes();
        while let Some(&byte) = bytes.get(self.pos) {
            match byte {
                b'\\' => self.pos += 2,
                b'"' => {
                    self.pos += 1;
                    return true;
                }
                _ => self.pos += 1,
            }
        }
        self.pos = self.src.len();
        false
    }

    /// Skips an object or array, tracking depth outside string literals.
    pub(crate) fn skip_container(&mut self) -> bool {
        let mut depth = 0usize;
        while let Some(byte) = self.peek() {
            match byte {
                b'"' => {
                    if !self.skip_string() {
                        return false;
                    }
                    continue;
                }
                b'{' | b'[' => depth += 1,
                b'}' | b']' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.pos += 1;
                        return true;
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        false
    }

    /// Skips any JSON value; returns whether it was terminated.
    pub(crate) fn skip_value(&mut self) -> bool {
        match self.peek() {
            None => false,
            Some(b'"') => self.skip_string(),
            Some(b'{' | b'[') => self.skip_container(),
            Some(_) => {
                while let Some(byte) = self.peek() {
                    if matches!(byte, b',' | b'}' | b']' | b' ' | b'\n' | b'\r' | b'\t') {
                        return true;
                    }
                    self.pos += 1;
                }
                false
            }
        }
    }
}

/// Locates the value of a top-level `key` in a possibly-truncated object.
///
/// Returns the byte offset of the value's first byte, or `None` while the
/// key, its colon, or the start of its value has not arrived yet. Anything
/// before the first `{` (e.g. a code fence) is ignored.
pub(crate) fn locate_field(src: &str, key: &str) -> Option<usize> {
    let start = src.find('{')?;
    let mut cursor = Cursor::at(src, start);
    cursor.bump();

    loop {
        cursor.skip_ws();
        match cursor.peek()? {
            b',' => {
                cursor.bump();
                continue;
            }
            b'"' => {}
            _ => return None,
        }

        let name = cursor.read_string();
        if !name.closed {
            return None;
        }
        cursor.skip_ws();
        if !cursor.eat(b':') {
            return None;
        }
        cursor.skip_ws();
        if name.value == key {
            return (!cursor.is_eof()).then_some(cursor.pos());
        }
        if !cursor.skip_value() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{locate_field, Cursor};

    fn decode(src: &str) -> (String, bool) {
        let scanned = Cursor::new(src).read_string();
        (scanned.value, scanned.closed)
    }

    #[test]
    fn read_string_decodes_standard_escapes() {
        let (value, closed) = decode(r#""a\"b\\c\/d\b\f\n\r\t""#);
        assert!(closed);
        assert_eq!(value, "a\"b\\c/d\u{8}\u{c}\n\r\t");
    }

    #[test]
    fn read_string_stops_inside_incomplete_escapes() {
        assert_eq!(decode(r#""ab\"#), ("ab".to_string(), false));
        assert_eq!(decode(r#""ab\u4f"#), ("ab".to_string(), false));
        assert_eq!(decode(r#""ab\u4f60"#), ("ab\u{4f60}".to_string(), false));
    }

    #[test]
    fn read_string_joins_surrogate_pairs_and_waits_for_low_half() {
        assert_eq!(decode(r#""\ud83d\ude00""#), ("\u{1f600}".to_string(), true));
        assert_eq!(decode(r#""x\ud83d"#), ("x".to_string(), false));
        assert_eq!(decode(r#""x\ud83d\ude"#), ("x".to_string(), false));
        assert_eq!(decode(r#""x\ud83dy""#), ("x\u{fffd}y".to_string(), true));
    }

    #[test]
    fn read_string_keeps_multibyte_text() {
        assert_eq!(decode("\"héllo 你好\""), ("héllo 你好".to_string(), true));
    }

    #[test]
    fn skip_container_respects_string_literals() {
        let src = r#"{"a": "}{]", "b": [1, {"c": "\"}"}]} tail"#;
        let mut cursor = Cursor::new(src);
        assert!(cursor.skip_container());
        assert_eq!(&src[cursor.pos()..], " tail");

        let mut truncated = Cursor::new(r#"{"a": "}"#);
        assert!(!truncated.skip_container());
    }

    #[test]
    fn locate_field_ignores_keys_inside_values() {
        let src = r#"{"message": "say \"edits\": now", "edits": []}"#;
        let pos = locate_field(src, "edits").unwrap();
        assert_eq!(&src[pos..pos + 1], "[");
    }

    #[test]
    fn locate_field_waits_for_value_start() {
        assert_eq!(locate_field(r#"{"message""#, "message"), None);
        assert_eq!(locate_field(r#"{"message": "#, "message"), None);
        assert_eq!(locate_field(r#"{"mess"#, "message"), None);
        assert!(locate_field("```json\n{\"message\": \"hi", "message").is_some());
    }
}
