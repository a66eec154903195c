//! Per-stream accumulator feeding the frame extractor.
//!
//! # Responsibility
//! - Accumulate raw chunks of one agent response.
//! - Hold back UTF-8 sequences split across byte chunks.
//! - Hand the complete buffer to the final-payload parser at stream end.

use crate::model::conversation::{AgentResponse, ResponseError};
use crate::stream::frame::{decode_frame, StreamFrame};
use log::{info, warn};

/// Accumulates one streamed response and decodes it on every chunk.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: String,
    pending: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a text chunk and returns the current frame.
    ///
    /// Bytes still held back by `push_bytes` stay pending until the next
    /// chunk shows whether they complete a character.
    pub fn push_str(&mut self, chunk: &str) -> StreamFrame {
        self.push_bytes(chunk.as_bytes())
    }

    /// Appends a byte chunk and returns the current frame.
    ///
    /// An incomplete UTF-8 sequence at the chunk end waits for the next
    /// chunk; invalid bytes become U+FFFD.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> StreamFrame {
        self.pending.extend_from_slice(chunk);
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    self.buffer.push_str(valid);
                    self.pending.clear();
                    break;
                }
                Err(err) => {
                    let valid_up_to = err.valid_up_to();
                    // `valid_up_to` marks a prefix that is valid UTF-8.
                    self.buffer
                        .push_str(&String::from_utf8_lossy(&self.pending[..valid_up_to]));
                    match err.error_len() {
                        Some(invalid_len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid_up_to + invalid_len);
                        }
                        None => {
                            self.pending.drain(..valid_up_to);
                            break;
                        }
                    }
                }
            }
        }
        self.frame()
    }

    /// Decodes the buffer as it stands.
    pub fn frame(&self) -> StreamFrame {
        decode_frame(&self.buffer)
    }

    /// Returns the text received so far.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Parses the complete buffer as the final response.
    ///
    /// Text outside the outermost braces (e.g. a code fence) is ignored.
    pub fn finish(mut self) -> Result<AgentResponse, ResponseError> {
        self.flush_pending_lossy();
        let payload = match (self.buffer.find('{'), self.buffer.rfind('}')) {
            (Some(start), Some(end)) if start < end => &self.buffer[start..=end],
            _ => self.buffer.as_str(),
        };

        match AgentResponse::from_json(payload) {
            Ok(response) => {
                info!(
                    "event=stream_finish module=stream status=ok bytes={} edits={}",
                    self.buffer.len(),
                    response.edits.len()
                );
                Ok(response)
            }
            Err(err) => {
                warn!(
                    "event=stream_finish module=stream status=error bytes={} error_code=invalid_payload error={}",
                    self.buffer.len(),
                    err
                );
                Err(err)
            }
        }
    }

    fn flush_pending_lossy(&mut self) {
        if !self.pending.is_empty() {
            self.buffer.push_str(&String::from_utf8_lossy(&self.pending));
            self.pending.clear();
        }
    }
}
