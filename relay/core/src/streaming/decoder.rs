//! Incremental text decoding for the response body
//!
//! The endpoint sends raw UTF-8 with no framing, and chunk boundaries fall
//! wherever the transport puts them, including inside a multi-byte
//! character. [`Utf8StreamDecoder`] carries the incomplete tail of one chunk
//! into the next so that any chunking of a byte stream decodes to the same
//! text. [`ResponseBuffer`] layers the running buffer and the duplicate
//! newline rule on top.

/// Stateful UTF-8 decoder
///
/// Invalid sequences decode to U+FFFD. An incomplete sequence at the end of
/// a chunk is held back until the next chunk completes it.
#[derive(Clone, Debug, Default)]
pub struct Utf8StreamDecoder {
    /// Leading bytes of a character split across chunks (at most 3)
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    /// Create a decoder with no pending state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, prefixed by any bytes held back from the last
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();

        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(e) => {
                    let (valid, tail) = rest.split_at(e.valid_up_to());
                    if let Ok(text) = std::str::from_utf8(valid) {
                        out.push_str(text);
                    }
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &tail[len..];
                        }
                        None => {
                            // Incomplete character at the end: keep it for the next chunk
                            self.pending = tail.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush at end of stream
    ///
    /// A character still incomplete when the stream ends becomes a single
    /// U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            char::REPLACEMENT_CHARACTER.to_string()
        }
    }

    /// Number of bytes held back waiting for the rest of a character
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Whether a decoded chunk should be dropped by the duplicate newline rule
///
/// Only a chunk that is exactly one line break is affected, and only when the
/// committed buffer already ends with one.
#[must_use]
pub fn is_duplicate_newline(buffer: &str, chunk: &str) -> bool {
    chunk == "\n" && buffer.ends_with('\n')
}

/// Running decoded text of one response
#[derive(Clone, Debug, Default)]
pub struct ResponseBuffer {
    decoder: Utf8StreamDecoder,
    text: String,
}

impl ResponseBuffer {
    /// Create an empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk and append what survives
    ///
    /// Returns true when the buffer changed and an update should be emitted.
    pub fn push(&mut self, chunk: &[u8]) -> bool {
        if chunk.is_empty() {
            return false;
        }
        let decoded = self.decoder.decode(chunk);
        self.append(&decoded)
    }

    /// Flush the decoder at end of stream
    ///
    /// Returns true when a trailing replacement character was appended.
    pub fn finish(&mut self) -> bool {
        let tail = self.decoder.finish();
        self.append(&tail)
    }

    fn append(&mut self, decoded: &str) -> bool {
        if decoded.is_empty() || is_duplicate_newline(&self.text, decoded) {
            return false;
        }
        self.text.push_str(decoded);
        true
    }

    /// Text accumulated so far
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether any content has been produced yet
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.text.is_empty()
    }
}
