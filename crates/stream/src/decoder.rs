//! Incremental UTF-8 decoding and line splitting.
//!
//! Network reads land on arbitrary byte boundaries, so a multi-byte
//! character or a protocol line may be split across two chunks. The decoder
//! keeps the undecoded tail and the unterminated line between pushes.

/// Turns raw body chunks into complete, non-blank lines.
#[derive(Debug, Default)]
pub struct LineDecoder {
    /// Bytes of an incomplete UTF-8 sequence at the end of the last chunk.
    pending: Vec<u8>,
    /// Decoded text after the last newline.
    partial: String,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every line it completed.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        self.decode_pending(false);
        self.drain_lines()
    }

    /// Flush at end of stream: a dangling incomplete sequence becomes
    /// U+FFFD and an unterminated final line is returned as a line.
    pub fn finish(&mut self) -> Vec<String> {
        self.decode_pending(true);
        let mut lines = self.drain_lines();
        let rest = std::mem::take(&mut self.partial);
        if let Some(line) = clean_line(&rest) {
            lines.push(line);
        }
        lines
    }

    /// Whether any bytes or text are buffered.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.partial.is_empty()
    }

    fn decode_pending(&mut self, flush: bool) {
        let mut consumed = 0;
        while consumed < self.pending.len() {
            match std::str::from_utf8(&self.pending[consumed..]) {
                Ok(text) => {
                    self.partial.push_str(text);
                    consumed = self.pending.len();
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    self.partial
                        .push_str(&String::from_utf8_lossy(&self.pending[consumed..consumed + valid]));
                    consumed += valid;
                    match e.error_len() {
                        Some(len) => {
                            self.partial.push(char::REPLACEMENT_CHARACTER);
                            consumed += len;
                        }
                        // Incomplete sequence at the end: wait for more bytes.
                        None if !flush => break,
                        None => {
                            self.partial.push(char::REPLACEMENT_CHARACTER);
                            consumed = self.pending.len();
                        }
                    }
                }
            }
        }
        self.pending.drain(..consumed);
    }

    fn drain_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(end) = self.partial.find('\n') {
            let raw: String = self.partial.drain(..=end).collect();
            if let Some(line) = clean_line(&raw) {
                lines.push(line);
            }
        }
        lines
    }
}

/// Strip the line terminator; blank lines yield `None`.
fn clean_line(raw: &str) -> Option<String> {
    let line = raw.trim_end_matches(['\n', '\r']);
    if line.trim().is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_lines_and_drops_blanks() {
        let mut dec = LineDecoder::new();
        let lines = dec.push(b"0:\"a\"\n\n   \n0:\"b\"\n");
        assert_eq!(lines, vec![r#"0:"a""#, r#"0:"b""#]);
        assert!(dec.is_empty());
    }

    #[test]
    fn line_split_across_chunks_is_reassembled() {
        let mut dec = LineDecoder::new();
        assert!(dec.push(b"0:\"Hel").is_empty());
        assert_eq!(dec.push(b"lo\"\n0:"), vec![r#"0:"Hello""#]);
        assert_eq!(dec.push(b"\"x\"\n"), vec![r#"0:"x""#]);
    }

    #[test]
    fn multibyte_char_split_across_chunks() {
        // "é" is 0xC3 0xA9, "€" is 0xE2 0x82 0xAC
        let mut dec = LineDecoder::new();
        assert!(dec.push(&[b'0', b':', 0xC3]).is_empty());
        assert!(dec.push(&[0xA9, 0xE2]).is_empty());
        assert!(dec.push(&[0x82]).is_empty());
        assert_eq!(dec.push(&[0xAC, b'\n']), vec!["0:é€"]);
    }

    #[test]
    fn crlf_terminators_are_stripped() {
        let mut dec = LineDecoder::new();
        assert_eq!(dec.push(b"0:\"a\"\r\n"), vec![r#"0:"a""#]);
    }

    #[test]
    fn finish_returns_unterminated_line() {
        let mut dec = LineDecoder::new();
        assert!(dec.push(b"0:\"tail\"").is_empty());
        assert_eq!(dec.finish(), vec![r#"0:"tail""#]);
        assert!(dec.finish().is_empty());
    }

    #[test]
    fn invalid_bytes_become_replacement_chars() {
        let mut dec = LineDecoder::new();
        assert_eq!(dec.push(&[b'0', b':', 0xFF, b'x', b'\n']), vec!["0:\u{FFFD}x"]);
    }

    #[test]
    fn dangling_sequence_flushed_at_finish() {
        let mut dec = LineDecoder::new();
        assert!(dec.push(&[b'0', b':', 0xE2, 0x82]).is_empty());
        assert_eq!(dec.finish(), vec!["0:\u{FFFD}"]);
    }

    #[test]
    fn leading_and_trailing_spaces_in_payload_survive() {
        let mut dec = LineDecoder::new();
        assert_eq!(dec.push(b"0: raw text \n"), vec!["0: raw text "]);
    }
}
