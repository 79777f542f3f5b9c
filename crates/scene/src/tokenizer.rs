//! Line splitting for the scene format.

use std::io::BufRead;

use crate::error::SceneResult;

/// Split a line into whitespace-separated tokens. Blank lines yield nothing.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// Reads a scene source line by line, tolerating `\r\n` endings.
pub struct LineReader<R> {
    inner: R,
    line_no: usize,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, line_no: 0 }
    }

    /// Next line without its terminator, `None` at end of input.
    /// Bytes that are not valid UTF-8 are replaced with U+FFFD.
    pub fn next_line(&mut self) -> SceneResult<Option<String>> {
        let mut buf = Vec::new();
        if self.inner.read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        let line = match String::from_utf8(buf) {
            Ok(line) => line,
            Err(err) => {
                log::warn!("line {}: invalid UTF-8, replacing undecodable bytes", self.line_no);
                String::from_utf8_lossy(err.as_bytes()).into_owned()
            }
        };
        Ok(Some(line))
    }

    /// Next line of the current block; `None` on a blank line or end of input.
    pub fn next_block_line(&mut self) -> SceneResult<Option<String>> {
        Ok(self.next_line()?.filter(|line| !line.trim().is_empty()))
    }

    /// 1-based number of the line returned last.
    pub fn line_no(&self) -> usize {
        self.line_no
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn tokenize_discards_empty_splits() {
        assert_eq!(tokenize("  TRANS 1   2\t3 "), vec!["TRANS", "1", "2", "3"]);
        assert!(tokenize("   ").is_empty());
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn reader_strips_crlf_and_stops_blocks_on_blank_lines() {
        let mut reader = LineReader::new(Cursor::new("OBJECT\r\ncube\r\n\r\nlast"));
        assert_eq!(reader.next_line().expect("read").as_deref(), Some("OBJECT"));
        assert_eq!(reader.next_block_line().expect("read").as_deref(), Some("cube"));
        assert_eq!(reader.next_block_line().expect("read"), None);
        assert_eq!(reader.line_no(), 3);
        assert_eq!(reader.next_line().expect("read").as_deref(), Some("last"));
        assert_eq!(reader.next_line().expect("read"), None);
    }

    #[test]
    fn reader_decodes_invalid_utf8_lossily() {
        let mut reader = LineReader::new(Cursor::new(&b"// box \xe9\r\nOBJECT\n"[..]));
        assert_eq!(
            reader.next_line().expect("read").as_deref(),
            Some("// box \u{FFFD}")
        );
        assert_eq!(reader.next_line().expect("read").as_deref(), Some("OBJECT"));
        assert_eq!(reader.line_no(), 2);
    }
}
