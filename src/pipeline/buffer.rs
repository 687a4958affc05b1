//! In-memory buffers that carry the stream between stages
//!
//! A [`PipeValue`] is either a [`TextBuffer`] (character data) or a
//! [`ByteBuffer`] (raw bytes). Both keep a read cursor so a stage can consume
//! its input incrementally, while `contents()` always exposes the whole
//! buffer regardless of where the cursor is.

use crate::error::StreamPipeResult;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Whether a pipeline carries text or raw bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Text,
    Binary,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Text => "text",
            Mode::Binary => "binary",
        }
    }
}

/// Full contents of a buffer, detached from its cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contents {
    Text(String),
    Bytes(Vec<u8>),
}

impl Contents {
    pub fn len(&self) -> usize {
        match self {
            Contents::Text(s) => s.len(),
            Contents::Bytes(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Text as-is; bytes decoded as UTF-8
    pub fn into_text(self) -> StreamPipeResult<String> {
        match self {
            Contents::Text(s) => Ok(s),
            Contents::Bytes(b) => Ok(String::from_utf8(b)?),
        }
    }

    /// Bytes as-is; text encoded as UTF-8
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Contents::Text(s) => s.into_bytes(),
            Contents::Bytes(b) => b,
        }
    }
}

/// Character buffer with a read cursor
///
/// Writes always append. The cursor is a byte offset into the UTF-8 data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    data: String,
    position: usize,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing text with the cursor at the start
    pub fn from_string(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            position: 0,
        }
    }

    /// Append text
    pub fn push_str(&mut self, s: &str) {
        self.data.push_str(s);
    }

    /// Read everything after the cursor and move the cursor to the end
    ///
    /// Fails with `Encoding` when the cursor sits inside a character; the
    /// cursor is left where it was.
    pub fn read_to_end(&mut self) -> StreamPipeResult<String> {
        let rest = String::from_utf8(self.remaining().to_vec())?;
        self.position = self.data.len();
        Ok(rest)
    }

    /// Raw UTF-8 bytes after the cursor; never fails
    pub fn read_bytes(&mut self) -> Vec<u8> {
        let rest = self.remaining().to_vec();
        self.position = self.data.len();
        rest
    }

    /// Read the next line including its trailing newline, if any
    pub fn read_line(&mut self) -> StreamPipeResult<Option<String>> {
        let rest = self.remaining();
        if rest.is_empty() {
            return Ok(None);
        }

        let end = rest
            .iter()
            .position(|&b| b == b'\n')
            .map(|i| i + 1)
            .unwrap_or(rest.len());
        let line = String::from_utf8(rest[..end].to_vec())?;
        self.position += end;
        Ok(Some(line))
    }

    /// Iterate over the remaining lines, consuming them
    ///
    /// Stops after the first decoding error.
    pub fn lines(&mut self) -> impl Iterator<Item = StreamPipeResult<String>> + '_ {
        let mut failed = false;
        std::iter::from_fn(move || {
            if failed {
                return None;
            }
            let line = self.read_line().transpose();
            failed = matches!(line, Some(Err(_)));
            line
        })
    }

    pub fn rewind(&mut self) {
        self.position = 0;
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn contents(&self) -> &str {
        &self.data
    }

    pub fn into_string(self) -> String {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn remaining(&self) -> &[u8] {
        self.data.as_bytes().get(self.position..).unwrap_or_default()
    }
}

impl std::fmt::Write for TextBuffer {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.push_str(s);
        Ok(())
    }
}

impl Read for TextBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let rest = self.remaining();
        let n = rest.len().min(buf.len());
        buf[..n].copy_from_slice(&rest[..n]);
        self.position += n;
        Ok(n)
    }
}

impl Seek for TextBuffer {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.position = seek_target(self.data.len(), self.position, pos)?;
        Ok(self.position as u64)
    }
}

/// Byte buffer with a read cursor
///
/// Writes always append.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteBuffer {
    data: Vec<u8>,
    position: usize,
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing bytes with the cursor at the start
    pub fn from_vec(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            position: 0,
        }
    }

    /// Append bytes
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Read a single byte, `None` at the end
    pub fn read_byte(&mut self) -> Option<u8> {
        let byte = self.data.get(self.position).copied()?;
        self.position += 1;
        Some(byte)
    }

    /// Read everything after the cursor and move the cursor to the end
    pub fn read_to_end(&mut self) -> Vec<u8> {
        let rest = self.data.get(self.position..).unwrap_or_default().to_vec();
        self.position = self.data.len();
        rest
    }

    pub fn rewind(&mut self) {
        self.position = 0;
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Read for ByteBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let rest = self.data.get(self.position..).unwrap_or_default();
        let n = rest.len().min(buf.len());
        buf[..n].copy_from_slice(&rest[..n]);
        self.position += n;
        Ok(n)
    }
}

impl Write for ByteBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.push_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for ByteBuffer {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.position = seek_target(self.data.len(), self.position, pos)?;
        Ok(self.position as u64)
    }
}

/// New cursor for `pos`; seeking past the end is allowed and reads nothing
fn seek_target(len: usize, position: usize, pos: SeekFrom) -> io::Result<usize> {
    let target = match pos {
        SeekFrom::Start(offset) => i64::try_from(offset).ok(),
        SeekFrom::End(offset) => (len as i64).checked_add(offset),
        SeekFrom::Current(offset) => (position as i64).checked_add(offset),
    };

    match target {
        Some(target) if target >= 0 => Ok(target as usize),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "invalid seek to a negative or overflowing position",
        )),
    }
}

/// The value flowing through a pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipeValue {
    Text(TextBuffer),
    Binary(ByteBuffer),
}

impl PipeValue {
    /// Text value with the cursor at the start
    pub fn text(data: impl Into<String>) -> Self {
        PipeValue::Text(TextBuffer::from_string(data))
    }

    /// Binary value with the cursor at the start
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        PipeValue::Binary(ByteBuffer::from_vec(data))
    }

    /// Empty value of the given mode
    pub fn empty(mode: Mode) -> Self {
        match mode {
            Mode::Text => PipeValue::Text(TextBuffer::new()),
            Mode::Binary => PipeValue::Binary(ByteBuffer::new()),
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            PipeValue::Text(_) => Mode::Text,
            PipeValue::Binary(_) => Mode::Binary,
        }
    }

    /// Copy of the full contents, ignoring the cursor
    pub fn contents(&self) -> Contents {
        match self {
            PipeValue::Text(buf) => Contents::Text(buf.contents().to_string()),
            PipeValue::Binary(buf) => Contents::Bytes(buf.contents().to_vec()),
        }
    }

    /// Remaining text after the cursor; binary data is decoded as UTF-8
    pub fn read_text(&mut self) -> StreamPipeResult<String> {
        match self {
            PipeValue::Text(buf) => buf.read_to_end(),
            PipeValue::Binary(buf) => Ok(String::from_utf8(buf.read_to_end())?),
        }
    }

    /// Remaining bytes after the cursor; text is encoded as UTF-8
    pub fn read_bytes(&mut self) -> Vec<u8> {
        match self {
            PipeValue::Text(buf) => buf.read_bytes(),
            PipeValue::Binary(buf) => buf.read_to_end(),
        }
    }

    /// Append contents, coercing between text and bytes as needed
    pub fn append(&mut self, contents: Contents) -> StreamPipeResult<()> {
        match self {
            PipeValue::Text(buf) => buf.push_str(&contents.into_text()?),
            PipeValue::Binary(buf) => buf.push_bytes(&contents.into_bytes()),
        }
        Ok(())
    }

    pub fn rewind(&mut self) {
        match self {
            PipeValue::Text(buf) => buf.rewind(),
            PipeValue::Binary(buf) => buf.rewind(),
        }
    }

    pub fn position(&self) -> usize {
        match self {
            PipeValue::Text(buf) => buf.position(),
            PipeValue::Binary(buf) => buf.position(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PipeValue::Text(buf) => buf.len(),
            PipeValue::Binary(buf) => buf.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Read for PipeValue {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            PipeValue::Text(inner) => inner.read(buf),
            PipeValue::Binary(inner) => inner.read(buf),
        }
    }
}

impl Seek for PipeValue {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            PipeValue::Text(inner) => inner.seek(pos),
            PipeValue::Binary(inner) => inner.seek(pos),
        }
    }
}

impl From<TextBuffer> for PipeValue {
    fn from(buf: TextBuffer) -> Self {
        PipeValue::Text(buf)
    }
}

impl From<ByteBuffer> for PipeValue {
    fn from(buf: ByteBuffer) -> Self {
        PipeValue::Binary(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;

    #[test]
    fn test_text_buffer_append_and_read() {
        let mut buf = TextBuffer::new();
        buf.push_str("hello ");
        write!(buf, "{}", "world").unwrap();

        assert_eq!(buf.contents(), "hello world");
        assert_eq!(buf.read_to_end().unwrap(), "hello world");
        assert_eq!(buf.read_to_end().unwrap(), "");

        buf.rewind();
        assert_eq!(buf.position(), 0);
        assert_eq!(buf.read_to_end().unwrap(), "hello world");
    }

    #[test]
    fn test_text_buffer_lines_keep_newlines() {
        let mut buf = TextBuffer::from_string("a\nbb\nccc");
        let lines: Vec<String> = buf.lines().collect::<StreamPipeResult<_>>().unwrap();

        assert_eq!(lines, vec!["a\n", "bb\n", "ccc"]);
        assert!(buf.read_line().unwrap().is_none());
    }

    #[test]
    fn test_text_buffer_multibyte() {
        let mut buf = TextBuffer::from_string("héllo\nwörld\n");
        assert_eq!(buf.read_line().unwrap().as_deref(), Some("héllo\n"));
        assert_eq!(buf.read_to_end().unwrap(), "wörld\n");
    }

    #[test]
    fn test_text_read_inside_character_fails() {
        let mut value = PipeValue::text("éa");
        let mut first = [0u8; 1];
        value.read_exact(&mut first).unwrap();

        assert!(matches!(
            value.read_text(),
            Err(crate::error::StreamPipeError::Encoding(_))
        ));
        assert_eq!(value.position(), 1);

        // Byte reads are still fine from the same cursor
        assert_eq!(value.read_bytes(), "éa".as_bytes()[1..].to_vec());
    }

    #[test]
    fn test_text_lines_stop_at_bad_cursor() {
        let mut buf = TextBuffer::from_string("é\nok\n");
        buf.seek(SeekFrom::Start(1)).unwrap();

        let lines: Vec<StreamPipeResult<String>> = buf.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].is_err());
        assert!(buf.read_line().is_err());
    }

    #[test]
    fn test_pipe_value_seek() {
        let mut value = PipeValue::text("héllo");
        value.seek(SeekFrom::Start(3)).unwrap();
        assert_eq!(value.read_text().unwrap(), "llo");

        value.seek(SeekFrom::End(-2)).unwrap();
        assert_eq!(value.read_text().unwrap(), "lo");

        let mut binary = PipeValue::binary(vec![1u8, 2, 3]);
        assert_eq!(binary.seek(SeekFrom::Current(1)).unwrap(), 1);
        assert_eq!(binary.read_bytes(), vec![2u8, 3]);
        assert!(binary.seek(SeekFrom::End(-4)).is_err());
    }

    #[test]
    fn test_byte_buffer_read_byte() {
        let mut buf = ByteBuffer::from_vec(vec![1u8, 2, 3]);
        assert_eq!(buf.read_byte(), Some(1));
        assert_eq!(buf.read_to_end(), vec![2u8, 3]);
        assert_eq!(buf.read_byte(), None);
    }

    #[test]
    fn test_byte_buffer_io_traits() {
        let mut buf = ByteBuffer::new();
        buf.write_all(b"abcdef").unwrap();
        buf.seek(SeekFrom::Start(2)).unwrap();

        let mut chunk = [0u8; 3];
        buf.read_exact(&mut chunk).unwrap();
        assert_eq!(&chunk, b"cde");

        buf.seek(SeekFrom::End(-1)).unwrap();
        assert_eq!(buf.read_to_end(), b"f".to_vec());
        assert!(buf.seek(SeekFrom::Current(-100)).is_err());
    }

    #[test]
    fn test_contents_ignore_cursor() {
        let mut value = PipeValue::text("abc");
        value.read_text().unwrap();

        assert_eq!(value.position(), 3);
        assert_eq!(value.contents(), Contents::Text("abc".to_string()));
    }

    #[test]
    fn test_read_text_from_binary() {
        let mut value = PipeValue::binary("def foo():\n".as_bytes());
        assert_eq!(value.read_text().unwrap(), "def foo():\n");

        let mut invalid = PipeValue::binary(vec![0xffu8, 0x00]);
        assert!(invalid.read_text().is_err());
    }

    #[test]
    fn test_append_coerces() {
        let mut text = PipeValue::empty(Mode::Text);
        text.append(Contents::Bytes(b"bytes".to_vec())).unwrap();
        assert_eq!(text.contents(), Contents::Text("bytes".to_string()));

        let mut binary = PipeValue::empty(Mode::Binary);
        binary.append(Contents::Text("text".to_string())).unwrap();
        assert_eq!(binary.contents(), Contents::Bytes(b"text".to_vec()));
    }

    #[test]
    fn test_mode_helpers() {
        assert_eq!(Mode::Binary.as_str(), "binary");
        assert_eq!(PipeValue::empty(Mode::Binary).mode(), Mode::Binary);
        assert_eq!(Mode::default(), Mode::Text);
        assert_eq!(serde_json::to_string(&Mode::Binary).unwrap(), "\"binary\"");
    }
}
