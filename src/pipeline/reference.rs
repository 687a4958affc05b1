//! Where a pipeline reads its input from and writes its result to
//!
//! A source is resolved once, when the container is built. A destination is
//! resolved once, when the container flushes. References taken verbatim from
//! configuration stay as raw JSON until that point; anything other than
//! `null` or a string path is rejected with `TypeCondition` there.

use crate::error::{StreamPipeError, StreamPipeResult};
use serde_json::Value;
use std::cell::RefCell;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::buffer::{Contents, Mode, PipeValue};

/// Input reference
#[derive(Debug, Default)]
pub enum Source {
    /// The default input channel
    #[default]
    Stdin,
    /// A file read in full at construction
    Path(PathBuf),
    /// A value adopted as-is, without copying
    Buffer(PipeValue),
    /// A loosely typed reference from configuration
    Raw(Value),
}

/// Output reference
#[derive(Debug, Default)]
pub enum Destination {
    /// The default output channel
    #[default]
    Stdout,
    /// A file created or truncated at flush
    Path(PathBuf),
    /// A buffer shared with the caller
    Buffer(SharedBuffer),
    /// A loosely typed reference from configuration
    Raw(Value),
}

/// Buffer the caller keeps a handle to while the pipeline writes into it
///
/// Cloning yields another handle to the same buffer.
#[derive(Debug, Clone)]
pub struct SharedBuffer {
    inner: Rc<RefCell<PipeValue>>,
}

impl SharedBuffer {
    /// Empty buffer of the given mode
    pub fn new(mode: Mode) -> Self {
        Self::from_value(PipeValue::empty(mode))
    }

    pub fn text() -> Self {
        Self::new(Mode::Text)
    }

    pub fn binary() -> Self {
        Self::new(Mode::Binary)
    }

    pub fn from_value(value: PipeValue) -> Self {
        Self {
            inner: Rc::new(RefCell::new(value)),
        }
    }

    pub fn mode(&self) -> Mode {
        self.inner.borrow().mode()
    }

    /// Copy of the full contents
    pub fn contents(&self) -> Contents {
        self.inner.borrow().contents()
    }

    /// Append contents, coercing to this buffer's mode
    pub fn append(&self, contents: Contents) -> StreamPipeResult<()> {
        self.inner.borrow_mut().append(contents)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn resolve_raw(value: Value, role: &str) -> StreamPipeResult<Option<PathBuf>> {
    match value {
        Value::Null => Ok(None),
        Value::String(path) if path.is_empty() => Ok(None),
        Value::String(path) => Ok(Some(PathBuf::from(path))),
        other => Err(StreamPipeError::TypeCondition(format!(
            "{} must be null or a path string, got: {}",
            role, other
        ))),
    }
}

impl Source {
    /// Resolve a raw configuration reference into a concrete one
    pub fn resolve(self) -> StreamPipeResult<Self> {
        match self {
            Source::Raw(value) => Ok(match resolve_raw(value, "source")? {
                Some(path) => Source::Path(path),
                None => Source::Stdin,
            }),
            other => Ok(other),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Source::Stdin => "stdin".to_string(),
            Source::Path(path) => path.display().to_string(),
            Source::Buffer(value) => format!("{} buffer", value.mode().as_str()),
            Source::Raw(value) => format!("raw reference {}", value),
        }
    }

    /// Load the full input as a value of `mode`
    pub(crate) fn load(self, mode: Mode, stdin: &mut dyn Read) -> StreamPipeResult<PipeValue> {
        match self {
            Source::Stdin => {
                let mut bytes = Vec::new();
                stdin.read_to_end(&mut bytes)?;
                wrap(bytes, mode)
            }
            Source::Path(path) => wrap(fs::read(&path)?, mode),
            Source::Buffer(value) => {
                if value.mode() != mode {
                    return Err(StreamPipeError::TypeCondition(format!(
                        "source buffer is {} but the pipeline is {}",
                        value.mode().as_str(),
                        mode.as_str()
                    )));
                }
                Ok(value)
            }
            raw @ Source::Raw(_) => raw.resolve()?.load(mode, stdin),
        }
    }
}

impl Destination {
    /// Resolve a raw configuration reference into a concrete one
    pub fn resolve(self) -> StreamPipeResult<Self> {
        match self {
            Destination::Raw(value) => Ok(match resolve_raw(value, "destination")? {
                Some(path) => Destination::Path(path),
                None => Destination::Stdout,
            }),
            other => Ok(other),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Destination::Stdout => "stdout".to_string(),
            Destination::Path(path) => path.display().to_string(),
            Destination::Buffer(buffer) => format!("{} buffer", buffer.mode().as_str()),
            Destination::Raw(value) => format!("raw reference {}", value),
        }
    }

    /// Write `contents` out under the encoding rule of `mode`
    ///
    /// Text mode decodes byte contents as UTF-8 first, so a stage that
    /// produced bytes in a text pipeline still flushes. Binary mode writes
    /// raw bytes.
    pub(crate) fn store(
        self,
        contents: Contents,
        mode: Mode,
        stdout: &mut dyn Write,
    ) -> StreamPipeResult<()> {
        let contents = match mode {
            Mode::Text => Contents::Text(contents.into_text()?),
            Mode::Binary => Contents::Bytes(contents.into_bytes()),
        };

        match self {
            Destination::Stdout => {
                stdout.write_all(&contents.into_bytes())?;
                stdout.flush()?;
            }
            Destination::Path(path) => fs::write(&path, contents.into_bytes())?,
            Destination::Buffer(buffer) => {
                if buffer.mode() != mode {
                    return Err(StreamPipeError::TypeCondition(format!(
                        "destination buffer is {} but the pipeline is {}",
                        buffer.mode().as_str(),
                        mode.as_str()
                    )));
                }
                buffer.append(contents)?;
            }
            raw @ Destination::Raw(_) => raw.resolve()?.store(contents, mode, stdout)?,
        }
        Ok(())
    }
}

fn wrap(bytes: Vec<u8>, mode: Mode) -> StreamPipeResult<PipeValue> {
    match mode {
        Mode::Text => Ok(PipeValue::text(String::from_utf8(bytes)?)),
        Mode::Binary => Ok(PipeValue::binary(bytes)),
    }
}

impl From<&str> for Source {
    fn from(path: &str) -> Self {
        Source::Path(PathBuf::from(path))
    }
}

impl From<String> for Source {
    fn from(path: String) -> Self {
        Source::Path(PathBuf::from(path))
    }
}

impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        Source::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Source::Path(path)
    }
}

impl From<PipeValue> for Source {
    fn from(value: PipeValue) -> Self {
        Source::Buffer(value)
    }
}

impl From<Value> for Source {
    fn from(value: Value) -> Self {
        Source::Raw(value)
    }
}

impl From<&str> for Destination {
    fn from(path: &str) -> Self {
        Destination::Path(PathBuf::from(path))
    }
}

impl From<String> for Destination {
    fn from(path: String) -> Self {
        Destination::Path(PathBuf::from(path))
    }
}

impl From<&Path> for Destination {
    fn from(path: &Path) -> Self {
        Destination::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for Destination {
    fn from(path: PathBuf) -> Self {
        Destination::Path(path)
    }
}

impl From<SharedBuffer> for Destination {
    fn from(buffer: SharedBuffer) -> Self {
        Destination::Buffer(buffer)
    }
}

impl From<Value> for Destination {
    fn from(value: Value) -> Self {
        Destination::Raw(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_raw_source_resolution() {
        assert!(matches!(Source::Raw(Value::Null).resolve(), Ok(Source::Stdin)));
        assert!(matches!(Source::Raw(json!("")).resolve(), Ok(Source::Stdin)));
        assert!(matches!(
            Source::Raw(json!("in.txt")).resolve(),
            Ok(Source::Path(ref p)) if p == Path::new("in.txt")
        ));
        assert!(matches!(
            Source::Raw(json!(42)).resolve(),
            Err(StreamPipeError::TypeCondition(_))
        ));
    }

    #[test]
    fn test_raw_destination_resolution() {
        assert!(matches!(
            Destination::Raw(Value::Null).resolve(),
            Ok(Destination::Stdout)
        ));
        assert!(matches!(
            Destination::Raw(json!("")).resolve(),
            Ok(Destination::Stdout)
        ));
        assert!(matches!(
            Destination::Raw(json!({"path": "x"})).resolve(),
            Err(StreamPipeError::TypeCondition(_))
        ));
    }

    #[test]
    fn test_load_from_stdin_text() {
        let mut stdin = Cursor::new(b"def foo():\n".to_vec());
        let value = Source::Stdin.load(Mode::Text, &mut stdin).unwrap();
        assert_eq!(value, PipeValue::text("def foo():\n"));
    }

    #[test]
    fn test_load_invalid_utf8_in_text_mode() {
        let mut stdin = Cursor::new(vec![0xffu8, 0xfe]);
        let result = Source::Stdin.load(Mode::Text, &mut stdin);
        assert!(matches!(result, Err(StreamPipeError::Encoding(_))));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("input.bin");
        fs::write(&path, [0u8, 159, 146, 150]).unwrap();

        let mut stdin = Cursor::new(Vec::new());
        let value = Source::from(path.as_path())
            .load(Mode::Binary, &mut stdin)
            .unwrap();
        assert_eq!(value, PipeValue::binary(vec![0u8, 159, 146, 150]));
    }

    #[test]
    fn test_load_missing_file() {
        let mut stdin = Cursor::new(Vec::new());
        let result = Source::from("/nonexistent/input.txt").load(Mode::Text, &mut stdin);
        assert!(matches!(result, Err(StreamPipeError::Io(_))));
    }

    #[test]
    fn test_buffer_source_mode_mismatch() {
        let mut stdin = Cursor::new(Vec::new());
        let result = Source::from(PipeValue::binary(vec![1u8])).load(Mode::Text, &mut stdin);
        assert!(matches!(result, Err(StreamPipeError::TypeCondition(_))));
    }

    #[test]
    fn test_store_text_to_stdout_coerces_bytes() {
        let mut stdout = Vec::new();
        Destination::Stdout
            .store(Contents::Bytes("héllo".as_bytes().to_vec()), Mode::Text, &mut stdout)
            .unwrap();
        assert_eq!(stdout, "héllo".as_bytes());
    }

    #[test]
    fn test_store_to_shared_buffer() {
        let buffer = SharedBuffer::text();
        let mut stdout = Vec::new();
        Destination::from(buffer.clone())
            .store(Contents::Text("abc".to_string()), Mode::Text, &mut stdout)
            .unwrap();

        assert_eq!(buffer.contents(), Contents::Text("abc".to_string()));
        assert!(stdout.is_empty());
    }

    #[test]
    fn test_store_to_mismatched_buffer() {
        let buffer = SharedBuffer::binary();
        let mut stdout = Vec::new();
        let result = Destination::from(buffer.clone()).store(
            Contents::Text("abc".to_string()),
            Mode::Text,
            &mut stdout,
        );

        assert!(matches!(result, Err(StreamPipeError::TypeCondition(_))));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_store_truncates_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.txt");
        fs::write(&path, "old contents that are longer").unwrap();

        let mut stdout = Vec::new();
        Destination::from(path.clone())
            .store(Contents::Text("new".to_string()), Mode::Text, &mut stdout)
            .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }
}
