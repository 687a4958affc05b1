use crate::error::{StreamPipeError, StreamPipeResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Named options handed to a stage on each invocation
///
/// Options are stored as JSON values so they can come straight from a
/// configuration file or the command line.
///
/// # Example
/// ```
/// use streampipe::pipeline::StageOptions;
///
/// let options = StageOptions::new().with("key", 0x20);
/// assert_eq!(options.get_u8("key").unwrap(), 0x20);
/// assert!(options.get_u8("missing").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageOptions {
    data: HashMap<String, Value>,
}

impl StageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Get a value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Get a value or return an error if not found
    pub fn get_required(&self, key: &str) -> StreamPipeResult<&Value> {
        self.data.get(key).ok_or_else(|| {
            StreamPipeError::InvalidOption(format!("Required option not found: {}", key))
        })
    }

    /// Get a string value
    pub fn get_string(&self, key: &str) -> StreamPipeResult<String> {
        match self.get_required(key)? {
            Value::String(s) => Ok(s.clone()),
            _ => Err(StreamPipeError::InvalidOption(format!(
                "Option '{}' is not a string",
                key
            ))),
        }
    }

    /// Get a boolean value
    pub fn get_bool(&self, key: &str) -> StreamPipeResult<bool> {
        match self.get_required(key)? {
            Value::Bool(b) => Ok(*b),
            _ => Err(StreamPipeError::InvalidOption(format!(
                "Option '{}' is not a boolean",
                key
            ))),
        }
    }

    /// Get a number value
    pub fn get_number(&self, key: &str) -> StreamPipeResult<f64> {
        match self.get_required(key)? {
            Value::Number(n) => n.as_f64().ok_or_else(|| {
                StreamPipeError::InvalidOption(format!("Option '{}' is not a valid number", key))
            }),
            _ => Err(StreamPipeError::InvalidOption(format!(
                "Option '{}' is not a number",
                key
            ))),
        }
    }

    /// Get a byte value (an integer in 0..=255)
    pub fn get_u8(&self, key: &str) -> StreamPipeResult<u8> {
        let value = self.get_required(key)?;
        value
            .as_u64()
            .and_then(|n| u8::try_from(n).ok())
            .ok_or_else(|| {
                StreamPipeError::InvalidOption(format!(
                    "Option '{}' is not a byte value: {}",
                    key, value
                ))
            })
    }

    /// Check if an option is present
    pub fn has(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Remove an option
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Get all option names
    pub fn keys(&self) -> Vec<&String> {
        self.data.keys().collect()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Map<String, Value>> for StageOptions {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            data: map.into_iter().collect(),
        }
    }
}

impl TryFrom<Value> for StageOptions {
    type Error = StreamPipeError;

    /// Accepts a JSON object; `null` yields empty options
    fn try_from(value: Value) -> StreamPipeResult<Self> {
        match value {
            Value::Object(map) => Ok(map.into()),
            Value::Null => Ok(Self::new()),
            other => Err(StreamPipeError::InvalidOption(format!(
                "Stage options must be a JSON object, got: {}",
                other
            ))),
        }
    }
}
