use crate::error::{StreamPipeError, StreamPipeResult};
use crate::logger::LogLevel;
use crate::pipeline::{stages, Destination, Mode, Pipeline, Source, StageOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Pipeline configuration file
///
/// ```json
/// {
///   "source": "input.bin",
///   "destination": null,
///   "mode": "binary",
///   "log_level": "info",
///   "stages": [
///     { "stage": "xor", "options": { "key": 250 } },
///     { "stage": "xor" }
///   ]
/// }
/// ```
///
/// `source` and `destination` are kept as raw JSON; `null` means the
/// standard channel and a string is a file path. Anything else is rejected
/// when the reference is resolved.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    #[serde(default)]
    pub source: Value,

    #[serde(default)]
    pub destination: Value,

    #[serde(default)]
    pub mode: Mode,

    #[serde(default)]
    pub log_level: LogLevel,

    #[serde(default)]
    pub stages: Vec<StageSpec>,
}

/// One configured stage: a built-in stage name and its options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageSpec {
    pub stage: String,

    #[serde(default)]
    pub options: StageOptions,
}

impl StageSpec {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            options: StageOptions::new(),
        }
    }

    /// Parse `name` or `name=<json object>`
    pub fn parse(spec: &str) -> StreamPipeResult<Self> {
        let (name, options) = match spec.split_once('=') {
            Some((name, json)) => {
                let value: Value = serde_json::from_str(json)?;
                (name, StageOptions::try_from(value)?)
            }
            None => (spec, StageOptions::new()),
        };

        let name = name.trim();
        if name.is_empty() {
            return Err(StreamPipeError::ConfigError(format!(
                "Stage spec has no name: '{}'",
                spec
            )));
        }

        Ok(Self {
            stage: name.to_string(),
            options,
        })
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> StreamPipeResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            StreamPipeError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> StreamPipeResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Source reference, resolved when the container is built
    pub fn source(&self) -> Source {
        Source::Raw(self.source.clone())
    }

    /// Destination reference, resolved when the container flushes
    pub fn destination(&self) -> Destination {
        Destination::Raw(self.destination.clone())
    }

    /// Build the configured stages in order
    pub fn build_pipeline(&self, name: &str) -> StreamPipeResult<Pipeline> {
        let mut builder = Pipeline::builder(name);
        for spec in &self.stages {
            let stage = stages::lookup(&spec.stage, self.mode)?;
            builder = builder.add_boxed_stage(stage, spec.options.clone());
        }
        Ok(builder.build())
    }
}
