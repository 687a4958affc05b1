use std::path::PathBuf;

use clap::Parser;
use serde_json::Value;
use streampipe::{LogLevel, Mode, PipelineConfig, StageSpec, StreamPipeError, StreamPipeResult};

#[derive(Debug, Parser, Clone)]
#[command(name = "streampipe")]
#[command(about = "Run stdin or a file through a sequence of stages")]
pub struct Cli {
    /// Input file; stdin when omitted.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output file; stdout when omitted.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Treat the stream as raw bytes instead of UTF-8 text.
    #[arg(short, long)]
    pub binary: bool,

    /// JSON pipeline configuration; flags given here override it.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// One of debug, info, warn, error. RUST_LOG wins when set.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Stage to run, optionally with JSON options: `xor={"key":32}`.
    /// Repeat to chain stages; they replace any configured stages.
    #[arg(short = 's', long = "stage", value_name = "NAME[=JSON]")]
    pub stages: Vec<String>,
}

impl Cli {
    /// Load the configuration file, if any, and apply the flags on top
    pub fn into_config(self) -> StreamPipeResult<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(input) = self.input {
            config.source = Value::String(input.to_string_lossy().into_owned());
        }
        if let Some(output) = self.output {
            config.destination = Value::String(output.to_string_lossy().into_owned());
        }
        if self.binary {
            config.mode = Mode::Binary;
        }
        if let Some(level) = self.log_level {
            config.log_level = LogLevel::from_str(&level).ok_or_else(|| {
                StreamPipeError::ConfigError(format!("Unknown log level: {}", level))
            })?;
        }
        if !self.stages.is_empty() {
            config.stages = self
                .stages
                .iter()
                .map(|spec| StageSpec::parse(spec))
                .collect::<StreamPipeResult<Vec<_>>>()?;
        }

        Ok(config)
    }
}
