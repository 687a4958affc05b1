//! streampipe: run a text or binary stream through a linear sequence of
//! in-memory stages, reading from a file or stdin and writing to a file or
//! stdout.

pub mod config;
pub mod error;
pub mod logger;
pub mod pipeline;

pub use config::{PipelineConfig, StageSpec};
pub use error::{StreamPipeError, StreamPipeResult};
pub use logger::{init_logging, LogLevel};
pub use pipeline::{
    binary_stage, text_stage, Destination, Mode, PipeValue, SharedBuffer, Source, Stage,
    StageOptions, StreamPipe,
};
