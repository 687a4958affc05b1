use crate::error::StreamPipeResult;
use std::time::Duration;

use super::buffer::{Mode, PipeValue};
use super::options::StageOptions;

/// A single stage in a pipeline
///
/// A stage reads the current value (it may advance the value's cursor) and
/// produces a brand-new value that replaces it. Most stages are built with
/// [`text_stage`](super::adapter::text_stage) or
/// [`binary_stage`](super::adapter::binary_stage) rather than by
/// implementing this trait directly.
///
/// # Example
/// ```
/// use streampipe::error::StreamPipeResult;
/// use streampipe::pipeline::{PipeValue, Stage, StageOptions};
///
/// struct Upper;
///
/// impl Stage for Upper {
///     fn apply(&self, input: &mut PipeValue, _options: &StageOptions) -> StreamPipeResult<PipeValue> {
///         Ok(PipeValue::text(input.read_text()?.to_uppercase()))
///     }
///
///     fn name(&self) -> &str {
///         "upper"
///     }
/// }
/// ```
pub trait Stage {
    /// Transform `input` into the next pipeline value
    ///
    /// An error aborts the pipeline; the container keeps `input` as its
    /// current value.
    fn apply(&self, input: &mut PipeValue, options: &StageOptions) -> StreamPipeResult<PipeValue>;

    /// Get stage name for logging
    fn name(&self) -> &str;

    /// Mode of the values this stage produces, when it is fixed
    fn output_mode(&self) -> Option<Mode> {
        None
    }
}

impl<S: Stage + ?Sized> Stage for Box<S> {
    fn apply(&self, input: &mut PipeValue, options: &StageOptions) -> StreamPipeResult<PipeValue> {
        (**self).apply(input, options)
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn output_mode(&self) -> Option<Mode> {
        (**self).output_mode()
    }
}

/// Record of one completed stage run
#[derive(Debug, Clone)]
pub struct StageRecord {
    /// Stage name
    pub stage_name: String,

    /// Size of the value handed to the stage
    pub input_len: usize,

    /// Size of the value the stage produced
    pub output_len: usize,

    /// Duration of execution
    pub duration: Duration,
}

impl StageRecord {
    pub fn new(
        stage_name: impl Into<String>,
        input_len: usize,
        output_len: usize,
        duration: Duration,
    ) -> Self {
        Self {
            stage_name: stage_name.into(),
            input_len,
            output_len,
            duration,
        }
    }
}
