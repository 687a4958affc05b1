use crate::error::{StreamPipeError, StreamPipeResult};
use crate::logger::LogLevel;
use std::io::{self, Read, Write};
use std::time::Instant;

use super::buffer::{Mode, PipeValue};
use super::core::{Stage, StageRecord};
use super::options::StageOptions;
use super::reference::{Destination, Source};

/// Lifecycle of a [`StreamPipe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeState {
    /// Source loaded, no stage run yet
    Loaded,
    /// At least one stage has completed
    Running,
    /// Result written out; terminal
    Flushed,
}

/// One entry of a stage sequence: a stage and the options it runs with
pub struct StageCall<'a> {
    pub stage: &'a dyn Stage,
    pub options: StageOptions,
}

impl<'a> StageCall<'a> {
    /// Call with empty options
    pub fn new(stage: &'a dyn Stage) -> Self {
        Self {
            stage,
            options: StageOptions::new(),
        }
    }

    pub fn with_options(stage: &'a dyn Stage, options: StageOptions) -> Self {
        Self { stage, options }
    }
}

impl<'a, S: Stage> From<&'a S> for StageCall<'a> {
    fn from(stage: &'a S) -> Self {
        StageCall::new(stage)
    }
}

impl<'a, S: Stage> From<(&'a S, StageOptions)> for StageCall<'a> {
    fn from((stage, options): (&'a S, StageOptions)) -> Self {
        StageCall::with_options(stage, options)
    }
}

/// Container that owns the in-flight value of a linear pipeline
///
/// The source is read in full when the container is built. Stages then
/// replace the current value one after another, and the final value is
/// written to the destination exactly once: by [`close`](Self::close),
/// at the end of [`scope`](Self::scope), by an explicit
/// [`flush`](Self::flush), or when the container is dropped. Stage errors
/// are never swallowed by the flush.
///
/// # Example
/// ```
/// use streampipe::pipeline::{text_stage, SharedBuffer, StageOptions, StreamPipe};
///
/// let upper = text_stage("upper", |out, input, _options| {
///     out.push_str(&input.read_text()?.to_uppercase());
///     Ok(())
/// });
///
/// let output = SharedBuffer::text();
/// StreamPipe::builder()
///     .source(streampipe::pipeline::PipeValue::text("hello"))
///     .destination(output.clone())
///     .build()?
///     .scope(|pipe| pipe.run(&upper, &StageOptions::new()))?;
///
/// assert_eq!(output.contents().into_text()?, "HELLO");
/// # Ok::<(), streampipe::error::StreamPipeError>(())
/// ```
pub struct StreamPipe {
    session_id: String,
    mode: Mode,
    current: PipeValue,
    destination: Option<Destination>,
    stdout: Box<dyn Write>,
    state: PipeState,
    history: Vec<StageRecord>,
}

impl StreamPipe {
    /// Create a new container builder
    pub fn builder() -> StreamPipeBuilder {
        StreamPipeBuilder::new()
    }

    /// Build a container on the process's standard channels
    pub fn open(
        source: impl Into<Source>,
        destination: impl Into<Destination>,
        mode: Mode,
    ) -> StreamPipeResult<Self> {
        Self::builder()
            .source(source)
            .destination(destination)
            .mode(mode)
            .build()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn state(&self) -> PipeState {
        self.state
    }

    /// The current value
    pub fn value(&self) -> &PipeValue {
        &self.current
    }

    /// Completed stage runs, oldest first
    pub fn history(&self) -> &[StageRecord] {
        &self.history
    }

    /// Run one stage and make its output the current value
    ///
    /// On error the current value stays as it was before the stage and the
    /// error is returned unchanged.
    pub fn run<S: Stage + ?Sized>(
        &mut self,
        stage: &S,
        options: &StageOptions,
    ) -> StreamPipeResult<()> {
        if self.state == PipeState::Flushed {
            return Err(StreamPipeError::PipelineClosed);
        }

        let stage_name = stage.name();
        let input_len = self.current.len();

        if let Some(output_mode) = stage.output_mode() {
            if output_mode != self.mode {
                crate::app_log!(
                    LogLevel::Warn,
                    "pipeline",
                    "Stage '{}' produces {} data in a {} pipeline (session: {})",
                    stage_name,
                    output_mode.as_str(),
                    self.mode.as_str(),
                    self.session_id
                );
            }
        }

        let stage_start = Instant::now();
        let next = match stage.apply(&mut self.current, options) {
            Ok(next) => next,
            Err(e) => {
                crate::app_log!(
                    LogLevel::Error,
                    "pipeline",
                    "Stage '{}' failed: {} (session: {})",
                    stage_name,
                    e,
                    self.session_id
                );
                return Err(e);
            }
        };
        let duration = stage_start.elapsed();

        crate::app_log!(
            LogLevel::Debug,
            "pipeline",
            "Stage '{}' completed in {:.3}s: {} -> {} bytes (session: {})",
            stage_name,
            duration.as_secs_f64(),
            input_len,
            next.len(),
            self.session_id
        );

        self.history
            .push(StageRecord::new(stage_name, input_len, next.len(), duration));
        self.current = next;
        self.state = PipeState::Running;
        Ok(())
    }

    /// Run stages in order, stopping at the first error
    ///
    /// Stage `i + 1` always sees the output of stage `i`. Options default to
    /// empty when a bare stage reference is given.
    pub fn iterate<'s, I, C>(&mut self, stages: I) -> StreamPipeResult<()>
    where
        I: IntoIterator<Item = C>,
        C: Into<StageCall<'s>>,
    {
        let calls: Vec<StageCall<'s>> = stages.into_iter().map(Into::into).collect();
        let total = calls.len();

        crate::app_log!(
            LogLevel::Info,
            "pipeline",
            "Running {} stages (session: {})",
            total,
            self.session_id
        );

        let pipeline_start = Instant::now();
        for (index, call) in calls.iter().enumerate() {
            crate::app_log!(
                LogLevel::Info,
                "pipeline",
                "Executing stage {}/{}: {} (session: {})",
                index + 1,
                total,
                call.stage.name(),
                self.session_id
            );
            self.run(call.stage, &call.options)?;
        }

        crate::app_log!(
            LogLevel::Info,
            "pipeline",
            "All {} stages completed in {:.2}s (session: {})",
            total,
            pipeline_start.elapsed().as_secs_f64(),
            self.session_id
        );
        Ok(())
    }

    /// Write the current value to the destination
    ///
    /// Only the first call writes; later calls return `Ok(())`. The
    /// container rejects further stages afterwards.
    pub fn flush(&mut self) -> StreamPipeResult<()> {
        if self.state == PipeState::Flushed {
            return Ok(());
        }
        self.state = PipeState::Flushed;

        let destination = self.destination.take().unwrap_or_default();
        let description = destination.describe();
        let contents = self.current.contents();
        let len = contents.len();

        match destination.store(contents, self.mode, &mut *self.stdout) {
            Ok(()) => {
                crate::app_log!(
                    LogLevel::Info,
                    "pipeline",
                    "Flushed {} bytes to {} (session: {})",
                    len,
                    description,
                    self.session_id
                );
                Ok(())
            }
            Err(e) => {
                crate::app_log!(
                    LogLevel::Error,
                    "pipeline",
                    "Flush to {} failed: {} (session: {})",
                    description,
                    e,
                    self.session_id
                );
                Err(e)
            }
        }
    }

    /// Flush and consume the container
    pub fn close(mut self) -> StreamPipeResult<()> {
        self.flush()
    }

    /// Run `body` against the container, then flush whatever the outcome
    ///
    /// An error from `body` wins over a flush error; the flush still
    /// happens first.
    pub fn scope<T, F>(mut self, body: F) -> StreamPipeResult<T>
    where
        F: FnOnce(&mut StreamPipe) -> StreamPipeResult<T>,
    {
        let outcome = body(&mut self);
        let flushed = self.flush();

        match (outcome, flushed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(flush_err)) => Err(flush_err),
            (Err(body_err), Ok(())) => Err(body_err),
            (Err(body_err), Err(flush_err)) => {
                crate::app_log!(
                    LogLevel::Warn,
                    "pipeline",
                    "Flush error superseded by stage error: {} (session: {})",
                    flush_err,
                    self.session_id
                );
                Err(body_err)
            }
        }
    }
}

impl Drop for StreamPipe {
    fn drop(&mut self) {
        if self.state == PipeState::Flushed {
            return;
        }
        // Errors already logged by flush; nothing can propagate out of drop
        let _ = self.flush();
    }
}

impl std::fmt::Debug for StreamPipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamPipe")
            .field("session_id", &self.session_id)
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("current_len", &self.current.len())
            .field("destination", &self.destination)
            .finish()
    }
}

/// Builder for [`StreamPipe`]
pub struct StreamPipeBuilder {
    source: Source,
    destination: Destination,
    mode: Mode,
    stdin: Option<Box<dyn Read>>,
    stdout: Option<Box<dyn Write>>,
}

impl StreamPipeBuilder {
    /// Stdin to stdout in text mode
    pub fn new() -> Self {
        Self {
            source: Source::Stdin,
            destination: Destination::Stdout,
            mode: Mode::Text,
            stdin: None,
            stdout: None,
        }
    }

    pub fn source(mut self, source: impl Into<Source>) -> Self {
        self.source = source.into();
        self
    }

    pub fn destination(mut self, destination: impl Into<Destination>) -> Self {
        self.destination = destination.into();
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn text(self) -> Self {
        self.mode(Mode::Text)
    }

    pub fn binary(self) -> Self {
        self.mode(Mode::Binary)
    }

    /// Replace the default input channel
    pub fn stdin(mut self, reader: impl Read + 'static) -> Self {
        self.stdin = Some(Box::new(reader));
        self
    }

    /// Replace the default output channel
    pub fn stdout(mut self, writer: impl Write + 'static) -> Self {
        self.stdout = Some(Box::new(writer));
        self
    }

    /// Load the source and build the container
    pub fn build(self) -> StreamPipeResult<StreamPipe> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let description = self.source.describe();
        let mut stdin = self
            .stdin
            .unwrap_or_else(|| Box::new(io::stdin()) as Box<dyn Read>);

        let current = match self.source.load(self.mode, &mut *stdin) {
            Ok(value) => value,
            Err(e) => {
                crate::app_log!(
                    LogLevel::Error,
                    "pipeline",
                    "Failed to load {}: {} (session: {})",
                    description,
                    e,
                    session_id
                );
                return Err(e);
            }
        };

        crate::app_log!(
            LogLevel::Info,
            "pipeline",
            "Loaded {} bytes from {} in {} mode (session: {})",
            current.len(),
            description,
            self.mode.as_str(),
            session_id
        );

        Ok(StreamPipe {
            session_id,
            mode: self.mode,
            current,
            destination: Some(self.destination),
            stdout: self
                .stdout
                .unwrap_or_else(|| Box::new(io::stdout()) as Box<dyn Write>),
            state: PipeState::Loaded,
            history: Vec::new(),
        })
    }
}

impl Default for StreamPipeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Owned, named sequence of stages with their options
///
/// # Example
/// ```
/// use streampipe::pipeline::{stages::XorStage, Pipeline, StageOptions};
///
/// let pipeline = Pipeline::builder("scramble")
///     .add_stage(XorStage::new())
///     .add_stage_with(XorStage::new(), StageOptions::new().with("key", 0x11))
///     .build();
///
/// assert_eq!(pipeline.stage_count(), 2);
/// ```
pub struct Pipeline {
    name: String,
    stages: Vec<(Box<dyn Stage>, StageOptions)>,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder(name: impl Into<String>) -> PipelineBuilder {
        PipelineBuilder::new(name)
    }

    /// Get the pipeline name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of stages
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Borrow the stages as calls for [`StreamPipe::iterate`]
    pub fn calls(&self) -> impl Iterator<Item = StageCall<'_>> {
        self.stages
            .iter()
            .map(|(stage, options)| StageCall::with_options(&**stage, options.clone()))
    }

    /// Run every stage against `pipe`
    pub fn execute(&self, pipe: &mut StreamPipe) -> StreamPipeResult<()> {
        crate::app_log!(
            LogLevel::Info,
            "pipeline",
            "Starting pipeline '{}' with {} stages (session: {})",
            self.name,
            self.stages.len(),
            pipe.session_id()
        );
        pipe.iterate(self.calls())
    }
}

/// Builder for constructing pipelines
pub struct PipelineBuilder {
    name: String,
    stages: Vec<(Box<dyn Stage>, StageOptions)>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Add a stage with empty options
    pub fn add_stage<S: Stage + 'static>(self, stage: S) -> Self {
        self.add_stage_with(stage, StageOptions::new())
    }

    /// Add a stage with options
    pub fn add_stage_with<S: Stage + 'static>(mut self, stage: S, options: StageOptions) -> Self {
        self.stages.push((Box::new(stage), options));
        self
    }

    /// Add a boxed stage with options
    pub fn add_boxed_stage(mut self, stage: Box<dyn Stage>, options: StageOptions) -> Self {
        self.stages.push((stage, options));
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Pipeline {
        Pipeline {
            name: self.name,
            stages: self.stages,
        }
    }
}
