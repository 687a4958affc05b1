//! Adapters turning business functions into pipeline stages
//!
//! A business function has the shape `f(output, input, options)`: it drains
//! as much of `input` as it needs and writes its result into `output`. The
//! adapter owns the allocate, invoke, rewind, return sequence around it:
//!
//! 1. allocate an empty output buffer of the adapter's mode
//! 2. call the business function
//! 3. rewind the output buffer
//! 4. hand the output buffer back as the new pipeline value
//!
//! The adapter never checks the input's mode. Errors from the business
//! function propagate unchanged and the partially written buffer is dropped.

use crate::error::StreamPipeResult;

use super::buffer::{ByteBuffer, Mode, PipeValue, TextBuffer};
use super::core::Stage;
use super::options::StageOptions;

/// Plain function usable as a text business function
pub type TextFn = fn(&mut TextBuffer, &mut PipeValue, &StageOptions) -> StreamPipeResult<()>;

/// Plain function usable as a binary business function
pub type BinaryFn = fn(&mut ByteBuffer, &mut PipeValue, &StageOptions) -> StreamPipeResult<()>;

/// Stage wrapping a text business function
pub struct TextStage<F> {
    name: String,
    func: F,
}

/// Stage wrapping a binary business function
pub struct BinaryStage<F> {
    name: String,
    func: F,
}

/// Stage wrapping a function that maps values directly
pub struct FnStage<F> {
    name: String,
    func: F,
}

/// Wrap a business function that writes text
///
/// # Example
/// ```
/// use streampipe::pipeline::{text_stage, PipeValue, Stage, StageOptions};
///
/// let shout = text_stage("shout", |out, input, _options| {
///     out.push_str(&input.read_text()?.to_uppercase());
///     Ok(())
/// });
///
/// let mut value = PipeValue::text("hi");
/// let result = shout.apply(&mut value, &StageOptions::new()).unwrap();
/// assert_eq!(result, PipeValue::text("HI"));
/// ```
pub fn text_stage<F>(name: impl Into<String>, func: F) -> TextStage<F>
where
    F: Fn(&mut TextBuffer, &mut PipeValue, &StageOptions) -> StreamPipeResult<()>,
{
    TextStage {
        name: name.into(),
        func,
    }
}

/// Wrap a business function that writes bytes
pub fn binary_stage<F>(name: impl Into<String>, func: F) -> BinaryStage<F>
where
    F: Fn(&mut ByteBuffer, &mut PipeValue, &StageOptions) -> StreamPipeResult<()>,
{
    BinaryStage {
        name: name.into(),
        func,
    }
}

/// Wrap a plain `value -> value` function
pub fn stage_fn<F>(name: impl Into<String>, func: F) -> FnStage<F>
where
    F: Fn(&mut PipeValue, &StageOptions) -> StreamPipeResult<PipeValue>,
{
    FnStage {
        name: name.into(),
        func,
    }
}

impl<F> Stage for TextStage<F>
where
    F: Fn(&mut TextBuffer, &mut PipeValue, &StageOptions) -> StreamPipeResult<()>,
{
    fn apply(&self, input: &mut PipeValue, options: &StageOptions) -> StreamPipeResult<PipeValue> {
        let mut output = TextBuffer::new();
        (self.func)(&mut output, input, options)?;
        output.rewind();
        Ok(PipeValue::Text(output))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn output_mode(&self) -> Option<Mode> {
        Some(Mode::Text)
    }
}

impl<F> Stage for BinaryStage<F>
where
    F: Fn(&mut ByteBuffer, &mut PipeValue, &StageOptions) -> StreamPipeResult<()>,
{
    fn apply(&self, input: &mut PipeValue, options: &StageOptions) -> StreamPipeResult<PipeValue> {
        let mut output = ByteBuffer::new();
        (self.func)(&mut output, input, options)?;
        output.rewind();
        Ok(PipeValue::Binary(output))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn output_mode(&self) -> Option<Mode> {
        Some(Mode::Binary)
    }
}

impl<F> Stage for FnStage<F>
where
    F: Fn(&mut PipeValue, &StageOptions) -> StreamPipeResult<PipeValue>,
{
    fn apply(&self, input: &mut PipeValue, options: &StageOptions) -> StreamPipeResult<PipeValue> {
        (self.func)(input, options)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
