use crate::error::StreamPipeResult;
use crate::pipeline::adapter::{binary_stage, text_stage};
use crate::pipeline::{ByteBuffer, Mode, PipeValue, Stage, StageOptions, TextBuffer};

fn copy_text(out: &mut TextBuffer, input: &mut PipeValue, _: &StageOptions) -> StreamPipeResult<()> {
    out.push_str(&input.read_text()?);
    Ok(())
}

fn copy_bytes(out: &mut ByteBuffer, input: &mut PipeValue, _: &StageOptions) -> StreamPipeResult<()> {
    out.push_bytes(&input.read_bytes());
    Ok(())
}

/// Stage that copies the remaining input unchanged
pub struct IdentityStage {
    mode: Mode,
}

impl IdentityStage {
    /// Create an identity stage producing values of `mode`
    pub fn new(mode: Mode) -> Self {
        Self { mode }
    }
}

impl Default for IdentityStage {
    fn default() -> Self {
        Self::new(Mode::Text)
    }
}

impl Stage for IdentityStage {
    fn apply(&self, input: &mut PipeValue, options: &StageOptions) -> StreamPipeResult<PipeValue> {
        match self.mode {
            Mode::Text => text_stage("identity", copy_text).apply(input, options),
            Mode::Binary => binary_stage("identity", copy_bytes).apply(input, options),
        }
    }

    fn name(&self) -> &str {
        "identity"
    }

    fn output_mode(&self) -> Option<Mode> {
        Some(self.mode)
    }
}
