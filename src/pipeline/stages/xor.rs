use crate::error::StreamPipeResult;
use crate::logger::LogLevel;
use crate::pipeline::adapter::{binary_stage, BinaryFn, BinaryStage};
use crate::pipeline::{ByteBuffer, Mode, PipeValue, Stage, StageOptions};

/// Key used when no `key` option is given
pub const DEFAULT_KEY: u8 = 0xFA;

/// XOR every input byte with a one-byte key
///
/// Applying it twice with the same key restores the input.
pub fn xor(out: &mut ByteBuffer, input: &mut PipeValue, options: &StageOptions) -> StreamPipeResult<()> {
    let key = if options.has("key") {
        options.get_u8("key")?
    } else {
        DEFAULT_KEY
    };

    let scrambled: Vec<u8> = input.read_bytes().into_iter().map(|b| b ^ key).collect();

    crate::app_log!(
        LogLevel::Debug,
        "pipeline::xor",
        "XORed {} bytes with key 0x{:02X}",
        scrambled.len(),
        key
    );

    out.push_bytes(&scrambled);
    Ok(())
}

/// Binary stage running [`xor`]
///
/// # Options
/// - `key` (integer 0..=255, default `0xFA`)
pub struct XorStage {
    inner: BinaryStage<BinaryFn>,
}

impl XorStage {
    /// Create a new xor stage
    pub fn new() -> Self {
        Self {
            inner: binary_stage("xor", xor as BinaryFn),
        }
    }
}

impl Default for XorStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for XorStage {
    fn apply(&self, input: &mut PipeValue, options: &StageOptions) -> StreamPipeResult<PipeValue> {
        self.inner.apply(input, options)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn output_mode(&self) -> Option<Mode> {
        Some(Mode::Binary)
    }
}
