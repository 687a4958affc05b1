//! Built-in pipeline stages
//!
//! 1. IdentityStage - Copy the input unchanged (text or binary)
//! 2. XorStage - XOR every byte with a one-byte key (binary)
//! 3. DefinitionsStage - List the names of `def` definitions (text)
//!
//! Stages can also be looked up by name, which is how configuration files and
//! the command line refer to them.

pub mod definitions;
pub mod identity;
pub mod xor;

// Re-export stages
pub use definitions::DefinitionsStage;
pub use identity::IdentityStage;
pub use xor::XorStage;

use crate::error::{StreamPipeError, StreamPipeResult};
use crate::pipeline::{Mode, Stage};

/// Names accepted by [`lookup`]
pub const STAGE_NAMES: &[&str] = &["identity", "xor", "definitions"];

/// Build a built-in stage by name
///
/// `mode` is the pipeline's mode; it decides what `identity` produces.
pub fn lookup(name: &str, mode: Mode) -> StreamPipeResult<Box<dyn Stage>> {
    match name {
        "identity" => Ok(Box::new(IdentityStage::new(mode))),
        "xor" => Ok(Box::new(XorStage::new())),
        "definitions" | "defs" => Ok(Box::new(DefinitionsStage::new())),
        other => Err(StreamPipeError::UnknownStage(format!(
            "{} (available: {})",
            other,
            STAGE_NAMES.join(", ")
        ))),
    }
}
