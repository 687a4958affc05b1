//! Linear in-memory pipeline for text and binary streams
//!
//! A [`StreamPipe`] loads its whole input up front, pushes it through a
//! sequence of stages, and writes the final value out exactly once. Stages
//! are usually plain business functions wrapped by [`text_stage`] or
//! [`binary_stage`], which allocate the output buffer and rewind it for the
//! next stage.
//!
//! # Example
//! ```
//! use streampipe::pipeline::{binary_stage, PipeValue, SharedBuffer, StageOptions, StreamPipe};
//!
//! let invert = binary_stage("invert", |out, input, _options| {
//!     let inverted: Vec<u8> = input.read_bytes().iter().map(|b| !b).collect();
//!     out.push_bytes(&inverted);
//!     Ok(())
//! });
//!
//! let output = SharedBuffer::binary();
//! let mut pipe = StreamPipe::builder()
//!     .binary()
//!     .source(PipeValue::binary(vec![0x0Fu8, 0xF0]))
//!     .destination(output.clone())
//!     .build()?;
//!
//! pipe.iterate([&invert, &invert])?;
//! pipe.close()?;
//!
//! assert_eq!(output.contents().into_bytes(), vec![0x0Fu8, 0xF0]);
//! # Ok::<(), streampipe::error::StreamPipeError>(())
//! ```

pub mod adapter;
pub mod buffer;
pub mod core;
pub mod executor;
pub mod options;
pub mod reference;
pub mod stages;

// Re-export main types
pub use adapter::{binary_stage, stage_fn, text_stage, BinaryStage, FnStage, TextStage};
pub use buffer::{ByteBuffer, Contents, Mode, PipeValue, TextBuffer};
pub use self::core::{Stage, StageRecord};
pub use executor::{PipeState, Pipeline, PipelineBuilder, StageCall, StreamPipe, StreamPipeBuilder};
pub use options::StageOptions;
pub use reference::{Destination, SharedBuffer, Source};
