//! GPU rendering primitives.
//!
//! - [`Program`]: linked vertex + fragment shaders with named float uniforms
//! - [`GeometryBuffer`]: uploaded interleaved vertex data
//! - [`DrawPass`]: the per-frame pass that activates, binds, and draws

mod geometry;
mod pass;
mod shader;
mod uniform;

pub use geometry::{GeometryBuffer, Vertex};
pub use pass::{BindState, DrawPass};
pub use shader::{link, read_source, LinkedProgram, Program, ShaderError, ShaderStage};
pub use uniform::{UniformBlock, UniformField, UniformKind, UniformLayout};
