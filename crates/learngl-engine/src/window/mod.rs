//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and the single Window, and wires them to the GPU
//! layer and the application.

mod close;
mod lifecycle;
mod runtime;

pub use close::CloseRequest;
pub use lifecycle::Lifecycle;
pub use runtime::{Runtime, RuntimeConfig};
