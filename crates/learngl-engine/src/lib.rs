//! learngl engine crate.
//!
//! Window runtime, GPU device, and the small set of rendering primitives
//! (shader programs, geometry buffers, a draw pass) the demo binary builds on.

pub mod core;
pub mod coords;
pub mod device;
pub mod error;
pub mod input;
pub mod logging;
pub mod paint;
pub mod render;
pub mod time;
pub mod window;
