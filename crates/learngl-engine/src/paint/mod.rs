//! Color values shared between the application and the renderer.

pub mod color;

pub use color::Color;
