//! Framebuffer coordinate types.
//!
//! Geometry itself is authored directly in normalized device coordinates;
//! the viewport maps NDC onto physical pixels.

mod viewport;

pub use viewport::Viewport;
