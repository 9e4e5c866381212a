/// Visible drawing region in physical pixels.
///
/// Maps normalized device coordinates onto the framebuffer. The region always
/// starts at the framebuffer origin and covers the whole framebuffer.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Viewport covering a framebuffer of the given size.
    #[inline]
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }

    /// Framebuffer-resize handler: the region becomes exactly `(0, 0, width, height)`.
    #[inline]
    pub fn on_framebuffer_resized(&mut self, width: u32, height: u32) {
        *self = Self::from_size(width, height);
    }

    /// Zero-area viewports cannot be drawn into (minimized windows).
    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns `(x, y, width, height)` as floats for `set_viewport`.
    #[inline]
    pub fn as_f32(self) -> (f32, f32, f32, f32) {
        (self.x as f32, self.y as f32, self.width as f32, self.height as f32)
    }
}
