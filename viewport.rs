//! Screen bounds shared by every layer

/// Size of the drawing surface in pixels.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn width_f32(&self) -> f32 {
        self.width as f32
    }

    pub fn height_f32(&self) -> f32 {
        self.height as f32
    }

    /// A zero-area viewport means the surface is not ready yet.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
