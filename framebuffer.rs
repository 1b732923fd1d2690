//! In-memory Rgb565 frame buffer
//!
//! Headless surface for tests and offscreen rendering.

use std::convert::Infallible;

use embedded_graphics::draw_target::DrawTarget;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::{Rgb565, RgbColor};
use embedded_graphics::Pixel;

use crate::canvas::{DrawTargetCanvas, Surface};

#[derive(Debug, Clone, PartialEq)]
pub struct Framebuffer {
    size: Size,
    pixels: Vec<Rgb565>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Size::new(width, height),
            pixels: vec![Rgb565::BLACK; width as usize * height as usize],
        }
    }

    pub fn pixels(&self) -> &[Rgb565] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb565> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.size.width as usize + x as usize)
            .copied()
    }

    /// Resize, discarding the current contents.
    pub fn resize(&mut self, width: u32, height: u32) {
        *self = Self::new(width, height);
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        self.size
    }
}

impl DrawTarget for Framebuffer {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let width = self.size.width as i32;
        let height = self.size.height as i32;
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.y >= 0 && point.x < width && point.y < height {
                let index = point.y as usize * self.size.width as usize + point.x as usize;
                self.pixels[index] = color;
            }
        }
        Ok(())
    }
}

impl Surface for Framebuffer {
    type Target<'a> = DrawTargetCanvas<&'a mut Framebuffer>;

    fn acquire(&mut self) -> Option<Self::Target<'_>> {
        Some(DrawTargetCanvas::new(self))
    }
}
