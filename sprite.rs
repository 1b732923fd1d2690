//! Sprite handles
//!
//! Decoding is the host's job. The core only needs a size and a way to read
//! pixels, so any image type can be wrapped in [`Sprite`].

use core::fmt;

use embedded_graphics::geometry::Size;
use embedded_graphics::pixelcolor::Rgb565;
#[cfg(feature = "std")]
use embedded_graphics::pixelcolor::RgbColor;

/// An opaque drawable with a fixed size.
pub trait Sprite {
    fn size(&self) -> Size;

    /// Color at `(x, y)`, `None` where the sprite is transparent or out of
    /// range.
    fn pixel(&self, x: u32, y: u32) -> Option<Rgb565>;
}

impl<S: Sprite + ?Sized> Sprite for &S {
    fn size(&self) -> Size {
        (**self).size()
    }

    fn pixel(&self, x: u32, y: u32) -> Option<Rgb565> {
        (**self).pixel(x, y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteError {
    /// Width or height is zero
    Empty,
    /// Pixel buffer does not hold `width * height` entries
    LengthMismatch { expected: usize, actual: usize },
}

impl fmt::Display for SpriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpriteError::Empty => write!(f, "Sprite has no pixels"),
            SpriteError::LengthMismatch { expected, actual } => write!(
                f,
                "Sprite buffer holds {} pixels, expected {}",
                actual, expected
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SpriteError {}

/// Row-major Rgb565 bitmap with an optional transparent color key.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap<B> {
    size: Size,
    pixels: B,
    transparent: Option<Rgb565>,
}

impl<B: AsRef<[Rgb565]>> Bitmap<B> {
    pub fn new(width: u32, height: u32, pixels: B) -> Result<Self, SpriteError> {
        if width == 0 || height == 0 {
            return Err(SpriteError::Empty);
        }
        let expected = (width as usize).saturating_mul(height as usize);
        let actual = pixels.as_ref().len();
        if actual != expected {
            return Err(SpriteError::LengthMismatch { expected, actual });
        }
        Ok(Self {
            size: Size::new(width, height),
            pixels,
            transparent: None,
        })
    }

    /// Treat every pixel of `key` color as transparent.
    pub fn with_transparent(mut self, key: Rgb565) -> Self {
        self.transparent = Some(key);
        self
    }
}

#[cfg(feature = "std")]
impl Bitmap<std::vec::Vec<Rgb565>> {
    /// Build an owned bitmap pixel by pixel. `None` marks transparency.
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Result<Self, SpriteError>
    where
        F: FnMut(u32, u32) -> Option<Rgb565>,
    {
        let key = Rgb565::MAGENTA;
        let mut pixels = std::vec::Vec::with_capacity((width as usize) * (height as usize));
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y).unwrap_or(key));
            }
        }
        Ok(Self::new(width, height, pixels)?.with_transparent(key))
    }
}

impl<B: AsRef<[Rgb565]>> Sprite for Bitmap<B> {
    fn size(&self) -> Size {
        self.size
    }

    fn pixel(&self, x: u32, y: u32) -> Option<Rgb565> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        let index = y as usize * self.size.width as usize + x as usize;
        let color = *self.pixels.as_ref().get(index)?;
        match self.transparent {
            Some(key) if key == color => None,
            _ => Some(color),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::pixelcolor::RgbColor;

    #[test]
    fn test_bitmap_rejects_bad_length() {
        let pixels = [Rgb565::WHITE; 5];
        let err = Bitmap::new(2, 3, &pixels[..]).unwrap_err();
        assert_eq!(err, SpriteError::LengthMismatch { expected: 6, actual: 5 });
        assert!(format!("{}", err).contains("expected 6"));
    }

    #[test]
    fn test_bitmap_rejects_empty() {
        let pixels: [Rgb565; 0] = [];
        assert_eq!(Bitmap::new(0, 4, &pixels[..]).unwrap_err(), SpriteError::Empty);
    }

    #[test]
    fn test_pixel_lookup_row_major() {
        let pixels = [Rgb565::RED, Rgb565::GREEN, Rgb565::BLUE, Rgb565::WHITE];
        let bitmap = Bitmap::new(2, 2, pixels).unwrap();
        assert_eq!(bitmap.pixel(1, 0), Some(Rgb565::GREEN));
        assert_eq!(bitmap.pixel(0, 1), Some(Rgb565::BLUE));
        assert_eq!(bitmap.pixel(2, 0), None);
    }

    #[test]
    fn test_transparent_key() {
        let pixels = [Rgb565::BLACK, Rgb565::WHITE];
        let bitmap = Bitmap::new(2, 1, pixels).unwrap().with_transparent(Rgb565::BLACK);
        assert_eq!(bitmap.pixel(0, 0), None);
        assert_eq!(bitmap.pixel(1, 0), Some(Rgb565::WHITE));
    }

    #[test]
    fn test_from_fn_marks_transparency() {
        let bitmap = Bitmap::from_fn(3, 3, |x, y| (x == y).then_some(Rgb565::WHITE)).unwrap();
        assert_eq!(bitmap.size(), Size::new(3, 3));
        assert_eq!(bitmap.pixel(1, 1), Some(Rgb565::WHITE));
        assert_eq!(bitmap.pixel(2, 1), None);
    }
}
