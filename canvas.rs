//! Drawing targets
//!
//! A [`Surface`] hands out a [`Canvas`] for one frame. Dropping the canvas
//! releases it, so a frame can never leak the target, even when drawing
//! fails halfway.

use core::fmt;
use core::ops::DerefMut;

use embedded_graphics::draw_target::DrawTarget;
use embedded_graphics::geometry::Dimensions;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::primitives::{PointsIter, Rectangle};
use embedded_graphics::Pixel;

use crate::sprite::Sprite;

pub trait Canvas {
    type Error: fmt::Debug;

    /// Fill the whole canvas with `color`.
    fn clear(&mut self, color: Rgb565) -> Result<(), Self::Error>;

    /// Draw the full `sprite` stretched into `dest`. Transparent pixels and
    /// anything outside the canvas are skipped.
    fn draw_sprite<S: Sprite + ?Sized>(&mut self, sprite: &S, dest: Rectangle)
        -> Result<(), Self::Error>;
}

/// Something a frame can be drawn into.
pub trait Surface {
    type Target<'a>: Canvas
    where
        Self: 'a;

    /// Lock the surface for one frame. `None` when it is gone (torn down,
    /// not created yet); the caller skips the frame.
    fn acquire(&mut self) -> Option<Self::Target<'_>>;
}

/// Adapts any embedded-graphics `DrawTarget` reached through a mutable
/// handle (`&mut D`, a mutex guard, a box) into a [`Canvas`].
pub struct DrawTargetCanvas<G>(G);

impl<G> DrawTargetCanvas<G> {
    pub fn new(target: G) -> Self {
        Self(target)
    }

    pub fn into_inner(self) -> G {
        self.0
    }
}

impl<G> Canvas for DrawTargetCanvas<G>
where
    G: DerefMut,
    G::Target: DrawTarget<Color = Rgb565>,
    <G::Target as DrawTarget>::Error: fmt::Debug,
{
    type Error = <G::Target as DrawTarget>::Error;

    fn clear(&mut self, color: Rgb565) -> Result<(), Self::Error> {
        DrawTarget::clear(self.0.deref_mut(), color)
    }

    fn draw_sprite<S: Sprite + ?Sized>(
        &mut self,
        sprite: &S,
        dest: Rectangle,
    ) -> Result<(), Self::Error> {
        let source = sprite.size();
        if source.width == 0 || source.height == 0 || dest.size.width == 0 || dest.size.height == 0
        {
            return Ok(());
        }

        let target = self.0.deref_mut();
        let visible = dest.intersection(&target.bounding_box());
        if visible.size.width == 0 || visible.size.height == 0 {
            return Ok(());
        }

        // Nearest-neighbour scaling from the full source rectangle
        let pixels = visible.points().filter_map(|point| {
            let dx = (point.x - dest.top_left.x) as u64;
            let dy = (point.y - dest.top_left.y) as u64;
            let sx = dx * source.width as u64 / dest.size.width as u64;
            let sy = dy * source.height as u64 / dest.size.height as u64;
            sprite
                .pixel(sx as u32, sy as u32)
                .map(|color| Pixel(point, color))
        });
        target.draw_iter(pixels)
    }
}
