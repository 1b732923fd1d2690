//! Frame composition: background, then trees, then snow

use embedded_graphics::geometry::{Point, Size};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::primitives::Rectangle;

use crate::canvas::Canvas;
use crate::decor::DecorItem;
use crate::particles::Particle;
use crate::sprite::Sprite;

/// Counters for one composed frame.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub trees: usize,
    pub flakes: usize,
    /// Draw calls the canvas rejected.
    pub failed: usize,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Compositor {
    background: Rgb565,
}

impl Compositor {
    pub fn new(background: Rgb565) -> Self {
        Self { background }
    }

    pub fn background(&self) -> Rgb565 {
        self.background
    }

    /// Draw one frame. A failed clear or sprite draw is logged and the rest
    /// of the frame still goes out.
    pub fn draw<C, S>(
        &self,
        canvas: &mut C,
        decor: &[DecorItem],
        particles: &[Particle],
        tree: Option<&S>,
        flakes: &[Option<S>],
    ) -> FrameStats
    where
        C: Canvas,
        S: Sprite,
    {
        let mut stats = FrameStats::default();

        if let Err(e) = canvas.clear(self.background) {
            log::warn!("Failed to clear frame: {:?}", e);
            stats.failed += 1;
        }

        if let Some(tree) = tree {
            let size = tree.size();
            for item in decor {
                let width = size.width as f32 * item.scale;
                let height = size.height as f32 * item.scale;
                let dest = centered_rect(item.x, item.y, width, height);
                match canvas.draw_sprite(tree, dest) {
                    Ok(()) => stats.trees += 1,
                    Err(e) => {
                        log::warn!("Failed to draw tree: {:?}", e);
                        stats.failed += 1;
                    }
                }
            }
        }

        for particle in particles {
            let Some(Some(flake)) = flakes.get(particle.variant) else {
                continue;
            };
            // Flakes are square, sized from the sprite width
            let side = flake.size().width as f32 * particle.scale;
            let dest = centered_rect(particle.x, particle.y, side, side);
            match canvas.draw_sprite(flake, dest) {
                Ok(()) => stats.flakes += 1,
                Err(e) => {
                    log::warn!("Failed to draw snowflake: {:?}", e);
                    stats.failed += 1;
                }
            }
        }

        stats
    }
}

/// Pixel rectangle of `width` x `height` centred on `(cx, cy)`.
pub fn centered_rect(cx: f32, cy: f32, width: f32, height: f32) -> Rectangle {
    let left = libm::roundf(cx - width / 2.0);
    let top = libm::roundf(cy - height / 2.0);
    Rectangle::new(
        Point::new(left as i32, top as i32),
        Size::new(
            libm::roundf(width.max(0.0)) as u32,
            libm::roundf(height.max(0.0)) as u32,
        ),
    )
}
