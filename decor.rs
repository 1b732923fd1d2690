//! Static tree placements behind the snow

use heapless::Vec;
use rand::Rng;

use crate::particles::uniform;
use crate::viewport::Viewport;

pub const MIN_DECOR_SCALE: f32 = 0.8;
pub const MAX_DECOR_SCALE: f32 = 1.3;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DecorItem {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

/// What the current items were generated for.
#[derive(Copy, Clone, Debug, PartialEq)]
struct Applied {
    /// Tree count as configured, before any power saving cut.
    requested: usize,
    placed: usize,
    viewport: Viewport,
}

pub struct DecorLayer<const N: usize> {
    items: Vec<DecorItem, N>,
    applied: Option<Applied>,
}

impl<const N: usize> DecorLayer<N> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            applied: None,
        }
    }

    pub fn items(&self) -> &[DecorItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Count the current items were generated for, if any.
    pub fn applied_count(&self) -> Option<usize> {
        self.applied.map(|applied| applied.placed)
    }

    /// Throw away every item and place `count` new ones.
    pub fn regenerate<R: Rng + ?Sized>(&mut self, rng: &mut R, count: usize, viewport: Viewport) {
        self.regenerate_scaled(rng, count, count, viewport);
    }

    /// Place `placed` items on behalf of a configured count of `requested`
    /// (they differ while power saving halves the trees).
    pub fn regenerate_scaled<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        requested: usize,
        placed: usize,
        viewport: Viewport,
    ) {
        let count = placed.min(N);
        self.items.clear();
        for _ in 0..count {
            let item = DecorItem {
                x: uniform(rng, viewport.width_f32()),
                y: uniform(rng, viewport.height_f32()),
                scale: rng.gen_range(MIN_DECOR_SCALE..MAX_DECOR_SCALE),
            };
            let _ = self.items.push(item);
        }
        self.applied = Some(Applied {
            requested,
            placed: count,
            viewport,
        });
        log::debug!("Placed {} trees (configured {})", count, requested);
    }

    /// Regenerate if the configured count, the placed count or the bounds
    /// differ from what was last applied. Returns whether anything changed.
    pub fn sync<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        requested: usize,
        placed: usize,
        viewport: Viewport,
    ) -> bool {
        let wanted = Applied {
            requested,
            placed: placed.min(N),
            viewport,
        };
        if self.applied == Some(wanted) {
            return false;
        }
        self.regenerate_scaled(rng, requested, placed, viewport);
        true
    }
}

impl<const N: usize> Default for DecorLayer<N> {
    fn default() -> Self {
        Self::new()
    }
}
