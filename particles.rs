//! Falling snow particles
//!
//! Fixed-capacity pool, no heap allocation. Particles are never removed:
//! once one drops below the screen it is recycled in place at the top.

use heapless::Vec;
use rand::Rng;

use crate::viewport::Viewport;

/// Distance past each screen edge a particle may travel before it wraps,
/// so a sprite fully leaves the screen before reappearing.
pub const EDGE_MARGIN: f32 = 50.0;
/// Width of the fall speed band above the configured speed level.
pub const SPEED_SPREAD: f32 = 3.0;
pub const MIN_SCALE: f32 = 0.5;
pub const MAX_SCALE: f32 = 1.0;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    /// Pixels per tick, always positive.
    pub speed: f32,
    /// Horizontal size factor applied to the sprite width.
    pub scale: f32,
    /// Index into the snowflake sprite variants.
    pub variant: usize,
}

/// Inputs for one field update.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FieldStep {
    /// Horizontal displacement applied to every particle this tick.
    pub wind: f32,
    pub viewport: Viewport,
    /// Chance of appending one new particle after the update.
    pub spawn_probability: f32,
    /// Soft ceiling, only checked when spawning.
    pub capacity: usize,
}

/// What happened during one field update.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    pub updated: usize,
    pub recycled: usize,
    pub spawned: bool,
}

pub struct ParticleField<const N: usize> {
    particles: Vec<Particle, N>,
    variant_count: usize,
    speed_level: f32,
}

impl<const N: usize> ParticleField<N> {
    pub fn new(variant_count: usize) -> Self {
        Self {
            particles: Vec::new(),
            variant_count,
            speed_level: 1.0,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn variant_count(&self) -> usize {
        self.variant_count
    }

    /// Speed level used for particles spawned from now on.
    pub fn set_speed_level(&mut self, speed_level: f32) {
        self.speed_level = speed_level.max(1.0);
    }

    /// Replace the field with `capacity` freshly randomized particles.
    pub fn initialize<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        capacity: usize,
        viewport: Viewport,
        speed_level: f32,
    ) {
        self.set_speed_level(speed_level);
        self.particles.clear();
        for _ in 0..capacity.min(N) {
            let mut particle = self.spawn(rng, viewport);
            particle.y = uniform(rng, viewport.height_f32());
            // Cannot fail: the loop is bounded by N
            let _ = self.particles.push(particle);
        }
        log::debug!(
            "Particle field seeded with {} particles ({}x{})",
            self.particles.len(),
            viewport.width,
            viewport.height
        );
    }

    /// Advance every particle.
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R, step: &FieldStep) -> StepReport {
        self.advance_first(rng, step, usize::MAX)
    }

    /// Advance only the first `limit` particles; the rest stay where they
    /// are this tick. Spawning still happens.
    pub fn advance_first<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        step: &FieldStep,
        limit: usize,
    ) -> StepReport {
        let width = step.viewport.width_f32();
        let height = step.viewport.height_f32();
        let mut report = StepReport::default();

        let count = limit.min(self.particles.len());
        for p in self.particles[..count].iter_mut() {
            p.y += p.speed;
            p.x += step.wind;

            // Horizontal wrap
            if p.x < -EDGE_MARGIN {
                p.x = width + EDGE_MARGIN;
            } else if p.x > width + EDGE_MARGIN {
                p.x = -EDGE_MARGIN;
            }

            // Re-enter at the top with a fresh column
            if p.y > height + EDGE_MARGIN {
                p.y = -EDGE_MARGIN;
                p.x = uniform(rng, width);
                report.recycled += 1;
            }
        }
        report.updated = count;

        if rng.gen::<f32>() < step.spawn_probability
            && self.particles.len() < step.capacity.min(N)
        {
            let mut particle = self.spawn(rng, step.viewport);
            particle.y = uniform(rng, height);
            report.spawned = self.particles.push(particle).is_ok();
        }

        report
    }

    fn spawn<R: Rng + ?Sized>(&self, rng: &mut R, viewport: Viewport) -> Particle {
        let variant = if self.variant_count > 0 {
            rng.gen_range(0..self.variant_count)
        } else {
            0
        };
        Particle {
            x: uniform(rng, viewport.width_f32()),
            y: 0.0,
            speed: rng.gen_range(self.speed_level..self.speed_level + SPEED_SPREAD),
            scale: rng.gen_range(MIN_SCALE..MAX_SCALE),
            variant,
        }
    }
}

/// Uniform sample in `[0, upper)`, or 0 for an empty range.
pub(crate) fn uniform<R: Rng + ?Sized>(rng: &mut R, upper: f32) -> f32 {
    if upper > 0.0 {
        rng.gen_range(0.0..upper)
    } else {
        0.0
    }
}
