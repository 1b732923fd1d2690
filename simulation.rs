//! One tick of the snow scene: update then render
//!
//! Pure state machine with no threads or clocks. The engine calls
//! [`Simulation::update`] and [`Simulation::render`] once per tick; tests
//! can drive it directly.

use embedded_graphics::pixelcolor::{Rgb565, RgbColor};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::canvas::Surface;
use crate::compositor::{Compositor, FrameStats};
use crate::decor::DecorLayer;
use crate::gust::{GustController, GustPhase, GustTiming};
use crate::particles::{FieldStep, ParticleField, StepReport};
use crate::power::{PowerPolicy, Quality};
use crate::settings::{Settings, MAX_TREE_COUNT};
use crate::sprite::Sprite;
use crate::viewport::Viewport;

/// Particle pool size. The configured capacity is capped to this.
pub const MAX_PARTICLES: usize = 512;
pub const MAX_TREES: usize = MAX_TREE_COUNT as usize;

pub type SnowField = ParticleField<MAX_PARTICLES>;
pub type TreeLayer = DecorLayer<MAX_TREES>;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SimulationConfig {
    pub policy: PowerPolicy,
    pub gust: GustTiming,
    /// Multiplier on the user's gust chance fraction giving the per-tick
    /// trigger probability. 1.0 uses the chance as is.
    pub gust_trigger_scale: f32,
    pub background: Rgb565,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            policy: PowerPolicy::default(),
            gust: GustTiming::default(),
            gust_trigger_scale: 1.0,
            background: Rgb565::BLACK,
        }
    }
}

/// What one update did.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TickReport {
    pub power_save: bool,
    /// Effective power saving flipped since the previous update.
    pub power_changed: bool,
    pub wind: f32,
    pub gust_phase: GustPhase,
    pub decor_regenerated: bool,
    pub field: StepReport,
    pub frame_interval_ms: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    Drawn(FrameStats),
    /// The surface had nothing to draw into.
    Skipped,
}

pub struct Simulation {
    config: SimulationConfig,
    field: SnowField,
    decor: TreeLayer,
    gust: GustController,
    compositor: Compositor,
    rng: ChaCha8Rng,
    viewport: Viewport,
    quality: Quality,
    last_power_save: Option<bool>,
}

impl Simulation {
    pub fn new(config: SimulationConfig, variant_count: usize, seed: u64) -> Self {
        Self {
            field: ParticleField::new(variant_count),
            decor: DecorLayer::new(),
            gust: GustController::new(config.gust),
            compositor: Compositor::new(config.background),
            rng: ChaCha8Rng::seed_from_u64(seed),
            viewport: Viewport::default(),
            quality: config.policy.evaluate(false, true, 0),
            last_power_save: None,
            config,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn field(&self) -> &SnowField {
        &self.field
    }

    pub fn decor(&self) -> &TreeLayer {
        &self.decor
    }

    pub fn gust(&self) -> &GustController {
        &self.gust
    }

    pub fn quality(&self) -> &Quality {
        &self.quality
    }

    /// New screen bounds: reseed the snow and replant the trees.
    pub fn resize(&mut self, viewport: Viewport, settings: &Settings, os_power_save: bool) {
        let power_save = settings.power_save_mode || os_power_save;
        self.viewport = viewport;
        self.quality = self.config.policy.evaluate(
            power_save,
            settings.adaptive_frame_rate,
            settings.tree_count(),
        );
        self.field.initialize(
            &mut self.rng,
            self.quality.capacity,
            viewport,
            settings.speed_level(),
        );
        self.decor.regenerate_scaled(
            &mut self.rng,
            settings.tree_count(),
            self.quality.tree_count,
            viewport,
        );
        log::info!(
            "Scene reset to {}x{}: {} flakes, {} trees",
            viewport.width,
            viewport.height,
            self.field.len(),
            self.decor.len()
        );
    }

    /// Advance the scene by one tick.
    pub fn update(&mut self, settings: &Settings, os_power_save: bool) -> TickReport {
        let power_save = settings.power_save_mode || os_power_save;
        let power_changed = self.last_power_save.is_some_and(|last| last != power_save);
        if power_changed {
            log::info!(
                "Power saving {}",
                if power_save { "enabled" } else { "disabled" }
            );
        }
        self.last_power_save = Some(power_save);

        self.quality = self.config.policy.evaluate(
            power_save,
            settings.adaptive_frame_rate,
            settings.tree_count(),
        );

        let mut report = TickReport {
            power_save,
            power_changed,
            wind: 0.0,
            gust_phase: self.gust.phase(),
            decor_regenerated: false,
            field: StepReport::default(),
            frame_interval_ms: self.quality.frame_interval_ms,
        };
        if self.viewport.is_empty() {
            return report;
        }

        report.decor_regenerated = self.decor.sync(
            &mut self.rng,
            settings.tree_count(),
            self.quality.tree_count,
            self.viewport,
        );

        // Gusts are frozen while power saving
        report.wind = if power_save {
            self.gust.force()
        } else {
            let chance = settings.wind_chance() * self.config.gust_trigger_scale;
            self.gust
                .advance(&mut self.rng, settings.wind_level(), chance)
        };
        report.gust_phase = self.gust.phase();

        self.field.set_speed_level(settings.speed_level());
        let step = FieldStep {
            wind: report.wind,
            viewport: self.viewport,
            spawn_probability: self.quality.spawn_probability,
            capacity: self.quality.capacity,
        };
        let limit = self.quality.particle_subset(self.field.len());
        report.field = self.field.advance_first(&mut self.rng, &step, limit);

        report
    }

    /// Draw the current state. The surface target is released before this
    /// returns, whatever happened while drawing.
    pub fn render<Sf, S>(&self, surface: &mut Sf, tree: Option<&S>, flakes: &[Option<S>]) -> RenderOutcome
    where
        Sf: Surface,
        S: Sprite,
    {
        let Some(mut canvas) = surface.acquire() else {
            log::debug!("Surface unavailable, skipping frame");
            return RenderOutcome::Skipped;
        };

        let trees = self.decor.items();
        let trees = &trees[..self.quality.tree_subset(trees.len())];
        let particles = self.field.particles();
        let particles = &particles[..self.quality.particle_subset(particles.len())];

        let stats = self
            .compositor
            .draw(&mut canvas, trees, particles, tree, flakes);
        RenderOutcome::Drawn(stats)
    }
}
