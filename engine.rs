//! Threaded render loop and host lifecycle
//!
//! The host drives an [`Engine`] with plain method calls (surface ready,
//! resized, visibility, destroy). While visible, one background thread owns
//! the scene and the surface and ticks at the frame interval chosen by the
//! power policy. Stopping hands both back to the engine, so nothing is
//! shared between the host thread and the loop except the command channel
//! and the parameter store.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::canvas::Surface;
use crate::error::EngineError;
use crate::params::ParameterStore;
use crate::simulation::{RenderOutcome, Simulation, SimulationConfig, TickReport};
use crate::sprite::Sprite;
use crate::viewport::Viewport;

/// Tree sprite plus the snowflake variants. `None` entries are sprites the
/// host failed to provide; they are simply not drawn.
#[derive(Debug, Clone)]
pub struct SpriteSet<S> {
    pub tree: Option<S>,
    pub flakes: Vec<Option<S>>,
}

impl<S> SpriteSet<S> {
    pub fn new(tree: Option<S>, flakes: Vec<Option<S>>) -> Self {
        Self { tree, flakes }
    }

    pub fn variant_count(&self) -> usize {
        self.flakes.len()
    }
}

impl<S> Default for SpriteSet<S> {
    fn default() -> Self {
        Self {
            tree: None,
            flakes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineOptions {
    pub simulation: SimulationConfig,
    /// Fixed RNG seed; random when `None`
    pub seed: Option<u64>,
    /// Failed ticks in a row before the loop exits
    pub max_consecutive_failures: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            seed: None,
            max_consecutive_failures: 5,
        }
    }
}

enum Command {
    Resize(Viewport),
    Stop,
}

/// Everything the loop thread owns while running.
struct Stage<Sf> {
    simulation: Simulation,
    surface: Sf,
}

impl<Sf: Surface> Stage<Sf> {
    fn tick<P, S>(&mut self, params: &P, sprites: &SpriteSet<S>) -> TickReport
    where
        P: ParameterStore + ?Sized,
        S: Sprite,
    {
        let settings = params.settings().sanitized();
        let report = self.simulation.update(&settings, params.os_power_save());
        if let RenderOutcome::Drawn(stats) =
            self.simulation
                .render(&mut self.surface, sprites.tree.as_ref(), &sprites.flakes)
        {
            log::trace!(
                "Frame: {} trees, {} flakes, {} failed",
                stats.trees,
                stats.flakes,
                stats.failed
            );
        }
        report
    }

    fn resize<P: ParameterStore + ?Sized>(&mut self, viewport: Viewport, params: &P) {
        let settings = params.settings().sanitized();
        self.simulation
            .resize(viewport, &settings, params.os_power_save());
    }
}

struct Worker<Sf> {
    commands: Sender<Command>,
    handle: JoinHandle<Stage<Sf>>,
}

/// Snow scene bound to one host surface.
pub struct Engine<Sf, P, S>
where
    Sf: Surface + Send + 'static,
    P: ParameterStore + 'static,
    S: Sprite + Send + Sync + 'static,
{
    options: EngineOptions,
    params: Arc<P>,
    sprites: Arc<SpriteSet<S>>,
    /// Scene and surface while no loop runs
    parked: Option<Stage<Sf>>,
    worker: Option<Worker<Sf>>,
    visible: bool,
    destroyed: bool,
}

impl<Sf, P, S> Engine<Sf, P, S>
where
    Sf: Surface + Send + 'static,
    P: ParameterStore + 'static,
    S: Sprite + Send + Sync + 'static,
{
    pub fn new(options: EngineOptions, surface: Sf, params: Arc<P>, sprites: SpriteSet<S>) -> Self {
        let seed = options.seed.unwrap_or_else(rand::random);
        let simulation = Simulation::new(options.simulation, sprites.variant_count(), seed);
        log::debug!(
            "Engine created with {} snowflake variants, seed {}",
            sprites.variant_count(),
            seed
        );
        Self {
            options,
            params,
            sprites: Arc::new(sprites),
            parked: Some(Stage {
                simulation,
                surface,
            }),
            worker: None,
            visible: false,
            destroyed: false,
        }
    }

    /// The surface exists and has a size.
    pub fn on_surface_ready(&mut self, width: u32, height: u32) {
        log::info!("Surface ready: {}x{}", width, height);
        self.resize(Viewport::new(width, height));
    }

    /// The surface changed size; the scene is reseeded for the new bounds.
    pub fn on_surface_resized(&mut self, width: u32, height: u32) {
        log::info!("Surface resized: {}x{}", width, height);
        self.resize(Viewport::new(width, height));
    }

    pub fn on_visibility_changed(&mut self, visible: bool) -> Result<(), EngineError> {
        self.visible = visible;
        if visible {
            self.start()
        } else {
            self.stop();
            Ok(())
        }
    }

    /// Stop the loop and release the scene, surface and sprites. The engine
    /// cannot be restarted afterwards.
    pub fn on_destroy(&mut self) {
        self.stop();
        self.parked = None;
        self.sprites = Arc::new(SpriteSet::default());
        self.destroyed = true;
        log::info!("Engine destroyed");
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether a loop thread is alive right now.
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    /// The scene, available while the loop is stopped.
    pub fn simulation(&self) -> Option<&Simulation> {
        self.parked.as_ref().map(|stage| &stage.simulation)
    }

    /// The surface, available while the loop is stopped.
    pub fn surface(&self) -> Option<&Sf> {
        self.parked.as_ref().map(|stage| &stage.surface)
    }

    /// Start ticking. Any running loop is stopped first, so there is never
    /// more than one.
    pub fn start(&mut self) -> Result<(), EngineError> {
        self.stop();
        if self.destroyed {
            return Err(EngineError::Destroyed);
        }
        let Some(stage) = self.parked.take() else {
            return Err(EngineError::SceneLost);
        };

        let (commands, receiver) = mpsc::channel();
        let params = Arc::clone(&self.params);
        let sprites = Arc::clone(&self.sprites);
        let max_failures = self.options.max_consecutive_failures.max(1);
        let fallback = Duration::from_millis(
            self.options.simulation.policy.normal_interval_ms as u64,
        );

        let handle = thread::Builder::new()
            .name("snowfall-loop".to_string())
            .spawn(move || {
                run_loop(stage, receiver, &*params, &*sprites, max_failures, fallback)
            })
            .map_err(EngineError::Spawn)?;

        self.worker = Some(Worker { commands, handle });
        log::info!("Render loop started");
        Ok(())
    }

    /// Stop the loop and wait for it to hand the scene back. No-op when
    /// nothing runs.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        // The loop may already have exited on its own
        let _ = worker.commands.send(Command::Stop);
        match worker.handle.join() {
            Ok(stage) => {
                self.parked = Some(stage);
                log::info!("Render loop stopped");
            }
            Err(_) => log::error!("Render loop thread panicked, scene lost"),
        }
    }

    fn resize(&mut self, viewport: Viewport) {
        if let Some(worker) = &self.worker {
            if worker.commands.send(Command::Resize(viewport)).is_ok() {
                return;
            }
            // Loop is gone; take the scene back and apply directly
            self.stop();
        }
        match self.parked.as_mut() {
            Some(stage) => stage.resize(viewport, &*self.params),
            None => log::warn!("Resize ignored, engine has no surface"),
        }
    }
}

impl<Sf, P, S> Drop for Engine<Sf, P, S>
where
    Sf: Surface + Send + 'static,
    P: ParameterStore + 'static,
    S: Sprite + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop<Sf, P, S>(
    mut stage: Stage<Sf>,
    commands: Receiver<Command>,
    params: &P,
    sprites: &SpriteSet<S>,
    max_failures: u32,
    fallback: Duration,
) -> Stage<Sf>
where
    Sf: Surface,
    P: ParameterStore + ?Sized,
    S: Sprite,
{
    let mut failures = 0u32;
    loop {
        // A panicking surface or sprite must not take the thread down with
        // the scene in it
        let pause = match panic::catch_unwind(AssertUnwindSafe(|| stage.tick(params, sprites))) {
            Ok(report) => {
                failures = 0;
                if report.power_changed {
                    log::debug!("Power mode changed, restarting frame pacing");
                    Duration::ZERO
                } else {
                    Duration::from_millis(report.frame_interval_ms as u64)
                }
            }
            Err(_) => {
                failures += 1;
                log::error!("Tick failed ({} in a row)", failures);
                if failures >= max_failures {
                    log::error!("Giving up after {} failed ticks", failures);
                    break;
                }
                fallback
            }
        };

        if !wait(&mut stage, &commands, pause, params) {
            break;
        }
    }
    stage
}

/// Sleep until the next tick, applying resizes as they arrive. Returns
/// `false` once the loop should exit.
fn wait<Sf, P>(
    stage: &mut Stage<Sf>,
    commands: &Receiver<Command>,
    pause: Duration,
    params: &P,
) -> bool
where
    Sf: Surface,
    P: ParameterStore + ?Sized,
{
    let deadline = Instant::now() + pause;
    loop {
        let timeout = deadline.saturating_duration_since(Instant::now());
        match commands.recv_timeout(timeout) {
            Ok(Command::Resize(viewport)) => {
                let resized =
                    panic::catch_unwind(AssertUnwindSafe(|| stage.resize(viewport, params)));
                if resized.is_err() {
                    log::error!("Resize to {}x{} failed", viewport.width, viewport.height);
                }
            }
            Ok(Command::Stop) | Err(RecvTimeoutError::Disconnected) => return false,
            Err(RecvTimeoutError::Timeout) => return true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::Framebuffer;
    use crate::settings::Settings;
    use crate::sprite::Bitmap;
    use embedded_graphics::pixelcolor::{Rgb565, RgbColor};

    type Flake = Bitmap<Vec<Rgb565>>;

    fn engine() -> Engine<Framebuffer, Settings, Flake> {
        let flake = Bitmap::new(2, 2, vec![Rgb565::WHITE; 4]).unwrap();
        let sprites = SpriteSet::new(None, vec![Some(flake)]);
        let options = EngineOptions {
            seed: Some(3),
            ..EngineOptions::default()
        };
        Engine::new(options, Framebuffer::new(64, 64), Arc::new(Settings::default()), sprites)
    }

    #[test]
    fn test_stop_when_not_running_is_noop() {
        let mut engine = engine();
        engine.stop();
        engine.stop();
        assert!(!engine.is_running());
        assert!(engine.simulation().is_some());
    }

    #[test]
    fn test_surface_ready_seeds_scene() {
        let mut engine = engine();
        engine.on_surface_ready(64, 64);
        let sim = engine.simulation().unwrap();
        assert_eq!(sim.viewport(), Viewport::new(64, 64));
        assert_eq!(sim.field().len(), 200);
        assert_eq!(sim.decor().len(), 12);
    }

    #[test]
    fn test_visibility_toggles_loop() {
        let mut engine = engine();
        engine.on_surface_ready(64, 64);
        engine.on_visibility_changed(true).unwrap();
        assert!(engine.is_running());
        assert!(engine.simulation().is_none());

        thread::sleep(Duration::from_millis(50));
        engine.on_visibility_changed(false).unwrap();
        assert!(!engine.is_running());
        assert!(engine.simulation().is_some());
    }

    #[test]
    fn test_loop_draws_into_surface() {
        let mut engine = engine();
        engine.on_surface_ready(64, 64);
        engine.start().unwrap();
        thread::sleep(Duration::from_millis(80));
        engine.stop();
        let fb = engine.surface().unwrap();
        assert!(fb.pixels().iter().any(|&c| c == Rgb565::WHITE));
    }

    #[test]
    fn test_resize_while_running_reaches_loop() {
        let mut engine = engine();
        engine.on_surface_ready(64, 64);
        engine.start().unwrap();
        engine.on_surface_resized(32, 48);
        thread::sleep(Duration::from_millis(50));
        engine.stop();
        assert_eq!(engine.simulation().unwrap().viewport(), Viewport::new(32, 48));
    }

    /// Settings source that panics on demand.
    #[derive(Default)]
    struct FlakyParams {
        broken: std::sync::atomic::AtomicBool,
    }

    impl ParameterStore for FlakyParams {
        fn settings(&self) -> Settings {
            if self.broken.load(std::sync::atomic::Ordering::SeqCst) {
                panic!("settings unavailable");
            }
            Settings::default()
        }
    }

    #[test]
    fn test_failed_resize_keeps_scene() {
        use std::sync::atomic::Ordering;

        let params = Arc::new(FlakyParams::default());
        let flake = Bitmap::new(2, 2, vec![Rgb565::WHITE; 4]).unwrap();
        let options = EngineOptions {
            seed: Some(8),
            max_consecutive_failures: 2,
            ..EngineOptions::default()
        };
        let mut engine: Engine<Framebuffer, FlakyParams, Flake> = Engine::new(
            options,
            Framebuffer::new(64, 64),
            Arc::clone(&params),
            SpriteSet::new(None, vec![Some(flake)]),
        );
        engine.on_surface_ready(64, 64);
        engine.start().unwrap();

        params.broken.store(true, Ordering::SeqCst);
        engine.on_surface_resized(32, 32);
        let deadline = Instant::now() + Duration::from_secs(2);
        while engine.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!engine.is_running());

        params.broken.store(false, Ordering::SeqCst);
        engine.start().unwrap();
        engine.stop();
        let sim = engine.simulation().unwrap();
        assert_eq!(sim.viewport(), Viewport::new(64, 64));
        assert_eq!(sim.field().len(), 200);
    }

    #[test]
    fn test_destroy_prevents_restart() {
        let mut engine = engine();
        engine.on_surface_ready(64, 64);
        engine.on_visibility_changed(true).unwrap();
        engine.on_destroy();
        assert!(!engine.is_running());
        assert!(engine.simulation().is_none());
        assert!(matches!(engine.start(), Err(EngineError::Destroyed)));
    }
}
