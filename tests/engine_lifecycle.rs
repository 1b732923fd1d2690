//! Integration tests for the render loop lifecycle
//!
//! These tests drive an engine the way a host would and watch the surface:
//! 1. Repeated starts never leave two loops ticking
//! 2. A failing surface stops the loop without losing the scene
//! 3. Power mode changes take effect on the running loop

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use embedded_graphics::pixelcolor::{Rgb565, RgbColor};
use snowfall::{
    Bitmap, DrawTargetCanvas, Engine, EngineOptions, Framebuffer, SharedParameters, Settings,
    SpriteSet, Surface,
};

type Flake = Bitmap<Vec<Rgb565>>;

/// Frame buffer that counts acquisitions and can be told to blow up.
struct CountingSurface {
    frame: Framebuffer,
    acquired: Arc<AtomicUsize>,
    explode: Arc<AtomicBool>,
}

impl Surface for CountingSurface {
    type Target<'a> = DrawTargetCanvas<&'a mut Framebuffer>;

    fn acquire(&mut self) -> Option<Self::Target<'_>> {
        if self.explode.load(Ordering::SeqCst) {
            panic!("surface lost");
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Some(DrawTargetCanvas::new(&mut self.frame))
    }
}

struct Harness {
    engine: Engine<CountingSurface, SharedParameters, Flake>,
    params: Arc<SharedParameters>,
    acquired: Arc<AtomicUsize>,
    explode: Arc<AtomicBool>,
}

fn harness() -> Harness {
    let acquired = Arc::new(AtomicUsize::new(0));
    let explode = Arc::new(AtomicBool::new(false));
    let surface = CountingSurface {
        frame: Framebuffer::new(120, 160),
        acquired: Arc::clone(&acquired),
        explode: Arc::clone(&explode),
    };
    let params = Arc::new(SharedParameters::new(Settings::default()));
    let flake = Bitmap::new(2, 2, vec![Rgb565::WHITE; 4]).unwrap();
    let options = EngineOptions {
        seed: Some(42),
        max_consecutive_failures: 3,
        ..EngineOptions::default()
    };
    let mut engine = Engine::new(
        options,
        surface,
        Arc::clone(&params),
        SpriteSet::new(None, vec![Some(flake)]),
    );
    engine.on_surface_ready(120, 160);
    Harness {
        engine,
        params,
        acquired,
        explode,
    }
}

fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    done()
}

// ==================== Loop Uniqueness ====================

#[test]
fn test_double_start_runs_one_loop() {
    let mut h = harness();
    h.engine.start().unwrap();
    h.engine.start().unwrap();
    assert!(h.engine.is_running());

    h.acquired.store(0, Ordering::SeqCst);
    let started = Instant::now();
    thread::sleep(Duration::from_millis(320));
    h.engine.stop();
    let elapsed = started.elapsed().as_millis() as usize;

    // One loop at 16 ms per tick; two would roughly double this
    let ticks = h.acquired.load(Ordering::SeqCst);
    assert!(ticks > 0);
    assert!(ticks <= elapsed / 16 + 3, "{} ticks in {} ms", ticks, elapsed);
}

#[test]
fn test_visible_twice_then_hidden() {
    let mut h = harness();
    h.engine.on_visibility_changed(true).unwrap();
    h.engine.on_visibility_changed(true).unwrap();
    h.engine.on_visibility_changed(false).unwrap();
    assert!(!h.engine.is_running());

    let frozen = h.acquired.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(60));
    assert_eq!(h.acquired.load(Ordering::SeqCst), frozen);
}

#[test]
fn test_stop_without_start() {
    let mut h = harness();
    h.engine.stop();
    assert!(!h.engine.is_running());
    assert_eq!(h.acquired.load(Ordering::SeqCst), 0);
}

// ==================== Failure Handling ====================

#[test]
fn test_failing_surface_stops_loop_and_restart_recovers() {
    let mut h = harness();
    h.explode.store(true, Ordering::SeqCst);
    h.engine.start().unwrap();

    assert!(wait_until(Duration::from_secs(2), || !h.engine.is_running()));

    h.explode.store(false, Ordering::SeqCst);
    h.engine.start().unwrap();
    assert!(wait_until(Duration::from_secs(2), || h.acquired.load(Ordering::SeqCst) > 2));
    h.engine.stop();

    // The scene survived the failures
    let sim = h.engine.simulation().unwrap();
    assert_eq!(sim.field().len(), 200);
}

// ==================== Power Saving ====================

#[test]
fn test_power_save_slows_the_loop() {
    let mut h = harness();
    h.params.update(|s| s.power_save_mode = true);
    h.engine.start().unwrap();
    thread::sleep(Duration::from_millis(30));

    h.acquired.store(0, Ordering::SeqCst);
    let started = Instant::now();
    thread::sleep(Duration::from_millis(300));
    h.engine.stop();
    let elapsed = started.elapsed().as_millis() as usize;

    let ticks = h.acquired.load(Ordering::SeqCst);
    assert!(ticks <= elapsed / 50 + 3, "{} ticks in {} ms", ticks, elapsed);

    let sim = h.engine.simulation().unwrap();
    assert!(sim.quality().power_save);
    assert_eq!(sim.quality().frame_interval_ms, 50);
}

#[test]
fn test_os_signal_reaches_running_loop() {
    let mut h = harness();
    h.engine.start().unwrap();
    h.params.set_os_power_save(true);
    thread::sleep(Duration::from_millis(120));
    h.engine.stop();

    let sim = h.engine.simulation().unwrap();
    assert!(sim.quality().power_save);
    assert_eq!(sim.quality().capacity, 100);
}
