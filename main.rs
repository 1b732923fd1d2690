//! main.rs - Desktop simulator for the snowfall scene
//! Hosts the engine in a window, draws procedural sprites, maps keys to settings

use embedded_graphics::{pixelcolor::Rgb565, prelude::*};
use embedded_graphics_simulator::{
    OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window,
};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use snowfall::settings::{
    MAX_SNOW_SPEED, MAX_TREE_COUNT, MAX_WIND_CHANCE, MAX_WIND_LEVEL, MIN_SNOW_SPEED, MIN_WIND_LEVEL,
};
use snowfall::{
    Bitmap, DrawTargetCanvas, Engine, EngineError, ParameterStore, SharedParameters, SnowConfig,
    SpriteSet, Surface,
};

type Image = Bitmap<Vec<Rgb565>>;
type Display = SimulatorDisplay<Rgb565>;

const FLAKE_VARIANTS: u32 = 7;

/// The simulator display, shared between the render loop (drawing) and the
/// window thread (presenting).
#[derive(Clone)]
struct WindowSurface(Arc<Mutex<Display>>);

impl Surface for WindowSurface {
    type Target<'a> = DrawTargetCanvas<MutexGuard<'a, Display>>;

    fn acquire(&mut self) -> Option<Self::Target<'_>> {
        // A poisoned lock means the presenter died; skip the frame
        self.0.lock().ok().map(DrawTargetCanvas::new)
    }
}

fn tree_sprite() -> Option<Image> {
    let (width, height) = (24u32, 32u32);
    let leaves = Rgb565::new(2, 40, 6);
    let snow = Rgb565::new(28, 58, 30);
    let trunk = Rgb565::new(12, 20, 4);

    let sprite = Bitmap::from_fn(width, height, |x, y| {
        let cx = (width / 2) as i32;
        if y >= height - 6 {
            return ((x as i32 - cx).abs() <= 2).then_some(trunk);
        }
        // Three stacked triangles
        let tier = y % 9;
        let half = 3 + (y / 9) as i32 * 3 + tier as i32;
        let dx = (x as i32 - cx).abs();
        if dx > half {
            None
        } else if tier == 0 {
            Some(snow)
        } else {
            Some(leaves)
        }
    });
    sprite.map_err(|e| log::warn!("Tree sprite unavailable: {}", e)).ok()
}

fn flake_sprite(variant: u32) -> Option<Image> {
    let size = 5 + variant * 2;
    let c = (size / 2) as i32;
    let white = Rgb565::WHITE;
    let pale = Rgb565::new(24, 56, 31);

    let sprite = Bitmap::from_fn(size, size, |x, y| {
        let (dx, dy) = (x as i32 - c, y as i32 - c);
        let on_axis = dx == 0 || dy == 0;
        let on_diagonal = dx.abs() == dy.abs();
        match variant % 3 {
            // Plus
            0 => on_axis.then_some(white),
            // Star
            1 => (on_axis || on_diagonal).then_some(if dx == 0 || dy == 0 { white } else { pale }),
            // Soft dot
            _ => (dx * dx + dy * dy <= c * c).then_some(if dx * dx + dy * dy <= c { white } else { pale }),
        }
    });
    sprite
        .map_err(|e| log::warn!("Snowflake variant {} unavailable: {}", variant, e))
        .ok()
}

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Apply a key to the shared settings. Returns `false` for unknown keys.
fn adjust(params: &SharedParameters, key: &str) -> bool {
    let updated = match key {
        // T - trees
        "t" => params.update(|s| {
            s.tree_count = if s.tree_count >= MAX_TREE_COUNT { 0 } else { s.tree_count + 3 };
        }),
        // Up / Down - fall speed
        "up" => params.update(|s| s.snow_speed = (s.snow_speed + 1).min(MAX_SNOW_SPEED)),
        "down" => params.update(|s| s.snow_speed = (s.snow_speed - 1).max(MIN_SNOW_SPEED)),
        // W - wind
        "w" => params.update(|s| {
            s.wind_level = if s.wind_level >= MAX_WIND_LEVEL { MIN_WIND_LEVEL } else { s.wind_level + 5 };
        }),
        // C - gust chance
        "c" => params.update(|s| {
            s.wind_chance_percent = if s.wind_chance_percent >= MAX_WIND_CHANCE {
                0
            } else {
                s.wind_chance_percent + 10
            };
        }),
        // P - user power save
        "p" => params.update(|s| s.power_save_mode = !s.power_save_mode),
        // A - adaptive frame rate
        "a" => params.update(|s| s.adaptive_frame_rate = !s.adaptive_frame_rate),
        // O - pretend the OS went into battery saver
        "o" => {
            params.set_os_power_save(!params.os_power_save());
            log::info!("OS power save: {}", params.os_power_save());
            return true;
        }
        _ => return false,
    };
    log::info!(
        "Trees {} | speed {} | wind {} | chance {}% | power save {} | adaptive {}",
        updated.tree_count,
        updated.snow_speed,
        updated.wind_level,
        updated.wind_chance_percent,
        updated.power_save_mode,
        updated.adaptive_frame_rate
    );
    true
}

fn main() {
    if let Err(e) = run() {
        eprintln!("snowfall: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), EngineError> {
    // Missing files fall back to defaults; a malformed one is fatal
    let config = SnowConfig::load()?;
    init_logging(&config.logging.level);

    let (width, height) = (config.render.width, config.render.height);
    let display = Arc::new(Mutex::new(Display::new(Size::new(width, height))));
    let output_settings = OutputSettingsBuilder::new()
        .scale(config.render.scale.max(1))
        .build();
    let mut window = Window::new("Snowfall", &output_settings);

    let params = Arc::new(SharedParameters::new(config.settings.sanitized()));
    let sprites: SpriteSet<Image> = SpriteSet::new(
        tree_sprite(),
        (0..FLAKE_VARIANTS).map(flake_sprite).collect(),
    );

    let mut engine = Engine::new(
        config.engine_options(),
        WindowSurface(Arc::clone(&display)),
        Arc::clone(&params),
        sprites,
    );
    engine.on_surface_ready(width, height);
    engine.on_visibility_changed(true)?;

    log::info!("Controls:");
    log::info!("  T: Trees  Up/Down: Speed  W: Wind  C: Gust chance");
    log::info!("  P: Power save  A: Adaptive frame rate  O: OS power save");
    log::info!("  V: Pause/resume  R: Reseed  Q: Quit");

    let frame_duration = Duration::from_millis(16);

    'main_loop: loop {
        let now = Instant::now();

        // Present whatever the loop drew last
        match display.lock() {
            Ok(frame) => window.update(&*frame),
            Err(_) => {
                log::error!("Display lock poisoned");
                break 'main_loop;
            }
        }

        for event in window.events() {
            match event {
                SimulatorEvent::Quit => break 'main_loop,
                SimulatorEvent::KeyDown { keycode, .. } => {
                    let key = format!("{:?}", keycode).to_lowercase();
                    match key.as_str() {
                        // V - visibility, as if the host went to the background
                        "v" => {
                            let visible = !engine.is_visible();
                            if let Err(e) = engine.on_visibility_changed(visible) {
                                log::error!("{}", e);
                            }
                        }
                        // R - reseed for the same bounds
                        "r" => engine.on_surface_resized(width, height),
                        // Q - quit
                        "q" => break 'main_loop,
                        other => {
                            if !adjust(&params, other) {
                                log::debug!("Unmapped key: {}", other);
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        if engine.is_visible() && !engine.is_running() {
            log::warn!("Render loop exited, restarting");
            if let Err(e) = engine.start() {
                log::error!("{}", e);
                break 'main_loop;
            }
        }

        let elapsed = now.elapsed();
        if elapsed < frame_duration {
            thread::sleep(frame_duration - elapsed);
        }
    }

    engine.on_destroy();
    log::info!("Goodbye");
    Ok(())
}
