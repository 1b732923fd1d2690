//! Engine configuration
//!
//! Configuration is loaded from multiple sources with the following priority (lowest to highest):
//! 1. `config/default.toml` (version controlled)
//! 2. `config/user.toml` (gitignored, user overrides)
//! 3. Environment variables (`XSNOW_SECTION__KEY`)

use embedded_graphics::pixelcolor::Rgb565;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::engine::EngineOptions;
use crate::gust::GustTiming;
use crate::power::PowerPolicy;
use crate::settings::Settings;
use crate::simulation::SimulationConfig;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnowConfig {
    /// Particle field configuration
    #[serde(default)]
    pub simulation: SimulationSection,
    /// Gust timing
    #[serde(default)]
    pub gust: GustSection,
    /// Power saving and loop pacing
    #[serde(default)]
    pub power: PowerSection,
    /// Drawing and window
    #[serde(default)]
    pub render: RenderSection,
    /// Initial user settings
    #[serde(default)]
    pub settings: Settings,
    /// Logging
    #[serde(default)]
    pub logging: LoggingSection,
}

impl SnowConfig {
    /// Load configuration from default locations
    ///
    /// Priority (lowest to highest):
    /// 1. `config/default.toml`
    /// 2. `config/user.toml`
    /// 3. Environment variables (`XSNOW_*`)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific config directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        let default_path = config_dir.join("default.toml");
        let user_path = config_dir.join("user.toml");

        let mut figment = Figment::new();

        if default_path.exists() {
            figment = figment.merge(Toml::file(&default_path));
        }

        if user_path.exists() {
            figment = figment.merge(Toml::file(&user_path));
        }

        // XSNOW_GUST__ACTIVE_TICKS=240 -> gust.active_ticks = 240
        figment = figment.merge(Env::prefixed("XSNOW_").split("__"));

        figment.extract().map_err(ConfigError::from)
    }

    /// Tuning for the simulation core.
    pub fn simulation_config(&self) -> SimulationConfig {
        SimulationConfig {
            policy: PowerPolicy {
                base_capacity: self.simulation.capacity,
                base_spawn_rate: self.simulation.spawn_rate,
                normal_interval_ms: self.power.normal_interval_ms,
                low_power_interval_ms: self.power.low_power_interval_ms,
                spawn_reduction: self.power.spawn_reduction,
                extra_spawn_reduction: self.power.extra_spawn_reduction,
                min_particle_subset: self.power.min_particle_subset,
                min_tree_subset: self.power.min_tree_subset,
            },
            gust: GustTiming {
                phase_in_ticks: self.gust.phase_in_ticks,
                active_ticks: self.gust.active_ticks,
                phase_out_ticks: self.gust.phase_out_ticks,
                peak_factor: self.gust.peak_factor,
            },
            gust_trigger_scale: self.gust.trigger_scale,
            background: self.render.background_color(),
        }
    }

    /// Options for [`crate::engine::Engine`].
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            simulation: self.simulation_config(),
            seed: self.simulation.seed,
            max_consecutive_failures: self.power.max_consecutive_failures,
        }
    }
}

/// Particle field configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSection {
    /// Particle capacity at full quality
    pub capacity: usize,
    /// Chance per tick of spawning a particle while below capacity
    pub spawn_rate: f32,
    /// Fixed RNG seed; random when absent
    pub seed: Option<u64>,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            capacity: 200,
            spawn_rate: 0.1,
            seed: None,
        }
    }
}

/// Gust timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GustSection {
    pub phase_in_ticks: u32,
    pub active_ticks: u32,
    pub phase_out_ticks: u32,
    /// Peak force is `wind_level * peak_factor`
    pub peak_factor: f32,
    /// Scales the user's gust chance into a per-tick probability
    pub trigger_scale: f32,
}

impl Default for GustSection {
    fn default() -> Self {
        let timing = GustTiming::default();
        Self {
            phase_in_ticks: timing.phase_in_ticks,
            active_ticks: timing.active_ticks,
            phase_out_ticks: timing.phase_out_ticks,
            peak_factor: timing.peak_factor,
            trigger_scale: 1.0,
        }
    }
}

/// Power saving and loop pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerSection {
    /// Frame interval at full quality
    pub normal_interval_ms: u32,
    /// Frame interval while power saving with adaptive frame rate on
    pub low_power_interval_ms: u32,
    pub spawn_reduction: f32,
    pub extra_spawn_reduction: f32,
    pub min_particle_subset: usize,
    pub min_tree_subset: usize,
    /// Failed ticks in a row before the loop gives up
    pub max_consecutive_failures: u32,
}

impl Default for PowerSection {
    fn default() -> Self {
        let policy = PowerPolicy::default();
        Self {
            normal_interval_ms: policy.normal_interval_ms,
            low_power_interval_ms: policy.low_power_interval_ms,
            spawn_reduction: policy.spawn_reduction,
            extra_spawn_reduction: policy.extra_spawn_reduction,
            min_particle_subset: policy.min_particle_subset,
            min_tree_subset: policy.min_tree_subset,
            max_consecutive_failures: 5,
        }
    }
}

/// Drawing and window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSection {
    /// Background color [r, g, b], 8 bits per channel
    pub background: [u8; 3],
    /// Simulator window width in pixels
    pub width: u32,
    /// Simulator window height in pixels
    pub height: u32,
    /// Simulator pixel scale
    pub scale: u32,
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            background: [0, 0, 0],
            width: 360,
            height: 640,
            scale: 1,
        }
    }
}

impl RenderSection {
    pub fn background_color(&self) -> Rgb565 {
        let [r, g, b] = self.background;
        Rgb565::new(r >> 3, g >> 2, b >> 3)
    }
}

/// Logging
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration error
#[derive(Debug)]
pub struct ConfigError {
    message: String,
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError {
            message: e.to_string(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::pixelcolor::RgbColor;

    #[test]
    fn test_default_config() {
        let config = SnowConfig::default();
        assert_eq!(config.simulation.capacity, 200);
        assert_eq!(config.gust.active_ticks, 180);
        assert_eq!(config.power.low_power_interval_ms, 50);
        assert_eq!(config.settings.tree_count, 12);
    }

    #[test]
    fn test_defaults_agree_with_core() {
        let config = SnowConfig::default();
        let sim = config.simulation_config();
        assert_eq!(sim.policy, PowerPolicy::default());
        assert_eq!(sim.gust, GustTiming::default());
        assert_eq!(sim.gust_trigger_scale, SimulationConfig::default().gust_trigger_scale);
        assert_eq!(sim.background, Rgb565::BLACK);
    }

    #[test]
    fn test_background_color_conversion() {
        let render = RenderSection {
            background: [255, 255, 255],
            ..RenderSection::default()
        };
        assert_eq!(render.background_color(), Rgb565::WHITE);
    }

    #[test]
    fn test_config_serialization() {
        let config = SnowConfig::default();
        let toml = toml::to_string(&config).unwrap();
        assert!(toml.contains("phase_in_ticks"));
        assert!(toml.contains("wind_chance_percent"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: SnowConfig = Figment::new()
            .merge(Toml::string("[gust]\nactive_ticks = 240\n"))
            .extract()
            .unwrap();
        assert_eq!(config.gust.active_ticks, 240);
        assert_eq!(config.gust.phase_in_ticks, 60);
        assert_eq!(config.simulation.capacity, 200);
    }
}
