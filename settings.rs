//! Live-tunable user settings
//!
//! The host owns persistence; the core only sees a snapshot per tick and
//! clamps whatever it is handed.

#[cfg(feature = "std")]
use serde::{Deserialize, Serialize};

pub const MAX_TREE_COUNT: i32 = 36;
pub const MIN_SNOW_SPEED: i32 = 1;
pub const MAX_SNOW_SPEED: i32 = 40;
pub const MIN_WIND_LEVEL: i32 = 1;
pub const MAX_WIND_LEVEL: i32 = 60;
pub const MAX_WIND_CHANCE: i32 = 100;

/// One snapshot of the user-facing settings.
///
/// Fields are raw integers as a settings screen would store them. Use
/// [`Settings::sanitized`] or the typed accessors before feeding them to the
/// simulation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "std", serde(default))]
pub struct Settings {
    pub tree_count: i32,
    pub snow_speed: i32,
    pub wind_level: i32,
    pub wind_chance_percent: i32,
    /// User-forced power saving, OR-ed with the OS signal.
    pub power_save_mode: bool,
    /// Slow the frame rate down while power saving.
    pub adaptive_frame_rate: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tree_count: 12,
            snow_speed: 12,
            wind_level: 5,
            wind_chance_percent: 20,
            power_save_mode: false,
            adaptive_frame_rate: true,
        }
    }
}

impl Settings {
    /// Copy with every numeric field clamped to its valid range.
    pub fn sanitized(&self) -> Self {
        Self {
            tree_count: self.tree_count.clamp(0, MAX_TREE_COUNT),
            snow_speed: self.snow_speed.clamp(MIN_SNOW_SPEED, MAX_SNOW_SPEED),
            wind_level: self.wind_level.clamp(MIN_WIND_LEVEL, MAX_WIND_LEVEL),
            wind_chance_percent: self.wind_chance_percent.clamp(0, MAX_WIND_CHANCE),
            ..*self
        }
    }

    pub fn tree_count(&self) -> usize {
        self.tree_count.clamp(0, MAX_TREE_COUNT) as usize
    }

    /// Lower bound of the fall speed band for new particles.
    pub fn speed_level(&self) -> f32 {
        self.snow_speed.clamp(MIN_SNOW_SPEED, MAX_SNOW_SPEED) as f32
    }

    pub fn wind_level(&self) -> f32 {
        self.wind_level.clamp(MIN_WIND_LEVEL, MAX_WIND_LEVEL) as f32
    }

    /// Gust chance as a fraction in `[0, 1]`.
    pub fn wind_chance(&self) -> f32 {
        self.wind_chance_percent.clamp(0, MAX_WIND_CHANCE) as f32 / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_settings_screen() {
        let s = Settings::default();
        assert_eq!(s.tree_count, 12);
        assert_eq!(s.snow_speed, 12);
        assert_eq!(s.wind_level, 5);
        assert_eq!(s.wind_chance_percent, 20);
        assert!(!s.power_save_mode);
        assert!(s.adaptive_frame_rate);
    }

    #[test]
    fn test_out_of_range_values_clamp() {
        let s = Settings {
            tree_count: -4,
            snow_speed: 0,
            wind_level: -10,
            wind_chance_percent: 250,
            ..Settings::default()
        };
        let clamped = s.sanitized();
        assert_eq!(clamped.tree_count, 0);
        assert_eq!(clamped.snow_speed, 1);
        assert_eq!(clamped.wind_level, 1);
        assert_eq!(clamped.wind_chance_percent, 100);

        assert_eq!(s.tree_count(), 0);
        assert_eq!(s.speed_level(), 1.0);
        assert_eq!(s.wind_chance(), 1.0);
    }

    #[test]
    fn test_upper_bounds_clamp() {
        let s = Settings {
            tree_count: 500,
            snow_speed: 99,
            wind_level: 99,
            ..Settings::default()
        };
        assert_eq!(s.tree_count(), 36);
        assert_eq!(s.speed_level(), 40.0);
        assert_eq!(s.wind_level(), 60.0);
    }

    #[test]
    fn test_wind_chance_is_fraction() {
        let s = Settings {
            wind_chance_percent: 20,
            ..Settings::default()
        };
        assert!((s.wind_chance() - 0.2).abs() < f32::EPSILON);
    }
}
