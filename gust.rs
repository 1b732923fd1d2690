//! Wind gusts
//!
//! A gust ramps in, holds, then ramps out. Only one gust runs at a time and
//! its force is applied to every particle alike.

use rand::Rng;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum GustPhase {
    #[default]
    Idle,
    PhaseIn,
    Active,
    PhaseOut,
}

/// Phase lengths in ticks and the peak strength relative to the wind level.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GustTiming {
    pub phase_in_ticks: u32,
    pub active_ticks: u32,
    pub phase_out_ticks: u32,
    /// Peak intensity is `wind_level * peak_factor`.
    pub peak_factor: f32,
}

impl Default for GustTiming {
    fn default() -> Self {
        Self {
            phase_in_ticks: 60,
            active_ticks: 180,
            phase_out_ticks: 90,
            peak_factor: 2.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GustController {
    timing: GustTiming,
    phase: GustPhase,
    /// +1.0 blows right, -1.0 blows left
    direction: f32,
    intensity: f32,
    elapsed: u32,
}

impl GustController {
    pub fn new(timing: GustTiming) -> Self {
        Self {
            timing,
            phase: GustPhase::Idle,
            direction: 1.0,
            intensity: 0.0,
            elapsed: 0,
        }
    }

    pub fn phase(&self) -> GustPhase {
        self.phase
    }

    pub fn direction(&self) -> f32 {
        self.direction
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    pub fn is_idle(&self) -> bool {
        self.phase == GustPhase::Idle
    }

    /// Horizontal displacement for this tick.
    pub fn force(&self) -> f32 {
        match self.phase {
            GustPhase::Idle => 0.0,
            _ => self.direction * self.intensity,
        }
    }

    /// Run one tick of the state machine and return the resulting force.
    ///
    /// `trigger_probability` is the per-tick chance of starting a gust while
    /// idle.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        wind_level: f32,
        trigger_probability: f32,
    ) -> f32 {
        let peak = wind_level.max(0.0) * self.timing.peak_factor;

        if self.phase == GustPhase::Idle && rng.gen::<f32>() < trigger_probability {
            self.direction = if rng.gen::<bool>() { 1.0 } else { -1.0 };
            self.begin(GustPhase::PhaseIn);
            self.intensity = 0.0;
            log::debug!("Gust starting, direction {:+}", self.direction);
        }

        match self.phase {
            GustPhase::Idle => {}
            GustPhase::PhaseIn => {
                self.elapsed += 1;
                self.intensity = peak * progress(self.elapsed, self.timing.phase_in_ticks);
                if self.elapsed >= self.timing.phase_in_ticks {
                    self.intensity = peak;
                    self.begin(GustPhase::Active);
                }
            }
            GustPhase::Active => {
                self.elapsed += 1;
                self.intensity = peak;
                if self.elapsed >= self.timing.active_ticks {
                    self.begin(GustPhase::PhaseOut);
                }
            }
            GustPhase::PhaseOut => {
                self.elapsed += 1;
                self.intensity =
                    peak * (1.0 - progress(self.elapsed, self.timing.phase_out_ticks));
                if self.elapsed >= self.timing.phase_out_ticks || self.intensity <= 0.0 {
                    self.reset();
                    log::debug!("Gust finished");
                }
            }
        }

        self.force()
    }

    /// Drop any running gust.
    pub fn reset(&mut self) {
        self.phase = GustPhase::Idle;
        self.intensity = 0.0;
        self.elapsed = 0;
    }

    fn begin(&mut self, phase: GustPhase) {
        self.phase = phase;
        self.elapsed = 0;
    }
}

impl Default for GustController {
    fn default() -> Self {
        Self::new(GustTiming::default())
    }
}

/// Fraction of a phase completed, 1.0 for zero-length phases.
fn progress(elapsed: u32, duration: u32) -> f32 {
    if duration == 0 {
        1.0
    } else {
        (elapsed as f32 / duration as f32).min(1.0)
    }
}
