//! snowfall - Animated snow over a field of trees
//!
//! The simulation core (particles, gusts, decor, power policy, compositor)
//! is no_std compatible and allocates nothing: pools are fixed-size and
//! drawing goes through embedded-graphics. The `std` feature adds the
//! threaded render loop with host lifecycle hooks, layered configuration and
//! an in-memory frame buffer.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod canvas;
pub mod compositor;
pub mod decor;
pub mod gust;
pub mod particles;
pub mod power;
pub mod settings;
pub mod simulation;
pub mod sprite;
pub mod viewport;

#[cfg(feature = "std")]
pub mod config;
#[cfg(feature = "std")]
pub mod engine;
#[cfg(feature = "std")]
pub mod error;
#[cfg(feature = "std")]
pub mod framebuffer;
#[cfg(feature = "std")]
pub mod params;

pub use canvas::{Canvas, DrawTargetCanvas, Surface};
pub use compositor::{Compositor, FrameStats};
pub use decor::{DecorItem, DecorLayer};
pub use gust::{GustController, GustPhase, GustTiming};
pub use particles::{FieldStep, Particle, ParticleField, StepReport};
pub use power::{PowerPolicy, Quality};
pub use settings::Settings;
pub use simulation::{RenderOutcome, Simulation, SimulationConfig, TickReport};
pub use sprite::{Bitmap, Sprite, SpriteError};
pub use viewport::Viewport;

#[cfg(feature = "std")]
pub use config::{ConfigError, SnowConfig};
#[cfg(feature = "std")]
pub use engine::{Engine, EngineOptions, SpriteSet};
#[cfg(feature = "std")]
pub use error::EngineError;
#[cfg(feature = "std")]
pub use framebuffer::Framebuffer;
#[cfg(feature = "std")]
pub use params::{ParameterStore, SharedParameters};
