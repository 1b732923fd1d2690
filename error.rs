//! Engine error types

use std::fmt;
use std::io;

use crate::config::ConfigError;

#[derive(Debug)]
pub enum EngineError {
    /// Configuration could not be loaded
    Config(ConfigError),
    /// The render loop thread could not be spawned
    Spawn(io::Error),
    /// `on_destroy` already released the surface
    Destroyed,
    /// The loop thread died with the scene and surface in it
    SceneLost,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Config(err) => write!(f, "{}", err),
            EngineError::Spawn(err) => write!(f, "Failed to spawn render loop: {}", err),
            EngineError::Destroyed => write!(f, "Engine has been destroyed"),
            EngineError::SceneLost => write!(f, "Render loop died and took the scene with it"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Config(err) => Some(err),
            EngineError::Spawn(err) => Some(err),
            EngineError::Destroyed | EngineError::SceneLost => None,
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        EngineError::Config(err)
    }
}
