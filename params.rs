//! Parameter sources polled by the render loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::settings::Settings;

/// Read-only view of the live settings, polled once per tick.
pub trait ParameterStore: Send + Sync {
    fn settings(&self) -> Settings;

    /// Power saving reported by the operating system.
    fn os_power_save(&self) -> bool {
        false
    }
}

/// A fixed snapshot never changes.
impl ParameterStore for Settings {
    fn settings(&self) -> Settings {
        *self
    }
}

/// Settings shared between the host (writer) and the render loop (reader).
#[derive(Debug, Default)]
pub struct SharedParameters {
    settings: RwLock<Settings>,
    os_power_save: AtomicBool,
}

impl SharedParameters {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(settings),
            os_power_save: AtomicBool::new(false),
        }
    }

    pub fn set(&self, settings: Settings) {
        self.update(|s| *s = settings);
    }

    /// Edit the settings in place and return the new snapshot.
    pub fn update<F: FnOnce(&mut Settings)>(&self, f: F) -> Settings {
        let mut guard = self
            .settings
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut *guard);
        *guard
    }

    pub fn set_os_power_save(&self, enabled: bool) {
        self.os_power_save.store(enabled, Ordering::Relaxed);
    }
}

impl ParameterStore for SharedParameters {
    fn settings(&self) -> Settings {
        *self
            .settings
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn os_power_save(&self) -> bool {
        self.os_power_save.load(Ordering::Relaxed)
    }
}
