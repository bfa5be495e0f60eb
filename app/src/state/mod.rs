pub mod config;
mod wheel;

pub use wheel::{WheelState, WheelStateWriter};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::actors::Actor;
use config::SystemConfig;

/// Root entry point for all managed application state.
///
/// Passed as `Arc<SystemState>` to all actors and the web layer.
pub struct SystemState {
    pub system: SystemConfig,
    pub wheel: WheelState,
    actors: RwLock<HashMap<String, (Box<dyn Actor>, Arc<AtomicBool>)>>,
}

impl SystemState {
    /// Load config and seed the wheel with its persisted mode and filters.
    pub fn new(config_path: PathBuf) -> (Self, WheelStateWriter) {
        let system = SystemConfig::new(config_path);
        let snap = system.snapshot();
        let (wheel, writer) = WheelState::new(snap.wheel.mode, snap.wheel.settings);
        (
            Self {
                system,
                wheel,
                actors: RwLock::new(HashMap::new()),
            },
            writer,
        )
    }

    // ----- Actor registry -----

    /// Register an actor in the registry with its shutdown flag.
    pub fn register_actor(&self, id: String, actor: Box<dyn Actor>, shutdown: Arc<AtomicBool>) {
        self.actors
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, (actor, shutdown));
    }

    /// Get the list of all registered actor IDs.
    pub fn actor_ids(&self) -> Vec<String> {
        self.actors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    /// Stop an actor by setting its shutdown flag and calling `stop()`.
    pub fn stop_actor(&self, id: &str) {
        let guard = self.actors.read().unwrap_or_else(|e| e.into_inner());
        if let Some((actor, shutdown)) = guard.get(id) {
            shutdown.store(true, Ordering::Relaxed);
            actor.stop();
        }
    }
}
