use std::time::Instant;

use crate::{configs::Config, room::RoomRegistry, router::CommandRouter};

/// Top-level application state shared by every connection.
pub struct AppState {
    pub registry: RoomRegistry,
    pub router: CommandRouter,
    pub config: Config,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config, registry: RoomRegistry) -> Self {
        Self {
            registry,
            router: CommandRouter::new(),
            config,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }
}
