use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::playback::PlaybackTiming;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PlaybackConfig {
    #[serde(default = "default_base_interval_ms")]
    pub base_interval_ms: u64,
    #[serde(default = "default_fast_interval_ms")]
    pub fast_interval_ms: u64,
    #[serde(default = "default_idle_interval_ms")]
    pub idle_interval_ms: u64,
    #[serde(default = "default_select_delay_ms")]
    pub select_delay_ms: u64,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Progress fraction past which ticks switch to the fast interval.
    #[serde(default = "default_fast_threshold")]
    pub fast_threshold: f64,
}

impl PlaybackConfig {
    pub fn timing(&self) -> PlaybackTiming {
        PlaybackTiming {
            base_interval: Duration::from_millis(self.base_interval_ms),
            fast_interval: Duration::from_millis(self.fast_interval_ms),
            idle_interval: Duration::from_millis(self.idle_interval_ms),
            select_delay: Duration::from_millis(self.select_delay_ms),
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            fast_threshold: self.fast_threshold.clamp(0.0, 1.0),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            base_interval_ms: default_base_interval_ms(),
            fast_interval_ms: default_fast_interval_ms(),
            idle_interval_ms: default_idle_interval_ms(),
            select_delay_ms: default_select_delay_ms(),
            initial_delay_ms: default_initial_delay_ms(),
            fast_threshold: default_fast_threshold(),
        }
    }
}

fn default_base_interval_ms() -> u64 {
    5_000
}

fn default_fast_interval_ms() -> u64 {
    500
}

fn default_idle_interval_ms() -> u64 {
    15_000
}

fn default_select_delay_ms() -> u64 {
    1_000
}

fn default_initial_delay_ms() -> u64 {
    5_000
}

fn default_fast_threshold() -> f64 {
    0.95
}
