use std::{sync::Arc, time::Duration};

use tokio::time::Instant;

use crate::{playlist::Track, protocol::SongInfo};

/// Tick cadence and thresholds for one room's clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackTiming {
    /// Interval while playing below `fast_threshold`.
    pub base_interval: Duration,
    /// Interval once progress reaches `fast_threshold`.
    pub fast_interval: Duration,
    /// Interval while paused or without a current track.
    pub idle_interval: Duration,
    /// Delay of the first tick after a selection or resume.
    pub select_delay: Duration,
    /// Delay of the first tick of a new room.
    pub initial_delay: Duration,
    pub fast_threshold: f64,
}

impl Default for PlaybackTiming {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_secs(5),
            fast_interval: Duration::from_millis(500),
            idle_interval: Duration::from_secs(15),
            select_delay: Duration::from_secs(1),
            initial_delay: Duration::from_secs(5),
            fast_threshold: 0.95,
        }
    }
}

/// Result of one [`PlaybackClock::tick`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    /// When the next tick should fire.
    pub next: Duration,
    /// Progress reached 1; the caller must advance before publishing.
    pub finished: bool,
}

/// Synchronized playback position of a room.
///
/// Holds a copy of the track that was current at selection time, so a
/// later playlist edit never changes what clients are told is playing.
#[derive(Debug, Default)]
pub struct PlaybackClock {
    track: Option<Arc<Track>>,
    song_url: String,
    played_percent: f64,
    is_playing: bool,
    started_at: Option<Instant>,
    last_update: Option<Instant>,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self) -> Option<&Arc<Track>> {
        self.track.as_ref()
    }

    pub fn song_url(&self) -> &str {
        &self.song_url
    }

    pub fn played_percent(&self) -> f64 {
        self.played_percent
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Selection event: restart from zero on `track`.
    pub fn reset(&mut self, track: Arc<Track>, song_url: String, now: Instant) {
        self.track = Some(track);
        self.song_url = song_url;
        self.played_percent = 0.0;
        self.is_playing = true;
        self.started_at = Some(now);
        self.last_update = Some(now);
    }

    pub fn pause(&mut self, now: Instant) {
        self.is_playing = false;
        self.last_update = Some(now);
    }

    pub fn resume(&mut self, now: Instant) {
        self.is_playing = true;
        self.last_update = Some(now);
    }

    /// Credits the time since the last update while playing and picks the
    /// next interval. Paused clocks are left untouched.
    pub fn tick(&mut self, now: Instant, timing: &PlaybackTiming) -> TickOutcome {
        if !self.is_playing {
            return TickOutcome {
                next: timing.idle_interval,
                finished: false,
            };
        }

        let since = self.last_update.unwrap_or(now);
        let elapsed = now.saturating_duration_since(since).as_secs_f64();
        if let Some(secs) = self.track.as_ref().and_then(|t| t.duration_secs()) {
            self.played_percent += elapsed / secs;
        }
        self.last_update = Some(now);

        let next = if self.played_percent >= timing.fast_threshold {
            timing.fast_interval
        } else {
            timing.base_interval
        };
        TickOutcome {
            next,
            finished: self.played_percent >= 1.0,
        }
    }

    pub fn song_info(&self) -> SongInfo {
        let mut info = SongInfo {
            song_url: self.song_url.clone(),
            played_percent: self.played_percent,
            is_playing: u8::from(self.is_playing),
            ..Default::default()
        };
        if let Some(track) = &self.track {
            info.songname = track.name.clone();
            info.songhash = track.hash.clone();
            info.singername = track.artist.clone();
            info.album_name = track.album.clone();
            info.duration = track.duration.clone();
            info.lyrics_url = track.lyrics_url.clone();
            info.cover_url = track.cover_url.clone();
        }
        info
    }
}
