use std::sync::{Arc, Weak};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::{
    sync::{Mutex, MutexGuard},
    time::Instant,
};
use tracing::{debug, error, info};

use super::ClientSession;
use crate::{
    common::{RoomId, UserId},
    metadata::MetadataResolver,
    playback::{PlaybackClock, PlaybackTiming, Tick, Ticker},
    playlist::{Playlist, Track},
    protocol::{Action, ClientEntry, OutgoingMessage, PlaylistItem},
};

/// Registry storage; rooms deregister themselves from it on close.
pub type RoomMap = DashMap<RoomId, Arc<Room>>;

/// Shared state of one room, guarded by the room lock.
pub struct RoomState {
    members: Vec<Arc<ClientSession>>,
    playlist: Playlist,
    clock: PlaybackClock,
    ticker: Ticker<Room>,
    last_broadcast: Option<String>,
    closed: bool,
}

/// An isolated broadcast domain with its own playlist and clock.
pub struct Room {
    id: RoomId,
    creator: UserId,
    resolver: Arc<dyn MetadataResolver>,
    timing: PlaybackTiming,
    registry: Weak<RoomMap>,
    state: Mutex<RoomState>,
}

impl Room {
    /// Creates the room and arms its first tick.
    pub fn new(
        id: RoomId,
        creator: UserId,
        resolver: Arc<dyn MetadataResolver>,
        timing: PlaybackTiming,
        registry: Weak<RoomMap>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| {
            let mut ticker = Ticker::new(weak.clone());
            ticker.arm(timing.initial_delay);
            Room {
                id,
                creator,
                resolver,
                timing,
                registry,
                state: Mutex::new(RoomState {
                    members: Vec::new(),
                    playlist: Playlist::new(),
                    clock: PlaybackClock::new(),
                    ticker,
                    last_broadcast: None,
                    closed: false,
                }),
            }
        })
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn creator(&self) -> &UserId {
        &self.creator
    }

    pub fn resolver(&self) -> &Arc<dyn MetadataResolver> {
        &self.resolver
    }

    /// Enters the room's critical section. Every read or write of roster,
    /// playlist, or clock goes through the returned guard.
    pub async fn lock(&self) -> RoomGuard<'_> {
        RoomGuard {
            room: self,
            state: self.state.lock().await,
        }
    }

    /// Runs one tick now, outside the schedule.
    pub async fn tick(&self) {
        let mut guard = self.lock().await;
        if guard.is_closed() {
            return;
        }
        guard.run_tick().await;
    }

    /// Closes the room after an unrecoverable failure. Members are
    /// disconnected; other rooms are unaffected.
    pub async fn teardown(&self, reason: &str) {
        let mut guard = self.lock().await;
        if guard.is_closed() {
            return;
        }
        error!(
            "Tearing down room {}: {} ({} members)",
            self.id,
            reason,
            guard.member_count()
        );
        guard.close();
    }
}

#[async_trait]
impl Tick for Room {
    async fn on_tick(self: Arc<Self>, generation: u64) {
        let mut guard = self.lock().await;
        if guard.is_closed() || !guard.state.ticker.claim(generation) {
            return;
        }
        guard.run_tick().await;
    }

    async fn on_tick_panic(self: Arc<Self>) {
        self.teardown("playback tick panicked").await;
    }
}

/// Exclusive access to one room's state.
pub struct RoomGuard<'a> {
    room: &'a Room,
    state: MutexGuard<'a, RoomState>,
}

impl RoomGuard<'_> {
    pub fn is_closed(&self) -> bool {
        self.state.closed
    }

    pub fn member_count(&self) -> usize {
        self.state.members.len()
    }

    pub fn playlist(&self) -> &Playlist {
        &self.state.playlist
    }

    pub fn playlist_mut(&mut self) -> &mut Playlist {
        &mut self.state.playlist
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.state.clock
    }

    pub fn last_broadcast(&self) -> Option<&str> {
        self.state.last_broadcast.as_deref()
    }

    pub fn is_tick_armed(&self) -> bool {
        self.state.ticker.is_armed()
    }

    pub(crate) fn add_member(&mut self, session: Arc<ClientSession>) {
        self.state.members.push(session);
    }

    /// Returns false when the session was not a member.
    pub(crate) fn remove_member(&mut self, session: &Arc<ClientSession>) -> bool {
        let before = self.state.members.len();
        self.state.members.retain(|m| !Arc::ptr_eq(m, session));
        self.state.members.len() != before
    }

    pub fn roster(&self) -> Vec<ClientEntry> {
        self.state
            .members
            .iter()
            .map(|m| ClientEntry {
                userid: m.user_id().to_string(),
                ip: m.ip().to_string(),
            })
            .collect()
    }

    pub fn playlist_items(&self) -> Vec<PlaylistItem> {
        self.state
            .playlist
            .tracks()
            .map(|t| PlaylistItem::from(t.as_ref()))
            .collect()
    }

    /// Selection event: resolve the stream URL and restart the clock on
    /// `track`. A failed lookup leaves the URL empty.
    pub async fn select(&mut self, track: Arc<Track>) {
        let song_url = self
            .room
            .resolver
            .song_url(&track.hash)
            .await
            .unwrap_or_default();
        info!("Room {} now playing {} ({})", self.room.id, track.name, track.hash);
        self.state.clock.reset(track, song_url, Instant::now());
        self.state.ticker.arm(self.room.timing.select_delay);
    }

    pub fn pause(&mut self) {
        self.state.clock.pause(Instant::now());
    }

    pub fn resume(&mut self) {
        self.state.clock.resume(Instant::now());
        self.state.ticker.arm(self.room.timing.select_delay);
    }

    pub fn unicast(&self, session: &ClientSession, message: &OutgoingMessage) {
        let text = message.to_json();
        debug!("Unicast: session={} payload={}", session.id(), text);
        session.send_unicast(text);
    }

    /// Sends to every member.
    pub fn broadcast(&mut self, message: &OutgoingMessage) {
        let text = message.to_json();
        debug!("Broadcast: room={} payload={}", self.room.id, text);
        for member in &self.state.members {
            member.send_broadcast(text.clone());
        }
        self.state.last_broadcast = Some(text);
    }

    /// Sends to every member except `skip`.
    pub fn broadcast_except(&mut self, skip: &ClientSession, message: &OutgoingMessage) {
        let text = message.to_json();
        debug!("Broadcast: room={} payload={}", self.room.id, text);
        for member in &self.state.members {
            if !std::ptr::eq(member.as_ref(), skip) {
                member.send_broadcast(text.clone());
            }
        }
        self.state.last_broadcast = Some(text);
    }

    /// Advances the clock, auto-advances a finished track, publishes the
    /// position, and re-arms. Every path re-arms.
    async fn run_tick(&mut self) {
        let timing = self.room.timing;
        let outcome = self.state.clock.tick(Instant::now(), &timing);
        let mut next = outcome.next;

        if outcome.finished {
            match self.state.playlist.advance() {
                Some(track) => self.select(track).await,
                None => {
                    debug!("Room {} finished its last track", self.room.id);
                    self.state.clock = PlaybackClock::new();
                    next = timing.idle_interval;
                }
            }
        }

        if self.state.clock.track().is_some() {
            let info = self.state.clock.song_info();
            self.broadcast(&OutgoingMessage::song_info(Action::BroadcastSongInfo, info));
        }

        self.state.ticker.arm(next);
    }

    #[cfg(test)]
    pub(crate) fn mark_closed(&mut self) {
        self.state.closed = true;
    }

    /// Marks the room closed, cancels its tick, disconnects the members,
    /// and removes it from the registry. Idempotent.
    pub fn close(&mut self) {
        if self.state.closed {
            return;
        }
        self.state.closed = true;
        self.state.ticker.cancel();
        for member in self.state.members.drain(..) {
            member.close();
        }

        if let Some(rooms) = self.room.registry.upgrade() {
            let this: *const Room = self.room;
            rooms.remove_if(&self.room.id, |_, r| std::ptr::eq(Arc::as_ptr(r), this));
        }
        info!("Room {} destroyed", self.room.id);
    }
}
