use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::{ClientSession, Room, RoomMap};
use crate::{
    common::RoomId,
    metadata::MetadataResolver,
    playback::PlaybackTiming,
    protocol::{Action, OutgoingMessage},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub rooms: usize,
    pub sessions: usize,
}

/// Process-wide directory of rooms. Rooms are created on first join and
/// removed when their last member leaves.
pub struct RoomRegistry {
    rooms: Arc<RoomMap>,
    resolver: Arc<dyn MetadataResolver>,
    timing: PlaybackTiming,
}

impl RoomRegistry {
    pub fn new(resolver: Arc<dyn MetadataResolver>, timing: PlaybackTiming) -> Self {
        Self {
            rooms: Arc::new(RoomMap::new()),
            resolver,
            timing,
        }
    }

    pub fn find(&self, room_id: &RoomId) -> Option<Arc<Room>> {
        self.rooms.get(room_id).map(|r| r.value().clone())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Admits `session` into `room_id`, creating the room if needed, and
    /// broadcasts the new roster to everyone including the joiner.
    pub async fn join(&self, room_id: RoomId, session: Arc<ClientSession>) -> Arc<Room> {
        loop {
            let room = self
                .rooms
                .entry(room_id.clone())
                .or_insert_with(|| {
                    info!("Room {} created by {}", room_id, session.user_id());
                    Room::new(
                        room_id.clone(),
                        session.user_id().clone(),
                        self.resolver.clone(),
                        self.timing,
                        Arc::downgrade(&self.rooms),
                    )
                })
                .value()
                .clone();

            let mut guard = room.lock().await;
            if guard.is_closed() {
                // lost a race with the last leave; the entry is stale
                drop(guard);
                self.rooms.remove_if(&room_id, |_, r| Arc::ptr_eq(r, &room));
                continue;
            }

            guard.add_member(session.clone());
            session.bind(&room);
            info!(
                "{} joined room {} from {} ({} members)",
                session.user_id(),
                room_id,
                session.ip(),
                guard.member_count()
            );

            let roster = OutgoingMessage::client_list(Action::BroadcastClientList, guard.roster());
            guard.broadcast(&roster);
            drop(guard);
            return room;
        }
    }

    /// Removes `session` from its room. The last leave closes the room,
    /// cancelling its tick in the same critical section.
    pub async fn leave(&self, session: &Arc<ClientSession>) {
        let Some(room) = session.room() else {
            return;
        };

        let mut guard = room.lock().await;
        if !guard.remove_member(session) {
            return;
        }
        info!(
            "{} left room {} ({} members)",
            session.user_id(),
            room.id(),
            guard.member_count()
        );

        if guard.member_count() == 0 {
            guard.close();
        } else {
            let roster = OutgoingMessage::client_list(Action::BroadcastClientList, guard.roster());
            guard.broadcast(&roster);
        }
    }

    /// Counts rooms and members, locking one room at a time.
    pub async fn stats(&self) -> RegistryStats {
        let rooms: Vec<Arc<Room>> = self.rooms.iter().map(|r| r.value().clone()).collect();
        let mut stats = RegistryStats::default();
        for room in rooms {
            let guard = room.lock().await;
            if guard.is_closed() {
                continue;
            }
            stats.rooms += 1;
            stats.sessions += guard.member_count();
        }
        stats
    }

    /// Closes every room.
    pub async fn shutdown(&self) {
        let rooms: Vec<Arc<Room>> = self.rooms.iter().map(|r| r.value().clone()).collect();
        info!("Closing {} rooms", rooms.len());
        for room in rooms {
            room.lock().await.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::UserId,
        room::testing::{StubResolver, track, wire},
    };
    use std::time::Duration;

    fn registry() -> RoomRegistry {
        RoomRegistry::new(Arc::new(StubResolver::default()), PlaybackTiming::default())
    }

    fn session(user: &str) -> Arc<ClientSession> {
        ClientSession::new(UserId::from(user), "10.0.0.1")
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_join_creates_room() {
        let registry = registry();
        let alice = session("alice");
        let room = registry.join(RoomId::from("r1"), alice.clone()).await;

        assert_eq!(room.creator(), &UserId::from("alice"));
        assert!(registry.find(&RoomId::from("r1")).is_some());
        assert!(Arc::ptr_eq(&alice.room().unwrap(), &room));

        let v = wire(&alice.take_pending()[0]);
        assert_eq!(v["action"], 211);
        assert_eq!(v["clients"][0]["userid"], "alice");
        assert_eq!(v["clients"][0]["ip"], "10.0.0.1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_join_shares_room_and_roster() {
        let registry = registry();
        let alice = session("alice");
        let bob = session("bob");
        let first = registry.join(RoomId::from("r1"), alice.clone()).await;
        let second = registry.join(RoomId::from("r1"), bob.clone()).await;
        assert!(Arc::ptr_eq(&first, &second));

        let v = wire(alice.take_pending().last().unwrap());
        assert_eq!(v["clients"].as_array().unwrap().len(), 2);
        assert_eq!(registry.stats().await, RegistryStats { rooms: 1, sessions: 2 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_leave_broadcasts_to_remaining() {
        let registry = registry();
        let alice = session("alice");
        let bob = session("bob");
        registry.join(RoomId::from("r1"), alice.clone()).await;
        registry.join(RoomId::from("r1"), bob.clone()).await;
        alice.take_pending();

        registry.leave(&bob).await;
        let v = wire(&alice.take_pending()[0]);
        assert_eq!(v["clients"], serde_json::json!([{"userid": "alice", "ip": "10.0.0.1"}]));

        // a second leave is a no-op
        registry.leave(&bob).await;
        assert_eq!(registry.stats().await.sessions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_leave_destroys_room_and_stops_ticks() {
        let registry = registry();
        let alice = session("alice");
        let room = registry.join(RoomId::from("r1"), alice.clone()).await;
        {
            let mut guard = room.lock().await;
            let selected = guard.playlist_mut().append(track("h1", "180"));
            guard.select(selected.unwrap()).await;
        }

        registry.leave(&alice).await;
        assert!(registry.find(&RoomId::from("r1")).is_none());
        assert_eq!(registry.room_count(), 0);

        let observed = room.lock().await.last_broadcast().map(str::to_string);
        tokio::time::sleep(Duration::from_secs(120)).await;
        let guard = room.lock().await;
        assert!(guard.is_closed());
        assert!(!guard.is_tick_armed());
        assert_eq!(guard.last_broadcast().map(str::to_string), observed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejoin_after_destroy_gets_fresh_room() {
        let registry = registry();
        let alice = session("alice");
        let old = registry.join(RoomId::from("r1"), alice.clone()).await;
        old.lock().await.playlist_mut().append(track("h1", "180"));
        registry.leave(&alice).await;

        let carol = session("carol");
        let fresh = registry.join(RoomId::from("r1"), carol).await;
        assert!(!Arc::ptr_eq(&old, &fresh));
        assert!(fresh.lock().await.playlist().is_empty());
        assert_eq!(fresh.creator(), &UserId::from("carol"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_skips_closed_room() {
        let registry = registry();
        let alice = session("alice");
        let stale = registry.join(RoomId::from("r1"), alice).await;
        // close without deregistering to simulate the race window
        stale.lock().await.mark_closed();

        let bob = session("bob");
        let room = registry.join(RoomId::from("r1"), bob.clone()).await;
        assert!(!Arc::ptr_eq(&stale, &room));
        assert!(Arc::ptr_eq(&registry.find(&RoomId::from("r1")).unwrap(), &room));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rooms_are_independent() {
        let registry = registry();
        let alice = session("alice");
        let bob = session("bob");
        registry.join(RoomId::from("r1"), alice.clone()).await;
        let r2 = registry.join(RoomId::from("r2"), bob.clone()).await;

        registry.leave(&alice).await;
        assert!(registry.find(&RoomId::from("r2")).is_some());
        assert!(!r2.lock().await.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_closes_everything() {
        let registry = registry();
        let alice = session("alice");
        let bob = session("bob");
        registry.join(RoomId::from("r1"), alice.clone()).await;
        registry.join(RoomId::from("r2"), bob.clone()).await;

        registry.shutdown().await;
        assert!(alice.is_closed());
        assert!(bob.is_closed());
        assert_eq!(registry.room_count(), 0);
        assert_eq!(registry.stats().await, RegistryStats::default());
    }
}
