use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    common::{RoomError, RoomResult},
    playlist::Track,
    protocol::{Action, AddSongParams, Envelope, OutgoingMessage, SongHashParams},
    room::{ClientSession, Room, RoomGuard},
};

const ACK: &str = "operation succeeded";

/// Turns inbound client text into room operations and replies.
///
/// Queries are answered to the sender only. A successful mutation acks the
/// sender and broadcasts the new state to everyone else from inside the
/// same critical section; a failed one only unicasts the error.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandRouter;

impl CommandRouter {
    pub fn new() -> Self {
        Self
    }

    pub async fn dispatch(&self, session: &Arc<ClientSession>, text: &str) {
        debug!("Inbound: session={} payload={}", session.id(), text);

        let envelope = match Envelope::decode(text) {
            Ok(envelope) => envelope,
            Err(err) => return reject(session, &err),
        };

        if envelope.is_heartbeat() {
            session.send_unicast(OutgoingMessage::success("heartbeat").to_json());
            return;
        }

        let Some(room) = session.room() else {
            return reject(session, &RoomError::not_found("room not found"));
        };

        let result = match envelope.resolve_action(session.user_id()) {
            Ok(action) => self.execute(&room, session, action, &envelope).await,
            Err(err) => Err(err),
        };

        if let Err(err) = result {
            reject(session, &err);
            if err.is_fatal() {
                room.teardown(&err.to_string()).await;
            }
        }
    }

    async fn execute(
        &self,
        room: &Arc<Room>,
        session: &ClientSession,
        action: Action,
        envelope: &Envelope,
    ) -> RoomResult<()> {
        match action {
            Action::GetCurSongInfo => {
                let guard = open(room).await?;
                let info = guard.clock().song_info();
                guard.unicast(session, &OutgoingMessage::song_info(action, info));
            }
            Action::GetPlaylist => {
                let guard = open(room).await?;
                let items = guard.playlist_items();
                guard.unicast(session, &OutgoingMessage::playlist(action, items));
            }
            Action::GetClientList => {
                let guard = open(room).await?;
                let clients = guard.roster();
                guard.unicast(session, &OutgoingMessage::client_list(action, clients));
            }
            Action::PlayNextSong => {
                let mut guard = open(room).await?;
                let track = guard
                    .playlist_mut()
                    .advance()
                    .ok_or_else(|| RoomError::not_found("playlist is empty"))?;
                guard.select(track).await;
                ack_song_info(&mut guard, session);
            }
            Action::PlayBySongHash => {
                let params: SongHashParams = envelope.params()?;
                let hash = params.hash()?;
                let mut guard = open(room).await?;
                let track = guard
                    .playlist_mut()
                    .select_by_hash(hash)
                    .ok_or_else(|| RoomError::not_found("song not found"))?;
                guard.select(track).await;
                ack_song_info(&mut guard, session);
            }
            Action::PauseSong => {
                let mut guard = open(room).await?;
                require_track(&guard)?;
                guard.pause();
                ack_song_info(&mut guard, session);
            }
            Action::ResumeSong => {
                let mut guard = open(room).await?;
                require_track(&guard)?;
                guard.resume();
                ack_song_info(&mut guard, session);
            }
            Action::AddSongToPlaylist => {
                let params: AddSongParams = envelope.params()?;
                if params.songhash.is_empty() {
                    return Err(RoomError::validation("missing songhash"));
                }
                // resolved before locking; a miss only leaves the field empty
                let lyrics_url = room
                    .resolver()
                    .lyrics_url(&params.songhash)
                    .await
                    .unwrap_or_default();
                let track = Track {
                    name: params.songname,
                    hash: params.songhash,
                    artist: params.singername,
                    album: params.albumname,
                    duration: params.duration,
                    lyrics_url,
                    cover_url: params.coverurl,
                };

                let mut guard = open(room).await?;
                if let Some(current) = guard.playlist_mut().append(track) {
                    guard.select(current).await;
                }
                ack_playlist(&mut guard, session);
            }
            Action::RemoveSongFromPlaylist => {
                let params: SongHashParams = envelope.params()?;
                let hash = params.hash()?;
                let mut guard = open(room).await?;
                guard
                    .playlist_mut()
                    .remove(hash)
                    .ok_or_else(|| RoomError::not_found("song not found"))?;
                ack_playlist(&mut guard, session);
            }
            Action::UpSongByHash => {
                let params: SongHashParams = envelope.params()?;
                let hash = params.hash()?;
                let mut guard = open(room).await?;
                if !guard.playlist_mut().promote(hash) {
                    return Err(RoomError::not_found("song not found"));
                }
                ack_playlist(&mut guard, session);
            }
            Action::BroadcastSongInfo | Action::BroadcastSongList | Action::BroadcastClientList => {
                return Err(RoomError::validation(format!(
                    "unrecognized action {}",
                    action.code()
                )));
            }
        }
        Ok(())
    }
}

/// Locks `room`, failing if it was closed while the command was in flight.
async fn open(room: &Room) -> RoomResult<RoomGuard<'_>> {
    let guard = room.lock().await;
    if guard.is_closed() {
        return Err(RoomError::internal(format!("room {} is closed", room.id())));
    }
    Ok(guard)
}

fn require_track(guard: &RoomGuard<'_>) -> RoomResult<()> {
    if guard.clock().track().is_none() {
        return Err(RoomError::not_found("no song is playing"));
    }
    Ok(())
}

fn ack_song_info(guard: &mut RoomGuard<'_>, session: &ClientSession) {
    let info = guard.clock().song_info();
    guard.unicast(session, &OutgoingMessage::success(ACK));
    guard.broadcast_except(
        session,
        &OutgoingMessage::song_info(Action::BroadcastSongInfo, info),
    );
}

fn ack_playlist(guard: &mut RoomGuard<'_>, session: &ClientSession) {
    let items = guard.playlist_items();
    guard.unicast(session, &OutgoingMessage::success(ACK));
    guard.broadcast_except(
        session,
        &OutgoingMessage::playlist(Action::BroadcastSongList, items),
    );
}

fn reject(session: &ClientSession, err: &RoomError) {
    warn!(
        "Rejected command: session={} user={} err={}",
        session.id(),
        session.user_id(),
        err
    );
    session.send_unicast(OutgoingMessage::error(err).to_json());
}
