use std::sync::{
    Arc, OnceLock, Weak,
    atomic::{AtomicBool, Ordering},
};

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::Room;
use crate::common::{SessionId, UserId};

/// Latest-only outbound slots. A newer message overwrites an unread one.
#[derive(Debug, Default)]
struct Mailbox {
    unicast: Option<String>,
    broadcast: Option<String>,
}

/// One connected client.
///
/// The room writes into the mailbox and signals `wake`; the connection's
/// write path drains it with [`ClientSession::take_pending`].
pub struct ClientSession {
    id: SessionId,
    user_id: UserId,
    ip: String,
    /// Non-owning; set once the session is admitted to a room.
    room: OnceLock<Weak<Room>>,
    mailbox: Mutex<Mailbox>,
    wake: Notify,
    closed: AtomicBool,
}

impl ClientSession {
    pub fn new(user_id: UserId, ip: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: SessionId::generate(),
            user_id,
            ip: ip.into(),
            room: OnceLock::new(),
            mailbox: Mutex::new(Mailbox::default()),
            wake: Notify::new(),
            closed: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    /// The room this session joined, while it still exists.
    pub fn room(&self) -> Option<Arc<Room>> {
        self.room.get().and_then(Weak::upgrade)
    }

    pub(crate) fn bind(&self, room: &Arc<Room>) {
        let _ = self.room.set(Arc::downgrade(room));
    }

    pub fn send_unicast(&self, text: String) {
        self.mailbox.lock().unicast = Some(text);
        self.wake.notify_one();
    }

    pub fn send_broadcast(&self, text: String) {
        self.mailbox.lock().broadcast = Some(text);
        self.wake.notify_one();
    }

    /// Drains the mailbox, unicast first.
    pub fn take_pending(&self) -> Vec<String> {
        let mut mailbox = self.mailbox.lock();
        mailbox
            .unicast
            .take()
            .into_iter()
            .chain(mailbox.broadcast.take())
            .collect()
    }

    pub fn has_pending(&self) -> bool {
        let mailbox = self.mailbox.lock();
        mailbox.unicast.is_some() || mailbox.broadcast.is_some()
    }

    /// Resolves once there is something to flush or the session was closed.
    /// A signal raised while nobody waits is kept for the next call.
    pub async fn ready(&self) {
        self.wake.notified().await;
    }

    /// Asks the connection to disconnect after flushing.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("ip", &self.ip)
            .field("closed", &self.is_closed())
            .finish()
    }
}
