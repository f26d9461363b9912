use std::sync::Arc;

use super::Track;

/// Identity of one entry, stable across reordering. Duplicate hashes are
/// allowed, so the hash alone cannot identify the current entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EntryId(u64);

#[derive(Debug)]
struct Entry {
    id: EntryId,
    track: Arc<Track>,
}

/// Outcome of a successful [`Playlist::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removal {
    /// The removed entry was current; `current` is now unset.
    pub was_current: bool,
}

/// Ordered tracks of one room plus the "current" pointer.
///
/// Insertion order is play order. `current`, when set, always names an
/// entry still present in `entries`.
#[derive(Debug, Default)]
pub struct Playlist {
    entries: Vec<Entry>,
    current: Option<EntryId>,
    next_id: u64,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current(&self) -> Option<&Arc<Track>> {
        let id = self.current?;
        self.entries.iter().find(|e| e.id == id).map(|e| &e.track)
    }

    /// Tracks in play order.
    pub fn tracks(&self) -> impl Iterator<Item = &Arc<Track>> {
        self.entries.iter().map(|e| &e.track)
    }

    /// Appends at the tail. Returns the track when it became current, in
    /// which case the caller must run a selection.
    pub fn append(&mut self, track: Track) -> Option<Arc<Track>> {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        let track = Arc::new(track);
        self.entries.push(Entry {
            id,
            track: track.clone(),
        });

        if self.current.is_none() {
            self.current = Some(id);
            return Some(track);
        }
        None
    }

    /// Removes the first entry with `hash`. Removing the current entry
    /// leaves `current` unset; nothing is re-selected.
    pub fn remove(&mut self, hash: &str) -> Option<Removal> {
        let pos = self.position(hash)?;
        let entry = self.entries.remove(pos);
        let was_current = self.current == Some(entry.id);
        if was_current {
            self.current = None;
        }
        Some(Removal { was_current })
    }

    /// Moves the first entry with `hash` to the head. `current` keeps
    /// pointing at the same entry wherever it ends up.
    pub fn promote(&mut self, hash: &str) -> bool {
        let Some(pos) = self.position(hash) else {
            return false;
        };
        let entry = self.entries.remove(pos);
        self.entries.insert(0, entry);
        true
    }

    /// Makes the first entry with `hash` current.
    pub fn select_by_hash(&mut self, hash: &str) -> Option<Arc<Track>> {
        let pos = self.position(hash)?;
        let entry = &self.entries[pos];
        self.current = Some(entry.id);
        Some(entry.track.clone())
    }

    /// Moves `current` to the following entry, wrapping at the tail. With no
    /// current entry the head is selected. `None` only when empty.
    pub fn advance(&mut self) -> Option<Arc<Track>> {
        if self.entries.is_empty() {
            return None;
        }

        let next = match self.current_position() {
            Some(pos) => (pos + 1) % self.entries.len(),
            None => 0,
        };
        let entry = &self.entries[next];
        self.current = Some(entry.id);
        Some(entry.track.clone())
    }

    fn position(&self, hash: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.track.hash == hash)
    }

    fn current_position(&self) -> Option<usize> {
        let id = self.current?;
        self.entries.iter().position(|e| e.id == id)
    }
}
