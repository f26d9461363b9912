use serde::{Serialize, Serializer};

/// Numeric action codes carried in the `action` field of envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Action {
    GetCurSongInfo = 200,
    PlayNextSong = 201,
    PlayBySongHash = 202,
    PauseSong = 203,
    ResumeSong = 204,
    AddSongToPlaylist = 205,
    RemoveSongFromPlaylist = 206,
    UpSongByHash = 207,
    GetPlaylist = 208,
    BroadcastSongInfo = 209,
    BroadcastSongList = 210,
    BroadcastClientList = 211,
    GetClientList = 212,
}

impl Action {
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Tags used only on outbound payloads; never accepted from clients.
    pub fn is_broadcast_only(self) -> bool {
        matches!(
            self,
            Self::BroadcastSongInfo | Self::BroadcastSongList | Self::BroadcastClientList
        )
    }

    /// Parses an inbound code, rejecting unknown and broadcast-only values.
    pub fn from_inbound(code: i64) -> Option<Self> {
        Self::try_from(code).ok().filter(|a| !a.is_broadcast_only())
    }
}

impl TryFrom<i64> for Action {
    type Error = i64;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Ok(match code {
            200 => Self::GetCurSongInfo,
            201 => Self::PlayNextSong,
            202 => Self::PlayBySongHash,
            203 => Self::PauseSong,
            204 => Self::ResumeSong,
            205 => Self::AddSongToPlaylist,
            206 => Self::RemoveSongFromPlaylist,
            207 => Self::UpSongByHash,
            208 => Self::GetPlaylist,
            209 => Self::BroadcastSongInfo,
            210 => Self::BroadcastSongList,
            211 => Self::BroadcastClientList,
            212 => Self::GetClientList,
            other => return Err(other),
        })
    }
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_wire_values() {
        assert_eq!(Action::GetCurSongInfo.code(), 200);
        assert_eq!(Action::GetPlaylist.code(), 208);
        assert_eq!(Action::BroadcastClientList.code(), 211);
        assert_eq!(Action::GetClientList.code(), 212);
    }

    #[test]
    fn test_broadcast_tags_rejected_inbound() {
        assert_eq!(Action::from_inbound(209), None);
        assert_eq!(Action::from_inbound(210), None);
        assert_eq!(Action::from_inbound(211), None);
        assert_eq!(Action::from_inbound(212), Some(Action::GetClientList));
    }

    #[test]
    fn test_unknown_codes() {
        assert_eq!(Action::from_inbound(0), None);
        assert_eq!(Action::from_inbound(199), None);
        assert_eq!(Action::from_inbound(213), None);
        assert_eq!(Action::try_from(-5), Err(-5));
    }

    #[test]
    fn test_serializes_as_number() {
        assert_eq!(
            serde_json::to_string(&Action::BroadcastSongList).unwrap(),
            "210"
        );
    }
}
