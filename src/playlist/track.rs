/// One playlist entry. Immutable once created; shared by `Arc` between the
/// playlist and any snapshot taken of it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub name: String,
    /// Content hash; the only key used to look tracks up.
    pub hash: String,
    pub artist: String,
    pub album: String,
    /// Seconds, kept as received so it round-trips to clients unchanged.
    pub duration: String,
    pub lyrics_url: String,
    pub cover_url: String,
}

impl Track {
    /// Duration in seconds, or `None` when missing, unparsable, or not
    /// positive. Progress is never computed for such tracks.
    pub fn duration_secs(&self) -> Option<f64> {
        self.duration
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|secs| secs.is_finite() && *secs > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_duration(duration: &str) -> Track {
        Track {
            duration: duration.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_duration_parsing() {
        assert_eq!(with_duration("180").duration_secs(), Some(180.0));
        assert_eq!(with_duration(" 212.5 ").duration_secs(), Some(212.5));
        assert_eq!(with_duration("").duration_secs(), None);
        assert_eq!(with_duration("0").duration_secs(), None);
        assert_eq!(with_duration("-3").duration_secs(), None);
        assert_eq!(with_duration("3:00").duration_secs(), None);
        assert_eq!(with_duration("inf").duration_secs(), None);
    }
}
