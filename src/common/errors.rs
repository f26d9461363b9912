use thiserror::Error;

/// Failures surfaced to a client as an error envelope.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RoomError {
    /// The inbound text was not valid JSON.
    #[error("JSON parse error: {0}")]
    Decode(String),

    /// Missing or invalid identity, action, or parameter.
    #[error("{0}")]
    Validation(String),

    /// A hash or room referenced by the command is absent.
    #[error("{0}")]
    NotFound(String),

    /// Room state is no longer usable; the room is torn down.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RoomError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Negative `error_code` carried by the outbound envelope.
    pub fn code(&self) -> i32 {
        match self {
            Self::Decode(_) | Self::Validation(_) => -1,
            Self::NotFound(_) => -2,
            Self::Internal(_) => -3,
        }
    }

    /// Whether the room that produced this error must be torn down.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

pub type RoomResult<T> = std::result::Result<T, RoomError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_negative() {
        let errors = [
            RoomError::Decode("eof".into()),
            RoomError::validation("bad action"),
            RoomError::not_found("no such song"),
            RoomError::internal("room gone"),
        ];
        for err in errors {
            assert!(err.code() < 0, "{err:?}");
        }
    }

    #[test]
    fn test_only_internal_is_fatal() {
        assert!(RoomError::internal("x").is_fatal());
        assert!(!RoomError::not_found("x").is_fatal());
        assert!(!RoomError::validation("x").is_fatal());
    }

    #[test]
    fn test_decode_message_names_the_problem() {
        let err = RoomError::Decode("expected value at line 1 column 1".into());
        assert_eq!(
            err.to_string(),
            "JSON parse error: expected value at line 1 column 1"
        );
    }
}
