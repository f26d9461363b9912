use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    common::{RoomError, RoomResult, UserId},
    protocol::opcodes::Action,
};

/// Inbound client envelope. Fields are kept loose so each validation step
/// can report its own error instead of a generic decode failure.
#[derive(Debug, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub userid: Option<Value>,
    #[serde(default)]
    pub action: Option<Value>,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default, rename = "type")]
    pub kind: Option<Value>,
}

impl Envelope {
    pub fn decode(text: &str) -> RoomResult<Self> {
        serde_json::from_str(text).map_err(|e| RoomError::Decode(e.to_string()))
    }

    pub fn is_heartbeat(&self) -> bool {
        self.kind.as_ref().and_then(Value::as_str) == Some("heartbeat")
    }

    /// The raw integer code; any non-integer is a validation failure.
    pub fn action_code(&self) -> RoomResult<i64> {
        self.action
            .as_ref()
            .and_then(Value::as_i64)
            .ok_or_else(|| RoomError::validation("invalid action type"))
    }

    /// Requires the claimed identity to equal the one bound at join time.
    pub fn check_identity(&self, expected: &UserId) -> RoomResult<()> {
        match self.userid.as_ref().and_then(Value::as_str) {
            Some(claimed) if claimed == expected.0.as_str() => Ok(()),
            _ => Err(RoomError::validation("invalid userid")),
        }
    }

    pub fn resolve_action(&self, expected: &UserId) -> RoomResult<Action> {
        let code = self.action_code()?;
        self.check_identity(expected)?;
        Action::from_inbound(code)
            .ok_or_else(|| RoomError::validation(format!("unrecognized action {code}")))
    }

    pub fn params<T: DeserializeOwned>(&self) -> RoomResult<T> {
        match &self.params {
            Some(value @ Value::Object(_)) => serde_json::from_value(value.clone())
                .map_err(|e| RoomError::validation(format!("invalid params: {e}"))),
            _ => Err(RoomError::validation("invalid params")),
        }
    }
}

/// `params` of the by-hash commands (select, remove, promote).
#[derive(Debug, Default, Deserialize)]
pub struct SongHashParams {
    #[serde(default, deserialize_with = "lenient_string")]
    pub songhash: String,
}

impl SongHashParams {
    pub fn hash(&self) -> RoomResult<&str> {
        if self.songhash.is_empty() {
            return Err(RoomError::validation("missing songhash"));
        }
        Ok(&self.songhash)
    }
}

/// `params` of ADD_SONG_TO_PLAYLIST.
#[derive(Debug, Default, Deserialize)]
pub struct AddSongParams {
    #[serde(default, deserialize_with = "lenient_string")]
    pub songname: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub songhash: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub singername: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub albumname: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub duration: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub coverurl: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
}

/// Accepts strings, numbers, booleans, or null; null becomes empty.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Scalar>::deserialize(deserializer)? {
        Some(Scalar::Text(s)) => s,
        Some(Scalar::Number(n)) => n.to_string(),
        Some(Scalar::Flag(b)) => b.to_string(),
        None => String::new(),
    })
}
