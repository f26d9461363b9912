pub mod common;
pub mod configs;
pub mod metadata;
pub mod playback;
pub mod playlist;
pub mod protocol;
pub mod room;
pub mod router;
pub mod server;
pub mod transport;
