pub mod registry;
#[allow(clippy::module_inception)]
pub mod room;
pub mod session;

pub use registry::{RegistryStats, RoomRegistry};
pub use room::{Room, RoomGuard, RoomMap, RoomState};
pub use session::ClientSession;
