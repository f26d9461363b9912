pub mod events;
pub mod messages;
pub mod opcodes;

pub use events::*;
pub use messages::*;
pub use opcodes::*;
