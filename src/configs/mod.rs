pub mod base;
pub mod logging;
pub mod metadata;
pub mod playback;
pub mod server;

pub use base::*;
pub use logging::*;
pub use metadata::*;
pub use playback::*;
pub use server::*;
