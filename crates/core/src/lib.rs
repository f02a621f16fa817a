// Waitline Core - Queue Projection & Announcement Logic
// NO infrastructure dependencies (ports are implemented by adapter crates)

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
