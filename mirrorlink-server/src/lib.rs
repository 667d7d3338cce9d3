mod app;
mod config;
mod room;
mod signaling;

pub use app::*;
pub use config::ServerConfig;
pub use room::*;
pub use signaling::*;
