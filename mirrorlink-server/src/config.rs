use clap::Parser;
use std::net::SocketAddr;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024;

/// Relay server settings.
#[derive(Debug, Clone, Parser)]
#[command(name = "mirrorlink-server", about = "Room-scoped signaling relay")]
pub struct ServerConfig {
    /// Address the WebSocket endpoint listens on.
    #[arg(long, default_value = DEFAULT_BIND_ADDR)]
    pub bind: SocketAddr,

    /// Text frames larger than this are dropped without being relayed.
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_BYTES)]
    pub max_frame_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3001)),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}
