mod connection;
mod room_registry;

pub use connection::*;
pub use room_registry::*;
