mod envelope;
mod relay_service;
mod ws_handler;

pub use envelope::Envelope;
pub use relay_service::*;
pub use ws_handler::ws_handler;
