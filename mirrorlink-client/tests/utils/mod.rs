pub mod local_relay;

pub use fake_backend::*;
pub use fake_channel::*;
pub use local_relay::*;
pub use session_helpers::*;
