mod candidate_queue;
mod driver;
mod listener;
mod peer_session;
mod state;

pub use candidate_queue::CandidateQueue;
pub use driver::{Command, SessionHandle, run_session, session_handle};
pub use listener::ListenerSlot;
pub use peer_session::PeerSession;
pub use state::NegotiationState;
