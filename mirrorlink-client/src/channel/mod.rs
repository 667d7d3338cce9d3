use crate::error::Result;
use async_trait::async_trait;
use futures::channel::mpsc;
use mirrorlink_core::SignalMessage;
use std::time::Duration;

/// Decoded frames from the relay. Frames that do not decode into a known
/// message shape never show up here. The stream ends when the channel closes.
pub type InboundSignals = mpsc::UnboundedReceiver<SignalMessage>;

/// Outbound half of an open signaling channel.
pub trait SignalChannel {
    fn send(&self, msg: &SignalMessage) -> Result<()>;

    fn is_open(&self) -> bool;

    /// Closes the transport. Idempotent.
    fn close(&self);
}

#[async_trait(?Send)]
pub trait SignalConnector {
    type Channel: SignalChannel + 'static;

    /// Opens a channel to `url`, failing with
    /// [`ClientError::TransportUnreachable`](crate::ClientError::TransportUnreachable)
    /// if it is not open within `timeout`.
    async fn connect(&self, url: &str, timeout: Duration)
    -> Result<(Self::Channel, InboundSignals)>;
}
