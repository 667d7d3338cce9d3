use crate::channel::{InboundSignals, SignalChannel, SignalConnector};
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use futures::channel::mpsc as futures_mpsc;
use futures::{SinkExt, StreamExt};
use mirrorlink_core::SignalMessage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

enum Outbound {
    Frame(String),
    Close,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

/// WebSocket to the relay, split into a writer task fed from a queue and a
/// reader task that decodes frames into [`InboundSignals`].
pub struct WsChannel {
    outbound: mpsc::UnboundedSender<Outbound>,
    reader: JoinHandle<()>,
    closed: AtomicBool,
}

#[async_trait(?Send)]
impl SignalConnector for WsConnector {
    type Channel = WsChannel;

    async fn connect(&self, url: &str, timeout: Duration) -> Result<(WsChannel, InboundSignals)> {
        let (ws, _) = tokio::time::timeout(timeout, connect_async(url))
            .await
            .map_err(|_| {
                ClientError::TransportUnreachable(format!(
                    "{url} did not answer within {}ms",
                    timeout.as_millis()
                ))
            })?
            .map_err(|e| ClientError::TransportUnreachable(format!("{url}: {e}")))?;
        info!("Signaling socket connected to {}", url);

        let (mut write, mut read) = ws.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Outbound>();
        let (inbound_tx, inbound_rx) = futures_mpsc::unbounded::<SignalMessage>();

        tokio::spawn(async move {
            while let Some(next) = outbound_rx.recv().await {
                match next {
                    Outbound::Frame(text) => {
                        if write.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Outbound::Close => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        });

        let reader = tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => match SignalMessage::from_json(text.as_str()) {
                        Ok(msg) => {
                            if inbound_tx.unbounded_send(msg).is_err() {
                                break;
                            }
                        }
                        Err(e) => debug!("Dropping undecodable frame: {}", e),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Signaling socket error: {}", e);
                        break;
                    }
                }
            }
            debug!("Signaling reader finished");
        });

        let channel = WsChannel {
            outbound,
            reader,
            closed: AtomicBool::new(false),
        };
        Ok((channel, inbound_rx))
    }
}

impl SignalChannel for WsChannel {
    fn send(&self, msg: &SignalMessage) -> Result<()> {
        if !self.is_open() {
            return Err(ClientError::ChannelClosed);
        }
        let text = msg
            .to_json()
            .map_err(|e| ClientError::ProtocolViolation(e.to_string()))?;
        self.outbound
            .send(Outbound::Frame(text))
            .map_err(|_| ClientError::ChannelClosed)
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && !self.outbound.is_closed()
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.outbound.send(Outbound::Close);
        self.reader.abort();
    }
}

impl Drop for WsChannel {
    fn drop(&mut self) {
        self.close();
    }
}
