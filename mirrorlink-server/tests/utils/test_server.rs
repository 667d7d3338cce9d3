use anyhow::{Context, Result};
use mirrorlink_server::{RelayService, RoomRegistry, ServerConfig, serve_with_shutdown};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// A relay bound to an ephemeral local port. Shuts down on drop.
pub struct TestServer {
    pub addr: SocketAddr,
    pub registry: RoomRegistry,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("Failed to bind test listener")?;
        let addr = listener.local_addr()?;
        let registry = RoomRegistry::new();
        let service = RelayService::new(registry.clone(), ServerConfig::default().max_frame_bytes);
        let (tx, rx) = oneshot::channel::<()>();

        tokio::spawn(serve_with_shutdown(listener, service, async move {
            let _ = rx.await;
        }));

        Ok(Self {
            addr,
            registry,
            shutdown: Some(tx),
        })
    }

    pub fn url(&self) -> String {
        format!("ws://{}/", self.addr)
    }

    /// Polls the registry until `room` has exactly `count` members.
    pub async fn wait_for_members(&self, room: &str, count: usize, timeout_ms: u64) -> Result<()> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            let current = self.registry.member_count(room);
            if current == count {
                return Ok(());
            }
            if Instant::now() > deadline {
                anyhow::bail!(
                    "Timeout waiting for room '{}' to have {} members (has {})",
                    room,
                    count,
                    current
                );
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
