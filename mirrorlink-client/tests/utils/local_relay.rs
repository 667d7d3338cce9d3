use anyhow::{Context, Result};
use mirrorlink_server::{RelayService, RoomRegistry, ServerConfig, serve_with_shutdown};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Real relay on an ephemeral port for the native channel tests.
pub struct LocalRelay {
    pub addr: SocketAddr,
    pub registry: RoomRegistry,
    shutdown: Option<oneshot::Sender<()>>,
}

impl LocalRelay {
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("Failed to bind relay listener")?;
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

    pub async fn wait_for_members(&self, room: &str, count: usize) -> Result<()> {
        let deadline = Instant::now() + Duration::from_secs(2);
        while self.registry.member_count(room) != count {
            if Instant::now() > deadline {
                anyhow::bail!("Room '{}' never reached {} members", room, count);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Ok(())
    }
}

impl Drop for LocalRelay {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
