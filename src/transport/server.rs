//! Push server listener
//!
//! Handles the TCP accept loop and spawns one task per WebSocket connection.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::error::Result;
use crate::registry::SubscriberRegistry;

use super::config::PushServerConfig;
use super::connection::Connection;

/// WebSocket server feeding the subscriber registry
pub struct PushServer {
    config: PushServerConfig,
    registry: Arc<SubscriberRegistry>,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl PushServer {
    /// Create a new server over the given registry
    pub fn new(config: PushServerConfig, registry: Arc<SubscriberRegistry>) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            registry,
            connection_semaphore,
        }
    }

    /// Get a reference to the subscriber registry
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Bind the configured address and serve forever
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_until(listener, shutdown).await
    }

    /// Serve connections from an already bound listener
    pub async fn serve_until<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(addr = %listener.local_addr()?, "Push server listening");

        // Sweep subscribers whose connection task died without unregistering
        let cleanup_handle = self.registry.spawn_cleanup_task();

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Push server shutting down");
            }
            _ = self.accept_loop(&listener) => {}
        }

        cleanup_handle.abort();
        Ok(())
    }

    async fn accept_loop(&self, listener: &TcpListener) {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Accept failed");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit; the permit lives as long as the connection task
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::error!(error = %e, "Failed to set TCP_NODELAY");
                return;
            }
        }

        let connection = Connection::new(
            peer_addr,
            Arc::clone(&self.registry),
            self.config.write_timeout,
        );

        tokio::spawn(async move {
            let _permit = permit;
            if let Err(e) = connection.run(socket).await {
                tracing::debug!(peer = %peer_addr, error = %e, "Connection error");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use futures_util::StreamExt;
    use tokio::sync::oneshot;
    use tokio_tungstenite::tungstenite::Message;

    use crate::record::{Hashtag, PublishedRecord};
    use crate::registry::{PushFrame, RegistryConfig, DEFAULT_TOPIC};
    use crate::transport::config::DEFAULT_BIND_ADDR;

    const WAIT: Duration = Duration::from_secs(2);

    async fn start_server(
        config: PushServerConfig,
        registry: Arc<SubscriberRegistry>,
    ) -> (SocketAddr, oneshot::Sender<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let server = PushServer::new(config, registry);
            server
                .serve_until(listener, async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        (addr, shutdown_tx)
    }

    async fn wait_for_count(registry: &SubscriberRegistry, expected: usize) {
        tokio::time::timeout(WAIT, async {
            while registry.count() != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("subscriber count not reached");
    }

    #[tokio::test]
    async fn test_frames_are_pushed_as_text() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (addr, _shutdown) = start_server(
            PushServerConfig::with_addr(([127, 0, 0, 1], 0).into()),
            Arc::clone(&registry),
        )
        .await;

        let (mut client, _) = tokio_tungstenite::connect_async(format!("ws://{}", addr))
            .await
            .unwrap();
        wait_for_count(&registry, 1).await;

        let record = PublishedRecord::new("u1", vec![Hashtag::new("go"), Hashtag::new("rust")]);
        let frame = PushFrame::encode(DEFAULT_TOPIC, record).unwrap();
        let report = registry.broadcast_all(&frame).await;
        assert!(report.is_complete());

        let message = tokio::time::timeout(WAIT, client.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        match message {
            Message::Text(text) => {
                let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
                assert_eq!(value["target"], "PublishTweet");
                assert_eq!(value["arguments"][0]["authorId"], "u1");
                assert_eq!(value["arguments"][0]["hashtags"][1], "rust");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_client_close_unregisters() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (addr, _shutdown) = start_server(PushServerConfig::default(), Arc::clone(&registry)).await;

        let (mut client, _) = tokio_tungstenite::connect_async(format!("ws://{}", addr))
            .await
            .unwrap();
        wait_for_count(&registry, 1).await;

        client.close(None).await.unwrap();
        wait_for_count(&registry, 0).await;
    }

    #[tokio::test]
    async fn test_connection_limit_rejects_extra_clients() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (addr, _shutdown) = start_server(
            PushServerConfig::default().max_connections(1),
            Arc::clone(&registry),
        )
        .await;

        let (_first, _) = tokio_tungstenite::connect_async(format!("ws://{}", addr))
            .await
            .unwrap();
        wait_for_count(&registry, 1).await;

        let second = tokio::time::timeout(
            WAIT,
            tokio_tungstenite::connect_async(format!("ws://{}", addr)),
        )
        .await
        .unwrap();
        assert!(second.is_err());
        assert_eq!(registry.count(), 1);
    }

    #[tokio::test]
    async fn test_stalled_subscriber_releases_its_slot() {
        let registry = Arc::new(SubscriberRegistry::with_config(
            RegistryConfig::default()
                .send_timeout(Duration::from_millis(50))
                .channel_capacity(1),
        ));
        let (addr, _shutdown) = start_server(
            PushServerConfig::default()
                .max_connections(1)
                .write_timeout(Duration::from_millis(100)),
            Arc::clone(&registry),
        )
        .await;

        // Completes the handshake, then never reads
        let socket = TcpStream::connect(addr).await.unwrap();
        let (_stalled, _) = tokio_tungstenite::client_async(format!("ws://{}", addr), socket)
            .await
            .unwrap();
        wait_for_count(&registry, 1).await;

        let record = PublishedRecord::new("x".repeat(200_000), Vec::new());
        let frame = PushFrame::encode(DEFAULT_TOPIC, record).unwrap();
        let mut broadcasts = 0;
        while registry.has_subscribers() {
            registry.broadcast_all(&frame).await;
            broadcasts += 1;
            assert!(broadcasts < 2_000, "stalled subscriber was never evicted");
        }

        // The single connection slot frees up once the blocked write gives up
        let next = tokio::time::timeout(WAIT, async {
            loop {
                if let Ok((ws, _)) = tokio_tungstenite::connect_async(format!("ws://{}", addr)).await {
                    return ws;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await;
        assert!(next.is_ok());
        wait_for_count(&registry, 1).await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_accepting() {
        let registry = Arc::new(SubscriberRegistry::new());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server = PushServer::new(PushServerConfig::default(), registry);
        assert_eq!(server.bind_addr(), DEFAULT_BIND_ADDR.parse::<SocketAddr>().unwrap());
        assert_eq!(server.registry().count(), 0);

        let result = server.serve_until(listener, async {}).await;
        assert!(result.is_ok());
    }
}
