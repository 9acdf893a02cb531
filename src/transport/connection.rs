//! Per-connection WebSocket handling

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};
use tokio_tungstenite::WebSocketStream;

use crate::error::{Error, Result};
use crate::registry::{PushFrame, SubscriberRegistry};

/// One accepted push connection
pub(super) struct Connection {
    peer_addr: SocketAddr,
    registry: Arc<SubscriberRegistry>,
    write_timeout: Duration,
}

impl Connection {
    pub(super) fn new(
        peer_addr: SocketAddr,
        registry: Arc<SubscriberRegistry>,
        write_timeout: Duration,
    ) -> Self {
        Self {
            peer_addr,
            registry,
            write_timeout,
        }
    }

    /// Upgrade the socket and relay frames until either side goes away
    pub(super) async fn run(self, socket: TcpStream) -> Result<()> {
        let mut ws = tokio_tungstenite::accept_async(socket)
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let (handle, frames) = match self.registry.register() {
            Ok(registered) => registered,
            Err(e) => {
                let _ = ws.close(None).await;
                return Err(e.into());
            }
        };

        tracing::debug!(peer = %self.peer_addr, subscriber = handle.id(), "Push subscriber connected");

        let result = forward(ws, frames, self.write_timeout).await;

        // Already gone if the registry evicted it after a failed delivery
        if self.registry.unregister(&handle).is_err() {
            tracing::debug!(subscriber = handle.id(), "Subscriber already evicted");
        }

        tracing::debug!(peer = %self.peer_addr, subscriber = handle.id(), "Push subscriber disconnected");
        result
    }
}

async fn forward(
    ws: WebSocketStream<TcpStream>,
    mut frames: mpsc::Receiver<PushFrame>,
    write_timeout: Duration,
) -> Result<()> {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Some(frame) => {
                    let text = Utf8Bytes::try_from(frame.payload.clone())
                        .map_err(|e| Error::Transport(e.to_string()))?;
                    // Bounded: a peer that stopped reading is dropped
                    match tokio::time::timeout(write_timeout, sink.send(Message::Text(text))).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => return Err(Error::Transport(e.to_string())),
                        Err(_) => {
                            return Err(Error::Transport(format!(
                                "write timed out after {:?}",
                                write_timeout
                            )))
                        }
                    }
                }
                None => {
                    // Evicted by the registry
                    let _ = tokio::time::timeout(write_timeout, sink.send(Message::Close(None))).await;
                    return Ok(());
                }
            },
            message = stream.next() => match message {
                Some(Ok(Message::Close(_))) | None => return Ok(()),
                // Pongs are queued by tungstenite; inbound data is ignored
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(Error::Transport(e.to_string())),
            },
        }
    }
}
