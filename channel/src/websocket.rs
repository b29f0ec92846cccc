//! WebSocket transport.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::StreamExt;
use futures::SinkExt;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error};

use crate::envelope::{ClientEnvelope, RawBroadcast};
use crate::transport::Transport;
use crate::ChannelError;

/// WebSocket-backed [`Transport`].
///
/// A write task owns the sink; a read task parses text frames into
/// [`RawBroadcast`] events and forwards them in delivery order. Frames
/// that are not broadcasts are skipped.
pub struct WsTransport {
    write_tx: mpsc::Sender<Message>,
    connected: Arc<AtomicBool>,
    _read_handle: tokio::task::JoinHandle<()>,
    _write_handle: tokio::task::JoinHandle<()>,
}

impl WsTransport {
    /// Connect and return the transport plus the inbound event stream.
    pub async fn connect(url: &str) -> Result<(Self, mpsc::Receiver<RawBroadcast>), ChannelError> {
        debug!(url, "connecting");
        let (ws_stream, _response) = connect_async(url)
            .await
            .map_err(|e| ChannelError::Transport(format!("connect failed: {e}")))?;

        let (write, read) = ws_stream.split();

        let (event_tx, event_rx) = mpsc::channel(100);
        let (write_tx, write_rx) = mpsc::channel(100);
        let connected = Arc::new(AtomicBool::new(true));

        let write_handle = tokio::spawn(write_loop(write, write_rx));
        let read_handle = tokio::spawn(read_loop(read, event_tx, connected.clone()));

        Ok((
            Self {
                write_tx,
                connected,
                _read_handle: read_handle,
                _write_handle: write_handle,
            },
            event_rx,
        ))
    }
}

#[async_trait::async_trait]
impl Transport for WsTransport {
    async fn send(&self, envelope: &ClientEnvelope) -> Result<(), ChannelError> {
        let text = serde_json::to_string(envelope)
            .map_err(|e| ChannelError::Serialization(e.to_string()))?;
        self.write_tx
            .send(Message::Text(text.into()))
            .await
            .map_err(|_| ChannelError::Closed)
    }

    async fn wait_connected(&self) -> Result<(), ChannelError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ChannelError::Closed)
        }
    }

    async fn close(&self) -> Result<(), ChannelError> {
        let _ = self.write_tx.send(Message::Close(None)).await;
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

async fn write_loop(
    mut write: futures::stream::SplitSink<
        tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        Message,
    >,
    mut rx: mpsc::Receiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if let Message::Close(_) = msg {
            let _ = write.close().await;
            break;
        }
        if let Err(e) = write.send(msg).await {
            error!("write error: {e}");
            break;
        }
    }
}

async fn read_loop(
    mut read: futures::stream::SplitStream<
        tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
    >,
    tx: mpsc::Sender<RawBroadcast>,
    connected: Arc<AtomicBool>,
) {
    while let Some(result) = read.next().await {
        match result {
            Ok(Message::Text(text)) => {
                match serde_json::from_str::<RawBroadcast>(&text) {
                    Ok(raw) => {
                        if tx.send(raw).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!("skipping non-broadcast frame: {e}");
                    }
                }
            }
            Ok(Message::Close(_)) => {
                debug!("websocket closed by server");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                error!("read error: {e}");
                break;
            }
        }
    }
    connected.store(false, Ordering::SeqCst);
}
