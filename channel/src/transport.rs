//! Transport seam between the correlator and the realtime socket.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use crate::envelope::ClientEnvelope;
use crate::ChannelError;

/// Outbound half of a realtime connection.
///
/// Inbound events travel separately as an
/// `mpsc::Receiver<RawBroadcast>` handed to the correlator, preserving
/// transport delivery order.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Emit one envelope on the connection.
    async fn send(&self, envelope: &ClientEnvelope) -> Result<(), ChannelError>;

    /// Resolve once the connection is ready to carry traffic.
    /// Errors if the connection is gone.
    async fn wait_connected(&self) -> Result<(), ChannelError>;

    /// Close the connection.
    async fn close(&self) -> Result<(), ChannelError>;
}

/// In-process loopback transport.
///
/// Outgoing envelopes surface on the paired receiver so a test (or an
/// embedded agent) can play the other side of the conversation.
pub struct PipeTransport {
    sent_tx: mpsc::Sender<ClientEnvelope>,
    connected: AtomicBool,
}

impl PipeTransport {
    /// Create a transport plus the receiver of everything it sends.
    pub fn new() -> (Self, mpsc::Receiver<ClientEnvelope>) {
        let (sent_tx, sent_rx) = mpsc::channel(64);
        (
            Self {
                sent_tx,
                connected: AtomicBool::new(true),
            },
            sent_rx,
        )
    }
}

#[async_trait::async_trait]
impl Transport for PipeTransport {
    async fn send(&self, envelope: &ClientEnvelope) -> Result<(), ChannelError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ChannelError::Closed);
        }
        self.sent_tx
            .send(envelope.clone())
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
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}
