//! Channel handle
//!
//! A [`Channel`] is one logical bidirectional byte stream multiplexed over
//! the shared transport. The handle only talks to the session's event
//! loop; all channel bookkeeping lives there.

use super::session::SessionCommand;
use super::MuxError;
use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

/// One logical stream over the session
pub struct Channel {
    local_id: u32,
    service: String,
    max_payload: usize,
    cmd_tx: mpsc::Sender<SessionCommand>,
    data_rx: mpsc::UnboundedReceiver<Bytes>,
}

impl Channel {
    pub(crate) fn new(
        local_id: u32,
        service: String,
        max_payload: usize,
        cmd_tx: mpsc::Sender<SessionCommand>,
        data_rx: mpsc::UnboundedReceiver<Bytes>,
    ) -> Self {
        Self {
            local_id,
            service,
            max_payload,
            cmd_tx,
            data_rx,
        }
    }

    /// Local channel id, unique within the session
    pub fn id(&self) -> u32 {
        self.local_id
    }

    /// The service string this channel was opened for
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Read the next chunk of inbound data
    ///
    /// Chunks arrive in wire order, one per peer WRTE. Returns `None` once
    /// the channel is closed and all buffered data has been drained.
    pub async fn read(&mut self) -> Option<Bytes> {
        self.data_rx.recv().await
    }

    /// Write data to the channel
    ///
    /// Data is split at the session's negotiated max payload size; each
    /// piece is sent as one WRTE and awaited until the peer acknowledges
    /// it, so at most one write is ever outstanding per channel.
    pub async fn write(&self, data: &[u8]) -> Result<(), MuxError> {
        for chunk in data.chunks(self.max_payload.max(1)) {
            let (reply_tx, reply_rx) = oneshot::channel();
            self.cmd_tx
                .send(SessionCommand::Write {
                    local_id: self.local_id,
                    data: Bytes::copy_from_slice(chunk),
                    reply: reply_tx,
                })
                .await
                .map_err(|_| MuxError::SessionClosed)?;

            reply_rx.await.map_err(|_| MuxError::ChannelClosed)??;
        }
        Ok(())
    }

    /// Close the channel
    ///
    /// Close is full and bilateral: the peer is sent CLSE and the local id
    /// is released immediately.
    pub async fn close(&mut self) -> Result<(), MuxError> {
        self.cmd_tx
            .send(SessionCommand::Close {
                local_id: self.local_id,
            })
            .await
            .map_err(|_| MuxError::SessionClosed)
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        // Best effort; the session also reaps the entry at teardown
        let _ = self.cmd_tx.try_send(SessionCommand::Close {
            local_id: self.local_id,
        });
    }
}
