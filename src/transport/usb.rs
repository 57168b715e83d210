//! USB transport (bulk endpoint pair)
//!
//! The ADB daemon sends each packet as two independent bulk transfers: the
//! 24-byte header, then the payload (only when non-empty). Reads that are
//! not exactly 24 bytes while a header is expected, and headers whose
//! magic check fails, are protocol noise: discarded and retried, never
//! surfaced.
//!
//! On the write side, USB bulk transfers only signal end-of-transfer to
//! the device via a short (non-full-size) final packet. Header and payload
//! are therefore written as separate transfers, and a payload whose length
//! is a positive multiple of the OUT endpoint's max packet size is
//! followed by one zero-length transfer.

use super::{Connection, TransportError};
use crate::packet::{Command, Packet, PacketHeader, HEADER_SIZE};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Grace interval after a failed transfer before deciding whether the
/// failure was a disconnect already being handled elsewhere
const DISCONNECT_GRACE: Duration = Duration::from_millis(100);

/// Interface filter for selecting the ADB function on a composite device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsbInterfaceFilter {
    pub class_code: u8,
    pub subclass_code: u8,
    pub protocol_code: u8,
}

/// The ADB interface triple as defined by Google
pub const ADB_INTERFACE_FILTER: UsbInterfaceFilter = UsbInterfaceFilter {
    class_code: 0xff,
    subclass_code: 0x42,
    protocol_code: 1,
};

/// The claimed bulk endpoint pair
#[derive(Debug, Clone, Copy)]
pub struct UsbEndpoints {
    /// Max packet size of the IN endpoint
    pub in_max_packet: usize,
    /// Max packet size of the OUT endpoint
    pub out_max_packet: usize,
}

/// Raw USB device collaborator
///
/// Platform glue implements this over the OS USB stack. `claim` must open
/// the device, select the configuration/interface/alternate setting whose
/// class triple matches the filter, and claim that interface; if the
/// interface is held by another process it must fail with
/// [`TransportError::DeviceBusy`], not a generic IO error.
#[async_trait]
pub trait UsbDevice: Send + Sync {
    async fn claim(&mut self, filter: &UsbInterfaceFilter)
        -> Result<UsbEndpoints, TransportError>;

    /// One bulk IN transfer of up to `max_len` bytes
    async fn transfer_in(&mut self, max_len: usize) -> Result<Bytes, TransportError>;

    /// One bulk OUT transfer; an empty slice is a zero-length packet
    async fn transfer_out(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Release the claimed interface and close the device
    async fn release(&mut self) -> Result<(), TransportError>;
}

/// Handle for hotplug glue to flag a physical disconnect
///
/// A disconnect may surface as a transfer failure before the platform's
/// disconnect notification fires; marking the handle lets the connection
/// suppress that racing error instead of propagating it as fatal.
#[derive(Debug, Clone)]
pub struct DisconnectHandle(Arc<AtomicBool>);

impl DisconnectHandle {
    pub fn mark_disconnected(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_disconnected(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Packet framing over a claimed USB bulk endpoint pair
///
/// A header whose payload transfer has not completed yet is parked in
/// `pending_header`, so `read_packet` is safe to use inside `select!`.
#[derive(Debug)]
pub struct UsbConnection<D: UsbDevice> {
    device: D,
    endpoints: UsbEndpoints,
    closed: Arc<AtomicBool>,
    pending_header: Option<PacketHeader>,
}

impl<D: UsbDevice> UsbConnection<D> {
    /// Claim the ADB interface on `device` and wrap it
    pub async fn open(device: D) -> Result<Self, TransportError> {
        Self::open_with_filter(device, &ADB_INTERFACE_FILTER).await
    }

    /// Claim an interface matching `filter` and wrap the device
    pub async fn open_with_filter(
        mut device: D,
        filter: &UsbInterfaceFilter,
    ) -> Result<Self, TransportError> {
        let endpoints = device.claim(filter).await?;
        debug!(
            in_max_packet = endpoints.in_max_packet,
            out_max_packet = endpoints.out_max_packet,
            "claimed ADB interface"
        );
        Ok(Self {
            device,
            endpoints,
            closed: Arc::new(AtomicBool::new(false)),
            pending_header: None,
        })
    }

    /// The claimed endpoint pair
    pub fn endpoints(&self) -> UsbEndpoints {
        self.endpoints
    }

    /// Handle for the platform's disconnect notification to mark this
    /// connection as intentionally closing
    pub fn disconnect_handle(&self) -> DisconnectHandle {
        DisconnectHandle(Arc::clone(&self.closed))
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Classify a transfer failure: wait out the disconnect race, then
    /// either suppress (transport closing) or propagate as fatal
    async fn check_disconnect_race(&self, err: TransportError) -> TransportError {
        tokio::time::sleep(DISCONNECT_GRACE).await;
        if self.is_closed() {
            return TransportError::Closed;
        }
        err
    }
}

#[async_trait]
impl<D: UsbDevice> Connection for UsbConnection<D> {
    async fn read_packet(&mut self) -> Result<Packet, TransportError> {
        loop {
            if self.is_closed() {
                return Err(TransportError::Closed);
            }

            let header = match self.pending_header.take() {
                Some(header) => header,
                None => {
                    let in_len = self.endpoints.in_max_packet.max(HEADER_SIZE);
                    let data = match self.device.transfer_in(in_len).await {
                        Ok(data) => data,
                        Err(e) => return Err(self.check_disconnect_race(e).await),
                    };

                    // The daemon always sends the header as its own
                    // 24-byte transfer; anything else is noise.
                    if data.len() != HEADER_SIZE {
                        trace!(len = data.len(), "discarding non-header transfer");
                        continue;
                    }

                    let header = match PacketHeader::decode(&data) {
                        Ok(header) => header,
                        Err(_) => continue,
                    };

                    if !header.magic_ok() {
                        trace!(
                            command = format_args!("{:#010x}", header.command),
                            "discarding header with bad magic"
                        );
                        continue;
                    }

                    header
                }
            };

            let payload = if header.payload_length > 0 {
                // Park the header so a cancelled payload read resumes
                // here instead of re-reading a header
                self.pending_header = Some(header);
                let payload = match self
                    .device
                    .transfer_in(header.payload_length as usize)
                    .await
                {
                    Ok(payload) => payload,
                    Err(e) => return Err(self.check_disconnect_race(e).await),
                };
                self.pending_header = None;
                payload
            } else {
                Bytes::new()
            };

            let command = match Command::try_from(header.command) {
                Ok(command) => command,
                Err(_) => {
                    trace!(
                        command = format_args!("{:#010x}", header.command),
                        "discarding packet with unknown command"
                    );
                    continue;
                }
            };

            return Ok(Packet {
                command,
                arg0: header.arg0,
                arg1: header.arg1,
                checksum: header.checksum,
                payload,
            });
        }
    }

    async fn write_packet(&mut self, packet: &Packet) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        self.device
            .transfer_out(&packet.header().encode())
            .await?;

        if packet.payload.is_empty() {
            return Ok(());
        }

        self.device.transfer_out(&packet.payload).await?;

        // A full-size final packet would leave the device waiting for
        // more; terminate the transfer with a zero-length packet.
        let max = self.endpoints.out_max_packet;
        if max > 0 && packet.payload.len() % max == 0 {
            self.device.transfer_out(&[]).await?;
        }

        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        self.device.release().await
    }
}
