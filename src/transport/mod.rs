//! Physical transport implementations
//!
//! Provides pluggable transport backends beneath the packet protocol:
//! - TCP (a device listening on tcp:5555, or a local emulator)
//! - USB bulk endpoint pairs (via a platform [`UsbDevice`] backend)
//!
//! A transport carries whole packets. The USB variant must preserve USB
//! transfer boundaries (header and payload are separate transfers); the
//! stream variant concatenates them on a plain byte stream.

mod tcp;
mod usb;

pub use tcp::{StreamConnection, TcpConnection};
pub use usb::{
    DisconnectHandle, UsbConnection, UsbDevice, UsbEndpoints, UsbInterfaceFilter,
    ADB_INTERFACE_FILTER,
};

use crate::packet::Packet;
use async_trait::async_trait;
use std::io;
use thiserror::Error;

/// Transport layer errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Interface already claimed by another process")]
    DeviceBusy,

    #[error("Stream desynchronized: {0}")]
    Desync(String),

    #[error("Connection closed")]
    Closed,

    #[error("Timeout")]
    Timeout,
}

/// A physical transport carrying whole ADB packets
///
/// Implementations own exactly one underlying device or stream. One
/// [`crate::mux::Session`] takes exclusive ownership of a connection;
/// channels never touch it directly.
#[async_trait]
pub trait Connection: Send {
    /// Read the next packet, blocking until one arrives
    ///
    /// Protocol noise (malformed transfer sizes, magic mismatches) is
    /// resolved internally where the transport permits; only terminal
    /// failures surface here.
    async fn read_packet(&mut self) -> Result<Packet, TransportError>;

    /// Write one packet
    ///
    /// The caller must serialize calls; the multiplexer's event loop is
    /// the single writer.
    async fn write_packet(&mut self, packet: &Packet) -> Result<(), TransportError>;

    /// Close the transport
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Connection timeout in seconds
    pub connect_timeout: u64,
    /// Enable TCP keepalive
    pub keepalive: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: 30,
            keepalive: true,
        }
    }
}
