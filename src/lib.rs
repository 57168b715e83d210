//! # adb-mux
//!
//! A client-side implementation of the Android Debug Bridge (ADB) wire
//! protocol: the framed, checksummed packet protocol that multiplexes many
//! independent, ordered byte streams ("sockets") over one physical
//! transport, either a USB bulk-endpoint pair or a stream socket.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Consumer Protocols                   │
//! │        (file sync, shell, host commands, ...)        │
//! ├─────────────────────────────────────────────────────┤
//! │                 Multiplexing Layer                   │
//! │     (Session, channel lifecycle, flow control,       │
//! │      reverse tunnel registry)                        │
//! ├─────────────────────────────────────────────────────┤
//! │                   Packet Codec                       │
//! │     (24-byte header, checksum, magic validation)     │
//! ├─────────────────────────────────────────────────────┤
//! │                 Physical Transport                   │
//! │         (USB bulk endpoints, TCP stream)             │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Consumer protocols (file sync, interactive shell, the host server's
//! text protocol) are not part of this crate; they open channels through
//! [`Session::open`] and speak their own framing on top.

pub mod config;
pub mod mux;
pub mod packet;
pub mod transport;

pub use config::Config;
pub use mux::{Channel, Session};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Packet error: {0}")]
    Packet(#[from] packet::PacketError),

    #[error("Transport error: {0}")]
    Transport(#[from] transport::TransportError),

    #[error("Multiplexer error: {0}")]
    Mux(#[from] mux::MuxError),

    #[error("Configuration error: {0}")]
    Config(String),
}
