//! Multiplexing layer
//!
//! Turns one packet transport into many independently-closable logical
//! channels:
//! - connection handshake (CNXN/AUTH exchange, version negotiation)
//! - channel lifecycle state machine (OPEN/OKAY/WRTE/CLSE)
//! - per-channel flow control (single outstanding write)
//! - reverse tunnel registry for device-initiated channels

mod auth;
mod channel;
mod reverse;
mod session;

pub use auth::{AdbSigner, AUTH_RSAPUBLICKEY, AUTH_SIGNATURE, AUTH_TOKEN};
pub use channel::Channel;
pub use reverse::{IncomingHandler, ReverseTunnels};
pub use session::{DeviceBanner, Session, SessionConfig};

use thiserror::Error;

/// Multiplexer errors
#[derive(Debug, Error)]
pub enum MuxError {
    #[error("Channel open rejected by peer: {0}")]
    Rejected(String),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Session closed")]
    SessionClosed,

    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("Device requires authentication but no signer was configured")]
    AuthRequired,

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),
}

/// Highest protocol version this client speaks
pub const VERSION: u32 = 0x0100_0001;

/// Lowest protocol version this client accepts
pub const VERSION_MIN: u32 = 0x0100_0000;

/// From this version on, payload checksums are sent as zero and not
/// verified on receipt
pub const VERSION_SKIP_CHECKSUM: u32 = 0x0100_0001;

/// Maximum payload size offered at handshake (1 MiB)
pub const MAX_PAYLOAD_SIZE: u32 = 1024 * 1024;

/// Handshake timeout in seconds
pub const HANDSHAKE_TIMEOUT: u64 = 30;

/// Upper bound on AUTH round-trips before the handshake is abandoned
pub const MAX_AUTH_ROUNDS: u32 = 4;
