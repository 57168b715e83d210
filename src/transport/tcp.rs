//! Stream transport (TCP devices and emulators)
//!
//! A device peer on a byte stream sends packets as a 24-byte header
//! immediately followed by the payload. Unlike USB there are no transfer
//! boundaries to recover on, so a magic mismatch here means the stream is
//! desynchronized beyond repair and the connection is fatal.

use super::{Connection, TransportConfig, TransportError};
use crate::packet::{Command, Packet, PacketHeader, HEADER_SIZE};
use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpSocket, TcpStream};

/// Packet framing over any duplex byte stream
///
/// Partially-read packets are kept in an internal buffer, so
/// `read_packet` is safe to use inside `select!`.
pub struct StreamConnection<S> {
    stream: S,
    read_buf: BytesMut,
}

/// Stream connection over TCP, the usual case
pub type TcpConnection = StreamConnection<TcpStream>;

impl TcpConnection {
    /// Connect to a device listening on `addr` (typically port 5555)
    pub async fn connect(addr: &str, config: &TransportConfig) -> Result<Self, TransportError> {
        let timeout = std::time::Duration::from_secs(config.connect_timeout);

        let stream = tokio::time::timeout(timeout, Self::dial(addr, config))
            .await
            .map_err(|_| TransportError::Timeout)??;

        stream.set_nodelay(true).ok();

        Ok(Self::new(stream))
    }

    async fn dial(addr: &str, config: &TransportConfig) -> Result<TcpStream, TransportError> {
        let target = tokio::net::lookup_host(addr)
            .await?
            .next()
            .ok_or_else(|| {
                TransportError::ConnectionFailed(format!("no usable address for {}", addr))
            })?;

        let socket = if target.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        if config.keepalive {
            socket.set_keepalive(true).ok();
        }

        Ok(socket.connect(target).await?)
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> StreamConnection<S> {
    /// Wrap an already-established stream
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(4096),
        }
    }
}

#[async_trait]
impl<S: AsyncRead + AsyncWrite + Unpin + Send> Connection for StreamConnection<S> {
    async fn read_packet(&mut self) -> Result<Packet, TransportError> {
        loop {
            if self.read_buf.len() >= HEADER_SIZE {
                let header = PacketHeader::decode(&self.read_buf)
                    .map_err(|e| TransportError::Desync(e.to_string()))?;

                if !header.magic_ok() {
                    return Err(TransportError::Desync(format!(
                        "magic {:#010x} does not match command {:#010x}",
                        header.magic, header.command
                    )));
                }

                let total = HEADER_SIZE + header.payload_length as usize;
                if self.read_buf.len() >= total {
                    let command = Command::try_from(header.command)
                        .map_err(|e| TransportError::Desync(e.to_string()))?;

                    self.read_buf.advance(HEADER_SIZE);
                    let payload = self
                        .read_buf
                        .split_to(header.payload_length as usize)
                        .freeze();

                    return Ok(Packet {
                        command,
                        arg0: header.arg0,
                        arg1: header.arg1,
                        checksum: header.checksum,
                        payload,
                    });
                }

                self.read_buf.reserve(total - self.read_buf.len());
            }

            let n = self
                .stream
                .read_buf(&mut self.read_buf)
                .await
                .map_err(TransportError::Io)?;
            if n == 0 {
                if self.read_buf.is_empty() {
                    return Err(TransportError::Closed);
                }
                return Err(TransportError::Desync(format!(
                    "stream ended mid-packet with {} bytes buffered",
                    self.read_buf.len()
                )));
            }
        }
    }

    async fn write_packet(&mut self, packet: &Packet) -> Result<(), TransportError> {
        self.stream
            .write_all(&packet.header().encode())
            .await
            .map_err(TransportError::Io)?;

        if !packet.payload.is_empty() {
            self.stream
                .write_all(&packet.payload)
                .await
                .map_err(TransportError::Io)?;
        }

        self.stream.flush().await.map_err(TransportError::Io)?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.stream.shutdown().await.ok();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_packet_over_duplex() {
        let (a, b) = tokio::io::duplex(4096);
        let mut left = StreamConnection::new(a);
        let mut right = StreamConnection::new(b);

        let sent = Packet::new(Command::Write, 1, 2, Bytes::from_static(b"payload"));
        left.write_packet(&sent).await.unwrap();

        let got = right.read_packet().await.unwrap();
        assert_eq!(got.command, Command::Write);
        assert_eq!(got.arg0, 1);
        assert_eq!(got.arg1, 2);
        assert_eq!(&got.payload[..], b"payload");
        assert_eq!(got.checksum, sent.checksum);
    }

    #[tokio::test]
    async fn test_empty_payload_packet() {
        let (a, b) = tokio::io::duplex(4096);
        let mut left = StreamConnection::new(a);
        let mut right = StreamConnection::new(b);

        left.write_packet(&Packet::new(Command::Okay, 3, 4, Bytes::new()))
            .await
            .unwrap();

        let got = right.read_packet().await.unwrap();
        assert_eq!(got.command, Command::Okay);
        assert!(got.payload.is_empty());
    }

    #[tokio::test]
    async fn test_magic_mismatch_is_desync() {
        let (a, b) = tokio::io::duplex(4096);
        let mut right = StreamConnection::new(b);

        let mut header = Packet::new(Command::Okay, 0, 0, Bytes::new()).header();
        header.magic = 0;
        let mut raw = a;
        raw.write_all(&header.encode()).await.unwrap();

        let err = right.read_packet().await.unwrap_err();
        assert!(matches!(err, TransportError::Desync(_)));
    }

    #[tokio::test]
    async fn test_peer_close_reported_as_closed() {
        let (a, b) = tokio::io::duplex(4096);
        let mut right = StreamConnection::new(b);
        drop(a);

        let err = right.read_packet().await.unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[tokio::test]
    async fn test_tcp_connect_and_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut conn = StreamConnection::new(socket);
            let packet = conn.read_packet().await.unwrap();
            conn.write_packet(&packet).await.unwrap();
        });

        let mut conn = TcpConnection::connect(&addr.to_string(), &TransportConfig::default())
            .await
            .unwrap();

        let sent = Packet::new(Command::Open, 9, 0, Bytes::from_static(b"shell:\0"));
        conn.write_packet(&sent).await.unwrap();

        let echoed = conn.read_packet().await.unwrap();
        assert_eq!(echoed.command, Command::Open);
        assert_eq!(&echoed.payload[..], b"shell:\0");

        conn.close().await.unwrap();
        server.await.unwrap();
    }
}
