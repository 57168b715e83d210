//! Session: handshake and channel multiplexing
//!
//! A [`Session`] owns one packet transport. A single event-loop task holds
//! the channel table and is the only writer, so no two packets ever
//! interleave and the table needs no locking. Callers talk to the loop
//! through a command channel; per-channel data flows back through
//! per-channel queues.

use super::auth::{self, AUTH_RSAPUBLICKEY, AUTH_SIGNATURE, AUTH_TOKEN};
use super::channel::Channel;
use super::reverse::{IncomingHandler, ReverseTunnels};
use super::{
    AdbSigner, MuxError, HANDSHAKE_TIMEOUT, MAX_AUTH_ROUNDS, MAX_PAYLOAD_SIZE, VERSION,
    VERSION_MIN, VERSION_SKIP_CHECKSUM,
};
use crate::packet::{Command, Packet};
use crate::transport::{Connection, TransportError};
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Session configuration: our side of the CNXN exchange
#[derive(Clone)]
pub struct SessionConfig {
    /// System identity sent in the banner, normally `host`
    pub identity: String,
    /// Feature list advertised in the banner
    pub features: Vec<String>,
    /// Maximum payload size offered to the device
    pub max_payload: u32,
    /// Signer for the AUTH exchange; without one, devices that require
    /// authentication cannot be connected
    pub signer: Option<Arc<dyn AdbSigner>>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            identity: "host".to_string(),
            features: vec![
                "shell_v2".to_string(),
                "cmd".to_string(),
                "stat_v2".to_string(),
            ],
            max_payload: MAX_PAYLOAD_SIZE,
            signer: None,
        }
    }
}

impl SessionConfig {
    fn banner(&self) -> Bytes {
        let banner = if self.features.is_empty() {
            format!("{}::\0", self.identity)
        } else {
            format!("{}::features={}\0", self.identity, self.features.join(","))
        };
        Bytes::from(banner)
    }
}

/// Device identity parsed from the peer's CNXN banner
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceBanner {
    /// System type, e.g. `device`, `bootloader`, `recovery`
    pub system_type: String,
    pub product: Option<String>,
    pub model: Option<String>,
    pub device: Option<String>,
    /// Features supported by the device daemon
    pub features: Vec<String>,
}

impl DeviceBanner {
    /// Parse a banner of the form
    /// `device::ro.product.name=x;ro.product.model=y;features=a,b`
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim_end_matches('\0');
        let (system_type, props) = raw.split_once("::").unwrap_or((raw, ""));

        let mut banner = Self {
            system_type: system_type.to_string(),
            ..Self::default()
        };

        for prop in props.split(';').filter(|p| !p.is_empty()) {
            let Some((key, value)) = prop.split_once('=') else {
                continue;
            };
            match key {
                "ro.product.name" => banner.product = Some(value.to_string()),
                "ro.product.model" => banner.model = Some(value.to_string()),
                "ro.product.device" => banner.device = Some(value.to_string()),
                "features" => {
                    banner.features = value.split(',').map(str::to_string).collect();
                }
                _ => {}
            }
        }

        banner
    }

    /// Whether the device daemon advertises a feature
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }
}

/// Commands from channel handles and the session handle to the event loop
pub(crate) enum SessionCommand {
    Open {
        service: String,
        reply: oneshot::Sender<Result<Channel, MuxError>>,
    },
    Write {
        local_id: u32,
        data: Bytes,
        reply: oneshot::Sender<Result<(), MuxError>>,
    },
    Close {
        local_id: u32,
    },
    AddReverse {
        local_address: Option<String>,
        handler: IncomingHandler,
        reply: oneshot::Sender<String>,
    },
    RemoveReverse {
        local_address: String,
        reply: oneshot::Sender<()>,
    },
    ClearReverse {
        reply: oneshot::Sender<()>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// One handshake-established multiplexing context over one transport
///
/// Note on flow control: inbound WRTE packets are acknowledged with OKAY
/// as soon as they are queued for the reader, not when the reader actually
/// consumes them. Native ADB behaves the same way, and peers depend on it,
/// so a slow consumer buffers without backpressure here. This is
/// deliberate wire-compatible behavior.
pub struct Session {
    cmd_tx: mpsc::Sender<SessionCommand>,
    banner: DeviceBanner,
    version: u32,
    max_payload: u32,
    task: Option<JoinHandle<()>>,
}

impl Session {
    /// Run the CNXN/AUTH handshake on `conn` and start the multiplexer
    ///
    /// Fails if the device rejects our credentials, speaks an unsupported
    /// protocol version, or the exchange does not finish within
    /// [`HANDSHAKE_TIMEOUT`].
    pub async fn handshake<C: Connection + 'static>(
        conn: C,
        config: SessionConfig,
    ) -> Result<Self, MuxError> {
        let timeout = Duration::from_secs(HANDSHAKE_TIMEOUT);
        tokio::time::timeout(timeout, Self::handshake_inner(conn, config))
            .await
            .map_err(|_| MuxError::HandshakeFailed("timed out".to_string()))?
    }

    async fn handshake_inner<C: Connection + 'static>(
        mut conn: C,
        config: SessionConfig,
    ) -> Result<Self, MuxError> {
        // Version is unknown until the peer's CNXN arrives, so handshake
        // packets always carry checksums
        conn.write_packet(&Packet::new(
            Command::Connect,
            VERSION,
            config.max_payload,
            config.banner(),
        ))
        .await?;

        let mut auth_rounds = 0u32;
        let (device_version, device_max_payload, banner) = loop {
            let packet = conn.read_packet().await?;
            match packet.command {
                Command::Auth if packet.arg0 == AUTH_TOKEN => {
                    auth_rounds += 1;
                    if auth_rounds > MAX_AUTH_ROUNDS {
                        return Err(MuxError::HandshakeFailed(
                            "device rejected credentials".to_string(),
                        ));
                    }

                    let signer = config.signer.as_deref().ok_or(MuxError::AuthRequired)?;
                    let response = if auth_rounds == 1 {
                        // First token: prove we hold a known key
                        let signature = signer.sign(&packet.payload)?;
                        Packet::new(Command::Auth, AUTH_SIGNATURE, 0, Bytes::from(signature))
                    } else {
                        // Signature not accepted: offer the public key so
                        // the device can ask the user to trust it
                        Packet::new(
                            Command::Auth,
                            AUTH_RSAPUBLICKEY,
                            0,
                            auth::public_key_payload(signer),
                        )
                    };
                    conn.write_packet(&response).await?;
                }
                Command::Connect => {
                    let banner = String::from_utf8_lossy(&packet.payload).into_owned();
                    break (packet.arg0, packet.arg1, banner);
                }
                other => {
                    return Err(MuxError::HandshakeFailed(format!(
                        "unexpected {:?} during handshake",
                        other
                    )));
                }
            }
        };

        let version = device_version.min(VERSION);
        if version < VERSION_MIN {
            return Err(MuxError::HandshakeFailed(format!(
                "unsupported protocol version {:#010x}",
                device_version
            )));
        }

        let max_payload = if device_max_payload == 0 {
            config.max_payload
        } else {
            config.max_payload.min(device_max_payload)
        };

        let banner = DeviceBanner::parse(&banner);
        debug!(
            version = format_args!("{:#010x}", version),
            max_payload,
            system_type = %banner.system_type,
            "handshake complete"
        );

        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let dispatcher = Dispatcher {
            conn,
            cmd_rx,
            // Weak so the loop exits when every handle is gone
            cmd_tx: cmd_tx.downgrade(),
            channels: HashMap::new(),
            next_local_id: 1,
            reverse: ReverseTunnels::new(),
            max_payload,
            // Older peers require checksums on every payload
            use_checksum: version < VERSION_SKIP_CHECKSUM,
        };
        let task = tokio::spawn(dispatcher.run());

        Ok(Self {
            cmd_tx,
            banner,
            version,
            max_payload,
            task: Some(task),
        })
    }

    /// Device identity from the handshake banner
    pub fn banner(&self) -> &DeviceBanner {
        &self.banner
    }

    /// Negotiated protocol version
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Negotiated maximum payload per packet
    pub fn max_payload(&self) -> u32 {
        self.max_payload
    }

    /// Open a channel for a service string, e.g. `shell,v2,raw:echo hi`
    ///
    /// Resolves once the peer acknowledges with OKAY; fails with
    /// [`MuxError::Rejected`] if the peer answers CLSE instead.
    pub async fn open(&self, service: &str) -> Result<Channel, MuxError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCommand::Open {
                service: service.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| MuxError::SessionClosed)?;
        reply_rx.await.map_err(|_| MuxError::SessionClosed)?
    }

    /// Register a handler for device-initiated channels
    ///
    /// `None` or `tcp:0` as the local address means "pick a port".
    /// Returns the local address the entry is registered under; pass it to
    /// the device's `reverse:forward` service to advertise it.
    pub async fn add_reverse_tunnel(
        &self,
        handler: IncomingHandler,
        local_address: Option<String>,
    ) -> Result<String, MuxError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCommand::AddReverse {
                local_address,
                handler,
                reply: reply_tx,
            })
            .await
            .map_err(|_| MuxError::SessionClosed)?;
        reply_rx.await.map_err(|_| MuxError::SessionClosed)
    }

    /// Unregister a reverse tunnel; unknown addresses are a no-op
    ///
    /// Resolves only once the registry change is applied, so no channel
    /// toward the address is bridged after this returns.
    pub async fn remove_reverse_tunnel(&self, local_address: &str) -> Result<(), MuxError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCommand::RemoveReverse {
                local_address: local_address.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| MuxError::SessionClosed)?;
        reply_rx.await.map_err(|_| MuxError::SessionClosed)
    }

    /// Unregister all reverse tunnels
    pub async fn clear_reverse_tunnels(&self) -> Result<(), MuxError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCommand::ClearReverse { reply: reply_tx })
            .await
            .map_err(|_| MuxError::SessionClosed)?;
        reply_rx.await.map_err(|_| MuxError::SessionClosed)
    }

    /// Close the session: every open channel transitions to closed and the
    /// transport is shut down
    pub async fn close(&mut self) -> Result<(), MuxError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(SessionCommand::Shutdown { reply: reply_tx })
            .await
            .is_ok()
        {
            let _ = reply_rx.await;
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        Ok(())
    }
}

/// Per-channel lifecycle state owned by the event loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelState {
    /// OPEN sent, OKAY pending
    Opening,
    /// Peer acknowledged; remote id known
    Open,
}

struct ChannelEntry {
    state: ChannelState,
    remote_id: u32,
    service: String,
    data_tx: mpsc::UnboundedSender<Bytes>,
    /// Resolved when the peer answers our OPEN
    pending_open: Option<(oneshot::Sender<Result<Channel, MuxError>>, Channel)>,
    /// Outstanding WRTE awaiting its OKAY
    pending_ack: Option<oneshot::Sender<Result<(), MuxError>>>,
    /// Writes queued behind the outstanding one
    write_queue: VecDeque<(Bytes, oneshot::Sender<Result<(), MuxError>>)>,
}

struct Dispatcher<C: Connection> {
    conn: C,
    cmd_rx: mpsc::Receiver<SessionCommand>,
    cmd_tx: mpsc::WeakSender<SessionCommand>,
    channels: HashMap<u32, ChannelEntry>,
    next_local_id: u32,
    reverse: ReverseTunnels,
    max_payload: u32,
    use_checksum: bool,
}

impl<C: Connection> Dispatcher<C> {
    async fn run(mut self) {
        loop {
            tokio::select! {
                packet = self.conn.read_packet() => match packet {
                    Ok(packet) => {
                        if let Err(e) = self.handle_packet(packet).await {
                            debug!(error = %e, "session loop stopping");
                            break;
                        }
                    }
                    Err(TransportError::Closed) => {
                        debug!("transport closed");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "transport failed");
                        break;
                    }
                },
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(SessionCommand::Shutdown { reply }) => {
                        self.shutdown().await;
                        let _ = reply.send(());
                        return;
                    }
                    Some(cmd) => {
                        if let Err(e) = self.handle_command(cmd).await {
                            debug!(error = %e, "session loop stopping");
                            break;
                        }
                    }
                    // All handles dropped
                    None => {
                        self.shutdown().await;
                        return;
                    }
                },
            }
        }
        self.teardown();
    }

    fn make_packet(&self, command: Command, arg0: u32, arg1: u32, payload: Bytes) -> Packet {
        if self.use_checksum {
            Packet::new(command, arg0, arg1, payload)
        } else {
            Packet::unchecked(command, arg0, arg1, payload)
        }
    }

    async fn send(
        &mut self,
        command: Command,
        arg0: u32,
        arg1: u32,
        payload: Bytes,
    ) -> Result<(), TransportError> {
        let packet = self.make_packet(command, arg0, arg1, payload);
        self.conn.write_packet(&packet).await
    }

    async fn handle_packet(&mut self, packet: Packet) -> Result<(), TransportError> {
        if self.use_checksum && !packet.payload.is_empty() {
            if let Err(e) = packet.verify_checksum() {
                warn!(command = ?packet.command, error = %e, "dropping corrupt packet");
                return Ok(());
            }
        }

        match packet.command {
            Command::Okay => self.handle_okay(packet.arg0, packet.arg1).await,
            Command::Write => {
                self.handle_write(packet.arg0, packet.arg1, packet.payload)
                    .await
            }
            Command::Close => {
                self.handle_close(packet.arg1);
                Ok(())
            }
            Command::Open => self.handle_open(packet.arg0, packet.payload).await,
            Command::Connect | Command::Auth => {
                warn!(command = ?packet.command, "unexpected command after handshake");
                Ok(())
            }
        }
    }

    /// OKAY(remote_id, local_id): open acknowledgment or write acknowledgment
    async fn handle_okay(&mut self, remote_id: u32, local_id: u32) -> Result<(), TransportError> {
        let Some(entry) = self.channels.get_mut(&local_id) else {
            trace!(local_id, "OKAY for unknown channel");
            return Ok(());
        };

        if entry.state == ChannelState::Opening {
            entry.state = ChannelState::Open;
            entry.remote_id = remote_id;
            if let Some((reply, channel)) = entry.pending_open.take() {
                trace!(local_id, remote_id, service = %entry.service, "channel open");
                let _ = reply.send(Ok(channel));
            }
            return Ok(());
        }

        // Write acknowledged; release the window and send the next
        // queued write, if any
        if let Some(ack) = entry.pending_ack.take() {
            let _ = ack.send(Ok(()));
        }
        if let Some((data, reply)) = entry.write_queue.pop_front() {
            entry.pending_ack = Some(reply);
            let remote_id = entry.remote_id;
            self.send(Command::Write, local_id, remote_id, data).await?;
        }
        Ok(())
    }

    /// WRTE(remote_id, local_id, payload): deliver and ack immediately
    async fn handle_write(
        &mut self,
        remote_id: u32,
        local_id: u32,
        payload: Bytes,
    ) -> Result<(), TransportError> {
        let Some(entry) = self.channels.get_mut(&local_id) else {
            trace!(local_id, "WRTE for unknown channel, rejecting");
            return self.send(Command::Close, 0, remote_id, Bytes::new()).await;
        };

        // Receiver may have dropped the handle; data is discarded but the
        // channel stays open until CLSE
        let _ = entry.data_tx.send(payload);

        // Ack per packet, not per consumption: the peer may send its next
        // chunk as soon as it sees this OKAY
        let remote_id = entry.remote_id;
        self.send(Command::Okay, local_id, remote_id, Bytes::new())
            .await
    }

    /// CLSE for our channel `local_id`: remove it and fail anything pending
    fn handle_close(&mut self, local_id: u32) {
        let Some(entry) = self.channels.remove(&local_id) else {
            return;
        };

        trace!(local_id, service = %entry.service, "channel closed by peer");
        if let Some((reply, _channel)) = entry.pending_open {
            // CLSE in response to OPEN: the service was rejected
            let _ = reply.send(Err(MuxError::Rejected(entry.service)));
            return;
        }
        fail_pending_writes(entry, || MuxError::ChannelClosed);
    }

    /// OPEN(remote_id, 0, service): device-initiated channel, reverse tunnel
    async fn handle_open(&mut self, remote_id: u32, payload: Bytes) -> Result<(), TransportError> {
        let service = String::from_utf8_lossy(&payload)
            .trim_end_matches('\0')
            .to_string();

        let Some(handler) = self.reverse.get(&service) else {
            debug!(service = %service, "rejecting device-initiated channel");
            return self.send(Command::Close, 0, remote_id, Bytes::new()).await;
        };
        let Some(cmd_tx) = self.cmd_tx.upgrade() else {
            return self.send(Command::Close, 0, remote_id, Bytes::new()).await;
        };

        let local_id = self.allocate_local_id();
        let (data_tx, data_rx) = mpsc::unbounded_channel();
        let channel = Channel::new(
            local_id,
            service.clone(),
            self.max_payload as usize,
            cmd_tx,
            data_rx,
        );
        self.channels.insert(
            local_id,
            ChannelEntry {
                state: ChannelState::Open,
                remote_id,
                service: service.clone(),
                data_tx,
                pending_open: None,
                pending_ack: None,
                write_queue: VecDeque::new(),
            },
        );

        self.send(Command::Okay, local_id, remote_id, Bytes::new())
            .await?;
        debug!(local_id, remote_id, service = %service, "bridged device-initiated channel");
        handler(channel);
        Ok(())
    }

    async fn handle_command(&mut self, cmd: SessionCommand) -> Result<(), TransportError> {
        match cmd {
            SessionCommand::Open { service, reply } => {
                let Some(cmd_tx) = self.cmd_tx.upgrade() else {
                    let _ = reply.send(Err(MuxError::SessionClosed));
                    return Ok(());
                };

                let local_id = self.allocate_local_id();
                let (data_tx, data_rx) = mpsc::unbounded_channel();
                let channel = Channel::new(
                    local_id,
                    service.clone(),
                    self.max_payload as usize,
                    cmd_tx,
                    data_rx,
                );
                self.channels.insert(
                    local_id,
                    ChannelEntry {
                        state: ChannelState::Opening,
                        remote_id: 0,
                        service: service.clone(),
                        data_tx,
                        pending_open: Some((reply, channel)),
                        pending_ack: None,
                        write_queue: VecDeque::new(),
                    },
                );

                trace!(local_id, service = %service, "opening channel");
                self.send(
                    Command::Open,
                    local_id,
                    0,
                    Bytes::from(format!("{}\0", service)),
                )
                .await
            }
            SessionCommand::Write {
                local_id,
                data,
                reply,
            } => {
                let Some(entry) = self.channels.get_mut(&local_id) else {
                    let _ = reply.send(Err(MuxError::ChannelClosed));
                    return Ok(());
                };
                if entry.state != ChannelState::Open {
                    let _ = reply.send(Err(MuxError::ChannelClosed));
                    return Ok(());
                }

                // Single-outstanding-write window: hold this write back
                // until the previous WRTE's OKAY arrives
                if entry.pending_ack.is_some() {
                    entry.write_queue.push_back((data, reply));
                    return Ok(());
                }

                entry.pending_ack = Some(reply);
                let remote_id = entry.remote_id;
                self.send(Command::Write, local_id, remote_id, data).await
            }
            SessionCommand::Close { local_id } => {
                let Some(entry) = self.channels.remove(&local_id) else {
                    return Ok(());
                };

                trace!(local_id, service = %entry.service, "closing channel");
                let remote_id = entry.remote_id;
                let notify_peer = entry.state == ChannelState::Open;
                fail_pending_writes(entry, || MuxError::ChannelClosed);
                if notify_peer {
                    self.send(Command::Close, local_id, remote_id, Bytes::new())
                        .await?;
                }
                Ok(())
            }
            SessionCommand::AddReverse {
                local_address,
                handler,
                reply,
            } => {
                let address = self.reverse.add(handler, local_address);
                let _ = reply.send(address);
                Ok(())
            }
            SessionCommand::RemoveReverse {
                local_address,
                reply,
            } => {
                self.reverse.remove(&local_address);
                let _ = reply.send(());
                Ok(())
            }
            SessionCommand::ClearReverse { reply } => {
                self.reverse.clear();
                let _ = reply.send(());
                Ok(())
            }
            // Shutdown is intercepted in the event loop
            SessionCommand::Shutdown { reply } => {
                let _ = reply.send(());
                Ok(())
            }
        }
    }

    /// Explicit shutdown: tell the peer about every open channel, then
    /// close the transport
    async fn shutdown(&mut self) {
        let open: Vec<(u32, u32)> = self
            .channels
            .iter()
            .filter(|(_, e)| e.state == ChannelState::Open)
            .map(|(&local_id, e)| (local_id, e.remote_id))
            .collect();
        for (local_id, remote_id) in open {
            let _ = self
                .send(Command::Close, local_id, remote_id, Bytes::new())
                .await;
        }
        let _ = self.conn.close().await;
        self.teardown();
    }

    /// Release every channel and registry entry; pending operations
    /// unblock with a closed error
    fn teardown(&mut self) {
        debug!(channels = self.channels.len(), "tearing down session");
        for (_, entry) in self.channels.drain() {
            if let Some((reply, _channel)) = entry.pending_open {
                let _ = reply.send(Err(MuxError::SessionClosed));
                continue;
            }
            fail_pending_writes(entry, || MuxError::SessionClosed);
        }
        self.reverse.clear();
    }

    fn allocate_local_id(&mut self) -> u32 {
        loop {
            let id = self.next_local_id;
            self.next_local_id = self.next_local_id.checked_add(1).unwrap_or(1);
            if !self.channels.contains_key(&id) {
                return id;
            }
        }
    }
}

/// Fail an entry's outstanding and queued writes; dropping `data_tx`
/// lets the read side drain and observe end-of-stream
fn fail_pending_writes(entry: ChannelEntry, err: impl Fn() -> MuxError) {
    if let Some(ack) = entry.pending_ack {
        let _ = ack.send(Err(err()));
    }
    for (_, reply) in entry.write_queue {
        let _ = reply.send(Err(err()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_parse_full() {
        let banner = DeviceBanner::parse(
            "device::ro.product.name=sdk_gphone64;ro.product.model=Pixel 7;\
             ro.product.device=panther;features=shell_v2,cmd,stat_v2\0",
        );

        assert_eq!(banner.system_type, "device");
        assert_eq!(banner.product.as_deref(), Some("sdk_gphone64"));
        assert_eq!(banner.model.as_deref(), Some("Pixel 7"));
        assert_eq!(banner.device.as_deref(), Some("panther"));
        assert!(banner.has_feature("shell_v2"));
        assert!(!banner.has_feature("sendrecv_v2"));
    }

    #[test]
    fn test_banner_parse_bare() {
        let banner = DeviceBanner::parse("bootloader::");
        assert_eq!(banner.system_type, "bootloader");
        assert!(banner.product.is_none());
        assert!(banner.features.is_empty());
    }

    #[test]
    fn test_banner_parse_no_separator() {
        let banner = DeviceBanner::parse("garbage");
        assert_eq!(banner.system_type, "garbage");
        assert!(banner.features.is_empty());
    }

    #[test]
    fn test_local_banner_format() {
        let config = SessionConfig::default();
        let banner = config.banner();
        let text = std::str::from_utf8(&banner).unwrap();

        assert!(text.starts_with("host::features="));
        assert!(text.ends_with('\0'));
        assert!(text.contains("shell_v2"));

        let bare = SessionConfig {
            features: vec![],
            ..SessionConfig::default()
        };
        assert_eq!(&bare.banner()[..], b"host::\0");
    }
}
