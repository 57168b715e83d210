//! Reverse tunnel registry
//!
//! Maps externally-advertised addresses to local handlers for
//! device-initiated channels. The registry is owned by the session's event
//! loop; entries live at most as long as the session and are dropped
//! wholesale at teardown.

use super::Channel;
use std::collections::HashMap;
use std::sync::Arc;

/// Callback receiving a device-initiated channel
///
/// Invoked from the session event loop; handlers should hand the channel
/// off (typically via `tokio::spawn`) rather than block.
pub type IncomingHandler = Arc<dyn Fn(Channel) + Send + Sync>;

/// First port used for auto-allocated local addresses
const AUTO_PORT_BASE: u16 = 40000;

/// Session-scoped table of reverse tunnel entries
pub struct ReverseTunnels {
    entries: HashMap<String, IncomingHandler>,
    next_port: u16,
}

impl Default for ReverseTunnels {
    fn default() -> Self {
        Self::new()
    }
}

impl ReverseTunnels {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_port: AUTO_PORT_BASE,
        }
    }

    /// Register a handler, auto-allocating a `tcp:{port}` address when
    /// none is given. `tcp:0` means "pick a port" and is resolved the
    /// same way. Returns the local address the entry listens on.
    pub fn add(&mut self, handler: IncomingHandler, local_address: Option<String>) -> String {
        let address = match local_address {
            Some(address) if address != "tcp:0" => address,
            _ => self.allocate_address(),
        };
        self.entries.insert(address.clone(), handler);
        address
    }

    /// Remove an entry; removing an unknown address is a no-op
    pub fn remove(&mut self, local_address: &str) {
        self.entries.remove(local_address);
    }

    /// Drop all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Look up the handler for a device-initiated service string
    pub fn get(&self, service: &str) -> Option<IncomingHandler> {
        self.entries.get(service).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn allocate_address(&mut self) -> String {
        loop {
            let address = format!("tcp:{}", self.next_port);
            self.next_port = self.next_port.wrapping_add(1).max(AUTO_PORT_BASE);
            if !self.entries.contains_key(&address) {
                return address;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_handler() -> IncomingHandler {
        Arc::new(|_channel| {})
    }

    #[test]
    fn test_add_with_explicit_address() {
        let mut tunnels = ReverseTunnels::new();
        let addr = tunnels.add(noop_handler(), Some("tcp:8080".to_string()));

        assert_eq!(addr, "tcp:8080");
        assert!(tunnels.get("tcp:8080").is_some());
        assert!(tunnels.get("tcp:8081").is_none());
    }

    #[test]
    fn test_auto_allocated_addresses_are_distinct() {
        let mut tunnels = ReverseTunnels::new();
        let a = tunnels.add(noop_handler(), None);
        let b = tunnels.add(noop_handler(), None);

        assert_ne!(a, b);
        assert!(a.starts_with("tcp:"));
        assert_eq!(tunnels.len(), 2);
    }

    #[test]
    fn test_tcp_zero_resolves_to_a_port() {
        let mut tunnels = ReverseTunnels::new();
        let addr = tunnels.add(noop_handler(), Some("tcp:0".to_string()));

        assert_ne!(addr, "tcp:0");
        assert!(addr.starts_with("tcp:"));
        let port: u16 = addr.strip_prefix("tcp:").unwrap().parse().unwrap();
        assert_ne!(port, 0);

        // The entry lives under the resolved address, not the request
        assert!(tunnels.get(&addr).is_some());
        assert!(tunnels.get("tcp:0").is_none());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut tunnels = ReverseTunnels::new();
        tunnels.add(noop_handler(), Some("tcp:9000".to_string()));

        tunnels.remove("tcp:9000");
        assert!(tunnels.is_empty());

        // Unknown and repeated removals are no-ops
        tunnels.remove("tcp:9000");
        tunnels.remove("tcp:1234");
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut tunnels = ReverseTunnels::new();
        tunnels.add(noop_handler(), None);
        tunnels.add(noop_handler(), Some("tcp:7000".to_string()));

        tunnels.clear();
        assert!(tunnels.is_empty());
        assert!(tunnels.get("tcp:7000").is_none());
    }
}
