//! Stream endpoint configuration

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use crate::{Result, StreamError};

/// Default port for depth-frame streams.
pub const DEFAULT_DEPTH_PORT: u16 = 5000;

/// Default receive-stall detection window.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(200);

/// Network parameters for a single frame stream.
///
/// Fixed at streamer construction: the multicast group to join, the UDP port
/// to bind, the receive latency bound used for stall detection, and the local
/// interface on which to join the group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Multicast group address (224.0.0.0/4).
    pub group: Ipv4Addr,

    /// UDP port to bind.
    pub port: u16,

    /// Receive latency bound. If no datagram arrives within this window the
    /// receiver logs the stall and keeps listening.
    pub latency: Duration,

    /// Local interface on which to join the group.
    /// `0.0.0.0` lets the OS pick.
    pub interface: Ipv4Addr,
}

impl StreamConfig {
    /// Create a configuration for the given group and port with default
    /// latency and interface selection.
    pub fn new(group: Ipv4Addr, port: u16) -> Self {
        Self { group, port, latency: DEFAULT_LATENCY, interface: Ipv4Addr::UNSPECIFIED }
    }

    /// Set the receive latency bound.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Select the local interface on which to join the multicast group.
    pub fn with_interface(mut self, interface: Ipv4Addr) -> Self {
        self.interface = interface;
        self
    }

    /// The socket address the receiver binds.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, self.port))
    }

    /// The group endpoint this stream subscribes to.
    pub fn group_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.group, self.port))
    }

    /// Validate the configuration.
    ///
    /// The group must be a multicast address and the latency bound non-zero.
    pub fn validate(&self) -> Result<()> {
        if !self.group.is_multicast() {
            return Err(StreamError::invalid_config(format!(
                "{} is not a multicast address",
                self.group
            )));
        }
        if self.interface.is_multicast() {
            return Err(StreamError::invalid_config(format!(
                "interface {} must be a unicast local address",
                self.interface
            )));
        }
        if self.latency.is_zero() {
            return Err(StreamError::invalid_config("latency bound must be non-zero"));
        }
        Ok(())
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::new(Ipv4Addr::new(224, 1, 1, 1), DEFAULT_DEPTH_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_config_is_valid() {
        let config = StreamConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, DEFAULT_DEPTH_PORT);
        assert_eq!(config.group, Ipv4Addr::new(224, 1, 1, 1));
    }

    #[test]
    fn unicast_group_is_rejected() {
        let config = StreamConfig::new(Ipv4Addr::new(192, 168, 1, 10), 5000);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, StreamError::Config { .. }));
    }

    #[test]
    fn zero_latency_is_rejected() {
        let config = StreamConfig::default().with_latency(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn bind_address_is_wildcard_on_stream_port() {
        let config = StreamConfig::new(Ipv4Addr::new(239, 0, 0, 7), 6001);
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:6001");
        assert_eq!(config.group_addr().to_string(), "239.0.0.7:6001");
    }

    proptest! {
        #[test]
        fn any_administratively_scoped_group_validates(octet2 in 0u8..=255, octet3 in 0u8..=255, octet4 in 1u8..=254, port in 1024u16..=u16::MAX) {
            let config = StreamConfig::new(Ipv4Addr::new(239, octet2, octet3, octet4), port);
            prop_assert!(config.validate().is_ok());
        }
    }
}
