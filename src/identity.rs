//! Client identity derived from the connecting peer
//!
//! The peer address is the only thing that separates one client's logs from
//! another's. Nothing authenticates it, so any caller able to reach the
//! service from an address can read and write that address's partitions.

use std::fmt;
use std::net::{IpAddr, Ipv6Addr};

/// Label used when the connection exposes no peer address
pub const UNKNOWN_PEER_LABEL: &str = "system";

/// Label substituted for the IPv6 loopback address
pub const LOOPBACK_LABEL: &str = "localhost";

/// Directory segment naming the client that sent a request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    /// Derive the identity from a peer address.
    ///
    /// Only `::1` is rewritten to `localhost`. The IPv4 loopback stays
    /// `127.0.0.1`, so the two loopbacks land in different partitions.
    pub fn from_peer(addr: Option<IpAddr>) -> Self {
        match addr {
            None => Self(UNKNOWN_PEER_LABEL.to_string()),
            Some(ip) => Self::from_raw(&ip.to_string()),
        }
    }

    /// Build an identity from an already-rendered address string
    pub fn from_raw(raw: &str) -> Self {
        if raw == Ipv6Addr::LOCALHOST.to_string() {
            Self(LOOPBACK_LABEL.to_string())
        } else {
            Self(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_ipv6_loopback_is_localhost() {
        let id = ClientIdentity::from_peer(Some(IpAddr::V6(Ipv6Addr::LOCALHOST)));
        assert_eq!(id.as_str(), "localhost");
        assert_eq!(ClientIdentity::from_raw("::1").as_str(), "localhost");
    }

    #[test]
    fn test_ipv4_loopback_is_kept_verbatim() {
        let id = ClientIdentity::from_peer(Some(IpAddr::V4(Ipv4Addr::LOCALHOST)));
        assert_eq!(id.as_str(), "127.0.0.1");
    }

    #[test]
    fn test_missing_peer_is_system() {
        assert_eq!(ClientIdentity::from_peer(None).as_str(), "system");
    }

    #[test]
    fn test_other_addresses_verbatim() {
        let v4: IpAddr = "10.1.2.3".parse().unwrap();
        assert_eq!(ClientIdentity::from_peer(Some(v4)).as_str(), "10.1.2.3");

        let v6: IpAddr = "fe80::1".parse().unwrap();
        assert_eq!(ClientIdentity::from_peer(Some(v6)).to_string(), "fe80::1");
    }
}
