//! Client address resolution behind reverse proxies
//!
//! `X-Forwarded-For` is only believed when the connection comes from a
//! configured proxy. Otherwise anyone could pick their own partition.

use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;

/// Header carrying the original client address
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

fn parse_forwarded(value: &str) -> Option<IpAddr> {
    value
        .parse::<IpAddr>()
        .ok()
        .or_else(|| value.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}

/// Address whose identity a request is filed under.
///
/// For a trusted proxy peer this is the right-most `X-Forwarded-For` entry
/// (the one the proxy itself appended); for any other peer, or when the
/// header is missing or unparsable, it is the peer address.
pub fn client_address(peer: SocketAddr, headers: &HeaderMap, trusted_proxies: &[IpAddr]) -> IpAddr {
    let peer_ip = peer.ip();
    if !trusted_proxies.contains(&peer_ip) {
        return peer_ip;
    }

    headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .last()
        .and_then(parse_forwarded)
        .unwrap_or(peer_ip)
}
