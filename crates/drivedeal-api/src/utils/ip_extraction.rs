//! Client IP resolution.
//!
//! Forwarding headers are only trusted when proxies are configured in front of the
//! service. Each trusted proxy appends the address it received the request from, so only
//! the rightmost `trusted_proxy_count` entries of `X-Forwarded-For` were written by us;
//! anything further left can be forged by the client.

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use std::net::{IpAddr, SocketAddr};

const UNKNOWN: &str = "unknown";

/// Resolve the client IP for a request, falling back to the socket peer address.
pub fn client_ip<B>(request: &Request<B>, trusted_proxy_count: usize) -> String {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    extract_client_ip(request.headers(), peer.as_ref(), trusted_proxy_count)
}

/// With `trusted_proxy_count == 0` the service faces clients directly and the socket
/// peer is the only source.
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<&SocketAddr>,
    trusted_proxy_count: usize,
) -> String {
    forwarded_client_ip(headers, trusted_proxy_count)
        .map(|ip| ip.to_string())
        .or_else(|| socket_addr.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn forwarded_client_ip(headers: &HeaderMap, trusted_proxy_count: usize) -> Option<IpAddr> {
    if trusted_proxy_count == 0 {
        return None;
    }
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| from_forwarded_for(v, trusted_proxy_count))
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .and_then(parse_ip)
        })
}

/// Chain order is `client, proxy1, proxy2, ...`. The proxy nearest to us is the socket
/// peer and is not listed, so the client sits `trusted_proxy_count` entries from the
/// right. A chain shorter than that did not pass through every trusted proxy.
fn from_forwarded_for(header_value: &str, trusted_proxy_count: usize) -> Option<IpAddr> {
    if trusted_proxy_count == 0 {
        return None;
    }
    let hops: Vec<&str> = header_value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let position = hops.len().checked_sub(trusted_proxy_count)?;
    hops.get(position).copied().and_then(parse_ip)
}

fn parse_ip(value: &str) -> Option<IpAddr> {
    value.trim().parse().ok()
}
