//! HTTP handlers for the log API

pub mod export;
pub mod health;
pub mod logs;
pub mod stats;

use axum::extract::ConnectInfo;
use axum::http::{header, Extensions, HeaderMap};
use std::net::SocketAddr;
use std::time::Instant;

use crate::adapter::LoggingAdapter;
use crate::models::ClientInfo;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub adapter: LoggingAdapter,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(adapter: LoggingAdapter) -> Self {
        Self {
            adapter,
            started_at: Instant::now(),
        }
    }
}

/// Peer address recorded by `into_make_service_with_connect_info`
pub fn remote_ip(extensions: &Extensions) -> Option<String> {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

pub fn client_info(headers: &HeaderMap, extensions: &Extensions) -> ClientInfo {
    ClientInfo {
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        ip: remote_ip(extensions),
    }
}

/// Parse a string-encoded non-negative integer, falling back to `default`
/// for anything missing or non-numeric.
pub fn parse_or(value: Option<&str>, default: usize) -> usize {
    value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or() {
        assert_eq!(parse_or(Some("25"), 100), 25);
        assert_eq!(parse_or(Some(" 7 "), 100), 7);
        assert_eq!(parse_or(Some("abc"), 100), 100);
        assert_eq!(parse_or(Some("-5"), 0), 0);
        assert_eq!(parse_or(Some(""), 100), 100);
        assert_eq!(parse_or(None, 100), 100);
    }

    #[test]
    fn test_client_info() {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, "Mozilla/5.0".parse().unwrap());
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 7], 51234))));

        let info = client_info(&headers, &extensions);
        assert_eq!(info.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(info.ip.as_deref(), Some("192.168.1.7"));

        let info = client_info(&HeaderMap::new(), &Extensions::new());
        assert_eq!(info, ClientInfo::default());
    }
}
