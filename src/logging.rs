//! Tracing setup and credential masking for operational logs

use std::fmt;
use tracing_subscriber::{fmt as tracing_fmt, prelude::*, EnvFilter};

/// Masked credential for display
///
/// Shows the first 6 characters followed by `***`; short values are fully
/// hidden.
#[derive(Clone, Debug)]
pub struct SensitiveToken<'a> {
    inner: &'a str,
}

impl<'a> SensitiveToken<'a> {
    /// ```
    /// use visa_log_server::logging::SensitiveToken;
    ///
    /// let token = SensitiveToken::new("ya29.a0AfH6SMBx-long-access-token");
    /// assert_eq!(format!("{}", token), "ya29.a***");
    /// ```
    pub fn new(token: &'a str) -> Self {
        Self { inner: token }
    }
}

impl<'a> fmt::Display for SensitiveToken<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const VISIBLE: usize = 6;
        if self.inner.is_empty() {
            write!(f, "(none)")
        } else if self.inner.len() <= VISIBLE * 2 || !self.inner.is_char_boundary(VISIBLE) {
            write!(f, "***")
        } else {
            write!(f, "{}***", &self.inner[..VISIBLE])
        }
    }
}

/// Initialize tracing/logging
///
/// `RUST_LOG` takes precedence over `level`. `format` is "json" for
/// structured output, anything else for human-readable lines. Calling this
/// twice is harmless; the second call is ignored.
pub fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    let result = if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_fmt::layer().json().with_target(true))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_fmt::layer().with_target(true))
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("Warning: tracing already initialized: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensitive_token_display() {
        let token = SensitiveToken::new("ya29.a0AfH6SMBx-abcdef123456");
        assert_eq!(format!("{}", token), "ya29.a***");
    }

    #[test]
    fn test_sensitive_token_short() {
        assert_eq!(SensitiveToken::new("abc123").to_string(), "***");
        assert_eq!(SensitiveToken::new("").to_string(), "(none)");
    }
}
