//! Dock host identifiers.

use std::fmt;

use thiserror::Error;
use url::Url;

/// Why a host string was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("host is empty")]
    Empty,

    #[error("host '{0}' is not a valid url")]
    Unparseable(String),

    #[error("host '{0}' has no hostname")]
    MissingHostname(String),

    #[error("host '{0}' has no port")]
    MissingPort(String),
}

/// A validated dock URL in canonical `scheme://hostname:port` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DockHost {
    scheme: String,
    hostname: String,
    port: u16,
}

impl DockHost {
    /// Parse and canonicalize a dock URL.
    ///
    /// The port must be written out: `http://10.0.0.1` is rejected even though
    /// the scheme has a default port.
    pub fn parse(raw: &str) -> Result<Self, HostError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(HostError::Empty);
        }

        let url = Url::parse(trimmed).map_err(|_| HostError::Unparseable(raw.to_string()))?;
        if url.scheme().is_empty() || url.cannot_be_a_base() {
            return Err(HostError::Unparseable(raw.to_string()));
        }

        let hostname = match url.host_str() {
            Some(h) if !h.is_empty() => h.to_string(),
            _ => return Err(HostError::MissingHostname(raw.to_string())),
        };

        // `Url::port` hides ports equal to the scheme default, so fall back to
        // the authority text to tell `http://h:80` apart from `http://h`.
        let port = match url.port() {
            Some(port) => port,
            None if has_explicit_port(trimmed) => url
                .port_or_known_default()
                .ok_or_else(|| HostError::MissingPort(raw.to_string()))?,
            None => return Err(HostError::MissingPort(raw.to_string())),
        };

        Ok(Self {
            scheme: url.scheme().to_string(),
            hostname,
            port,
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `hostname:port`, the form cluster membership keys use.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }

    /// The canonical URL, used as the registry key.
    pub fn as_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DockHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.hostname, self.port)
    }
}

fn has_explicit_port(raw: &str) -> bool {
    let Some((_, rest)) = raw.split_once("://") else {
        return false;
    };
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_part = authority.rsplit('@').next().unwrap_or_default();
    let after_host = match host_part.rfind(']') {
        Some(idx) => &host_part[idx + 1..],
        None => host_part,
    };
    match after_host.rsplit_once(':') {
        Some((_, port)) => !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}
