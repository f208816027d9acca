//! Diameter URI parsing: `aaa://fqdn[:port][;transport=tcp|sctp][;protocol=diameter|radius]`
//! (RFC 6733 §4.6.2).

use std::fmt;

use crate::error::ConversionError;

/// Transport named by a Diameter URI's `;transport=` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriTransport {
    Tcp,
    Sctp,
}

impl fmt::Display for UriTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UriTransport::Tcp => write!(f, "tcp"),
            UriTransport::Sctp => write!(f, "sctp"),
        }
    }
}

/// A parsed Diameter URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiameterUri {
    pub secure: bool,
    pub fqdn: String,
    pub port: u16,
    pub transport: UriTransport,
}

impl DiameterUri {
    /// Parses `aaa://fqdn` or `aaas://fqdn:port;transport=sctp`. Missing
    /// `port`/`transport` default to the scheme's standard port and TCP.
    pub fn parse(uri: &str) -> Result<Self, ConversionError> {
        let malformed = || ConversionError::Underflow { wanted: 1, available: 0 };

        let (scheme, rest) = uri.split_once("://").ok_or_else(malformed)?;
        let secure = match scheme {
            "aaa" => false,
            "aaas" => true,
            _ => return Err(malformed()),
        };

        let mut parts = rest.split(';');
        let authority = parts.next().ok_or_else(malformed)?;

        let (fqdn, port) = match authority.split_once(':') {
            Some((host, port_str)) => {
                let port: u16 = port_str.parse().map_err(|_| malformed())?;
                (host.to_string(), port)
            }
            None => {
                let default_port = if secure {
                    crate::constants::DEFAULT_SECURE_PORT
                } else {
                    crate::constants::DEFAULT_PORT
                };
                (authority.to_string(), default_port)
            }
        };
        if fqdn.is_empty() {
            return Err(malformed());
        }

        let mut transport = UriTransport::Tcp;
        for param in parts {
            if let Some(value) = param.strip_prefix("transport=") {
                transport = match value {
                    "tcp" => UriTransport::Tcp,
                    "sctp" => UriTransport::Sctp,
                    _ => return Err(malformed()),
                };
            }
        }

        Ok(DiameterUri { secure, fqdn, port, transport })
    }
}

impl fmt::Display for DiameterUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = if self.secure { "aaas" } else { "aaa" };
        write!(f, "{}://{}:{};transport={}", scheme, self.fqdn, self.port, self.transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_uri() {
        let uri = DiameterUri::parse("aaa://hss.example.com").unwrap();
        assert_eq!(uri.fqdn, "hss.example.com");
        assert_eq!(uri.port, crate::constants::DEFAULT_PORT);
        assert_eq!(uri.transport, UriTransport::Tcp);
        assert!(!uri.secure);
    }

    #[test]
    fn parses_full_uri_with_sctp() {
        let uri = DiameterUri::parse("aaas://hss.example.com:5658;transport=sctp").unwrap();
        assert_eq!(uri.port, 5658);
        assert_eq!(uri.transport, UriTransport::Sctp);
        assert!(uri.secure);
    }

    #[test]
    fn rejects_bad_scheme() {
        assert!(DiameterUri::parse("http://example.com").is_err());
    }

    #[test]
    fn roundtrips_through_display() {
        let uri = DiameterUri::parse("aaa://hss.example.com:3868;transport=tcp").unwrap();
        let rendered = uri.to_string();
        let reparsed = DiameterUri::parse(&rendered).unwrap();
        assert_eq!(uri, reparsed);
    }
}
