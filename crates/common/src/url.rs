//! App address normalization
//!
//! Users type the app address in many shapes (`192.168.1.7`,
//! `https://10.0.0.5`, `192.168.1.7:9000`, ...). Everything is canonicalized
//! to `scheme://IPv4:PORT` before use. Only dotted-quad IPv4 hosts are
//! recognized; hostnames are rejected.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{Error, Result};

/// Port used when the address does not carry one
pub const DEFAULT_APP_PORT: u16 = 8080;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddressShape {
    HttpHostPort,
    HttpsHostPort,
    HttpsHost,
    HttpHost,
    HostPort,
    HostOnly,
}

/// Checked in order, first match wins
static SHAPES: Lazy<Vec<(AddressShape, Regex)>> = Lazy::new(|| {
    const IPV4: &str = r"(?:\d{1,3}\.){3}\d{1,3}";
    [
        (AddressShape::HttpHostPort, format!(r"^http://{IPV4}:\d+$")),
        (AddressShape::HttpsHostPort, format!(r"^https://{IPV4}:\d+$")),
        (AddressShape::HttpsHost, format!(r"^https://{IPV4}$")),
        (AddressShape::HttpHost, format!(r"^http://{IPV4}$")),
        (AddressShape::HostPort, format!(r"^{IPV4}:\d+$")),
        (AddressShape::HostOnly, format!(r"^{IPV4}$")),
    ]
    .into_iter()
    .map(|(shape, pattern)| (shape, Regex::new(&pattern).expect("static address pattern")))
    .collect()
});

/// Parsed app address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VbookUrl {
    pub host: String,
    pub port: u16,
    /// Normalized `scheme://host:port`
    pub base: String,
}

impl VbookUrl {
    /// Prefix hint for the network selector: the first two octets and a dot
    pub fn interface_prefix(&self) -> String {
        let octets: Vec<&str> = self.host.split('.').collect();
        if octets.len() >= 2 && !octets[0].is_empty() && !octets[1].is_empty() {
            format!("{}.{}.", octets[0], octets[1])
        } else {
            "192.168.".to_string()
        }
    }
}

/// Canonicalize an app address, `None` if the input matches no known shape.
pub fn normalize_vbook_url(input: &str) -> Option<String> {
    let input = input.trim();
    let shape = SHAPES
        .iter()
        .find(|(_, pattern)| pattern.is_match(input))
        .map(|(shape, _)| *shape)?;

    let normalized = match shape {
        AddressShape::HttpHostPort | AddressShape::HttpsHostPort => input.to_string(),
        AddressShape::HttpHost | AddressShape::HttpsHost => {
            format!("{}:{}", input, DEFAULT_APP_PORT)
        }
        AddressShape::HostPort => format!("http://{}", input),
        AddressShape::HostOnly => format!("http://{}:{}", input, DEFAULT_APP_PORT),
    };
    Some(normalized)
}

/// Split a URL into host and port, falling back to the default port.
///
/// Accepts normalized addresses as well as bare `host[:port]` strings.
pub fn split_host_port(url: &str) -> Result<(String, u16)> {
    let without_scheme = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .unwrap_or(url);
    let authority = without_scheme.split('/').next().unwrap_or_default();

    let (host, port) = match authority.split_once(':') {
        Some((host, port)) => {
            let port: u16 = port
                .parse()
                .map_err(|_| Error::validation("port", format!("'{}' is not a valid port", port)))?;
            (host, port)
        }
        None => (authority, DEFAULT_APP_PORT),
    };

    if host.is_empty() {
        return Err(Error::validation("host", "must not be empty"));
    }
    if port == 0 {
        return Err(Error::validation("port", "must be greater than 0"));
    }
    Ok((host.to_string(), port))
}

/// Normalize and parse an app address.
pub fn parse_vbook_url(input: &str) -> Result<VbookUrl> {
    let base = normalize_vbook_url(input).ok_or_else(|| Error::InvalidUrl(input.to_string()))?;
    let (host, port) = split_host_port(&base)?;
    Ok(VbookUrl { host, port, base })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_bare_ip() {
        assert_eq!(
            normalize_vbook_url("192.168.1.7").as_deref(),
            Some("http://192.168.1.7:8080")
        );
    }

    #[test]
    fn test_normalize_scheme_without_port() {
        assert_eq!(
            normalize_vbook_url("https://10.0.0.5").as_deref(),
            Some("https://10.0.0.5:8080")
        );
        assert_eq!(
            normalize_vbook_url("http://10.0.0.5").as_deref(),
            Some("http://10.0.0.5:8080")
        );
    }

    #[test]
    fn test_normalize_host_port() {
        assert_eq!(
            normalize_vbook_url("192.168.1.7:9000").as_deref(),
            Some("http://192.168.1.7:9000")
        );
    }

    #[test]
    fn test_normalize_trims_whitespace() {
        assert_eq!(
            normalize_vbook_url("  http://192.168.1.7:8080\n").as_deref(),
            Some("http://192.168.1.7:8080")
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "http://192.168.1.7:8080",
            "https://192.168.1.7:8443",
            "https://192.168.1.7",
            "http://192.168.1.7",
            "192.168.1.7:9000",
            "192.168.1.7",
        ];
        for input in inputs {
            let once = normalize_vbook_url(input).unwrap();
            let twice = normalize_vbook_url(&once).unwrap();
            assert_eq!(once, twice, "normalizing {} twice changed it", input);
        }
    }

    #[test]
    fn test_normalize_rejects_non_ipv4() {
        let inputs = [
            "",
            "localhost",
            "http://localhost:8080",
            "vbook.local",
            "ftp://192.168.1.7",
            "192.168.1",
            "http://192.168.1.7:8080/path",
            "::1",
            "not a url",
        ];
        for input in inputs {
            assert_eq!(normalize_vbook_url(input), None, "{} should be rejected", input);
        }
    }

    #[test]
    fn test_parse_vbook_url() {
        let url = parse_vbook_url("192.168.1.7:9000").unwrap();
        assert_eq!(url.host, "192.168.1.7");
        assert_eq!(url.port, 9000);
        assert_eq!(url.base, "http://192.168.1.7:9000");

        let url = parse_vbook_url("https://10.0.0.5").unwrap();
        assert_eq!(url.port, 8080);
        assert_eq!(url.base, "https://10.0.0.5:8080");
    }

    #[test]
    fn test_parse_invalid_url() {
        assert!(matches!(parse_vbook_url("example.com"), Err(Error::InvalidUrl(_))));
        assert!(parse_vbook_url("192.168.1.7:0").is_err());
        assert!(parse_vbook_url("192.168.1.7:99999").is_err());
    }

    #[test]
    fn test_split_host_port_defaults() {
        assert_eq!(
            split_host_port("http://10.0.0.5").unwrap(),
            ("10.0.0.5".to_string(), 8080)
        );
        assert_eq!(
            split_host_port("127.0.0.1:4000").unwrap(),
            ("127.0.0.1".to_string(), 4000)
        );
    }

    #[test]
    fn test_interface_prefix() {
        let url = parse_vbook_url("192.168.1.7").unwrap();
        assert_eq!(url.interface_prefix(), "192.168.");

        let url = VbookUrl {
            host: "bogus".to_string(),
            port: 8080,
            base: String::new(),
        };
        assert_eq!(url.interface_prefix(), "192.168.");
    }
}
