//! Local address selection
//!
//! The app fetches project files back from the CLI's file server, so the
//! server URL handed to it must use an address the app can reach. Candidates
//! are scored: private LAN ranges first, then addresses sharing the app's
//! own prefix. Virtual adapters (WSL, Docker, Hyper-V, ...) are ignored.

use std::net::{IpAddr, Ipv4Addr};

use ipnetwork::Ipv4Network;
use once_cell::sync::Lazy;
use tracing::debug;

use crate::{Error, Result};

/// Interface name fragments of virtual adapters, matched case-insensitively
pub const VIRTUAL_ADAPTER_PATTERNS: &[&str] = &[
    "vethernet",
    "virtual",
    "hyper-v",
    "wsl",
    "vmware",
    "virtualbox",
    "docker",
];

/// Prefix used when the app address gives no usable hint
pub const DEFAULT_PREFIX_HINT: &str = "192.168.";

const PRIVATE_SCORE: u32 = 10;
const PREFIX_SCORE: u32 = 5;

static PRIVATE_RANGES: Lazy<[Ipv4Network; 3]> = Lazy::new(|| {
    [
        Ipv4Network::new(Ipv4Addr::new(10, 0, 0, 0), 8).expect("valid prefix"),
        Ipv4Network::new(Ipv4Addr::new(172, 16, 0, 0), 12).expect("valid prefix"),
        Ipv4Network::new(Ipv4Addr::new(192, 168, 0, 0), 16).expect("valid prefix"),
    ]
});

/// One address bound to a local interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddr {
    pub interface: String,
    pub ip: IpAddr,
}

impl InterfaceAddr {
    pub fn new(interface: impl Into<String>, ip: impl Into<IpAddr>) -> Self {
        Self {
            interface: interface.into(),
            ip: ip.into(),
        }
    }
}

/// Source of local interface addresses
pub trait InterfaceSource {
    fn addresses(&self) -> Vec<InterfaceAddr>;
}

/// Interfaces of the running machine
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInterfaces;

impl InterfaceSource for SystemInterfaces {
    fn addresses(&self) -> Vec<InterfaceAddr> {
        let networks = sysinfo::Networks::new_with_refreshed_list();
        let mut addresses: Vec<InterfaceAddr> = networks
            .iter()
            .flat_map(|(name, data)| {
                data.ip_networks()
                    .iter()
                    .map(move |net| InterfaceAddr::new(name.clone(), net.addr))
            })
            .collect();
        // enumeration order is not stable across calls
        addresses.sort_by(|a, b| a.interface.cmp(&b.interface));
        addresses
    }
}

/// True for 10.0.0.0/8, 172.16.0.0/12 and 192.168.0.0/16
pub fn is_private_lan(ip: Ipv4Addr) -> bool {
    PRIVATE_RANGES.iter().any(|range| range.contains(ip))
}

pub fn is_virtual_adapter(name: &str) -> bool {
    let name = name.to_lowercase();
    VIRTUAL_ADAPTER_PATTERNS
        .iter()
        .any(|pattern| name.contains(pattern))
}

/// Emulators reach the host through NAT ranges that say nothing about the
/// host's LAN, so such hints are replaced by the default.
fn effective_prefix(hint: &str) -> String {
    let hint = hint.trim();
    if hint.is_empty() || hint.starts_with("172.") || hint.starts_with("10.") {
        DEFAULT_PREFIX_HINT.to_string()
    } else {
        hint.to_string()
    }
}

fn matches_prefix(ip: Ipv4Addr, prefix: &str) -> bool {
    let octets = ip.octets();
    prefix
        .split('.')
        .enumerate()
        .filter(|(_, part)| !part.is_empty())
        .all(|(i, part)| i < 4 && part.parse::<u8>().ok() == Some(octets[i]))
}

fn score(ip: Ipv4Addr, prefix: &str) -> u32 {
    let mut score = 0;
    if is_private_lan(ip) {
        score += PRIVATE_SCORE;
    }
    if matches_prefix(ip, prefix) {
        score += PREFIX_SCORE;
    }
    score
}

/// Pick the best address among `candidates` and format it as a base URL.
pub fn select_from_candidates(
    candidates: &[InterfaceAddr],
    port: u16,
    prefix_hint: &str,
) -> Result<String> {
    let prefix = effective_prefix(prefix_hint);
    let mut best: Option<(Ipv4Addr, u32)> = None;

    for candidate in candidates {
        if is_virtual_adapter(&candidate.interface) {
            debug!("Skipping virtual adapter {}", candidate.interface);
            continue;
        }
        let ip = match candidate.ip {
            IpAddr::V4(ip) if !ip.is_loopback() => ip,
            _ => continue,
        };

        let candidate_score = score(ip, &prefix);
        debug!("Candidate {} on {} scored {}", ip, candidate.interface, candidate_score);
        if best.map_or(true, |(_, best_score)| candidate_score > best_score) {
            best = Some((ip, candidate_score));
        }
    }

    best.map(|(ip, _)| format!("http://{}:{}", ip, port))
        .ok_or(Error::NoSuitableInterface)
}

/// Select a LAN-reachable local address on this machine.
pub fn select_local_address(port: u16, prefix_hint: &str) -> Result<String> {
    select_local_address_from(&SystemInterfaces, port, prefix_hint)
}

pub fn select_local_address_from(
    source: &dyn InterfaceSource,
    port: u16,
    prefix_hint: &str,
) -> Result<String> {
    let url = select_from_candidates(&source.addresses(), port, prefix_hint)?;
    debug!("Local file server address: {}", url);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    fn v4(interface: &str, ip: [u8; 4]) -> InterfaceAddr {
        InterfaceAddr::new(interface, Ipv4Addr::from(ip))
    }

    struct Fixed(Vec<InterfaceAddr>);

    impl InterfaceSource for Fixed {
        fn addresses(&self) -> Vec<InterfaceAddr> {
            self.0.clone()
        }
    }

    #[test]
    fn test_private_lan_preferred_over_public() {
        let candidates = vec![v4("eth0", [203, 0, 113, 5]), v4("wlan0", [192, 168, 1, 20])];
        let url = select_from_candidates(&candidates, 8070, "192.168.").unwrap();
        assert_eq!(url, "http://192.168.1.20:8070");
    }

    #[test]
    fn test_public_address_used_as_fallback() {
        let candidates = vec![v4("lo", [127, 0, 0, 1]), v4("eth0", [203, 0, 113, 5])];
        let url = select_from_candidates(&candidates, 8070, "192.168.").unwrap();
        assert_eq!(url, "http://203.0.113.5:8070");
    }

    #[test]
    fn test_prefix_match_breaks_private_tie() {
        let candidates = vec![v4("eth0", [10, 1, 2, 3]), v4("wlan0", [192, 168, 1, 20])];
        let url = select_from_candidates(&candidates, 9000, "192.168.").unwrap();
        assert_eq!(url, "http://192.168.1.20:9000");
    }

    #[test]
    fn test_equal_scores_keep_first() {
        let candidates = vec![v4("eth0", [10, 1, 2, 3]), v4("eth1", [172, 20, 0, 4])];
        let url = select_from_candidates(&candidates, 9000, "192.168.").unwrap();
        assert_eq!(url, "http://10.1.2.3:9000");
    }

    #[test]
    fn test_emulator_hint_falls_back_to_default() {
        // hint 10.0. would otherwise favor the 10.x address
        let candidates = vec![v4("eth0", [10, 0, 0, 8]), v4("wlan0", [192, 168, 0, 9])];
        let url = select_from_candidates(&candidates, 8070, "10.0.").unwrap();
        assert_eq!(url, "http://192.168.0.9:8070");
    }

    #[test]
    fn test_virtual_adapters_skipped() {
        let candidates = vec![
            v4("vEthernet (WSL)", [192, 168, 1, 50]),
            v4("docker0", [172, 17, 0, 1]),
            v4("VMware Network Adapter", [192, 168, 2, 1]),
            v4("en0", [203, 0, 113, 9]),
        ];
        let url = select_from_candidates(&candidates, 8070, "192.168.").unwrap();
        assert_eq!(url, "http://203.0.113.9:8070");
    }

    #[test]
    fn test_no_candidates() {
        let candidates = vec![
            v4("lo", [127, 0, 0, 1]),
            InterfaceAddr::new("eth0", Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1)),
            v4("docker0", [172, 17, 0, 1]),
        ];
        assert!(matches!(
            select_from_candidates(&candidates, 8070, "192.168."),
            Err(Error::NoSuitableInterface)
        ));
    }

    #[test]
    fn test_is_private_lan_boundaries() {
        assert!(is_private_lan(Ipv4Addr::new(172, 16, 0, 1)));
        assert!(is_private_lan(Ipv4Addr::new(172, 31, 255, 254)));
        assert!(!is_private_lan(Ipv4Addr::new(172, 32, 0, 1)));
        assert!(!is_private_lan(Ipv4Addr::new(172, 15, 0, 1)));
        assert!(is_private_lan(Ipv4Addr::new(10, 255, 0, 1)));
        assert!(!is_private_lan(Ipv4Addr::new(192, 169, 0, 1)));
    }

    #[test]
    fn test_matches_prefix() {
        assert!(matches_prefix(Ipv4Addr::new(192, 168, 4, 2), "192.168."));
        assert!(!matches_prefix(Ipv4Addr::new(192, 16, 4, 2), "192.168."));
        assert!(matches_prefix(Ipv4Addr::new(192, 16, 4, 2), ""));
    }

    #[test]
    fn test_select_from_source() {
        let source = Fixed(vec![v4("en0", [192, 168, 7, 7])]);
        let url = select_local_address_from(&source, 1234, "192.168.").unwrap();
        assert_eq!(url, "http://192.168.7.7:1234");
    }
}
