//! Network interface classification
//!
//! Decides which interfaces may carry the host's public traffic. Loopback and
//! purely local virtual interfaces (containers, bridges, VM networks, platform
//! helper links) are never selected for traffic sampling.

use log::trace;
use serde::{Deserialize, Serialize};

/// Interface categories derived from the interface name
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InterfaceKind {
    /// Loopback interface (localhost)
    Loopback,
    /// Physical Ethernet connection
    Ethernet,
    /// Wireless network interface
    WiFi,
    /// VPN or tunnel interface; may carry public traffic
    Tunnel,
    /// Container network interface (veth pairs, docker bridges)
    Container,
    /// Bridge interface
    Bridge,
    /// Virtual machine network
    VM,
    /// Platform helper links such as macOS awdl/llw/gif/stf
    PlatformVirtual,
    /// Unknown or unclassified interface type
    Unknown,
}

impl InterfaceKind {
    /// Whether this kind may be chosen as the public interface
    pub fn is_public_candidate(self) -> bool {
        !matches!(
            self,
            InterfaceKind::Loopback
                | InterfaceKind::Container
                | InterfaceKind::Bridge
                | InterfaceKind::VM
                | InterfaceKind::PlatformVirtual
        )
    }
}

/// Supported platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOS,
    Linux,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct InterfaceClassifier {
    platform: Platform,
}

impl Default for InterfaceClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl InterfaceClassifier {
    /// Create a classifier for the current platform
    pub fn new() -> Self {
        Self::for_platform(Self::detect_platform())
    }

    pub fn for_platform(platform: Platform) -> Self {
        Self { platform }
    }

    fn detect_platform() -> Platform {
        match std::env::consts::OS {
            "macos" => Platform::MacOS,
            "linux" => Platform::Linux,
            _ => Platform::Unknown,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Classify an interface by its name
    pub fn classify(&self, interface_name: &str) -> InterfaceKind {
        let name = interface_name.to_lowercase();
        let kind = match self.platform {
            Platform::MacOS => Self::classify_macos(&name),
            Platform::Linux => Self::classify_linux(&name),
            Platform::Unknown => Self::classify_generic(&name),
        };
        trace!("Classified interface '{}' as {:?}", interface_name, kind);
        kind
    }

    pub fn is_public_candidate(&self, interface_name: &str) -> bool {
        self.classify(interface_name).is_public_candidate()
    }

    fn classify_macos(name: &str) -> InterfaceKind {
        match name {
            n if n.starts_with("lo") => InterfaceKind::Loopback,
            n if n.starts_with("utun") || n.starts_with("ipsec") || n.starts_with("ppp") => {
                InterfaceKind::Tunnel
            }
            n if n.starts_with("gif")
                || n.starts_with("stf")
                || n.starts_with("awdl")
                || n.starts_with("llw")
                || n.starts_with("anpi")
                || n.starts_with("ap") =>
            {
                InterfaceKind::PlatformVirtual
            }
            n if n.starts_with("bridge") => InterfaceKind::Bridge,
            n if n.starts_with("vmnet") => InterfaceKind::VM,
            n if n.starts_with("en") => InterfaceKind::Ethernet,
            n => Self::classify_generic(n),
        }
    }

    fn classify_linux(name: &str) -> InterfaceKind {
        match name {
            n if n.starts_with("lo") => InterfaceKind::Loopback,
            n if n.starts_with("veth") || n.starts_with("docker") || n.starts_with("cni") => {
                InterfaceKind::Container
            }
            n if n.starts_with("br-") || n.starts_with("bridge") => InterfaceKind::Bridge,
            n if n.starts_with("virbr") || n.starts_with("vnet") => InterfaceKind::VM,
            n if n.starts_with("eth") || n.starts_with("en") || n.starts_with("em") => {
                InterfaceKind::Ethernet
            }
            n if n.starts_with("wl") => InterfaceKind::WiFi,
            n if n.starts_with("tun") || n.starts_with("tap") || n.starts_with("wg") => {
                InterfaceKind::Tunnel
            }
            n => Self::classify_generic(n),
        }
    }

    fn classify_generic(name: &str) -> InterfaceKind {
        match name {
            n if n.starts_with("lo") => InterfaceKind::Loopback,
            n if n.starts_with("veth") || n.starts_with("docker") => InterfaceKind::Container,
            n if n.starts_with("br-") => InterfaceKind::Bridge,
            n if n.starts_with("eth") || n.starts_with("en") => InterfaceKind::Ethernet,
            n if n.starts_with("wl") || n.contains("wifi") => InterfaceKind::WiFi,
            n if n.starts_with("tun") || n.starts_with("tap") => InterfaceKind::Tunnel,
            _ => InterfaceKind::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linux_interface_classification() {
        let classifier = InterfaceClassifier::for_platform(Platform::Linux);

        let test_cases = vec![
            ("lo", InterfaceKind::Loopback, false),
            ("eth0", InterfaceKind::Ethernet, true),
            ("enp3s0", InterfaceKind::Ethernet, true),
            ("wlan0", InterfaceKind::WiFi, true),
            ("tun0", InterfaceKind::Tunnel, true),
            ("docker0", InterfaceKind::Container, false),
            ("veth1a2b", InterfaceKind::Container, false),
            ("br-5f3c", InterfaceKind::Bridge, false),
            ("virbr0", InterfaceKind::VM, false),
        ];

        for (name, kind, candidate) in test_cases {
            assert_eq!(classifier.classify(name), kind, "kind mismatch for {}", name);
            assert_eq!(
                classifier.is_public_candidate(name),
                candidate,
                "candidate mismatch for {}",
                name
            );
        }
    }

    #[test]
    fn test_macos_interface_classification() {
        let classifier = InterfaceClassifier::for_platform(Platform::MacOS);

        assert_eq!(classifier.classify("lo0"), InterfaceKind::Loopback);
        assert_eq!(classifier.classify("en0"), InterfaceKind::Ethernet);
        assert_eq!(classifier.classify("utun3"), InterfaceKind::Tunnel);
        assert!(!classifier.is_public_candidate("gif0"));
        assert!(!classifier.is_public_candidate("stf0"));
        assert!(!classifier.is_public_candidate("awdl0"));
        assert!(classifier.is_public_candidate("en1"));
    }

    #[test]
    fn test_unknown_names_remain_candidates() {
        let classifier = InterfaceClassifier::for_platform(Platform::Linux);
        assert_eq!(classifier.classify("ib0"), InterfaceKind::Unknown);
        assert!(classifier.is_public_candidate("ib0"));
    }
}
