use crate::name::unescape;
use crate::service::Service;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

/// A discovered service instance, as seen on one network interface
///
/// The same instance reachable via two interfaces is reported as two
/// entries, differing in `interface_name` and `ips`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseEntry {
    /// Addresses of the host, as seen on this interface
    pub ips: Vec<IpAddr>,
    /// Target host, fully-qualified
    pub host: String,
    /// Port the service listens on
    pub port: u16,
    /// Interface the instance was seen on, e.g. "eth0"
    pub interface_name: String,
    /// Instance name, escaped, e.g. `Printer\ 1`
    pub name: String,
    /// Service type, e.g. `_ipp._tcp`
    pub service_type: String,
    /// Domain, e.g. `local`
    pub domain: String,
    /// Key/value pairs from the TXT record
    pub text: HashMap<String, String>,
    /// TTL when first seen
    pub ttl: Duration,
}

/// Identity of a [`BrowseEntry`]: `(service_type, name, interface_name)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct EntryKey {
    service_type: String,
    name: String,
    interface_name: String,
}

impl BrowseEntry {
    pub(crate) fn new(
        service: &Service,
        interface_name: &str,
        ips: &[IpAddr],
    ) -> Self {
        Self {
            ips: ips.to_vec(),
            host: service.host.clone(),
            port: service.port,
            interface_name: interface_name.to_string(),
            name: service.name.clone(),
            service_type: service.service_type.clone(),
            domain: service.domain.clone(),
            text: service.text.clone(),
            ttl: service.ttl,
        }
    }

    pub(crate) fn key(&self) -> EntryKey {
        EntryKey {
            service_type: self.service_type.clone(),
            name: self.name.clone(),
            interface_name: self.interface_name.clone(),
        }
    }

    /// The fully-qualified instance name, e.g. `Printer\ 1._ipp._tcp.local.`
    #[must_use]
    pub fn service_instance_name(&self) -> String {
        format!("{}.{}.{}.", self.name, self.service_type, self.domain)
    }

    /// The instance name without escaping, e.g. `Printer 1`
    #[must_use]
    pub fn unescaped_name(&self) -> String {
        unescape(&self.name)
    }

    /// The instance name for display, e.g. `Printer 1._ipp._tcp.local.`
    ///
    /// Only the instance label is unescaped; the service type and
    /// domain are used as they are.
    #[must_use]
    pub fn unescaped_service_instance_name(&self) -> String {
        format!(
            "{}.{}.{}.",
            self.unescaped_name(),
            self.service_type,
            self.domain
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn printer() -> BrowseEntry {
        BrowseEntry {
            ips: vec!["192.168.1.20".parse().unwrap()],
            host: "printer.local.".to_string(),
            port: 631,
            interface_name: "eth0".to_string(),
            name: "Printer\\ 1".to_string(),
            service_type: "_ipp._tcp".to_string(),
            domain: "local".to_string(),
            text: HashMap::new(),
            ttl: Duration::from_secs(120),
        }
    }

    #[test]
    fn instance_names() {
        let e = printer();
        assert_eq!(e.service_instance_name(), "Printer\\ 1._ipp._tcp.local.");
        assert_eq!(
            e.unescaped_service_instance_name(),
            "Printer 1._ipp._tcp.local."
        );
        assert_eq!(e.unescaped_name(), "Printer 1");
    }

    #[test]
    fn escaped_dot_in_name() {
        let mut e = printer();
        e.name = "Office\\.Floor\\0322".to_string();
        assert_eq!(
            e.service_instance_name(),
            "Office\\.Floor\\0322._ipp._tcp.local."
        );
        assert_eq!(
            e.unescaped_service_instance_name(),
            "Office.Floor 2._ipp._tcp.local."
        );
    }

    #[test]
    fn key_ignores_addresses() {
        let a = printer();
        let mut b = printer();
        b.ips = vec!["10.0.0.1".parse().unwrap()];
        b.port = 8631;
        assert_eq!(a.key(), b.key());
        b.interface_name = "wlan0".to_string();
        assert_ne!(a.key(), b.key());
    }
}
