use crate::name::labels;
use hickory_proto::rr::Name;
use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::time::{Duration, Instant};

/// A service instance, as aggregated from resource records
///
/// Identified by `(service_type, name, domain)`, all in escaped
/// presentation form. Addresses are recorded per interface, because
/// the same instance can be reachable (at different addresses) on
/// several networks at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    /// Instance name, e.g. `Printer\ 1`
    pub name: String,
    /// Service type, e.g. `_ipp._tcp`
    pub service_type: String,
    /// Domain, e.g. `local`
    pub domain: String,
    /// Target host from the SRV record, fully-qualified
    pub host: String,
    /// Port from the SRV record
    pub port: u16,
    /// Key/value pairs from the TXT record
    pub text: HashMap<String, String>,
    /// TTL of the most recent record for this instance
    pub ttl: Duration,
    /// Addresses of `host`, keyed by the interface they were seen on
    pub addresses: BTreeMap<String, Vec<IpAddr>>,
    pub(crate) expires_at: Instant,
}

impl Service {
    /// Split a service instance name into its parts
    ///
    /// Returns `None` unless there are enough labels for an instance,
    /// a two-label service type, and a domain.
    pub(crate) fn from_instance(instance: &Name, now: Instant) -> Option<Self> {
        let labels = labels(instance);
        if labels.len() < 4 {
            return None;
        }
        Some(Service {
            name: labels[0].clone(),
            service_type: labels[1..3].join("."),
            domain: labels[3..].join("."),
            host: String::new(),
            port: 0,
            text: HashMap::new(),
            ttl: Duration::ZERO,
            addresses: BTreeMap::new(),
            expires_at: now,
        })
    }

    /// The service type and domain, e.g. `_ipp._tcp.local.`
    #[must_use]
    pub fn service_name(&self) -> String {
        format!("{}.{}.", self.service_type, self.domain)
    }

    /// The fully-qualified instance name, e.g. `Printer\ 1._ipp._tcp.local.`
    #[must_use]
    pub fn service_instance_name(&self) -> String {
        format!("{}.{}.{}.", self.name, self.service_type, self.domain)
    }

    pub(crate) fn refresh(&mut self, ttl: Duration, now: Instant) {
        self.ttl = ttl;
        self.expires_at = now + ttl;
    }

    pub(crate) fn add_address(&mut self, interface: &str, ip: IpAddr) {
        let ips = self.addresses.entry(interface.to_string()).or_default();
        if !ips.contains(&ip) {
            ips.push(ip);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::test_name;

    #[test]
    fn instance_name_split() {
        let now = Instant::now();
        let s = Service::from_instance(
            &test_name(&["Printer 1", "_ipp", "_tcp", "local"]),
            now,
        )
        .unwrap();
        assert_eq!(s.name, "Printer\\ 1");
        assert_eq!(s.service_type, "_ipp._tcp");
        assert_eq!(s.domain, "local");
        assert_eq!(s.service_name(), "_ipp._tcp.local.");
        assert_eq!(s.service_instance_name(), "Printer\\ 1._ipp._tcp.local.");
    }

    #[test]
    fn multi_label_domain() {
        let s = Service::from_instance(
            &test_name(&["x", "_http", "_tcp", "example", "com"]),
            Instant::now(),
        )
        .unwrap();
        assert_eq!(s.domain, "example.com");
    }

    #[test]
    fn short_name_rejected() {
        assert!(Service::from_instance(
            &test_name(&["_http", "_tcp", "local"]),
            Instant::now()
        )
        .is_none());
    }

    #[test]
    fn addresses_are_a_set_per_interface() {
        let mut s = Service::from_instance(
            &test_name(&["x", "_http", "_tcp", "local"]),
            Instant::now(),
        )
        .unwrap();
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        s.add_address("eth0", ip);
        s.add_address("eth0", ip);
        s.add_address("wlan0", ip);
        assert_eq!(s.addresses["eth0"], vec![ip]);
        assert_eq!(s.addresses.len(), 2);
    }

    #[test]
    fn refresh_sets_expiry() {
        let now = Instant::now();
        let mut s = Service::from_instance(
            &test_name(&["x", "_http", "_tcp", "local"]),
            now,
        )
        .unwrap();
        s.refresh(Duration::from_secs(120), now);
        assert_eq!(s.ttl, Duration::from_secs(120));
        assert_eq!(s.expires_at, now + Duration::from_secs(120));
    }
}
