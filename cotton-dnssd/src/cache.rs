use crate::name::fqdn;
use crate::netif::Interface;
use crate::service::Service;
use hickory_proto::op::Message;
use hickory_proto::rr::rdata::TXT;
use hickory_proto::rr::{Name, RData, Record};
use log::debug;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

fn key(instance: &Name) -> String {
    fqdn(instance).to_ascii_lowercase()
}

/// TXT strings are `key=value`, or a bare `key` (RFC 6763 s6.4)
fn parse_txt(txt: &TXT) -> HashMap<String, String> {
    let mut text = HashMap::new();
    for s in txt.txt_data() {
        let s = String::from_utf8_lossy(s);
        if s.is_empty() {
            continue;
        }
        let (k, v) = s.split_once('=').unwrap_or((&*s, ""));
        // Only the first occurrence of a key counts
        text.entry(k.to_string()).or_insert_with(|| v.to_string());
    }
    text
}

/// Resource-record cache, aggregating records into [`Service`]s
///
/// Fed with every incoming message; services leave the cache when
/// their TTL runs out, or immediately on a "goodbye" (TTL 0) record.
#[derive(Debug, Default)]
pub struct Cache {
    services: HashMap<String, Service>,
}

impl Cache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Find or create the service for an instance name, and refresh it
    fn touch(
        &mut self,
        instance: &Name,
        ttl: u32,
        now: Instant,
    ) -> Option<&mut Service> {
        let service = match self.services.entry(key(instance)) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(Service::from_instance(instance, now)?),
        };
        service.refresh(Duration::from_secs(u64::from(ttl)), now);
        Some(service)
    }

    /// Apply a goodbye (TTL 0) record
    ///
    /// Only a goodbye for the PTR or SRV record the service currently
    /// rests on withdraws it. Goodbyes for subtype PTRs, superseded
    /// SRVs, TXT and address records leave the service alone.
    fn goodbye(&mut self, record: &Record, now: Instant) {
        let (instance, current) = match record.data() {
            Some(RData::PTR(ptr)) => (&ptr.0, None),
            Some(RData::SRV(srv)) => (record.name(), Some(srv)),
            _ => return,
        };
        let Some(s) = self.services.get_mut(&key(instance)) else {
            return;
        };
        let matches = match current {
            None => s
                .service_name()
                .eq_ignore_ascii_case(&fqdn(record.name())),
            Some(srv) => {
                s.port == srv.port()
                    && s.host.eq_ignore_ascii_case(&fqdn(srv.target()))
            }
        };
        if matches {
            debug!("goodbye for {}", s.service_instance_name());
            s.refresh(Duration::ZERO, now);
        }
    }

    /// Merge the records from one incoming message
    ///
    /// Messages need not be responses to our own queries: anything
    /// seen on the network is merged. Records which don't describe a
    /// service instance are ignored. Goodbyes are applied after every
    /// live record, so the order of records in a message doesn't
    /// matter.
    pub fn update_from(
        &mut self,
        message: &Message,
        interface: &Interface,
        now: Instant,
    ) {
        let (live, goodbyes): (Vec<&Record>, Vec<&Record>) = message
            .answers()
            .iter()
            .chain(message.additionals())
            .partition(|r| r.ttl() > 0);

        for r in &live {
            match r.data() {
                Some(RData::PTR(ptr)) => {
                    self.touch(&ptr.0, r.ttl(), now);
                }
                Some(RData::SRV(srv)) => {
                    if let Some(s) = self.touch(r.name(), r.ttl(), now) {
                        s.host = fqdn(srv.target());
                        s.port = srv.port();
                    }
                }
                _ => {}
            }
        }

        for r in &live {
            if let Some(RData::TXT(txt)) = r.data() {
                if let Some(s) = self.services.get_mut(&key(r.name())) {
                    s.text = parse_txt(txt);
                    s.refresh(Duration::from_secs(u64::from(r.ttl())), now);
                }
            }
        }

        for r in &live {
            let ip = match r.data() {
                Some(RData::A(a)) => IpAddr::V4(a.0),
                Some(RData::AAAA(aaaa)) => IpAddr::V6(aaaa.0),
                _ => continue,
            };
            let owner = fqdn(r.name());
            for s in self.services.values_mut() {
                if s.host.eq_ignore_ascii_case(&owner) {
                    s.add_address(&interface.name, ip);
                }
            }
        }

        for r in goodbyes {
            self.goodbye(r, now);
        }

        self.services.retain(|_, s| s.expires_at > now);
    }

    /// Snapshot of all known service instances, in no particular order
    #[must_use]
    pub fn services(&self) -> Vec<&Service> {
        self.services.values().collect()
    }

    /// Number of known service instances
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Whether no service instances are known
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::name::test_name;
    use crate::netif::{make_index, Flags};
    use hickory_proto::rr::rdata::{A, PTR, SRV};

    fn iface(name: &str) -> Interface {
        Interface {
            index: make_index(2),
            name: name.to_string(),
            addrs: Vec::new(),
            flags: Flags::UP | Flags::RUNNING | Flags::MULTICAST,
        }
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn full_response_makes_service() {
        let mut c = Cache::new();
        let now = Instant::now();
        c.update_from(
            &response("Printer 1", "_ipp._tcp", "printer", ip("10.0.0.5"), 120),
            &iface("eth0"),
            now,
        );
        let v = c.services();
        assert_eq!(v.len(), 1);
        let s = v[0];
        assert_eq!(s.name, "Printer\\ 1");
        assert_eq!(s.service_type, "_ipp._tcp");
        assert_eq!(s.domain, "local");
        assert_eq!(s.host, "printer.local.");
        assert_eq!(s.port, 8080);
        assert_eq!(s.text.get("path").map(String::as_str), Some("/"));
        assert_eq!(s.ttl, Duration::from_secs(120));
        assert_eq!(s.addresses["eth0"], vec![ip("10.0.0.5")]);
    }

    #[test]
    fn same_instance_on_two_interfaces() {
        let mut c = Cache::new();
        let now = Instant::now();
        c.update_from(
            &response("x", "_http._tcp", "h", ip("10.0.0.5"), 120),
            &iface("eth0"),
            now,
        );
        c.update_from(
            &response("x", "_http._tcp", "h", ip("192.168.0.5"), 120),
            &iface("wlan0"),
            now,
        );
        assert_eq!(c.len(), 1);
        let s = c.services()[0];
        assert_eq!(s.addresses.len(), 2);
        assert_eq!(s.addresses["wlan0"], vec![ip("192.168.0.5")]);
    }

    #[test]
    fn goodbye_removes_service() {
        let mut c = Cache::new();
        let now = Instant::now();
        c.update_from(
            &response("x", "_http._tcp", "h", ip("10.0.0.5"), 120),
            &iface("eth0"),
            now,
        );
        c.update_from(&ptr_only("x", "_http._tcp", 0), &iface("eth0"), now);
        assert!(c.is_empty());
    }

    #[test]
    fn goodbye_for_unknown_ignored() {
        let mut c = Cache::new();
        c.update_from(
            &ptr_only("x", "_http._tcp", 0),
            &iface("eth0"),
            Instant::now(),
        );
        assert!(c.is_empty());
    }

    #[test]
    fn ttl_expiry_on_next_update() {
        let mut c = Cache::new();
        let now = Instant::now();
        c.update_from(
            &response("x", "_http._tcp", "h", ip("10.0.0.5"), 10),
            &iface("eth0"),
            now,
        );
        c.update_from(
            &response("y", "_http._tcp", "h2", ip("10.0.0.6"), 120),
            &iface("eth0"),
            now + Duration::from_secs(11),
        );
        let names: Vec<&str> =
            c.services().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["y"]);
    }

    #[test]
    fn refresh_keeps_service_alive() {
        let mut c = Cache::new();
        let now = Instant::now();
        let m = response("x", "_http._tcp", "h", ip("10.0.0.5"), 10);
        c.update_from(&m, &iface("eth0"), now);
        c.update_from(&m, &iface("eth0"), now + Duration::from_secs(8));
        c.update_from(&m, &iface("eth0"), now + Duration::from_secs(16));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn address_for_other_host_ignored() {
        let mut c = Cache::new();
        let now = Instant::now();
        c.update_from(
            &response("x", "_http._tcp", "h", ip("10.0.0.5"), 120),
            &iface("eth0"),
            now,
        );
        let mut m = Message::new();
        m.add_answer(Record::from_rdata(
            host("other"),
            120,
            RData::A(A("10.9.9.9".parse().unwrap())),
        ));
        c.update_from(&m, &iface("eth0"), now);
        assert_eq!(c.services()[0].addresses["eth0"], vec![ip("10.0.0.5")]);
    }

    #[test]
    fn host_match_ignores_case() {
        let mut c = Cache::new();
        let now = Instant::now();
        c.update_from(
            &response("x", "_http._tcp", "Host", ip("10.0.0.5"), 120),
            &iface("eth0"),
            now,
        );
        let mut m = Message::new();
        m.add_answer(Record::from_rdata(
            host("host"),
            120,
            RData::A(A("10.0.0.6".parse().unwrap())),
        ));
        c.update_from(&m, &iface("eth0"), now);
        assert_eq!(c.services()[0].addresses["eth0"].len(), 2);
    }

    #[test]
    fn txt_parsing() {
        let t = parse_txt(&TXT::new(vec![
            "a=1".to_string(),
            "flag".to_string(),
            "a=2".to_string(),
            "eq=x=y".to_string(),
            String::new(),
        ]));
        assert_eq!(t.len(), 3);
        assert_eq!(t["a"], "1");
        assert_eq!(t["flag"], "");
        assert_eq!(t["eq"], "x=y");
    }

    #[test]
    fn message_without_services_ignored() {
        let mut c = Cache::new();
        let mut m = Message::new();
        m.add_answer(Record::from_rdata(
            host("h"),
            120,
            RData::A(A("10.0.0.1".parse().unwrap())),
        ));
        c.update_from(&m, &iface("eth0"), Instant::now());
        assert!(c.is_empty());
    }

    fn srv(port: u16, ttl: u32) -> Record {
        Record::from_rdata(
            instance("x", "_http._tcp"),
            ttl,
            RData::SRV(SRV::new(0, 0, port, host("h"))),
        )
    }

    fn announced() -> (Cache, Instant) {
        let mut c = Cache::new();
        let now = Instant::now();
        c.update_from(
            &response("x", "_http._tcp", "h", ip("10.0.0.5"), 120),
            &iface("eth0"),
            now,
        );
        (c, now)
    }

    #[test]
    fn srv_goodbye_then_new_srv_keeps_service() {
        let (mut c, now) = announced();
        let mut m = Message::new();
        m.add_answer(srv(8080, 0));
        m.add_answer(srv(8081, 120));
        c.update_from(&m, &iface("eth0"), now);
        assert_eq!(c.len(), 1);
        assert_eq!(c.services()[0].port, 8081);
    }

    #[test]
    fn new_srv_then_srv_goodbye_keeps_service() {
        let (mut c, now) = announced();
        let mut m = Message::new();
        m.add_answer(srv(8081, 120));
        m.add_answer(srv(8080, 0));
        c.update_from(&m, &iface("eth0"), now);
        assert_eq!(c.len(), 1);
        assert_eq!(c.services()[0].port, 8081);
    }

    #[test]
    fn goodbye_for_current_srv_removes_service() {
        let (mut c, now) = announced();
        let mut m = Message::new();
        m.add_answer(srv(8080, 0));
        c.update_from(&m, &iface("eth0"), now);
        assert!(c.is_empty());
    }

    #[test]
    fn subtype_goodbye_keeps_service() {
        let (mut c, now) = announced();
        let mut m = Message::new();
        m.add_answer(Record::from_rdata(
            test_name(&["_printer", "_sub", "_http", "_tcp", "local"]),
            0,
            RData::PTR(PTR(instance("x", "_http._tcp"))),
        ));
        c.update_from(&m, &iface("eth0"), now);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn txt_goodbye_keeps_service() {
        let (mut c, now) = announced();
        let mut m = Message::new();
        m.add_answer(Record::from_rdata(
            instance("x", "_http._tcp"),
            0,
            RData::TXT(TXT::new(vec!["path=/old".to_string()])),
        ));
        c.update_from(&m, &iface("eth0"), now);
        assert_eq!(c.len(), 1);
        assert_eq!(c.services()[0].text["path"], "/");
    }

    #[test]
    fn address_goodbye_not_added() {
        let mut c = Cache::new();
        let mut m = response("x", "_http._tcp", "h", ip("10.0.0.5"), 120);
        m.add_additional(Record::from_rdata(
            host("h"),
            0,
            RData::A(A("10.0.0.99".parse().unwrap())),
        ));
        c.update_from(&m, &iface("eth0"), Instant::now());
        assert_eq!(c.services()[0].addresses["eth0"], vec![ip("10.0.0.5")]);
    }
}
