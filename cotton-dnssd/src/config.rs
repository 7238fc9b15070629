use crate::error::Error;
use crate::name::ensure_trailing_dot;
use hickory_proto::rr::Name;
use std::net::Ipv4Addr;

/// The mDNS UDP port (RFC 6762 s3)
pub const MDNS_PORT: u16 = 5353;

/// The mDNS IPv4 multicast group
pub const MDNS_MULTICAST_IPV4: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);

/// Largest mDNS message we expect to receive (RFC 6762 s17)
pub const MAX_PACKET_SIZE: usize = 9000;

/// Every DNS message starts with a 12-byte header (RFC 1035 s4.1.1)
const DNS_HEADER_SIZE: usize = 12;

/// Parameters for one browse operation
///
/// ```rust
/// use cotton_dnssd::BrowseConfig;
///
/// let config = BrowseConfig::new(["_http._tcp.local.", "_ipp._tcp.local"])
///     .with_port(5454);
/// assert_eq!(config.port, 5454);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrowseConfig {
    /// DNS-SD service types, e.g. `_http._tcp.local.`
    pub service_types: Vec<String>,

    /// UDP port to listen on, and to send queries to
    ///
    /// Only differs from [`MDNS_PORT`] when testing alongside a
    /// system mDNS responder.
    pub port: u16,

    /// Size of the receive buffer
    pub max_packet_size: usize,
}

impl BrowseConfig {
    /// Browse for one or more service types, using the standard port
    pub fn new<I, S>(service_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            service_types: service_types.into_iter().map(Into::into).collect(),
            port: MDNS_PORT,
            max_packet_size: MAX_PACKET_SIZE,
        }
    }

    /// Use a non-standard UDP port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Use a different receive buffer size
    #[must_use]
    pub fn with_max_packet_size(mut self, size: usize) -> Self {
        self.max_packet_size = size;
        self
    }

    /// Check the service types, returning them as fully-qualified names
    ///
    /// # Errors
    ///
    /// Returns `Error::NoServiceTypes` if the list is empty,
    /// `Error::InvalidServiceType` if one of them isn't a DNS name, or
    /// `Error::PacketSizeTooSmall` if the receive buffer can't hold a
    /// DNS header.
    pub fn validate(&self) -> Result<Vec<Name>, Error> {
        if self.service_types.is_empty() {
            return Err(Error::NoServiceTypes);
        }
        if self.max_packet_size < DNS_HEADER_SIZE {
            return Err(Error::PacketSizeTooSmall(self.max_packet_size));
        }
        self.service_types
            .iter()
            .map(|t| {
                Name::from_ascii(ensure_trailing_dot(t))
                    .map_err(|e| Error::InvalidServiceType(t.clone(), e))
            })
            .collect()
    }
}
