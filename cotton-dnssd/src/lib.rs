//! Browsing for DNS-SD services over multicast DNS
//!
//! The cotton-dnssd crate implements the client ("browsing") side of
//! DNS Service Discovery (RFC 6763) over multicast DNS (RFC 6762): given
//! one or more service types, such as `_http._tcp.local.` or
//! `_ipp._tcp.local.`, it finds the instances of those services being
//! advertised on the local network(s), and reports them as they come
//! and go.
//!
//! Each instance is reported once per network interface it is seen
//! on, as a [`BrowseEntry`] carrying its host, port, addresses, and TXT
//! key/value pairs. Browsing runs until cancelled via a
//! [`tokio_util::sync::CancellationToken`]:
//!
//! ```no_run
//! # async fn f() {
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let result = cotton_dnssd::lookup_types(
//!     &cancel,
//!     ["_http._tcp.local.", "_ipp._tcp.local."],
//!     |entry| println!("+ {} {:?}", entry.service_instance_name(), entry.ips),
//!     |entry| println!("- {}", entry.service_instance_name()),
//! )
//! .await;
//! assert!(matches!(result, Err(cotton_dnssd::Error::Cancelled)));
//! # }
//! ```
//!
//! The protocol logic lives in [`Browser`], which does no I/O of its
//! own and can be driven by anything implementing [`Connection`]; the
//! [`browse()`] function drives it with tokio, and [`MdnsConnection`] is
//! the real multicast UDP transport.
//!
//! Only IPv4 is supported. Advertising services is not (yet) supported.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod browse;
mod cache;
mod config;
mod connection;
mod engine;
mod entry;
mod error;
mod name;
mod netif;
mod query;
mod service;
mod udp;

pub use browse::{browse, lookup_type, lookup_types, lookup_with_config};
pub use cache::Cache;
pub use config::{
    BrowseConfig, MAX_PACKET_SIZE, MDNS_MULTICAST_IPV4, MDNS_PORT,
};
pub use connection::{Connection, Received};
pub use engine::{Browser, Callback, Callbacks};
pub use entry::BrowseEntry;
pub use error::{Error, Syscall};
pub use name::{escape_label, fqdn, unescape};
pub use netif::{
    interfaces, multicast_interfaces, Flags, Interface, InterfaceIndex,
};
pub use query::{browse_message, Query};
pub use service::Service;
pub use udp::MdnsConnection;
