use crate::error::Error;
use crate::netif::Interface;
use crate::query::Query;
use futures_util::stream::BoxStream;
use hickory_proto::op::Message;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;

/// One incoming mDNS message
#[derive(Debug, Clone)]
pub struct Received {
    /// The parsed message
    pub message: Message,
    /// The interface it arrived on
    pub interface: Interface,
    /// The sender
    pub from: SocketAddr,
}

/// Multicast transport for browsing
///
/// Implemented by [`crate::MdnsConnection`] for real networks, and by
/// fakes in tests. Dropping the connection releases it.
pub trait Connection {
    /// The multicast-capable interfaces queries can be sent on
    fn interfaces(&self) -> Vec<Interface>;

    /// Send a query on its interface only
    ///
    /// # Errors
    ///
    /// Returns `Error::Syscall` (or `Error::Encode`) if the query
    /// could not be sent.
    fn send_query(&self, query: &Query) -> Result<(), Error>;

    /// Every incoming message, until `cancel` fires
    fn incoming(&self, cancel: CancellationToken) -> BoxStream<'_, Received>;
}
