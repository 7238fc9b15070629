use crate::config::BrowseConfig;
use crate::connection::Connection;
use crate::engine::{Browser, Callback, Callbacks};
use crate::entry::BrowseEntry;
use crate::error::Error;
use crate::query::Query;
use crate::udp::MdnsConnection;
use futures_util::StreamExt;
use log::{debug, warn};
use std::convert::Infallible;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Run a browse operation over a connection, until cancelled
///
/// Queries are sent once on every interface of `conn`, by a separate
/// task; meanwhile every incoming message is passed to `browser`,
/// which invokes its callbacks. Nothing is processed once `cancel`
/// has fired, even if a message arrives at the same moment.
///
/// # Errors
///
/// Always returns `Error::Cancelled` eventually: browsing has no other
/// way to finish. Failures to send a query are logged, not returned.
pub async fn browse<C, CB>(
    conn: &C,
    mut browser: Browser<CB>,
    cancel: &CancellationToken,
) -> Result<Infallible, Error>
where
    C: Connection,
    CB: Callback,
{
    let interfaces = conn.interfaces();
    let message = browser.query_message();
    let (tx, mut rx) = mpsc::channel(interfaces.len().max(1));
    let dispatch = tokio::spawn(async move {
        for interface in interfaces {
            if tx.send(Query::new(message.clone(), interface)).await.is_err()
            {
                break;
            }
        }
    });

    let mut incoming = conn.incoming(cancel.clone());
    let mut dispatching = true;
    let mut receiving = true;

    let error = loop {
        if cancel.is_cancelled() {
            break Error::Cancelled;
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => {},
            q = rx.recv(), if dispatching => match q {
                Some(query) => {
                    match conn.send_query(&query) {
                        Ok(()) => debug!(
                            "query sent on {}", query.interface_name()),
                        Err(e) => warn!(
                            "can't send query on {}: {e}",
                            query.interface_name()),
                    }
                }
                None => dispatching = false,
            },
            r = incoming.next(), if receiving => match r {
                Some(r) => browser.on_message(
                    &r.message,
                    &r.interface,
                    Instant::now(),
                ),
                None => receiving = false,
            },
        }
    };

    dispatch.abort();
    let _ = dispatch.await;
    Err(error)
}

/// Browse for one service type on all interfaces, until cancelled
///
/// `add` is called for each new service instance (per interface),
/// and `rmv` when it goes away.
///
/// ```no_run
/// # async fn f() {
/// let cancel = tokio_util::sync::CancellationToken::new();
/// let _ = cotton_dnssd::lookup_type(
///     &cancel,
///     "_http._tcp.local.",
///     |e| println!("+ {}", e.unescaped_service_instance_name()),
///     |e| println!("- {}", e.unescaped_service_instance_name()),
/// )
/// .await;
/// # }
/// ```
///
/// # Errors
///
/// Returns setup errors immediately (see [`MdnsConnection::open`]);
/// otherwise returns `Error::Cancelled` once `cancel` fires.
pub async fn lookup_type<A, R>(
    cancel: &CancellationToken,
    service: &str,
    add: A,
    rmv: R,
) -> Result<Infallible, Error>
where
    A: FnMut(&BrowseEntry),
    R: FnMut(&BrowseEntry),
{
    lookup_types(cancel, [service], add, rmv).await
}

/// Browse for several service types at once, until cancelled
///
/// # Errors
///
/// As for [`lookup_type`].
pub async fn lookup_types<I, S, A, R>(
    cancel: &CancellationToken,
    services: I,
    add: A,
    rmv: R,
) -> Result<Infallible, Error>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
    A: FnMut(&BrowseEntry),
    R: FnMut(&BrowseEntry),
{
    lookup_with_config(
        cancel,
        &BrowseConfig::new(services),
        Callbacks::new(add, rmv),
    )
    .await
}

/// Browse with full control of the configuration
///
/// # Errors
///
/// As for [`lookup_type`], plus errors from [`BrowseConfig::validate`].
pub async fn lookup_with_config<CB: Callback>(
    cancel: &CancellationToken,
    config: &BrowseConfig,
    callback: CB,
) -> Result<Infallible, Error> {
    let browser = Browser::new(config, callback)?;
    let conn = MdnsConnection::open(config)?;
    browse(&conn, browser, cancel).await
}
