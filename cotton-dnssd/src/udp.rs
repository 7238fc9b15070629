//! The mDNS transport: one IPv4 UDP socket, joined to the mDNS group
//! on every multicast-capable interface
//!
//! Sends and receives go through `sendmsg`/`recvmsg` with `IP_PKTINFO`,
//! so that each query leaves on exactly one interface, and each
//! response is attributed to the interface it arrived on.

use crate::config::{BrowseConfig, MDNS_MULTICAST_IPV4};
use crate::connection::{Connection, Received};
use crate::error::{Error, Syscall};
use crate::netif::{self, Interface, InterfaceIndex};
use crate::query::Query;
use futures_util::stream::BoxStream;
use hickory_proto::op::Message;
use log::{debug, warn};
use nix::cmsg_space;
use nix::sys::socket::setsockopt;
use nix::sys::socket::sockopt::Ipv4PacketInfo;
use nix::sys::socket::{
    ControlMessage, ControlMessageOwned, MsgFlags, SockaddrStorage,
};
use std::io::{IoSlice, IoSliceMut};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::os::unix::io::{AsRawFd, RawFd};
use tokio::io::Interest;
use tokio_util::sync::CancellationToken;

fn setup_socket(port: u16) -> Result<socket2::Socket, Error> {
    let sockopt = |e| Error::Syscall(Syscall::Setsockopt, e);
    let socket = socket2::Socket::new(
        socket2::Domain::IPV4,
        socket2::Type::DGRAM,
        Some(socket2::Protocol::UDP),
    )
    .map_err(|e| Error::Syscall(Syscall::Socket, e))?;
    socket.set_nonblocking(true).map_err(sockopt)?;
    // Share the port with any system mDNS responder
    socket.set_reuse_address(true).map_err(sockopt)?;
    socket.set_reuse_port(true).map_err(sockopt)?;
    socket
        .bind(&socket2::SockAddr::from(SocketAddrV4::new(
            Ipv4Addr::UNSPECIFIED,
            port,
        )))
        .map_err(|e| Error::Syscall(Syscall::Bind, e))?;
    setsockopt(&socket, Ipv4PacketInfo, &true)
        .map_err(|e| sockopt(e.into()))?;
    socket.set_multicast_ttl_v4(255).map_err(sockopt)?;
    socket.set_multicast_loop_v4(true).map_err(sockopt)?;
    Ok(socket)
}

#[allow(clippy::cast_possible_truncation)] // socklen_t
#[allow(clippy::cast_possible_wrap)] // ifindex
fn join_multicast(
    fd: RawFd,
    group: Ipv4Addr,
    interface: InterfaceIndex,
) -> Result<(), std::io::Error> {
    // std and tokio can only join by IP address, which is ambiguous
    // when two interfaces share an address; ip_mreqn joins by index.
    let mreqn = libc::ip_mreqn {
        imr_multiaddr: libc::in_addr {
            s_addr: u32::from_ne_bytes(group.octets()),
        },
        imr_address: libc::in_addr { s_addr: 0 },
        imr_ifindex: interface.0.get() as libc::c_int,
    };
    unsafe {
        let ret = libc::setsockopt(
            fd,
            libc::IPPROTO_IP,
            libc::IP_ADD_MEMBERSHIP,
            std::ptr::addr_of!(mreqn).cast::<libc::c_void>(),
            std::mem::size_of_val(&mreqn) as libc::socklen_t,
        );
        if ret != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(())
}

#[allow(clippy::cast_possible_wrap)] // ifindex
fn send_on(
    fd: RawFd,
    buffer: &[u8],
    to: SocketAddrV4,
    interface: InterfaceIndex,
) -> Result<(), std::io::Error> {
    let iov = [IoSlice::new(buffer)];
    let pi = libc::in_pktinfo {
        ipi_ifindex: interface.0.get() as libc::c_int,
        ipi_addr: libc::in_addr { s_addr: 0 },
        ipi_spec_dst: libc::in_addr { s_addr: 0 },
    };
    let cmsg = ControlMessage::Ipv4PacketInfo(&pi);
    nix::sys::socket::sendmsg(
        fd,
        &iov,
        &[cmsg],
        MsgFlags::empty(),
        Some(&SockaddrStorage::from(to)),
    )?;
    Ok(())
}

/// One datagram: its length, arrival interface index, and sender
type Datagram = (usize, Option<u32>, Option<SocketAddr>);

fn receive_from(
    fd: RawFd,
    buffer: &mut [u8],
) -> Result<Datagram, std::io::Error> {
    let mut cmsgspace = cmsg_space!(libc::in_pktinfo);
    let mut iov = [IoSliceMut::new(buffer)];
    let r = nix::sys::socket::recvmsg::<SockaddrStorage>(
        fd,
        &mut iov,
        Some(&mut cmsgspace),
        MsgFlags::empty(),
    )?;
    let ifindex = r.cmsgs().find_map(|c| match c {
        ControlMessageOwned::Ipv4PacketInfo(pi) => {
            u32::try_from(pi.ipi_ifindex).ok()
        }
        _ => None,
    });
    let from = r.address.and_then(|ss| {
        ss.as_sockaddr_in().map(|sin| {
            SocketAddr::V4(SocketAddrV4::new(
                Ipv4Addr::from(sin.ip()),
                sin.port(),
            ))
        })
    });
    Ok((r.bytes, ifindex, from))
}

/// A real mDNS connection
///
/// Must be opened from within a tokio runtime. Dropping it closes the
/// socket, leaving the multicast group on every interface.
pub struct MdnsConnection {
    socket: tokio::net::UdpSocket,
    port: u16,
    max_packet_size: usize,
    all_interfaces: Vec<Interface>,
    multicast_interfaces: Vec<Interface>,
}

impl MdnsConnection {
    /// Bind the mDNS port and join the mDNS group
    ///
    /// Interfaces are enumerated once, here.
    ///
    /// # Errors
    ///
    /// Returns `Error::Syscall` if interfaces can't be listed, or the
    /// socket can't be created, configured, or bound. Failing to join
    /// the group on one interface is not an error: that interface is
    /// left out.
    pub fn open(config: &BrowseConfig) -> Result<Self, Error> {
        let socket = setup_socket(config.port)?;
        let all_interfaces = netif::interfaces()?;
        let mut multicast_interfaces = Vec::new();
        for interface in netif::multicast_interfaces(&all_interfaces) {
            match join_multicast(
                socket.as_raw_fd(),
                MDNS_MULTICAST_IPV4,
                interface.index,
            )
            .map_err(|e| Error::Syscall(Syscall::JoinMulticast, e))
            {
                Ok(()) => {
                    debug!("joined mDNS group on {}", interface.name);
                    multicast_interfaces.push(interface);
                }
                Err(e) => {
                    warn!(
                        "can't join mDNS group on {}: {e} ({:?})",
                        interface.name,
                        std::error::Error::source(&e)
                    );
                }
            }
        }
        let socket = tokio::net::UdpSocket::from_std(socket.into())
            .map_err(|e| Error::Syscall(Syscall::Socket, e))?;
        Ok(Self {
            socket,
            port: config.port,
            max_packet_size: config.max_packet_size,
            all_interfaces,
            multicast_interfaces,
        })
    }

    /// The locally-bound address, useful when opened on port 0
    ///
    /// # Errors
    ///
    /// Passes on errors from `getsockname`.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.socket.local_addr()
    }

    fn receive(&self, buffer: &mut [u8]) -> Result<Option<Received>, Error> {
        let (n, ifindex, from) = self
            .socket
            .try_io(Interest::READABLE, || {
                receive_from(self.socket.as_raw_fd(), buffer)
            })
            .map_err(|e| Error::Syscall(Syscall::Recvmsg, e))?;
        let ifindex = ifindex.ok_or(Error::NoPacketInfo)?;
        let Some(from) = from else {
            return Err(Error::Ipv6NotImplemented);
        };
        let Some(interface) = self
            .all_interfaces
            .iter()
            .find(|i| i.index.0.get() == ifindex)
        else {
            debug!("datagram from {from} on unknown interface {ifindex}");
            return Ok(None);
        };
        match Message::from_vec(&buffer[..n]) {
            Ok(message) => Ok(Some(Received {
                message,
                interface: interface.clone(),
                from,
            })),
            Err(e) => {
                debug!("unparseable datagram from {from}: {e}");
                Ok(None)
            }
        }
    }
}

impl Connection for MdnsConnection {
    fn interfaces(&self) -> Vec<Interface> {
        self.multicast_interfaces.clone()
    }

    fn send_query(&self, query: &Query) -> Result<(), Error> {
        let bytes = query.to_bytes()?;
        // The socket is non-blocking: a send which would block fails
        // rather than waits.
        send_on(
            self.socket.as_raw_fd(),
            &bytes,
            SocketAddrV4::new(MDNS_MULTICAST_IPV4, self.port),
            query.interface().index,
        )
        .map_err(|e| Error::Syscall(Syscall::Sendmsg, e))
    }

    fn incoming(&self, cancel: CancellationToken) -> BoxStream<'_, Received> {
        Box::pin(async_stream::stream! {
            let mut buffer = vec![0u8; self.max_packet_size];
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    r = self.socket.readable() => if let Err(e) = r {
                        warn!("mDNS socket failed: {e}");
                        break;
                    },
                }
                match self.receive(&mut buffer) {
                    Ok(Some(received)) => yield received,
                    Ok(None) => {}
                    Err(Error::Syscall(_, e))
                        if e.kind() == std::io::ErrorKind::WouldBlock => {}
                    Err(e) => debug!("mDNS receive: {e}"),
                }
            }
        })
    }
}
