/// The list of system calls which can return errors
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    /// getifaddrs() returned an error
    Getifaddrs,
    /// socket() returned an error
    Socket,
    /// setsockopt() for a socket option returned an error
    Setsockopt,
    /// bind() returned an error
    Bind,
    /// setsockopt(IP_ADD_MEMBERSHIP) returned an error
    JoinMulticast,
    /// sendmsg() returned an error
    Sendmsg,
    /// recvmsg() returned an error
    Recvmsg,
}

/// The errors which can be returned from browsing
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No service types were given to browse for
    #[error("no service types to browse for")]
    NoServiceTypes,

    /// A service type is not a valid DNS name
    #[error("invalid service type {0:?}")]
    InvalidServiceType(String, #[source] hickory_proto::error::ProtoError),

    /// The receive buffer couldn't hold even a DNS header
    #[error("packet size {0} is too small for a DNS message")]
    PacketSizeTooSmall(usize),

    /// A DNS message could not be encoded
    #[error("cannot encode DNS message")]
    Encode(#[source] hickory_proto::error::ProtoError),

    /// recvmsg didn't return packet info as expected
    #[error("recvmsg: no pktinfo returned")]
    NoPacketInfo,

    /// IPv6 attempted (NYI)
    #[error("IPv6 not implemented")]
    Ipv6NotImplemented,

    /// A system call returned an error
    #[error("error from syscall {0:?}")]
    Syscall(Syscall, #[source] std::io::Error),

    /// The browse operation was cancelled by its caller
    #[error("browse cancelled")]
    Cancelled,
}
