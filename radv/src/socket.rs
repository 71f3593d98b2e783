// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Raw ICMPv6 socket for sending RAs and receiving RSs.
//!
//! The kernel implementation binds a raw ICMPv6 socket to one interface,
//! joins the all-routers group, installs an ICMPv6 filter that passes only
//! Router Solicitations, and pins the outbound hop limit to 255 as RFC 4861
//! requires. The socket is driven through [`AsyncFd`]; the kernel computes
//! the ICMPv6 checksum on this socket type, so outbound messages carry zero
//! checksum octets.

use crate::errors::SocketError;
use crate::shutdown::cancelled;
use async_trait::async_trait;
use ndp::ICMPV6_ROUTER_SOLICITATION;
use ndp::ra::RouterAdvertisement;
use ndp::solicit::RouterSolicitation;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io;
use std::mem::MaybeUninit;
use std::net::{Ipv6Addr, SocketAddrV6};
use std::os::fd::AsRawFd;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::unix::AsyncFd;
use tokio::sync::watch;
use tokio::time::timeout;

/// All-nodes link-local multicast group, the destination of unsolicited RAs.
pub(crate) const ALL_NODES: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 1);

/// All-routers link-local multicast group, which RSs are addressed to.
const ALL_ROUTERS: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 2);

/// A write to a raw socket should not take long; two seconds means
/// something is wrong.
const SEND_TIMEOUT: Duration = Duration::from_secs(2);

/// One raw socket bound to one interface: RA out, RS in.
#[async_trait]
pub(crate) trait RaSocket: Send + Sync {
    /// Send one RA to `dst`: either the all-nodes group or the link-local
    /// source of a solicitation. Obeys `cancel` and the internal write
    /// timeout.
    async fn send_ra(
        &self,
        dst: Ipv6Addr,
        ra: &RouterAdvertisement,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<(), SocketError>;

    /// Deliver the next valid RS and its source address. Non-RS packets are
    /// dropped without being reported. Obeys `cancel`.
    async fn recv_rs(
        &self,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<(RouterSolicitation, Ipv6Addr), SocketError>;
}

/// Opens sockets for workers. The daemon carries one of these so tests can
/// substitute a fake registry; release is `Drop` on the returned socket.
pub(crate) trait SocketFactory: Send + Sync {
    /// Open a socket bound to `interface`.
    fn open(&self, interface: &str) -> Result<Arc<dyn RaSocket>, SocketError>;
}

/// The kernel-backed [`SocketFactory`].
pub(crate) struct KernelSocketFactory;

impl SocketFactory for KernelSocketFactory {
    fn open(&self, interface: &str) -> Result<Arc<dyn RaSocket>, SocketError> {
        KernelRaSocket::open(interface).map(|sock| Arc::new(sock) as Arc<dyn RaSocket>)
    }
}

/// A raw ICMPv6 socket bound to one interface.
pub(crate) struct KernelRaSocket {
    fd: AsyncFd<Socket>,
    ifindex: u32,
}

impl KernelRaSocket {
    fn open(interface: &str) -> Result<KernelRaSocket, SocketError> {
        let open_error = |source: io::Error| SocketError::Open {
            interface: interface.to_string(),
            source,
        };

        let ifindex = nix::net::if_::if_nametoindex(interface)
            .map_err(|errno| open_error(io::Error::from_raw_os_error(errno as i32)))?;

        let socket = Socket::new(Domain::IPV6, Type::RAW, Some(Protocol::ICMPV6))
            .map_err(open_error)?;
        socket
            .bind_device(Some(interface.as_bytes()))
            .map_err(open_error)?;
        socket
            .join_multicast_v6(&ALL_ROUTERS, ifindex)
            .map_err(open_error)?;
        // RFC 4861 §6.2.8: NDP messages must leave with hop limit 255, and
        // receivers discard anything that arrives with less.
        socket.set_multicast_hops_v6(255).map_err(open_error)?;
        socket.set_unicast_hops_v6(255).map_err(open_error)?;
        socket.set_multicast_loop_v6(false).map_err(open_error)?;
        set_icmpv6_filter(&socket, ICMPV6_ROUTER_SOLICITATION).map_err(open_error)?;
        socket.set_nonblocking(true).map_err(open_error)?;

        Ok(KernelRaSocket {
            fd: AsyncFd::new(socket).map_err(open_error)?,
            ifindex,
        })
    }
}

#[async_trait]
impl RaSocket for KernelRaSocket {
    async fn send_ra(
        &self,
        dst: Ipv6Addr,
        ra: &RouterAdvertisement,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<(), SocketError> {
        let bytes = ra
            .encode()
            .map_err(|e| SocketError::Send(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        let target: SockAddr = SocketAddrV6::new(dst, 0, 0, self.ifindex).into();

        let write = async {
            loop {
                let mut guard = self.fd.writable().await.map_err(SocketError::Send)?;
                match guard.try_io(|inner| inner.get_ref().send_to(&bytes, &target)) {
                    Ok(Ok(_)) => return Ok(()),
                    Ok(Err(e)) => return Err(SocketError::Send(e)),
                    Err(_would_block) => {}
                }
            }
        };

        tokio::select! {
            result = timeout(SEND_TIMEOUT, write) => match result {
                Ok(result) => result,
                Err(_) => Err(SocketError::Send(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "write timed out",
                ))),
            },
            () = cancelled(cancel) => Err(SocketError::Cancelled),
        }
    }

    async fn recv_rs(
        &self,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<(RouterSolicitation, Ipv6Addr), SocketError> {
        let read = async {
            loop {
                let mut guard = self.fd.readable().await.map_err(SocketError::Recv)?;
                let mut buf = [MaybeUninit::new(0u8); 1280];
                let (len, sender) = match guard.try_io(|inner| inner.get_ref().recv_from(&mut buf))
                {
                    Ok(Ok(received)) => received,
                    Ok(Err(e)) => return Err(SocketError::Recv(e)),
                    Err(_would_block) => continue,
                };
                let Some(sender) = sender.as_socket_ipv6() else {
                    continue;
                };
                let filled = &buf[..len];
                // The kernel wrote `len` bytes; viewing them as initialized
                // is sound.
                #[allow(unsafe_code)]
                let bytes =
                    unsafe { &*(std::ptr::from_ref::<[MaybeUninit<u8>]>(filled) as *const [u8]) };
                // The ICMPv6 filter passes only RSs; this also drops
                // anything malformed.
                match RouterSolicitation::parse(bytes) {
                    Ok(rs) => return Ok((rs, *sender.ip())),
                    Err(_) => continue,
                }
            }
        };

        tokio::select! {
            result = read => result,
            () = cancelled(cancel) => Err(SocketError::Cancelled),
        }
    }
}

/// Install an ICMPv6 type filter passing only `pass`.
///
/// `struct icmp6_filter` is a 256-bit mask where a set bit means block
/// (RFC 3542 §3.2); block everything, then clear the bit for `pass`.
fn set_icmpv6_filter(socket: &Socket, pass: u8) -> io::Result<()> {
    // Not exposed by libc as a constant; see linux/icmpv6.h.
    const ICMPV6_FILTER: libc::c_int = 1;

    let mut filter = [u32::MAX; 8];
    filter[usize::from(pass >> 5)] &= !(1u32 << (pass & 31));

    #[allow(unsafe_code)]
    let rc = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::IPPROTO_ICMPV6,
            ICMPV6_FILTER,
            filter.as_ptr().cast(),
            #[allow(clippy::cast_possible_truncation)]
            {
                std::mem::size_of_val(&filter) as libc::socklen_t
            },
        )
    };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
