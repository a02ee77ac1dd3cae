//! UDP transport between the two nodes of a pair.
//!
//! Each node binds one UDP socket on its local port and sends every datagram
//! to the single peer it was configured with.  There is no handshake and no
//! delivery confirmation.  The only access control is the source check in
//! [`UdpTransport::recv_from_peer`]: datagrams whose source IP is not the
//! peer's are discarded before decoding.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::{debug, info, trace};

use crate::application::publish_pose::PeerSender;

/// Errors raised while setting up the transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The local UDP socket could not be bound.
    #[error("failed to bind UDP socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// No local interface routes to the peer.
    #[error("no route to peer {peer}: {source}")]
    NoRoute {
        peer: IpAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Local and peer endpoints of a node, fixed for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    pub node_name: String,
    pub local: SocketAddr,
    pub peer: SocketAddr,
}

/// A bound UDP socket that only talks to one peer.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl UdpTransport {
    /// Binds the local endpoint of `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::BindFailed`] if the address is in use or not
    /// assigned to this host.
    pub async fn bind(identity: &NodeIdentity) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(identity.local)
            .await
            .map_err(|source| TransportError::BindFailed {
                addr: identity.local,
                source,
            })?;
        info!(
            "{} listening on {}, peer {}",
            identity.node_name,
            socket.local_addr().unwrap_or(identity.local),
            identity.peer
        );
        Ok(Self {
            socket,
            peer: identity.peer,
        })
    }

    /// Address actually bound (resolves port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Waits for the next datagram from the peer and returns its length.
    ///
    /// Datagrams from any other source are dropped silently.  Waits forever
    /// if the peer never sends.
    ///
    /// Some platforms surface an ICMP "port unreachable" for an earlier send
    /// as a reset on the next receive; that only means the peer is not up
    /// yet, so it is skipped.
    pub async fn recv_from_peer(&self, buf: &mut [u8]) -> std::io::Result<usize> {
        loop {
            let (len, src) = match self.socket.recv_from(buf).await {
                Ok(received) => received,
                Err(e) if is_peer_unreachable(&e) => {
                    debug!("peer {} not reachable yet: {e}", self.peer);
                    continue;
                }
                Err(e) => return Err(e),
            };
            if is_from_peer(src, self.peer) {
                return Ok(len);
            }
            trace!("discarding {len} bytes from non-peer {src}");
        }
    }
}

#[async_trait]
impl PeerSender for UdpTransport {
    async fn send_to_peer(&self, datagram: &[u8]) -> std::io::Result<()> {
        self.socket.send_to(datagram, self.peer).await.map(|_| ())
    }
}

/// Whether a datagram from `src` comes from the configured peer.
///
/// Only the IP is compared: the peer's sending port is its own local port,
/// which need not match the port we send to.
pub fn is_from_peer(src: SocketAddr, peer: SocketAddr) -> bool {
    src.ip() == peer.ip()
}

fn is_peer_unreachable(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionRefused
    )
}

/// The local IP address the OS would use to reach `peer`.
///
/// Connecting a UDP socket only selects a route; nothing is sent.
///
/// # Errors
///
/// Returns [`TransportError::NoRoute`] when no interface routes to `peer`.
pub fn route_local_ip(peer: IpAddr) -> Result<IpAddr, TransportError> {
    let no_route = |source| TransportError::NoRoute { peer, source };
    let unspecified: IpAddr = match peer {
        IpAddr::V4(_) => Ipv4Addr::UNSPECIFIED.into(),
        IpAddr::V6(_) => std::net::Ipv6Addr::UNSPECIFIED.into(),
    };
    let probe = std::net::UdpSocket::bind((unspecified, 0)).map_err(no_route)?;
    probe.connect((peer, 80)).map_err(no_route)?;
    Ok(probe.local_addr().map_err(no_route)?.ip())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
