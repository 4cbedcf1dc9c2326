//! LAN presence: UDP multicast beacons, unicast responses, peer timeouts.
//!
//! This is the peer-changed half of the transport: every peer appearing or
//! disappearing on the presence plane becomes one typed event for the
//! session consumer. The data-plane address of each live peer is kept in a
//! shared map for the send path.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use canvass_core::{MeshEvent, PeerId};
use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Mutex};

const MULTICAST_GROUP: &str = "239.255.72.41";
const BEACON_INTERVAL: Duration = Duration::from_secs(5);
const PEER_TIMEOUT: Duration = Duration::from_secs(20);
const SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Presence wire version. Datagrams with any other version are ignored.
pub const PRESENCE_VERSION: u8 = 1;

/// Presence datagrams. Encoding is bincode, one message per datagram.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Presence {
    /// Periodic multicast advertisement.
    Beacon {
        version: u8,
        peer_id: PeerId,
        data_port: u16,
    },
    /// Unicast reply to a beacon.
    Response {
        version: u8,
        peer_id: PeerId,
        data_port: u16,
    },
    /// Graceful goodbye; multicast on shutdown.
    Leave { peer_id: PeerId },
}

/// Data-plane addresses of live peers, shared with the send path.
pub type PeerAddrs = Arc<Mutex<HashMap<PeerId, SocketAddr>>>;

struct PeerState {
    last_seen: Instant,
}

struct Plane {
    local_id: PeerId,
    data_port: u16,
    peers: Mutex<HashMap<PeerId, PeerState>>,
    peer_addrs: PeerAddrs,
    events: mpsc::UnboundedSender<MeshEvent>,
}

/// Run the presence plane until the socket fails.
pub async fn run_discovery(
    local_id: PeerId,
    discovery_port: u16,
    data_port: u16,
    peer_addrs: PeerAddrs,
    events: mpsc::UnboundedSender<MeshEvent>,
) -> std::io::Result<()> {
    let socket = Arc::new(make_multicast_socket(discovery_port).await?);
    let plane = Arc::new(Plane {
        local_id,
        data_port,
        peers: Mutex::new(HashMap::new()),
        peer_addrs,
        events,
    });

    let beacon_task = tokio::spawn(beacon_loop(
        socket.clone(),
        local_id,
        discovery_port,
        data_port,
    ));
    let recv_task = tokio::spawn(recv_loop(socket, plane.clone()));
    let sweep_task = tokio::spawn(sweep_loop(plane));

    let _ = tokio::try_join!(beacon_task, recv_task, sweep_task);
    Ok(())
}

/// Multicast a goodbye so peers drop us without waiting for the timeout.
pub async fn announce_leave(discovery_port: u16, local_id: PeerId) -> std::io::Result<()> {
    let socket = UdpSocket::bind(("0.0.0.0", 0)).await?;
    let bytes = bincode::serialize(&Presence::Leave { peer_id: local_id })
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    socket.send_to(&bytes, multicast_dest(discovery_port)?).await?;
    Ok(())
}

fn multicast_dest(discovery_port: u16) -> std::io::Result<SocketAddr> {
    format!("{MULTICAST_GROUP}:{discovery_port}")
        .parse()
        .map_err(|e: std::net::AddrParseError| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
        })
}

async fn make_multicast_socket(discovery_port: u16) -> std::io::Result<UdpSocket> {
    let std_sock = std::net::UdpSocket::bind(("0.0.0.0", discovery_port))?;
    let multicast: std::net::Ipv4Addr =
        MULTICAST_GROUP
            .parse()
            .map_err(|e: std::net::AddrParseError| {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
            })?;
    std_sock.join_multicast_v4(&multicast, &std::net::Ipv4Addr::UNSPECIFIED)?;
    std_sock.set_multicast_ttl_v4(1)?;
    std_sock.set_nonblocking(true)?;
    tokio::net::UdpSocket::from_std(std_sock)
}

async fn beacon_loop(
    socket: Arc<UdpSocket>,
    local_id: PeerId,
    discovery_port: u16,
    data_port: u16,
) -> std::io::Result<()> {
    let beacon = Presence::Beacon {
        version: PRESENCE_VERSION,
        peer_id: local_id,
        data_port,
    };
    let bytes = bincode::serialize(&beacon)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let dest = multicast_dest(discovery_port)?;
    loop {
        let _ = socket.send_to(&bytes, dest).await;
        tokio::time::sleep(BEACON_INTERVAL).await;
    }
}

async fn recv_loop(socket: Arc<UdpSocket>, plane: Arc<Plane>) -> std::io::Result<()> {
    let mut buf = vec![0u8; 2048];
    loop {
        let (n, from) = socket.recv_from(&mut buf).await?;
        let msg: Presence = match bincode::deserialize(&buf[..n]) {
            Ok(m) => m,
            Err(_) => continue,
        };
        if let Some(response) = handle_presence(&plane, msg, from).await {
            if let Ok(bytes) = bincode::serialize(&response) {
                let _ = socket.send_to(&bytes, from).await;
            }
        }
    }
}

/// Process one presence datagram. Returns the unicast reply to send, if
/// any. Split out of the socket loop so it can be exercised directly.
async fn handle_presence(plane: &Plane, msg: Presence, from: SocketAddr) -> Option<Presence> {
    match msg {
        Presence::Beacon {
            version,
            peer_id,
            data_port,
        } => {
            if version != PRESENCE_VERSION || peer_id == plane.local_id {
                return None;
            }
            track_peer(plane, peer_id, SocketAddr::new(from.ip(), data_port)).await;
            Some(Presence::Response {
                version: PRESENCE_VERSION,
                peer_id: plane.local_id,
                data_port: plane.data_port,
            })
        }
        Presence::Response {
            version,
            peer_id,
            data_port,
        } => {
            if version != PRESENCE_VERSION || peer_id == plane.local_id {
                return None;
            }
            track_peer(plane, peer_id, SocketAddr::new(from.ip(), data_port)).await;
            None
        }
        Presence::Leave { peer_id } => {
            if peer_id == plane.local_id {
                return None;
            }
            let known = plane.peers.lock().await.remove(&peer_id).is_some();
            if known {
                plane.peer_addrs.lock().await.remove(&peer_id);
                log::info!("peer {peer_id} left");
                let _ = plane.events.send(MeshEvent::PeerLeft(peer_id));
            }
            None
        }
    }
}

async fn track_peer(plane: &Plane, peer_id: PeerId, addr: SocketAddr) {
    let is_new = {
        let mut peers = plane.peers.lock().await;
        let is_new = !peers.contains_key(&peer_id);
        peers.insert(
            peer_id,
            PeerState {
                last_seen: Instant::now(),
            },
        );
        is_new
    };
    plane.peer_addrs.lock().await.insert(peer_id, addr);
    if is_new {
        log::info!("peer {peer_id} joined at {addr}");
        let _ = plane.events.send(MeshEvent::PeerJoined(peer_id));
    }
}

async fn sweep_loop(plane: Arc<Plane>) -> std::io::Result<()> {
    loop {
        tokio::time::sleep(SWEEP_INTERVAL).await;
        let now = Instant::now();
        let timed_out: Vec<PeerId> = {
            let mut peers = plane.peers.lock().await;
            let list: Vec<PeerId> = peers
                .iter()
                .filter(|(_, s)| now.duration_since(s.last_seen) >= PEER_TIMEOUT)
                .map(|(id, _)| *id)
                .collect();
            for id in &list {
                peers.remove(id);
            }
            list
        };
        for peer_id in timed_out {
            plane.peer_addrs.lock().await.remove(&peer_id);
            log::info!("peer {peer_id} timed out");
            let _ = plane.events.send(MeshEvent::PeerLeft(peer_id));
        }
    }
}
