//! Directed send primitives over the replication channel.
//!
//! The transport is an explicitly constructed service object owned by the
//! server: it holds the channel identity (namespace + version predicate), the
//! packet registry, and the connection bookkeeping that turns "observers of
//! entity X" into socket addresses. Sends are fire-and-forget through an
//! unbounded outbound queue consumed by the socket sender task; there is no
//! acknowledgment, no retry and no backpressure. Before [`Transport::init`]
//! installs that queue every send is a logged no-op.
//!
//! Entity ids equal connection ids here: each accepted connection controls
//! exactly one player entity.

use log::{error, warn};
use shared::envelope::Envelope;
use shared::packets::{encode_frame, PacketRegistry, S2cPacketIds, StatPacket};
use shared::store::EntityId;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use tokio::sync::mpsc;

/// Unique id of a connected client.
pub type ConnId = u32;

/// Channel identity checked during the handshake. Both ends currently accept
/// any version; the namespace has to match exactly.
pub struct ChannelConfig {
    pub namespace: String,
    pub version: String,
    pub accept_version: fn(&str) -> bool,
}

impl ChannelConfig {
    pub fn accept_any(_version: &str) -> bool {
        true
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            namespace: shared::CHANNEL_NAMESPACE.to_string(),
            version: shared::PROTOCOL_VERSION.to_string(),
            accept_version: Self::accept_any,
        }
    }
}

/// A serialized datagram queued for the socket sender task.
#[derive(Debug)]
pub struct OutboundFrame {
    pub addr: SocketAddr,
    pub data: Vec<u8>,
}

pub struct Transport {
    config: ChannelConfig,
    registry: PacketRegistry,
    ids: S2cPacketIds,
    outbound: Option<mpsc::UnboundedSender<OutboundFrame>>,
    connections: HashMap<ConnId, SocketAddr>,
    owners: HashMap<EntityId, ConnId>,
    observers: HashMap<EntityId, HashSet<ConnId>>,
}

impl Transport {
    pub fn new(config: ChannelConfig) -> Self {
        let mut registry = PacketRegistry::new();
        let ids = shared::packets::register_s2c(&mut registry);
        Self {
            config,
            registry,
            ids,
            outbound: None,
            connections: HashMap::new(),
            owners: HashMap::new(),
            observers: HashMap::new(),
        }
    }

    /// Installs the outbound queue. Must be called exactly once before any
    /// send; a second call is a configuration error and keeps the first queue.
    pub fn init(&mut self, outbound: mpsc::UnboundedSender<OutboundFrame>) {
        if self.outbound.is_some() {
            error!("replication channel is already initialized, ignoring init");
            return;
        }
        self.outbound = Some(outbound);
    }

    pub fn is_initialized(&self) -> bool {
        self.outbound.is_some()
    }

    /// Hands out the next packet type id. Registration order is part of the
    /// wire contract; the built-in snapshots already occupy ids 0 and 1.
    pub fn allocate_packet_id(&mut self) -> i32 {
        self.registry.assign_id()
    }

    /// Whether a handshake with this namespace and version is acceptable.
    pub fn accepts(&self, namespace: &str, version: &str) -> bool {
        namespace == self.config.namespace && (self.config.accept_version)(version)
    }

    pub fn add_connection(&mut self, conn: ConnId, addr: SocketAddr) {
        self.connections.insert(conn, addr);
    }

    /// Drops the connection and every ownership or observer entry naming it.
    pub fn remove_connection(&mut self, conn: ConnId) {
        self.connections.remove(&conn);
        self.owners.retain(|_, owner| *owner != conn);
        for observer_set in self.observers.values_mut() {
            observer_set.remove(&conn);
        }
        self.observers.retain(|_, set| !set.is_empty());
    }

    pub fn connection_addr(&self, conn: ConnId) -> Option<SocketAddr> {
        self.connections.get(&conn).copied()
    }

    pub fn connection_ids(&self) -> impl Iterator<Item = ConnId> + '_ {
        self.connections.keys().copied()
    }

    pub fn set_owner(&mut self, entity: EntityId, conn: ConnId) {
        self.owners.insert(entity, conn);
    }

    pub fn owner_of(&self, entity: EntityId) -> Option<ConnId> {
        self.owners.get(&entity).copied()
    }

    pub fn start_observing(&mut self, observer: ConnId, entity: EntityId) {
        self.observers.entry(entity).or_default().insert(observer);
    }

    pub fn stop_observing(&mut self, observer: ConnId, entity: EntityId) {
        if let Some(set) = self.observers.get_mut(&entity) {
            set.remove(&observer);
            if set.is_empty() {
                self.observers.remove(&entity);
            }
        }
    }

    /// Sends a replication packet to a single connection.
    pub fn send_to_connection(&self, packet: &StatPacket, target: ConnId) {
        let Some(addr) = self.connection_addr(target) else {
            warn!("connection {} is unknown, dropping send", target);
            return;
        };
        self.queue(addr, self.frame(packet));
    }

    /// Sends a replication packet to every connection.
    pub fn send_to_all(&self, packet: &StatPacket) {
        let data = self.frame(packet);
        for addr in self.connections.values() {
            self.queue(*addr, data.clone());
        }
    }

    /// Sends a replication packet to every connection currently observing the
    /// subject entity, excluding its owner.
    pub fn send_to_observers(&self, packet: &StatPacket, subject: EntityId) {
        let data = self.frame(packet);
        for conn in self.observer_conns(subject) {
            if let Some(addr) = self.connection_addr(conn) {
                self.queue(addr, data.clone());
            }
        }
    }

    /// Like [`send_to_observers`](Self::send_to_observers) but also delivers
    /// to the subject's owning connection.
    pub fn send_to_observers_and_self(&self, packet: &StatPacket, subject: EntityId) {
        let data = self.frame(packet);
        let mut targets: HashSet<ConnId> = self.observer_conns(subject).collect();
        if let Some(owner) = self.owner_of(subject) {
            targets.insert(owner);
        }
        for conn in targets {
            if let Some(addr) = self.connection_addr(conn) {
                self.queue(addr, data.clone());
            }
        }
    }

    /// Sends a control envelope to a single connection.
    pub fn send_envelope(&self, envelope: &Envelope, target: ConnId) {
        if let Some(addr) = self.connection_addr(target) {
            self.send_envelope_to(envelope, addr);
        } else {
            warn!("connection {} is unknown, dropping envelope", target);
        }
    }

    /// Sends a control envelope straight to an address. Used for handshake
    /// replies before a connection exists.
    pub fn send_envelope_to(&self, envelope: &Envelope, addr: SocketAddr) {
        let Some(outbound) = &self.outbound else {
            error!("replication channel is not initialized, dropping envelope");
            return;
        };
        match envelope.to_bytes() {
            Ok(data) => {
                if outbound.send(OutboundFrame { addr, data }).is_err() {
                    error!("outbound queue is closed, dropping envelope");
                }
            }
            Err(e) => error!("failed to serialize envelope: {}", e),
        }
    }

    fn observer_conns(&self, subject: EntityId) -> impl Iterator<Item = ConnId> + '_ {
        self.observers
            .get(&subject)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    fn frame(&self, packet: &StatPacket) -> Vec<u8> {
        match packet {
            StatPacket::Full(p) => encode_frame(self.ids.full, |w| p.encode(w)),
            StatPacket::Public(p) => encode_frame(self.ids.public, |w| p.encode(w)),
        }
    }

    fn queue(&self, addr: SocketAddr, frame: Vec<u8>) {
        let Some(outbound) = &self.outbound else {
            error!("replication channel is not initialized, dropping send");
            return;
        };
        match (Envelope::Frame { data: frame }).to_bytes() {
            Ok(data) => {
                if outbound.send(OutboundFrame { addr, data }).is_err() {
                    error!("outbound queue is closed, dropping send");
                }
            }
            Err(e) => error!("failed to serialize frame envelope: {}", e),
        }
    }
}
