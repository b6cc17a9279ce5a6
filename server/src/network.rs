//! Authoritative server loop coordinating networking and stat replication.
//!
//! Datagrams are decoded eagerly on the receiver task and pushed as work
//! items into a bounded queue; the single tick loop drains that queue once
//! per tick and is the only place authoritative state is touched. Outgoing
//! traffic flows through the transport's unbounded queue to a dedicated
//! sender task.

use crate::controller::StatController;
use crate::transport::{ChannelConfig, ConnId, OutboundFrame, Transport};
use log::{debug, error, info, warn};
use rand::seq::SliceRandom;
use shared::envelope::{Envelope, PlayerAction};
use shared::store::EntityId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

/// Inbound work items, decoded on the receiver task and executed on the tick
/// loop. Anything that failed to decode never gets this far.
#[derive(Debug)]
pub enum Inbound {
    Hello {
        addr: SocketAddr,
        namespace: String,
        version: String,
    },
    Goodbye {
        addr: SocketAddr,
    },
    Ping {
        addr: SocketAddr,
    },
    Action {
        addr: SocketAddr,
        action: PlayerAction,
    },
}

/// Maps a decoded envelope to a work item. Envelope kinds a client should
/// never send are dropped here, on the receiver task.
pub fn classify(envelope: Envelope, addr: SocketAddr) -> Option<Inbound> {
    match envelope {
        Envelope::Hello { namespace, version } => Some(Inbound::Hello {
            addr,
            namespace,
            version,
        }),
        Envelope::Goodbye => Some(Inbound::Goodbye { addr }),
        Envelope::Ping => Some(Inbound::Ping { addr }),
        Envelope::Action { action } => Some(Inbound::Action { addr, action }),
        other => {
            warn!("unexpected envelope from {}: {:?}", addr, other);
            None
        }
    }
}

const INBOUND_QUEUE_CAPACITY: usize = 256;
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Starter races rolled for newly joined players.
const STARTER_RACES: [&str; 4] = ["human", "warrior", "mystic", "android"];

pub struct Server {
    socket: Arc<UdpSocket>,
    transport: Transport,
    controller: StatController,
    tick_duration: Duration,

    inbound_tx: mpsc::Sender<Inbound>,
    inbound_rx: mpsc::Receiver<Inbound>,
    outbound_rx: mpsc::UnboundedReceiver<OutboundFrame>,

    next_conn_id: ConnId,
    conns_by_addr: HashMap<SocketAddr, ConnId>,
    last_seen: HashMap<ConnId, Instant>,
}

impl Server {
    pub async fn new(
        addr: &str,
        tick_duration: Duration,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", addr);

        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        // Channel bootstrap happens before anything can send.
        let mut transport = Transport::new(ChannelConfig::default());
        transport.init(outbound_tx);

        Ok(Server {
            socket,
            transport,
            controller: StatController::new(),
            tick_duration,
            inbound_tx,
            inbound_rx,
            outbound_rx,
            next_conn_id: 1,
            conns_by_addr: HashMap::new(),
            last_seen: HashMap::new(),
        })
    }

    /// Spawns the task that listens for datagrams, decodes them eagerly and
    /// queues the resulting work items. A full queue drops the item.
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let inbound_tx = self.inbound_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        let envelope = match Envelope::from_bytes(&buffer[0..len]) {
                            Ok(envelope) => envelope,
                            Err(_) => {
                                warn!("failed to decode datagram from {}", addr);
                                continue;
                            }
                        };
                        if let Some(work) = classify(envelope, addr) {
                            if inbound_tx.try_send(work).is_err() {
                                warn!("inbound queue full, dropping work item from {}", addr);
                            }
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns the task that drains the outbound queue onto the socket.
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let mut outbound_rx = std::mem::replace(&mut self.outbound_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if let Err(e) = socket.send_to(&frame.data, frame.addr).await {
                    error!("Failed to send to {}: {}", frame.addr, e);
                }
            }
        });
    }

    fn handle_inbound(&mut self, work: Inbound) {
        match work {
            Inbound::Hello {
                addr,
                namespace,
                version,
            } => self.handle_hello(addr, &namespace, &version),
            Inbound::Goodbye { addr } => {
                if let Some(conn) = self.conns_by_addr.get(&addr).copied() {
                    self.disconnect(conn);
                }
            }
            Inbound::Ping { addr } => {
                if let Some(conn) = self.conns_by_addr.get(&addr).copied() {
                    self.last_seen.insert(conn, Instant::now());
                }
            }
            Inbound::Action { addr, action } => {
                let Some(conn) = self.conns_by_addr.get(&addr).copied() else {
                    warn!("action from unknown address {}, ignoring", addr);
                    return;
                };
                self.last_seen.insert(conn, Instant::now());
                let entity = conn as EntityId;
                self.controller.apply_action(&self.transport, entity, &action);
            }
        }
    }

    fn handle_hello(&mut self, addr: SocketAddr, namespace: &str, version: &str) {
        info!(
            "Client connecting from {} (namespace: {}, version: {})",
            addr, namespace, version
        );

        if !self.transport.accepts(namespace, version) {
            let reply = Envelope::Rejected {
                reason: "channel mismatch".to_string(),
            };
            self.transport.send_envelope_to(&reply, addr);
            return;
        }

        // A reconnect from the same address replaces the old connection.
        if let Some(existing) = self.conns_by_addr.get(&addr).copied() {
            info!("Removing existing connection {} from {}", existing, addr);
            self.disconnect(existing);
        }

        let conn = self.next_conn_id;
        self.next_conn_id += 1;
        let entity = conn as EntityId;

        self.conns_by_addr.insert(addr, conn);
        self.last_seen.insert(conn, Instant::now());
        self.transport.add_connection(conn, addr);
        self.transport.set_owner(entity, conn);
        self.controller.attach(entity);

        self.transport
            .send_envelope(&Envelope::Accepted { entity_id: entity }, conn);

        // Wire mutual tracking with every existing player and replay their
        // public state to the newcomer.
        let others: Vec<ConnId> = self
            .transport
            .connection_ids()
            .filter(|c| *c != conn)
            .collect();
        for other in others {
            let other_entity = other as EntityId;
            self.transport
                .send_envelope(&Envelope::EntityJoined { entity_id: entity }, other);
            self.transport
                .send_envelope(&Envelope::EntityJoined { entity_id: other_entity }, conn);
            self.transport.start_observing(other, entity);
            self.transport.start_observing(conn, other_entity);
            self.controller.resync(&self.transport, other_entity);
        }

        // Rolling the starter race exercises the public dispatch path and
        // leaves the newcomer with a fresh full snapshot.
        let race = STARTER_RACES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("human");
        self.controller.set_race(&self.transport, entity, race, true);
    }

    fn disconnect(&mut self, conn: ConnId) {
        let entity = conn as EntityId;
        self.conns_by_addr.retain(|_, c| *c != conn);
        self.last_seen.remove(&conn);
        self.transport.remove_connection(conn);
        self.controller.detach(entity);
        info!("Connection {} removed", conn);

        let remaining: Vec<ConnId> = self.transport.connection_ids().collect();
        for other in remaining {
            self.transport
                .send_envelope(&Envelope::EntityLeft { entity_id: entity }, other);
            self.transport.stop_observing(other, entity);
        }
    }

    fn expire_stale_connections(&mut self) {
        let stale: Vec<ConnId> = self
            .last_seen
            .iter()
            .filter(|(_, seen)| seen.elapsed() > CLIENT_TIMEOUT)
            .map(|(conn, _)| *conn)
            .collect();
        for conn in stale {
            info!("Connection {} timed out", conn);
            self.disconnect(conn);
        }
    }

    /// Main server loop: drains the bounded inbound queue once per tick and
    /// expires stale connections.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();

        let mut tick_interval = interval(self.tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Server started successfully");
        let mut tick: u64 = 0;

        loop {
            tick_interval.tick().await;
            tick += 1;

            let mut work_items = Vec::new();
            while let Ok(work) = self.inbound_rx.try_recv() {
                work_items.push(work);
            }
            for work in work_items {
                self.handle_inbound(work);
            }

            self.expire_stale_connections();

            if tick % 600 == 0 {
                debug!(
                    "Tick {}: {} connection(s)",
                    tick,
                    self.conns_by_addr.len()
                );
            }
        }
    }
}
