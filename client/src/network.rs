//! Client networking and the replica apply path.
//!
//! The receiver task decodes every datagram eagerly (envelope plus, for
//! replication frames, the registry decode) and queues the result into a
//! bounded channel. The tick loop is the only place the local stat store is
//! mutated: it drains the queue once per tick and applies each item through
//! [`ReplicaState::apply`].

use crate::hud;
use log::{error, info, warn};
use shared::envelope::{Envelope, PlayerAction};
use shared::packets::{register_s2c, PacketRegistry, StatPacket};
use shared::store::{EntityId, StatStore};
use shared::world::{Entity, World};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

/// Work items produced by the receiver task. Replication frames arrive
/// already decoded; malformed ones were dropped with a log line.
#[derive(Debug)]
pub enum ClientInbound {
    Accepted { entity_id: EntityId },
    Rejected { reason: String },
    EntityJoined { entity_id: EntityId },
    EntityLeft { entity_id: EntityId },
    Snapshot(StatPacket),
}

/// The client's replicated view: its own entity id, the entity world and the
/// local stat store. Pure state transitions, no I/O.
#[derive(Debug, Default)]
pub struct ReplicaState {
    pub entity_id: Option<EntityId>,
    pub connected: bool,
    pub world: World,
    pub stats: StatStore,
}

impl ReplicaState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, inbound: ClientInbound) {
        match inbound {
            ClientInbound::Accepted { entity_id } => {
                info!("Connected! Entity ID: {}", entity_id);
                self.entity_id = Some(entity_id);
                self.connected = true;
                self.world.insert(Entity::player(entity_id));
                self.stats.attach(entity_id);
            }
            ClientInbound::Rejected { reason } => {
                warn!("Connection rejected: {}", reason);
                self.connected = false;
                self.entity_id = None;
            }
            ClientInbound::EntityJoined { entity_id } => {
                self.world.insert(Entity::player(entity_id));
                self.stats.attach(entity_id);
            }
            ClientInbound::EntityLeft { entity_id } => {
                self.world.remove(entity_id);
                self.stats.detach(entity_id);
            }
            ClientInbound::Snapshot(packet) => self.apply_snapshot(packet),
        }
    }

    /// Applies a decoded snapshot. A subject that does not resolve to a
    /// player-like entity drops the update without mutating anything.
    fn apply_snapshot(&mut self, packet: StatPacket) {
        let (subject, record) = match packet {
            StatPacket::Public(public) => {
                let Some(subject) = public.subject_id() else {
                    warn!("public snapshot without subject id, dropping");
                    return;
                };
                (subject, public.compacted_record())
            }
            StatPacket::Full(full) => {
                let Some(me) = self.entity_id else {
                    warn!("full snapshot before handshake completed, dropping");
                    return;
                };
                (me, full.compacted_record())
            }
        };

        match self.world.entity_by_id(subject) {
            Some(entity) if entity.is_player_like() => {
                self.stats.replace_all(subject, &record);
            }
            Some(_) => warn!("entity {} is not player-like, dropping update", subject),
            None => warn!("unknown subject entity {}, dropping update", subject),
        }
    }
}

const INBOUND_QUEUE_CAPACITY: usize = 256;
const HUD_EVERY_TICKS: u64 = 60;
const DEMO_ACTION_EVERY_TICKS: u64 = 150;
// Must fire well inside the server's idle timeout.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(2);

pub struct Client {
    socket: Arc<UdpSocket>,
    server_addr: SocketAddr,
    state: ReplicaState,
    tick_duration: Duration,
    demo_actions: bool,

    inbound_tx: mpsc::Sender<ClientInbound>,
    inbound_rx: mpsc::Receiver<ClientInbound>,
}

impl Client {
    pub async fn new(
        server_addr: &str,
        tick_duration: Duration,
        demo_actions: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind("0.0.0.0:0").await?);
        let server_addr = server_addr.parse()?;
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE_CAPACITY);

        Ok(Client {
            socket,
            server_addr,
            state: ReplicaState::new(),
            tick_duration,
            demo_actions,
            inbound_tx,
            inbound_rx,
        })
    }

    async fn connect(&self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to server...");
        self.send_envelope(&Envelope::Hello {
            namespace: shared::CHANNEL_NAMESPACE.to_string(),
            version: shared::PROTOCOL_VERSION.to_string(),
        })
        .await
    }

    async fn send_envelope(&self, envelope: &Envelope) -> Result<(), Box<dyn std::error::Error>> {
        let data = envelope.to_bytes()?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    /// Spawns the task that decodes datagrams eagerly and queues work items.
    fn spawn_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let inbound_tx = self.inbound_tx.clone();

        tokio::spawn(async move {
            let mut registry = PacketRegistry::new();
            register_s2c(&mut registry);
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, _)) => {
                        let Some(work) = decode_datagram(&registry, &buffer[0..len]) else {
                            continue;
                        };
                        if inbound_tx.try_send(work).is_err() {
                            warn!("inbound queue full, dropping update");
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

    fn render_hud(&mut self) {
        let Some(me) = self.state.entity_id else {
            return;
        };
        if let Some(record) = self.state.stats.fetch(me) {
            for line in hud::stat_lines(record) {
                info!("{}", line);
            }
            info!("{}", hud::training_summary(record));
        }
    }

    async fn send_demo_action(&self, tick: u64) {
        // Rotate through a couple of gameplay events so replication has
        // something to show.
        let action = match (tick / DEMO_ACTION_EVERY_TICKS) % 3 {
            0 => PlayerAction::ToggleCombatMode,
            1 => PlayerAction::ToggleBlocking,
            _ => PlayerAction::Train {
                field: shared::stat::StatField::Strength,
                amount: 1,
            },
        };
        if let Err(e) = self.send_envelope(&Envelope::Action { action }).await {
            error!("Error sending action: {}", e);
        }
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_receiver();
        self.connect().await?;

        let mut tick_interval = interval(self.tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tick: u64 = 0;
        let mut last_keepalive = Instant::now();

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {
                    tick += 1;

                    let mut work_items = Vec::new();
                    while let Ok(work) = self.inbound_rx.try_recv() {
                        work_items.push(work);
                    }
                    for work in work_items {
                        self.state.apply(work);
                    }

                    if self.state.connected && last_keepalive.elapsed() >= KEEPALIVE_INTERVAL {
                        last_keepalive = Instant::now();
                        if let Err(e) = self.send_envelope(&Envelope::Ping).await {
                            error!("Error sending keepalive: {}", e);
                        }
                    }

                    if tick % HUD_EVERY_TICKS == 0 {
                        self.render_hud();
                    }

                    if self.demo_actions
                        && self.state.connected
                        && tick % DEMO_ACTION_EVERY_TICKS == 0
                    {
                        self.send_demo_action(tick).await;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutting down");
                    break;
                },
            }
        }

        if self.state.connected {
            let _ = self.send_envelope(&Envelope::Goodbye).await;
        }
        Ok(())
    }
}

/// Decodes one datagram into a work item. Returns `None` (after a log line)
/// for anything malformed or unexpected; no state is mutated here.
fn decode_datagram(registry: &PacketRegistry, data: &[u8]) -> Option<ClientInbound> {
    let envelope = match Envelope::from_bytes(data) {
        Ok(envelope) => envelope,
        Err(_) => {
            warn!("failed to decode datagram, dropping");
            return None;
        }
    };
    match envelope {
        Envelope::Accepted { entity_id } => Some(ClientInbound::Accepted { entity_id }),
        Envelope::Rejected { reason } => Some(ClientInbound::Rejected { reason }),
        Envelope::EntityJoined { entity_id } => Some(ClientInbound::EntityJoined { entity_id }),
        Envelope::EntityLeft { entity_id } => Some(ClientInbound::EntityLeft { entity_id }),
        Envelope::Frame { data } => match registry.decode_frame(&data) {
            Ok(packet) => Some(ClientInbound::Snapshot(packet)),
            Err(e) => {
                warn!("failed to decode replication frame: {}", e);
                None
            }
        },
        other => {
            warn!("unexpected envelope from server: {:?}", other);
            None
        }
    }
}
