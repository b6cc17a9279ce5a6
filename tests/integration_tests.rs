//! End-to-end replication tests.
//!
//! These run the full in-process pipeline without sockets: authoritative
//! setters on the server side, the transport's outbound queue in the middle,
//! and the client replica applying what it would have received off the wire.

use client::network::{ClientInbound, ReplicaState};
use server::controller::StatController;
use server::transport::{ChannelConfig, OutboundFrame, Transport};
use shared::envelope::{Envelope, PlayerAction};
use shared::packets::{register_s2c, PacketRegistry, StatPacket};
use shared::stat::StatField;
use shared::store::EntityId;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::sync::mpsc;

fn addr(port: u16) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port)
}

/// Connection 1 owns entity 1, connection 2 owns entity 2, and each
/// connection observes the other's entity. Both entities have records.
fn server_side() -> (
    StatController,
    Transport,
    mpsc::UnboundedReceiver<OutboundFrame>,
) {
    let mut transport = Transport::new(ChannelConfig::default());
    let (tx, rx) = mpsc::unbounded_channel();
    transport.init(tx);

    transport.add_connection(1, addr(6001));
    transport.add_connection(2, addr(6002));
    transport.set_owner(1, 1);
    transport.set_owner(2, 2);
    transport.start_observing(1, 2);
    transport.start_observing(2, 1);

    let mut controller = StatController::new();
    controller.attach(1);
    controller.attach(2);
    (controller, transport, rx)
}

/// A replica as a freshly connected client would hold it: its own entity
/// plus one remote player it was told about.
fn client_side(me: EntityId, other: EntityId) -> ReplicaState {
    let mut state = ReplicaState::new();
    state.apply(ClientInbound::Accepted { entity_id: me });
    state.apply(ClientInbound::EntityJoined { entity_id: other });
    state
}

/// Unwraps a queued datagram back into the snapshot the client would apply.
fn receive(frame: &OutboundFrame) -> ClientInbound {
    let mut registry = PacketRegistry::new();
    register_s2c(&mut registry);
    match Envelope::from_bytes(&frame.data).unwrap() {
        Envelope::Frame { data } => ClientInbound::Snapshot(registry.decode_frame(&data).unwrap()),
        other => panic!("expected frame envelope, got {:?}", other),
    }
}

#[test]
fn test_private_change_reaches_only_the_owner_replica() {
    let (mut controller, transport, mut rx) = server_side();
    let mut owner = client_side(1, 2);
    let mut observer = client_side(2, 1);

    controller.set_strength(&transport, 1, 30, false);

    let frame = rx.try_recv().unwrap();
    assert_eq!(frame.addr, addr(6001));
    assert!(rx.try_recv().is_err(), "private change must not fan out");

    owner.apply(receive(&frame));
    assert_eq!(owner.stats.fetch(1).unwrap().strength(), 30);
    // The observer heard nothing and still has defaults for entity 1.
    assert_eq!(observer.stats.fetch(1).unwrap().strength(), 5);
}

#[test]
fn test_public_change_fans_out_and_hides_private_fields() {
    let (mut controller, transport, mut rx) = server_side();
    let mut owner = client_side(1, 2);
    let mut observer = client_side(2, 1);

    controller.set_strength(&transport, 1, 30, false);
    owner.apply(receive(&rx.try_recv().unwrap()));

    controller.set_race(&transport, 1, "namekian", false);

    // Public snapshot to the observer first, then the owner's full resync.
    let to_observer = rx.try_recv().unwrap();
    assert_eq!(to_observer.addr, addr(6002));
    observer.apply(receive(&to_observer));

    let to_owner = rx.try_recv().unwrap();
    assert_eq!(to_owner.addr, addr(6001));
    owner.apply(receive(&to_owner));
    assert!(rx.try_recv().is_err());

    let observed = observer.stats.fetch(1).unwrap();
    assert_eq!(observed.race(), "namekian");
    assert_eq!(observed.strength(), 0, "private fields are zero-filled");
    assert_eq!(observed.alignment(), 0);

    let own = owner.stats.fetch(1).unwrap();
    assert_eq!(own.race(), "namekian");
    assert_eq!(own.strength(), 30, "owner keeps its private view");
}

#[test]
fn test_owner_full_resync_follows_every_public_change() {
    let (mut controller, transport, mut rx) = server_side();

    controller.set_combat_mode(&transport, 1, true, false);
    controller.set_blocking(&transport, 1, true, false);

    let mut fulls_to_owner = 0;
    while let Ok(frame) = rx.try_recv() {
        if let ClientInbound::Snapshot(StatPacket::Full(_)) = receive(&frame) {
            assert_eq!(frame.addr, addr(6001));
            fulls_to_owner += 1;
        }
    }
    assert_eq!(fulls_to_owner, 2);
}

#[test]
fn test_train_action_round_trips_to_the_owner_replica() {
    let (mut controller, transport, mut rx) = server_side();
    let mut owner = client_side(1, 2);

    controller.apply_action(
        &transport,
        1,
        &PlayerAction::Train {
            field: StatField::KiPower,
            amount: 7,
        },
    );

    owner.apply(receive(&rx.try_recv().unwrap()));
    assert_eq!(owner.stats.fetch(1).unwrap().ki_power(), 12);
}

#[test]
fn test_detached_entity_generates_no_traffic() {
    let (mut controller, transport, mut rx) = server_side();
    controller.detach(1);
    controller.set_energy(&transport, 1, 50, false);
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_sends_before_init_are_dropped() {
    let mut transport = Transport::new(ChannelConfig::default());
    transport.add_connection(1, addr(6001));
    transport.set_owner(1, 1);

    let mut controller = StatController::new();
    controller.attach(1);
    // No outbound queue installed yet: the mutation lands, the send is a
    // logged no-op.
    controller.set_vitality(&transport, 1, 9, false);
    assert_eq!(controller.fetch(1).unwrap().vitality(), 9);
}

#[test]
fn test_full_payload_starts_with_a_decodable_public_prefix() {
    use shared::packets::{FullStatSnapshot, PublicStatSnapshot, SubjectId};
    use shared::stat::StatRecord;
    use shared::wire::{PacketReader, PacketWriter};

    let record = StatRecord::new("saiyan", "ascended", 9, 8, 7, 6, 5, 4, -100, true, false);

    let mut writer = PacketWriter::new();
    FullStatSnapshot::of(&record).encode(&mut writer);
    let full_bytes = writer.into_vec();

    // A public decode consumes the prefix of the full payload, leaving
    // exactly the six trained ints, big-endian.
    let mut reader = PacketReader::new(&full_bytes);
    let prefix = PublicStatSnapshot::decode(&mut reader, SubjectId::Omitted).unwrap();
    assert_eq!(prefix.compacted_record().race(), "saiyan");
    assert!(prefix.compacted_record().combat_mode());

    assert_eq!(reader.remaining(), 6 * 4);
    for expected in [9, 8, 7, 6, 5, 4] {
        assert_eq!(reader.read_i32().unwrap(), expected);
    }
    assert_eq!(reader.remaining(), 0);
}
