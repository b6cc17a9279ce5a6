//! Replication snapshot codecs and the packet registry.
//!
//! Two wire shapes exist: [`PublicStatSnapshot`] carries the public fields
//! plus the subject entity id, and [`FullStatSnapshot`] embeds that public
//! payload as its wire prefix (the subject id omitted) and appends the six
//! trained stats. The full packet is only ever addressed to the owning
//! connection, so the subject is implicit.
//!
//! Packet type tags are assigned by registration order, making that order
//! part of the wire contract: [`register_s2c`] fixes it for both peers.

use crate::stat::StatRecord;
use crate::store::EntityId;
use crate::wire::{PacketReader, PacketWriter, WireError, WireResult};
use log::error;

/// Whether a snapshot carries the subject entity id on the wire.
///
/// The public packet is addressed to observers and needs the id to name its
/// subject; the full packet goes to the owning connection only and omits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectId {
    Included,
    Omitted,
}

/// Public stat snapshot: race, form, combat mode, blocking, and the subject
/// entity id when [`SubjectId::Included`].
#[derive(Debug, Clone, PartialEq)]
pub struct PublicStatSnapshot {
    race: String,
    form: String,
    combat_mode: bool,
    blocking: bool,
    subject_id: Option<EntityId>,
}

impl PublicStatSnapshot {
    /// Builds the base packet, tagged with the subject entity id.
    pub fn of(record: &StatRecord, subject_id: EntityId) -> Self {
        Self::from_record(record, Some(subject_id))
    }

    /// Builds the wire prefix of a full snapshot, with the id omitted.
    fn from_record(record: &StatRecord, subject_id: Option<EntityId>) -> Self {
        Self {
            race: record.race().to_string(),
            form: record.form().to_string(),
            combat_mode: record.combat_mode(),
            blocking: record.blocking(),
            subject_id,
        }
    }

    pub fn subject_id(&self) -> Option<EntityId> {
        self.subject_id
    }

    pub fn encode(&self, writer: &mut PacketWriter) {
        writer.write_str(&self.race);
        writer.write_str(&self.form);
        writer.write_bool(self.combat_mode);
        writer.write_bool(self.blocking);
        if let Some(id) = self.subject_id {
            writer.write_i32(id);
        }
    }

    pub fn decode(reader: &mut PacketReader<'_>, subject: SubjectId) -> WireResult<Self> {
        let race = reader.read_str()?;
        let form = reader.read_str()?;
        let combat_mode = reader.read_bool()?;
        let blocking = reader.read_bool()?;
        let subject_id = match subject {
            SubjectId::Included => Some(reader.read_i32()?),
            SubjectId::Omitted => None,
        };
        Ok(Self {
            race,
            form,
            combat_mode,
            blocking,
            subject_id,
        })
    }

    /// Reconstructs a record from the decoded payload. The six trained stats
    /// and alignment are zero-filled: public packets overwrite the whole
    /// record on the receiving side, so unsent fields must not leak stale
    /// values from a previous owner of the slot.
    pub fn compacted_record(&self) -> StatRecord {
        StatRecord::new(
            self.race.clone(),
            self.form.clone(),
            0,
            0,
            0,
            0,
            0,
            0,
            0,
            self.combat_mode,
            self.blocking,
        )
    }
}

/// Full stat snapshot: the public payload followed by the six trained stats.
/// Never carries a subject id.
#[derive(Debug, Clone, PartialEq)]
pub struct FullStatSnapshot {
    public: PublicStatSnapshot,
    strength: i32,
    strike_power: i32,
    energy: i32,
    vitality: i32,
    resistance: i32,
    ki_power: i32,
}

impl FullStatSnapshot {
    pub fn of(record: &StatRecord) -> Self {
        Self {
            public: PublicStatSnapshot::from_record(record, None),
            strength: record.strength(),
            strike_power: record.strike_power(),
            energy: record.energy(),
            vitality: record.vitality(),
            resistance: record.resistance(),
            ki_power: record.ki_power(),
        }
    }

    pub fn encode(&self, writer: &mut PacketWriter) {
        self.public.encode(writer);
        writer.write_i32(self.strength);
        writer.write_i32(self.strike_power);
        writer.write_i32(self.energy);
        writer.write_i32(self.vitality);
        writer.write_i32(self.resistance);
        writer.write_i32(self.ki_power);
    }

    pub fn decode(reader: &mut PacketReader<'_>) -> WireResult<Self> {
        let public = PublicStatSnapshot::decode(reader, SubjectId::Omitted)?;
        let strength = reader.read_i32()?;
        let strike_power = reader.read_i32()?;
        let energy = reader.read_i32()?;
        let vitality = reader.read_i32()?;
        let resistance = reader.read_i32()?;
        let ki_power = reader.read_i32()?;
        Ok(Self {
            public,
            strength,
            strike_power,
            energy,
            vitality,
            resistance,
            ki_power,
        })
    }

    /// Fills the six trained stats over the public base. Alignment never
    /// crosses the wire and stays zero.
    pub fn compacted_record(&self) -> StatRecord {
        let mut record = self.public.compacted_record();
        record.set_strength(self.strength);
        record.set_strike_power(self.strike_power);
        record.set_energy(self.energy);
        record.set_vitality(self.vitality);
        record.set_resistance(self.resistance);
        record.set_ki_power(self.ki_power);
        record
    }
}

/// A decoded replication packet.
#[derive(Debug, Clone, PartialEq)]
pub enum StatPacket {
    Full(FullStatSnapshot),
    Public(PublicStatSnapshot),
}

type DecodeFn = fn(&mut PacketReader<'_>) -> WireResult<StatPacket>;

/// Maps registration-order packet ids to decoders. Ids are assigned
/// monotonically from 0; both peers must register in the same order.
#[derive(Default)]
pub struct PacketRegistry {
    next_id: i32,
    decoders: Vec<DecodeFn>,
}

impl PacketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out the next packet id. The id must immediately be used in a
    /// matching [`register`](Self::register) call.
    pub fn assign_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Registers the decoder for a previously assigned id. Re-registering an
    /// occupied id (or registering out of order) is a configuration error:
    /// it is logged and the registration is skipped.
    pub fn register(&mut self, id: i32, decode: DecodeFn) {
        if (id as usize) < self.decoders.len() {
            error!("packet id {} is already registered, skipping", id);
            return;
        }
        if id as usize != self.decoders.len() {
            error!(
                "packet id {} registered out of order (expected {}), skipping",
                id,
                self.decoders.len()
            );
            return;
        }
        self.decoders.push(decode);
    }

    /// Decodes a frame: the leading i32 packet tag followed by the payload.
    pub fn decode_frame(&self, frame: &[u8]) -> WireResult<StatPacket> {
        let mut reader = PacketReader::new(frame);
        let id = reader.read_i32()?;
        let decode = usize::try_from(id)
            .ok()
            .and_then(|idx| self.decoders.get(idx))
            .ok_or(WireError::UnknownPacketId(id))?;
        decode(&mut reader)
    }
}

/// Builds a frame from an assigned packet id and an encode callback.
pub fn encode_frame(id: i32, encode: impl FnOnce(&mut PacketWriter)) -> Vec<u8> {
    let mut writer = PacketWriter::new();
    writer.write_i32(id);
    encode(&mut writer);
    writer.into_vec()
}

/// Packet ids of the server-to-client replication packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct S2cPacketIds {
    pub full: i32,
    pub public: i32,
}

/// Registers the server-to-client packets in their canonical order: the full
/// snapshot first (id 0), then the public snapshot (id 1). Both peers call
/// this so the order is fixed in exactly one place.
pub fn register_s2c(registry: &mut PacketRegistry) -> S2cPacketIds {
    let full = registry.assign_id();
    registry.register(full, |reader| {
        FullStatSnapshot::decode(reader).map(StatPacket::Full)
    });
    let public = registry.assign_id();
    registry.register(public, |reader| {
        PublicStatSnapshot::decode(reader, SubjectId::Included).map(StatPacket::Public)
    });
    S2cPacketIds { full, public }
}
