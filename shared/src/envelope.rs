//! Session envelope carried in every datagram.
//!
//! Control traffic (handshake, entity lifecycle, gameplay actions) is plain
//! bincode; replication payloads travel opaquely inside [`Envelope::Frame`]
//! and are encoded by the registry-framed codecs in [`crate::packets`].

use crate::stat::StatField;
use crate::store::EntityId;
use serde::{Deserialize, Serialize};

/// A client-originated gameplay event. These stand in for the gameplay
/// systems that drive the server-side stat controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerAction {
    ToggleCombatMode,
    ToggleBlocking,
    Train { field: StatField, amount: i32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Envelope {
    /// Client → server channel handshake.
    Hello { namespace: String, version: String },
    /// Handshake accepted; the connection controls the given entity.
    Accepted { entity_id: EntityId },
    /// Handshake rejected (namespace or version mismatch).
    Rejected { reason: String },
    /// Client is leaving.
    Goodbye,
    /// Periodic keepalive so an idle connection is not expired.
    Ping,
    /// Another player-like entity entered the receiver's view.
    EntityJoined { entity_id: EntityId },
    /// A tracked entity left.
    EntityLeft { entity_id: EntityId },
    /// Client → server gameplay event.
    Action { action: PlayerAction },
    /// A registry-framed replication packet.
    Frame { data: Vec<u8> },
}

impl Envelope {
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}
