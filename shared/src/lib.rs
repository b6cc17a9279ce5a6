//! Shared protocol and data-model crate for the stat replication system.
//!
//! Everything both peers must agree on lives here: the stat field catalogue
//! and per-entity record, the entity-to-record store, the bit-exact snapshot
//! codecs with their packet registry, the bincode session envelope, and the
//! minimal entity world the client keeps in sync.

pub mod envelope;
pub mod packets;
pub mod stat;
pub mod store;
pub mod wire;
pub mod world;

/// Namespace identifying the replication channel during the handshake.
pub const CHANNEL_NAMESPACE: &str = "statsync";

/// Protocol version advertised during the handshake. Both ends currently
/// accept any version; the namespace still has to match exactly.
pub const PROTOCOL_VERSION: &str = "1";
