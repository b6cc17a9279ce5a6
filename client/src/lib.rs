//! # Stat Replication Client Library
//!
//! Connects to the authoritative server, maintains a read-only replica of
//! the stat records pushed to this connection, and renders them as a text
//! HUD. All mutation requests go to the server as actions; the replica is
//! only ever written by applying received snapshots.

pub mod hud;
pub mod network;
