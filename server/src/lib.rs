//! # Stat Replication Server Library
//!
//! Authoritative server for the stat replication system. It owns the single
//! up-to-date stat record per connected player, is the only writer of that
//! state, and pushes whole-record snapshots to the correct audience whenever
//! a stat changes.
//!
//! ## Architecture
//!
//! ### Single-Threaded Authority
//! All authoritative mutation happens on one tick loop. Inbound datagrams
//! are decoded on the network receiver task and deferred through a bounded
//! queue that the tick loop drains once per tick, so the stat store is never
//! touched from two threads.
//!
//! ### Visibility-Routed Replication
//! Each stat field carries a fixed public/private classification. Public
//! changes are pushed to every connection observing the entity; the owning
//! connection always receives a full private snapshot, keeping its view
//! current no matter which field changed.
//!
//! ### Fire-and-Forget Sends
//! Outgoing datagrams flow through an unbounded queue to a dedicated sender
//! task. There are no acknowledgments, retries or backpressure; per
//! connection, delivery order follows send order.
//!
//! ## Module Organization
//!
//! - [`transport`] — channel identity, connection/observer bookkeeping and
//!   the directed send primitives.
//! - [`controller`] — typed setters implementing mutate-then-replicate.
//! - [`network`] — the UDP server loop tying it all together.

pub mod controller;
pub mod network;
pub mod transport;
