//! The only writer of authoritative stat state.
//!
//! Every typed setter is a single-step mutate-then-replicate protocol: the
//! record is updated through the store, then the whole record is re-sent to
//! the correct audience based on the field's visibility class. This is
//! coarse-grained whole-record replication, not field-level diffing; in
//! particular the owner always receives a fresh full snapshot, even when the
//! changed field was public, so the owner's private view can never go stale.

use crate::transport::Transport;
use log::{info, warn};
use shared::envelope::PlayerAction;
use shared::packets::{FullStatSnapshot, PublicStatSnapshot, StatPacket};
use shared::stat::{StatField, StatRecord};
use shared::store::{EntityId, StatStore};

pub struct StatController {
    store: StatStore,
}

impl StatController {
    pub fn new() -> Self {
        Self {
            store: StatStore::new(),
        }
    }

    pub fn attach(&mut self, entity: EntityId) {
        self.store.attach(entity);
    }

    pub fn detach(&mut self, entity: EntityId) {
        self.store.detach(entity);
    }

    pub fn fetch(&mut self, entity: EntityId) -> Option<&StatRecord> {
        self.store.fetch(entity)
    }

    pub fn set_race(&mut self, net: &Transport, entity: EntityId, race: &str, log: bool) {
        self.modify(net, entity, StatField::Race, |record| {
            record.set_race(race);
            if log {
                info!(
                    "{} set to {} for entity {}",
                    StatField::Race.legible_label(),
                    race,
                    entity
                );
            }
        });
    }

    pub fn set_form(&mut self, net: &Transport, entity: EntityId, form: &str, log: bool) {
        self.modify(net, entity, StatField::Form, |record| {
            record.set_form(form);
            if log {
                info!(
                    "{} set to {} for entity {}",
                    StatField::Form.legible_label(),
                    form,
                    entity
                );
            }
        });
    }

    pub fn set_strength(&mut self, net: &Transport, entity: EntityId, value: i32, log: bool) {
        self.set_int(net, entity, StatField::Strength, value, log);
    }

    pub fn set_strike_power(&mut self, net: &Transport, entity: EntityId, value: i32, log: bool) {
        self.set_int(net, entity, StatField::StrikePower, value, log);
    }

    pub fn set_energy(&mut self, net: &Transport, entity: EntityId, value: i32, log: bool) {
        self.set_int(net, entity, StatField::Energy, value, log);
    }

    pub fn set_vitality(&mut self, net: &Transport, entity: EntityId, value: i32, log: bool) {
        self.set_int(net, entity, StatField::Vitality, value, log);
    }

    pub fn set_resistance(&mut self, net: &Transport, entity: EntityId, value: i32, log: bool) {
        self.set_int(net, entity, StatField::Resistance, value, log);
    }

    pub fn set_ki_power(&mut self, net: &Transport, entity: EntityId, value: i32, log: bool) {
        self.set_int(net, entity, StatField::KiPower, value, log);
    }

    pub fn set_alignment(&mut self, net: &Transport, entity: EntityId, value: i32, log: bool) {
        self.set_int(net, entity, StatField::Alignment, value, log);
    }

    pub fn set_combat_mode(&mut self, net: &Transport, entity: EntityId, value: bool, log: bool) {
        self.modify(net, entity, StatField::CombatMode, |record| {
            record.set_combat_mode(value);
            if log {
                info!(
                    "{} set to {} for entity {}",
                    StatField::CombatMode.legible_label(),
                    value,
                    entity
                );
            }
        });
    }

    pub fn set_blocking(&mut self, net: &Transport, entity: EntityId, value: bool, log: bool) {
        self.modify(net, entity, StatField::Blocking, |record| {
            record.set_blocking(value);
            if log {
                info!(
                    "{} set to {} for entity {}",
                    StatField::Blocking.legible_label(),
                    value,
                    entity
                );
            }
        });
    }

    /// Re-sends the entity's current state without mutating anything: public
    /// snapshot to observers and the owner, full snapshot to the owner. Used
    /// on join and start-tracking events.
    pub fn resync(&mut self, net: &Transport, entity: EntityId) {
        let Some(record) = self.store.fetch(entity) else {
            warn!("no stat record for entity {}, skipping resync", entity);
            return;
        };
        let public = StatPacket::Public(PublicStatSnapshot::of(record, entity));
        let full = StatPacket::Full(FullStatSnapshot::of(record));
        net.send_to_observers_and_self(&public, entity);
        if let Some(owner) = net.owner_of(entity) {
            net.send_to_connection(&full, owner);
        }
    }

    /// Applies a client-originated gameplay event through the typed setters.
    pub fn apply_action(&mut self, net: &Transport, entity: EntityId, action: &PlayerAction) {
        match action {
            PlayerAction::ToggleCombatMode => {
                let current = self.fetch(entity).map(StatRecord::combat_mode);
                if let Some(current) = current {
                    self.set_combat_mode(net, entity, !current, true);
                }
            }
            PlayerAction::ToggleBlocking => {
                let current = self.fetch(entity).map(StatRecord::blocking);
                if let Some(current) = current {
                    self.set_blocking(net, entity, !current, true);
                }
            }
            PlayerAction::Train { field, amount } => {
                let Some(record) = self.fetch(entity) else {
                    return;
                };
                // The amount is client-supplied; saturate instead of trusting
                // it to stay within range.
                match field {
                    StatField::Strength => {
                        let v = record.strength().saturating_add(*amount);
                        self.set_strength(net, entity, v, true);
                    }
                    StatField::StrikePower => {
                        let v = record.strike_power().saturating_add(*amount);
                        self.set_strike_power(net, entity, v, true);
                    }
                    StatField::Energy => {
                        let v = record.energy().saturating_add(*amount);
                        self.set_energy(net, entity, v, true);
                    }
                    StatField::Vitality => {
                        let v = record.vitality().saturating_add(*amount);
                        self.set_vitality(net, entity, v, true);
                    }
                    StatField::Resistance => {
                        let v = record.resistance().saturating_add(*amount);
                        self.set_resistance(net, entity, v, true);
                    }
                    StatField::KiPower => {
                        let v = record.ki_power().saturating_add(*amount);
                        self.set_ki_power(net, entity, v, true);
                    }
                    other => {
                        warn!("{} is not a trainable stat, ignoring", other.id());
                    }
                }
            }
        }
    }

    fn set_int(
        &mut self,
        net: &Transport,
        entity: EntityId,
        field: StatField,
        value: i32,
        log: bool,
    ) {
        self.modify(net, entity, field, |record| {
            match field {
                StatField::Strength => record.set_strength(value),
                StatField::StrikePower => record.set_strike_power(value),
                StatField::Energy => record.set_energy(value),
                StatField::Vitality => record.set_vitality(value),
                StatField::Resistance => record.set_resistance(value),
                StatField::KiPower => record.set_ki_power(value),
                StatField::Alignment => record.set_alignment(value),
                _ => unreachable!("set_int is only called with integer fields"),
            }
            if log {
                info!(
                    "{} set to {} for entity {}",
                    field.legible_label(),
                    value,
                    entity
                );
            }
        });
    }

    /// Mutates the record, then replicates using the field's visibility
    /// class: public fields go to the entity's observers first (tagged with
    /// the entity id), and the owner always receives a full snapshot.
    fn modify(
        &mut self,
        net: &Transport,
        entity: EntityId,
        field: StatField,
        f: impl FnOnce(&mut StatRecord),
    ) {
        if !self.store.with_record(entity, f) {
            warn!(
                "no stat record for entity {}, skipping {} update",
                entity,
                field.id()
            );
            return;
        }
        self.send_update(net, entity, field.is_public());
    }

    fn send_update(&mut self, net: &Transport, entity: EntityId, is_public: bool) {
        let Some(record) = self.store.fetch(entity) else {
            return;
        };
        if is_public {
            let packet = StatPacket::Public(PublicStatSnapshot::of(record, entity));
            net.send_to_observers(&packet, entity);
        }
        let full = StatPacket::Full(FullStatSnapshot::of(record));
        match net.owner_of(entity) {
            Some(owner) => net.send_to_connection(&full, owner),
            None => warn!("entity {} has no owning connection", entity),
        }
    }
}

impl Default for StatController {
    fn default() -> Self {
        Self::new()
    }
}
