//! Stat field catalogue and the per-entity stat record.
//!
//! Every stat a player carries is listed in [`StatField`], a closed enum that
//! is the single source of truth for field identifiers, display labels and
//! replication visibility. [`StatRecord`] holds the actual values and
//! round-trips through a [`TaggedMap`] so that stores and packets never have
//! to enumerate fields themselves.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Sentinel value for identifier fields that have not been assigned yet.
pub const EMPTY: &str = "empty";

/// Closed catalogue of stat fields.
///
/// Public fields are replicated to every connection observing the entity;
/// private fields only ever reach the owning connection. The classification
/// is fixed per field and drives all replication routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatField {
    Race,
    Form,
    Strength,
    StrikePower,
    Energy,
    Vitality,
    Resistance,
    KiPower,
    Alignment,
    CombatMode,
    Blocking,
}

impl StatField {
    /// All fields in their canonical order. Tagged serialization and
    /// presentation iteration both follow this order.
    pub const ALL: [StatField; 11] = [
        StatField::Race,
        StatField::Form,
        StatField::Strength,
        StatField::StrikePower,
        StatField::Energy,
        StatField::Vitality,
        StatField::Resistance,
        StatField::KiPower,
        StatField::Alignment,
        StatField::CombatMode,
        StatField::Blocking,
    ];

    /// Lowercase identifier used as the tagged-map key (e.g. `strike_power`).
    pub fn id(self) -> &'static str {
        match self {
            StatField::Race => "race",
            StatField::Form => "form",
            StatField::Strength => "strength",
            StatField::StrikePower => "strike_power",
            StatField::Energy => "energy",
            StatField::Vitality => "vitality",
            StatField::Resistance => "resistance",
            StatField::KiPower => "ki_power",
            StatField::Alignment => "alignment",
            StatField::CombatMode => "combat_mode",
            StatField::Blocking => "blocking",
        }
    }

    /// Short HUD tag for the six trainable stats, empty for everything else.
    pub fn abbreviation(self) -> &'static str {
        match self {
            StatField::Strength => "STR",
            StatField::StrikePower => "SKP",
            StatField::Energy => "ENE",
            StatField::Vitality => "VIT",
            StatField::Resistance => "RES",
            StatField::KiPower => "PWR",
            _ => "",
        }
    }

    /// Whether the field is replicated to observers of the entity.
    pub fn is_public(self) -> bool {
        matches!(
            self,
            StatField::Race | StatField::Form | StatField::CombatMode | StatField::Blocking
        )
    }

    /// Human-readable label derived from the identifier
    /// (e.g. `combat_mode` becomes `Combat Mode`).
    pub fn legible_label(self) -> String {
        legible_label(self.id())
    }
}

/// Splits a lowercase identifier on underscores, title-cases each segment and
/// joins them with spaces. Pure and deterministic; used for HUD labels and
/// generated configuration labels alike.
pub fn legible_label(id: &str) -> String {
    id.split('_')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// A single value inside a [`TaggedMap`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaggedValue {
    Str(String),
    Int(i32),
    Bool(bool),
}

impl fmt::Display for TaggedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaggedValue::Str(s) => write!(f, "{}", s),
            TaggedValue::Int(v) => write!(f, "{}", v),
            TaggedValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

/// Self-describing key/value container used by the record's serialize and
/// deserialize contract. Keys are the [`StatField`] identifiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaggedMap {
    entries: HashMap<String, TaggedValue>,
}

impl TaggedMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: &str, value: TaggedValue) {
        self.entries.insert(key.to_string(), value);
    }

    pub fn put_str(&mut self, key: &str, value: &str) {
        self.put(key, TaggedValue::Str(value.to_string()));
    }

    pub fn put_int(&mut self, key: &str, value: i32) {
        self.put(key, TaggedValue::Int(value));
    }

    pub fn put_bool(&mut self, key: &str, value: bool) {
        self.put(key, TaggedValue::Bool(value));
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(TaggedValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        match self.entries.get(key) {
            Some(TaggedValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.entries.get(key) {
            Some(TaggedValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The per-entity stat state. A pure data carrier: no clamping, no
/// validation, no side effects. Exactly one record exists per opted-in
/// entity, owned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRecord {
    race: String,
    form: String,
    strength: i32,
    strike_power: i32,
    energy: i32,
    vitality: i32,
    resistance: i32,
    ki_power: i32,
    alignment: i32,
    combat_mode: bool,
    blocking: bool,
}

impl Default for StatRecord {
    fn default() -> Self {
        Self {
            race: EMPTY.to_string(),
            form: EMPTY.to_string(),
            strength: 5,
            strike_power: 5,
            energy: 5,
            vitality: 5,
            resistance: 5,
            ki_power: 5,
            alignment: 100,
            combat_mode: false,
            blocking: false,
        }
    }
}

impl StatRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        race: impl Into<String>,
        form: impl Into<String>,
        strength: i32,
        strike_power: i32,
        energy: i32,
        vitality: i32,
        resistance: i32,
        ki_power: i32,
        alignment: i32,
        combat_mode: bool,
        blocking: bool,
    ) -> Self {
        Self {
            race: race.into(),
            form: form.into(),
            strength,
            strike_power,
            energy,
            vitality,
            resistance,
            ki_power,
            alignment,
            combat_mode,
            blocking,
        }
    }

    pub fn race(&self) -> &str {
        &self.race
    }

    pub fn set_race(&mut self, race: impl Into<String>) {
        self.race = race.into();
    }

    pub fn form(&self) -> &str {
        &self.form
    }

    pub fn set_form(&mut self, form: impl Into<String>) {
        self.form = form.into();
    }

    pub fn strength(&self) -> i32 {
        self.strength
    }

    pub fn set_strength(&mut self, strength: i32) {
        self.strength = strength;
    }

    pub fn strike_power(&self) -> i32 {
        self.strike_power
    }

    pub fn set_strike_power(&mut self, strike_power: i32) {
        self.strike_power = strike_power;
    }

    pub fn energy(&self) -> i32 {
        self.energy
    }

    pub fn set_energy(&mut self, energy: i32) {
        self.energy = energy;
    }

    pub fn vitality(&self) -> i32 {
        self.vitality
    }

    pub fn set_vitality(&mut self, vitality: i32) {
        self.vitality = vitality;
    }

    pub fn resistance(&self) -> i32 {
        self.resistance
    }

    pub fn set_resistance(&mut self, resistance: i32) {
        self.resistance = resistance;
    }

    pub fn ki_power(&self) -> i32 {
        self.ki_power
    }

    pub fn set_ki_power(&mut self, ki_power: i32) {
        self.ki_power = ki_power;
    }

    pub fn alignment(&self) -> i32 {
        self.alignment
    }

    pub fn set_alignment(&mut self, alignment: i32) {
        self.alignment = alignment;
    }

    pub fn combat_mode(&self) -> bool {
        self.combat_mode
    }

    pub fn set_combat_mode(&mut self, combat_mode: bool) {
        self.combat_mode = combat_mode;
    }

    pub fn blocking(&self) -> bool {
        self.blocking
    }

    pub fn set_blocking(&mut self, blocking: bool) {
        self.blocking = blocking;
    }

    /// Current value of a single field as a tagged value.
    pub fn value_of(&self, field: StatField) -> TaggedValue {
        match field {
            StatField::Race => TaggedValue::Str(self.race.clone()),
            StatField::Form => TaggedValue::Str(self.form.clone()),
            StatField::Strength => TaggedValue::Int(self.strength),
            StatField::StrikePower => TaggedValue::Int(self.strike_power),
            StatField::Energy => TaggedValue::Int(self.energy),
            StatField::Vitality => TaggedValue::Int(self.vitality),
            StatField::Resistance => TaggedValue::Int(self.resistance),
            StatField::KiPower => TaggedValue::Int(self.ki_power),
            StatField::Alignment => TaggedValue::Int(self.alignment),
            StatField::CombatMode => TaggedValue::Bool(self.combat_mode),
            StatField::Blocking => TaggedValue::Bool(self.blocking),
        }
    }

    /// Writes every field under its registry identifier, visiting fields in
    /// [`StatField::ALL`] order.
    pub fn serialize(&self) -> TaggedMap {
        let mut map = TaggedMap::new();
        for field in StatField::ALL {
            map.put(field.id(), self.value_of(field));
        }
        map
    }

    /// Reads every field back from the map. A key that is absent (or carries
    /// the wrong value kind) leaves the current field value untouched.
    pub fn deserialize(&mut self, map: &TaggedMap) {
        if let Some(v) = map.get_str(StatField::Race.id()) {
            self.race = v.to_string();
        }
        if let Some(v) = map.get_str(StatField::Form.id()) {
            self.form = v.to_string();
        }
        if let Some(v) = map.get_int(StatField::Strength.id()) {
            self.strength = v;
        }
        if let Some(v) = map.get_int(StatField::StrikePower.id()) {
            self.strike_power = v;
        }
        if let Some(v) = map.get_int(StatField::Energy.id()) {
            self.energy = v;
        }
        if let Some(v) = map.get_int(StatField::Vitality.id()) {
            self.vitality = v;
        }
        if let Some(v) = map.get_int(StatField::Resistance.id()) {
            self.resistance = v;
        }
        if let Some(v) = map.get_int(StatField::KiPower.id()) {
            self.ki_power = v;
        }
        if let Some(v) = map.get_int(StatField::Alignment.id()) {
            self.alignment = v;
        }
        if let Some(v) = map.get_bool(StatField::CombatMode.id()) {
            self.combat_mode = v;
        }
        if let Some(v) = map.get_bool(StatField::Blocking.id()) {
            self.blocking = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_record() {
        let record = StatRecord::default();
        assert_eq!(record.race(), EMPTY);
        assert_eq!(record.form(), EMPTY);
        assert_eq!(record.strength(), 5);
        assert_eq!(record.strike_power(), 5);
        assert_eq!(record.energy(), 5);
        assert_eq!(record.vitality(), 5);
        assert_eq!(record.resistance(), 5);
        assert_eq!(record.ki_power(), 5);
        assert_eq!(record.alignment(), 100);
        assert!(!record.combat_mode());
        assert!(!record.blocking());
    }

    #[test]
    fn test_serialize_visits_every_field() {
        let map = StatRecord::default().serialize();
        assert_eq!(map.len(), StatField::ALL.len());
        for field in StatField::ALL {
            assert!(
                map.get_str(field.id()).is_some()
                    || map.get_int(field.id()).is_some()
                    || map.get_bool(field.id()).is_some(),
                "missing key {}",
                field.id()
            );
        }
    }

    #[test]
    fn test_tagged_roundtrip() {
        let original = StatRecord::new(
            "saiyan", "ascended", 42, 17, 99, 3, 8, 120, -50, true, true,
        );
        let mut restored = StatRecord::default();
        restored.deserialize(&original.serialize());
        assert_eq!(restored, original);
    }

    #[test]
    fn test_deserialize_absent_key_keeps_current_value() {
        let mut record = StatRecord::default();
        record.set_energy(42);

        let mut map = TaggedMap::new();
        map.put_int(StatField::Strength.id(), 9);
        record.deserialize(&map);

        assert_eq!(record.strength(), 9);
        assert_eq!(record.energy(), 42);
        assert_eq!(record.alignment(), 100);
        assert_eq!(record.race(), EMPTY);
    }

    #[test]
    fn test_deserialize_wrong_kind_is_ignored() {
        let mut record = StatRecord::default();
        let mut map = TaggedMap::new();
        map.put_str(StatField::Strength.id(), "not a number");
        record.deserialize(&map);
        assert_eq!(record.strength(), 5);
    }

    #[test]
    fn test_legible_labels() {
        assert_eq!(legible_label("combat_mode"), "Combat Mode");
        assert_eq!(legible_label("strength"), "Strength");
        assert_eq!(StatField::StrikePower.legible_label(), "Strike Power");
        assert_eq!(StatField::KiPower.legible_label(), "Ki Power");
    }

    #[test]
    fn test_visibility_partition() {
        let public: Vec<StatField> = StatField::ALL
            .into_iter()
            .filter(|f| f.is_public())
            .collect();
        assert_eq!(
            public,
            vec![
                StatField::Race,
                StatField::Form,
                StatField::CombatMode,
                StatField::Blocking
            ]
        );
        assert!(!StatField::Alignment.is_public());
    }

    #[test]
    fn test_abbreviations() {
        assert_eq!(StatField::Strength.abbreviation(), "STR");
        assert_eq!(StatField::KiPower.abbreviation(), "PWR");
        assert_eq!(StatField::Race.abbreviation(), "");
        assert_eq!(StatField::Alignment.abbreviation(), "");
        let trained = StatField::ALL
            .into_iter()
            .filter(|f| !f.abbreviation().is_empty())
            .count();
        assert_eq!(trained, 6);
    }

    #[test]
    fn test_field_ids_are_stable() {
        let ids: Vec<&str> = StatField::ALL.into_iter().map(StatField::id).collect();
        assert_eq!(
            ids,
            vec![
                "race",
                "form",
                "strength",
                "strike_power",
                "energy",
                "vitality",
                "resistance",
                "ki_power",
                "alignment",
                "combat_mode",
                "blocking"
            ]
        );
    }
}
