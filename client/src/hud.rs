//! Text HUD lines for the local player's stats.
//!
//! Presentation reads the store through the field catalogue, pairing every
//! field with its legible label in registry order.

use shared::stat::{StatField, StatRecord};

/// One `Label: value` line per field, in catalogue order.
pub fn stat_lines(record: &StatRecord) -> Vec<String> {
    StatField::ALL
        .into_iter()
        .map(|field| format!("{}: {}", field.legible_label(), record.value_of(field)))
        .collect()
}

/// Compact one-line summary of the six trainable stats, using their
/// abbreviations (e.g. `STR 5  SKP 5  ...`).
pub fn training_summary(record: &StatRecord) -> String {
    StatField::ALL
        .into_iter()
        .filter(|field| !field.abbreviation().is_empty())
        .map(|field| format!("{} {}", field.abbreviation(), record.value_of(field)))
        .collect::<Vec<_>>()
        .join("  ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_lines_cover_every_field_in_order() {
        let lines = stat_lines(&StatRecord::default());
        assert_eq!(lines.len(), StatField::ALL.len());
        assert_eq!(lines[0], "Race: empty");
        assert_eq!(lines[2], "Strength: 5");
        assert_eq!(lines[8], "Alignment: 100");
        assert_eq!(lines[9], "Combat Mode: false");
    }

    #[test]
    fn test_training_summary_uses_abbreviations() {
        let mut record = StatRecord::default();
        record.set_strength(12);
        let summary = training_summary(&record);
        assert!(summary.starts_with("STR 12"));
        assert!(summary.contains("PWR 5"));
        assert!(!summary.contains("Alignment"));
        assert!(!summary.contains("Race"));
    }
}
