//! The set of tables the scheduler processes each cycle.

use std::collections::HashSet;

use tracing::{info, warn};

use altforge_config::SheetEntry;
use altforge_core::TrackedTable;

/// Tracked tables in configuration order. Built once at startup and moved
/// into the scheduler.
#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    tables: Vec<TrackedTable>,
}

impl TableRegistry {
    pub fn new(tables: Vec<TrackedTable>) -> Self {
        Self { tables }
    }

    /// Build from configured sheets, dropping blank ids and exact duplicates.
    pub fn from_config(entries: &[SheetEntry]) -> Self {
        let mut seen = HashSet::new();
        let mut tables = Vec::with_capacity(entries.len());
        for entry in entries {
            let id = entry.id.trim();
            if id.is_empty() {
                warn!("Skipping sheet entry with an empty id");
                continue;
            }
            if !seen.insert((id.to_string(), entry.name.clone())) {
                warn!(sheet = id, name = %entry.name, "Duplicate sheet entry ignored");
                continue;
            }
            tables.push(TrackedTable::new(id, entry.name.clone()));
        }
        info!(tables = tables.len(), "Table registry built");
        Self { tables }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedTable> {
        self.tables.iter()
    }

    pub fn tables(&self) -> &[TrackedTable] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, name: &str) -> SheetEntry {
        SheetEntry { id: id.into(), name: name.into() }
    }

    #[test]
    fn keeps_order_and_drops_duplicates() {
        let registry = TableRegistry::from_config(&[
            entry("b", "Sheet1"),
            entry("a", "Sheet1"),
            entry("b", "Sheet1"),
            entry("b", "Other"),
            entry("  ", "Sheet1"),
        ]);
        let ids: Vec<(&str, &str)> = registry
            .iter()
            .map(|t| (t.identifier.as_str(), t.display_name.as_str()))
            .collect();
        assert_eq!(ids, vec![("b", "Sheet1"), ("a", "Sheet1"), ("b", "Other")]);
    }

    #[test]
    fn empty_config_gives_empty_registry() {
        assert!(TableRegistry::from_config(&[]).is_empty());
    }
}
