//! Table configuration store
//!
//! Holds the `TableConfig` of every table the dashboard knows about. One store
//! is shared (via `Arc`) between the session and whatever renders table lists.

use basable_core::{TableConfig, TableConfigPatch};
use indexmap::IndexMap;
use parking_lot::RwLock;

#[derive(Debug, Default)]
struct StoreState {
    configs: IndexMap<String, TableConfig>,
    state_trigger: u64,
}

/// Configurations keyed by table name
#[derive(Debug, Default)]
pub struct TableConfigStore {
    state: RwLock<StoreState>,
}

impl TableConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a configuration
    pub fn add_config(&self, config: TableConfig) {
        let mut state = self.state.write();
        state.configs.insert(config.name.clone(), config);
        state.state_trigger += 1;
    }

    /// Replace every stored configuration, keeping the given order
    pub fn set_configs(&self, configs: Vec<TableConfig>) {
        let mut state = self.state.write();
        state.configs = configs
            .into_iter()
            .map(|config| (config.name.clone(), config))
            .collect();
        state.state_trigger += 1;
    }

    /// Merge a saved patch into the stored config for `table`.
    ///
    /// Returns the updated config. An unknown table gets a fresh entry.
    pub fn update_config(&self, table: &str, patch: &TableConfigPatch) -> TableConfig {
        let mut state = self.state.write();
        let config = state
            .configs
            .entry(table.to_string())
            .or_insert_with(|| TableConfig::new(table));
        config.merge(patch);
        let updated = config.clone();
        state.state_trigger += 1;
        updated
    }

    pub fn get(&self, table: &str) -> Option<TableConfig> {
        self.state.read().configs.get(table).cloned()
    }

    pub fn all(&self) -> Vec<TableConfig> {
        self.state.read().configs.values().cloned().collect()
    }

    pub fn label_of(&self, table: &str) -> String {
        self.state
            .read()
            .configs
            .get(table)
            .map(|c| c.display_label().to_string())
            .unwrap_or_else(|| table.to_string())
    }

    pub fn remove(&self, table: &str) -> Option<TableConfig> {
        let mut state = self.state.write();
        let removed = state.configs.shift_remove(table);
        if removed.is_some() {
            state.state_trigger += 1;
        }
        removed
    }

    /// Incremented on every change; watchers compare it to decide when to refresh.
    pub fn state_trigger(&self) -> u64 {
        self.state.read().state_trigger
    }

    pub fn bump_trigger(&self) {
        self.state.write().state_trigger += 1;
    }

    /// Forget everything (logout)
    pub fn reset(&self) {
        let mut state = self.state.write();
        state.configs.clear();
        state.state_trigger = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn add_replaces_by_name() {
        let store = TableConfigStore::new();
        store.add_config(TableConfig::new("orders"));
        store.add_config(TableConfig {
            label: Some("Orders".into()),
            ..TableConfig::new("orders")
        });

        assert_eq!(store.all().len(), 1);
        assert_eq!(store.label_of("orders"), "Orders");
        assert_eq!(store.label_of("customers"), "customers");
        assert_eq!(store.state_trigger(), 2);
    }

    #[test]
    fn update_merges_patch() {
        let store = TableConfigStore::new();
        store.add_config(TableConfig {
            unique_column: Some("id".into()),
            ..TableConfig::new("orders")
        });

        let updated = store.update_config(
            "orders",
            &TableConfigPatch {
                items_per_page: Some(25),
                ..Default::default()
            },
        );

        assert_eq!(updated.unique_column.as_deref(), Some("id"));
        assert_eq!(updated.page_size(), 25);
        assert_eq!(store.get("orders"), Some(updated));
    }

    #[test]
    fn reset_clears_configs_and_trigger() {
        let store = TableConfigStore::new();
        store.set_configs(vec![TableConfig::new("a"), TableConfig::new("b")]);
        store.bump_trigger();
        store.reset();

        assert!(store.all().is_empty());
        assert_eq!(store.state_trigger(), 0);
    }
}
