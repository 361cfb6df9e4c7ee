use std::collections::HashMap;

use crate::action::ActionDefinition;
use crate::error::{ExecapiError, Result};

/// Name → definition lookup, built once at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    by_name: HashMap<String, ActionDefinition>,
}

impl Registry {
    /// Index definitions by name. When two definitions share a name the later
    /// one replaces the earlier.
    pub fn from_actions(actions: impl IntoIterator<Item = ActionDefinition>) -> Self {
        let mut by_name = HashMap::new();
        for action in actions {
            by_name.insert(action.name.clone(), action);
        }
        Self { by_name }
    }

    pub fn get(&self, name: &str) -> Result<&ActionDefinition> {
        self.by_name
            .get(name)
            .ok_or_else(|| ExecapiError::ActionNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Definitions sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &ActionDefinition> {
        let mut actions: Vec<_> = self.by_name.values().collect();
        actions.sort_by(|a, b| a.name.cmp(&b.name));
        actions.into_iter()
    }
}
