use std::collections::HashMap;
use std::sync::Arc;

use crate::command::types::Command;
use crate::error::{EngineError, EngineResult};

/// Central registry resolving aliases to commands. Aliases (including the
/// command id itself) are case-insensitive and must be unique.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn Command>>,
    aliases: HashMap<String, String>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, command: Arc<dyn Command>) -> EngineResult<()> {
        let config = command.config();
        let id = config.id.clone();
        if self.commands.contains_key(&id) {
            return Err(EngineError::InvalidInput(format!(
                "command {id} already registered"
            )));
        }

        let mut keys = vec![id.to_lowercase()];
        keys.extend(config.aliases.iter().map(|a| a.to_lowercase()));
        for key in &keys {
            if let Some(existing) = self.aliases.get(key) {
                return Err(EngineError::AliasConflict {
                    alias: key.clone(),
                    id: id.clone(),
                    existing: existing.clone(),
                });
            }
        }

        for key in keys {
            self.aliases.insert(key, id.clone());
        }
        self.commands.insert(id, command);
        Ok(())
    }

    /// Look a command up by any of its aliases.
    pub fn find(&self, alias: &str) -> Option<Arc<dyn Command>> {
        let id = self.aliases.get(&alias.to_lowercase())?;
        self.commands.get(id).cloned()
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(id).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Command>> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
