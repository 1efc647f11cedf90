//! Stage registry for managing configured stages.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::traits::{Stage, StageId};

/// Registry of stages, at most one per [`StageId`], kept in execution order.
pub struct StageRegistry {
    stages: BTreeMap<StageId, Arc<dyn Stage>>,
}

impl StageRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            stages: BTreeMap::new(),
        }
    }

    /// Register a stage, replacing any stage with the same id.
    pub fn register<S: Stage + 'static>(&mut self, stage: S) {
        self.stages.insert(stage.id(), Arc::new(stage));
    }

    /// Get a stage by ID.
    pub fn get(&self, id: StageId) -> Option<Arc<dyn Stage>> {
        self.stages.get(&id).cloned()
    }

    /// Check if a stage is registered.
    pub fn contains(&self, id: StageId) -> bool {
        self.stages.contains_key(&id)
    }

    /// Registered stage IDs in execution order.
    pub fn stage_ids(&self) -> Vec<StageId> {
        self.stages.keys().copied().collect()
    }

    /// Registered stages in execution order.
    pub fn stages(&self) -> impl Iterator<Item = &Arc<dyn Stage>> {
        self.stages.values()
    }

    /// Remove a stage.
    pub fn remove(&mut self, id: StageId) -> Option<Arc<dyn Stage>> {
        self.stages.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::new()
    }
}
