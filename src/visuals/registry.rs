use std::collections::HashMap;

use crate::error::{RenderError, Result};
use crate::visuals::{BarsVisualizer, ParticleVisualizer, PulseVisualizer, Visualizer};

type Factory = Box<dyn Fn() -> Box<dyn Visualizer> + Send + Sync>;

/// Registry for managing available visualizers
///
/// Every lookup returns a fresh instance, so two exports never share
/// renderer state.
pub struct VisualizerRegistry {
    factories: HashMap<String, Factory>,
}

impl VisualizerRegistry {
    /// Create a new registry with all built-in visualizers
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };

        registry.register("pulse", || Box::new(PulseVisualizer::new()));
        registry.register("bars", || Box::new(BarsVisualizer::new()));
        registry.register("particles", || Box::new(ParticleVisualizer::new()));
        registry
    }

    /// Register a custom visualizer under `name`, replacing any existing entry
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn Visualizer> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    /// Get a new instance of a visualizer by name
    pub fn create(&self, name: &str) -> Result<Box<dyn Visualizer>> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| RenderError::NotFound { name: name.to_string() }.into())
    }

    /// Get all available visualizer names, sorted
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for VisualizerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
