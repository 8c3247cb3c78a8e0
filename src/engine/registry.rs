//! Processor registry
//!
//! An ordered, immutable list of processors. Order is execution order and
//! the tie-break for singleton fields during aggregation. Registries are
//! assembled once at bootstrap through [`RegistryBuilder`] and shared by
//! reference afterwards; there is no registration after `build()`.

use super::processor::TraitProcessor;
use crate::error::{Error, Result};
use std::fmt;
use std::sync::Arc;

// =============================================================================
// Builder
// =============================================================================

/// Collects processors in registration order
#[derive(Default)]
pub struct RegistryBuilder {
    processors: Vec<Arc<dyn TraitProcessor>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a processor; a name that is already registered is rejected
    pub fn register(self, processor: impl TraitProcessor + 'static) -> Result<Self> {
        self.register_arc(Arc::new(processor))
    }

    pub fn register_arc(mut self, processor: Arc<dyn TraitProcessor>) -> Result<Self> {
        if self.processors.iter().any(|p| p.name() == processor.name()) {
            return Err(Error::DuplicateProcessor {
                name: processor.name().to_string(),
            });
        }
        self.processors.push(processor);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Freeze the registry
    pub fn build(self) -> ProcessorRegistry {
        ProcessorRegistry {
            processors: self.processors.into(),
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Frozen, cheaply cloneable processor list
#[derive(Clone)]
pub struct ProcessorRegistry {
    processors: Arc<[Arc<dyn TraitProcessor>]>,
}

impl ProcessorRegistry {
    /// Registry holding every built-in processor in execution order
    pub fn builtin() -> Result<Self> {
        crate::processors::register_all_processors(RegistryBuilder::new())
            .map(RegistryBuilder::build)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn TraitProcessor>> {
        self.processors.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn TraitProcessor>> {
        self.processors.iter().find(|p| p.name() == name)
    }

    /// Processor names in execution order
    pub fn names(&self) -> Vec<&str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

impl fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
