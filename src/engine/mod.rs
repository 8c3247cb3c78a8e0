//! Trait engine
//!
//! Turns a component's trait payload into workload mutations and auxiliary
//! objects:
//!
//! ```text
//! Component.traits ──► Traits ──► Dispatcher ──► TraitResult* ──► aggregate
//!                                    │  ▲                            │
//!                                    ▼  │ init / sidecar             ▼
//!                              TraitProcessor                  materialize
//!                                                                     │
//!                                            (mutated Workload, Vec<AuxiliaryObject>)
//! ```
//!
//! One apply is synchronous and allocates its own contexts and results; the
//! registry is the only shared state and is immutable.

pub mod aggregate;
pub mod context;
pub mod dispatch;
pub mod materialize;
pub mod processor;
pub mod registry;
pub mod result;

pub use aggregate::aggregate;
pub use context::TraitContext;
pub use dispatch::{Dispatcher, ExclusionSet};
pub use materialize::materialize;
pub use processor::TraitProcessor;
pub use registry::{ProcessorRegistry, RegistryBuilder};
pub use result::{ContainerFields, TraitResult};

use crate::config::EngineConfig;
use crate::domain::Component;
use crate::error::{Error, Result};
use crate::k8s::{AuxiliaryObject, Workload};
use crate::metrics::EngineMetrics;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{debug, info};

// =============================================================================
// Trait Engine
// =============================================================================

/// Entry point for applying traits to workloads
#[derive(Debug, Clone)]
pub struct TraitEngine {
    registry: ProcessorRegistry,
    config: EngineConfig,
    metrics: Option<Arc<EngineMetrics>>,
}

impl TraitEngine {
    pub fn new(registry: ProcessorRegistry, config: EngineConfig) -> Self {
        Self {
            registry,
            config,
            metrics: None,
        }
    }

    /// Engine with the built-in processors and default configuration
    pub fn builtin() -> Result<Self> {
        Ok(Self::new(ProcessorRegistry::builtin()?, EngineConfig::default()))
    }

    /// Record apply outcomes into `metrics`
    pub fn with_metrics(mut self, metrics: Arc<EngineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &ProcessorRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> Option<&Arc<EngineMetrics>> {
        self.metrics.as_ref()
    }

    /// Apply the component's traits to `workload`.
    ///
    /// On success the workload is mutated in place and the free-standing
    /// objects are returned. On error the workload must be discarded: no
    /// rollback is attempted for changes made before the failure.
    pub fn apply_traits(
        &self,
        component: &Component,
        workload: &mut Workload,
    ) -> Result<Vec<AuxiliaryObject>> {
        let start = Instant::now();
        let outcome = self.apply(component, workload);

        if let Some(metrics) = &self.metrics {
            metrics.record_apply(&outcome, start.elapsed());
        }
        outcome
    }

    fn apply(&self, component: &Component, workload: &mut Workload) -> Result<Vec<AuxiliaryObject>> {
        if component.name.trim().is_empty() {
            return Err(Error::InvalidComponent(
                "component name must not be empty".into(),
            ));
        }

        let Some(traits) = component.parse_traits()? else {
            debug!(component = %component.name, "no traits to apply");
            return Ok(Vec::new());
        };

        let dispatcher = Dispatcher::new(&self.registry, &self.config, self.metrics.as_deref());
        let result = dispatcher.dispatch(
            component,
            workload,
            &traits,
            &component.name,
            ExclusionSet::empty(),
            0,
        )?;

        let objects = materialize(result, component, workload, &self.config)?;

        info!(
            component = %component.name,
            workload = workload.kind(),
            objects = objects.len(),
            "applied traits"
        );
        Ok(objects)
    }
}

static DEFAULT_ENGINE: OnceLock<TraitEngine> = OnceLock::new();

/// Apply traits with the built-in processors and default configuration.
///
/// The engine behind this function is built on first use and shared by
/// every later call.
pub fn apply_traits(component: &Component, workload: &mut Workload) -> Result<Vec<AuxiliaryObject>> {
    let engine = match DEFAULT_ENGINE.get() {
        Some(engine) => engine,
        None => {
            let engine = TraitEngine::builtin()?;
            DEFAULT_ENGINE.get_or_init(|| engine)
        }
    };
    engine.apply_traits(component, workload)
}
