//! Recursive dispatcher
//!
//! Walks the registry in order, hands each processor the narrowed data of its
//! kind and merges everything produced at one level. Init and sidecar
//! processors re-enter the dispatcher for their nested traits through
//! [`TraitContext::dispatch_nested`].

use super::aggregate::aggregate;
use super::context::TraitContext;
use super::registry::ProcessorRegistry;
use super::result::TraitResult;
use crate::config::EngineConfig;
use crate::domain::{Component, TraitKind, Traits};
use crate::error::Result;
use crate::k8s::Workload;
use crate::metrics::EngineMetrics;
use std::fmt;
use tracing::{debug, warn};

// =============================================================================
// Exclusion Set
// =============================================================================

/// Trait kinds that may not be dispatched at a nesting level
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct ExclusionSet(u16);

impl ExclusionSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn of(kinds: &[TraitKind]) -> Self {
        kinds.iter().fold(Self::empty(), |set, kind| set.with(*kind))
    }

    /// Copy of this set with `kind` added
    pub fn with(self, kind: TraitKind) -> Self {
        Self(self.0 | Self::bit(kind))
    }

    pub fn contains(&self, kind: TraitKind) -> bool {
        self.0 & Self::bit(kind) != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    fn bit(kind: TraitKind) -> u16 {
        1 << (kind as u16)
    }
}

impl fmt::Debug for ExclusionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(TraitKind::ALL.iter().filter(|k| self.contains(**k)))
            .finish()
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Borrowed handle on the registry and config for one apply
#[derive(Clone, Copy)]
pub struct Dispatcher<'a> {
    registry: &'a ProcessorRegistry,
    config: &'a EngineConfig,
    metrics: Option<&'a EngineMetrics>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        registry: &'a ProcessorRegistry,
        config: &'a EngineConfig,
        metrics: Option<&'a EngineMetrics>,
    ) -> Self {
        Self {
            registry,
            config,
            metrics,
        }
    }

    pub fn config(&self) -> &'a EngineConfig {
        self.config
    }

    /// Run every applicable processor over `traits` and merge the results
    pub fn dispatch<'b>(
        &self,
        component: &'b Component,
        workload: &'b Workload,
        traits: &'b Traits,
        target: &'b str,
        exclusions: ExclusionSet,
        depth: usize,
    ) -> Result<TraitResult>
    where
        'a: 'b,
    {
        let dispatcher: Dispatcher<'b> = *self;
        let mut results = Vec::new();

        for processor in self.registry.iter() {
            let kind = processor.kind();
            let Some(data) = traits.data(kind) else {
                continue;
            };
            if exclusions.contains(kind) {
                warn!(
                    component = %component.name,
                    container = target,
                    depth,
                    trait_kind = %kind,
                    "trait not allowed at this nesting level, ignoring"
                );
                continue;
            }

            debug!(
                component = %component.name,
                container = target,
                depth,
                processor = processor.name(),
                "dispatching trait"
            );

            let ctx = TraitContext {
                component,
                workload,
                data,
                target,
                depth,
                exclusions,
                dispatcher,
            };

            let outcome = processor.process(&ctx);
            if let Some(metrics) = self.metrics {
                metrics.record_processor(processor.name(), outcome.is_ok());
            }

            match outcome {
                Ok(Some(result)) => results.push(result),
                Ok(None) => {
                    debug!(
                        processor = processor.name(),
                        container = target,
                        "trait produced no changes"
                    );
                }
                Err(e) => return Err(e.in_trait(processor.name())),
            }
        }

        Ok(aggregate(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusion_set() {
        let set = ExclusionSet::empty();
        assert!(set.is_empty());

        let set = set.with(TraitKind::Sidecar).with(TraitKind::Init);
        assert!(set.contains(TraitKind::Sidecar));
        assert!(set.contains(TraitKind::Init));
        assert!(!set.contains(TraitKind::Storage));
        assert_eq!(set.len(), 2);
        assert_eq!(set, ExclusionSet::of(&[TraitKind::Init, TraitKind::Sidecar]));
    }

    #[test]
    fn test_exclusion_set_covers_every_kind() {
        let all = ExclusionSet::of(&TraitKind::ALL);
        assert_eq!(all.len(), TraitKind::ALL.len());
        assert_eq!(format!("{:?}", ExclusionSet::of(&[TraitKind::Rbac])), "{Rbac}");
    }
}
