//! Trait context
//!
//! Read-only view handed to a processor: the owning component, the target
//! workload, the engine config and the one trait kind's data it consumes.

use super::dispatch::{Dispatcher, ExclusionSet};
use super::result::TraitResult;
use crate::config::EngineConfig;
use crate::domain::{Component, TraitData, TraitKind, Traits};
use crate::error::{Error, Result};
use crate::k8s::Workload;

/// Processor input for one trait kind at one nesting level
#[derive(Clone, Copy)]
pub struct TraitContext<'a> {
    pub component: &'a Component,
    pub workload: &'a Workload,
    pub data: TraitData<'a>,

    /// Container the traits at this level decorate
    pub target: &'a str,

    /// Nesting depth; 0 for the component's own traits
    pub depth: usize,

    pub(crate) exclusions: ExclusionSet,
    pub(crate) dispatcher: Dispatcher<'a>,
}

impl<'a> TraitContext<'a> {
    pub fn config(&self) -> &'a EngineConfig {
        self.dispatcher.config()
    }

    /// True when this level decorates the component's main container
    pub fn is_main(&self) -> bool {
        self.target == self.component.name
    }

    /// Namespace of the component, or the configured default
    pub fn namespace(&self) -> &'a str {
        if self.component.namespace.is_empty() {
            &self.config().default_namespace
        } else {
            &self.component.namespace
        }
    }

    /// Dispatch a nested trait aggregate onto another container.
    ///
    /// The kinds in `exclude` are added to the inherited exclusions, so the
    /// set of dispatchable kinds only shrinks with depth.
    pub fn dispatch_nested(
        &self,
        traits: &Traits,
        target: &str,
        exclude: &[TraitKind],
    ) -> Result<TraitResult> {
        let depth = self.depth + 1;
        let max_depth = self.config().max_depth;
        if depth > max_depth {
            return Err(Error::RecursionLimit { max_depth });
        }

        let exclusions = exclude
            .iter()
            .fold(self.exclusions, |set, kind| set.with(*kind));

        self.dispatcher
            .dispatch(self.component, self.workload, traits, target, exclusions, depth)
    }

    /// Wiring error for data of the wrong kind
    pub fn type_mismatch(&self, processor: &str, expected: TraitKind) -> Error {
        Error::TraitTypeMismatch {
            processor: processor.to_string(),
            expected: expected.to_string(),
            actual: self.data.kind().to_string(),
        }
    }
}

impl std::fmt::Debug for TraitContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraitContext")
            .field("component", &self.component.name)
            .field("workload", &self.workload.kind())
            .field("data", &self.data.kind())
            .field("target", &self.target)
            .field("depth", &self.depth)
            .field("exclusions", &self.exclusions)
            .finish()
    }
}
