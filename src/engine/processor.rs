//! Trait processor contract

use super::context::TraitContext;
use super::result::TraitResult;
use crate::domain::TraitKind;
use crate::error::Result;

/// One pluggable unit of transformation logic for a trait kind.
///
/// Processors are stateless and shared across invocations, so they must be
/// `Send + Sync`. Returning `Ok(None)` means the trait produced nothing.
pub trait TraitProcessor: Send + Sync {
    /// Trait kind whose data this processor consumes
    fn kind(&self) -> TraitKind;

    /// Registry name; unique within a registry
    fn name(&self) -> &str {
        self.kind().as_str()
    }

    /// Convert the narrowed trait data into proposed workload changes
    fn process(&self, ctx: &TraitContext<'_>) -> Result<Option<TraitResult>>;
}
