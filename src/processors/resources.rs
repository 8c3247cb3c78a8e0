//! Resources trait
//!
//! Sets compute limits on the decorated container. Requests are left to the
//! workload author.

use crate::domain::{TraitData, TraitKind};
use crate::engine::{TraitContext, TraitProcessor, TraitResult};
use crate::error::Result;
use crate::k8s::parse_quantity;
use k8s_openapi::api::core::v1::ResourceRequirements;
use std::collections::BTreeMap;

/// Processor for the `resources` trait
#[derive(Debug, Default, Clone, Copy)]
pub struct ResourcesProcessor;

impl TraitProcessor for ResourcesProcessor {
    fn kind(&self) -> TraitKind {
        TraitKind::Resources
    }

    fn process(&self, ctx: &TraitContext<'_>) -> Result<Option<TraitResult>> {
        let TraitData::Resources(spec) = ctx.data else {
            return Err(ctx.type_mismatch(self.name(), TraitKind::Resources));
        };

        let gpu = ctx.config().gpu_resource_name.as_str();
        let mut limits = BTreeMap::new();
        for (field, key, raw) in [
            ("cpu", "cpu", &spec.cpu),
            ("memory", "memory", &spec.memory),
            ("gpu", gpu, &spec.gpu),
        ] {
            if !raw.trim().is_empty() {
                limits.insert(key.to_string(), parse_quantity(field, raw)?);
            }
        }

        if limits.is_empty() {
            return Ok(None);
        }

        Ok(Some(TraitResult {
            resources: Some(ResourceRequirements {
                limits: Some(limits),
                ..Default::default()
            }),
            ..Default::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TraitEngine;
    use crate::error::Error;
    use crate::processors::testing::{component, deployment, process};
    use assert_matches::assert_matches;
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use serde_json::json;

    #[test]
    fn test_limits_from_spec() {
        let comp = component("api", json!({
            "resources": { "cpu": "500m", "memory": "256Mi", "gpu": "1" }
        }));
        let result = process(&ResourcesProcessor, &comp).unwrap().unwrap();
        let resources = result.resources.unwrap();
        let limits = resources.limits.unwrap();

        assert_eq!(limits["cpu"], Quantity("500m".into()));
        assert_eq!(limits["memory"], Quantity("256Mi".into()));
        assert_eq!(limits["nvidia.com/gpu"], Quantity("1".into()));
        assert!(resources.requests.is_none());
    }

    #[test]
    fn test_invalid_quantity() {
        let comp = component("api", json!({ "resources": { "memory": "lots" } }));
        assert_matches!(
            process(&ResourcesProcessor, &comp),
            Err(Error::InvalidQuantity { field, .. }) if field == "memory"
        );
    }

    #[test]
    fn test_limits_applied_to_main_container() {
        let comp = component("api", json!({ "resources": { "cpu": "2" } }));
        let mut workload = deployment("api");
        TraitEngine::builtin().unwrap().apply_traits(&comp, &mut workload).unwrap();

        let resources = workload.container("api").unwrap().resources.as_ref().unwrap();
        assert_eq!(resources.limits.as_ref().unwrap()["cpu"], Quantity("2".into()));
    }
}
