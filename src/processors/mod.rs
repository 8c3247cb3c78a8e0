//! Built-in trait processors
//!
//! One processor per trait kind. Execution order is fixed here:
//! - resource-defining traits: storage, secret, envFrom, envs, resources,
//!   probes, rbac
//! - traits that add containers and recurse: init, sidecar
//! - traits that emit free-standing objects: ingress

pub mod env;
pub mod ingress;
pub mod init;
pub mod probes;
pub mod rbac;
pub mod resources;
pub mod secret;
pub mod sidecar;
pub mod storage;

pub use env::{EnvFromProcessor, EnvsProcessor};
pub use ingress::IngressProcessor;
pub use init::InitProcessor;
pub use probes::ProbesProcessor;
pub use rbac::RbacProcessor;
pub use resources::ResourcesProcessor;
pub use secret::SecretProcessor;
pub use sidecar::SidecarProcessor;
pub use storage::StorageProcessor;

use crate::engine::{RegistryBuilder, TraitProcessor, TraitResult};
use crate::error::Result;
use k8s_openapi::api::core::v1::{Container, EnvVar};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// Every built-in processor in execution order
pub fn builtin_processors() -> Vec<Arc<dyn TraitProcessor>> {
    vec![
        Arc::new(StorageProcessor),
        Arc::new(SecretProcessor),
        Arc::new(EnvFromProcessor),
        Arc::new(EnvsProcessor),
        Arc::new(ResourcesProcessor),
        Arc::new(ProbesProcessor),
        Arc::new(RbacProcessor),
        Arc::new(InitProcessor),
        Arc::new(SidecarProcessor),
        Arc::new(IngressProcessor),
    ]
}

/// Register the built-in processors on `builder`, in execution order
pub fn register_all_processors(builder: RegistryBuilder) -> Result<RegistryBuilder> {
    builtin_processors()
        .into_iter()
        .try_fold(builder, |builder, processor| builder.register_arc(processor))
}

// =============================================================================
// Shared Helpers
// =============================================================================

/// Plain env vars from a name/value map, in key order
pub(crate) fn env_vars(env: &BTreeMap<String, String>) -> Option<Vec<EnvVar>> {
    if env.is_empty() {
        return None;
    }
    Some(
        env.iter()
            .map(|(name, value)| EnvVar {
                name: name.clone(),
                value: Some(value.clone()),
                value_from: None,
            })
            .collect(),
    )
}

/// Wire a nested level's output onto the container that owns it.
///
/// Mounts, env, resources and probes keyed to the container are applied to
/// it; everything else (volumes, objects, other containers and their
/// fields, service account) is merged into `parent`.
pub(crate) fn attach_nested(
    container: &mut Container,
    mut nested: TraitResult,
    is_init: bool,
    parent: &mut TraitResult,
) {
    nested
        .take_container_fields(&container.name)
        .apply_to(container);

    if let Some(resources) = nested.resources.take() {
        container.resources = Some(resources);
    }

    let liveness = nested.liveness_probe.take();
    let readiness = nested.readiness_probe.take();
    let startup = nested.startup_probe.take();
    if is_init {
        if liveness.is_some() || readiness.is_some() || startup.is_some() {
            warn!(
                container = %container.name,
                "probes are not supported on init containers, ignoring"
            );
        }
    } else {
        container.liveness_probe = liveness.or(container.liveness_probe.take());
        container.readiness_probe = readiness.or(container.readiness_probe.take());
        container.startup_probe = startup.or(container.startup_probe.take());
    }

    parent.merge(nested);
}
