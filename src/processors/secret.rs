//! Secret trait
//!
//! Each entry becomes an Opaque Secret carrying the entry's data as
//! `stringData`, mounted read-only at `/secrets/{name}`.

use crate::domain::{TraitData, TraitKind};
use crate::engine::{TraitContext, TraitProcessor, TraitResult};
use crate::error::Result;
use crate::k8s::labels::{component_labels, non_empty};
use crate::k8s::names;
use k8s_openapi::api::core::v1::{Secret, SecretVolumeSource, Volume, VolumeMount};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tracing::debug;

/// Processor for the `secret` trait
#[derive(Debug, Default, Clone, Copy)]
pub struct SecretProcessor;

impl TraitProcessor for SecretProcessor {
    fn kind(&self) -> TraitKind {
        TraitKind::Secret
    }

    fn process(&self, ctx: &TraitContext<'_>) -> Result<Option<TraitResult>> {
        let TraitData::Secret(specs) = ctx.data else {
            return Err(ctx.type_mismatch(self.name(), TraitKind::Secret));
        };

        let mut result = TraitResult::new();
        let base = names::normalize(ctx.target);

        for (idx, spec) in specs.iter().enumerate() {
            let name = format!("{}-secret-{}", base, idx);

            result.add_object(Secret {
                metadata: ObjectMeta {
                    name: Some(name.clone()),
                    namespace: Some(ctx.namespace().to_string()),
                    labels: non_empty(component_labels(ctx.component)),
                    ..Default::default()
                },
                type_: Some("Opaque".to_string()),
                string_data: Some(spec.data.clone()),
                ..Default::default()
            });

            result.volumes.push(Volume {
                name: name.clone(),
                secret: Some(SecretVolumeSource {
                    secret_name: Some(name.clone()),
                    default_mode: Some(ctx.config().volume_default_mode),
                    ..Default::default()
                }),
                ..Default::default()
            });

            result.add_mount(
                ctx.target,
                VolumeMount {
                    name: name.clone(),
                    mount_path: format!("/secrets/{}", name),
                    read_only: Some(true),
                    ..Default::default()
                },
            );

            debug!(secret = %name, keys = spec.data.len(), "added secret");
        }

        Ok(Some(result))
    }
}
