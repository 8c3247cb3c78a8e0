//! Init trait
//!
//! One init container per entry. An entry's nested traits decorate that
//! init container; nested `init` entries are excluded.

use crate::domain::{InitSpec, TraitData, TraitKind};
use crate::engine::{TraitContext, TraitProcessor, TraitResult};
use crate::error::{Error, Result};
use crate::k8s::names;
use crate::processors::{attach_nested, env_vars};
use k8s_openapi::api::core::v1::Container;
use tracing::debug;

/// Processor for the `init` trait
#[derive(Debug, Default, Clone, Copy)]
pub struct InitProcessor;

impl TraitProcessor for InitProcessor {
    fn kind(&self) -> TraitKind {
        TraitKind::Init
    }

    fn process(&self, ctx: &TraitContext<'_>) -> Result<Option<TraitResult>> {
        let TraitData::Init(specs) = ctx.data else {
            return Err(ctx.type_mismatch(self.name(), TraitKind::Init));
        };

        let mut result = TraitResult::new();
        for (idx, spec) in specs.iter().enumerate() {
            let name = container_name(spec, ctx.target, idx);
            let image = spec.properties.image.trim();
            if image.is_empty() {
                return Err(Error::MissingImage {
                    kind: "init container".into(),
                    name,
                });
            }

            let mut container = Container {
                name: name.clone(),
                image: Some(image.to_string()),
                command: (!spec.properties.command.is_empty())
                    .then(|| spec.properties.command.clone()),
                env: env_vars(&spec.properties.env),
                ..Default::default()
            };

            if !spec.traits.is_empty() {
                let nested = ctx.dispatch_nested(&spec.traits, &name, &[TraitKind::Init])?;
                attach_nested(&mut container, nested, true, &mut result);
            }

            debug!(container = %name, depth = ctx.depth, "added init container");
            result.init_containers.push(container);
        }

        Ok(Some(result))
    }
}

fn container_name(spec: &InitSpec, target: &str, idx: usize) -> String {
    if spec.name.trim().is_empty() {
        format!("{}-init-{}", names::normalize(target), idx)
    } else {
        names::normalize(&spec.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TraitEngine;
    use crate::k8s::AuxiliaryObject;
    use crate::processors::testing::{component, deployment, stateful_set};
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn test_init_container_with_nested_traits() {
        let comp = component("api", json!({
            "init": [{
                "name": "migrate",
                "properties": {
                    "image": "migrate:1.0",
                    "command": ["migrate", "up"],
                    "env": { "DB": "postgres" }
                },
                "traits": {
                    "storage": [{ "name": "scratch", "type": "ephemeral", "mountPath": "/scratch" }],
                    "envs": [{ "name": "MODE", "valueFrom": { "static": "once" } }],
                    "resources": { "cpu": "100m" }
                }
            }]
        }));
        let mut workload = deployment("api");
        TraitEngine::builtin().unwrap().apply_traits(&comp, &mut workload).unwrap();

        let pod = workload.pod_spec().unwrap();
        let init = &pod.init_containers.as_ref().unwrap()[0];
        assert_eq!(init.name, "migrate");
        assert_eq!(init.image.as_deref(), Some("migrate:1.0"));
        assert_eq!(init.command.as_ref().unwrap(), &vec!["migrate".to_string(), "up".to_string()]);

        let env: Vec<_> = init.env.as_ref().unwrap().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(env, vec!["DB", "MODE"]);
        assert_eq!(init.volume_mounts.as_ref().unwrap()[0].mount_path, "/scratch");
        assert!(init.resources.is_some());

        assert_eq!(pod.volumes.as_ref().unwrap()[0].name, "scratch");
        let main = workload.container("api").unwrap();
        assert!(main.volume_mounts.is_none());
        assert!(main.resources.is_none());
    }

    #[test]
    fn test_unnamed_init_containers() {
        let comp = component("Api", json!({
            "init": [
                { "properties": { "image": "busybox" } },
                { "properties": { "image": "busybox" } }
            ]
        }));
        let mut workload = deployment("Api");
        TraitEngine::builtin().unwrap().apply_traits(&comp, &mut workload).unwrap();

        let names: Vec<_> = workload
            .pod_spec()
            .unwrap()
            .init_containers
            .as_ref()
            .unwrap()
            .iter()
            .map(|c| c.name.clone())
            .collect();
        assert_eq!(names, vec!["api-init-0", "api-init-1"]);
    }

    #[test]
    fn test_missing_image() {
        let comp = component("api", json!({
            "init": [{ "name": "setup", "properties": { "command": ["true"] } }]
        }));
        let mut workload = deployment("api");

        let err = TraitEngine::builtin().unwrap()
            .apply_traits(&comp, &mut workload)
            .unwrap_err();
        assert_matches!(
            err.root(),
            Error::MissingImage { name, .. } if name == "setup"
        );
        assert!(workload.pod_spec().unwrap().init_containers.is_none());
    }

    #[test]
    fn test_nested_objects_bubble_up() {
        let comp = component("db", json!({
            "init": [{
                "name": "seed",
                "properties": { "image": "seed:1" },
                "traits": {
                    "storage": [{
                        "name": "data",
                        "type": "persistent",
                        "mountPath": "/seed",
                        "create": true
                    }],
                    "secret": [{ "data": { "token": "t" } }]
                }
            }]
        }));
        let mut workload = stateful_set("db");
        let objects = TraitEngine::builtin().unwrap().apply_traits(&comp, &mut workload).unwrap();

        assert_eq!(objects.len(), 1);
        assert_matches!(&objects[0], AuxiliaryObject::Secret(s) if s.metadata.name.as_deref() == Some("seed-secret-0"));

        let Some(sts) = workload.as_stateful_set_mut() else {
            panic!("expected a StatefulSet");
        };
        let templates = sts.spec.as_ref().unwrap().volume_claim_templates.as_ref().unwrap();
        assert_eq!(templates[0].metadata.name.as_deref(), Some("data"));
    }
}
