//! Sidecar trait
//!
//! One extra container per entry. Nested traits decorate the sidecar;
//! nested `sidecar` and `init` entries are excluded. A sidecar that
//! declares its own sidecars is rejected before anything is built.

use crate::domain::{SidecarSpec, TraitData, TraitKind};
use crate::engine::{TraitContext, TraitProcessor, TraitResult};
use crate::error::{Error, Result};
use crate::k8s::names;
use crate::processors::{attach_nested, env_vars};
use k8s_openapi::api::core::v1::Container;
use tracing::debug;

/// Processor for the `sidecar` trait
#[derive(Debug, Default, Clone, Copy)]
pub struct SidecarProcessor;

impl TraitProcessor for SidecarProcessor {
    fn kind(&self) -> TraitKind {
        TraitKind::Sidecar
    }

    fn process(&self, ctx: &TraitContext<'_>) -> Result<Option<TraitResult>> {
        let TraitData::Sidecar(specs) = ctx.data else {
            return Err(ctx.type_mismatch(self.name(), TraitKind::Sidecar));
        };

        let names: Vec<String> = specs
            .iter()
            .enumerate()
            .map(|(idx, spec)| container_name(spec, ctx.target, idx))
            .collect();

        for (spec, name) in specs.iter().zip(&names) {
            if !spec.traits.sidecar.is_empty() {
                return Err(Error::NestedSidecar {
                    sidecar: name.clone(),
                });
            }
            if spec.image.trim().is_empty() {
                return Err(Error::MissingImage {
                    kind: "sidecar".into(),
                    name: name.clone(),
                });
            }
        }

        let mut result = TraitResult::new();
        for (spec, name) in specs.iter().zip(names) {
            let mut container = Container {
                name: name.clone(),
                image: Some(spec.image.trim().to_string()),
                command: (!spec.command.is_empty()).then(|| spec.command.clone()),
                args: (!spec.args.is_empty()).then(|| spec.args.clone()),
                env: env_vars(&spec.env),
                ..Default::default()
            };

            if !spec.traits.is_empty() {
                let nested = ctx.dispatch_nested(
                    &spec.traits,
                    &name,
                    &[TraitKind::Sidecar, TraitKind::Init],
                )?;
                attach_nested(&mut container, nested, false, &mut result);
            }

            debug!(container = %name, depth = ctx.depth, "added sidecar container");
            result.containers.push(container);
        }

        Ok(Some(result))
    }
}

fn container_name(spec: &SidecarSpec, target: &str, idx: usize) -> String {
    if spec.name.trim().is_empty() {
        format!("{}-sidecar-{}", names::normalize(target), idx)
    } else {
        names::normalize(&spec.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PVC_ROLE_ANNOTATION;
    use crate::engine::TraitEngine;
    use crate::k8s::Workload;
    use crate::processors::testing::{component, deployment, process, stateful_set};
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn test_sidecar_with_own_traits() {
        let comp = component("api", json!({
            "sidecar": [{
                "name": "log-agent",
                "image": "fluent-bit:2",
                "args": ["--config", "/etc/fluent"],
                "env": { "LEVEL": "info" },
                "traits": {
                    "storage": [{ "name": "logs", "type": "ephemeral", "mountPath": "/var/log/app" }],
                    "probes": [{ "type": "liveness", "tcpSocket": { "port": 2020 } }],
                    "envFrom": [{ "type": "configMap", "sourceName": "agent-config" }]
                }
            }]
        }));
        let mut workload = deployment("api");
        TraitEngine::builtin().unwrap().apply_traits(&comp, &mut workload).unwrap();

        let sidecar = workload.container("log-agent").unwrap();
        assert_eq!(sidecar.image.as_deref(), Some("fluent-bit:2"));
        assert_eq!(sidecar.args.as_ref().unwrap().len(), 2);
        assert_eq!(sidecar.env.as_ref().unwrap()[0].name, "LEVEL");
        assert_eq!(sidecar.volume_mounts.as_ref().unwrap()[0].name, "logs");
        assert!(sidecar.liveness_probe.is_some());
        assert_eq!(sidecar.env_from.as_ref().unwrap().len(), 1);

        let main = workload.container("api").unwrap();
        assert!(main.liveness_probe.is_none());
        assert!(main.volume_mounts.is_none());
    }

    #[test]
    fn test_nested_sidecar_rejected_before_containers_appended() {
        let comp = component("api", json!({
            "sidecar": [
                { "name": "ok", "image": "busybox" },
                {
                    "name": "outer",
                    "image": "busybox",
                    "traits": { "sidecar": [{ "name": "inner", "image": "busybox" }] }
                }
            ]
        }));
        assert_matches!(
            process(&SidecarProcessor, &comp),
            Err(Error::NestedSidecar { sidecar }) if sidecar == "outer"
        );

        let mut workload = deployment("api");
        let err = TraitEngine::builtin().unwrap()
            .apply_traits(&comp, &mut workload)
            .unwrap_err();
        assert!(err.to_string().contains("sidecar 'outer' must not contain nested sidecars"));
        assert_eq!(workload.pod_spec().unwrap().containers.len(), 1);
    }

    #[test]
    fn test_missing_image() {
        let comp = component("api", json!({ "sidecar": [{ "name": "agent" }] }));
        assert_matches!(
            process(&SidecarProcessor, &comp),
            Err(Error::MissingImage { name, .. }) if name == "agent"
        );
    }

    #[test]
    fn test_unnamed_sidecar() {
        let comp = component("api", json!({ "sidecar": [{ "image": "busybox" }] }));
        let result = process(&SidecarProcessor, &comp).unwrap().unwrap();
        assert_eq!(result.containers[0].name, "api-sidecar-0");
    }

    #[test]
    fn test_shared_volume_deduplicated_across_depths() {
        let data = json!({
            "name": "data",
            "type": "persistent",
            "mountPath": "/data",
            "create": true,
            "size": "2Gi"
        });
        let comp = component("db", json!({
            "storage": [data.clone()],
            "sidecar": [{
                "name": "backup",
                "image": "backup:1",
                "traits": { "storage": [data.clone()] }
            }],
            "init": [{
                "name": "restore",
                "properties": { "image": "restore:1" },
                "traits": { "storage": [data] }
            }]
        }));

        let mut workload = deployment("db");
        let objects = TraitEngine::builtin().unwrap().apply_traits(&comp, &mut workload).unwrap();
        let pod = workload.pod_spec().unwrap();
        let data_volumes = pod
            .volumes
            .iter()
            .flatten()
            .filter(|v| v.name == "data")
            .count();
        assert_eq!(data_volumes, 1);
        // deployments drop claim templates
        assert!(objects.iter().all(|o| o.annotation(PVC_ROLE_ANNOTATION).is_none()));

        let mut workload = stateful_set("db");
        TraitEngine::builtin().unwrap().apply_traits(&comp, &mut workload).unwrap();
        let Workload::StatefulSet(sts) = &workload else {
            panic!("expected a StatefulSet");
        };
        let spec = sts.spec.as_ref().unwrap();
        assert_eq!(spec.volume_claim_templates.as_ref().unwrap().len(), 1);

        let pod = spec.template.spec.as_ref().unwrap();
        for name in ["db", "backup"] {
            let container = pod.containers.iter().find(|c| c.name == name).unwrap();
            assert_eq!(container.volume_mounts.as_ref().unwrap()[0].name, "data");
        }
        let restore = &pod.init_containers.as_ref().unwrap()[0];
        assert_eq!(restore.volume_mounts.as_ref().unwrap()[0].name, "data");
    }
}
