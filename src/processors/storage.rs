//! Storage trait
//!
//! Maps each storage entry to a pod volume plus a mount on the target
//! container. Persistent entries with `create: true` also emit a PVC marked
//! as a volume-claim template; its name is the volume name and the mount
//! name, which is what StatefulSet binding relies on.

use crate::config::PVC_ROLE_TEMPLATE;
use crate::domain::{StorageSpec, TraitData, TraitKind};
use crate::engine::{TraitContext, TraitProcessor, TraitResult};
use crate::error::{Error, Result};
use crate::k8s::{names, parse_quantity};
use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, EmptyDirVolumeSource, HostPathVolumeSource, PersistentVolumeClaim,
    PersistentVolumeClaimSpec, PersistentVolumeClaimVolumeSource, SecretVolumeSource, Volume,
    VolumeMount, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

// =============================================================================
// Storage Kind
// =============================================================================

/// Volume flavour requested by a storage entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Persistent,
    Ephemeral,
    HostMounted,
    Config,
    Secret,
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "persistent" | "pvc" => Ok(StorageKind::Persistent),
            "ephemeral" | "emptydir" => Ok(StorageKind::Ephemeral),
            "host-mounted" | "hostpath" => Ok(StorageKind::HostMounted),
            "config" | "configmap" => Ok(StorageKind::Config),
            "secret" => Ok(StorageKind::Secret),
            _ => Err(Error::UnknownStorageType(s.to_string())),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Persistent => write!(f, "persistent"),
            StorageKind::Ephemeral => write!(f, "ephemeral"),
            StorageKind::HostMounted => write!(f, "host-mounted"),
            StorageKind::Config => write!(f, "config"),
            StorageKind::Secret => write!(f, "secret"),
        }
    }
}

// =============================================================================
// Processor
// =============================================================================

/// Processor for the `storage` trait
#[derive(Debug, Default, Clone, Copy)]
pub struct StorageProcessor;

impl TraitProcessor for StorageProcessor {
    fn kind(&self) -> TraitKind {
        TraitKind::Storage
    }

    fn process(&self, ctx: &TraitContext<'_>) -> Result<Option<TraitResult>> {
        let TraitData::Storage(specs) = ctx.data else {
            return Err(ctx.type_mismatch(self.name(), TraitKind::Storage));
        };

        let mut result = TraitResult::new();
        let mut seen = HashSet::new();

        for (idx, spec) in specs.iter().enumerate() {
            let kind: StorageKind = spec.storage_type.parse()?;
            let name = volume_name(spec, ctx.target, idx)?;
            if !seen.insert(name.clone()) {
                debug!(volume = %name, container = ctx.target, "duplicate storage entry, skipping");
                continue;
            }

            let mount_path = if spec.mount_path.trim().is_empty() {
                format!("/mnt/{}", name)
            } else {
                spec.mount_path.trim().to_string()
            };

            let volume = match kind {
                StorageKind::Persistent if spec.create => {
                    result.add_object(claim_template(ctx, spec, &name)?);
                    claim_volume(&name, &name)
                }
                StorageKind::Persistent => {
                    let claim = names::first_non_empty(&[spec.claim_name.trim(), name.as_str()]);
                    claim_volume(&name, claim)
                }
                StorageKind::Ephemeral => Volume {
                    name: name.clone(),
                    empty_dir: Some(EmptyDirVolumeSource::default()),
                    ..Default::default()
                },
                StorageKind::HostMounted => Volume {
                    name: name.clone(),
                    host_path: Some(HostPathVolumeSource {
                        path: names::first_non_empty(&[spec.source_name.trim(), mount_path.as_str()])
                            .to_string(),
                        type_: None,
                    }),
                    ..Default::default()
                },
                StorageKind::Config => Volume {
                    name: name.clone(),
                    config_map: Some(ConfigMapVolumeSource {
                        name: Some(source_name(spec, &name)),
                        default_mode: Some(ctx.config().volume_default_mode),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                StorageKind::Secret => Volume {
                    name: name.clone(),
                    secret: Some(SecretVolumeSource {
                        secret_name: Some(source_name(spec, &name)),
                        default_mode: Some(ctx.config().volume_default_mode),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            };

            result.volumes.push(volume);
            result.add_mount(
                ctx.target,
                VolumeMount {
                    name: name.clone(),
                    mount_path,
                    sub_path: Some(spec.sub_path.trim().to_string()).filter(|s| !s.is_empty()),
                    read_only: spec.read_only.then_some(true),
                    ..Default::default()
                },
            );

            debug!(volume = %name, kind = %kind, container = ctx.target, "added storage volume");
        }

        Ok(Some(result))
    }
}

/// Normalized, validated volume name; unnamed entries get a positional one
fn volume_name(spec: &StorageSpec, target: &str, idx: usize) -> Result<String> {
    let name = if spec.name.trim().is_empty() {
        format!("{}-storage-{}", names::normalize(target), idx)
    } else {
        names::normalize(&spec.name)
    };

    names::validate_dns_label(&name).map_err(|reason| Error::InvalidVolumeName {
        name: spec.name.clone(),
        reason,
    })?;
    Ok(name)
}

fn source_name(spec: &StorageSpec, volume: &str) -> String {
    names::first_non_empty(&[spec.source_name.trim(), volume]).to_string()
}

fn claim_volume(name: &str, claim: &str) -> Volume {
    Volume {
        name: name.to_string(),
        persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
            claim_name: claim.to_string(),
            read_only: None,
        }),
        ..Default::default()
    }
}

fn claim_template(ctx: &TraitContext<'_>, spec: &StorageSpec, name: &str) -> Result<PersistentVolumeClaim> {
    let config = ctx.config();
    let size = names::first_non_empty(&[spec.size.trim(), config.default_pvc_size.as_str()]);
    let quantity = parse_quantity("size", size)?;

    Ok(PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(ctx.namespace().to_string()),
            annotations: Some(BTreeMap::from([(
                config.pvc_role_annotation.clone(),
                PVC_ROLE_TEMPLATE.to_string(),
            )])),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([("storage".to_string(), quantity)])),
                ..Default::default()
            }),
            storage_class_name: Some(spec.storage_class.trim().to_string())
                .filter(|s| !s.is_empty()),
            ..Default::default()
        }),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PVC_ROLE_ANNOTATION;
    use crate::engine::TraitEngine;
    use crate::k8s::{AuxiliaryObject, Workload};
    use crate::processors::testing::{component, deployment, process, stateful_set};
    use assert_matches::assert_matches;
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use serde_json::json;

    fn templates(objects: &[AuxiliaryObject]) -> Vec<&PersistentVolumeClaim> {
        objects
            .iter()
            .filter_map(|o| match o {
                AuxiliaryObject::PersistentVolumeClaim(pvc) => Some(pvc),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_storage_kind_parse() {
        assert_eq!("persistent".parse::<StorageKind>().unwrap(), StorageKind::Persistent);
        assert_eq!("hostPath".parse::<StorageKind>().unwrap(), StorageKind::HostMounted);
        assert_eq!("configMap".parse::<StorageKind>().unwrap(), StorageKind::Config);
        assert_matches!(
            "tape".parse::<StorageKind>(),
            Err(Error::UnknownStorageType(t)) if t == "tape"
        );
    }

    #[test]
    fn test_created_claim_shares_volume_and_mount_name() {
        let comp = component("db", json!({
            "storage": [{
                "name": "data",
                "type": "persistent",
                "mountPath": "/var/lib/data",
                "create": true,
                "size": "5Gi",
                "storageClass": "fast"
            }]
        }));
        let result = process(&StorageProcessor, &comp).unwrap().unwrap();

        let pvcs = templates(&result.additional_objects);
        assert_eq!(pvcs.len(), 1);
        let pvc = pvcs[0];
        let volume = &result.volumes[0];
        let mount = &result.volume_mounts["db"][0];

        assert_eq!(volume.name, "data");
        assert_eq!(mount.name, volume.name);
        assert_eq!(pvc.metadata.name.as_deref(), Some(volume.name.as_str()));
        assert_eq!(
            volume.persistent_volume_claim.as_ref().unwrap().claim_name,
            "data"
        );
        assert_eq!(
            pvc.metadata.annotations.as_ref().unwrap()[PVC_ROLE_ANNOTATION],
            PVC_ROLE_TEMPLATE
        );

        let spec = pvc.spec.as_ref().unwrap();
        assert_eq!(spec.storage_class_name.as_deref(), Some("fast"));
        assert_eq!(
            spec.resources.as_ref().unwrap().requests.as_ref().unwrap()["storage"],
            Quantity("5Gi".into())
        );
    }

    #[test]
    fn test_default_claim_size() {
        let comp = component("db", json!({
            "storage": [{ "name": "data", "type": "persistent", "mountPath": "/d", "create": true }]
        }));
        let result = process(&StorageProcessor, &comp).unwrap().unwrap();
        let pvc = templates(&result.additional_objects)[0];
        assert_eq!(
            pvc.spec.as_ref().unwrap().resources.as_ref().unwrap().requests.as_ref().unwrap()
                ["storage"],
            Quantity("1Gi".into())
        );
    }

    #[test]
    fn test_existing_claim_referenced_without_object() {
        let comp = component("db", json!({
            "storage": [
                { "name": "data", "type": "persistent", "mountPath": "/data", "claimName": "shared-pvc" },
                { "name": "logs", "type": "persistent", "mountPath": "/logs" }
            ]
        }));
        let result = process(&StorageProcessor, &comp).unwrap().unwrap();

        assert!(result.additional_objects.is_empty());
        let claims: Vec<_> = result
            .volumes
            .iter()
            .map(|v| v.persistent_volume_claim.as_ref().unwrap().claim_name.as_str())
            .collect();
        assert_eq!(claims, vec!["shared-pvc", "logs"]);
    }

    #[test]
    fn test_volume_sources_by_kind() {
        let comp = component("web", json!({
            "storage": [
                { "name": "cache", "type": "ephemeral", "mountPath": "/cache" },
                { "name": "host", "type": "host-mounted", "mountPath": "/host", "sourceName": "/var/log" },
                { "name": "conf", "type": "config", "mountPath": "/etc/app", "sourceName": "app-config" },
                { "name": "creds", "type": "secret", "mountPath": "/etc/creds", "readOnly": true }
            ]
        }));
        let result = process(&StorageProcessor, &comp).unwrap().unwrap();
        let v = &result.volumes;

        assert!(v[0].empty_dir.is_some());
        assert_eq!(v[1].host_path.as_ref().unwrap().path, "/var/log");
        let config_map = v[2].config_map.as_ref().unwrap();
        assert_eq!(config_map.name.as_deref(), Some("app-config"));
        assert_eq!(config_map.default_mode, Some(420));
        assert_eq!(v[3].secret.as_ref().unwrap().secret_name.as_deref(), Some("creds"));

        let mounts = &result.volume_mounts["web"];
        assert_eq!(mounts.len(), 4);
        assert_eq!(mounts[3].read_only, Some(true));
        assert_eq!(mounts[0].read_only, None);
    }

    #[test]
    fn test_names_normalized_and_derived() {
        let comp = component("Web", json!({
            "storage": [
                { "name": " Data ", "type": "ephemeral", "mountPath": "/data" },
                { "type": "ephemeral" }
            ]
        }));
        let result = process(&StorageProcessor, &comp).unwrap().unwrap();
        let names: Vec<_> = result.volumes.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["data", "web-storage-1"]);
        assert_eq!(result.volume_mounts["Web"][1].mount_path, "/mnt/web-storage-1");
    }

    #[test]
    fn test_duplicate_names_within_one_call() {
        let comp = component("web", json!({
            "storage": [
                { "name": "data", "type": "ephemeral", "mountPath": "/a" },
                { "name": "DATA", "type": "ephemeral", "mountPath": "/b" }
            ]
        }));
        let result = process(&StorageProcessor, &comp).unwrap().unwrap();
        assert_eq!(result.volumes.len(), 1);
        assert_eq!(result.volume_mounts["web"].len(), 1);
    }

    #[test]
    fn test_invalid_entries_rejected() {
        let unknown = component("web", json!({
            "storage": [{ "name": "data", "type": "tape", "mountPath": "/a" }]
        }));
        assert_matches!(
            process(&StorageProcessor, &unknown),
            Err(Error::UnknownStorageType(_))
        );

        let bad_name = component("web", json!({
            "storage": [{ "name": "data_dir", "type": "ephemeral", "mountPath": "/a" }]
        }));
        assert_matches!(
            process(&StorageProcessor, &bad_name),
            Err(Error::InvalidVolumeName { .. })
        );

        let bad_size = component("web", json!({
            "storage": [{ "name": "data", "type": "persistent", "create": true, "size": "lots" }]
        }));
        assert_matches!(
            process(&StorageProcessor, &bad_size),
            Err(Error::InvalidQuantity { .. })
        );
    }

    #[test]
    fn test_stateful_set_round_trip() {
        let comp = component("db", json!({
            "storage": [{
                "name": "data",
                "type": "persistent",
                "mountPath": "/var/lib/data",
                "create": true,
                "size": "5Gi"
            }]
        }));
        let mut workload = stateful_set("db");

        let objects = TraitEngine::builtin().unwrap().apply_traits(&comp, &mut workload).unwrap();
        assert!(objects.is_empty());

        let Workload::StatefulSet(sts) = &workload else {
            panic!("expected a StatefulSet");
        };
        let spec = sts.spec.as_ref().unwrap();
        let pod = spec.template.spec.as_ref().unwrap();

        let claim_volumes = pod
            .volumes
            .iter()
            .flatten()
            .filter(|v| v.persistent_volume_claim.is_some())
            .count();
        assert_eq!(claim_volumes, 0);

        let templates = spec.volume_claim_templates.as_ref().unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].metadata.name.as_deref(), Some("data"));

        let mounts = pod.containers[0].volume_mounts.as_ref().unwrap();
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].name, "data");
        assert_eq!(mounts[0].mount_path, "/var/lib/data");
    }

    #[test]
    fn test_stateful_set_keeps_volume_sharing_template_claim() {
        let comp = component("db", json!({
            "storage": [
                { "name": "data", "type": "persistent", "mountPath": "/data", "create": true },
                { "name": "shared", "type": "persistent", "mountPath": "/shared", "claimName": "data" }
            ]
        }));
        let mut workload = stateful_set("db");
        TraitEngine::builtin().unwrap().apply_traits(&comp, &mut workload).unwrap();

        let Workload::StatefulSet(sts) = &workload else {
            panic!("expected a StatefulSet");
        };
        let spec = sts.spec.as_ref().unwrap();
        let pod = spec.template.spec.as_ref().unwrap();

        let volumes: Vec<_> = pod.volumes.iter().flatten().map(|v| v.name.as_str()).collect();
        assert_eq!(volumes, vec!["shared"]);
        let templates: Vec<_> = spec
            .volume_claim_templates
            .iter()
            .flatten()
            .map(|t| t.metadata.name.as_deref().unwrap())
            .collect();
        assert_eq!(templates, vec!["data"]);

        // every mount resolves to a pod volume or a claim template
        for mount in pod.containers[0].volume_mounts.iter().flatten() {
            assert!(
                volumes.contains(&mount.name.as_str()) || templates.contains(&mount.name.as_str()),
                "mount {} has no backing volume",
                mount.name
            );
        }
    }

    #[test]
    fn test_deployment_keeps_ephemeral_volumes() {
        let comp = component("web", json!({
            "storage": [{ "name": "tmp", "type": "ephemeral", "mountPath": "/tmp" }]
        }));
        let mut workload = deployment("web");
        TraitEngine::builtin().unwrap().apply_traits(&comp, &mut workload).unwrap();

        let pod = workload.pod_spec().unwrap();
        assert_eq!(pod.volumes.as_ref().unwrap()[0].name, "tmp");
        assert_eq!(pod.containers[0].volume_mounts.as_ref().unwrap()[0].mount_path, "/tmp");
    }
}
