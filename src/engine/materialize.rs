//! Workload materializer
//!
//! Applies one fully aggregated [`TraitResult`] to the workload's pod
//! template and returns the auxiliary objects that remain free-standing.

use super::result::TraitResult;
use crate::config::{EngineConfig, PVC_ROLE_TEMPLATE};
use crate::domain::Component;
use crate::error::{Error, Result};
use crate::k8s::{AuxiliaryObject, Workload};
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::{Container, PersistentVolumeClaim, PodSpec, ResourceRequirements};
use tracing::{debug, warn};

/// Mutate `workload` with `result` and return the remaining objects
pub fn materialize(
    mut result: TraitResult,
    component: &Component,
    workload: &mut Workload,
    config: &EngineConfig,
) -> Result<Vec<AuxiliaryObject>> {
    let main = component.name.as_str();
    if workload.container(main).is_none() {
        return Err(Error::MainContainerNotFound {
            name: main.to_string(),
        });
    }
    let kind = workload.kind();

    {
        let pod = workload
            .pod_spec_mut()
            .ok_or_else(|| Error::MainContainerNotFound {
                name: main.to_string(),
            })?;

        append_containers_and_volumes(pod, &mut result);
        bind_service_account(pod, &result, main);

        let main_container = find_container(pod, main).ok_or_else(|| {
            Error::MainContainerNotFound {
                name: main.to_string(),
            }
        })?;
        if let Some(resources) = result.resources.take() {
            let existing = main_container.resources.take();
            main_container.resources = Some(merge_resources(existing, resources));
        }
        if let Some(probe) = result.liveness_probe.take() {
            main_container.liveness_probe = Some(probe);
        }
        if let Some(probe) = result.readiness_probe.take() {
            main_container.readiness_probe = Some(probe);
        }
        if let Some(probe) = result.startup_probe.take() {
            main_container.startup_probe = Some(probe);
        }

        apply_container_fields(pod, &mut result);
    }

    let mut objects = Vec::with_capacity(result.additional_objects.len());
    for object in result.additional_objects {
        match object {
            AuxiliaryObject::PersistentVolumeClaim(pvc) if is_template(&pvc, config) => {
                match workload.as_stateful_set_mut() {
                    Some(sts) => bind_claim_template(sts, pvc),
                    None => warn!(
                        component = main,
                        workload = kind,
                        claim = pvc.metadata.name.as_deref().unwrap_or_default(),
                        "volume claim templates require a StatefulSet, dropping claim"
                    ),
                }
            }
            other => objects.push(other),
        }
    }

    Ok(objects)
}

fn append_containers_and_volumes(pod: &mut PodSpec, result: &mut TraitResult) {
    if !result.init_containers.is_empty() {
        pod.init_containers
            .get_or_insert_with(Vec::new)
            .append(&mut result.init_containers);
    }
    pod.containers.append(&mut result.containers);

    if result.volumes.is_empty() {
        return;
    }
    let volumes = pod.volumes.get_or_insert_with(Vec::new);
    for volume in result.volumes.drain(..) {
        if volumes.iter().any(|v| v.name == volume.name) {
            warn!(volume = %volume.name, "volume already defined on workload, keeping existing");
            continue;
        }
        volumes.push(volume);
    }
}

fn bind_service_account(pod: &mut PodSpec, result: &TraitResult, component: &str) {
    if let Some(requested) = result.service_account_name.as_deref() {
        match pod.service_account_name.as_deref() {
            None | Some("") => pod.service_account_name = Some(requested.to_string()),
            Some(existing) if existing != requested => warn!(
                component,
                existing,
                requested,
                "workload already sets a service account, keeping it"
            ),
            Some(_) => {}
        }
    }

    if let Some(requested) = result.automount_service_account_token {
        match pod.automount_service_account_token {
            None => pod.automount_service_account_token = Some(requested),
            Some(existing) if existing != requested => warn!(
                component,
                existing,
                requested,
                "workload already sets automountServiceAccountToken, keeping it"
            ),
            Some(_) => {}
        }
    }
}

fn find_container<'p>(pod: &'p mut PodSpec, name: &str) -> Option<&'p mut Container> {
    pod.containers
        .iter_mut()
        .chain(pod.init_containers.iter_mut().flatten())
        .find(|c| c.name == name)
}

fn apply_container_fields(pod: &mut PodSpec, result: &mut TraitResult) {
    let mut names: Vec<String> = result.volume_mounts.keys().cloned().collect();
    for name in result.env_vars.keys().chain(result.env_from.keys()) {
        if !names.contains(name) {
            names.push(name.clone());
        }
    }

    for name in names {
        let fields = result.take_container_fields(&name);
        match find_container(pod, &name) {
            Some(container) => fields.apply_to(container),
            None => warn!(
                container = %name,
                "container not found on workload, skipping mounts and env"
            ),
        }
    }
}

/// Overlay trait limits onto whatever the workload already declares
fn merge_resources(
    existing: Option<ResourceRequirements>,
    requested: ResourceRequirements,
) -> ResourceRequirements {
    let mut merged = existing.unwrap_or_default();
    if let Some(limits) = requested.limits {
        merged.limits.get_or_insert_with(Default::default).extend(limits);
    }
    if let Some(requests) = requested.requests {
        merged.requests.get_or_insert_with(Default::default).extend(requests);
    }
    merged
}

fn is_template(pvc: &PersistentVolumeClaim, config: &EngineConfig) -> bool {
    pvc.metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(&config.pvc_role_annotation))
        .is_some_and(|role| role == PVC_ROLE_TEMPLATE)
}

fn bind_claim_template(sts: &mut StatefulSet, mut pvc: PersistentVolumeClaim) {
    let Some(spec) = sts.spec.as_mut() else {
        return;
    };
    let name = pvc.metadata.name.clone().unwrap_or_default();
    pvc.metadata.namespace = None;

    // The pod volume named after the template would shadow the per-replica
    // claim. Other volumes pointing at a claim of the same name are kept.
    if let Some(pod) = spec.template.spec.as_mut() {
        if let Some(volumes) = pod.volumes.as_mut() {
            volumes.retain(|v| v.name != name || v.persistent_volume_claim.is_none());
        }
        if pod.volumes.as_ref().is_some_and(Vec::is_empty) {
            pod.volumes = None;
        }
    }

    let templates = spec.volume_claim_templates.get_or_insert_with(Vec::new);
    if templates
        .iter()
        .any(|t| t.metadata.name.as_deref() == Some(name.as_str()))
    {
        debug!(claim = %name, "volume claim template already present");
        return;
    }
    templates.push(pvc);
}
