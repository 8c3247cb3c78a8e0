//! Result aggregation
//!
//! Merge policy over an ordered list of results:
//! - containers and init containers are concatenated
//! - volumes are unique by name, first occurrence wins
//! - auxiliary objects are unique by (kind, namespace, name), first wins
//! - mounts are keyed by container and unique by mount path
//! - env vars and envFrom sources are concatenated per container
//! - singletons (probes, resources, service account) are last non-empty wins

use super::result::TraitResult;
use std::collections::HashSet;
use tracing::debug;

/// Merge results in order into one
pub fn aggregate(results: impl IntoIterator<Item = TraitResult>) -> TraitResult {
    let mut merged = TraitResult::default();
    for result in results {
        merged.merge(result);
    }
    merged
}

impl TraitResult {
    /// Merge a later result into this one
    pub fn merge(&mut self, other: TraitResult) {
        self.init_containers.extend(other.init_containers);
        self.containers.extend(other.containers);

        let mut volume_names: HashSet<String> =
            self.volumes.iter().map(|v| v.name.clone()).collect();
        for volume in other.volumes {
            if volume_names.insert(volume.name.clone()) {
                self.volumes.push(volume);
            } else {
                debug!(volume = %volume.name, "dropping duplicate volume");
            }
        }

        let mut object_keys: HashSet<_> =
            self.additional_objects.iter().map(|o| o.key()).collect();
        for object in other.additional_objects {
            if object_keys.insert(object.key()) {
                self.additional_objects.push(object);
            } else {
                debug!(object = %object.key(), "dropping duplicate object");
            }
        }

        for (container, mounts) in other.volume_mounts {
            let existing = self.volume_mounts.entry(container).or_default();
            for mount in mounts {
                if !existing.iter().any(|m| m.mount_path == mount.mount_path) {
                    existing.push(mount);
                }
            }
        }
        for (container, env) in other.env_vars {
            self.env_vars.entry(container).or_default().extend(env);
        }
        for (container, sources) in other.env_from {
            self.env_from.entry(container).or_default().extend(sources);
        }

        if other.service_account_name.as_deref().is_some_and(|s| !s.is_empty()) {
            self.service_account_name = other.service_account_name;
        }
        if other.automount_service_account_token.is_some() {
            self.automount_service_account_token = other.automount_service_account_token;
        }
        if other.liveness_probe.is_some() {
            self.liveness_probe = other.liveness_probe;
        }
        if other.readiness_probe.is_some() {
            self.readiness_probe = other.readiness_probe;
        }
        if other.startup_probe.is_some() {
            self.startup_probe = other.startup_probe;
        }
        if other.resources.is_some() {
            self.resources = other.resources;
        }
    }
}
