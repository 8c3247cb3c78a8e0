//! Trait results
//!
//! The uniform value every processor invocation produces. A result is
//! created fresh per invocation, merged by the aggregator and consumed once
//! by the materializer.

use crate::k8s::AuxiliaryObject;
use indexmap::IndexMap;
use k8s_openapi::api::core::v1::{
    Container, EnvFromSource, EnvVar, Probe, ResourceRequirements, Volume, VolumeMount,
};

/// Proposed workload changes from one processor (or one merged level)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraitResult {
    pub init_containers: Vec<Container>,
    pub containers: Vec<Container>,
    pub volumes: Vec<Volume>,

    /// Mounts keyed by container name
    pub volume_mounts: IndexMap<String, Vec<VolumeMount>>,
    /// Env vars keyed by container name
    pub env_vars: IndexMap<String, Vec<EnvVar>>,
    /// EnvFrom sources keyed by container name
    pub env_from: IndexMap<String, Vec<EnvFromSource>>,

    pub additional_objects: Vec<AuxiliaryObject>,

    pub service_account_name: Option<String>,
    pub automount_service_account_token: Option<bool>,
    pub liveness_probe: Option<Probe>,
    pub readiness_probe: Option<Probe>,
    pub startup_probe: Option<Probe>,
    pub resources: Option<ResourceRequirements>,
}

impl TraitResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mount(&mut self, container: &str, mount: VolumeMount) {
        self.volume_mounts
            .entry(container.to_string())
            .or_default()
            .push(mount);
    }

    pub fn add_env(&mut self, container: &str, env: EnvVar) {
        self.env_vars
            .entry(container.to_string())
            .or_default()
            .push(env);
    }

    pub fn add_env_from(&mut self, container: &str, source: EnvFromSource) {
        self.env_from
            .entry(container.to_string())
            .or_default()
            .push(source);
    }

    pub fn add_object(&mut self, object: impl Into<AuxiliaryObject>) {
        self.additional_objects.push(object.into());
    }

    /// Remove and return everything keyed to `container`
    pub fn take_container_fields(&mut self, container: &str) -> ContainerFields {
        ContainerFields {
            volume_mounts: self.volume_mounts.shift_remove(container).unwrap_or_default(),
            env_vars: self.env_vars.shift_remove(container).unwrap_or_default(),
            env_from: self.env_from.shift_remove(container).unwrap_or_default(),
        }
    }

    /// Names of all containers this result adds
    pub fn container_names(&self) -> impl Iterator<Item = &str> {
        self.init_containers
            .iter()
            .chain(self.containers.iter())
            .map(|c| c.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        *self == TraitResult::default()
    }
}

/// Per-container fields pulled out of a result for one container
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerFields {
    pub volume_mounts: Vec<VolumeMount>,
    pub env_vars: Vec<EnvVar>,
    pub env_from: Vec<EnvFromSource>,
}

impl ContainerFields {
    /// Append the fields to a container, skipping mounts whose path is taken
    pub fn apply_to(self, container: &mut Container) {
        if !self.volume_mounts.is_empty() {
            let mounts = container.volume_mounts.get_or_insert_with(Vec::new);
            for mount in self.volume_mounts {
                if !mounts.iter().any(|m| m.mount_path == mount.mount_path) {
                    mounts.push(mount);
                }
            }
        }
        if !self.env_vars.is_empty() {
            container
                .env
                .get_or_insert_with(Vec::new)
                .extend(self.env_vars);
        }
        if !self.env_from.is_empty() {
            container
                .env_from
                .get_or_insert_with(Vec::new)
                .extend(self.env_from);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mount(name: &str, path: &str) -> VolumeMount {
        VolumeMount {
            name: name.into(),
            mount_path: path.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_keyed_fields() {
        let mut result = TraitResult::new();
        assert!(result.is_empty());

        result.add_mount("api", mount("data", "/data"));
        result.add_mount("api", mount("logs", "/logs"));
        result.add_env("agent", EnvVar {
            name: "MODE".into(),
            value: Some("tail".into()),
            ..Default::default()
        });

        assert_eq!(result.volume_mounts["api"].len(), 2);
        assert!(!result.is_empty());

        let fields = result.take_container_fields("agent");
        assert_eq!(fields.env_vars.len(), 1);
        assert!(!result.env_vars.contains_key("agent"));
        assert!(result.volume_mounts.contains_key("api"));
    }

    #[test]
    fn test_apply_to_skips_taken_mount_paths() {
        let mut container = Container {
            name: "api".into(),
            volume_mounts: Some(vec![mount("existing", "/data")]),
            ..Default::default()
        };

        let fields = ContainerFields {
            volume_mounts: vec![mount("data", "/data"), mount("cache", "/cache")],
            ..Default::default()
        };
        fields.apply_to(&mut container);

        let mounts = container.volume_mounts.unwrap();
        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[0].name, "existing");
        assert_eq!(mounts[1].name, "cache");
        assert!(container.env.is_none());
    }
}
