//! Target workloads
//!
//! Traits are materialized onto the pod template of one of three workload
//! kinds. Anything else is rejected at the boundary.

use crate::error::{Error, Result};
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
use kube::ResourceExt;
use serde::Serialize;

/// A workload whose pod template receives trait mutations
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Workload {
    Deployment(Deployment),
    StatefulSet(StatefulSet),
    DaemonSet(DaemonSet),
}

impl Workload {
    /// Kubernetes kind of the workload
    pub fn kind(&self) -> &'static str {
        match self {
            Workload::Deployment(_) => "Deployment",
            Workload::StatefulSet(_) => "StatefulSet",
            Workload::DaemonSet(_) => "DaemonSet",
        }
    }

    /// Object name, or an empty string when unset
    pub fn name(&self) -> String {
        match self {
            Workload::Deployment(w) => w.name_any(),
            Workload::StatefulSet(w) => w.name_any(),
            Workload::DaemonSet(w) => w.name_any(),
        }
    }

    /// Pod template, if the workload has a spec
    pub fn pod_template(&self) -> Option<&PodTemplateSpec> {
        match self {
            Workload::Deployment(w) => w.spec.as_ref().map(|s| &s.template),
            Workload::StatefulSet(w) => w.spec.as_ref().map(|s| &s.template),
            Workload::DaemonSet(w) => w.spec.as_ref().map(|s| &s.template),
        }
    }

    /// Pod spec of the template, if present
    pub fn pod_spec(&self) -> Option<&PodSpec> {
        self.pod_template().and_then(|t| t.spec.as_ref())
    }

    /// Mutable pod spec of the template, if present
    pub fn pod_spec_mut(&mut self) -> Option<&mut PodSpec> {
        let template = match self {
            Workload::Deployment(w) => w.spec.as_mut().map(|s| &mut s.template),
            Workload::StatefulSet(w) => w.spec.as_mut().map(|s| &mut s.template),
            Workload::DaemonSet(w) => w.spec.as_mut().map(|s| &mut s.template),
        };
        template.and_then(|t| t.spec.as_mut())
    }

    /// Find an application container by name
    pub fn container(&self, name: &str) -> Option<&Container> {
        self.pod_spec()
            .and_then(|spec| spec.containers.iter().find(|c| c.name == name))
    }

    /// Borrow the StatefulSet, if that is what this workload is
    pub fn as_stateful_set_mut(&mut self) -> Option<&mut StatefulSet> {
        match self {
            Workload::StatefulSet(sts) => Some(sts),
            _ => None,
        }
    }

    /// Serialize to a native manifest value
    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl TryFrom<serde_json::Value> for Workload {
    type Error = Error;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        let kind = value
            .get("kind")
            .and_then(|k| k.as_str())
            .unwrap_or_default()
            .to_string();

        match kind.as_str() {
            "Deployment" => Ok(Workload::Deployment(serde_json::from_value(value)?)),
            "StatefulSet" => Ok(Workload::StatefulSet(serde_json::from_value(value)?)),
            "DaemonSet" => Ok(Workload::DaemonSet(serde_json::from_value(value)?)),
            "" => Err(Error::UnsupportedWorkload("<missing kind>".into())),
            other => Err(Error::UnsupportedWorkload(other.to_string())),
        }
    }
}

impl From<Deployment> for Workload {
    fn from(w: Deployment) -> Self {
        Workload::Deployment(w)
    }
}

impl From<StatefulSet> for Workload {
    fn from(w: StatefulSet) -> Self {
        Workload::StatefulSet(w)
    }
}

impl From<DaemonSet> for Workload {
    fn from(w: DaemonSet) -> Self {
        Workload::DaemonSet(w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn manifest(kind: &str) -> serde_json::Value {
        let api_version = if kind == "Job" { "batch/v1" } else { "apps/v1" };
        json!({
            "apiVersion": api_version,
            "kind": kind,
            "metadata": { "name": "web", "namespace": "shop" },
            "spec": {
                "serviceName": "web",
                "selector": { "matchLabels": { "app": "web" } },
                "template": {
                    "spec": { "containers": [{ "name": "web", "image": "nginx:latest" }] }
                }
            }
        })
    }

    #[test]
    fn test_supported_kinds() {
        for kind in ["Deployment", "StatefulSet", "DaemonSet"] {
            let workload = Workload::try_from(manifest(kind)).unwrap();
            assert_eq!(workload.kind(), kind);
            assert_eq!(workload.name(), "web");
            assert!(workload.container("web").is_some());
            assert!(workload.container("other").is_none());
        }
    }

    #[test]
    fn test_other_kinds_rejected() {
        assert_matches!(
            Workload::try_from(manifest("Job")),
            Err(Error::UnsupportedWorkload(kind)) if kind == "Job"
        );
        assert_matches!(
            Workload::try_from(json!({ "metadata": {} })),
            Err(Error::UnsupportedWorkload(_))
        );
    }

    #[test]
    fn test_round_trip_keeps_type_meta() {
        let workload = Workload::try_from(manifest("StatefulSet")).unwrap();
        let value = workload.to_value().unwrap();
        assert_eq!(value["kind"], "StatefulSet");
        assert_eq!(value["apiVersion"], "apps/v1");
    }

    #[test]
    fn test_missing_spec_has_no_pod_spec() {
        let mut workload = Workload::from(Deployment::default());
        assert!(workload.pod_spec().is_none());
        assert!(workload.pod_spec_mut().is_none());
        assert!(workload.as_stateful_set_mut().is_none());
    }
}
