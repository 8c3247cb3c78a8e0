//! Auxiliary objects
//!
//! Free-standing Kubernetes objects produced alongside the workload mutation
//! (RBAC, claims, secrets, ingresses). They are handed to the caller for
//! apply; the engine never talks to a cluster.

use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Secret, ServiceAccount};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};
use serde::Serialize;

/// Identity used to de-duplicate auxiliary objects
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}/{}", self.kind, self.name)
        } else {
            write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
        }
    }
}

/// Auxiliary object emitted by a trait processor
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AuxiliaryObject {
    ServiceAccount(ServiceAccount),
    Role(Role),
    ClusterRole(ClusterRole),
    RoleBinding(RoleBinding),
    ClusterRoleBinding(ClusterRoleBinding),
    PersistentVolumeClaim(PersistentVolumeClaim),
    Secret(Secret),
    Ingress(Ingress),
}

macro_rules! with_object {
    ($self:expr, $obj:ident => $body:expr) => {
        match $self {
            AuxiliaryObject::ServiceAccount($obj) => $body,
            AuxiliaryObject::Role($obj) => $body,
            AuxiliaryObject::ClusterRole($obj) => $body,
            AuxiliaryObject::RoleBinding($obj) => $body,
            AuxiliaryObject::ClusterRoleBinding($obj) => $body,
            AuxiliaryObject::PersistentVolumeClaim($obj) => $body,
            AuxiliaryObject::Secret($obj) => $body,
            AuxiliaryObject::Ingress($obj) => $body,
        }
    };
}

impl AuxiliaryObject {
    /// Kubernetes kind
    pub fn kind(&self) -> String {
        with_object!(self, obj => resource_kind(obj))
    }

    /// Object name, or an empty string when unset
    pub fn name(&self) -> String {
        with_object!(self, obj => obj.name_any())
    }

    /// Object namespace, or an empty string for cluster-scoped objects
    pub fn namespace(&self) -> String {
        with_object!(self, obj => obj.namespace().unwrap_or_default())
    }

    /// Object metadata
    pub fn metadata(&self) -> &ObjectMeta {
        with_object!(self, obj => obj.meta())
    }

    /// Mutable object metadata
    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        with_object!(self, obj => obj.meta_mut())
    }

    /// De-duplication key: (kind, namespace, name)
    pub fn key(&self) -> ObjectKey {
        ObjectKey {
            kind: self.kind(),
            namespace: self.namespace(),
            name: self.name(),
        }
    }

    /// Read an annotation value
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata()
            .annotations
            .as_ref()
            .and_then(|a| a.get(key))
            .map(String::as_str)
    }

    /// Serialize to a native manifest value
    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

fn resource_kind<K: Resource<DynamicType = ()>>(_: &K) -> String {
    K::kind(&()).into_owned()
}

macro_rules! impl_from_object {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for AuxiliaryObject {
                fn from(obj: $variant) -> Self {
                    AuxiliaryObject::$variant(obj)
                }
            }
        )*
    };
}

impl_from_object!(
    ServiceAccount,
    Role,
    ClusterRole,
    RoleBinding,
    ClusterRoleBinding,
    PersistentVolumeClaim,
    Secret,
    Ingress,
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn meta(name: &str, namespace: Option<&str>) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: namespace.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_object_identity() {
        let sa = AuxiliaryObject::from(ServiceAccount {
            metadata: meta("backend-sa", Some("demo")),
            ..Default::default()
        });
        assert_eq!(sa.kind(), "ServiceAccount");
        assert_eq!(sa.key().to_string(), "ServiceAccount/demo/backend-sa");

        let role = AuxiliaryObject::from(ClusterRole {
            metadata: meta("reader", None),
            ..Default::default()
        });
        assert_eq!(role.namespace(), "");
        assert_eq!(role.key().to_string(), "ClusterRole/reader");
    }

    #[test]
    fn test_same_name_different_kind_keys_differ() {
        let role = AuxiliaryObject::from(Role {
            metadata: meta("x", Some("ns")),
            ..Default::default()
        });
        let binding = AuxiliaryObject::from(RoleBinding {
            metadata: meta("x", Some("ns")),
            ..Default::default()
        });
        assert_ne!(role.key(), binding.key());
    }

    #[test]
    fn test_annotation_lookup_and_manifest() {
        let mut pvc = AuxiliaryObject::from(PersistentVolumeClaim {
            metadata: meta("data", Some("db")),
            ..Default::default()
        });
        assert!(pvc.annotation("role").is_none());

        pvc.metadata_mut().annotations =
            Some(BTreeMap::from([("role".to_string(), "template".to_string())]));
        assert_eq!(pvc.annotation("role"), Some("template"));

        let value = pvc.to_value().unwrap();
        assert_eq!(value["kind"], "PersistentVolumeClaim");
        assert_eq!(value["apiVersion"], "v1");
    }
}
