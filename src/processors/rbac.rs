//! RBAC trait
//!
//! Each policy yields a ServiceAccount plus a Role and RoleBinding, or a
//! ClusterRole and ClusterRoleBinding when cluster scoped. The first
//! policy's ServiceAccount is bound to the pod.

use crate::domain::{RbacPolicySpec, RbacRuleSpec, TraitData, TraitKind};
use crate::engine::{TraitContext, TraitProcessor, TraitResult};
use crate::error::{Error, Result};
use crate::k8s::labels::non_empty;
use crate::k8s::names;
use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{
    ClusterRole, ClusterRoleBinding, PolicyRule, Role, RoleBinding, RoleRef, Subject,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use tracing::debug;

const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

/// Processor for the `rbac` trait
#[derive(Debug, Default, Clone, Copy)]
pub struct RbacProcessor;

impl TraitProcessor for RbacProcessor {
    fn kind(&self) -> TraitKind {
        TraitKind::Rbac
    }

    fn process(&self, ctx: &TraitContext<'_>) -> Result<Option<TraitResult>> {
        let TraitData::Rbac(policies) = ctx.data else {
            return Err(ctx.type_mismatch(self.name(), TraitKind::Rbac));
        };

        let mut result = TraitResult::new();
        for (idx, policy) in policies.iter().enumerate() {
            let namespace = names::first_non_empty(&[policy.namespace.trim(), ctx.namespace()]);
            let sa_name = service_account_name(policy, ctx.target, idx);
            let role_name = derived_name(&policy.role_name, &sa_name, "role");
            let binding_name = derived_name(&policy.binding_name, &sa_name, "binding");
            let rules = policy_rules(&policy.rules, &sa_name)?;

            result.add_object(ServiceAccount {
                metadata: ObjectMeta {
                    name: Some(sa_name.clone()),
                    namespace: Some(namespace.to_string()),
                    labels: copy_map(&policy.service_account_labels),
                    annotations: copy_map(&policy.service_account_annotations),
                    ..Default::default()
                },
                automount_service_account_token: policy.automount_service_account_token,
                ..Default::default()
            });

            if result.service_account_name.is_none() {
                result.service_account_name = Some(sa_name.clone());
            }
            if result.automount_service_account_token.is_none() {
                result.automount_service_account_token = policy.automount_service_account_token;
            }

            let subjects = Some(vec![Subject {
                api_group: None,
                kind: "ServiceAccount".to_string(),
                name: sa_name.clone(),
                namespace: Some(namespace.to_string()),
            }]);

            if policy.cluster_scope {
                result.add_object(ClusterRole {
                    metadata: ObjectMeta {
                        name: Some(role_name.clone()),
                        labels: copy_map(&policy.role_labels),
                        ..Default::default()
                    },
                    rules: Some(rules),
                    ..Default::default()
                });
                result.add_object(ClusterRoleBinding {
                    metadata: ObjectMeta {
                        name: Some(binding_name),
                        labels: copy_map(&policy.binding_labels),
                        ..Default::default()
                    },
                    subjects,
                    role_ref: role_ref("ClusterRole", &role_name),
                });
            } else {
                result.add_object(Role {
                    metadata: ObjectMeta {
                        name: Some(role_name.clone()),
                        namespace: Some(namespace.to_string()),
                        labels: copy_map(&policy.role_labels),
                        ..Default::default()
                    },
                    rules: Some(rules),
                });
                result.add_object(RoleBinding {
                    metadata: ObjectMeta {
                        name: Some(binding_name),
                        namespace: Some(namespace.to_string()),
                        labels: copy_map(&policy.binding_labels),
                        ..Default::default()
                    },
                    subjects,
                    role_ref: role_ref("Role", &role_name),
                });
            }

            debug!(
                service_account = %sa_name,
                role = %role_name,
                cluster_scope = policy.cluster_scope,
                "added rbac policy"
            );
        }

        Ok(Some(result))
    }
}

/// Explicit name normalized; otherwise `{target}-sa`, `{target}-2-sa`, ...
fn service_account_name(policy: &RbacPolicySpec, target: &str, idx: usize) -> String {
    if !policy.service_account.trim().is_empty() {
        return names::normalize(&policy.service_account);
    }

    let base = names::normalize(target);
    let base = if base.is_empty() { "service" } else { base.as_str() };
    if idx == 0 {
        format!("{}-sa", base)
    } else {
        format!("{}-{}-sa", base, idx + 1)
    }
}

fn derived_name(explicit: &str, sa_name: &str, suffix: &str) -> String {
    if explicit.trim().is_empty() {
        format!("{}-{}", sa_name, suffix)
    } else {
        names::normalize(explicit)
    }
}

fn policy_rules(rules: &[RbacRuleSpec], sa_name: &str) -> Result<Vec<PolicyRule>> {
    let optional = |values: &[String]| (!values.is_empty()).then(|| values.to_vec());

    rules
        .iter()
        .enumerate()
        .map(|(i, rule)| {
            if rule.verbs.is_empty() {
                return Err(Error::MissingVerbs {
                    service_account: sa_name.to_string(),
                    rule: i,
                });
            }
            Ok(PolicyRule {
                api_groups: optional(&rule.api_groups),
                resources: optional(&rule.resources),
                resource_names: optional(&rule.resource_names),
                non_resource_urls: optional(&rule.non_resource_urls),
                verbs: rule.verbs.clone(),
            })
        })
        .collect()
}

fn role_ref(kind: &str, name: &str) -> RoleRef {
    RoleRef {
        api_group: RBAC_API_GROUP.to_string(),
        kind: kind.to_string(),
        name: name.to_string(),
    }
}

fn copy_map(map: &BTreeMap<String, String>) -> Option<BTreeMap<String, String>> {
    non_empty(map.clone())
}
