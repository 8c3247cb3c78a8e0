//! Trait schema
//!
//! Typed form of the trait payload attached to a component. The aggregate is
//! recursive: init and sidecar entries carry their own nested [`Traits`].
//!
//! Dispatch never reflects over this struct. [`TraitKind`] enumerates the
//! dispatchable kinds and [`Traits::data`] is the compiled accessor table
//! that narrows the aggregate to one kind's data.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Aggregate
// =============================================================================

/// All traits attachable to a component (or to a nested init/sidecar entry)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Traits {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub init: Vec<InitSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub storage: Vec<StorageSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secret: Vec<SecretSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sidecar: Vec<SidecarSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env_from: Vec<EnvFromSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub envs: Vec<EnvSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub probes: Vec<ProbeSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rbac: Vec<RbacPolicySpec>,

    /// `null` entries are kept so they can be reported as missing specs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingress: Vec<Option<IngressSpec>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourcesSpec>,
}

impl Traits {
    /// True when no trait kind carries data
    pub fn is_empty(&self) -> bool {
        TraitKind::ALL.iter().all(|kind| self.data(*kind).is_none())
    }

    /// Narrow the aggregate to the data of one trait kind.
    ///
    /// Returns `None` when that kind is absent or empty.
    pub fn data(&self, kind: TraitKind) -> Option<TraitData<'_>> {
        fn slice<T>(items: &[T]) -> Option<&[T]> {
            (!items.is_empty()).then_some(items)
        }

        match kind {
            TraitKind::Storage => slice(&self.storage).map(TraitData::Storage),
            TraitKind::Secret => slice(&self.secret).map(TraitData::Secret),
            TraitKind::EnvFrom => slice(&self.env_from).map(TraitData::EnvFrom),
            TraitKind::Envs => slice(&self.envs).map(TraitData::Envs),
            TraitKind::Resources => self
                .resources
                .as_ref()
                .filter(|r| !r.is_empty())
                .map(TraitData::Resources),
            TraitKind::Probes => slice(&self.probes).map(TraitData::Probes),
            TraitKind::Rbac => slice(&self.rbac).map(TraitData::Rbac),
            TraitKind::Init => slice(&self.init).map(TraitData::Init),
            TraitKind::Sidecar => slice(&self.sidecar).map(TraitData::Sidecar),
            TraitKind::Ingress => slice(&self.ingress).map(TraitData::Ingress),
        }
    }
}

// =============================================================================
// Trait Kinds
// =============================================================================

/// Dispatchable trait kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TraitKind {
    Storage,
    Secret,
    EnvFrom,
    Envs,
    Resources,
    Probes,
    Rbac,
    Init,
    Sidecar,
    Ingress,
}

impl TraitKind {
    /// Every kind, in declaration order
    pub const ALL: [TraitKind; 10] = [
        TraitKind::Storage,
        TraitKind::Secret,
        TraitKind::EnvFrom,
        TraitKind::Envs,
        TraitKind::Resources,
        TraitKind::Probes,
        TraitKind::Rbac,
        TraitKind::Init,
        TraitKind::Sidecar,
        TraitKind::Ingress,
    ];

    /// Canonical name, matching the payload field
    pub fn as_str(&self) -> &'static str {
        match self {
            TraitKind::Storage => "storage",
            TraitKind::Secret => "secret",
            TraitKind::EnvFrom => "envFrom",
            TraitKind::Envs => "envs",
            TraitKind::Resources => "resources",
            TraitKind::Probes => "probes",
            TraitKind::Rbac => "rbac",
            TraitKind::Init => "init",
            TraitKind::Sidecar => "sidecar",
            TraitKind::Ingress => "ingress",
        }
    }
}

impl fmt::Display for TraitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TraitKind {
    type Err = String;

    /// Case-insensitive, accepting the singular/plural aliases users write
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "storage" | "volumes" => Ok(TraitKind::Storage),
            "secret" | "secrets" => Ok(TraitKind::Secret),
            "envfrom" => Ok(TraitKind::EnvFrom),
            "envs" | "env" => Ok(TraitKind::Envs),
            "resources" | "resource" => Ok(TraitKind::Resources),
            "probes" | "probe" => Ok(TraitKind::Probes),
            "rbac" => Ok(TraitKind::Rbac),
            "init" | "initcontainers" => Ok(TraitKind::Init),
            "sidecar" | "sidecars" => Ok(TraitKind::Sidecar),
            "ingress" | "ingresses" => Ok(TraitKind::Ingress),
            other => Err(format!("unknown trait kind: {other}")),
        }
    }
}

/// One trait kind's data, borrowed from the aggregate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TraitData<'a> {
    Storage(&'a [StorageSpec]),
    Secret(&'a [SecretSpec]),
    EnvFrom(&'a [EnvFromSpec]),
    Envs(&'a [EnvSpec]),
    Resources(&'a ResourcesSpec),
    Probes(&'a [ProbeSpec]),
    Rbac(&'a [RbacPolicySpec]),
    Init(&'a [InitSpec]),
    Sidecar(&'a [SidecarSpec]),
    Ingress(&'a [Option<IngressSpec>]),
}

impl TraitData<'_> {
    /// Kind of the carried data
    pub fn kind(&self) -> TraitKind {
        match self {
            TraitData::Storage(_) => TraitKind::Storage,
            TraitData::Secret(_) => TraitKind::Secret,
            TraitData::EnvFrom(_) => TraitKind::EnvFrom,
            TraitData::Envs(_) => TraitKind::Envs,
            TraitData::Resources(_) => TraitKind::Resources,
            TraitData::Probes(_) => TraitKind::Probes,
            TraitData::Rbac(_) => TraitKind::Rbac,
            TraitData::Init(_) => TraitKind::Init,
            TraitData::Sidecar(_) => TraitKind::Sidecar,
            TraitData::Ingress(_) => TraitKind::Ingress,
        }
    }
}

// =============================================================================
// Storage / Secret
// =============================================================================

/// A volume mounted into the target container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageSpec {
    #[serde(default)]
    pub name: String,

    /// persistent, ephemeral, host-mounted, config or secret
    #[serde(rename = "type", default)]
    pub storage_type: String,

    #[serde(default)]
    pub mount_path: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sub_path: String,

    #[serde(default)]
    pub read_only: bool,

    /// ConfigMap/Secret name, or host path for host-mounted volumes
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_name: String,

    /// Create a claim on deploy instead of referencing an existing one
    #[serde(default)]
    pub create: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub size: String,

    /// Existing claim to reference; defaults to the volume name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub claim_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub storage_class: String,
}

/// Secret data generated for the component and mounted read-only
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SecretSpec {
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

// =============================================================================
// Init / Sidecar
// =============================================================================

/// Init container with its own nested traits
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InitSpec {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub properties: InitProperties,

    #[serde(default)]
    pub traits: Traits,
}

/// Container properties of an init entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InitProperties {
    #[serde(default)]
    pub image: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

/// Sidecar container with its own nested traits
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SidecarSpec {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub image: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub traits: Traits,
}

// =============================================================================
// Environment
// =============================================================================

/// Import every key of a ConfigMap or Secret
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvFromSpec {
    /// configMap (alias config) or secret
    #[serde(rename = "type", default)]
    pub source_type: String,

    #[serde(default)]
    pub source_name: String,
}

/// A single environment variable
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvSpec {
    pub name: String,

    #[serde(default)]
    pub value_from: ValueSource,
}

/// Source of an environment variable value; exactly one field must be set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValueSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#static: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<KeySelector>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<KeySelector>,

    /// Downward API field path, e.g. `metadata.name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ValueSource {
    /// Number of value sources set
    pub fn count(&self) -> usize {
        [
            self.r#static.is_some(),
            self.secret.is_some(),
            self.config.is_some(),
            self.field.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }
}

/// Key inside a named ConfigMap or Secret
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct KeySelector {
    pub name: String,
    pub key: String,
}

// =============================================================================
// Probes / Resources
// =============================================================================

/// Health check for the target container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProbeSpec {
    /// liveness, readiness or startup
    #[serde(rename = "type", default)]
    pub probe_type: String,

    #[serde(default)]
    pub initial_delay_seconds: i32,

    #[serde(default)]
    pub period_seconds: i32,

    #[serde(default)]
    pub timeout_seconds: i32,

    #[serde(default)]
    pub failure_threshold: i32,

    #[serde(default)]
    pub success_threshold: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<ExecProbe>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_get: Option<HttpGetProbe>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_socket: Option<TcpSocketProbe>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExecProbe {
    #[serde(default)]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HttpGetProbe {
    #[serde(default)]
    pub path: String,

    pub port: i32,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scheme: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TcpSocketProbe {
    pub port: i32,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host: String,
}

/// Compute limits for the target container, as Kubernetes quantities
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResourcesSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cpu: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memory: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub gpu: String,
}

impl ResourcesSpec {
    pub fn is_empty(&self) -> bool {
        self.cpu.trim().is_empty() && self.memory.trim().is_empty() && self.gpu.trim().is_empty()
    }
}

// =============================================================================
// RBAC
// =============================================================================

/// ServiceAccount plus the role and binding granting it permissions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RbacPolicySpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_account: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    /// Emit ClusterRole/ClusterRoleBinding instead of Role/RoleBinding
    #[serde(default)]
    pub cluster_scope: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub binding_name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub service_account_labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub service_account_annotations: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub role_labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub binding_labels: BTreeMap<String, String>,

    #[serde(default)]
    pub rules: Vec<RbacRuleSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automount_service_account_token: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RbacRuleSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub api_groups: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_names: Vec<String>,

    #[serde(
        default,
        rename = "nonResourceURLs",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub non_resource_urls: Vec<String>,

    #[serde(default)]
    pub verbs: Vec<String>,
}

// =============================================================================
// Ingress
// =============================================================================

/// One Ingress object routing to the component's services
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngressSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    /// Hosts applied to routes that do not name their own
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub label: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ingress_class_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_path_type: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tls: Vec<IngressTlsSpec>,

    #[serde(default)]
    pub routes: Vec<IngressRouteSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngressTlsSpec {
    pub secret_name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngressRouteSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path_type: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host: String,

    pub backend: IngressBackendSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<RewritePolicy>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngressBackendSpec {
    pub service_name: String,

    /// Defaults to 80
    #[serde(default)]
    pub service_port: i32,
}

/// Path rewrite for one route: replace, prefix or regexReplace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RewritePolicy {
    #[serde(rename = "type")]
    pub rewrite_type: String,

    #[serde(default, rename = "match", skip_serializing_if = "String::is_empty")]
    pub match_pattern: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub replacement: String,
}
