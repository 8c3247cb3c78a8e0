//! Ingress trait
//!
//! Builds one `networking.k8s.io/v1` Ingress per entry. Routes are grouped
//! into one rule per host, in the order hosts are first seen. Route rewrite
//! policies become ingress-nginx annotations.

use crate::domain::{IngressRouteSpec, IngressSpec, RewritePolicy, TraitData, TraitKind};
use crate::engine::{TraitContext, TraitProcessor, TraitResult};
use crate::error::{Error, Result};
use crate::k8s::labels::{component_labels, merge_labels, non_empty};
use crate::k8s::names;
use indexmap::IndexMap;
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec as K8sIngressSpec, IngressTLS, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub const REWRITE_TARGET_ANNOTATION: &str = "nginx.ingress.kubernetes.io/rewrite-target";
pub const USE_REGEX_ANNOTATION: &str = "nginx.ingress.kubernetes.io/use-regex";

const DEFAULT_SERVICE_PORT: i32 = 80;

/// Processor for the `ingress` trait
#[derive(Debug, Default, Clone, Copy)]
pub struct IngressProcessor;

impl TraitProcessor for IngressProcessor {
    fn kind(&self) -> TraitKind {
        TraitKind::Ingress
    }

    fn process(&self, ctx: &TraitContext<'_>) -> Result<Option<TraitResult>> {
        let TraitData::Ingress(specs) = ctx.data else {
            return Err(ctx.type_mismatch(self.name(), TraitKind::Ingress));
        };

        let mut result = TraitResult::new();
        for (index, spec) in specs.iter().enumerate() {
            let spec = spec
                .as_ref()
                .ok_or(Error::MissingIngressSpec { index })?;
            if spec.routes.is_empty() {
                return Err(Error::NoIngressRoutes { index });
            }

            let ingress = build_ingress(ctx, spec, index)?;
            debug!(
                ingress = ingress.metadata.name.as_deref().unwrap_or_default(),
                routes = spec.routes.len(),
                "added ingress"
            );
            result.add_object(ingress);
        }

        Ok(Some(result))
    }
}

fn build_ingress(ctx: &TraitContext<'_>, spec: &IngressSpec, index: usize) -> Result<Ingress> {
    let name = if spec.name.trim().is_empty() {
        let base = names::normalize(ctx.target);
        if index == 0 {
            format!("{}-ingress", base)
        } else {
            format!("{}-ingress-{}", base, index + 1)
        }
    } else {
        names::normalize(&spec.name)
    };
    let namespace = names::first_non_empty(&[spec.namespace.trim(), ctx.namespace()]);

    let annotations = ingress_annotations(spec)?;
    let use_regex = annotations
        .get(USE_REGEX_ANNOTATION)
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));

    let mut hosts: IndexMap<String, Vec<HTTPIngressPath>> = IndexMap::new();
    for route in &spec.routes {
        let path = ingress_path(ctx, spec, route, use_regex)?;
        for host in route_hosts(spec, route) {
            hosts.entry(host).or_default().push(path.clone());
        }
    }

    let rules = hosts
        .into_iter()
        .map(|(host, paths)| IngressRule {
            host: Some(host).filter(|h| !h.is_empty()),
            http: Some(HTTPIngressRuleValue { paths }),
        })
        .collect();

    let tls = spec
        .tls
        .iter()
        .map(|t| IngressTLS {
            hosts: (!t.hosts.is_empty()).then(|| t.hosts.clone()),
            secret_name: Some(t.secret_name.clone()).filter(|s| !s.is_empty()),
        })
        .collect::<Vec<_>>();

    Ok(Ingress {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: Some(namespace.to_string()),
            labels: non_empty(merge_labels(component_labels(ctx.component), &spec.label)),
            annotations: non_empty(annotations),
            ..Default::default()
        },
        spec: Some(K8sIngressSpec {
            ingress_class_name: Some(spec.ingress_class_name.trim().to_string())
                .filter(|c| !c.is_empty()),
            rules: Some(rules),
            tls: (!tls.is_empty()).then_some(tls),
            default_backend: None,
        }),
        ..Default::default()
    })
}

/// Hosts a route is served on: its own host, the ingress hosts, or any host
fn route_hosts(spec: &IngressSpec, route: &IngressRouteSpec) -> Vec<String> {
    if !route.host.trim().is_empty() {
        vec![route.host.trim().to_string()]
    } else if !spec.hosts.is_empty() {
        spec.hosts.clone()
    } else {
        vec![String::new()]
    }
}

fn ingress_path(
    ctx: &TraitContext<'_>,
    spec: &IngressSpec,
    route: &IngressRouteSpec,
    use_regex: bool,
) -> Result<HTTPIngressPath> {
    let path = rewritten_path(route);
    let path_type = path_type(&route.path_type, &spec.default_path_type, use_regex)?;

    let service =
        names::first_non_empty(&[route.backend.service_name.trim(), ctx.component.name.as_str()]);
    let port = if route.backend.service_port > 0 {
        route.backend.service_port
    } else {
        DEFAULT_SERVICE_PORT
    };

    Ok(HTTPIngressPath {
        path: Some(path),
        path_type,
        backend: IngressBackend {
            service: Some(IngressServiceBackend {
                name: service.to_string(),
                port: Some(ServiceBackendPort {
                    name: None,
                    number: Some(port),
                }),
            }),
            resource: None,
        },
    })
}

fn route_path(route: &IngressRouteSpec) -> &str {
    let path = route.path.trim();
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

/// The path as written into the Ingress, after any rewrite capture groups
fn rewritten_path(route: &IngressRouteSpec) -> String {
    let path = route_path(route);
    match route.rewrite.as_ref().map(rewrite_kind) {
        Some(Ok(RewriteKind::Prefix)) => match path.trim_end_matches('/') {
            "" => "/()(.*)".to_string(),
            base => format!("{}(/|$)(.*)", base),
        },
        Some(Ok(RewriteKind::RegexReplace)) => route
            .rewrite
            .as_ref()
            .map(|r| r.match_pattern.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| path.to_string()),
        _ => path.to_string(),
    }
}

/// Route type first, then the ingress default, then the regex fallback
fn path_type(route_type: &str, default_type: &str, use_regex: bool) -> Result<String> {
    let chosen = names::first_non_empty(&[route_type.trim(), default_type.trim()]);
    if chosen.is_empty() {
        return Ok(if use_regex {
            "ImplementationSpecific".to_string()
        } else {
            "Prefix".to_string()
        });
    }

    match chosen.to_ascii_lowercase().as_str() {
        "exact" => Ok("Exact".to_string()),
        "prefix" => Ok("Prefix".to_string()),
        "implementationspecific" => Ok("ImplementationSpecific".to_string()),
        _ => Err(Error::InvalidPathType(chosen.to_string())),
    }
}

// =============================================================================
// Rewrites
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RewriteKind {
    Replace,
    Prefix,
    RegexReplace,
}

fn rewrite_kind(policy: &RewritePolicy) -> Result<RewriteKind> {
    match policy.rewrite_type.trim().to_ascii_lowercase().as_str() {
        "replace" => Ok(RewriteKind::Replace),
        "prefix" => Ok(RewriteKind::Prefix),
        "regexreplace" | "regex" => Ok(RewriteKind::RegexReplace),
        other => Err(Error::InvalidRewrite(format!("unknown rewrite type '{}'", other))),
    }
}

/// Annotations implied by one route's rewrite policy
fn rewrite_annotations(route: &IngressRouteSpec) -> Result<BTreeMap<String, String>> {
    let Some(policy) = route.rewrite.as_ref() else {
        return Ok(BTreeMap::new());
    };

    let replacement = policy.replacement.trim();
    let mut out = BTreeMap::new();
    match rewrite_kind(policy)? {
        RewriteKind::Replace => {
            if replacement.is_empty() {
                return Err(Error::InvalidRewrite(format!(
                    "replace rewrite on path {} requires a replacement",
                    route_path(route)
                )));
            }
            out.insert(REWRITE_TARGET_ANNOTATION.to_string(), replacement.to_string());
        }
        RewriteKind::Prefix => {
            let target = format!("{}/$2", replacement.trim_end_matches('/'));
            out.insert(REWRITE_TARGET_ANNOTATION.to_string(), target);
            out.insert(USE_REGEX_ANNOTATION.to_string(), "true".to_string());
        }
        RewriteKind::RegexReplace => {
            if policy.match_pattern.trim().is_empty() || replacement.is_empty() {
                return Err(Error::InvalidRewrite(format!(
                    "regexReplace rewrite on path {} requires match and replacement",
                    route_path(route)
                )));
            }
            out.insert(REWRITE_TARGET_ANNOTATION.to_string(), replacement.to_string());
            out.insert(USE_REGEX_ANNOTATION.to_string(), "true".to_string());
        }
    }
    Ok(out)
}

/// User annotations overlaid on the rewrite-derived ones.
///
/// Routes of one Ingress share its annotations, so routes asking for
/// different rewrite targets cannot be expressed and are rejected.
fn ingress_annotations(spec: &IngressSpec) -> Result<BTreeMap<String, String>> {
    let mut derived: BTreeMap<String, String> = BTreeMap::new();
    for route in &spec.routes {
        for (key, value) in rewrite_annotations(route)? {
            match derived.get(&key) {
                Some(existing) if *existing != value => {
                    return Err(Error::InvalidRewrite(format!(
                        "conflicting {} values {:?} and {:?}",
                        key, existing, value
                    )));
                }
                _ => {
                    derived.insert(key, value);
                }
            }
        }
    }

    for (key, value) in &spec.annotations {
        if let Some(existing) = derived.get(key) {
            if existing != value {
                warn!(annotation = %key, "explicit annotation overrides route rewrite");
            }
        }
    }
    Ok(merge_labels(derived, &spec.annotations))
}
