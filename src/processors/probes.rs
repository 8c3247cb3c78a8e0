//! Probes trait
//!
//! At most one probe per type. The probe is attached to the container the
//! level decorates: the main container at the top level, a sidecar when
//! nested under one.

use crate::domain::{ProbeSpec, TraitData, TraitKind};
use crate::engine::{TraitContext, TraitProcessor, TraitResult};
use crate::error::{Error, Result};
use k8s_openapi::api::core::v1::{ExecAction, HTTPGetAction, Probe, TCPSocketAction};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::str::FromStr;

/// Which probe slot an entry fills
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    Liveness,
    Readiness,
    Startup,
}

impl ProbeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::Liveness => "liveness",
            ProbeKind::Readiness => "readiness",
            ProbeKind::Startup => "startup",
        }
    }
}

impl FromStr for ProbeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "liveness" => Ok(ProbeKind::Liveness),
            "readiness" => Ok(ProbeKind::Readiness),
            "startup" => Ok(ProbeKind::Startup),
            _ => Err(Error::InvalidProbe(format!(
                "invalid probe type: {}. Must be one of 'liveness', 'readiness', or 'startup'",
                s
            ))),
        }
    }
}

/// Processor for the `probes` trait
#[derive(Debug, Default, Clone, Copy)]
pub struct ProbesProcessor;

impl TraitProcessor for ProbesProcessor {
    fn kind(&self) -> TraitKind {
        TraitKind::Probes
    }

    fn process(&self, ctx: &TraitContext<'_>) -> Result<Option<TraitResult>> {
        let TraitData::Probes(specs) = ctx.data else {
            return Err(ctx.type_mismatch(self.name(), TraitKind::Probes));
        };

        let mut result = TraitResult::new();
        for spec in specs {
            let kind: ProbeKind = spec.probe_type.parse()?;
            let slot = match kind {
                ProbeKind::Liveness => &mut result.liveness_probe,
                ProbeKind::Readiness => &mut result.readiness_probe,
                ProbeKind::Startup => &mut result.startup_probe,
            };
            if slot.is_some() {
                return Err(Error::DuplicateProbe {
                    probe_type: kind.as_str().to_string(),
                    component: ctx.target.to_string(),
                });
            }
            *slot = Some(build_probe(spec)?);
        }

        Ok(Some(result))
    }
}

fn build_probe(spec: &ProbeSpec) -> Result<Probe> {
    let handlers = [
        spec.exec.is_some(),
        spec.http_get.is_some(),
        spec.tcp_socket.is_some(),
    ]
    .into_iter()
    .filter(|set| *set)
    .count();
    if handlers != 1 {
        return Err(Error::InvalidProbe(
            "exactly one of 'exec', 'httpGet', or 'tcpSocket' must be specified for a probe"
                .into(),
        ));
    }

    let positive = |v: i32| (v > 0).then_some(v);
    let non_empty = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());

    Ok(Probe {
        initial_delay_seconds: positive(spec.initial_delay_seconds),
        period_seconds: positive(spec.period_seconds),
        timeout_seconds: positive(spec.timeout_seconds),
        failure_threshold: positive(spec.failure_threshold),
        success_threshold: positive(spec.success_threshold),
        exec: spec.exec.as_ref().map(|e| ExecAction {
            command: Some(e.command.clone()),
        }),
        http_get: spec.http_get.as_ref().map(|h| HTTPGetAction {
            path: non_empty(&h.path),
            port: IntOrString::Int(h.port),
            host: non_empty(&h.host),
            scheme: non_empty(&h.scheme).map(|s| s.to_ascii_uppercase()),
            http_headers: None,
        }),
        tcp_socket: spec.tcp_socket.as_ref().map(|t| TCPSocketAction {
            port: IntOrString::Int(t.port),
            host: non_empty(&t.host),
        }),
        ..Default::default()
    })
}
