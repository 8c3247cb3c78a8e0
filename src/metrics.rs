//! Engine metrics
//!
//! Prometheus collectors for trait applies. Each [`EngineMetrics`] owns its
//! registry so several engines (and tests) can coexist in one process.

use crate::error::{Error, Result};
use crate::k8s::AuxiliaryObject;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::fmt;
use std::time::Duration;

const NAMESPACE: &str = "trait_composer";

/// Collectors recorded by the trait engine
#[derive(Clone)]
pub struct EngineMetrics {
    registry: Registry,
    applies: IntCounterVec,
    apply_duration: HistogramVec,
    processor_invocations: IntCounterVec,
    processor_failures: IntCounterVec,
    objects_emitted: IntCounterVec,
}

impl EngineMetrics {
    /// Create collectors in a fresh registry
    pub fn new() -> Result<Self> {
        Self::with_registry(Registry::new())
    }

    /// Register the collectors in an existing registry
    pub fn with_registry(registry: Registry) -> Result<Self> {
        let applies = IntCounterVec::new(
            Opts::new("applies_total", "Trait applies by outcome").namespace(NAMESPACE),
            &["outcome"],
        )
        .map_err(metrics_error)?;
        let apply_duration = HistogramVec::new(
            HistogramOpts::new("apply_duration_seconds", "Duration of one trait apply")
                .namespace(NAMESPACE)
                .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1]),
            &["outcome"],
        )
        .map_err(metrics_error)?;
        let processor_invocations = IntCounterVec::new(
            Opts::new("processor_invocations_total", "Trait processor invocations")
                .namespace(NAMESPACE),
            &["processor"],
        )
        .map_err(metrics_error)?;
        let processor_failures = IntCounterVec::new(
            Opts::new("processor_failures_total", "Trait processor failures")
                .namespace(NAMESPACE),
            &["processor"],
        )
        .map_err(metrics_error)?;
        let objects_emitted = IntCounterVec::new(
            Opts::new("objects_emitted_total", "Auxiliary objects returned by kind")
                .namespace(NAMESPACE),
            &["kind"],
        )
        .map_err(metrics_error)?;

        registry
            .register(Box::new(applies.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(apply_duration.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(processor_invocations.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(processor_failures.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(objects_emitted.clone()))
            .map_err(metrics_error)?;

        Ok(Self {
            registry,
            applies,
            apply_duration,
            processor_invocations,
            processor_failures,
            objects_emitted,
        })
    }

    /// Record the outcome of one apply
    pub fn record_apply(&self, outcome: &Result<Vec<AuxiliaryObject>>, elapsed: Duration) {
        let label = match outcome {
            Ok(_) => "success",
            Err(e) if e.is_user_error() => "rejected",
            Err(_) => "error",
        };
        self.applies.with_label_values(&[label]).inc();
        self.apply_duration
            .with_label_values(&[label])
            .observe(elapsed.as_secs_f64());

        if let Ok(objects) = outcome {
            for object in objects {
                let kind = object.kind();
                self.objects_emitted
                    .with_label_values(&[kind.as_str()])
                    .inc();
            }
        }
    }

    /// Record one processor invocation
    pub fn record_processor(&self, processor: &str, ok: bool) {
        self.processor_invocations
            .with_label_values(&[processor])
            .inc();
        if !ok {
            self.processor_failures.with_label_values(&[processor]).inc();
        }
    }

    /// Number of applies recorded with `outcome`
    pub fn applies(&self, outcome: &str) -> u64 {
        self.applies.with_label_values(&[outcome]).get()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all collectors in the text exposition format
    pub fn gather_text(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;
        String::from_utf8(buffer).map_err(|e| Error::Configuration(e.to_string()))
    }
}

impl fmt::Debug for EngineMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineMetrics").finish_non_exhaustive()
    }
}

fn metrics_error(e: prometheus::Error) -> Error {
    Error::Configuration(format!("metrics: {}", e))
}
