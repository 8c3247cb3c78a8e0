//! Trait Composer
//!
//! Turns the declarative traits attached to an application component
//! (storage, env, probes, sidecars, init containers, RBAC, ingress, compute
//! resources) into mutations of a Kubernetes workload plus the auxiliary
//! objects the workload needs.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                            TraitEngine                               │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐   ┌──────────────────┐   ┌──────────────────────┐  │
//! │  │  Component   │──►│    Dispatcher    │──►│      Aggregator      │  │
//! │  │  (traits)    │   │ (exclusion set)  │   │  (merge, dedup)      │  │
//! │  └──────────────┘   └────────┬─────────┘   └──────────┬───────────┘  │
//! │                              │ ▲ nested                │              │
//! │                     ┌────────▼─┴───────┐    ┌──────────▼───────────┐  │
//! │                     │ ProcessorRegistry │    │     Materializer     │  │
//! │                     │  (fixed order)    │    │ (pod spec, STS VCTs) │  │
//! │                     └───────────────────┘    └──────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`engine`]: Registry, dispatcher, aggregator and materializer
//! - [`processors`]: Built-in trait processors
//! - [`domain`]: Component and trait payload types
//! - [`k8s`]: Workload and auxiliary object wrappers
//! - [`config`]: Engine configuration
//! - [`metrics`]: Prometheus collectors
//! - [`error`]: Error types and handling
//!
//! # Example
//!
//! ```no_run
//! use trait_composer::{apply_traits, Component, Workload};
//! use serde_json::json;
//!
//! let component = Component::new("api", "demo", "nginx:latest")
//!     .with_traits(json!({ "resources": { "cpu": "500m" } }));
//! let mut workload = Workload::try_from(json!({
//!     "apiVersion": "apps/v1",
//!     "kind": "Deployment",
//!     "metadata": { "name": "api" },
//!     "spec": {
//!         "selector": { "matchLabels": { "app": "api" } },
//!         "template": { "spec": { "containers": [{ "name": "api" }] } }
//!     }
//! }))?;
//!
//! let objects = apply_traits(&component, &mut workload)?;
//! # Ok::<(), trait_composer::Error>(())
//! ```

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod k8s;
pub mod metrics;
pub mod processors;

// Re-export commonly used types
pub use config::EngineConfig;

pub use domain::{Component, TraitKind, Traits};

pub use engine::{
    apply_traits, ProcessorRegistry, RegistryBuilder, TraitContext, TraitEngine, TraitProcessor,
    TraitResult,
};

pub use error::{Error, ErrorCategory, Result};

pub use k8s::{AuxiliaryObject, ObjectKey, Workload};

pub use metrics::EngineMetrics;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
