//! Error types for the trait composer
//!
//! Provides structured error types for trait payload parsing, trait processing,
//! workload materialization and the CLI surface.

use thiserror::Error;

/// Unified error type for the trait composer
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Malformed Input
    // =========================================================================
    #[error("failed to parse traits for component {component}: {source}")]
    MalformedTraits {
        component: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid component: {0}")]
    InvalidComponent(String),

    // =========================================================================
    // Internal Wiring
    // =========================================================================
    #[error("trait processor '{processor}' expected {expected} data, got {actual}")]
    TraitTypeMismatch {
        processor: String,
        expected: String,
        actual: String,
    },

    #[error("trait processor already registered: {name}")]
    DuplicateProcessor { name: String },

    // =========================================================================
    // Domain Violations
    // =========================================================================
    #[error("failed to process trait '{trait_name}': {source}")]
    Trait {
        trait_name: String,
        #[source]
        source: Box<Error>,
    },

    #[error("{probe_type} probe already defined for component {component}")]
    DuplicateProbe { probe_type: String, component: String },

    #[error("invalid probe: {0}")]
    InvalidProbe(String),

    #[error("sidecar '{sidecar}' must not contain nested sidecars")]
    NestedSidecar { sidecar: String },

    #[error("{kind} '{name}' is missing an image")]
    MissingImage { kind: String, name: String },

    #[error("rbac trait {service_account}: rule {rule} must specify verbs")]
    MissingVerbs { service_account: String, rule: usize },

    #[error("ingress trait[{index}]: at least one route is required")]
    NoIngressRoutes { index: usize },

    #[error("ingress trait[{index}]: ingress spec is nil")]
    MissingIngressSpec { index: usize },

    #[error("invalid ingress path type: {0}")]
    InvalidPathType(String),

    #[error("invalid ingress rewrite: {0}")]
    InvalidRewrite(String),

    #[error("invalid {field} quantity {value:?}: {reason}")]
    InvalidQuantity {
        field: String,
        value: String,
        reason: String,
    },

    #[error("unknown storage type: {0}")]
    UnknownStorageType(String),

    #[error("invalid volume name {name:?}: {reason}")]
    InvalidVolumeName { name: String, reason: String },

    #[error("invalid env source: {0}")]
    InvalidEnvSource(String),

    // =========================================================================
    // Structural Inconsistency
    // =========================================================================
    #[error("main container '{name}' not found in workload")]
    MainContainerNotFound { name: String },

    #[error("unsupported workload kind: {0}")]
    UnsupportedWorkload(String),

    #[error("trait nesting exceeds maximum depth of {max_depth}")]
    RecursionLimit { max_depth: usize },

    // =========================================================================
    // Configuration / IO
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Broad classification of an error, used by callers to decide whether a
/// corrected resubmission could succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The trait payload could not be parsed
    MalformedInput,
    /// A processor received data of the wrong shape (wiring defect)
    TypeMismatch,
    /// Well-typed but semantically invalid trait values
    DomainViolation,
    /// The workload does not fit the component
    StructuralInconsistency,
    /// Bootstrap, configuration or IO failures outside a single apply
    Environment,
}

impl Error {
    /// Wrap an error with the name of the trait being processed
    pub fn in_trait(self, trait_name: impl Into<String>) -> Self {
        Error::Trait {
            trait_name: trait_name.into(),
            source: Box::new(self),
        }
    }

    /// Classify this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Trait { source, .. } => source.category(),

            Error::MalformedTraits { .. } | Error::InvalidComponent(_) => {
                ErrorCategory::MalformedInput
            }

            Error::TraitTypeMismatch { .. } => ErrorCategory::TypeMismatch,

            Error::DuplicateProbe { .. }
            | Error::InvalidProbe(_)
            | Error::NestedSidecar { .. }
            | Error::MissingImage { .. }
            | Error::MissingVerbs { .. }
            | Error::NoIngressRoutes { .. }
            | Error::MissingIngressSpec { .. }
            | Error::InvalidPathType(_)
            | Error::InvalidRewrite(_)
            | Error::InvalidQuantity { .. }
            | Error::UnknownStorageType(_)
            | Error::InvalidVolumeName { .. }
            | Error::InvalidEnvSource(_) => ErrorCategory::DomainViolation,

            Error::MainContainerNotFound { .. }
            | Error::UnsupportedWorkload(_)
            | Error::RecursionLimit { .. } => ErrorCategory::StructuralInconsistency,

            Error::DuplicateProcessor { .. }
            | Error::Configuration(_)
            | Error::Json(_)
            | Error::Yaml(_)
            | Error::Io(_) => ErrorCategory::Environment,
        }
    }

    /// Check if this error was caused by user-supplied input
    pub fn is_user_error(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::MalformedInput | ErrorCategory::DomainViolation
        )
    }

    /// Strip `Trait` wrappers and return the innermost error
    pub fn root(&self) -> &Error {
        match self {
            Error::Trait { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type alias for the trait composer
pub type Result<T> = std::result::Result<T, Error>;
