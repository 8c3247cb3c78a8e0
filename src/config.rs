//! Engine configuration
//!
//! Tunables for the trait engine. Every field has a default, so an empty or
//! partial YAML document is a valid configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

// =============================================================================
// Well-known Keys
// =============================================================================

/// Annotation marking a PVC as a StatefulSet volume-claim template
pub const PVC_ROLE_ANNOTATION: &str = "storage.kubemin.cli/pvc-role";

/// Value of [`PVC_ROLE_ANNOTATION`] for volume-claim templates
pub const PVC_ROLE_TEMPLATE: &str = "template";

/// Component identity label
pub const LABEL_COMPONENT: &str = "kube-min-cli";

/// Owning application label
pub const LABEL_APP_ID: &str = "kube-min-cli-appId";

// =============================================================================
// Engine Configuration
// =============================================================================

/// Configuration for the trait engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Maximum nesting depth of trait aggregates (init/sidecar recursion)
    pub max_depth: usize,
    /// Namespace used when neither the trait nor the component sets one
    pub default_namespace: String,
    /// Size requested by created PVCs that do not declare one
    pub default_pvc_size: String,
    /// Extended resource name used for the `gpu` resource trait
    pub gpu_resource_name: String,
    /// Default file mode for ConfigMap/Secret volumes
    pub volume_default_mode: i32,
    /// Annotation key identifying PVC templates
    pub pvc_role_annotation: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            default_namespace: "default".to_string(),
            default_pvc_size: "1Gi".to_string(),
            gpu_resource_name: "nvidia.com/gpu".to_string(),
            volume_default_mode: 420,
            pvc_role_annotation: PVC_ROLE_ANNOTATION.to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: EngineConfig = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(Error::Configuration("maxDepth must be at least 1".into()));
        }
        if self.gpu_resource_name.trim().is_empty() {
            return Err(Error::Configuration(
                "gpuResourceName must not be empty".into(),
            ));
        }
        if self.pvc_role_annotation.trim().is_empty() {
            return Err(Error::Configuration(
                "pvcRoleAnnotation must not be empty".into(),
            ));
        }
        crate::k8s::quantity::parse_quantity("defaultPvcSize", &self.default_pvc_size)
            .map_err(|e| Error::Configuration(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_values() {
        let config = EngineConfig::default();
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.default_pvc_size, "1Gi");
        assert_eq!(config.gpu_resource_name, "nvidia.com/gpu");
        assert_eq!(config.pvc_role_annotation, PVC_ROLE_ANNOTATION);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "maxDepth: 3\ndefaultNamespace: apps").unwrap();

        let config = EngineConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.default_namespace, "apps");
        assert_eq!(config.default_pvc_size, "1Gi");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "maxDepth: 0").unwrap();
        assert!(matches!(
            EngineConfig::from_yaml_file(file.path()),
            Err(Error::Configuration(_))
        ));

        let config = EngineConfig {
            default_pvc_size: "lots".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
