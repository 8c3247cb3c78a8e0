//! Environment traits
//!
//! `envFrom` imports whole ConfigMaps or Secrets; `envs` sets single
//! variables from a static value, a ConfigMap/Secret key or a pod field.

use crate::domain::{EnvFromSpec, EnvSpec, TraitData, TraitKind};
use crate::engine::{TraitContext, TraitProcessor, TraitResult};
use crate::error::{Error, Result};
use k8s_openapi::api::core::v1::{
    ConfigMapEnvSource, ConfigMapKeySelector, EnvFromSource, EnvVar, EnvVarSource,
    ObjectFieldSelector, SecretEnvSource, SecretKeySelector,
};

// =============================================================================
// envFrom
// =============================================================================

/// Processor for the `envFrom` trait
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvFromProcessor;

impl TraitProcessor for EnvFromProcessor {
    fn kind(&self) -> TraitKind {
        TraitKind::EnvFrom
    }

    fn process(&self, ctx: &TraitContext<'_>) -> Result<Option<TraitResult>> {
        let TraitData::EnvFrom(specs) = ctx.data else {
            return Err(ctx.type_mismatch(self.name(), TraitKind::EnvFrom));
        };

        let mut result = TraitResult::new();
        for spec in specs {
            result.add_env_from(ctx.target, env_from_source(spec)?);
        }
        Ok(Some(result))
    }
}

fn env_from_source(spec: &EnvFromSpec) -> Result<EnvFromSource> {
    let name = spec.source_name.trim();
    if name.is_empty() {
        return Err(Error::InvalidEnvSource(format!(
            "envFrom of type '{}' requires sourceName",
            spec.source_type
        )));
    }

    match spec.source_type.trim().to_ascii_lowercase().as_str() {
        "configmap" | "config" => Ok(EnvFromSource {
            config_map_ref: Some(ConfigMapEnvSource {
                name: Some(name.to_string()),
                optional: None,
            }),
            ..Default::default()
        }),
        "secret" => Ok(EnvFromSource {
            secret_ref: Some(SecretEnvSource {
                name: Some(name.to_string()),
                optional: None,
            }),
            ..Default::default()
        }),
        other => Err(Error::InvalidEnvSource(format!(
            "unsupported env type: {}",
            other
        ))),
    }
}

// =============================================================================
// envs
// =============================================================================

/// Processor for the `envs` trait
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvsProcessor;

impl TraitProcessor for EnvsProcessor {
    fn kind(&self) -> TraitKind {
        TraitKind::Envs
    }

    fn process(&self, ctx: &TraitContext<'_>) -> Result<Option<TraitResult>> {
        let TraitData::Envs(specs) = ctx.data else {
            return Err(ctx.type_mismatch(self.name(), TraitKind::Envs));
        };

        let mut result = TraitResult::new();
        for spec in specs {
            result.add_env(ctx.target, env_var(spec)?);
        }
        Ok(Some(result))
    }
}

fn env_var(spec: &EnvSpec) -> Result<EnvVar> {
    let name = spec.name.trim();
    if name.is_empty() {
        return Err(Error::InvalidEnvSource("env var name must not be empty".into()));
    }

    let source = &spec.value_from;
    if source.count() != 1 {
        return Err(Error::InvalidEnvSource(format!(
            "env var '{}' must set exactly one of static, secret, config or field",
            name
        )));
    }

    let mut var = EnvVar {
        name: name.to_string(),
        ..Default::default()
    };

    if let Some(value) = &source.r#static {
        var.value = Some(value.clone());
    } else if let Some(secret) = &source.secret {
        var.value_from = Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: Some(secret.name.clone()),
                key: secret.key.clone(),
                optional: None,
            }),
            ..Default::default()
        });
    } else if let Some(config) = &source.config {
        var.value_from = Some(EnvVarSource {
            config_map_key_ref: Some(ConfigMapKeySelector {
                name: Some(config.name.clone()),
                key: config.key.clone(),
                optional: None,
            }),
            ..Default::default()
        });
    } else if let Some(field) = &source.field {
        var.value_from = Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                field_path: field.clone(),
                api_version: None,
            }),
            ..Default::default()
        });
    }

    Ok(var)
}
