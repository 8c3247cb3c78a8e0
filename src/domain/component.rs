//! Component
//!
//! The unit that owns a trait payload. The payload arrives opaque (it is
//! stored and transported as JSON) and is only decoded by the engine.

use super::traits::Traits;
use crate::error::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An application component with its opaque trait payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    /// Component name; also the name of the main container
    pub name: String,

    /// Namespace the component is deployed into
    #[serde(default)]
    pub namespace: String,

    /// Owning application id, used for identity labels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,

    /// Image of the main container
    #[serde(default)]
    pub image: String,

    /// Serialized trait aggregate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traits: Option<serde_json::Value>,
}

impl Component {
    /// Create a component without traits
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        image: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            app_id: None,
            image: image.into(),
            traits: None,
        }
    }

    /// Attach a trait payload
    pub fn with_traits(mut self, traits: serde_json::Value) -> Self {
        self.traits = Some(traits);
        self
    }

    /// Attach a typed trait aggregate
    pub fn with_typed_traits(self, traits: &Traits) -> Result<Self> {
        Ok(self.with_traits(serde_json::to_value(traits)?))
    }

    /// Decode the trait payload.
    ///
    /// Returns `Ok(None)` when there is nothing to apply: no payload, `null`,
    /// an empty string, or an aggregate with no trait set. A payload stored as
    /// a JSON string is decoded twice.
    pub fn parse_traits(&self) -> Result<Option<Traits>> {
        let traits = match &self.traits {
            None | Some(serde_json::Value::Null) => return Ok(None),
            Some(serde_json::Value::String(raw)) if raw.trim().is_empty() => return Ok(None),
            Some(serde_json::Value::String(raw)) => serde_json::from_str::<Traits>(raw),
            Some(value) => Traits::deserialize(value),
        }
        .map_err(|source| Error::MalformedTraits {
            component: self.name.clone(),
            source,
        })?;

        if traits.is_empty() {
            Ok(None)
        } else {
            Ok(Some(traits))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn test_empty_payloads_are_no_ops() {
        let component = Component::new("api", "demo", "nginx:latest");
        assert!(component.parse_traits().unwrap().is_none());

        for payload in [json!(null), json!({}), json!(""), json!({ "storage": [] })] {
            let component = component.clone().with_traits(payload);
            assert!(component.parse_traits().unwrap().is_none());
        }
    }

    #[test]
    fn test_string_payload_is_decoded() {
        let raw = json!({ "envFrom": [{ "type": "secret", "sourceName": "creds" }] }).to_string();
        let component = Component::new("api", "demo", "nginx:latest").with_traits(json!(raw));

        let traits = component.parse_traits().unwrap().unwrap();
        assert_eq!(traits.env_from.len(), 1);
        assert_eq!(traits.env_from[0].source_name, "creds");
    }

    #[test]
    fn test_malformed_payload_names_component() {
        let component = Component::new("api", "demo", "nginx:latest")
            .with_traits(json!({ "storage": "not-a-list" }));

        let err = component.parse_traits().unwrap_err();
        assert_matches!(&err, Error::MalformedTraits { component, .. } if component == "api");
        assert!(err.to_string().contains("api"));
    }

    #[test]
    fn test_component_deserializes_camel_case() {
        let component: Component = serde_json::from_value(json!({
            "name": "api",
            "namespace": "demo",
            "appId": "shop",
            "image": "nginx:latest",
            "traits": { "resources": { "cpu": "500m" } }
        }))
        .unwrap();

        assert_eq!(component.app_id.as_deref(), Some("shop"));
        let traits = component.parse_traits().unwrap().unwrap();
        assert_eq!(traits.resources.unwrap().cpu, "500m");
    }
}
