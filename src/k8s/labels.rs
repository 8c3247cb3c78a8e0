//! Label builder shared by generated objects

use crate::config::{LABEL_APP_ID, LABEL_COMPONENT};
use crate::domain::Component;
use std::collections::BTreeMap;

/// Identity labels for objects generated on behalf of a component
pub fn component_labels(component: &Component) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    match component.app_id.as_deref().filter(|id| !id.is_empty()) {
        Some(app_id) => {
            labels.insert(
                LABEL_COMPONENT.to_string(),
                format!("{}-{}", app_id, component.name),
            );
            labels.insert(LABEL_APP_ID.to_string(), app_id.to_string());
        }
        None => {
            labels.insert(LABEL_COMPONENT.to_string(), component.name.clone());
        }
    }
    labels
}

/// Overlay `extra` on top of `base`; keys from `extra` win
pub fn merge_labels(
    mut base: BTreeMap<String, String>,
    extra: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    base.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    base
}

/// `None` for an empty map, so serialized metadata stays minimal
pub fn non_empty(map: BTreeMap<String, String>) -> Option<BTreeMap<String, String>> {
    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}
