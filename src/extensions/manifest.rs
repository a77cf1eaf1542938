use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::reflector::ReflectorError;

use super::LIST_LOADED_EXTENSIONS;

/// Manifest record of an extension loaded in the host UI runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionManifest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(
        rename = "scriptName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub script_name: Option<String>,
}

/// Flatten a `list-loaded-extensions` result into a list of manifests.
///
/// The extension may answer with a list of records or with a map from
/// arbitrary keys to records; map entries come out in key order. An empty
/// list or map is a valid, empty result.
pub fn normalize_extension_list(raw: Value) -> Result<Vec<ExtensionManifest>, ReflectorError> {
    let records: Vec<Value> = match raw {
        Value::Array(items) => items,
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            entries.into_iter().map(|(_, record)| record).collect()
        }
        other => {
            return Err(ReflectorError::malformed(
                LIST_LOADED_EXTENSIONS,
                format!("expected a list or map of extensions, got {other}"),
            ))
        }
    };

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            serde_json::from_value(record).map_err(|e| {
                ReflectorError::malformed(LIST_LOADED_EXTENSIONS, format!("entry {index}: {e}"))
            })
        })
        .collect()
}
