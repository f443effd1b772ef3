//! Manifest expansion.
//!
//! A manifest is a JSON document listing more descriptors:
//!
//! ```json
//! { "path": "assets/", "manifest": ["a.png", { "src": "b.json", "id": "b" }] }
//! ```
//!
//! A bare top-level array is accepted as well.

use serde_json::Value;

use preload_core::{Descriptor, LoadError, LoadOutput};

/// Descriptors listed by a loaded manifest.
#[derive(Debug, Default)]
pub(super) struct ManifestEntries {
    /// Prefix for relative sources in this manifest.
    pub path: Option<String>,
    pub descriptors: Vec<Descriptor>,
    /// Entries that were neither a string nor a descriptor object.
    pub invalid: Vec<LoadError>,
}

/// Read the entries of a manifest output.
///
/// Returns an empty list when the payload did not parse as JSON or has no
/// `manifest` array.
pub(super) fn manifest_entries(output: &LoadOutput) -> ManifestEntries {
    let Some(document) = output.formatted.as_json() else {
        return ManifestEntries::default();
    };

    let (path, list) = match document {
        Value::Array(list) => (None, list),
        Value::Object(map) => {
            let path = map.get("path").and_then(Value::as_str).map(str::to_string);
            match map.get("manifest").and_then(Value::as_array) {
                Some(list) => (path, list),
                None => return ManifestEntries::default(),
            }
        }
        _ => return ManifestEntries::default(),
    };

    let mut entries = ManifestEntries {
        path: path.filter(|p| !p.is_empty()),
        ..ManifestEntries::default()
    };
    for entry in list {
        match serde_json::from_value::<Descriptor>(entry.clone()) {
            Ok(descriptor) => entries.descriptors.push(descriptor),
            Err(e) => entries
                .invalid
                .push(LoadError::invalid_descriptor(format!("{e}: {entry}"))),
        }
    }
    entries
}
