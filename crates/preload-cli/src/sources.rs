//! Turning command-line arguments into descriptors.

use std::path::Path;

use serde::Deserialize;

use preload_core::{Descriptor, ResourceType, StructuredDescriptor};

use crate::commands::SourceArgs;
use crate::error::CliError;

/// Contents of a manifest file.
///
/// Either `{"path": "...", "manifest": [...]}` or a bare array of
/// descriptors. `path` prefixes every relative entry.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ManifestFile {
    Listing {
        #[serde(default)]
        path: Option<String>,
        manifest: Vec<Descriptor>,
    },
    Bare(Vec<Descriptor>),
}

impl ManifestFile {
    /// Read and parse a manifest file.
    pub fn read(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CliError::Io(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| CliError::Manifest(format!("{}: {e}", path.display())))
    }

    /// Path prefix declared by the manifest.
    pub fn prefix(&self) -> Option<&str> {
        match self {
            Self::Listing { path, .. } => path.as_deref().filter(|p| !p.is_empty()),
            Self::Bare(_) => None,
        }
    }

    pub fn into_descriptors(self) -> Vec<Descriptor> {
        match self {
            Self::Listing { manifest, .. } | Self::Bare(manifest) => manifest,
        }
    }
}

impl SourceArgs {
    /// Descriptors for the positional sources, with the type override applied.
    pub fn positional(&self) -> Vec<Descriptor> {
        self.sources
            .iter()
            .map(|src| match self.resource_type {
                Some(resource_type) => StructuredDescriptor::new(src.clone())
                    .with_type(resource_type)
                    .into(),
                None => Descriptor::from(src.clone()),
            })
            .collect()
    }

    /// Everything to enqueue for a fetch.
    ///
    /// The manifest file itself is queued as a `manifest` item so the queue
    /// expands it; the manifest is checked up front so a bad file fails
    /// before any network traffic.
    pub fn descriptors(&self) -> Result<Vec<Descriptor>, CliError> {
        let mut descriptors = Vec::new();
        if let Some(path) = &self.manifest {
            ManifestFile::read(path)?;
            let src = path.to_string_lossy().into_owned();
            descriptors.push(
                StructuredDescriptor::new(src)
                    .with_type(ResourceType::Manifest)
                    .into(),
            );
        }
        descriptors.extend(self.positional());

        if descriptors.is_empty() {
            return Err(CliError::Arguments(
                "nothing to load: pass sources or --manifest".to_string(),
            ));
        }
        Ok(descriptors)
    }
}
