//! Item normalization.
//!
//! Turns a [`Descriptor`] into a [`LoadItem`] exactly once: applies path
//! prefixes, parses the source, infers the type from the extension,
//! synthesizes a placeholder and gives a registered plugin the last word.

mod uri;

use preload_core::{Descriptor, LoadItem, LoadResult, Placeholder, ResourceType, TagKind};

use crate::plugins::{PluginDecision, PluginRegistry, PluginRequest};

pub use uri::{SourceParts, is_relative, join_base, parse_source};

/// Builds load items from descriptors.
#[derive(Debug, Clone, Default)]
pub struct ItemNormalizer {
    base_path: Option<String>,
}

impl ItemNormalizer {
    pub const fn new(base_path: Option<String>) -> Self {
        Self { base_path }
    }

    /// Normalize a descriptor.
    ///
    /// Returns `Ok(None)` when a plugin skips the item. A source that cannot
    /// be parsed is a structural error.
    pub fn normalize(
        &self,
        descriptor: Descriptor,
        plugins: &PluginRegistry,
    ) -> LoadResult<Option<LoadItem>> {
        self.normalize_in(descriptor, plugins, None)
    }

    /// Normalize a descriptor listed in a manifest with its own path prefix.
    ///
    /// The manifest prefix applies first, then the queue's base path.
    pub fn normalize_in(
        &self,
        descriptor: Descriptor,
        plugins: &PluginRegistry,
        prefix: Option<&str>,
    ) -> LoadResult<Option<LoadItem>> {
        let descriptor = descriptor.into_structured();
        // The id defaults to the source as the caller wrote it
        let id = descriptor
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| descriptor.src.clone());

        let mut src = descriptor.src;
        if let Some(prefix) = prefix {
            src = join_base(prefix, &src);
        }
        if let Some(base) = &self.base_path {
            src = join_base(base, &src);
        }

        let parts = parse_source(&src)?;
        let resource_type = descriptor.resource_type.unwrap_or_else(|| {
            parts
                .extension
                .as_deref()
                .map_or(ResourceType::Text, ResourceType::from_extension)
        });
        let mut item = LoadItem {
            id,
            src,
            resource_type,
            extension: parts.extension,
            data: descriptor.data,
            placeholder: descriptor.placeholder,
            complete_handler: descriptor.complete_handler,
            maintain_order: descriptor.maintain_order,
            prefer_network: descriptor.prefer_network,
        };

        if !apply_plugin(&mut item, plugins)? {
            return Ok(None);
        }

        if item.placeholder.is_none() {
            item.placeholder = Some(Placeholder::new(TagKind::for_type(item.resource_type)));
        }
        Ok(Some(item))
    }
}

/// Run the matching plugin, if any. Returns `false` if the item is skipped.
fn apply_plugin(item: &mut LoadItem, plugins: &PluginRegistry) -> LoadResult<bool> {
    let Some(handler) = plugins.lookup(item.resource_type, item.extension.as_deref()) else {
        return Ok(true);
    };

    let request = PluginRequest {
        src: item.src.clone(),
        resource_type: item.resource_type,
        id: item.id.clone(),
        data: item.data.clone(),
    };

    match handler.handle(&request) {
        PluginDecision::Skip => {
            tracing::debug!(target: "preload.queue", src = %item.src, "plugin skipped item");
            Ok(false)
        }
        PluginDecision::Proceed => Ok(true),
        PluginDecision::Override(changes) => {
            if let Some(src) = changes.src {
                item.extension = parse_source(&src)?.extension;
                item.src = src;
            }
            if let Some(id) = changes.id {
                item.id = id;
            }
            if let Some(resource_type) = changes.resource_type {
                item.resource_type = resource_type;
            }
            if let Some(placeholder) = changes.placeholder {
                item.placeholder = Some(placeholder);
            }
            if let Some(handler) = changes.complete_handler {
                item.complete_handler = Some(handler);
            }
            Ok(true)
        }
    }
}
