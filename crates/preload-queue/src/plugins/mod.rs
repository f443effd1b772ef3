//! Plugin registry.
//!
//! Plugins intercept normalization for a resource type or file extension.
//! Each key has one owner; a later install replaces the earlier handler.
//! A type match beats an extension match.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use preload_core::{CompleteHandler, Placeholder, ResourceType};

/// What a plugin is asked about.
#[derive(Debug, Clone)]
pub struct PluginRequest {
    pub src: String,
    pub resource_type: ResourceType,
    pub id: String,
    pub data: Option<serde_json::Value>,
}

/// Selective changes a plugin applies to an item.
///
/// Unset fields leave the item as it is.
#[derive(Debug, Clone, Default)]
pub struct ItemOverride {
    pub src: Option<String>,
    pub id: Option<String>,
    pub placeholder: Option<Placeholder>,
    pub resource_type: Option<ResourceType>,
    pub complete_handler: Option<CompleteHandler>,
}

impl ItemOverride {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_src(mut self, src: impl Into<String>) -> Self {
        self.src = Some(src.into());
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_placeholder(mut self, placeholder: Placeholder) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    #[must_use]
    pub const fn with_type(mut self, resource_type: ResourceType) -> Self {
        self.resource_type = Some(resource_type);
        self
    }

    #[must_use]
    pub fn with_complete_handler(mut self, handler: CompleteHandler) -> Self {
        self.complete_handler = Some(handler);
        self
    }
}

/// A plugin's verdict on an item.
#[derive(Debug, Clone)]
pub enum PluginDecision {
    /// Drop the item; it is never enqueued.
    Skip,
    /// Keep the item unchanged.
    Proceed,
    /// Keep the item with changes.
    Override(ItemOverride),
}

/// Handler invoked during normalization.
///
/// Any `Fn(&PluginRequest) -> PluginDecision` closure is a handler.
pub trait PluginHandler: Send + Sync {
    fn handle(&self, request: &PluginRequest) -> PluginDecision;
}

impl<F> PluginHandler for F
where
    F: Fn(&PluginRequest) -> PluginDecision + Send + Sync,
{
    fn handle(&self, request: &PluginRequest) -> PluginDecision {
        self(request)
    }
}

/// A plugin and the keys it claims.
#[derive(Clone)]
pub struct PluginDescriptor {
    pub types: Vec<ResourceType>,
    pub extensions: Vec<String>,
    pub handler: Arc<dyn PluginHandler>,
}

impl PluginDescriptor {
    pub fn new(handler: impl PluginHandler + 'static) -> Self {
        Self {
            types: Vec::new(),
            extensions: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    #[must_use]
    pub fn with_types(mut self, types: impl IntoIterator<Item = ResourceType>) -> Self {
        self.types.extend(types);
        self
    }

    #[must_use]
    pub fn with_extensions<S: Into<String>>(mut self, extensions: impl IntoIterator<Item = S>) -> Self {
        self.extensions.extend(extensions.into_iter().map(Into::into));
        self
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("types", &self.types)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

/// Registered plugins, owned by one queue.
#[derive(Default)]
pub struct PluginRegistry {
    by_type: HashMap<ResourceType, Arc<dyn PluginHandler>>,
    by_extension: HashMap<String, Arc<dyn PluginHandler>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin for every type and extension it names.
    pub fn install(&mut self, descriptor: PluginDescriptor) {
        for resource_type in descriptor.types {
            self.by_type
                .insert(resource_type, Arc::clone(&descriptor.handler));
        }
        for extension in descriptor.extensions {
            let extension = extension.trim_start_matches('.').to_ascii_lowercase();
            self.by_extension
                .insert(extension, Arc::clone(&descriptor.handler));
        }
    }

    /// Find the handler for an item, type first.
    pub fn lookup(
        &self,
        resource_type: ResourceType,
        extension: Option<&str>,
    ) -> Option<&Arc<dyn PluginHandler>> {
        self.by_type.get(&resource_type).or_else(|| {
            extension.and_then(|ext| self.by_extension.get(&ext.to_ascii_lowercase()))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty() && self.by_extension.is_empty()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("types", &self.by_type.keys().collect::<Vec<_>>())
            .field("extensions", &self.by_extension.keys().collect::<Vec<_>>())
            .finish()
    }
}
