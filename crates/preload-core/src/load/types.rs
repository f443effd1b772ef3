//! Core domain types for loads.
//!
//! Pure data types with no I/O dependencies.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::errors::LoadError;
use super::output::LoadOutput;
use crate::ports::HostElement;

/// The kind of resource an item resolves to.
///
/// Drives both strategy selection and how the fetched payload is formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Image,
    Sound,
    #[default]
    Text,
    Json,
    Xml,
    Css,
    Javascript,
    Svg,
    Binary,
    /// A JSON list of further descriptors to enqueue.
    Manifest,
}

impl ResourceType {
    /// All known resource types.
    pub const ALL: [Self; 10] = [
        Self::Image,
        Self::Sound,
        Self::Text,
        Self::Json,
        Self::Xml,
        Self::Css,
        Self::Javascript,
        Self::Svg,
        Self::Binary,
        Self::Manifest,
    ];

    /// Infer a type from a file extension.
    ///
    /// Matching is case-insensitive. Unknown extensions map to `Text`.
    #[must_use]
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "bmp" | "webp" => Self::Image,
            "mp3" | "ogg" | "oga" | "wav" | "m4a" | "aac" | "mpeg" => Self::Sound,
            "json" => Self::Json,
            "xml" => Self::Xml,
            "css" => Self::Css,
            "js" => Self::Javascript,
            "svg" => Self::Svg,
            _ => Self::Text,
        }
    }

    /// String form used in descriptors and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Sound => "sound",
            Self::Text => "text",
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Css => "css",
            Self::Javascript => "javascript",
            Self::Svg => "svg",
            Self::Binary => "binary",
            Self::Manifest => "manifest",
        }
    }

    /// Whether the payload must be fetched as bytes rather than text.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        matches!(self, Self::Image | Self::Binary)
    }

    /// Whether this is a script resource.
    #[must_use]
    pub const fn is_script(&self) -> bool {
        matches!(self, Self::Javascript)
    }

    /// Whether this type may be loaded by either strategy.
    #[must_use]
    pub const fn supports_both_strategies(&self) -> bool {
        matches!(self, Self::Image | Self::Css | Self::Javascript | Self::Svg)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| LoadError::invalid_descriptor(format!("unknown resource type '{s}'")))
    }
}

/// The host tag shape a resource ends up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    Image,
    Audio,
    Script,
    Style,
    Svg,
    Generic,
}

impl TagKind {
    /// Tag kind conventionally used for a resource type.
    #[must_use]
    pub const fn for_type(resource_type: ResourceType) -> Self {
        match resource_type {
            ResourceType::Image => Self::Image,
            ResourceType::Sound => Self::Audio,
            ResourceType::Javascript => Self::Script,
            ResourceType::Css => Self::Style,
            ResourceType::Svg => Self::Svg,
            _ => Self::Generic,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Script => "script",
            Self::Style => "style",
            Self::Svg => "svg",
            Self::Generic => "generic",
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a placeholder, stable across clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaceholderId(u64);

impl PlaceholderId {
    fn generate() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// A host tag an item is loaded into.
///
/// Placeholders are only the *target* of a load. The finished value lives in
/// [`LoadOutput`], so mutating a placeholder never touches a cached result.
#[derive(Clone)]
pub struct Placeholder {
    id: PlaceholderId,
    kind: TagKind,
    element: Option<Arc<dyn HostElement>>,
}

impl Placeholder {
    /// Synthesize an empty placeholder of the given kind.
    #[must_use]
    pub fn new(kind: TagKind) -> Self {
        Self {
            id: PlaceholderId::generate(),
            kind,
            element: None,
        }
    }

    /// Wrap a host-provided element.
    pub fn with_element(element: Arc<dyn HostElement>) -> Self {
        Self {
            id: PlaceholderId::generate(),
            kind: element.kind(),
            element: Some(element),
        }
    }

    /// Placeholder identity.
    #[must_use]
    pub const fn id(&self) -> PlaceholderId {
        self.id
    }

    /// Tag kind.
    #[must_use]
    pub const fn kind(&self) -> TagKind {
        self.kind
    }

    /// The host element behind this placeholder, if any.
    #[must_use]
    pub fn element(&self) -> Option<&Arc<dyn HostElement>> {
        self.element.as_ref()
    }
}

impl PartialEq for Placeholder {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Placeholder {}

impl fmt::Debug for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Placeholder")
            .field("id", &self.id.0)
            .field("kind", &self.kind)
            .field("has_element", &self.element.is_some())
            .finish()
    }
}

/// Callback run when an item's completion is surfaced.
///
/// The queue invokes it while holding its internal lock, so the callback
/// must not await or block on the queue that loaded the item. Hand work that
/// needs the queue off to a channel or a spawned task instead.
#[derive(Clone)]
pub struct CompleteHandler(Arc<dyn Fn(&LoadItem, &LoadOutput) + Send + Sync>);

impl CompleteHandler {
    /// Wrap a callback.
    pub fn new(f: impl Fn(&LoadItem, &LoadOutput) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Invoke the callback.
    pub fn call(&self, item: &LoadItem, output: &LoadOutput) {
        (self.0)(item, output);
    }
}

impl fmt::Debug for CompleteHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompleteHandler(..)")
    }
}

/// Canonical description of a single resource to fetch.
///
/// Built by the normalizer; immutable once dispatched.
#[derive(Clone, Debug)]
pub struct LoadItem {
    /// Lookup key. Defaults to `src`.
    pub id: String,
    /// Resource locator.
    pub src: String,
    /// Declared or inferred resource type.
    pub resource_type: ResourceType,
    /// Lower-cased file extension, if the source has one.
    pub extension: Option<String>,
    /// Arbitrary caller data passed through to plugins and handlers.
    pub data: Option<serde_json::Value>,
    /// Host tag the item loads into.
    pub placeholder: Option<Placeholder>,
    /// Callback run when this item's completion is surfaced.
    pub complete_handler: Option<CompleteHandler>,
    /// Surface this item's completion in enqueue order.
    pub maintain_order: bool,
    /// Per-item override of the queue's `prefer_network` flag.
    pub prefer_network: Option<bool>,
}

impl LoadItem {
    /// Create an item with `id == src` and no extras.
    pub fn new(src: impl Into<String>, resource_type: ResourceType) -> Self {
        let src = src.into();
        Self {
            id: src.clone(),
            src,
            resource_type,
            extension: None,
            data: None,
            placeholder: None,
            complete_handler: None,
            maintain_order: false,
            prefer_network: None,
        }
    }

    /// Whether a lookup key refers to this item.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        self.id == key || self.src == key
    }
}
