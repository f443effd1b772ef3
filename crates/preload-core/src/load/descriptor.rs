//! Resource descriptors as handed to the queue.
//!
//! A descriptor is either a bare source string or a structured object. The
//! normalizer resolves either shape into a [`LoadItem`](super::LoadItem)
//! exactly once; nothing downstream sees a descriptor.

use serde::{Deserialize, Serialize};

use super::types::{CompleteHandler, Placeholder, ResourceType};

/// A caller-supplied resource description.
///
/// Deserializes from either a JSON string or a JSON object:
///
/// ```
/// use preload_core::Descriptor;
///
/// let list: Vec<Descriptor> =
///     serde_json::from_str(r#"["a.png", {"src": "b.json", "id": "config"}]"#).unwrap();
/// assert_eq!(list[0].src(), "a.png");
/// assert_eq!(list[1].src(), "b.json");
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Descriptor {
    /// A bare source locator.
    Source(String),
    /// A structured description.
    Structured(StructuredDescriptor),
}

impl Descriptor {
    /// The raw source string.
    #[must_use]
    pub fn src(&self) -> &str {
        match self {
            Self::Source(src) => src,
            Self::Structured(s) => &s.src,
        }
    }

    /// Resolve into the structured shape.
    #[must_use]
    pub fn into_structured(self) -> StructuredDescriptor {
        match self {
            Self::Source(src) => StructuredDescriptor::new(src),
            Self::Structured(s) => s,
        }
    }
}

impl From<&str> for Descriptor {
    fn from(src: &str) -> Self {
        Self::Source(src.to_string())
    }
}

impl From<String> for Descriptor {
    fn from(src: String) -> Self {
        Self::Source(src)
    }
}

impl From<StructuredDescriptor> for Descriptor {
    fn from(structured: StructuredDescriptor) -> Self {
        Self::Structured(structured)
    }
}

/// Structured form of a descriptor.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StructuredDescriptor {
    /// Resource locator.
    pub src: String,
    /// Explicit lookup key (defaults to `src`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Explicit type; inferred from the extension when absent.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<ResourceType>,
    /// Arbitrary caller data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Surface completion in enqueue order.
    #[serde(default)]
    pub maintain_order: bool,
    /// Per-item override of the queue's strategy preference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefer_network: Option<bool>,
    /// Host tag to load into.
    #[serde(skip)]
    pub placeholder: Option<Placeholder>,
    /// Callback for this item's completion.
    #[serde(skip)]
    pub complete_handler: Option<CompleteHandler>,
}

impl StructuredDescriptor {
    /// Create a descriptor for a source.
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            ..Self::default()
        }
    }

    /// Set an explicit id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set an explicit type.
    #[must_use]
    pub const fn with_type(mut self, resource_type: ResourceType) -> Self {
        self.resource_type = Some(resource_type);
        self
    }

    /// Attach caller data.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Supply the placeholder to load into.
    #[must_use]
    pub fn with_placeholder(mut self, placeholder: Placeholder) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    /// Attach a completion callback.
    #[must_use]
    pub fn with_complete_handler(mut self, handler: CompleteHandler) -> Self {
        self.complete_handler = Some(handler);
        self
    }

    /// Request in-order completion for this item.
    #[must_use]
    pub const fn with_maintain_order(mut self, maintain: bool) -> Self {
        self.maintain_order = maintain;
        self
    }

    /// Override the strategy preference for this item.
    #[must_use]
    pub const fn with_prefer_network(mut self, prefer: bool) -> Self {
        self.prefer_network = Some(prefer);
        self
    }
}
