//! Results of a finished load.
//!
//! Every completed item keeps two values: the raw payload as fetched and a
//! formatted value ready for use. Both are cheap to clone.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use super::types::TagKind;
use crate::ports::HostElement;

/// Undecoded payload.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum RawContent {
    /// Text payload.
    Text(Arc<str>),
    /// Binary payload.
    Bytes(Bytes),
    /// Nothing was read (host-element loads).
    #[default]
    Empty,
}

impl RawContent {
    /// Payload size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Bytes(bytes) => bytes.len(),
            Self::Empty => 0,
        }
    }

    /// Whether there is no payload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Text view, if this is a text payload.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// A decoded image tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageTag {
    pub width: u32,
    pub height: u32,
    /// Detected format name (e.g. "png"), if recognised.
    pub format: Option<String>,
    pub bytes: Bytes,
}

/// A materialized script tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptTag {
    pub source: String,
}

/// A materialized style tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleTag {
    pub css: String,
}

/// A materialized SVG tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SvgTag {
    pub markup: String,
    /// Parsed document, `None` if the markup was malformed.
    pub document: Option<XmlDocument>,
}

/// A parsed XML document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmlDocument {
    pub root: XmlElement,
}

/// An XML element with its attributes and children.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

/// A node inside an XML element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

impl XmlElement {
    /// Look up an attribute value.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Child elements with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter_map(move |node| match node {
            XmlNode::Element(el) if el.name == name => Some(el),
            _ => None,
        })
    }

    /// Concatenated direct text content.
    #[must_use]
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                XmlNode::Text(t) => Some(t.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }
}

/// Handle to a host element that finished loading.
#[derive(Clone)]
pub struct ElementHandle {
    element: Arc<dyn HostElement>,
    src: String,
}

impl ElementHandle {
    /// Wrap a loaded host element.
    pub fn new(element: Arc<dyn HostElement>, src: impl Into<String>) -> Self {
        Self {
            element,
            src: src.into(),
        }
    }

    /// The loaded element.
    #[must_use]
    pub fn element(&self) -> &Arc<dyn HostElement> {
        &self.element
    }

    /// Source assigned to the element.
    #[must_use]
    pub fn src(&self) -> &str {
        &self.src
    }

    /// Tag kind of the element.
    #[must_use]
    pub fn kind(&self) -> TagKind {
        self.element.kind()
    }
}

impl PartialEq for ElementHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.element, &other.element) && self.src == other.src
    }
}

impl fmt::Debug for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementHandle")
            .field("kind", &self.kind())
            .field("src", &self.src)
            .finish()
    }
}

/// Decoded, ready-to-use value of a finished load.
#[derive(Clone, Debug, PartialEq)]
pub enum Formatted {
    Text(Arc<str>),
    /// `None` when the payload was not valid JSON.
    Json(Option<Arc<serde_json::Value>>),
    /// `None` when the payload was not well-formed XML.
    Xml(Option<Arc<XmlDocument>>),
    Binary(Bytes),
    Image(Arc<ImageTag>),
    Script(Arc<ScriptTag>),
    Style(Arc<StyleTag>),
    Svg(Arc<SvgTag>),
    Element(ElementHandle),
}

impl Formatted {
    /// Parsed JSON value, if this is a JSON result that parsed.
    #[must_use]
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(Some(value)) => Some(value),
            _ => None,
        }
    }

    /// Whether this value is a tag-like object.
    #[must_use]
    pub const fn is_tag(&self) -> bool {
        matches!(
            self,
            Self::Image(_) | Self::Script(_) | Self::Style(_) | Self::Svg(_) | Self::Element(_)
        )
    }
}

/// Both results of a finished load.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadOutput {
    pub raw: RawContent,
    pub formatted: Formatted,
}

impl LoadOutput {
    /// Bundle raw and formatted results.
    #[must_use]
    pub const fn new(raw: RawContent, formatted: Formatted) -> Self {
        Self { raw, formatted }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_element() -> XmlElement {
        XmlElement {
            name: "sprites".to_string(),
            attributes: vec![("version".to_string(), "2".to_string())],
            children: vec![
                XmlNode::Text("hello ".to_string()),
                XmlNode::Element(XmlElement {
                    name: "frame".to_string(),
                    ..XmlElement::default()
                }),
                XmlNode::Text("world".to_string()),
                XmlNode::Element(XmlElement {
                    name: "frame".to_string(),
                    ..XmlElement::default()
                }),
            ],
        }
    }

    #[test]
    fn test_xml_helpers() {
        let el = sample_element();
        assert_eq!(el.attribute("version"), Some("2"));
        assert_eq!(el.attribute("missing"), None);
        assert_eq!(el.children_named("frame").count(), 2);
        assert_eq!(el.text(), "hello world");
    }

    #[test]
    fn test_raw_content_len() {
        assert_eq!(RawContent::Text(Arc::from("abc")).len(), 3);
        assert_eq!(RawContent::Bytes(Bytes::from_static(b"\x00\x01")).len(), 2);
        assert!(RawContent::Empty.is_empty());
        assert_eq!(RawContent::Text(Arc::from("x")).as_text(), Some("x"));
    }

    #[test]
    fn test_formatted_json_accessor() {
        let parsed = Formatted::Json(Some(Arc::new(serde_json::json!({"a": 1}))));
        assert_eq!(parsed.as_json().unwrap()["a"], 1);
        assert!(Formatted::Json(None).as_json().is_none());
        assert!(!parsed.is_tag());
    }
}
