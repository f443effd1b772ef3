//! Payload decoding for the network strategy.
//!
//! Parse failures of structured text never fail a load: malformed JSON or
//! XML yields `None` in the formatted value. Images are the exception since
//! a tag that cannot decode is unusable.

use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use preload_core::{
    Formatted, ImageTag, LoadError, LoadItem, LoadOutput, LoadResult, RawContent, ResourceType,
    ScriptTag, StyleTag, SvgTag, XmlDocument, XmlElement, XmlNode,
};
use preload_http::Body;

/// Turn a fetched body into the item's output.
///
/// Images are decoded on the blocking pool before the load completes.
pub async fn format_body(item: &LoadItem, body: Body) -> LoadResult<LoadOutput> {
    match body {
        Body::Text(text) => Ok(format_text(item.resource_type, text)),
        Body::Binary(bytes) => format_binary(item, bytes).await,
    }
}

fn format_text(resource_type: ResourceType, text: String) -> LoadOutput {
    let formatted = match resource_type {
        ResourceType::Json | ResourceType::Manifest => {
            Formatted::Json(serde_json::from_str(&text).ok().map(Arc::new))
        }
        ResourceType::Xml => Formatted::Xml(parse_xml(&text).map(Arc::new)),
        ResourceType::Css => Formatted::Style(Arc::new(StyleTag { css: text.clone() })),
        ResourceType::Javascript => Formatted::Script(Arc::new(ScriptTag {
            source: text.clone(),
        })),
        ResourceType::Svg => Formatted::Svg(Arc::new(SvgTag {
            document: parse_xml(&text),
            markup: text.clone(),
        })),
        ResourceType::Image
        | ResourceType::Sound
        | ResourceType::Text
        | ResourceType::Binary => Formatted::Text(Arc::from(text.as_str())),
    };
    LoadOutput::new(RawContent::Text(Arc::from(text)), formatted)
}

async fn format_binary(item: &LoadItem, bytes: Bytes) -> LoadResult<LoadOutput> {
    if item.resource_type != ResourceType::Image {
        return Ok(LoadOutput::new(
            RawContent::Bytes(bytes.clone()),
            Formatted::Binary(bytes),
        ));
    }

    let probe_bytes = bytes.clone();
    let (width, height, format) = tokio::task::spawn_blocking(move || probe_image(&probe_bytes))
        .await
        .map_err(|e| LoadError::element(format!("image decode task failed: {e}")))?
        .map_err(|message| LoadError::element(format!("{}: {message}", item.src)))?;

    tracing::debug!(
        target: "preload.queue",
        id = %item.id,
        width,
        height,
        "decoded image header"
    );

    Ok(LoadOutput::new(
        RawContent::Bytes(bytes.clone()),
        Formatted::Image(Arc::new(ImageTag {
            width,
            height,
            format,
            bytes,
        })),
    ))
}

/// Read an image's dimensions and format without decoding pixels.
pub fn probe_image(bytes: &[u8]) -> Result<(u32, u32, Option<String>), String> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| e.to_string())?;
    let format = reader
        .format()
        .and_then(|f| f.extensions_str().first().copied())
        .map(str::to_string);
    let (width, height) = reader.into_dimensions().map_err(|e| e.to_string())?;
    Ok((width, height, format))
}

/// Parse XML into an owned document tree.
///
/// Returns `None` for malformed input, mismatched tags, or more than one
/// root element.
pub fn parse_xml(text: &str) -> Option<XmlDocument> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event().ok()? {
            Event::Start(start) => stack.push(element_from(&start)?),
            Event::Empty(start) => {
                let element = element_from(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack.pop()?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let text = text.unescape().ok()?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(XmlNode::Text(text.into_owned())),
                    None if text.trim().is_empty() => {}
                    None => return None,
                }
            }
            Event::CData(cdata) => {
                let text = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                stack.last_mut()?.children.push(XmlNode::Text(text));
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctype
            _ => {}
        }
    }

    if !stack.is_empty() {
        return None;
    }
    root.map(|root| XmlDocument { root })
}

fn element_from(start: &BytesStart<'_>) -> Option<XmlElement> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.ok()?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value().ok()?.into_owned();
        attributes.push((key, value));
    }
    Some(XmlElement {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) -> Option<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(XmlNode::Element(element));
        return Some(());
    }
    if root.is_some() {
        return None;
    }
    *root = Some(element);
    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 transparent PNG
    const PNG_1X1: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0B, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x60,
        0x00, 0x02, 0x00, 0x00, 0x05, 0x00, 0x01, 0x7A, 0x5E, 0xAB, 0x3F, 0x00, 0x00, 0x00, 0x00,
        0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];

    fn item(resource_type: ResourceType) -> LoadItem {
        LoadItem::new("x", resource_type)
    }

    #[tokio::test]
    async fn test_json_is_parsed() {
        let output = format_body(&item(ResourceType::Json), Body::Text(r#"{"a":1}"#.into()))
            .await
            .unwrap();
        assert_eq!(output.formatted.as_json().unwrap()["a"], 1);
        assert_eq!(output.raw.as_text(), Some(r#"{"a":1}"#));
    }

    #[tokio::test]
    async fn test_malformed_json_is_none() {
        let output = format_body(&item(ResourceType::Json), Body::Text("{oops".into()))
            .await
            .unwrap();
        assert_eq!(output.formatted, Formatted::Json(None));
    }

    #[tokio::test]
    async fn test_script_and_style_tags() {
        let script = format_body(&item(ResourceType::Javascript), Body::Text("let a;".into()))
            .await
            .unwrap();
        assert!(matches!(script.formatted, Formatted::Script(ref s) if s.source == "let a;"));

        let style = format_body(&item(ResourceType::Css), Body::Text("a{}".into()))
            .await
            .unwrap();
        assert!(style.formatted.is_tag());
    }

    #[tokio::test]
    async fn test_svg_keeps_markup_and_document() {
        let markup = r#"<svg xmlns="http://www.w3.org/2000/svg" width="4"><rect/></svg>"#;
        let output = format_body(&item(ResourceType::Svg), Body::Text(markup.into()))
            .await
            .unwrap();
        let Formatted::Svg(svg) = output.formatted else {
            panic!("expected svg tag");
        };
        assert_eq!(svg.markup, markup);
        let document = svg.document.as_ref().unwrap();
        assert_eq!(document.root.attribute("width"), Some("4"));
        assert_eq!(document.root.children_named("rect").count(), 1);
    }

    #[tokio::test]
    async fn test_binary_passes_through() {
        let output = format_body(
            &item(ResourceType::Binary),
            Body::Binary(Bytes::from_static(b"\x00\x01")),
        )
        .await
        .unwrap();
        assert_eq!(output.formatted, Formatted::Binary(Bytes::from_static(b"\x00\x01")));
    }

    #[tokio::test]
    async fn test_image_is_probed() {
        let output = format_body(
            &item(ResourceType::Image),
            Body::Binary(Bytes::from_static(PNG_1X1)),
        )
        .await
        .unwrap();
        let Formatted::Image(tag) = output.formatted else {
            panic!("expected image tag");
        };
        assert_eq!((tag.width, tag.height), (1, 1));
        assert_eq!(tag.format.as_deref(), Some("png"));
    }

    #[tokio::test]
    async fn test_undecodable_image_is_element_error() {
        let err = format_body(
            &item(ResourceType::Image),
            Body::Binary(Bytes::from_static(b"not an image")),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LoadError::Element { .. }));
    }

    #[test]
    fn test_parse_xml_tree() {
        let doc = parse_xml(
            r#"<?xml version="1.0"?>
            <!-- levels -->
            <levels count="2">
                <level id="1">Intro &amp; tutorial</level>
                <level id="2"><![CDATA[<boss>]]></level>
            </levels>"#,
        )
        .unwrap();

        assert_eq!(doc.root.name, "levels");
        assert_eq!(doc.root.attribute("count"), Some("2"));
        let levels: Vec<_> = doc.root.children_named("level").collect();
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].text(), "Intro & tutorial");
        assert_eq!(levels[1].text(), "<boss>");
    }

    #[test]
    fn test_parse_xml_rejects_malformed() {
        assert!(parse_xml("<a><b></a>").is_none());
        assert!(parse_xml("<a>").is_none());
        assert!(parse_xml("<a/><b/>").is_none());
        assert!(parse_xml("").is_none());
    }
}
