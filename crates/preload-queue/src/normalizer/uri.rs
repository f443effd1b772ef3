//! Source parsing.

use std::sync::LazyLock;

use regex::Regex;

use preload_core::{LoadError, LoadResult};

static SOURCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?P<protocol>[A-Za-z][\w+.-]*:)//(?P<domain>[^/?#\s]+))?(?P<path>(?:[^?#\s]*/)?)(?P<file>[^/?#\s]*?)(?:\.(?P<ext>\w+))?(?:\?(?P<query>[^#\s]*))?(?:#\S*)?$",
    )
    .expect("source pattern is a valid regex")
});

/// Components of a resource source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceParts {
    /// Scheme including the colon, e.g. `https:`
    pub protocol: Option<String>,
    pub domain: Option<String>,
    /// Directory part, ending in `/` when present
    pub path: String,
    /// File name without extension
    pub file: String,
    /// Lower-cased extension
    pub extension: Option<String>,
    pub query: Option<String>,
}

/// Split a source into its components.
///
/// Empty sources and sources containing whitespace are rejected.
pub fn parse_source(src: &str) -> LoadResult<SourceParts> {
    if src.is_empty() || src.chars().any(char::is_whitespace) {
        return Err(LoadError::invalid_source(src));
    }
    let captures = SOURCE_PATTERN
        .captures(src)
        .ok_or_else(|| LoadError::invalid_source(src))?;

    let text = |name: &str| captures.name(name).map(|m| m.as_str().to_string());
    Ok(SourceParts {
        protocol: text("protocol"),
        domain: text("domain"),
        path: text("path").unwrap_or_default(),
        file: text("file").unwrap_or_default(),
        extension: text("ext").map(|e| e.to_ascii_lowercase()),
        query: text("query"),
    })
}

/// Whether a base path applies: no protocol and not rooted.
pub fn is_relative(src: &str) -> bool {
    !src.starts_with('/')
        && SOURCE_PATTERN
            .captures(src)
            .is_none_or(|c| c.name("protocol").is_none())
}

/// Prefix a relative source with a base path.
pub fn join_base(base: &str, src: &str) -> String {
    if base.is_empty() || !is_relative(src) {
        return src.to_string();
    }
    if base.ends_with('/') {
        format!("{base}{src}")
    } else {
        format!("{base}/{src}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_url() {
        let parts = parse_source("https://cdn.example.com/img/Hero.PNG?v=2#top").unwrap();
        assert_eq!(parts.protocol.as_deref(), Some("https:"));
        assert_eq!(parts.domain.as_deref(), Some("cdn.example.com"));
        assert_eq!(parts.path, "/img/");
        assert_eq!(parts.file, "Hero");
        assert_eq!(parts.extension.as_deref(), Some("png"));
        assert_eq!(parts.query.as_deref(), Some("v=2"));
    }

    #[test]
    fn test_relative_path() {
        let parts = parse_source("sounds/theme.mp3").unwrap();
        assert!(parts.protocol.is_none());
        assert_eq!(parts.path, "sounds/");
        assert_eq!(parts.file, "theme");
        assert_eq!(parts.extension.as_deref(), Some("mp3"));
    }

    #[test]
    fn test_last_dot_is_extension() {
        let parts = parse_source("archive.tar.gz").unwrap();
        assert_eq!(parts.file, "archive.tar");
        assert_eq!(parts.extension.as_deref(), Some("gz"));
    }

    #[test]
    fn test_no_extension() {
        let parts = parse_source("https://api.test/levels").unwrap();
        assert_eq!(parts.file, "levels");
        assert!(parts.extension.is_none());
    }

    #[test]
    fn test_invalid_sources() {
        assert_eq!(parse_source(""), Err(LoadError::invalid_source("")));
        assert!(parse_source("my file.png").is_err());
        assert!(parse_source("a.png\n").is_err());
    }

    #[test]
    fn test_base_path_only_for_relative() {
        assert_eq!(join_base("assets/", "a.png"), "assets/a.png");
        assert_eq!(join_base("https://cdn.test", "a.png"), "https://cdn.test/a.png");
        assert_eq!(join_base("assets/", "/root.png"), "/root.png");
        assert_eq!(
            join_base("assets/", "https://x.test/a.png"),
            "https://x.test/a.png"
        );
        assert_eq!(join_base("", "a.png"), "a.png");
    }
}
