//! Statement at-rules: `@import`, `@charset` and `@namespace`

use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use crate::comment::Comment;
use crate::error::{CssError, CssResult, SourceLocation};
use crate::output::OutputFormat;
use crate::scanner::{Scanner, Until};
use crate::value::{parse_primitive_value, CssString, CssUrl, Value};

static KEYFRAMES_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(-\w+-)?keyframes$").expect("valid keyframes pattern"));

/// At-rules whose body is a nested list of rules rather than declarations
const BLOCK_RULES: [&str; 5] = ["media", "document", "supports", "region-style", "font-feature-values"];

/// Does `identifier` name `rule`, optionally with a vendor prefix?
pub fn identifier_is(identifier: &str, rule: &str) -> bool {
    let lower = identifier.to_ascii_lowercase();
    if lower == rule {
        return true;
    }
    // -vendor-rule
    lower
        .strip_suffix(rule)
        .and_then(|prefix| prefix.strip_prefix('-'))
        .and_then(|vendor| vendor.strip_suffix('-'))
        .map(|vendor| !vendor.is_empty() && vendor.chars().all(|c| c.is_alphanumeric() || c == '_'))
        .unwrap_or(false)
}

pub fn is_keyframes(identifier: &str) -> bool {
    KEYFRAMES_NAME.is_match(identifier)
}

/// Whether the at-rule body holds nested rules (`@media`) instead of declarations
pub fn is_block_rule(identifier: &str) -> bool {
    BLOCK_RULES.iter().any(|rule| identifier_is(identifier, rule))
}

/// Consume the rest of a statement, including its `;`
fn finish_statement(scanner: &mut Scanner) -> CssResult<()> {
    let mut comments = Vec::new();
    scanner.consume_until(Until::any_of(&[';']).or_eof().consuming_end(), &mut comments)?;
    Ok(())
}

/// `@import url(...) media;`
#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub url: CssUrl,
    pub media_query: Option<String>,
    pub comments: Vec<Comment>,
    pub location: Option<SourceLocation>,
}

impl Import {
    pub fn new(url: CssUrl, media_query: Option<String>) -> Self {
        Self { url, media_query, comments: Vec::new(), location: None }
    }

    /// Parse the part after `@import`
    pub fn parse_body(scanner: &mut Scanner, location: SourceLocation) -> CssResult<Self> {
        let url = CssUrl::parse(scanner)?;
        scanner.consume_white_space()?;
        let mut media_query = None;
        if !scanner.comes(";") {
            let mut comments = Vec::new();
            let query = scanner.consume_until(Until::any_of(&[';']).or_eof(), &mut comments)?;
            let query = query.trim();
            if !query.is_empty() {
                media_query = Some(query.to_string());
            }
        }
        finish_statement(scanner)?;
        Ok(Self { url, media_query, comments: Vec::new(), location: Some(location) })
    }

    pub fn render(&self, format: &OutputFormat) -> String {
        let mut out = format.formatter().comments(&self.comments);
        out.push_str("@import ");
        out.push_str(&self.url.render(format));
        if let Some(query) = &self.media_query {
            out.push(' ');
            out.push_str(query);
        }
        out.push(';');
        out
    }

    pub fn to_array(&self) -> serde_json::Value {
        json!({
            "class": "Import",
            "url": self.url.to_array(),
            "media_query": self.media_query,
            "comments": self.comments,
        })
    }
}

/// `@charset "utf-8";`
#[derive(Debug, Clone, PartialEq)]
pub struct Charset {
    pub charset: CssString,
    pub comments: Vec<Comment>,
    pub location: Option<SourceLocation>,
}

impl Charset {
    pub fn new(charset: impl Into<String>) -> Self {
        Self { charset: CssString::new(charset), comments: Vec::new(), location: None }
    }

    pub fn name(&self) -> &str {
        &self.charset.text
    }

    pub fn parse_body(scanner: &mut Scanner, location: SourceLocation) -> CssResult<Self> {
        let charset = CssString::parse(scanner)?;
        scanner.consume_white_space()?;
        finish_statement(scanner)?;
        Ok(Self { charset, comments: Vec::new(), location: Some(location) })
    }

    pub fn render(&self, format: &OutputFormat) -> String {
        format!(
            "{}@charset {};",
            format.formatter().comments(&self.comments),
            self.charset.render(format)
        )
    }

    pub fn to_array(&self) -> serde_json::Value {
        json!({
            "class": "Charset",
            "charset": self.charset.to_array(),
            "comments": self.comments,
        })
    }
}

/// `@namespace [prefix] url;`
#[derive(Debug, Clone, PartialEq)]
pub struct Namespace {
    pub prefix: Option<String>,
    /// Either a string or a `url()`
    pub url: Value,
    pub comments: Vec<Comment>,
    pub location: Option<SourceLocation>,
}

impl Namespace {
    pub fn new(prefix: Option<String>, url: Value) -> Self {
        Self { prefix, url, comments: Vec::new(), location: None }
    }

    pub fn parse_body(scanner: &mut Scanner, location: SourceLocation) -> CssResult<Self> {
        let mut prefix = None;
        let mut url = parse_primitive_value(scanner)?;
        scanner.consume_white_space()?;
        if !scanner.comes(";") && !scanner.is_end() {
            prefix = Some(url);
            url = parse_primitive_value(scanner)?;
        }
        finish_statement(scanner)?;

        let prefix = match prefix {
            None => None,
            Some(Value::Ident(name)) => Some(name),
            Some(other) => {
                return Err(CssError::custom(
                    format!("Wrong namespace prefix \"{}\"", other.render(&OutputFormat::default())),
                    location,
                ))
            }
        };
        if !matches!(url, Value::String(_) | Value::Url(_)) {
            return Err(CssError::custom(
                format!("Wrong namespace url of invalid type \"{}\"", url.render(&OutputFormat::default())),
                location,
            ));
        }
        Ok(Self { prefix, url, comments: Vec::new(), location: Some(location) })
    }

    pub fn render(&self, format: &OutputFormat) -> String {
        let mut out = format.formatter().comments(&self.comments);
        out.push_str("@namespace ");
        if let Some(prefix) = &self.prefix {
            out.push_str(prefix);
            out.push(' ');
        }
        out.push_str(&self.url.render(format));
        out.push(';');
        out
    }

    pub fn to_array(&self) -> serde_json::Value {
        json!({
            "class": "Namespace",
            "prefix": self.prefix,
            "url": self.url.to_array(),
            "comments": self.comments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ParserSettings;

    fn scanner(input: &str) -> Scanner {
        Scanner::new(input, &ParserSettings::default())
    }

    #[test]
    fn test_identifier_is() {
        assert!(identifier_is("media", "media"));
        assert!(identifier_is("-moz-document", "document"));
        assert!(identifier_is("SUPPORTS", "supports"));
        assert!(!identifier_is("mediax", "media"));
        assert!(!identifier_is("--media", "media"));
        assert!(is_keyframes("-webkit-keyframes"));
        assert!(!is_keyframes("keyframes-x"));
        assert!(is_block_rule("-moz-document"));
        assert!(!is_block_rule("font-face"));
    }

    #[test]
    fn test_import_with_media() {
        let mut s = scanner("url(\"a.css\") screen and (min-width: 10px);.next");
        let import = Import::parse_body(&mut s, SourceLocation::default()).unwrap();
        assert_eq!(import.media_query.as_deref(), Some("screen and (min-width: 10px)"));
        assert_eq!(
            import.render(&OutputFormat::default()),
            "@import url(\"a.css\") screen and (min-width: 10px);"
        );
        assert!(s.comes(".next"));
    }

    #[test]
    fn test_import_bare_string() {
        let mut s = scanner("'b.css';");
        let import = Import::parse_body(&mut s, SourceLocation::default()).unwrap();
        assert_eq!(import.url.url.text, "b.css");
        assert_eq!(import.media_query, None);
        assert_eq!(import.render(&OutputFormat::default()), "@import url(\"b.css\");");
    }

    #[test]
    fn test_charset() {
        let mut s = scanner("\"UTF-8\" ;");
        let charset = Charset::parse_body(&mut s, SourceLocation::default()).unwrap();
        assert_eq!(charset.name(), "UTF-8");
        assert_eq!(charset.render(&OutputFormat::default()), "@charset \"UTF-8\";");
        assert!(s.is_end());
    }

    #[test]
    fn test_namespace() {
        let mut s = scanner("svg url(http://www.w3.org/2000/svg);");
        let namespace = Namespace::parse_body(&mut s, SourceLocation::default()).unwrap();
        assert_eq!(namespace.prefix.as_deref(), Some("svg"));
        assert_eq!(
            namespace.render(&OutputFormat::default()),
            "@namespace svg url(\"http://www.w3.org/2000/svg\");"
        );

        let mut s = scanner("\"http://www.w3.org/1999/xhtml\";");
        let namespace = Namespace::parse_body(&mut s, SourceLocation::default()).unwrap();
        assert_eq!(namespace.prefix, None);
    }

    #[test]
    fn test_namespace_rejects_bad_url() {
        let mut s = scanner("svg 12px;");
        let err = Namespace::parse_body(&mut s, SourceLocation::default()).unwrap_err();
        assert!(err.is_unexpected_token());
    }
}
