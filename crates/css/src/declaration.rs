//! Declarations (`property: value !important;`)

use serde_json::json;
use smallvec::SmallVec;

use crate::comment::Comment;
use crate::error::{CssError, CssResult, MatchKind, SourceLocation};
use crate::output::OutputFormat;
use crate::scanner::Scanner;
use crate::value::{delimiters_for_property, parse_value, Value};

/// A CSS declaration (property: value)
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// Property name, lowercased unless it is a custom property
    pub property: String,
    pub value: Value,
    /// Whether !important was specified
    pub important: bool,
    /// Legacy `\9`/`\0` suffixes, kept without the backslash
    pub ie_hacks: SmallVec<[char; 2]>,
    pub comments: Vec<Comment>,
    pub location: Option<SourceLocation>,
}

impl Declaration {
    pub fn new(property: impl Into<String>, value: Value) -> Self {
        Self {
            property: property.into(),
            value,
            important: false,
            ie_hacks: SmallVec::new(),
            comments: Vec::new(),
            location: None,
        }
    }

    pub fn important(mut self, important: bool) -> Self {
        self.important = important;
        self
    }

    /// Parse a declaration and the semicolons after it
    pub fn parse(scanner: &mut Scanner) -> CssResult<Self> {
        let mut comments = scanner.consume_white_space()?;
        let location = scanner.location();

        // Custom properties keep their case
        let ignore_case = !scanner.comes("--");
        let property = scanner.parse_identifier(ignore_case)?;
        comments.extend(scanner.consume_white_space()?);
        scanner.consume(":")?;
        scanner.consume_white_space()?;

        let value = parse_value(scanner, delimiters_for_property(&property))?;

        let mut ie_hacks = SmallVec::new();
        if scanner.is_lenient() {
            while scanner.comes("\\") {
                scanner.consume("\\")?;
                ie_hacks.push(scanner.consume_char()?);
                scanner.consume_white_space()?;
            }
        }

        scanner.consume_white_space()?;
        let mut important = false;
        if scanner.comes("!") {
            scanner.consume("!")?;
            scanner.consume_white_space()?;
            if !scanner.comes_ignore_case("important") {
                return Err(CssError::unexpected_token(
                    "important",
                    scanner.peek(9, 0),
                    MatchKind::Literal,
                    scanner.location(),
                ));
            }
            scanner.consume_count("important".len())?;
            important = true;
        }

        scanner.consume_white_space()?;
        while scanner.comes(";") {
            scanner.consume(";")?;
        }

        Ok(Self {
            property,
            value,
            important,
            ie_hacks,
            comments,
            location: Some(location),
        })
    }

    /// Parse `text` as the new value, using this property's separator precedence
    pub fn set_value_str(&mut self, text: &str) -> CssResult<()> {
        self.value = Value::parse_str(text, &self.property)?;
        Ok(())
    }

    pub fn render(&self, format: &OutputFormat) -> String {
        let formatter = format.formatter();
        let mut out = format!(
            "{}{}:{}{}",
            formatter.comments(&self.comments),
            self.property,
            formatter.space_after_rule_name(),
            self.value.render(format)
        );
        if !self.ie_hacks.is_empty() {
            out.push_str(" \\");
            let hacks: Vec<String> = self.ie_hacks.iter().map(char::to_string).collect();
            out.push_str(&hacks.join("\\"));
        }
        if self.important {
            out.push_str(" !important");
        }
        out.push(';');
        out
    }

    pub fn to_array(&self) -> serde_json::Value {
        json!({
            "class": "Declaration",
            "property": self.property,
            "value": self.value.to_array(),
            "important": self.important,
            "ie_hacks": self.ie_hacks.iter().map(char::to_string).collect::<Vec<_>>(),
            "comments": self.comments,
        })
    }
}
