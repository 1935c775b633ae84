//! Strings and `url()` references

use serde_json::json;

use crate::error::{CssResult, SourceLocation};
use crate::output::OutputFormat;
use crate::scanner::{is_whitespace, Scanner};

/// A string, quoted or bare
#[derive(Debug, Clone, PartialEq)]
pub struct CssString {
    /// Decoded text, without quotes or escapes
    pub text: String,
    pub location: Option<SourceLocation>,
}

impl CssString {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), location: None }
    }

    /// Parse a quoted string, or a bare word up to whitespace or a bracket
    pub fn parse(scanner: &mut Scanner) -> CssResult<Self> {
        let location = scanner.location();
        let quote = match scanner.peek_char() {
            Some(c @ ('"' | '\'')) => {
                scanner.consume_char()?;
                Some(c)
            }
            _ => None,
        };

        let mut text = String::new();
        match quote {
            Some(quote) => {
                while scanner.peek_char() != Some(quote) {
                    if let Some(part) = scanner.parse_character(false)? {
                        text.push_str(&part);
                    }
                }
                scanner.consume_char()?;
            }
            None => {
                while let Some(c) = scanner.peek_char() {
                    if is_whitespace(c) || matches!(c, '{' | '}' | '(' | ')' | '<' | '>' | '[' | ']') {
                        break;
                    }
                    if let Some(part) = scanner.parse_character(false)? {
                        text.push_str(&part);
                    }
                }
            }
        }

        Ok(Self { text, location: Some(location) })
    }

    pub fn render(&self, format: &OutputFormat) -> String {
        let quote = format.string_quoting();
        let chars: Vec<char> = self.text.chars().collect();
        let mut out = String::with_capacity(self.text.len() + 2);
        out.push(quote);
        for (i, &c) in chars.iter().enumerate() {
            if c == quote || c == '\\' {
                out.push('\\');
                out.push(c);
            } else if (' '..='~').contains(&c) {
                out.push(c);
            } else {
                out.push_str(&format!("\\{:x}", c as u32));
                let ambiguous = chars
                    .get(i + 1)
                    .map(|next| next.is_ascii_hexdigit() || is_whitespace(*next))
                    .unwrap_or(false);
                if ambiguous {
                    out.push(' ');
                }
            }
        }
        out.push(quote);
        out
    }

    pub fn to_array(&self) -> serde_json::Value {
        json!({ "class": "CssString", "contents": self.text })
    }
}

/// A `url(...)` reference
#[derive(Debug, Clone, PartialEq)]
pub struct CssUrl {
    pub url: CssString,
    pub location: Option<SourceLocation>,
}

impl CssUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: CssString::new(url), location: None }
    }

    /// Parse `url(...)`, or a bare string standing in for one (as in `@import "a.css"`)
    pub fn parse(scanner: &mut Scanner) -> CssResult<Self> {
        let location = scanner.location();
        let anchor = scanner.anchor();

        let mut identifier = String::new();
        for _ in 0..3 {
            match scanner.parse_character(true) {
                Ok(Some(part)) => identifier.push_str(&part),
                _ => break,
            }
        }
        let functional = identifier.eq_ignore_ascii_case("url");
        if functional {
            scanner.consume_white_space()?;
            scanner.consume("(")?;
        } else {
            scanner.backtrack(anchor);
        }

        scanner.consume_white_space()?;
        let url = CssString::parse(scanner)?;
        if functional {
            scanner.consume_white_space()?;
            scanner.consume(")")?;
        }

        Ok(Self { url, location: Some(location) })
    }

    pub fn render(&self, format: &OutputFormat) -> String {
        format!("url({})", self.url.render(format))
    }

    pub fn to_array(&self) -> serde_json::Value {
        json!({ "class": "Url", "url": self.url.to_array() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CssError;
    use crate::settings::ParserSettings;

    fn scanner(input: &str) -> Scanner {
        Scanner::new(input, &ParserSettings::default())
    }

    #[test]
    fn test_quoted_string_escapes() {
        let mut s = scanner(r#""a\"b\41 c" rest"#);
        let string = CssString::parse(&mut s).unwrap();
        assert_eq!(string.text, "a\"bAc");
        assert!(s.comes(" rest"));
    }

    #[test]
    fn test_unterminated_string() {
        let mut s = scanner("'never closed");
        assert!(matches!(CssString::parse(&mut s), Err(CssError::UnexpectedEof { .. })));
    }

    #[test]
    fn test_bare_string_stops_at_structure() {
        let mut s = scanner("foo.png) x");
        assert_eq!(CssString::parse(&mut s).unwrap().text, "foo.png");
        assert!(s.comes(")"));
    }

    #[test]
    fn test_render_escapes() {
        let format = OutputFormat::default();
        assert_eq!(CssString::new("say \"hi\"").render(&format), r#""say \"hi\"""#);
        assert_eq!(CssString::new("a\\b").render(&format), r#""a\\b""#);
        assert_eq!(CssString::new("line\nbreak").render(&format), r#""line\a break""#);
        assert_eq!(CssString::new("caf\u{e9}").render(&format), r#""caf\e9""#);
        assert_eq!(CssString::new("\u{e9}a").render(&format), r#""\e9 a""#);
        assert_eq!(CssString::new("\u{e9}!").render(&format), r#""\e9!""#);
    }

    #[test]
    fn test_render_single_quotes() {
        let mut format = OutputFormat::default();
        format.set_string_quoting('\'');
        assert_eq!(CssString::new("it's \"x\"").render(&format), r#"'it\'s "x"'"#);
    }

    #[test]
    fn test_url_forms() {
        let mut s = scanner("url( 'a.png' )");
        assert_eq!(CssUrl::parse(&mut s).unwrap().url.text, "a.png");
        assert!(s.is_end());

        let mut s = scanner("URL(b.png)");
        assert_eq!(CssUrl::parse(&mut s).unwrap().url.text, "b.png");

        let mut s = scanner("\"c.css\" screen");
        let url = CssUrl::parse(&mut s).unwrap();
        assert_eq!(url.url.text, "c.css");
        assert!(s.comes(" screen"));
    }

    #[test]
    fn test_url_render() {
        assert_eq!(CssUrl::new("x.png").render(&OutputFormat::default()), "url(\"x.png\")");
    }
}
