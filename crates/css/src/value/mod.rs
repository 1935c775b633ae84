//! CSS Value Grammar
//!
//! A declaration value is read as a flat sequence of primitive values and separators,
//! then folded into nested [`ValueList`]s. Separators are folded in the order given by
//! the delimiter list, so the first one binds tightest.

mod color;
mod function;
mod list;
mod size;
mod string;

pub use color::Color;
pub use function::{CalcComponent, CalcFunction, CssFunction};
pub use list::{LineName, ValueList};
pub use size::Size;
pub use string::{CssString, CssUrl};

use serde_json::json;

use crate::error::{CssError, CssResult, MatchKind};
use crate::output::OutputFormat;
use crate::scanner::Scanner;
use crate::settings::ParserSettings;

/// Separator precedence for most properties
pub const DEFAULT_DELIMITERS: &[char] = &[',', ' ', '/'];
/// `font` and `font-*`: `12px/1.5` binds before the space-separated parts
pub const FONT_DELIMITERS: &[char] = &[',', '/', ' '];
/// `src` in `@font-face`
pub const SRC_DELIMITERS: &[char] = &[' ', ','];
/// Function arguments: `key=value` pairs, then words, then the argument list
pub const FUNCTION_ARGUMENT_DELIMITERS: &[char] = &['=', ' ', ','];
/// Legacy `progid:` filter arguments
pub const PROGID_DELIMITERS: &[char] = &[',', '='];

/// The separator precedence to use for a property's value
pub fn delimiters_for_property(property: &str) -> &'static [char] {
    if property == "font" || property.starts_with("font-") {
        FONT_DELIMITERS
    } else if property == "src" {
        SRC_DELIMITERS
    } else {
        DEFAULT_DELIMITERS
    }
}

/// A CSS value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Keyword or any other raw token (`auto`, `U+0025-00FF`, a lone `/`)
    Ident(String),
    Size(Size),
    String(CssString),
    Url(CssUrl),
    Color(Color),
    Function(CssFunction),
    Calc(CalcFunction),
    LineName(LineName),
    List(ValueList),
}

impl Value {
    /// Parse a standalone value, as it would appear after `property:`
    pub fn parse_str(input: &str, property: &str) -> CssResult<Self> {
        let mut scanner = Scanner::new(input, &ParserSettings::default());
        scanner.consume_white_space()?;
        parse_value(&mut scanner, delimiters_for_property(property))
    }

    pub fn ident(text: impl Into<String>) -> Self {
        Value::Ident(text.into())
    }

    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Value::Ident(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_size(&self) -> Option<&Size> {
        match self {
            Value::Size(size) => Some(size),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ValueList> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// Components of a list with `separator`, or this value alone
    pub fn split(&self, separator: char) -> Vec<&Value> {
        match self {
            Value::List(list) if list.separator == separator => list.components.iter().collect(),
            other => vec![other],
        }
    }

    pub fn render(&self, format: &OutputFormat) -> String {
        match self {
            Value::Ident(text) => text.clone(),
            Value::Size(size) => size.render(),
            Value::String(string) => string.render(format),
            Value::Url(url) => url.render(format),
            Value::Color(color) => color.render(format),
            Value::Function(function) => function.render(format),
            Value::Calc(calc) => calc.render(format),
            Value::LineName(names) => names.render(),
            Value::List(list) => list.render(format),
        }
    }

    pub fn to_array(&self) -> serde_json::Value {
        match self {
            Value::Ident(text) => json!({ "class": "Ident", "value": text }),
            Value::Size(size) => size.to_array(),
            Value::String(string) => string.to_array(),
            Value::Url(url) => url.to_array(),
            Value::Color(color) => color.to_array(),
            Value::Function(function) => function.to_array(),
            Value::Calc(calc) => calc.to_array(),
            Value::LineName(names) => names.to_array(),
            Value::List(list) => list.to_array(),
        }
    }

    /// Collect the non-list values inside this one. Functions are reported as a
    /// whole, and their arguments as well when `search_in_function_args` is set.
    pub fn collect_values<'a>(&'a self, search_in_function_args: bool, out: &mut Vec<&'a Value>) {
        match self {
            Value::List(list) => {
                for component in &list.components {
                    component.collect_values(search_in_function_args, out);
                }
            }
            Value::Function(function) => {
                out.push(self);
                if search_in_function_args {
                    for argument in &function.arguments.components {
                        argument.collect_values(true, out);
                    }
                }
            }
            Value::Calc(calc) => {
                out.push(self);
                if search_in_function_args {
                    for component in &calc.components {
                        if let CalcComponent::Operand(operand) = component {
                            operand.collect_values(true, out);
                        }
                    }
                }
            }
            other => out.push(other),
        }
    }

    /// Mutable counterpart of [`Value::collect_values`]
    pub fn visit_values_mut(&mut self, search_in_function_args: bool, visit: &mut dyn FnMut(&mut Value)) {
        match self {
            Value::List(list) => {
                for component in &mut list.components {
                    component.visit_values_mut(search_in_function_args, visit);
                }
            }
            Value::Function(_) | Value::Calc(_) => {
                visit(self);
                if !search_in_function_args {
                    return;
                }
                match self {
                    Value::Function(function) => {
                        for argument in &mut function.arguments.components {
                            argument.visit_values_mut(true, visit);
                        }
                    }
                    Value::Calc(calc) => {
                        for component in &mut calc.components {
                            if let CalcComponent::Operand(operand) = component {
                                operand.visit_values_mut(true, visit);
                            }
                        }
                    }
                    _ => {}
                }
            }
            other => visit(other),
        }
    }
}

impl From<Size> for Value {
    fn from(size: Size) -> Self {
        Value::Size(size)
    }
}

impl From<Color> for Value {
    fn from(color: Color) -> Self {
        Value::Color(color)
    }
}

impl From<CssString> for Value {
    fn from(string: CssString) -> Self {
        Value::String(string)
    }
}

impl From<CssUrl> for Value {
    fn from(url: CssUrl) -> Self {
        Value::Url(url)
    }
}

impl From<ValueList> for Value {
    fn from(list: ValueList) -> Self {
        Value::List(list)
    }
}

/// Parse a value up to `}`, `;`, `!`, `)`, `\` or the end of input.
///
/// `delimiters` lists the explicit separators in precedence order; an implicit space
/// separates primitives with no explicit separator between them.
pub fn parse_value(scanner: &mut Scanner, delimiters: &[char]) -> CssResult<Value> {
    let mut operands: Vec<Value> = Vec::new();
    let mut operators: Vec<char> = Vec::new();

    while !(scanner.is_end()
        || scanner.comes("}")
        || scanner.comes(";")
        || scanner.comes("!")
        || scanner.comes(")")
        || scanner.comes("\\"))
    {
        if !operands.is_empty() {
            let explicit = delimiters.iter().copied().find(|&d| scanner.peek_char() == Some(d));
            match explicit {
                Some(delimiter) => {
                    scanner.consume_char()?;
                    scanner.consume_white_space()?;
                    operators.push(delimiter);
                }
                None => operators.push(' '),
            }
        }
        operands.push(parse_primitive_value(scanner)?);
        scanner.consume_white_space()?;
    }

    if operands.is_empty() {
        return Err(CssError::unexpected_token(
            "value",
            scanner.peek(5, 0),
            MatchKind::Literal,
            scanner.location(),
        ));
    }

    let location = scanner.location();
    for &delimiter in delimiters {
        if operands.len() == 1 {
            break;
        }
        let (folded, remaining) = fold(operands, operators, delimiter);
        operands = folded;
        operators = remaining;
    }
    // A separator missing from the precedence list (an implicit space)
    while operands.len() > 1 {
        let delimiter = operators[0];
        let (folded, remaining) = fold(operands, operators, delimiter);
        operands = folded;
        operators = remaining;
    }

    let mut value = operands.pop().ok_or_else(|| CssError::custom("Empty value", location))?;
    if let Value::List(list) = &mut value {
        list.location.get_or_insert(location);
    }
    Ok(value)
}

/// Replace every run of operands joined by `delimiter` with one list
fn fold(operands: Vec<Value>, operators: Vec<char>, delimiter: char) -> (Vec<Value>, Vec<char>) {
    let mut operands = operands.into_iter();
    let mut out_operands = Vec::new();
    let mut out_operators = Vec::new();
    let Some(mut pending) = operands.next() else {
        return (out_operands, out_operators);
    };
    let mut in_run = false;

    for (operator, operand) in operators.into_iter().zip(operands) {
        if operator != delimiter {
            out_operands.push(std::mem::replace(&mut pending, operand));
            out_operators.push(operator);
            in_run = false;
            continue;
        }
        if in_run {
            if let Value::List(list) = &mut pending {
                list.components.push(operand);
            }
        } else {
            let first = std::mem::replace(&mut pending, Value::Ident(String::new()));
            pending = Value::List(ValueList::new(delimiter, vec![first, operand]));
            in_run = true;
        }
    }

    out_operands.push(pending);
    (out_operands, out_operators)
}

/// Parse a single value without separators
pub fn parse_primitive_value(scanner: &mut Scanner) -> CssResult<Value> {
    let value = if Size::comes(scanner) {
        Value::Size(Size::parse(scanner, false)?)
    } else if scanner.comes("#") {
        Color::parse(scanner)?
    } else if scanner.comes("'") || scanner.comes("\"") {
        Value::String(CssString::parse(scanner)?)
    } else if scanner.comes("progid:") && scanner.is_lenient() {
        Value::Function(CssFunction::parse_microsoft_filter(scanner)?)
    } else if scanner.comes("[") {
        Value::LineName(LineName::parse(scanner)?)
    } else if scanner.comes("U+") {
        Value::Ident(parse_unicode_range(scanner)?)
    } else {
        let next = scanner.peek_char();
        match parse_identifier_or_function(scanner, false) {
            Ok(value) => value,
            Err(err) if err.is_unexpected_token() => match next {
                Some(op @ ('+' | '-' | '*' | '/')) => {
                    scanner.consume_char()?;
                    Value::Ident(op.to_string())
                }
                _ => return Err(err),
            },
            Err(err) => return Err(err),
        }
    };
    scanner.consume_white_space()?;
    Ok(value)
}

/// An identifier, or a function call if `(` follows it
pub fn parse_identifier_or_function(scanner: &mut Scanner, ignore_case: bool) -> CssResult<Value> {
    let anchor = scanner.anchor();
    let name = scanner.parse_identifier(ignore_case)?;
    if !scanner.comes("(") {
        return Ok(Value::Ident(name));
    }

    scanner.backtrack(anchor);
    match name.to_ascii_lowercase().as_str() {
        "url" => CssUrl::parse(scanner).map(Value::Url),
        "rgb" | "rgba" | "hsl" | "hsla" => Color::parse(scanner),
        lower if CalcFunction::is_calc_name(lower) => CalcFunction::parse(scanner).map(Value::Calc),
        _ => CssFunction::parse(scanner, ignore_case).map(Value::Function),
    }
}

/// `U+0025-00FF`, `U+4??`
fn parse_unicode_range(scanner: &mut Scanner) -> CssResult<String> {
    scanner.consume("U+")?;
    let mut max_length = 6;
    let mut range = String::new();
    loop {
        if scanner.comes("-") {
            max_length = 13;
        }
        range.push(scanner.consume_char()?);
        let more = scanner
            .peek_char()
            .map(|c| c.is_ascii_hexdigit() || c == '?' || c == '-')
            .unwrap_or(false);
        if range.chars().count() >= max_length || !more {
            break;
        }
    }
    Ok(format!("U+{}", range))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str, property: &str) -> Value {
        Value::parse_str(input, property).unwrap()
    }

    fn render(value: &Value) -> String {
        value.render(&OutputFormat::default())
    }

    #[test]
    fn test_single_primitive() {
        assert_eq!(parse("auto", "width"), Value::ident("auto"));
        assert!(matches!(parse("12px", "width"), Value::Size(_)));
    }

    #[test]
    fn test_default_precedence() {
        // Comma is folded first: `b, c` becomes the middle operand of the space list
        let value = parse("a b, c d", "transition");
        let list = value.as_list().unwrap();
        assert_eq!(list.separator, ' ');
        assert_eq!(list.components.len(), 3);
        assert_eq!(list.components[1].as_list().map(|l| l.separator), Some(','));
        assert_eq!(render(&value), "a b,c d");
    }

    #[test]
    fn test_font_shorthand_precedence() {
        let value = parse("italic bold 12px/1.6 serif", "font");
        let list = value.as_list().unwrap();
        assert_eq!(list.separator, ' ');
        assert_eq!(list.components.len(), 4);
        let slash = list.components[2].as_list().unwrap();
        assert_eq!(slash.separator, '/');
        assert_eq!(slash.components.len(), 2);
        assert_eq!(render(&value), "italic bold 12px/1.6 serif");
    }

    #[test]
    fn test_font_family_list() {
        let value = parse("\"Helvetica Neue\", Arial, sans-serif", "font-family");
        let list = value.as_list().unwrap();
        assert_eq!(list.separator, ',');
        assert_eq!(list.components.len(), 3);
        assert_eq!(render(&value), "\"Helvetica Neue\",Arial,sans-serif");
    }

    #[test]
    fn test_src_precedence() {
        let value = parse("url(a.woff) format(\"woff\"), url(b.ttf)", "src");
        let list = value.as_list().unwrap();
        assert_eq!(list.separator, ',');
        assert_eq!(list.components.len(), 2);
        assert_eq!(list.components[0].as_list().map(|l| l.separator), Some(' '));
    }

    #[test]
    fn test_slash_outside_precedence_list() {
        let value = parse("1 / 2", "src");
        assert_eq!(render(&value), "1 / 2");
    }

    #[test]
    fn test_value_stops_at_terminators() {
        let mut scanner = Scanner::new("red !important", &ParserSettings::default());
        let value = parse_value(&mut scanner, DEFAULT_DELIMITERS).unwrap();
        assert_eq!(value, Value::ident("red"));
        assert!(scanner.comes("!"));

        let mut scanner = Scanner::new("10px\\9;", &ParserSettings::default());
        parse_value(&mut scanner, DEFAULT_DELIMITERS).unwrap();
        assert!(scanner.comes("\\9"));
    }

    #[test]
    fn test_empty_value_fails() {
        let mut scanner = Scanner::new(";", &ParserSettings::default());
        assert!(matches!(
            parse_value(&mut scanner, DEFAULT_DELIMITERS),
            Err(CssError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_unicode_range() {
        assert_eq!(parse("U+0025-00FF", "unicode-range"), Value::ident("U+0025-00FF"));
        assert_eq!(parse("U+4??", "unicode-range"), Value::ident("U+4??"));
        let value = parse("U+0-7F, U+A5", "unicode-range");
        assert_eq!(render(&value), "U+0-7F,U+A5");
    }

    #[test]
    fn test_function_dispatch() {
        assert!(matches!(parse("url(x.png)", "background"), Value::Url(_)));
        assert!(matches!(parse("calc(1px + 2px)", "width"), Value::Calc(_)));
        assert!(matches!(parse("RGB(1,2,3)", "color"), Value::Color(_)));
        assert!(matches!(parse("var(--x)", "color"), Value::Function(_)));
        assert!(matches!(parse("rgbish", "color"), Value::Ident(_)));
    }

    #[test]
    fn test_operator_fallback() {
        let value = parse("+ 5", "counter-increment");
        assert_eq!(render(&value), "+ 5");
    }

    #[test]
    fn test_grid_template() {
        let value = parse("[full-start] minmax(1em, 1fr) [full-end]", "grid-template-columns");
        assert_eq!(render(&value), "[full-start] minmax(1em,1fr) [full-end]");
    }

    #[test]
    fn test_progid_only_lenient() {
        let mut strict = Scanner::new("progid:Foo.Bar(a=1)", &ParserSettings::strict());
        let value = parse_primitive_value(&mut strict).unwrap();
        assert_eq!(value, Value::ident("progid"));

        let mut lenient = Scanner::new("progid:Foo.Bar(a=1)", &ParserSettings::default());
        assert!(matches!(parse_primitive_value(&mut lenient).unwrap(), Value::Function(_)));
    }

    #[test]
    fn test_collect_values() {
        let value = parse("1px solid rgba(var(--c), .5)", "border");
        let mut shallow = Vec::new();
        value.collect_values(false, &mut shallow);
        assert_eq!(shallow.len(), 3);

        let mut deep = Vec::new();
        value.collect_values(true, &mut deep);
        // rgba(), var(), --c and .5 on top of the two plain values
        assert_eq!(deep.len(), 6);
    }

    #[test]
    fn test_visit_values_mut() {
        let mut value = parse("1px 2px", "margin");
        value.visit_values_mut(false, &mut |v| {
            if let Value::Size(size) = v {
                size.value *= 2.0;
            }
        });
        assert_eq!(render(&value), "2px 4px");
    }
}
