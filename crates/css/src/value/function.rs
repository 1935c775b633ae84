//! Function values: generic functions, `calc()` and legacy `progid:` filters

use serde_json::json;

use super::list::ValueList;
use super::{parse_primitive_value, parse_value, Value, FUNCTION_ARGUMENT_DELIMITERS, PROGID_DELIMITERS};
use crate::error::{CssError, CssResult, MatchKind, SourceLocation};
use crate::output::OutputFormat;
use crate::scanner::{is_whitespace, Scanner, Until};

/// A function call such as `var(--x)` or `translate(1px, 2px)`
#[derive(Debug, Clone, PartialEq)]
pub struct CssFunction {
    pub name: String,
    /// Comma-separated arguments
    pub arguments: ValueList,
    pub location: Option<SourceLocation>,
}

impl CssFunction {
    pub fn new(name: impl Into<String>, arguments: ValueList) -> Self {
        Self { name: name.into(), arguments, location: None }
    }

    pub fn parse(scanner: &mut Scanner, ignore_case: bool) -> CssResult<Self> {
        let location = scanner.location();
        let name = scanner.parse_identifier(ignore_case)?;
        scanner.consume("(")?;
        let arguments = parse_arguments(scanner, FUNCTION_ARGUMENT_DELIMITERS)?;
        scanner.consume(")")?;
        Ok(Self { name, arguments, location: Some(location) })
    }

    /// `progid:DXImageTransform.Microsoft.gradient(startColorstr='#000', GradientType=0)`
    pub fn parse_microsoft_filter(scanner: &mut Scanner) -> CssResult<Self> {
        let location = scanner.location();
        let mut comments = Vec::new();
        let name = scanner.consume_until(Until::any_of(&['(']).consuming_end(), &mut comments)?;
        let arguments = parse_arguments(scanner, PROGID_DELIMITERS)?;
        scanner.consume(")")?;
        Ok(Self { name, arguments, location: Some(location) })
    }

    pub fn render(&self, format: &OutputFormat) -> String {
        format!("{}({})", self.name, self.arguments.render(format))
    }

    pub fn to_array(&self) -> serde_json::Value {
        json!({
            "class": "CssFunction",
            "name": self.name,
            "arguments": self.arguments.to_array(),
        })
    }
}

/// Parse the argument list after `(`, leaving the closing `)` in place
fn parse_arguments(scanner: &mut Scanner, delimiters: &[char]) -> CssResult<ValueList> {
    scanner.enter_nesting()?;
    let result = scanner.consume_white_space().and_then(|_| {
        if scanner.comes(")") {
            Ok(ValueList::new(',', Vec::new()))
        } else {
            parse_value(scanner, delimiters).map(|value| ValueList::from_value(value, ','))
        }
    });
    scanner.leave_nesting();
    result
}

/// One token of a `calc()` expression
#[derive(Debug, Clone, PartialEq)]
pub enum CalcComponent {
    Operand(Value),
    Operator(char),
    OpenParen,
    CloseParen,
}

impl CalcComponent {
    fn render(&self, format: &OutputFormat) -> String {
        match self {
            CalcComponent::Operand(value) => value.render(format),
            CalcComponent::Operator(op) => op.to_string(),
            CalcComponent::OpenParen => String::from("("),
            CalcComponent::CloseParen => String::from(")"),
        }
    }

    fn to_array(&self) -> serde_json::Value {
        match self {
            CalcComponent::Operand(value) => value.to_array(),
            CalcComponent::Operator(op) => json!(op.to_string()),
            CalcComponent::OpenParen => json!("("),
            CalcComponent::CloseParen => json!(")"),
        }
    }
}

const CALC_OPERATORS: [char; 4] = ['+', '-', '*', '/'];

/// `calc()` and its vendor-prefixed forms, kept as a flat token sequence
#[derive(Debug, Clone, PartialEq)]
pub struct CalcFunction {
    pub name: String,
    pub components: Vec<CalcComponent>,
    pub location: Option<SourceLocation>,
}

impl CalcFunction {
    pub fn new(name: impl Into<String>, components: Vec<CalcComponent>) -> Self {
        Self { name: name.into(), components, location: None }
    }

    pub fn is_calc_name(name: &str) -> bool {
        matches!(name.to_ascii_lowercase().as_str(), "calc" | "-webkit-calc" | "-moz-calc")
    }

    pub fn parse(scanner: &mut Scanner) -> CssResult<Self> {
        let location = scanner.location();
        let name = scanner.parse_identifier(true)?;
        if !Self::is_calc_name(&name) {
            return Err(CssError::custom(format!("Not a calc function: \"{}\"", name), location));
        }
        if !scanner.comes("(") {
            return Err(CssError::unexpected_token("(", scanner.peek(5, 0), MatchKind::Literal, scanner.location()));
        }
        scanner.consume("(")?;

        scanner.enter_nesting()?;
        let components = Self::parse_expression(scanner);
        scanner.leave_nesting();
        let components = components?;

        if !scanner.is_end() {
            scanner.consume(")")?;
        }
        Ok(Self { name, components, location: Some(location) })
    }

    fn parse_expression(scanner: &mut Scanner) -> CssResult<Vec<CalcComponent>> {
        let mut components = Vec::new();
        let mut nesting = 0usize;
        let mut expect_operand = true;

        while !scanner.comes(")") || nesting > 0 {
            if scanner.is_end() && nesting == 0 {
                break;
            }
            scanner.consume_white_space()?;

            if scanner.comes("(") {
                scanner.consume("(")?;
                nesting += 1;
                components.push(CalcComponent::OpenParen);
                scanner.consume_white_space()?;
                continue;
            }
            if scanner.comes(")") {
                scanner.consume(")")?;
                nesting = nesting.saturating_sub(1);
                components.push(CalcComponent::CloseParen);
                scanner.consume_white_space()?;
                continue;
            }

            if expect_operand {
                components.push(CalcComponent::Operand(parse_primitive_value(scanner)?));
                expect_operand = false;
            } else {
                let operator = scanner.peek_char().filter(|c| CALC_OPERATORS.contains(c));
                let Some(operator) = operator else {
                    return Err(CssError::custom(
                        format!(
                            "Next token was expected to be an operator of type +, -, *, /. Instead \"{}\" was found.",
                            scanner.peek(5, 0)
                        ),
                        scanner.location(),
                    ));
                };
                if operator == '+' || operator == '-' {
                    let spaced_before = scanner.previous_char().map(is_whitespace).unwrap_or(false);
                    let spaced_after = scanner.peek_char_at(1).map(is_whitespace).unwrap_or(false);
                    if !spaced_before || !spaced_after {
                        let found = format!(
                            "{}{}",
                            scanner.previous_char().map(String::from).unwrap_or_default(),
                            scanner.peek(2, 0)
                        );
                        return Err(CssError::unexpected_token(
                            format!(" {} ", operator),
                            found,
                            MatchKind::Literal,
                            scanner.location(),
                        ));
                    }
                }
                scanner.consume_char()?;
                components.push(CalcComponent::Operator(operator));
                expect_operand = true;
            }
            scanner.consume_white_space()?;
        }

        Ok(components)
    }

    pub fn render(&self, format: &OutputFormat) -> String {
        let mut out = format!("{}(", self.name);
        let mut after_open = true;
        for component in &self.components {
            if !after_open && *component != CalcComponent::CloseParen {
                out.push(' ');
            }
            out.push_str(&component.render(format));
            after_open = *component == CalcComponent::OpenParen;
        }
        out.push(')');
        out
    }

    pub fn to_array(&self) -> serde_json::Value {
        json!({
            "class": "CalcFunction",
            "name": self.name,
            "components": self.components.iter().map(CalcComponent::to_array).collect::<Vec<_>>(),
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
    fn test_function_arguments() {
        let mut s = scanner("translate(1px, -2px)");
        let function = CssFunction::parse(&mut s, false).unwrap();
        assert_eq!(function.name, "translate");
        assert_eq!(function.arguments.len(), 2);
        assert_eq!(function.render(&OutputFormat::default()), "translate(1px,-2px)");
        assert!(s.is_end());
    }

    #[test]
    fn test_function_without_arguments() {
        let mut s = scanner("paint( )");
        let function = CssFunction::parse(&mut s, false).unwrap();
        assert!(function.arguments.is_empty());
        assert_eq!(function.render(&OutputFormat::default()), "paint()");
    }

    #[test]
    fn test_function_key_value_arguments() {
        let mut s = scanner("alpha(opacity=50)");
        let function = CssFunction::parse(&mut s, false).unwrap();
        match &function.arguments.components[0] {
            Value::List(list) => assert_eq!(list.separator, '='),
            other => panic!("expected a list, got {:?}", other),
        }
        assert_eq!(function.render(&OutputFormat::default()), "alpha(opacity=50)");
    }

    #[test]
    fn test_microsoft_filter() {
        let mut s = scanner("progid:DXImageTransform.Microsoft.gradient(startColorstr='#000', GradientType=0)");
        let function = CssFunction::parse_microsoft_filter(&mut s).unwrap();
        assert_eq!(function.name, "progid:DXImageTransform.Microsoft.gradient");
        assert_eq!(
            function.render(&OutputFormat::default()),
            "progid:DXImageTransform.Microsoft.gradient(startColorstr=\"#000\",GradientType=0)"
        );
    }

    #[test]
    fn test_calc_tokens() {
        let mut s = scanner("calc(100% - (2 * 10px))");
        let calc = CalcFunction::parse(&mut s).unwrap();
        assert_eq!(calc.components.len(), 7);
        assert_eq!(calc.components[1], CalcComponent::Operator('-'));
        assert_eq!(calc.render(&OutputFormat::default()), "calc(100% - (2 * 10px))");
        assert!(s.is_end());
    }

    #[test]
    fn test_calc_requires_spaced_additive_operators() {
        let mut s = scanner("calc(1px -2px)");
        assert!(CalcFunction::parse(&mut s).is_err());

        let mut s = scanner("calc(1px+2px)");
        assert!(CalcFunction::parse(&mut s).is_err());

        let mut s = scanner("-webkit-calc(1px*2)");
        let calc = CalcFunction::parse(&mut s).unwrap();
        assert_eq!(calc.render(&OutputFormat::default()), "-webkit-calc(1px * 2)");
    }

    #[test]
    fn test_calc_nested_function() {
        let mut s = scanner("calc(var(--gap) * 2)");
        let calc = CalcFunction::parse(&mut s).unwrap();
        assert!(matches!(calc.components[0], CalcComponent::Operand(Value::Function(_))));
    }
}
