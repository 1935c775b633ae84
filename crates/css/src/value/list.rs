//! Delimited value lists and grid line names

use serde_json::json;

use super::Value;
use crate::error::{CssResult, SourceLocation};
use crate::output::OutputFormat;
use crate::scanner::Scanner;

/// Values joined by one separator (`,`, ` `, `/` or `=`)
#[derive(Debug, Clone, PartialEq)]
pub struct ValueList {
    pub separator: char,
    pub components: Vec<Value>,
    pub location: Option<SourceLocation>,
}

impl ValueList {
    pub fn new(separator: char, components: Vec<Value>) -> Self {
        Self { separator, components, location: None }
    }

    /// Use `value` as a list with `separator`, wrapping it if it is anything else
    pub fn from_value(value: Value, separator: char) -> Self {
        match value {
            Value::List(list) if list.separator == separator => list,
            other => Self::new(separator, vec![other]),
        }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn push(&mut self, value: Value) {
        self.components.push(value);
    }

    pub fn render(&self, format: &OutputFormat) -> String {
        let formatter = format.formatter();
        let glue = format!(
            "{}{}{}",
            formatter.space_before_list_argument_separator(self.separator),
            self.separator,
            formatter.space_after_list_argument_separator(self.separator)
        );
        let rendered: Vec<String> = self.components.iter().map(|value| value.render(format)).collect();
        rendered.join(&glue)
    }

    pub fn to_array(&self) -> serde_json::Value {
        json!({
            "class": "ValueList",
            "separator": self.separator.to_string(),
            "components": self.components.iter().map(Value::to_array).collect::<Vec<_>>(),
        })
    }
}

/// Grid line names: `[header-start main]`
#[derive(Debug, Clone, PartialEq)]
pub struct LineName {
    pub names: Vec<String>,
    pub location: Option<SourceLocation>,
}

impl LineName {
    pub fn new(names: Vec<String>) -> Self {
        Self { names, location: None }
    }

    pub fn parse(scanner: &mut Scanner) -> CssResult<Self> {
        let location = scanner.location();
        scanner.consume("[")?;
        scanner.consume_white_space()?;

        let mut names = Vec::new();
        loop {
            match scanner.parse_identifier(false) {
                Ok(name) => names.push(name),
                Err(err) if scanner.is_lenient() && err.is_unexpected_token() && scanner.comes("]") => {}
                Err(err) => return Err(err),
            }
            scanner.consume_white_space()?;
            if scanner.comes("]") {
                break;
            }
        }
        scanner.consume("]")?;

        Ok(Self { names, location: Some(location) })
    }

    pub fn render(&self) -> String {
        format!("[{}]", self.names.join(" "))
    }

    pub fn to_array(&self) -> serde_json::Value {
        json!({ "class": "LineName", "names": self.names })
    }
}
