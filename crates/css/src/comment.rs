//! CSS comments

use serde::Serialize;

use crate::error::SourceLocation;
use crate::output::OutputFormat;

/// A `/* ... */` comment, attached to the node that follows it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    /// Text between the delimiters
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl Comment {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), location: None }
    }

    pub fn at(text: impl Into<String>, location: SourceLocation) -> Self {
        Self { text: text.into(), location: Some(location) }
    }

    pub fn render(&self, _format: &OutputFormat) -> String {
        format!("/*{}*/", self.text)
    }
}
