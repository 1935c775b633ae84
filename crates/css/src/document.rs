//! The parsed stylesheet

use std::ops::{Deref, DerefMut};

use serde_json::json;

use crate::at_rule::Charset;
use crate::error::CssResult;
use crate::list::{CssItem, CssList};
use crate::output::OutputFormat;

const DEFAULT_CHARSET: &str = "utf-8";

/// The root rule list of a stylesheet
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    list: CssList,
    /// Charset in effect when there is no `@charset` rule
    default_charset: String,
}

impl Default for Document {
    fn default() -> Self {
        Self::from_list(CssList::new())
    }
}

impl Deref for Document {
    type Target = CssList;

    fn deref(&self) -> &CssList {
        &self.list
    }
}

impl DerefMut for Document {
    fn deref_mut(&mut self) -> &mut CssList {
        &mut self.list
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_list(list: CssList) -> Self {
        Self { list, default_charset: String::from(DEFAULT_CHARSET) }
    }

    pub fn with_default_charset(mut self, charset: impl Into<String>) -> Self {
        self.default_charset = charset.into();
        self
    }

    pub fn into_list(self) -> CssList {
        self.list
    }

    /// The `@charset` rule, which is always the first item when present
    pub fn charset(&self) -> Option<&Charset> {
        match self.list.contents().first() {
            Some(CssItem::Charset(charset)) => Some(charset),
            _ => None,
        }
    }

    /// Name of the `@charset` rule, or the default charset without one
    pub fn effective_charset(&self) -> &str {
        self.charset().map(Charset::name).unwrap_or(self.default_charset.as_str())
    }

    /// Move the first `@charset` to the front and drop any other
    pub(crate) fn normalize_charset(&mut self) {
        let contents = self.list.contents_mut();
        let mut kept = false;
        let mut index = 0;
        while index < contents.len() {
            if matches!(contents[index], CssItem::Charset(_)) {
                if kept {
                    contents.remove(index);
                    continue;
                }
                kept = true;
                if index > 0 {
                    let charset = contents.remove(index);
                    contents.insert(0, charset);
                }
            }
            index += 1;
        }
    }

    pub fn render(&self, format: &OutputFormat) -> CssResult<String> {
        self.list.render_contents(format, true)
    }

    pub fn to_array(&self) -> serde_json::Value {
        json!({
            "class": "Document",
            "contents": self.list.contents_to_array(),
            "comments": self.list.comments,
        })
    }
}
