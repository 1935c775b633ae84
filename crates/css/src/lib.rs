//! Sheetcraft CSS - CSS Parser and Document Model
//!
//! Parses stylesheets into an editable tree of rule sets, at-rules and values,
//! and renders that tree back to text with configurable formatting.

mod comment;
mod declaration;
mod document;
mod error;
mod import;
mod list;
mod output;
mod parser;
mod rule_set;
mod scanner;
mod selector;
mod settings;
mod shorthand;

pub mod at_rule;
pub mod value;

pub use at_rule::{Charset, Import, Namespace};
pub use comment::Comment;
pub use declaration::Declaration;
pub use document::Document;
pub use error::{CssError, CssResult, Diagnostic, MatchKind, SourceLocation};
pub use import::{resolve_locator, FileLoader, StylesheetLoader};
pub use list::{AtRuleBlockList, CssItem, CssList, KeyFrame};
pub use output::{FormatValue, Formatter, OutputFormat};
pub use parser::Parser;
pub use rule_set::{property_matches, AtRuleSet, DeclarationBlock, RuleSet};
pub use scanner::Scanner;
pub use selector::{
    compute_specificity, split_selector_list, Combinator, Selector, SelectorComponent,
    SpecificityCache, SpecificityFilter,
};
pub use settings::{ParserSettings, DEFAULT_MAX_NESTING_DEPTH};
pub use value::{Color, CssFunction, CssString, CssUrl, Size, Value, ValueList};

/// Parse a stylesheet with the default lenient settings
pub fn parse(input: &str) -> CssResult<Document> {
    Parser::new(input, ParserSettings::default()).parse()
}

/// Parse a stylesheet with explicit settings
pub fn parse_with(input: &str, settings: ParserSettings) -> CssResult<Document> {
    Parser::new(input, settings).parse()
}
