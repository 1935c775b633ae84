//! Output formatting
//!
//! [`OutputFormat`] is the rendering configuration. Nodes render themselves against a
//! format; [`Formatter`] turns the raw spacing options into the strings actually
//! emitted at the current indentation level.

use std::sync::OnceLock;

use rustc_hash::FxHashMap;

use crate::comment::Comment;
use crate::error::{CssError, CssResult};

/// A value accepted by [`OutputFormat::set`]
#[derive(Debug, Clone, PartialEq)]
pub enum FormatValue {
    Text(String),
    Flag(bool),
    Char(char),
}

impl From<&str> for FormatValue {
    fn from(value: &str) -> Self {
        FormatValue::Text(value.to_string())
    }
}

impl From<String> for FormatValue {
    fn from(value: String) -> Self {
        FormatValue::Text(value)
    }
}

impl From<bool> for FormatValue {
    fn from(value: bool) -> Self {
        FormatValue::Flag(value)
    }
}

impl From<char> for FormatValue {
    fn from(value: char) -> Self {
        FormatValue::Char(value)
    }
}

/// Generates getter/setter pairs for the spacing strings
macro_rules! text_options {
    ($($(#[$doc:meta])* $field:ident => $setter:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $field(&self) -> &str {
                &self.$field
            }

            pub fn $setter(&mut self, value: impl Into<String>) -> &mut Self {
                self.$field = value.into();
                self.next_level = OnceLock::new();
                self
            }
        )*

        fn set_text_option(&mut self, name: &str, value: String) -> bool {
            $(
                if normalize(stringify!($field)) == name {
                    self.$setter(value);
                    return true;
                }
            )*
            false
        }
    };
}

/// Rendering configuration
#[derive(Debug)]
pub struct OutputFormat {
    string_quoting: char,
    rgb_hash_notation: bool,
    short_hex_colors: bool,
    semicolon_after_last_rule: bool,
    render_comments: bool,
    ignore_exceptions: bool,

    space_after_rule_name: String,
    space_before_rules: String,
    space_between_rules: String,
    space_after_rules: String,
    space_before_blocks: String,
    space_between_blocks: String,
    space_after_blocks: String,
    before_at_rule_block: String,
    after_at_rule_block: String,
    space_before_selector_separator: String,
    space_after_selector_separator: String,
    space_before_list_argument_separator: String,
    space_after_list_argument_separator: String,
    space_before_list_argument_separators: FxHashMap<char, String>,
    space_after_list_argument_separators: FxHashMap<char, String>,
    space_before_opening_brace: String,
    before_declaration_block: String,
    after_declaration_block_selectors: String,
    after_declaration_block: String,
    indentation: String,

    indentation_level: usize,
    next_level: OnceLock<Box<OutputFormat>>,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self {
            string_quoting: '"',
            rgb_hash_notation: true,
            short_hex_colors: false,
            semicolon_after_last_rule: true,
            render_comments: false,
            ignore_exceptions: false,

            space_after_rule_name: String::from(" "),
            space_before_rules: String::from("\n"),
            space_between_rules: String::from("\n"),
            space_after_rules: String::from("\n"),
            space_before_blocks: String::from("\n"),
            space_between_blocks: String::from("\n"),
            space_after_blocks: String::from("\n"),
            before_at_rule_block: String::new(),
            after_at_rule_block: String::new(),
            space_before_selector_separator: String::new(),
            space_after_selector_separator: String::from(" "),
            space_before_list_argument_separator: String::new(),
            space_after_list_argument_separator: String::new(),
            space_before_list_argument_separators: FxHashMap::default(),
            space_after_list_argument_separators: FxHashMap::default(),
            space_before_opening_brace: String::from(" "),
            before_declaration_block: String::new(),
            after_declaration_block_selectors: String::new(),
            after_declaration_block: String::new(),
            indentation: String::from("\t"),

            indentation_level: 0,
            next_level: OnceLock::new(),
        }
    }
}

impl Clone for OutputFormat {
    fn clone(&self) -> Self {
        Self {
            string_quoting: self.string_quoting,
            rgb_hash_notation: self.rgb_hash_notation,
            short_hex_colors: self.short_hex_colors,
            semicolon_after_last_rule: self.semicolon_after_last_rule,
            render_comments: self.render_comments,
            ignore_exceptions: self.ignore_exceptions,
            space_after_rule_name: self.space_after_rule_name.clone(),
            space_before_rules: self.space_before_rules.clone(),
            space_between_rules: self.space_between_rules.clone(),
            space_after_rules: self.space_after_rules.clone(),
            space_before_blocks: self.space_before_blocks.clone(),
            space_between_blocks: self.space_between_blocks.clone(),
            space_after_blocks: self.space_after_blocks.clone(),
            before_at_rule_block: self.before_at_rule_block.clone(),
            after_at_rule_block: self.after_at_rule_block.clone(),
            space_before_selector_separator: self.space_before_selector_separator.clone(),
            space_after_selector_separator: self.space_after_selector_separator.clone(),
            space_before_list_argument_separator: self.space_before_list_argument_separator.clone(),
            space_after_list_argument_separator: self.space_after_list_argument_separator.clone(),
            space_before_list_argument_separators: self.space_before_list_argument_separators.clone(),
            space_after_list_argument_separators: self.space_after_list_argument_separators.clone(),
            space_before_opening_brace: self.space_before_opening_brace.clone(),
            before_declaration_block: self.before_declaration_block.clone(),
            after_declaration_block_selectors: self.after_declaration_block_selectors.clone(),
            after_declaration_block: self.after_declaration_block.clone(),
            indentation: self.indentation.clone(),
            indentation_level: self.indentation_level,
            next_level: OnceLock::new(),
        }
    }
}

impl OutputFormat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything on one line with no optional whitespace
    pub fn compact() -> Self {
        let mut format = Self::default();
        format
            .set_space_after_rule_name("")
            .set_space_before_rules("")
            .set_space_between_rules("")
            .set_space_after_rules("")
            .set_space_before_blocks("")
            .set_space_between_blocks("")
            .set_space_after_blocks("")
            .set_space_after_selector_separator("")
            .set_space_before_opening_brace("")
            .set_semicolon_after_last_rule(false)
            .set_short_hex_colors(true)
            .set_render_comments(false);
        format
    }

    /// Blank lines between top-level blocks, spaces after list commas, comments kept
    pub fn pretty() -> Self {
        let mut format = Self::default();
        format
            .set_space_between_blocks("\n\n")
            .set_space_after_list_argument_separator_for(',', " ")
            .set_render_comments(true);
        format
    }

    text_options! {
        /// Between a property name and its value (after the colon)
        space_after_rule_name => set_space_after_rule_name;
        /// Before the first declaration of a block
        space_before_rules => set_space_before_rules;
        /// Between two declarations
        space_between_rules => set_space_between_rules;
        /// After the last declaration of a block
        space_after_rules => set_space_after_rules;
        /// Before the first item of a nested list
        space_before_blocks => set_space_before_blocks;
        /// Between two list items
        space_between_blocks => set_space_between_blocks;
        /// After the last item of a nested list
        space_after_blocks => set_space_after_blocks;
        before_at_rule_block => set_before_at_rule_block;
        after_at_rule_block => set_after_at_rule_block;
        space_before_selector_separator => set_space_before_selector_separator;
        space_after_selector_separator => set_space_after_selector_separator;
        /// Default spacing before any list separator
        space_before_list_argument_separator => set_space_before_list_argument_separator;
        /// Default spacing after any list separator
        space_after_list_argument_separator => set_space_after_list_argument_separator;
        space_before_opening_brace => set_space_before_opening_brace;
        before_declaration_block => set_before_declaration_block;
        after_declaration_block_selectors => set_after_declaration_block_selectors;
        after_declaration_block => set_after_declaration_block;
        /// One unit of indentation
        indentation => set_indentation;
    }

    pub fn string_quoting(&self) -> char {
        self.string_quoting
    }

    pub fn set_string_quoting(&mut self, quote: char) -> &mut Self {
        self.string_quoting = quote;
        self.next_level = OnceLock::new();
        self
    }

    /// Render `rgb` colors as `#rrggbb`
    pub fn rgb_hash_notation(&self) -> bool {
        self.rgb_hash_notation
    }

    pub fn set_rgb_hash_notation(&mut self, enabled: bool) -> &mut Self {
        self.rgb_hash_notation = enabled;
        self.next_level = OnceLock::new();
        self
    }

    /// Shorten `#aabbcc` to `#abc` when hash notation is used
    pub fn short_hex_colors(&self) -> bool {
        self.short_hex_colors
    }

    pub fn set_short_hex_colors(&mut self, enabled: bool) -> &mut Self {
        self.short_hex_colors = enabled;
        self.next_level = OnceLock::new();
        self
    }

    pub fn semicolon_after_last_rule(&self) -> bool {
        self.semicolon_after_last_rule
    }

    pub fn set_semicolon_after_last_rule(&mut self, enabled: bool) -> &mut Self {
        self.semicolon_after_last_rule = enabled;
        self.next_level = OnceLock::new();
        self
    }

    pub fn render_comments(&self) -> bool {
        self.render_comments
    }

    pub fn set_render_comments(&mut self, enabled: bool) -> &mut Self {
        self.render_comments = enabled;
        self.next_level = OnceLock::new();
        self
    }

    /// Skip nodes that cannot be rendered instead of failing
    pub fn ignore_exceptions(&self) -> bool {
        self.ignore_exceptions
    }

    pub fn set_ignore_exceptions(&mut self, enabled: bool) -> &mut Self {
        self.ignore_exceptions = enabled;
        self.next_level = OnceLock::new();
        self
    }

    pub fn set_space_before_list_argument_separator_for(&mut self, separator: char, space: impl Into<String>) -> &mut Self {
        self.space_before_list_argument_separators.insert(separator, space.into());
        self.next_level = OnceLock::new();
        self
    }

    pub fn set_space_after_list_argument_separator_for(&mut self, separator: char, space: impl Into<String>) -> &mut Self {
        self.space_after_list_argument_separators.insert(separator, space.into());
        self.next_level = OnceLock::new();
        self
    }

    pub fn indent_with_spaces(&mut self, count: usize) -> &mut Self {
        self.set_indentation(" ".repeat(count))
    }

    pub fn indent_with_tabs(&mut self, count: usize) -> &mut Self {
        self.set_indentation("\t".repeat(count))
    }

    pub fn indentation_level(&self) -> usize {
        self.indentation_level
    }

    /// Set an option by name.
    ///
    /// Names are matched ignoring case, dots, dashes and underscores, so
    /// `"space.after-rule-name"`, `"SpaceAfterRuleName"` and `"space_after_rule_name"`
    /// address the same option. A `*` expands to `Before`, `Between` and `After`
    /// (`"Space*Rules"` sets all three rule spacings).
    pub fn set(&mut self, name: &str, value: impl Into<FormatValue>) -> CssResult<&mut Self> {
        let value = value.into();
        let names: Vec<String> = if name.contains('*') {
            ["Before", "Between", "After"]
                .iter()
                .map(|position| normalize(&name.replace('*', position)))
                .collect()
        } else {
            vec![normalize(name)]
        };

        let mut applied = false;
        for name in &names {
            applied |= self.set_one(name, &value)?;
        }

        if applied {
            Ok(self)
        } else {
            Err(CssError::output(format!("Unknown output option '{}'", name), None))
        }
    }

    fn set_one(&mut self, name: &str, value: &FormatValue) -> CssResult<bool> {
        let flag = |value: &FormatValue| match value {
            FormatValue::Flag(flag) => Ok(*flag),
            other => Err(CssError::output(format!("Option '{}' expects a boolean, got {:?}", name, other), None)),
        };

        match name {
            "stringquoting" | "stringquotingtype" => {
                let quote = match value {
                    FormatValue::Char(c) => *c,
                    FormatValue::Text(text) if text.chars().count() == 1 => text.chars().next().unwrap_or('"'),
                    other => {
                        return Err(CssError::output(format!("Option '{}' expects a quote character, got {:?}", name, other), None))
                    }
                };
                self.set_string_quoting(quote);
            }
            "rgbhashnotation" => {
                self.set_rgb_hash_notation(flag(value)?);
            }
            "shorthexcolors" => {
                self.set_short_hex_colors(flag(value)?);
            }
            "semicolonafterlastrule" => {
                self.set_semicolon_after_last_rule(flag(value)?);
            }
            "rendercomments" => {
                self.set_render_comments(flag(value)?);
            }
            "ignoreexceptions" => {
                self.set_ignore_exceptions(flag(value)?);
            }
            _ => {
                let text = match value {
                    FormatValue::Text(text) => text.clone(),
                    FormatValue::Char(c) => c.to_string(),
                    FormatValue::Flag(_) => {
                        if self.set_text_option(name, String::new()) {
                            return Err(CssError::output(format!("Option '{}' expects text", name), None));
                        }
                        return Ok(false);
                    }
                };
                return Ok(self.set_text_option(name, text));
            }
        }
        Ok(true)
    }

    /// The format used one nesting level deeper. Computed once and reused.
    pub fn next_level(&self) -> &OutputFormat {
        self.next_level.get_or_init(|| {
            let mut next = self.clone();
            next.indentation_level += 1;
            Box::new(next)
        })
    }

    /// Helper producing the spacing strings for this level
    pub fn formatter(&self) -> Formatter<'_> {
        Formatter { format: self }
    }
}

/// Lowercase and strip separators from an option name
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '.' | '-' | '_' | ' '))
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Produces indented spacing and shared rendering helpers for one format level
#[derive(Clone, Copy)]
pub struct Formatter<'a> {
    format: &'a OutputFormat,
}

impl<'a> Formatter<'a> {
    pub fn space_after_rule_name(&self) -> &'a str {
        &self.format.space_after_rule_name
    }

    pub fn space_before_rules(&self) -> String {
        self.prepare_space(&self.format.space_before_rules)
    }

    pub fn space_between_rules(&self) -> String {
        self.prepare_space(&self.format.space_between_rules)
    }

    pub fn space_after_rules(&self) -> String {
        self.prepare_space(&self.format.space_after_rules)
    }

    pub fn space_before_blocks(&self) -> String {
        self.prepare_space(&self.format.space_before_blocks)
    }

    pub fn space_between_blocks(&self) -> String {
        self.prepare_space(&self.format.space_between_blocks)
    }

    pub fn space_after_blocks(&self) -> String {
        self.prepare_space(&self.format.space_after_blocks)
    }

    pub fn space_before_selector_separator(&self) -> String {
        self.prepare_space(&self.format.space_before_selector_separator)
    }

    pub fn space_after_selector_separator(&self) -> String {
        self.prepare_space(&self.format.space_after_selector_separator)
    }

    pub fn space_before_list_argument_separator(&self, separator: char) -> String {
        let space = self
            .format
            .space_before_list_argument_separators
            .get(&separator)
            .unwrap_or(&self.format.space_before_list_argument_separator);
        self.prepare_space(space)
    }

    pub fn space_after_list_argument_separator(&self, separator: char) -> String {
        let space = self
            .format
            .space_after_list_argument_separators
            .get(&separator)
            .unwrap_or(&self.format.space_after_list_argument_separator);
        self.prepare_space(space)
    }

    pub fn space_before_opening_brace(&self) -> String {
        self.prepare_space(&self.format.space_before_opening_brace)
    }

    /// Run a render step; with `ignore_exceptions` an output error yields `None`
    pub fn safely<F>(&self, render: F) -> CssResult<Option<String>>
    where
        F: FnOnce() -> CssResult<String>,
    {
        match render() {
            Ok(rendered) => Ok(Some(rendered)),
            Err(CssError::Output { message, .. }) if self.format.ignore_exceptions => {
                log::debug!("Omitting node from output: {}", message);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Strip the final `;` of a rendered declaration list if the format asks for it
    pub fn remove_last_semicolon(&self, rendered: String) -> String {
        if self.format.semicolon_after_last_rule {
            return rendered;
        }
        match rendered.rfind(';') {
            Some(index) => {
                let mut out = rendered;
                out.remove(index);
                out
            }
            None => rendered,
        }
    }

    /// Rendered comments, followed by block spacing
    pub fn comments(&self, comments: &[Comment]) -> String {
        if !self.format.render_comments || comments.is_empty() {
            return String::new();
        }
        let mut out = String::new();
        let last = comments.len() - 1;
        for (i, comment) in comments.iter().enumerate() {
            out.push_str(&comment.render(self.format));
            if i == last {
                out.push_str(&self.space_after_blocks());
            } else {
                out.push_str(&self.space_between_blocks());
            }
        }
        out
    }

    fn indent(&self) -> String {
        self.format.indentation.repeat(self.format.indentation_level)
    }

    fn prepare_space(&self, space: &str) -> String {
        if !space.contains('\n') {
            return space.to_string();
        }
        space.replace('\n', &format!("\n{}", self.indent()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_level_indents() {
        let format = OutputFormat::default();
        let next = format.next_level();
        assert_eq!(next.indentation_level(), 1);
        assert_eq!(next.formatter().space_before_rules(), "\n\t");
        assert_eq!(format.formatter().space_after_rules(), "\n");
        assert!(std::ptr::eq(next, format.next_level()));
    }

    #[test]
    fn test_set_by_path() {
        let mut format = OutputFormat::default();
        format.set("space.after-rule-name", "").unwrap();
        format.set("SpaceBeforeOpeningBrace", "  ").unwrap();
        assert_eq!(format.space_after_rule_name(), "");
        assert_eq!(format.space_before_opening_brace(), "  ");
    }

    #[test]
    fn test_set_wildcard() {
        let mut format = OutputFormat::default();
        format.set("Space*Rules", "").unwrap();
        assert_eq!(format.space_before_rules(), "");
        assert_eq!(format.space_between_rules(), "");
        assert_eq!(format.space_after_rules(), "");
    }

    #[test]
    fn test_set_flags() {
        let mut format = OutputFormat::default();
        format.set("RGBHashNotation", false).unwrap().set("StringQuoting", '\'').unwrap();
        assert!(!format.rgb_hash_notation());
        assert_eq!(format.string_quoting(), '\'');
        assert!(format.set("RenderComments", "yes").is_err());
    }

    #[test]
    fn test_set_unknown_option() {
        let mut format = OutputFormat::default();
        assert!(matches!(format.set("SpaceAroundEverything", " "), Err(CssError::Output { .. })));
    }

    #[test]
    fn test_setter_resets_next_level() {
        let mut format = OutputFormat::default();
        assert_eq!(format.next_level().indentation(), "\t");
        format.indent_with_spaces(2);
        assert_eq!(format.next_level().formatter().space_before_rules(), "\n  ");
    }

    #[test]
    fn test_remove_last_semicolon() {
        let compact = OutputFormat::compact();
        let out = compact.formatter().remove_last_semicolon(String::from("a:b;c:d;"));
        assert_eq!(out, "a:b;c:d");

        let default = OutputFormat::default();
        assert_eq!(default.formatter().remove_last_semicolon(String::from("a:b;")), "a:b;");
    }

    #[test]
    fn test_list_separator_overrides() {
        let pretty = OutputFormat::pretty();
        assert_eq!(pretty.formatter().space_after_list_argument_separator(','), " ");
        assert_eq!(pretty.formatter().space_after_list_argument_separator('/'), "");
    }

    #[test]
    fn test_safely() {
        let mut format = OutputFormat::default();
        let failing = || Err(CssError::output("no selector", None));
        assert!(format.formatter().safely(failing).is_err());

        format.set_ignore_exceptions(true);
        assert_eq!(format.formatter().safely(failing).unwrap(), None);
    }
}
