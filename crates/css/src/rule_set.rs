//! Rule sets: declaration blocks and declaration-holding at-rules

use std::ops::{Deref, DerefMut};

use rustc_hash::FxHashMap;
use serde_json::json;
use smallvec::SmallVec;

use crate::comment::Comment;
use crate::declaration::Declaration;
use crate::error::{CssError, CssResult, SourceLocation};
use crate::output::OutputFormat;
use crate::scanner::{Scanner, Until};
use crate::selector::{split_selector_list, Selector};

/// An ordered collection of declarations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: Vec<Declaration>,
    pub comments: Vec<Comment>,
    pub location: Option<SourceLocation>,
}

/// Does `property` match `pattern`? A trailing dash matches the property itself and
/// every property it prefixes: `font-` matches `font` and `font-size`.
pub fn property_matches(property: &str, pattern: &str) -> bool {
    match pattern.strip_suffix('-') {
        Some(stem) if !stem.is_empty() => property == stem || property.starts_with(pattern),
        _ => property == pattern,
    }
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rule(&mut self, rule: Declaration) {
        self.rules.push(rule);
    }

    /// Insert `rule` before the declaration at `index` (or append past the end)
    pub fn insert_rule_before(&mut self, rule: Declaration, index: usize) {
        let index = index.min(self.rules.len());
        self.rules.insert(index, rule);
    }

    /// All declarations in source order
    pub fn declarations(&self) -> &[Declaration] {
        &self.rules
    }

    /// Declarations whose property matches `pattern`, in source order
    pub fn rules(&self, pattern: Option<&str>) -> Vec<&Declaration> {
        self.rules
            .iter()
            .filter(|rule| pattern.map(|p| property_matches(&rule.property, p)).unwrap_or(true))
            .collect()
    }

    pub fn rules_mut(&mut self, pattern: Option<&str>) -> Vec<&mut Declaration> {
        self.rules
            .iter_mut()
            .filter(|rule| pattern.map(|p| property_matches(&rule.property, p)).unwrap_or(true))
            .collect()
    }

    /// The effective declaration per property: the last one wins
    pub fn rules_assoc(&self, pattern: Option<&str>) -> FxHashMap<String, &Declaration> {
        let mut assoc = FxHashMap::default();
        for rule in self.rules(pattern) {
            assoc.insert(rule.property.clone(), rule);
        }
        assoc
    }

    /// Remove every declaration matching `pattern`, returning them
    pub fn remove_rule(&mut self, pattern: &str) -> Vec<Declaration> {
        let (removed, kept) = std::mem::take(&mut self.rules)
            .into_iter()
            .partition(|rule| property_matches(&rule.property, pattern));
        self.rules = kept;
        removed
    }

    /// Remove the first declaration equal to `rule`
    pub fn remove_matching(&mut self, rule: &Declaration) -> bool {
        match self.rules.iter().position(|candidate| candidate == rule) {
            Some(index) => {
                self.rules.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn set_rules(&mut self, rules: Vec<Declaration>) {
        self.rules = rules;
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Parse declarations up to and including the closing `}`.
    ///
    /// In lenient mode a malformed declaration is skipped up to the next `;` or `}`.
    pub fn parse_rules(&mut self, scanner: &mut Scanner) -> CssResult<()> {
        scanner.enter_nesting()?;
        let result = self.parse_rules_inner(scanner);
        scanner.leave_nesting();
        result
    }

    fn parse_rules_inner(&mut self, scanner: &mut Scanner) -> CssResult<()> {
        while scanner.comes(";") {
            scanner.consume(";")?;
        }

        loop {
            let leading = scanner.consume_white_space()?;
            if scanner.comes("}") || scanner.is_end() {
                self.comments.extend(leading);
                break;
            }

            match Declaration::parse(scanner) {
                Ok(mut rule) => {
                    let mut comments = leading;
                    comments.append(&mut rule.comments);
                    rule.comments = comments;
                    self.add_rule(rule);
                }
                Err(err) if scanner.is_lenient() && err.is_unexpected_token() => {
                    scanner.report(log::Level::Warn, format!("Skipping declaration: {}", err), err.location());
                    let mut skipped = Vec::new();
                    if scanner.consume_until(Until::any_of(&[';', '}']), &mut skipped).is_err() {
                        // End of input: close the rule set
                        return Ok(());
                    }
                    while scanner.comes(";") {
                        scanner.consume(";")?;
                    }
                }
                Err(err) => return Err(err),
            }
        }

        if scanner.is_end() && scanner.is_lenient() {
            let location = scanner.location();
            scanner.report(log::Level::Warn, "Unclosed block at end of input", Some(location));
            return Ok(());
        }
        scanner.consume("}")?;
        Ok(())
    }

    /// Render the declarations one level deeper than `format`
    pub fn render_rules(&self, format: &OutputFormat) -> String {
        let next = format.next_level();
        let next_formatter = next.formatter();
        let mut out = String::new();
        for (i, rule) in self.rules.iter().enumerate() {
            if i == 0 {
                out.push_str(&next_formatter.space_before_rules());
            } else {
                out.push_str(&next_formatter.space_between_rules());
            }
            out.push_str(&rule.render(next));
        }
        if !self.rules.is_empty() {
            out.push_str(&format.formatter().space_after_rules());
        }
        format.formatter().remove_last_semicolon(out)
    }

    fn rules_to_array(&self) -> Vec<serde_json::Value> {
        self.rules.iter().map(Declaration::to_array).collect()
    }
}

/// Selectors with their declarations: `a, b { color: red }`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeclarationBlock {
    selectors: SmallVec<[Selector; 1]>,
    pub rule_set: RuleSet,
}

impl Deref for DeclarationBlock {
    type Target = RuleSet;

    fn deref(&self) -> &RuleSet {
        &self.rule_set
    }
}

impl DerefMut for DeclarationBlock {
    fn deref_mut(&mut self) -> &mut RuleSet {
        &mut self.rule_set
    }
}

impl DeclarationBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a block from a comma-separated selector list
    pub fn with_selectors(selectors: &str) -> CssResult<Self> {
        let mut block = Self::new();
        block.set_selectors(selectors, false)?;
        Ok(block)
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    pub fn selectors_mut(&mut self) -> &mut [Selector] {
        &mut self.selectors
    }

    /// Replace the selectors by the comma-separated `list`, validating each one
    pub fn set_selectors(&mut self, list: &str, keyframe: bool) -> CssResult<()> {
        let mut selectors = SmallVec::new();
        for text in split_selector_list(list) {
            let selector = if keyframe { Selector::keyframe(&text)? } else { Selector::new(&text)? };
            selectors.push(selector);
        }
        self.selectors = selectors;
        Ok(())
    }

    pub fn set_selector_list(&mut self, selectors: impl IntoIterator<Item = Selector>) {
        self.selectors = selectors.into_iter().collect();
    }

    /// Remove the selector with this text
    pub fn remove_selector(&mut self, text: &str) -> bool {
        let before = self.selectors.len();
        self.selectors.retain(|selector| selector.text() != text);
        self.selectors.len() != before
    }

    /// Parse `selectors { declarations }`. Returns `None` when lenient mode dropped
    /// the block.
    pub fn parse(scanner: &mut Scanner, keyframe: bool) -> CssResult<Option<Self>> {
        let location = scanner.location();
        let mut block = Self::new();
        block.rule_set.location = Some(location);
        let mut comments = Vec::new();

        let head = read_selector_text(scanner, &mut comments).and_then(|text| {
            block.set_selectors(&text, keyframe).map_err(|err| err.at(location))?;
            scanner.consume("{")?;
            Ok(())
        });

        if let Err(err) = head {
            if !(scanner.is_lenient() && err.is_unexpected_token()) {
                return Err(err);
            }
            scanner.report(log::Level::Warn, format!("Dropping rule set: {}", err), err.location());
            if scanner.comes("}") {
                scanner.consume("}")?;
            } else {
                let mut skipped = Vec::new();
                scanner.consume_until(Until::any_of(&['}']).consuming_end().or_eof(), &mut skipped)?;
            }
            return Ok(None);
        }

        block.rule_set.comments = comments;
        block.rule_set.parse_rules(scanner)?;
        Ok(Some(block))
    }

    pub fn render(&self, format: &OutputFormat) -> CssResult<String> {
        if self.selectors.is_empty() {
            return Err(CssError::output(
                "Attempt to render a declaration block without selectors",
                self.rule_set.location,
            ));
        }
        let formatter = format.formatter();
        let separator = format!(
            "{},{}",
            formatter.space_before_selector_separator(),
            formatter.space_after_selector_separator()
        );
        let selectors: Vec<String> = self.selectors.iter().map(Selector::render).collect();

        let mut out = formatter.comments(&self.rule_set.comments);
        out.push_str(format.before_declaration_block());
        out.push_str(&selectors.join(&separator));
        out.push_str(format.after_declaration_block_selectors());
        out.push_str(&formatter.space_before_opening_brace());
        out.push('{');
        out.push_str(&self.rule_set.render_rules(format));
        out.push('}');
        out.push_str(format.after_declaration_block());
        Ok(out)
    }

    pub fn to_array(&self) -> serde_json::Value {
        json!({
            "class": "DeclarationBlock",
            "selectors": self.selectors.iter().map(Selector::to_array).collect::<Vec<_>>(),
            "rules": self.rule_set.rules_to_array(),
            "comments": self.rule_set.comments,
        })
    }
}

/// Read the selector text up to `{` or `}`, skipping over quoted strings
fn read_selector_text(scanner: &mut Scanner, comments: &mut Vec<Comment>) -> CssResult<String> {
    let mut text = String::new();
    let mut quote: Option<char> = None;
    loop {
        text.push(scanner.consume_char()?);
        text.push_str(&scanner.consume_until(Until::any_of(&['{', '}', '\'', '"']), comments)?);
        if let Some(c @ ('\'' | '"')) = scanner.peek_char() {
            if !text.ends_with('\\') {
                match quote {
                    None => quote = Some(c),
                    Some(open) if open == c => quote = None,
                    Some(_) => {}
                }
            }
        }
        if quote.is_none() && matches!(scanner.peek_char(), Some('{') | Some('}')) {
            return Ok(text);
        }
    }
}

/// An at-rule whose body holds declarations: `@font-face`, `@page :first`
#[derive(Debug, Clone, PartialEq)]
pub struct AtRuleSet {
    pub name: String,
    pub args: String,
    pub rule_set: RuleSet,
}

impl Deref for AtRuleSet {
    type Target = RuleSet;

    fn deref(&self) -> &RuleSet {
        &self.rule_set
    }
}

impl DerefMut for AtRuleSet {
    fn deref_mut(&mut self) -> &mut RuleSet {
        &mut self.rule_set
    }
}

impl AtRuleSet {
    pub fn new(name: impl Into<String>, args: impl Into<String>) -> Self {
        Self { name: name.into(), args: args.into(), rule_set: RuleSet::new() }
    }

    pub fn render(&self, format: &OutputFormat) -> CssResult<String> {
        let formatter = format.formatter();
        let mut out = formatter.comments(&self.rule_set.comments);
        out.push('@');
        out.push_str(&self.name);
        if !self.args.is_empty() {
            out.push(' ');
            out.push_str(&self.args);
        }
        out.push_str(&formatter.space_before_opening_brace());
        out.push('{');
        out.push_str(&self.rule_set.render_rules(format));
        out.push('}');
        Ok(out)
    }

    pub fn to_array(&self) -> serde_json::Value {
        json!({
            "class": "AtRuleSet",
            "name": self.name,
            "args": self.args,
            "rules": self.rule_set.rules_to_array(),
            "comments": self.rule_set.comments,
        })
    }
}
