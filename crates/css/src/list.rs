//! Rule lists: the document body, `@media`-style blocks and `@keyframes`

use std::ops::{Deref, DerefMut};

use serde_json::json;

use crate::at_rule::{Charset, Import, Namespace};
use crate::comment::Comment;
use crate::error::{CssResult, SourceLocation};
use crate::output::OutputFormat;
use crate::rule_set::{property_matches, AtRuleSet, DeclarationBlock, RuleSet};
use crate::selector::{split_selector_list, Selector, SpecificityFilter};
use crate::value::Value;

/// One entry of a rule list
#[derive(Debug, Clone, PartialEq)]
pub enum CssItem {
    DeclarationBlock(DeclarationBlock),
    /// An at-rule holding declarations (`@font-face`, `@page`)
    AtRuleSet(AtRuleSet),
    /// An at-rule holding nested rules (`@media`, `@supports`)
    AtRuleBlock(AtRuleBlockList),
    KeyFrame(KeyFrame),
    Import(Import),
    Charset(Charset),
    Namespace(Namespace),
}

impl CssItem {
    pub fn comments(&self) -> &[Comment] {
        match self {
            CssItem::DeclarationBlock(block) => &block.rule_set.comments,
            CssItem::AtRuleSet(rule) => &rule.rule_set.comments,
            CssItem::AtRuleBlock(block) => &block.list.comments,
            CssItem::KeyFrame(frame) => &frame.list.comments,
            CssItem::Import(import) => &import.comments,
            CssItem::Charset(charset) => &charset.comments,
            CssItem::Namespace(namespace) => &namespace.comments,
        }
    }

    pub fn comments_mut(&mut self) -> &mut Vec<Comment> {
        match self {
            CssItem::DeclarationBlock(block) => &mut block.rule_set.comments,
            CssItem::AtRuleSet(rule) => &mut rule.rule_set.comments,
            CssItem::AtRuleBlock(block) => &mut block.list.comments,
            CssItem::KeyFrame(frame) => &mut frame.list.comments,
            CssItem::Import(import) => &mut import.comments,
            CssItem::Charset(charset) => &mut charset.comments,
            CssItem::Namespace(namespace) => &mut namespace.comments,
        }
    }

    /// Put `comments` in front of the ones already attached
    pub fn prepend_comments(&mut self, mut comments: Vec<Comment>) {
        if comments.is_empty() {
            return;
        }
        let existing = self.comments_mut();
        comments.append(existing);
        *existing = comments;
    }

    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            CssItem::DeclarationBlock(block) => block.rule_set.location,
            CssItem::AtRuleSet(rule) => rule.rule_set.location,
            CssItem::AtRuleBlock(block) => block.list.location,
            CssItem::KeyFrame(frame) => frame.list.location,
            CssItem::Import(import) => import.location,
            CssItem::Charset(charset) => charset.location,
            CssItem::Namespace(namespace) => namespace.location,
        }
    }

    /// The nested rule list, for the at-rules that have one
    pub fn nested_list(&self) -> Option<&CssList> {
        match self {
            CssItem::AtRuleBlock(block) => Some(&block.list),
            CssItem::KeyFrame(frame) => Some(&frame.list),
            _ => None,
        }
    }

    pub fn nested_list_mut(&mut self) -> Option<&mut CssList> {
        match self {
            CssItem::AtRuleBlock(block) => Some(&mut block.list),
            CssItem::KeyFrame(frame) => Some(&mut frame.list),
            _ => None,
        }
    }

    pub fn render(&self, format: &OutputFormat) -> CssResult<String> {
        match self {
            CssItem::DeclarationBlock(block) => block.render(format),
            CssItem::AtRuleSet(rule) => rule.render(format),
            CssItem::AtRuleBlock(block) => block.render(format),
            CssItem::KeyFrame(frame) => frame.render(format),
            CssItem::Import(import) => Ok(import.render(format)),
            CssItem::Charset(charset) => Ok(charset.render(format)),
            CssItem::Namespace(namespace) => Ok(namespace.render(format)),
        }
    }

    pub fn to_array(&self) -> serde_json::Value {
        match self {
            CssItem::DeclarationBlock(block) => block.to_array(),
            CssItem::AtRuleSet(rule) => rule.to_array(),
            CssItem::AtRuleBlock(block) => block.to_array(),
            CssItem::KeyFrame(frame) => frame.to_array(),
            CssItem::Import(import) => import.to_array(),
            CssItem::Charset(charset) => charset.to_array(),
            CssItem::Namespace(namespace) => namespace.to_array(),
        }
    }
}

impl From<DeclarationBlock> for CssItem {
    fn from(block: DeclarationBlock) -> Self {
        CssItem::DeclarationBlock(block)
    }
}

impl From<AtRuleSet> for CssItem {
    fn from(rule: AtRuleSet) -> Self {
        CssItem::AtRuleSet(rule)
    }
}

impl From<AtRuleBlockList> for CssItem {
    fn from(block: AtRuleBlockList) -> Self {
        CssItem::AtRuleBlock(block)
    }
}

impl From<KeyFrame> for CssItem {
    fn from(frame: KeyFrame) -> Self {
        CssItem::KeyFrame(frame)
    }
}

impl From<Import> for CssItem {
    fn from(import: Import) -> Self {
        CssItem::Import(import)
    }
}

impl From<Charset> for CssItem {
    fn from(charset: Charset) -> Self {
        CssItem::Charset(charset)
    }
}

impl From<Namespace> for CssItem {
    fn from(namespace: Namespace) -> Self {
        CssItem::Namespace(namespace)
    }
}

/// An ordered list of rules
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CssList {
    contents: Vec<CssItem>,
    /// Comments after the last item
    pub comments: Vec<Comment>,
    pub location: Option<SourceLocation>,
}

impl CssList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> &[CssItem] {
        &self.contents
    }

    pub fn contents_mut(&mut self) -> &mut Vec<CssItem> {
        &mut self.contents
    }

    pub fn into_contents(self) -> Vec<CssItem> {
        self.contents
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn append(&mut self, item: impl Into<CssItem>) {
        self.contents.push(item.into());
    }

    pub fn prepend(&mut self, item: impl Into<CssItem>) {
        self.contents.insert(0, item.into());
    }

    /// Insert before the item at `index`, or append when `index` is past the end
    pub fn insert_before(&mut self, item: impl Into<CssItem>, index: usize) {
        let index = index.min(self.contents.len());
        self.contents.insert(index, item.into());
    }

    pub fn remove(&mut self, index: usize) -> Option<CssItem> {
        if index < self.contents.len() {
            Some(self.contents.remove(index))
        } else {
            None
        }
    }

    /// Replace the item at `index` by `items` (possibly none)
    pub fn replace(&mut self, index: usize, items: Vec<CssItem>) -> Option<CssItem> {
        if index >= self.contents.len() {
            return None;
        }
        let mut removed = self.contents.splice(index..=index, items);
        removed.next()
    }

    pub fn set_contents(&mut self, contents: Vec<CssItem>) {
        self.contents = contents;
    }

    /// Every declaration block, including those nested in at-rule blocks
    pub fn all_declaration_blocks(&self) -> Vec<&DeclarationBlock> {
        let mut out = Vec::new();
        self.collect_declaration_blocks(&mut out);
        out
    }

    fn collect_declaration_blocks<'a>(&'a self, out: &mut Vec<&'a DeclarationBlock>) {
        for item in &self.contents {
            match item {
                CssItem::DeclarationBlock(block) => out.push(block),
                other => {
                    if let Some(list) = other.nested_list() {
                        list.collect_declaration_blocks(out);
                    }
                }
            }
        }
    }

    pub fn all_declaration_blocks_mut(&mut self) -> Vec<&mut DeclarationBlock> {
        let mut out = Vec::new();
        self.collect_declaration_blocks_mut(&mut out);
        out
    }

    fn collect_declaration_blocks_mut<'a>(&'a mut self, out: &mut Vec<&'a mut DeclarationBlock>) {
        for item in &mut self.contents {
            match item {
                CssItem::DeclarationBlock(block) => out.push(block),
                CssItem::AtRuleBlock(block) => block.list.collect_declaration_blocks_mut(out),
                CssItem::KeyFrame(frame) => frame.list.collect_declaration_blocks_mut(out),
                _ => {}
            }
        }
    }

    /// Every rule set: declaration blocks and declaration-holding at-rules
    pub fn all_rule_sets(&self) -> Vec<&RuleSet> {
        let mut out = Vec::new();
        self.collect_rule_sets(&mut out);
        out
    }

    fn collect_rule_sets<'a>(&'a self, out: &mut Vec<&'a RuleSet>) {
        for item in &self.contents {
            match item {
                CssItem::DeclarationBlock(block) => out.push(&block.rule_set),
                CssItem::AtRuleSet(rule) => out.push(&rule.rule_set),
                other => {
                    if let Some(list) = other.nested_list() {
                        list.collect_rule_sets(out);
                    }
                }
            }
        }
    }

    fn collect_rule_sets_mut<'a>(&'a mut self, out: &mut Vec<&'a mut RuleSet>) {
        for item in &mut self.contents {
            match item {
                CssItem::DeclarationBlock(block) => out.push(&mut block.rule_set),
                CssItem::AtRuleSet(rule) => out.push(&mut rule.rule_set),
                CssItem::AtRuleBlock(block) => block.list.collect_rule_sets_mut(out),
                CssItem::KeyFrame(frame) => frame.list.collect_rule_sets_mut(out),
                _ => {}
            }
        }
    }

    /// Values of every declaration whose property matches `property` (all when `None`).
    ///
    /// Lists are flattened. Functions are returned whole, and their arguments too when
    /// `search_in_function_args` is set.
    pub fn all_values(&self, property: Option<&str>, search_in_function_args: bool) -> Vec<&Value> {
        let mut out = Vec::new();
        for rule_set in self.all_rule_sets() {
            for rule in rule_set.declarations() {
                if property.map(|p| property_matches(&rule.property, p)).unwrap_or(true) {
                    rule.value.collect_values(search_in_function_args, &mut out);
                }
            }
        }
        out
    }

    /// Visit the values [`CssList::all_values`] would return, mutably
    pub fn visit_values_mut(
        &mut self,
        property: Option<&str>,
        search_in_function_args: bool,
        visit: &mut dyn FnMut(&mut Value),
    ) {
        let mut rule_sets = Vec::new();
        self.collect_rule_sets_mut(&mut rule_sets);
        for rule_set in rule_sets {
            for rule in rule_set.rules_mut(property) {
                rule.value.visit_values_mut(search_in_function_args, visit);
            }
        }
    }

    /// Selectors of every declaration block, optionally filtered by a specificity
    /// comparison such as `">= 100"`
    pub fn selectors_by_specificity(&self, filter: Option<&str>) -> CssResult<Vec<&Selector>> {
        let filter = filter.map(SpecificityFilter::parse).transpose()?;
        Ok(self
            .all_declaration_blocks()
            .into_iter()
            .flat_map(|block| block.selectors().iter())
            .filter(|selector| filter.as_ref().map(|f| f.matches(selector.specificity())).unwrap_or(true))
            .collect())
    }

    /// Remove declaration blocks whose selector list equals `selectors`. Stops after the
    /// first match unless `remove_all` is set. Returns the number of blocks removed.
    pub fn remove_declaration_block_by_selector(&mut self, selectors: &str, remove_all: bool) -> CssResult<usize> {
        let wanted = split_selector_list(selectors)
            .iter()
            .map(|text| Selector::new(text))
            .collect::<CssResult<Vec<_>>>()?;
        let mut removed = 0;
        self.remove_blocks_matching(&wanted, remove_all, &mut removed);
        Ok(removed)
    }

    fn remove_blocks_matching(&mut self, wanted: &[Selector], remove_all: bool, removed: &mut usize) {
        let mut index = 0;
        while index < self.contents.len() {
            if *removed > 0 && !remove_all {
                return;
            }
            let matches = match &self.contents[index] {
                CssItem::DeclarationBlock(block) => block.selectors() == wanted,
                _ => false,
            };
            if matches {
                self.contents.remove(index);
                *removed += 1;
                continue;
            }
            if let Some(list) = self.contents[index].nested_list_mut() {
                list.remove_blocks_matching(wanted, remove_all, removed);
            }
            index += 1;
        }
    }

    /// Render the items. A root list uses `format` itself and adds no surrounding
    /// block spacing; nested lists go one level deeper.
    pub fn render_contents(&self, format: &OutputFormat, is_root: bool) -> CssResult<String> {
        let next = if is_root { format } else { format.next_level() };
        let next_formatter = next.formatter();
        let mut out = String::new();
        let mut first = true;

        for item in &self.contents {
            let Some(rendered) = format.formatter().safely(|| item.render(next))? else {
                continue;
            };
            if first {
                first = false;
                if !is_root {
                    out.push_str(&next_formatter.space_before_blocks());
                }
            } else {
                out.push_str(&next_formatter.space_between_blocks());
            }
            out.push_str(&rendered);
        }

        if !first && !is_root {
            out.push_str(&format.formatter().space_after_blocks());
        }
        Ok(out)
    }

    pub fn contents_to_array(&self) -> Vec<serde_json::Value> {
        self.contents.iter().map(CssItem::to_array).collect()
    }
}

/// `@media screen { ... }` and the other at-rules that hold nested rules
#[derive(Debug, Clone, PartialEq)]
pub struct AtRuleBlockList {
    pub name: String,
    pub args: String,
    pub list: CssList,
}

impl Deref for AtRuleBlockList {
    type Target = CssList;

    fn deref(&self) -> &CssList {
        &self.list
    }
}

impl DerefMut for AtRuleBlockList {
    fn deref_mut(&mut self) -> &mut CssList {
        &mut self.list
    }
}

impl AtRuleBlockList {
    pub fn new(name: impl Into<String>, args: impl Into<String>) -> Self {
        Self { name: name.into(), args: args.into(), list: CssList::new() }
    }

    pub fn render(&self, format: &OutputFormat) -> CssResult<String> {
        let formatter = format.formatter();
        let mut out = formatter.comments(&self.list.comments);
        out.push_str(format.before_at_rule_block());
        out.push('@');
        out.push_str(&self.name);
        if !self.args.is_empty() {
            out.push(' ');
            out.push_str(&self.args);
        }
        out.push_str(&formatter.space_before_opening_brace());
        out.push('{');
        out.push_str(&self.list.render_contents(format, false)?);
        out.push('}');
        out.push_str(format.after_at_rule_block());
        Ok(out)
    }

    pub fn to_array(&self) -> serde_json::Value {
        json!({
            "class": "AtRuleBlockList",
            "name": self.name,
            "args": self.args,
            "contents": self.list.contents_to_array(),
            "comments": self.list.comments,
        })
    }
}

/// `@keyframes name { from { ... } to { ... } }`, possibly vendor-prefixed
#[derive(Debug, Clone, PartialEq)]
pub struct KeyFrame {
    /// The at-rule name as written, e.g. `-webkit-keyframes`
    pub vendor_key_frame: String,
    pub animation_name: String,
    pub list: CssList,
}

impl Deref for KeyFrame {
    type Target = CssList;

    fn deref(&self) -> &CssList {
        &self.list
    }
}

impl DerefMut for KeyFrame {
    fn deref_mut(&mut self) -> &mut CssList {
        &mut self.list
    }
}

impl KeyFrame {
    pub fn new(vendor_key_frame: impl Into<String>, animation_name: impl Into<String>) -> Self {
        Self {
            vendor_key_frame: vendor_key_frame.into(),
            animation_name: animation_name.into(),
            list: CssList::new(),
        }
    }

    pub fn render(&self, format: &OutputFormat) -> CssResult<String> {
        let formatter = format.formatter();
        let mut out = formatter.comments(&self.list.comments);
        out.push('@');
        out.push_str(&self.vendor_key_frame);
        out.push(' ');
        out.push_str(&self.animation_name);
        out.push_str(&formatter.space_before_opening_brace());
        out.push('{');
        out.push_str(&self.list.render_contents(format, false)?);
        out.push('}');
        Ok(out)
    }

    pub fn to_array(&self) -> serde_json::Value {
        json!({
            "class": "KeyFrame",
            "vendor_key_frame": self.vendor_key_frame,
            "animation_name": self.animation_name,
            "contents": self.list.contents_to_array(),
            "comments": self.list.comments,
        })
    }
}
