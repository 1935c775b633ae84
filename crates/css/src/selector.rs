//! CSS Selectors
//!
//! Selectors are kept as normalized text. Validation is a character-level check, and
//! specificity is derived from the text by pattern counting.

use std::sync::{LazyLock, Mutex, OnceLock};

use regex::Regex;
use rustc_hash::FxHashMap;
use serde_json::json;

use crate::error::{CssError, CssResult, SourceLocation};
use crate::scanner::is_whitespace;

/// Classes, attributes and pseudo-classes
static CLASS_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\.[\w]+)|\[(\w+)|(:(link|visited|active|hover|focus|lang|target|enabled|disabled|checked|indeterminate|root|nth-child|nth-last-child|nth-of-type|nth-last-of-type|first-child|last-child|first-of-type|last-of-type|only-child|only-of-type|empty|contains))",
    )
    .expect("valid class specificity pattern")
});

/// Type selectors and pseudo-elements
static ELEMENT_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)((^|[\s+>~]+)[\w]+|:{1,2}(after|before|first-letter|first-line|selection))")
        .expect("valid element specificity pattern")
});

/// A selector, such as `div > p.intro`
#[derive(Debug, Clone)]
pub struct Selector {
    text: String,
    specificity: OnceLock<u32>,
    keyframe: bool,
    pub location: Option<SourceLocation>,
}

impl PartialEq for Selector {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text && self.keyframe == other.keyframe
    }
}

/// Selector combinators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Descendant combinator (space)
    Descendant,
    /// Child combinator (>)
    Child,
    /// Next sibling combinator (+)
    NextSibling,
    /// Subsequent sibling combinator (~)
    SubsequentSibling,
}

impl Combinator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Combinator::Descendant => " ",
            Combinator::Child => ">",
            Combinator::NextSibling => "+",
            Combinator::SubsequentSibling => "~",
        }
    }
}

/// Part of a selector: a compound selector or the combinator joining two of them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorComponent {
    Compound(String),
    Combinator(Combinator),
}

impl Selector {
    /// Create a validated selector
    pub fn new(text: &str) -> CssResult<Self> {
        Self::build(text, false)
    }

    /// Create a keyframe selector (`from`, `to`, `50%`)
    pub fn keyframe(text: &str) -> CssResult<Self> {
        Self::build(text, true)
    }

    fn build(text: &str, keyframe: bool) -> CssResult<Self> {
        let text = normalize(text);
        if !is_valid(&text, keyframe) {
            return Err(CssError::custom(
                format!("Selector did not match the selector grammar: '{}'", text),
                SourceLocation::default(),
            ));
        }
        Ok(Self { text, specificity: OnceLock::new(), keyframe, location: None })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the text; the specificity is recomputed on next use
    pub fn set_text(&mut self, text: &str) -> CssResult<()> {
        *self = Self { location: self.location, ..Self::build(text, self.keyframe)? };
        Ok(())
    }

    pub fn is_keyframe(&self) -> bool {
        self.keyframe
    }

    /// Specificity as `ids * 100 + classes * 10 + elements`
    pub fn specificity(&self) -> u32 {
        *self.specificity.get_or_init(|| compute_specificity(&self.text))
    }

    /// Specificity looked up in (and stored into) a shared cache
    pub fn specificity_in(&self, cache: &SpecificityCache) -> u32 {
        if let Some(&known) = self.specificity.get() {
            return known;
        }
        let value = cache.get(&self.text);
        let _ = self.specificity.set(value);
        value
    }

    /// Split into compound selectors and combinators
    pub fn components(&self) -> Vec<SelectorComponent> {
        let mut components = Vec::new();
        let mut current = String::new();
        let mut pending: Option<Combinator> = None;
        let mut brackets = 0usize;
        let mut quote: Option<char> = None;
        let mut chars = self.text.chars();

        while let Some(c) = chars.next() {
            if let Some(q) = quote {
                current.push(c);
                if c == '\\' {
                    current.extend(chars.next());
                } else if c == q {
                    quote = None;
                }
                continue;
            }

            let top_level = brackets == 0;
            match c {
                '\\' => {
                    current.push(c);
                    current.extend(chars.next());
                    continue;
                }
                '"' | '\'' => quote = Some(c),
                '(' | '[' => brackets += 1,
                ')' | ']' => brackets = brackets.saturating_sub(1),
                _ => {}
            }

            let combinator = match c {
                '>' => Some(Combinator::Child),
                '+' => Some(Combinator::NextSibling),
                '~' => Some(Combinator::SubsequentSibling),
                c if is_whitespace(c) => Some(Combinator::Descendant),
                _ => None,
            };
            match combinator {
                Some(combinator) if top_level => {
                    if !current.is_empty() {
                        components.push(SelectorComponent::Compound(std::mem::take(&mut current)));
                    }
                    // An explicit combinator wins over the surrounding whitespace
                    if pending.is_none() || pending == Some(Combinator::Descendant) {
                        pending = Some(combinator);
                    }
                }
                _ => {
                    if let Some(combinator) = pending.take() {
                        if !components.is_empty() {
                            components.push(SelectorComponent::Combinator(combinator));
                        }
                    }
                    current.push(c);
                }
            }
        }

        if !current.is_empty() {
            components.push(SelectorComponent::Compound(current));
        }
        components
    }

    pub fn render(&self) -> String {
        self.text.clone()
    }

    pub fn to_array(&self) -> serde_json::Value {
        json!({
            "class": if self.keyframe { "KeyframeSelector" } else { "Selector" },
            "selector": self.text,
            "specificity": self.specificity(),
        })
    }
}

/// Specificity values keyed by selector text
#[derive(Debug, Default)]
pub struct SpecificityCache {
    entries: Mutex<FxHashMap<String, u32>>,
}

impl SpecificityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Specificity of `text`, computed on first request
    pub fn get(&self, text: &str) -> u32 {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(&value) = entries.get(text) {
            return value;
        }
        let value = compute_specificity(text);
        entries.insert(text.to_string(), value);
        value
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every stored value
    pub fn clear(&self) {
        match self.entries.lock() {
            Ok(mut entries) => entries.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

/// `#` count weighs 100, classes/attributes/pseudo-classes 10, elements and
/// pseudo-elements 1. Arguments of `:not()` are counted like any other text.
pub fn compute_specificity(text: &str) -> u32 {
    let ids = text.matches('#').count() as u32;
    let classes = CLASS_LIKE.find_iter(text).count() as u32;
    let elements = ELEMENT_LIKE.find_iter(text).count() as u32;
    ids * 100 + classes * 10 + elements
}

/// A comparison such as `>= 100` or a plain number for equality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecificityFilter {
    operator: FilterOperator,
    value: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterOperator {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
}

impl SpecificityFilter {
    pub fn parse(text: &str) -> CssResult<Self> {
        let text = text.trim();
        let (operator, rest) = [
            (">=", FilterOperator::GreaterOrEqual),
            ("<=", FilterOperator::LessOrEqual),
            ("==", FilterOperator::Equal),
            ("!=", FilterOperator::NotEqual),
            (">", FilterOperator::Greater),
            ("<", FilterOperator::Less),
        ]
        .iter()
        .find_map(|(prefix, operator)| text.strip_prefix(prefix).map(|rest| (*operator, rest)))
        .unwrap_or((FilterOperator::Equal, text));

        let value = rest.trim().parse().map_err(|_| {
            CssError::custom(format!("Invalid specificity filter \"{}\"", text), SourceLocation::default())
        })?;
        Ok(Self { operator, value })
    }

    pub fn matches(&self, specificity: u32) -> bool {
        match self.operator {
            FilterOperator::Less => specificity < self.value,
            FilterOperator::LessOrEqual => specificity <= self.value,
            FilterOperator::Greater => specificity > self.value,
            FilterOperator::GreaterOrEqual => specificity >= self.value,
            FilterOperator::Equal => specificity == self.value,
            FilterOperator::NotEqual => specificity != self.value,
        }
    }
}

/// Split a selector list on commas outside parentheses, brackets and strings
pub fn split_selector_list(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        current.push(c);
        if c == '\\' {
            current.extend(chars.next());
            continue;
        }
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '(' | '[' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    current.pop();
                    parts.push(std::mem::take(&mut current));
                }
                _ => {}
            },
        }
    }
    parts.push(current);
    parts
}

/// Trim and collapse whitespace runs outside quoted segments
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut pending_space = false;

    for c in text.trim_matches(is_whitespace).chars() {
        if quote.is_none() && !escaped && is_whitespace(c) {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(c);
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if let Some(q) = quote {
            if c == q {
                quote = None;
            }
        } else if c == '"' || c == '\'' {
            quote = Some(c);
        }
    }
    out
}

fn is_selector_char(c: char, keyframe: bool) -> bool {
    c.is_ascii_alphanumeric()
        || c >= '\u{A0}'
        || is_whitespace(c)
        || matches!(c, '_' | '^' | '$' | '|' | '*' | '=' | '~' | '[' | ']' | '(' | ')' | '-' | '.' | ':' | '#' | '+' | '>' | ',')
        || (keyframe && c == '%')
}

/// Check the selector against the accepted character set, honoring escapes and
/// quoted segments
pub fn is_valid(text: &str, keyframe: bool) -> bool {
    if text.is_empty() {
        return false;
    }
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if chars.next().is_none() {
                    return false;
                }
            }
            '"' | '\'' => loop {
                match chars.next() {
                    None => return false,
                    Some('\\') => {
                        chars.next();
                    }
                    Some(q) if q == c => break,
                    Some(_) => {}
                }
            },
            c if is_selector_char(c, keyframe) => {}
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector(text: &str) -> Selector {
        Selector::new(text).unwrap()
    }

    #[test]
    fn test_specificity_values() {
        assert_eq!(selector("a").specificity(), 1);
        assert_eq!(selector(".c").specificity(), 10);
        assert_eq!(selector("#id").specificity(), 100);
        assert_eq!(selector("ol li::before").specificity(), 3);
        assert_eq!(selector("#test .help").specificity(), 110);
        assert_eq!(selector("a:hover").specificity(), 11);
        assert_eq!(selector("input[type=\"text\"]").specificity(), 11);
    }

    #[test]
    fn test_not_is_additive() {
        // Arguments of :not() add their own weight
        assert_eq!(selector("a:not(.b)").specificity(), 11);
        assert_eq!(selector("a:not(.b, .c)").specificity(), 21);
    }

    #[test]
    fn test_normalization() {
        let sel = selector("  div \n  >   p ");
        assert_eq!(sel.text(), "div > p");

        let quoted = selector("a[title=\"two  spaces\"]   b");
        assert_eq!(quoted.text(), "a[title=\"two  spaces\"] b");
    }

    #[test]
    fn test_validation() {
        assert!(is_valid("div.a > p:first-child", false));
        assert!(is_valid("a[href^='http']", false));
        assert!(is_valid("a\\@b", false));
        assert!(is_valid("[data-x=\"{\"]", false));
        assert!(!is_valid("a{b", false));
        assert!(!is_valid("a\"unterminated", false));
        assert!(!is_valid("50%", false));
        assert!(is_valid("50%", true));
        assert!(!is_valid("", false));
    }

    #[test]
    fn test_invalid_selector_error() {
        let err = Selector::new("a;b").unwrap_err();
        assert!(err.is_unexpected_token());
        assert!(err.to_string().contains("a;b"));
    }

    #[test]
    fn test_set_text_resets_specificity() {
        let mut sel = selector(".a");
        assert_eq!(sel.specificity(), 10);
        sel.set_text("#a").unwrap();
        assert_eq!(sel.specificity(), 100);
        assert!(sel.set_text("{").is_err());
        assert_eq!(sel.text(), "#a");
    }

    #[test]
    fn test_cache() {
        let cache = SpecificityCache::new();
        assert_eq!(selector("#a .b").specificity_in(&cache), 110);
        assert_eq!(selector("#a .b").specificity_in(&cache), 110);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_components() {
        let sel = selector("div.a > p + span ~ em strong");
        assert_eq!(
            sel.components(),
            vec![
                SelectorComponent::Compound(String::from("div.a")),
                SelectorComponent::Combinator(Combinator::Child),
                SelectorComponent::Compound(String::from("p")),
                SelectorComponent::Combinator(Combinator::NextSibling),
                SelectorComponent::Compound(String::from("span")),
                SelectorComponent::Combinator(Combinator::SubsequentSibling),
                SelectorComponent::Compound(String::from("em")),
                SelectorComponent::Combinator(Combinator::Descendant),
                SelectorComponent::Compound(String::from("strong")),
            ]
        );
    }

    #[test]
    fn test_components_respect_nesting() {
        let sel = selector("li:nth-child(2n + 1)>a[title='a > b']");
        assert_eq!(
            sel.components(),
            vec![
                SelectorComponent::Compound(String::from("li:nth-child(2n + 1)")),
                SelectorComponent::Combinator(Combinator::Child),
                SelectorComponent::Compound(String::from("a[title='a > b']")),
            ]
        );
    }

    #[test]
    fn test_split_selector_list() {
        assert_eq!(split_selector_list(".a, .b"), vec![".a", " .b"]);
        assert_eq!(split_selector_list(":is(a, b), c"), vec![":is(a, b)", " c"]);
        assert_eq!(split_selector_list("[x=\",\"]"), vec!["[x=\",\"]"]);
    }

    #[test]
    fn test_specificity_filter() {
        let filter = SpecificityFilter::parse(">= 100").unwrap();
        assert!(filter.matches(100));
        assert!(!filter.matches(99));
        assert!(SpecificityFilter::parse("10").unwrap().matches(10));
        assert!(SpecificityFilter::parse("< 5").unwrap().matches(4));
        assert!(SpecificityFilter::parse("lots").is_err());
    }
}
