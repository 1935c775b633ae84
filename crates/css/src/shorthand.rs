//! Shorthand expansion and contraction
//!
//! `margin: 1px 2px` becomes `margin-top` .. `margin-left` and back. New declarations
//! are appended to the rule set; the ones they replace are removed.

use crate::declaration::Declaration;
use crate::list::CssList;
use crate::output::OutputFormat;
use crate::rule_set::RuleSet;
use crate::value::{Size, Value, ValueList};

const POSITIONS: [&str; 4] = ["top", "right", "bottom", "left"];

/// Shorthand name and the pattern of its per-side longhands
const DIMENSIONS: [(&str, &str); 5] = [
    ("margin", "margin-{}"),
    ("padding", "padding-{}"),
    ("border-color", "border-{}-color"),
    ("border-style", "border-{}-style"),
    ("border-width", "border-{}-width"),
];

const BORDER_RULES: [&str; 5] = ["border", "border-left", "border-right", "border-top", "border-bottom"];
const BORDER_SIZES: [&str; 3] = ["thin", "medium", "thick"];

const LIST_STYLE_TYPES: [&str; 21] = [
    "none",
    "disc",
    "circle",
    "square",
    "decimal-leading-zero",
    "decimal",
    "lower-roman",
    "upper-roman",
    "lower-greek",
    "lower-alpha",
    "lower-latin",
    "upper-alpha",
    "upper-latin",
    "hebrew",
    "armenian",
    "georgian",
    "cjk-ideographic",
    "hiragana",
    "hira-gana-iroha",
    "katakana-iroha",
    "katakana",
];

fn side(pattern: &str, position: &str) -> String {
    pattern.replace("{}", position)
}

/// Top-level components of a declaration value
fn components(value: &Value) -> Vec<Value> {
    match value {
        Value::List(list) => list.components.clone(),
        other => vec![other.clone()],
    }
}

/// One value, or a list of them joined by `separator`
fn join(mut values: Vec<Value>, separator: char) -> Value {
    if values.len() == 1 {
        values.remove(0)
    } else {
        Value::List(ValueList::new(separator, values))
    }
}

fn keyword(value: &Value) -> Option<String> {
    value.as_ident().map(str::to_ascii_lowercase)
}

fn is_keyword(value: &Value, words: &[&str]) -> bool {
    keyword(value).map(|word| words.contains(&word.as_str())).unwrap_or(false)
}

fn same(a: &Value, b: &Value) -> bool {
    let format = OutputFormat::default();
    a.render(&format) == b.render(&format)
}

impl RuleSet {
    /// Split every supported shorthand into its longhands
    pub fn expand_shorthands(&mut self) {
        // border before the dimensions: `border-width` may come out of `border`
        self.expand_border_shorthand();
        self.expand_dimensions_shorthand();
        self.expand_font_shorthand();
        self.expand_background_shorthand();
        self.expand_list_style_shorthand();
    }

    /// Fold longhands back into shorthands where all the parts are present
    pub fn create_shorthands(&mut self) {
        self.create_background_shorthand();
        self.create_dimensions_shorthand();
        // after the dimensions, which may have produced `border-width` and friends
        self.create_border_shorthand();
        self.create_font_shorthand();
        self.create_list_style_shorthand();
    }

    /// Append `property: value` carrying over importance and location of `source`
    fn add_derived(&mut self, property: impl Into<String>, value: Value, source: &Declaration) {
        let mut rule = Declaration::new(property, value).important(source.important);
        rule.location = source.location;
        self.add_rule(rule);
    }

    fn last_rule(&self, property: &str) -> Option<Declaration> {
        self.rules_assoc(Some(property)).remove(property).cloned()
    }

    /// `border: 1px solid red` into `border-width`, `border-style`, `border-color`
    pub fn expand_border_shorthand(&mut self) {
        for property in BORDER_RULES {
            let Some(rule) = self.last_rule(property) else {
                continue;
            };
            for value in components(&rule.value) {
                let suffix = match &value {
                    Value::Size(_) => "width",
                    Value::Color(_) => "color",
                    other if is_keyword(other, &BORDER_SIZES) => "width",
                    _ => "style",
                };
                self.add_derived(format!("{}-{}", property, suffix), value, &rule);
            }
            self.remove_rule(property);
        }
    }

    /// `margin: 1px 2px` into the four sides, likewise for padding and border parts
    pub fn expand_dimensions_shorthand(&mut self) {
        for (property, pattern) in DIMENSIONS {
            let Some(rule) = self.last_rule(property) else {
                continue;
            };
            let values = components(&rule.value);
            let (top, right, bottom, left) = match values.as_slice() {
                [all] => (all, all, all, all),
                [vertical, horizontal] => (vertical, horizontal, vertical, horizontal),
                [top, horizontal, bottom] => (top, horizontal, bottom, horizontal),
                [top, right, bottom, left] => (top, right, bottom, left),
                _ => {
                    log::debug!("Not expanding {} with {} components", property, values.len());
                    continue;
                }
            };
            for (position, value) in POSITIONS.iter().zip([top, right, bottom, left]) {
                self.add_derived(side(pattern, position), value.clone(), &rule);
            }
            self.remove_rule(property);
        }
    }

    /// `font: italic bold 12px/1.5 serif` into the `font-*` longhands and `line-height`
    pub fn expand_font_shorthand(&mut self) {
        let Some(rule) = self.last_rule("font") else {
            return;
        };
        let normal = || Value::ident("normal");
        let mut style = normal();
        let mut variant = normal();
        let mut weight = normal();
        let mut size = normal();
        let mut line_height = normal();
        let mut family = None;

        for value in components(&rule.value) {
            let word = keyword(&value);
            match (word.as_deref(), &value) {
                (Some("normal"), _) => {}
                (Some("inherit"), _) => {
                    style = value.clone();
                    variant = value.clone();
                    weight = value.clone();
                }
                (Some("italic" | "oblique"), _) => style = value.clone(),
                (Some("small-caps"), _) => variant = value.clone(),
                (Some("bold" | "bolder" | "lighter"), _) => weight = value.clone(),
                (_, Value::Size(Size { value: number, unit: None, .. }))
                    if (100.0..=900.0).contains(number) && number % 100.0 == 0.0 =>
                {
                    weight = value.clone()
                }
                (_, Value::List(list)) if list.separator == '/' && list.len() == 2 => {
                    size = list.components[0].clone();
                    line_height = list.components[1].clone();
                }
                (_, Value::Size(Size { unit: Some(_), .. })) => size = value.clone(),
                _ => family = Some(value.clone()),
            }
        }

        self.add_derived("font-style", style, &rule);
        self.add_derived("font-variant", variant, &rule);
        self.add_derived("font-weight", weight, &rule);
        self.add_derived("font-size", size, &rule);
        self.add_derived("line-height", line_height, &rule);
        if let Some(family) = family {
            self.add_derived("font-family", family, &rule);
        }
        self.remove_rule("font");
    }

    /// `background: url(a.png) no-repeat top red` into the `background-*` longhands
    pub fn expand_background_shorthand(&mut self) {
        let Some(rule) = self.last_rule("background") else {
            return;
        };
        let values = components(&rule.value);
        let names = [
            "background-color",
            "background-image",
            "background-repeat",
            "background-attachment",
            "background-position",
        ];

        if let [only] = values.as_slice() {
            if is_keyword(only, &["inherit"]) {
                for name in names {
                    self.add_derived(name, only.clone(), &rule);
                }
                self.remove_rule("background");
                return;
            }
        }

        let zero = || Value::Size(Size::new(0.0, Some("%")));
        let mut color = Value::ident("transparent");
        let mut image = Value::ident("none");
        let mut repeat = Value::ident("repeat");
        let mut attachment = Value::ident("scroll");
        let mut position = vec![zero(), zero()];
        let mut positions_seen = 0;

        for value in &values {
            match value {
                Value::Url(_) => image = value.clone(),
                Value::Color(_) => color = value.clone(),
                other if is_keyword(other, &["scroll", "fixed"]) => attachment = value.clone(),
                other if is_keyword(other, &["repeat", "no-repeat", "repeat-x", "repeat-y"]) => repeat = value.clone(),
                other if matches!(other, Value::Size(_)) || is_keyword(other, &["left", "center", "right", "top", "bottom"]) => {
                    if positions_seen == 0 {
                        position = vec![value.clone(), Value::ident("center")];
                    } else if positions_seen < position.len() {
                        position[positions_seen] = value.clone();
                    }
                    positions_seen += 1;
                }
                other if other.as_ident().is_some() => color = value.clone(),
                _ => {}
            }
        }

        self.add_derived("background-color", color, &rule);
        self.add_derived("background-image", image, &rule);
        self.add_derived("background-repeat", repeat, &rule);
        self.add_derived("background-attachment", attachment, &rule);
        self.add_derived("background-position", join(position, ' '), &rule);
        self.remove_rule("background");
    }

    /// `list-style: square inside` into the `list-style-*` longhands
    pub fn expand_list_style_shorthand(&mut self) {
        let Some(rule) = self.last_rule("list-style") else {
            return;
        };
        let values = components(&rule.value);
        let names = ["list-style-type", "list-style-position", "list-style-image"];

        if let [only] = values.as_slice() {
            if is_keyword(only, &["inherit"]) {
                for name in names {
                    self.add_derived(name, only.clone(), &rule);
                }
                self.remove_rule("list-style");
                return;
            }
        }

        let mut kind = Value::ident("disc");
        let mut position = Value::ident("outside");
        let mut image = Value::ident("none");
        for value in &values {
            match value {
                Value::Url(_) => image = value.clone(),
                other if is_keyword(other, &LIST_STYLE_TYPES) => kind = value.clone(),
                other if is_keyword(other, &["inside", "outside"]) => position = value.clone(),
                _ => {}
            }
        }

        self.add_derived("list-style-type", kind, &rule);
        self.add_derived("list-style-position", position, &rule);
        self.add_derived("list-style-image", image, &rule);
        self.remove_rule("list-style");
    }

    /// Fold the non-important `properties` into `shorthand`, space-separated
    fn create_shorthand_properties(&mut self, properties: &[&str], shorthand: &str) {
        let mut values = Vec::new();
        let mut source = None;
        for property in properties {
            let Some(rule) = self.last_rule(property) else {
                continue;
            };
            if rule.important {
                continue;
            }
            values.extend(components(&rule.value));
            self.remove_rule(property);
            source = Some(rule);
        }
        if let Some(source) = source {
            if !values.is_empty() {
                self.add_derived(shorthand, join(values, ' '), &source);
            }
        }
    }

    pub fn create_background_shorthand(&mut self) {
        self.create_shorthand_properties(
            &[
                "background-color",
                "background-image",
                "background-repeat",
                "background-position",
                "background-attachment",
            ],
            "background",
        );
    }

    pub fn create_list_style_shorthand(&mut self) {
        self.create_shorthand_properties(
            &["list-style-type", "list-style-position", "list-style-image"],
            "list-style",
        );
    }

    pub fn create_border_shorthand(&mut self) {
        self.create_shorthand_properties(&["border-width", "border-style", "border-color"], "border");
    }

    /// Fold four equal-importance sides into the shortest equivalent shorthand
    pub fn create_dimensions_shorthand(&mut self) {
        for (property, pattern) in DIMENSIONS {
            let sides: Vec<Declaration> = POSITIONS
                .iter()
                .filter_map(|position| self.last_rule(&side(pattern, position)))
                .collect();
            let [top, right, bottom, left] = sides.as_slice() else {
                continue;
            };
            if sides.iter().any(|rule| rule.important != top.important) {
                continue;
            }

            let mut values = vec![top.value.clone()];
            if !same(&left.value, &right.value) {
                values.extend([right.value.clone(), bottom.value.clone(), left.value.clone()]);
            } else if !same(&top.value, &bottom.value) {
                values.extend([right.value.clone(), bottom.value.clone()]);
            } else if !same(&top.value, &left.value) {
                values.push(right.value.clone());
            }

            let source = top.clone();
            for position in POSITIONS {
                self.remove_rule(&side(pattern, position));
            }
            self.add_derived(property, join(values, ' '), &source);
        }
    }

    /// Needs at least `font-size` and `font-family`
    pub fn create_font_shorthand(&mut self) {
        let (Some(size), Some(family)) = (self.last_rule("font-size"), self.last_rule("font-family")) else {
            return;
        };
        let parts = ["font-style", "font-variant", "font-weight", "font-size", "line-height", "font-family"];
        let rules: Vec<Declaration> = parts.iter().filter_map(|part| self.last_rule(part)).collect();
        if rules.iter().any(|rule| rule.important) {
            return;
        }

        let mut values = Vec::new();
        for property in ["font-style", "font-variant", "font-weight"] {
            if let Some(rule) = self.last_rule(property) {
                if !is_keyword(&rule.value, &["normal"]) {
                    values.push(rule.value.clone());
                }
            }
        }

        match self.last_rule("line-height") {
            Some(line_height) if !is_keyword(&line_height.value, &["normal"]) => {
                values.push(join(vec![size.value.clone(), line_height.value.clone()], '/'));
            }
            _ => values.push(size.value.clone()),
        }
        values.push(family.value.clone());

        for part in parts {
            self.remove_rule(part);
        }
        self.add_derived("font", join(values, ' '), &size);
    }
}

impl CssList {
    /// Expand shorthands in every declaration block
    pub fn expand_shorthands(&mut self) {
        for block in self.all_declaration_blocks_mut() {
            block.expand_shorthands();
        }
    }

    /// Create shorthands in every declaration block
    pub fn create_shorthands(&mut self) {
        for block in self.all_declaration_blocks_mut() {
            block.create_shorthands();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule_set::DeclarationBlock;

    fn block(declarations: &[(&str, &str)]) -> DeclarationBlock {
        let mut block = DeclarationBlock::with_selectors("p").unwrap();
        for (property, value) in declarations {
            block.add_rule(Declaration::new(*property, Value::parse_str(value, property).unwrap()));
        }
        block
    }

    fn rendered(block: &DeclarationBlock) -> Vec<String> {
        let format = OutputFormat::compact();
        block
            .declarations()
            .iter()
            .map(|rule| format!("{}:{}", rule.property, rule.value.render(&format)))
            .collect()
    }

    #[test]
    fn test_expand_dimensions() {
        let mut b = block(&[("margin", "1px 2px 3px")]);
        b.expand_dimensions_shorthand();
        assert_eq!(
            rendered(&b),
            vec!["margin-top:1px", "margin-right:2px", "margin-bottom:3px", "margin-left:2px"]
        );
    }

    #[test]
    fn test_expand_dimensions_keeps_importance() {
        let mut b = DeclarationBlock::with_selectors("p").unwrap();
        b.add_rule(Declaration::new("padding", Value::parse_str("0", "padding").unwrap()).important(true));
        b.expand_shorthands();
        assert_eq!(b.declarations().len(), 4);
        assert!(b.declarations().iter().all(|rule| rule.important));
    }

    #[test]
    fn test_expand_border() {
        let mut b = block(&[("border", "thin solid #f00")]);
        b.expand_shorthands();
        let out = rendered(&b);
        assert!(out.contains(&String::from("border-top-width:thin")));
        assert!(out.contains(&String::from("border-left-style:solid")));
        assert!(out.contains(&String::from("border-bottom-color:#f00")));
        assert_eq!(out.len(), 12);
    }

    #[test]
    fn test_expand_font() {
        let mut b = block(&[("font", "italic 500 12px/1.5 Helvetica, sans-serif")]);
        b.expand_font_shorthand();
        assert_eq!(
            rendered(&b),
            vec![
                "font-style:italic",
                "font-variant:normal",
                "font-weight:500",
                "font-size:12px",
                "line-height:1.5",
                "font-family:Helvetica,sans-serif",
            ]
        );
    }

    #[test]
    fn test_expand_background() {
        let mut b = block(&[("background", "url(a.png) no-repeat top #fff")]);
        b.expand_background_shorthand();
        assert_eq!(
            rendered(&b),
            vec![
                "background-color:#fff",
                "background-image:url(\"a.png\")",
                "background-repeat:no-repeat",
                "background-attachment:scroll",
                "background-position:top center",
            ]
        );
    }

    #[test]
    fn test_expand_list_style() {
        let mut b = block(&[("list-style", "square inside")]);
        b.expand_list_style_shorthand();
        assert_eq!(
            rendered(&b),
            vec!["list-style-type:square", "list-style-position:inside", "list-style-image:none"]
        );
    }

    #[test]
    fn test_create_dimensions() {
        let mut b = block(&[
            ("margin-top", "1px"),
            ("margin-right", "2px"),
            ("margin-bottom", "1px"),
            ("margin-left", "2px"),
        ]);
        b.create_dimensions_shorthand();
        assert_eq!(rendered(&b), vec!["margin:1px 2px"]);

        let mut b = block(&[
            ("padding-top", "1px"),
            ("padding-right", "2px"),
            ("padding-bottom", "3px"),
            ("padding-left", "4px"),
        ]);
        b.create_dimensions_shorthand();
        assert_eq!(rendered(&b), vec!["padding:1px 2px 3px 4px"]);
    }

    #[test]
    fn test_create_dimensions_needs_all_sides() {
        let mut b = block(&[("margin-top", "1px"), ("margin-left", "2px")]);
        b.create_shorthands();
        assert_eq!(b.declarations().len(), 2);
    }

    #[test]
    fn test_create_font() {
        let mut b = block(&[
            ("font-weight", "bold"),
            ("font-size", "12px"),
            ("line-height", "1.5"),
            ("font-family", "Arial, serif"),
        ]);
        b.create_font_shorthand();
        assert_eq!(rendered(&b), vec!["font:bold 12px/1.5 Arial,serif"]);
    }

    #[test]
    fn test_create_border_skips_important() {
        let mut b = block(&[("border-width", "1px"), ("border-style", "solid")]);
        b.add_rule(Declaration::new("border-color", Value::ident("red")).important(true));
        b.create_border_shorthand();
        assert_eq!(rendered(&b), vec!["border-color:red", "border:1px solid"]);
    }

    #[test]
    fn test_round_trip_through_longhands() {
        let mut b = block(&[("margin", "0 auto")]);
        b.expand_shorthands();
        b.create_shorthands();
        assert_eq!(rendered(&b), vec!["margin:0 auto"]);
    }
}
