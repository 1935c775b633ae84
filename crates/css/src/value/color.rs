//! Color values: `#rgb` hex notation and `rgb()`/`hsl()` functions

use serde_json::json;
use smallvec::SmallVec;

use super::function::CssFunction;
use super::list::ValueList;
use super::size::Size;
use super::{parse_identifier_or_function, Value};
use crate::error::{CssError, CssResult, SourceLocation};
use crate::output::OutputFormat;
use crate::scanner::Scanner;

/// A color function whose components are keyed by the letters of its name
#[derive(Debug, Clone, PartialEq)]
pub struct Color {
    /// Function name, e.g. `rgb`, `rgba`, `hsl`
    pub name: String,
    pub components: SmallVec<[(char, Size); 4]>,
    pub location: Option<SourceLocation>,
}

impl Color {
    pub fn new(name: impl Into<String>, components: impl IntoIterator<Item = (char, Size)>) -> Self {
        Self { name: name.into(), components: components.into_iter().collect(), location: None }
    }

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(
            "rgb",
            [
                ('r', Size::color_component(r as f64)),
                ('g', Size::color_component(g as f64)),
                ('b', Size::color_component(b as f64)),
            ],
        )
    }

    pub fn component(&self, key: char) -> Option<&Size> {
        self.components.iter().find(|(k, _)| *k == key).map(|(_, size)| size)
    }

    /// Parse a color. A `var()` among the arguments yields a plain [`CssFunction`].
    pub fn parse(scanner: &mut Scanner) -> CssResult<Value> {
        let location = scanner.location();
        if scanner.comes("#") {
            scanner.consume("#")?;
            return Self::parse_hex(scanner, location).map(Value::Color);
        }

        let name = scanner.parse_identifier(true)?;
        scanner.consume_white_space()?;
        scanner.consume("(")?;

        let letters: Vec<char> = name.chars().collect();
        let mut arguments: Vec<(char, Value)> = Vec::with_capacity(letters.len());
        let mut contains_var = false;

        for (i, &letter) in letters.iter().enumerate() {
            scanner.consume_white_space()?;
            // `rgba(0 0 0 / 50%)`: the alpha follows a slash
            if letter == 'a' && i + 1 == letters.len() && i > 0 && scanner.comes("/") {
                break;
            }
            if scanner.comes_ignore_case("var") {
                arguments.push((letter, parse_identifier_or_function(scanner, false)?));
                contains_var = true;
            } else {
                arguments.push((letter, Value::Size(Size::parse(scanner, true)?)));
            }
            if contains_var && scanner.comes(")") {
                break;
            }

            let before = scanner.anchor();
            scanner.consume_white_space()?;
            let had_space = scanner.anchor() != before;
            if i + 1 < letters.len()
                && !scanner.comes("/")
                && (scanner.comes(",") || !had_space || scanner.comes(")"))
            {
                scanner.consume(",")?;
            }
        }

        let mut name = name;
        if !contains_var && scanner.comes("/") {
            scanner.consume("/")?;
            scanner.consume_white_space()?;
            let alpha = Size::parse(scanner, true)?;
            scanner.consume_white_space()?;
            if !name.ends_with('a') {
                name.push('a');
            }
            arguments.push(('a', Value::Size(alpha)));
        }
        scanner.consume(")")?;

        if contains_var {
            let values = arguments.into_iter().map(|(_, value)| value).collect();
            let mut function = CssFunction::new(name, ValueList::new(',', values));
            function.location = Some(location);
            return Ok(Value::Function(function));
        }

        let components = arguments
            .into_iter()
            .filter_map(|(letter, value)| match value {
                Value::Size(size) => Some((letter, size)),
                _ => None,
            })
            .collect();
        Ok(Value::Color(Self { name, components, location: Some(location) }))
    }

    fn parse_hex(scanner: &mut Scanner, location: SourceLocation) -> CssResult<Self> {
        let mut hex = scanner.parse_identifier(false)?;
        if hex.len() == 3 || hex.len() == 4 {
            hex = hex.chars().flat_map(|c| [c, c]).collect();
        }

        let invalid = || CssError::custom(format!("Invalid hex color value \"#{}\"", hex), location);
        if !hex.is_ascii() || !(hex.len() == 6 || hex.len() == 8) {
            return Err(invalid());
        }
        let mut bytes = SmallVec::<[u8; 4]>::new();
        for i in (0..hex.len()).step_by(2) {
            bytes.push(u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid())?);
        }

        let mut color = Self::rgb(bytes[0], bytes[1], bytes[2]);
        if let Some(&alpha) = bytes.get(3) {
            let alpha = (alpha as f64 / 255.0 * 100.0).round() / 100.0;
            color.name.push('a');
            color.components.push(('a', Size::color_component(alpha)));
        }
        color.location = Some(location);
        Ok(color)
    }

    /// `#rrggbb` for integral rgb components in range
    fn hex_digits(&self) -> Option<String> {
        let keys: String = self.components.iter().map(|(key, _)| *key).collect();
        if keys != "rgb" {
            return None;
        }
        let mut out = String::with_capacity(6);
        for (_, size) in &self.components {
            if size.unit.is_some() || size.value.fract() != 0.0 || !(0.0..=255.0).contains(&size.value) {
                return None;
            }
            out.push_str(&format!("{:02x}", size.value as u8));
        }
        Some(out)
    }

    pub fn render(&self, format: &OutputFormat) -> String {
        if format.rgb_hash_notation() {
            if let Some(hex) = self.hex_digits() {
                let bytes = hex.as_bytes();
                if format.short_hex_colors() && bytes[0] == bytes[1] && bytes[2] == bytes[3] && bytes[4] == bytes[5] {
                    return format!("#{}{}{}", bytes[0] as char, bytes[2] as char, bytes[4] as char);
                }
                return format!("#{}", hex);
            }
        }

        let formatter = format.formatter();
        let glue = format!(
            "{},{}",
            formatter.space_before_list_argument_separator(','),
            formatter.space_after_list_argument_separator(',')
        );
        let components: Vec<String> = self.components.iter().map(|(_, size)| size.render()).collect();
        format!("{}({})", self.name, components.join(&glue))
    }

    pub fn to_array(&self) -> serde_json::Value {
        let components: serde_json::Map<String, serde_json::Value> =
            self.components.iter().map(|(key, size)| (key.to_string(), size.to_array())).collect();
        json!({
            "class": "Color",
            "name": self.name,
            "components": components,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ParserSettings;

    fn parse(input: &str) -> Value {
        let mut scanner = Scanner::new(input, &ParserSettings::default());
        Color::parse(&mut scanner).unwrap()
    }

    fn parse_color(input: &str) -> Color {
        match parse(input) {
            Value::Color(color) => color,
            other => panic!("expected a color, got {:?}", other),
        }
    }

    #[test]
    fn test_hex_shorthand_expands() {
        let color = parse_color("#f0a");
        assert_eq!(color.name, "rgb");
        assert_eq!(color.component('r').map(|s| s.value), Some(255.0));
        assert_eq!(color.component('g').map(|s| s.value), Some(0.0));
        assert_eq!(color.component('b').map(|s| s.value), Some(170.0));
    }

    #[test]
    fn test_hex_alpha() {
        let color = parse_color("#ff000080");
        assert_eq!(color.name, "rgba");
        assert_eq!(color.component('a').map(|s| s.value), Some(0.5));

        let short = parse_color("#f008");
        assert_eq!(short.component('a').map(|s| s.value), Some(0.53));
    }

    #[test]
    fn test_invalid_hex() {
        let mut scanner = Scanner::new("#abcde", &ParserSettings::default());
        let err = Color::parse(&mut scanner).unwrap_err();
        assert!(err.to_string().contains("Invalid hex color value"));
    }

    #[test]
    fn test_function_components() {
        let color = parse_color("rgba(10, 20, 30, .5)");
        assert_eq!(color.name, "rgba");
        assert_eq!(color.components.len(), 4);
        assert_eq!(color.component('a').map(|s| s.value), Some(0.5));
        assert!(color.components.iter().all(|(_, size)| size.is_color_component));
    }

    #[test]
    fn test_space_separated_with_alpha() {
        let color = parse_color("rgb(1 2 3 / 50%)");
        assert_eq!(color.name, "rgba");
        assert_eq!(color.component('a').and_then(|s| s.unit.as_deref()), Some("%"));
    }

    #[test]
    fn test_slash_alpha_with_alpha_name() {
        for input in ["rgba(0 0 0 / 50%)", "rgba(0 0 0/.5)", "hsla(120deg 50% 50% / .3)"] {
            let color = parse_color(input);
            assert_eq!(color.components.len(), 4, "{}", input);
            assert!(color.component('a').is_some(), "{}", input);
        }
        assert_eq!(parse_color("rgba(0 0 0 / 50%)").render(&OutputFormat::compact()), "rgba(0,0,0,50%)");
    }

    #[test]
    fn test_var_degrades_to_function() {
        match parse("rgba(var(--rgb), .5)") {
            Value::Function(function) => {
                assert_eq!(function.name, "rgba");
                assert_eq!(function.arguments.components.len(), 2);
            }
            other => panic!("expected a function, got {:?}", other),
        }
    }

    #[test]
    fn test_render_hash_notation() {
        let default = OutputFormat::default();
        let compact = OutputFormat::compact();
        assert_eq!(Color::rgb(0x11, 0x22, 0x33).render(&default), "#112233");
        assert_eq!(Color::rgb(0x11, 0x22, 0x33).render(&compact), "#123");
        assert_eq!(Color::rgb(0x12, 0x22, 0x33).render(&compact), "#122233");
    }

    #[test]
    fn test_render_function_notation() {
        let mut format = OutputFormat::default();
        format.set_rgb_hash_notation(false);
        assert_eq!(Color::rgb(1, 2, 3).render(&format), "rgb(1,2,3)");
        assert_eq!(parse_color("hsl(120deg, 50%, 50%)").render(&OutputFormat::default()), "hsl(120deg,50%,50%)");
        assert_eq!(parse_color("rgba(0,0,0,.25)").render(&OutputFormat::pretty()), "rgba(0, 0, 0, .25)");
    }
}
