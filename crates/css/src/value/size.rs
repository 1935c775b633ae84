//! Numeric values with an optional unit

use serde_json::json;

use crate::error::{CssError, CssResult, SourceLocation};
use crate::scanner::Scanner;

/// Units of absolute length
const ABSOLUTE_UNITS: &[&str] = &[
    "px", "pt", "pc", "cm", "mm", "mozmm", "q", "in", "vh", "dvh", "svh", "lvh", "vw", "dvw", "svw", "lvw", "vmin", "vmax",
    "rem",
];

/// Units relative to the font or container
const RELATIVE_UNITS: &[&str] = &["%", "em", "ex", "ch", "fr"];

/// Angles, times, frequencies and resolutions
const NON_SIZE_UNITS: &[&str] = &["deg", "grad", "rad", "turn", "s", "ms", "Hz", "kHz", "dpi", "dpcm", "dppx", "x"];

/// A number, optionally followed by a unit (`12px`, `.5`, `50%`, `90deg`)
#[derive(Debug, Clone, PartialEq)]
pub struct Size {
    pub value: f64,
    pub unit: Option<String>,
    /// Set for the components of `rgb()`/`hsl()` colors
    pub is_color_component: bool,
    pub location: Option<SourceLocation>,
}

impl Size {
    pub fn new(value: f64, unit: Option<&str>) -> Self {
        Self {
            value,
            unit: unit.map(canonical_unit),
            is_color_component: false,
            location: None,
        }
    }

    pub fn color_component(value: f64) -> Self {
        Self { is_color_component: true, ..Self::new(value, None) }
    }

    /// Does a number start at the cursor?
    pub fn comes(scanner: &Scanner) -> bool {
        let digit_at = |offset| scanner.peek_char_at(offset).map(|c| c.is_ascii_digit()).unwrap_or(false);
        if digit_at(0) {
            return true;
        }
        if scanner.comes("-.") {
            return digit_at(2);
        }
        (scanner.comes("-") || scanner.comes(".")) && digit_at(1)
    }

    pub fn parse(scanner: &mut Scanner, is_color_component: bool) -> CssResult<Self> {
        let location = scanner.location();
        if !Self::comes(scanner) {
            return Err(CssError::custom(
                format!("Number expected. Got \"{}\"", scanner.peek(5, 0)),
                location,
            ));
        }

        let mut number = String::new();
        if scanner.comes("-") {
            number.push(scanner.consume_char()?);
        }
        take_digits(scanner, &mut number)?;
        if scanner.comes(".") && scanner.peek_char_at(1).map(|c| c.is_ascii_digit()).unwrap_or(false) {
            number.push(scanner.consume_char()?);
            take_digits(scanner, &mut number)?;
        }
        if scanner.peek_char().map(|c| c == 'e' || c == 'E').unwrap_or(false) {
            let exponent_follows = match scanner.peek_char_at(1) {
                Some(c) if c.is_ascii_digit() => true,
                Some('+') | Some('-') => scanner.peek_char_at(2).map(|c| c.is_ascii_digit()).unwrap_or(false),
                _ => false,
            };
            if exponent_follows {
                number.push(scanner.consume_char()?);
                if scanner.comes("+") || scanner.comes("-") {
                    number.push(scanner.consume_char()?);
                }
                take_digits(scanner, &mut number)?;
            }
        }

        // str::parse is locale independent
        let value: f64 = number
            .parse()
            .map_err(|_| CssError::custom(format!("Invalid number \"{}\"", number), location))?;

        let unit = if scanner.comes("%") {
            scanner.consume("%")?;
            Some(String::from("%"))
        } else {
            let mut unit = String::new();
            while let Some(c) = scanner.peek_char() {
                if !c.is_ascii_alphabetic() {
                    break;
                }
                unit.push(scanner.consume_char()?);
            }
            (!unit.is_empty()).then(|| canonical_unit(&unit))
        };

        Ok(Self { value, unit, is_color_component, location: Some(location) })
    }

    /// True unless this is an angle/time/frequency or a color component
    pub fn is_size(&self) -> bool {
        if self.is_color_component {
            return false;
        }
        match &self.unit {
            Some(unit) => !NON_SIZE_UNITS.contains(&unit.as_str()),
            None => true,
        }
    }

    /// Relative units, and non-zero unitless numbers
    pub fn is_relative(&self) -> bool {
        match &self.unit {
            Some(unit) => RELATIVE_UNITS.contains(&unit.as_str()),
            None => self.value != 0.0,
        }
    }

    pub fn render(&self) -> String {
        let mut out = format_number(self.value);
        if let Some(unit) = &self.unit {
            out.push_str(unit);
        }
        out
    }

    pub fn to_array(&self) -> serde_json::Value {
        json!({
            "class": "Size",
            "value": self.value,
            "unit": self.unit,
            "is_color_component": self.is_color_component,
        })
    }
}

fn take_digits(scanner: &mut Scanner, out: &mut String) -> CssResult<()> {
    while scanner.peek_char().map(|c| c.is_ascii_digit()).unwrap_or(false) {
        out.push(scanner.consume_char()?);
    }
    Ok(())
}

/// Known units in their usual spelling; unknown units are kept as written
fn canonical_unit(unit: &str) -> String {
    ABSOLUTE_UNITS
        .iter()
        .chain(RELATIVE_UNITS)
        .chain(NON_SIZE_UNITS)
        .find(|known| known.eq_ignore_ascii_case(unit))
        .map(|known| known.to_string())
        .unwrap_or_else(|| unit.to_string())
}

/// `0.5` renders as `.5`, integral values without a fraction
fn format_number(value: f64) -> String {
    let text = value.to_string();
    if let Some(rest) = text.strip_prefix("0.") {
        format!(".{}", rest)
    } else if let Some(rest) = text.strip_prefix("-0.") {
        format!("-.{}", rest)
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ParserSettings;

    fn parse(input: &str) -> Size {
        let mut scanner = Scanner::new(input, &ParserSettings::default());
        Size::parse(&mut scanner, false).unwrap()
    }

    #[test]
    fn test_parse_units() {
        let size = parse("12px");
        assert_eq!(size.value, 12.0);
        assert_eq!(size.unit.as_deref(), Some("px"));

        assert_eq!(parse("50%").unit.as_deref(), Some("%"));
        assert_eq!(parse("10PX").unit.as_deref(), Some("px"));
        assert_eq!(parse("2khz").unit.as_deref(), Some("kHz"));
        assert_eq!(parse("3foo").unit.as_deref(), Some("foo"));
        assert_eq!(parse("7").unit, None);
    }

    #[test]
    fn test_parse_fractions_and_signs() {
        assert_eq!(parse(".5em").value, 0.5);
        assert_eq!(parse("-.25").value, -0.25);
        assert_eq!(parse("-3.75px").value, -3.75);
    }

    #[test]
    fn test_parse_exponent() {
        assert_eq!(parse("1e3").value, 1000.0);
        assert_eq!(parse("2.5E-2").value, 0.025);
        let em = parse("1em");
        assert_eq!(em.value, 1.0);
        assert_eq!(em.unit.as_deref(), Some("em"));
    }

    #[test]
    fn test_comes() {
        let settings = ParserSettings::default();
        assert!(Size::comes(&Scanner::new("-.5", &settings)));
        assert!(Size::comes(&Scanner::new(".5", &settings)));
        assert!(!Size::comes(&Scanner::new("-moz-box", &settings)));
        assert!(!Size::comes(&Scanner::new(".a", &settings)));
    }

    #[test]
    fn test_render() {
        assert_eq!(Size::new(0.5, Some("em")).render(), ".5em");
        assert_eq!(Size::new(-0.5, None).render(), "-.5");
        assert_eq!(Size::new(10.0, Some("px")).render(), "10px");
        assert_eq!(Size::new(1.25, Some("%")).render(), "1.25%");
        assert_eq!(Size::new(0.0, None).render(), "0");
    }

    #[test]
    fn test_classification() {
        assert!(Size::new(10.0, Some("px")).is_size());
        assert!(!Size::new(90.0, Some("deg")).is_size());
        assert!(!Size::color_component(255.0).is_size());
        assert!(Size::new(2.0, Some("em")).is_relative());
        assert!(!Size::new(0.0, None).is_relative());
    }
}
