//! Parser configuration

/// Default for [`ParserSettings::max_nesting_depth`]
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 64;

/// Options controlling how a stylesheet is parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserSettings {
    /// Charset assumed when the sheet has no `@charset` rule
    pub default_charset: String,
    /// Recover from malformed constructs instead of failing
    pub lenient: bool,
    /// Decode the input as Unicode. When off, the input is expected to be ASCII and
    /// anything else is an error in strict mode.
    pub multibyte: bool,
    /// Replace `@import` rules by the content they point to
    pub resolve_imports: bool,
    /// Maximum nesting of blocks and function arguments. Function values are parsed
    /// recursively, so large limits need a correspondingly large stack.
    pub max_nesting_depth: usize,
    /// Line number of the first line of input
    pub line_offset: usize,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            default_charset: String::from("utf-8"),
            lenient: true,
            multibyte: true,
            resolve_imports: false,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            line_offset: 1,
        }
    }
}

impl ParserSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings that fail on the first malformed construct
    pub fn strict() -> Self {
        Self::default().with_lenient(false)
    }

    pub fn with_lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    pub fn with_multibyte(mut self, multibyte: bool) -> Self {
        self.multibyte = multibyte;
        self
    }

    pub fn with_default_charset(mut self, charset: impl Into<String>) -> Self {
        self.default_charset = charset.into();
        self
    }

    pub fn with_import_resolution(mut self, resolve: bool) -> Self {
        self.resolve_imports = resolve;
        self
    }

    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Start line numbering at `line` (for fragments embedded in a larger file)
    pub fn with_line_offset(mut self, line: usize) -> Self {
        self.line_offset = line.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ParserSettings::default();
        assert!(settings.lenient);
        assert!(settings.multibyte);
        assert!(!settings.resolve_imports);
        assert_eq!(settings.default_charset, "utf-8");
        assert_eq!(settings.max_nesting_depth, DEFAULT_MAX_NESTING_DEPTH);
    }

    #[test]
    fn test_builder() {
        let settings = ParserSettings::strict()
            .with_multibyte(false)
            .with_line_offset(0)
            .with_default_charset("iso-8859-1");
        assert!(!settings.lenient);
        assert!(!settings.multibyte);
        assert_eq!(settings.line_offset, 1);
        assert_eq!(settings.default_charset, "iso-8859-1");
    }
}
