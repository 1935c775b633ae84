//! CSS parsing and rendering error types

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// CSS parsing result type
pub type CssResult<T> = Result<T, CssError>;

/// Source location in CSS
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (0-indexed, counted in characters)
    pub column: usize,
    /// Character offset from start
    pub offset: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}", self.line)
    }
}

/// A problem the parser recovered from, as reported to the `log` facade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: log::Level,
    pub message: String,
    pub location: Option<SourceLocation>,
}

/// What the parser was trying to match when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// A literal string
    Literal,
    /// An identifier
    Identifier,
    /// A number of characters
    Count,
    /// A regular expression
    Expression,
    /// A search for one of several stop characters
    Search,
    /// A free-form message
    Custom,
}

/// Render the "expected X, found Y" part of a token error
fn describe(kind: &MatchKind, expected: &str, found: &str) -> String {
    match kind {
        MatchKind::Search => format!("Search for \"{expected}\" returned no results. Context: \"{found}\""),
        MatchKind::Count => format!("Next token was expected to have {expected} chars. Context: \"{found}\""),
        MatchKind::Identifier => format!("Identifier expected. Got \"{found}\""),
        MatchKind::Custom => expected.trim().to_string(),
        MatchKind::Literal | MatchKind::Expression => {
            format!("Token \"{expected}\" ({kind:?}) not found. Got \"{found}\"")
        }
    }
}

/// CSS parsing errors
#[derive(Debug, Error)]
pub enum CssError {
    #[error("{} [{location}]", describe(.kind, .expected, .found))]
    UnexpectedToken {
        expected: String,
        found: String,
        kind: MatchKind,
        location: SourceLocation,
    },

    #[error("Unexpected end of input: {} [{location}]", describe(.kind, .expected, .found))]
    UnexpectedEof {
        expected: String,
        found: String,
        kind: MatchKind,
        location: SourceLocation,
    },

    #[error("{message} [{location}]")]
    Source {
        message: String,
        location: SourceLocation,
    },

    #[error("Cannot render: {message}")]
    Output {
        message: String,
        location: Option<SourceLocation>,
    },

    #[error("Nesting deeper than {limit} levels [{location}]")]
    NestingTooDeep {
        limit: usize,
        location: SourceLocation,
    },

    #[error("Failed to load '{locator}': {message}")]
    Load {
        locator: String,
        message: String,
    },
}

impl CssError {
    /// Get the source location of this error, if it has one
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            Self::UnexpectedToken { location, .. } => Some(*location),
            Self::UnexpectedEof { location, .. } => Some(*location),
            Self::Source { location, .. } => Some(*location),
            Self::Output { location, .. } => *location,
            Self::NestingTooDeep { location, .. } => Some(*location),
            Self::Load { .. } => None,
        }
    }

    /// Line number of the error, if known
    pub fn line(&self) -> Option<usize> {
        self.location().map(|location| location.line)
    }

    /// True for the recoverable grammar failures (token mismatch and premature end).
    pub fn is_unexpected_token(&self) -> bool {
        matches!(self, Self::UnexpectedToken { .. } | Self::UnexpectedEof { .. })
    }

    pub fn unexpected_token(
        expected: impl Into<String>,
        found: impl Into<String>,
        kind: MatchKind,
        location: SourceLocation,
    ) -> Self {
        Self::UnexpectedToken {
            expected: expected.into(),
            found: found.into(),
            kind,
            location,
        }
    }

    pub fn unexpected_eof(
        expected: impl Into<String>,
        found: impl Into<String>,
        kind: MatchKind,
        location: SourceLocation,
    ) -> Self {
        Self::UnexpectedEof {
            expected: expected.into(),
            found: found.into(),
            kind,
            location,
        }
    }

    /// Replace the source location of an error that carries one
    pub fn at(mut self, at: SourceLocation) -> Self {
        match &mut self {
            Self::UnexpectedToken { location, .. }
            | Self::UnexpectedEof { location, .. }
            | Self::Source { location, .. }
            | Self::NestingTooDeep { location, .. } => *location = at,
            Self::Output { location, .. } => *location = Some(at),
            Self::Load { .. } => {}
        }
        self
    }

    /// A free-form grammar error that lenient mode may recover from
    pub fn custom(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::unexpected_token(message, "", MatchKind::Custom, location)
    }

    pub fn source(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::Source { message: message.into(), location }
    }

    pub fn output(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self::Output { message: message.into(), location }
    }
}
