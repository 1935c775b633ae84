//! CSS Scanner
//!
//! Character-level cursor over the source text. Every grammar component reads input
//! through this type: lookahead, literal and pattern consumption, comment skipping,
//! escape decoding and anchored backtracking.

use regex::Regex;
use std::sync::LazyLock;

use crate::comment::Comment;
use crate::error::{CssError, CssResult, Diagnostic, MatchKind, SourceLocation};
use crate::settings::ParserSettings;

static HEX_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{1,6}").expect("valid hex escape pattern"));

/// A saved cursor position that can be restored with [`Scanner::backtrack`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    position: usize,
    line: usize,
    line_start: usize,
}

/// Stop condition for [`Scanner::consume_until`]
#[derive(Debug, Clone, Copy)]
pub struct Until<'s> {
    chars: &'s [char],
    or_eof: bool,
    include_end: bool,
    consume_end: bool,
}

impl<'s> Until<'s> {
    /// Stop before the first of `chars`
    pub fn any_of(chars: &'s [char]) -> Self {
        Self { chars, or_eof: false, include_end: false, consume_end: false }
    }

    /// Reaching the end of input is a valid stop as well
    pub fn or_eof(mut self) -> Self {
        self.or_eof = true;
        self
    }

    /// Consume the stop character and append it to the result
    pub fn including_end(mut self) -> Self {
        self.include_end = true;
        self
    }

    /// Consume the stop character without appending it
    pub fn consuming_end(mut self) -> Self {
        self.consume_end = true;
        self
    }

    fn describe(&self) -> String {
        let mut parts: Vec<String> = self.chars.iter().map(|c| c.to_string()).collect();
        if self.or_eof {
            parts.push(String::from("EOF"));
        }
        format!("One of (\"{}\")", parts.join("\",\""))
    }
}

/// CSS Scanner
pub struct Scanner {
    chars: Vec<char>,
    position: usize,
    line: usize,
    line_start: usize,
    lenient: bool,
    multibyte: bool,
    depth: usize,
    max_depth: usize,
    diagnostics: Vec<Diagnostic>,
}

impl Scanner {
    /// Create a scanner over `input`
    pub fn new(input: &str, settings: &ParserSettings) -> Self {
        // ASCII input without multibyte support maps bytes straight to characters;
        // non-ASCII input is decoded and flagged by check_encoding
        let chars = if !settings.multibyte && input.is_ascii() {
            input.bytes().map(char::from).collect()
        } else {
            input.chars().collect()
        };

        Self {
            chars,
            position: 0,
            line: settings.line_offset.max(1),
            line_start: 0,
            lenient: settings.lenient,
            multibyte: settings.multibyte,
            depth: 0,
            max_depth: settings.max_nesting_depth,
            diagnostics: Vec::new(),
        }
    }

    /// Get the current source location
    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.position - self.line_start, self.position)
    }

    pub fn current_line(&self) -> usize {
        self.line
    }

    pub fn is_lenient(&self) -> bool {
        self.lenient
    }

    /// With multibyte support disabled, reject non-ASCII input (strict) or note it and
    /// scan it as Unicode anyway (lenient)
    pub fn check_encoding(&mut self) -> CssResult<()> {
        if self.multibyte {
            return Ok(());
        }
        let Some(index) = self.chars.iter().position(|c| !c.is_ascii()) else {
            return Ok(());
        };

        let line_start = self.chars[..index].iter().rposition(|&c| c == '\n').map(|i| i + 1).unwrap_or(0);
        let newlines = self.chars[..index].iter().filter(|&&c| c == '\n').count();
        let location = SourceLocation::new(self.line + newlines, index - line_start, index);
        let message = format!("Non-ASCII character {:?} with multibyte support disabled", self.chars[index]);
        if !self.lenient {
            return Err(CssError::source(message, location));
        }
        self.report(log::Level::Warn, message, Some(location));
        Ok(())
    }

    pub fn is_end(&self) -> bool {
        self.position >= self.chars.len()
    }

    /// Snapshot the cursor for later backtracking
    pub fn anchor(&self) -> Anchor {
        Anchor { position: self.position, line: self.line, line_start: self.line_start }
    }

    /// Restore a snapshot taken with [`Scanner::anchor`]
    pub fn backtrack(&mut self, anchor: Anchor) {
        self.position = anchor.position;
        self.line = anchor.line;
        self.line_start = anchor.line_start;
    }

    /// Log a recovered problem and keep it for [`Scanner::take_diagnostics`]
    pub fn report(&mut self, level: log::Level, message: impl Into<String>, location: Option<SourceLocation>) {
        let message = message.into();
        match location {
            Some(location) => log::log!(level, "{} [{}]", message, location),
            None => log::log!(level, "{}", message),
        }
        self.diagnostics.push(Diagnostic { level, message, location });
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Track one more level of block or function nesting
    pub fn enter_nesting(&mut self) -> CssResult<()> {
        if self.depth >= self.max_depth {
            return Err(CssError::NestingTooDeep { limit: self.max_depth, location: self.location() });
        }
        self.depth += 1;
        Ok(())
    }

    pub fn leave_nesting(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Peek at the next character without consuming
    pub fn peek_char(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    /// Character `offset` positions after the cursor
    pub fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.position + offset).copied()
    }

    /// Character just before the cursor
    pub fn previous_char(&self) -> Option<char> {
        self.position.checked_sub(1).and_then(|i| self.chars.get(i).copied())
    }

    /// Up to `length` characters starting `offset` characters after the cursor.
    /// Never fails; returns an empty string past the end.
    pub fn peek(&self, length: usize, offset: usize) -> String {
        let start = (self.position + offset).min(self.chars.len());
        let end = (start + length).min(self.chars.len());
        self.chars[start..end].iter().collect()
    }

    /// Does `literal` follow the cursor (exact match)?
    pub fn comes(&self, literal: &str) -> bool {
        let mut index = self.position;
        for expected in literal.chars() {
            match self.chars.get(index) {
                Some(&c) if c == expected => index += 1,
                _ => return false,
            }
        }
        true
    }

    /// Does `literal` follow the cursor, ignoring ASCII case?
    pub fn comes_ignore_case(&self, literal: &str) -> bool {
        let mut index = self.position;
        for expected in literal.chars() {
            match self.chars.get(index) {
                Some(c) if c.eq_ignore_ascii_case(&expected) => index += 1,
                _ => return false,
            }
        }
        true
    }

    /// Is the next character whitespace?
    pub fn comes_whitespace(&self) -> bool {
        self.peek_char().map(is_whitespace).unwrap_or(false)
    }

    /// Move the cursor forward one character, tracking line numbers
    fn advance(&mut self) -> Option<char> {
        let c = *self.chars.get(self.position)?;
        self.position += 1;
        if c == '\n' {
            self.line += 1;
            self.line_start = self.position;
        }
        Some(c)
    }

    /// Consume exactly `literal`
    pub fn consume(&mut self, literal: &str) -> CssResult<String> {
        if self.comes(literal) {
            for _ in literal.chars() {
                self.advance();
            }
            return Ok(literal.to_string());
        }

        let length = literal.chars().count();
        let found = self.peek(length.max(5), 0);
        if self.position + length > self.chars.len() {
            Err(CssError::unexpected_eof(literal, found, MatchKind::Literal, self.location()))
        } else {
            Err(CssError::unexpected_token(literal, found, MatchKind::Literal, self.location()))
        }
    }

    /// Consume `count` characters
    pub fn consume_count(&mut self, count: usize) -> CssResult<String> {
        if self.position + count > self.chars.len() {
            return Err(CssError::unexpected_eof(
                count.to_string(),
                self.peek(5, 0),
                MatchKind::Count,
                self.location(),
            ));
        }
        let mut out = String::with_capacity(count);
        for _ in 0..count {
            if let Some(c) = self.advance() {
                out.push(c);
            }
        }
        Ok(out)
    }

    /// Consume one character
    pub fn consume_char(&mut self) -> CssResult<char> {
        match self.advance() {
            Some(c) => Ok(c),
            None => Err(CssError::unexpected_eof("1", "", MatchKind::Count, self.location())),
        }
    }

    /// Consume the match of an anchored `pattern` found within the next `max_lookahead`
    /// characters (or the rest of the input).
    pub fn consume_expression(&mut self, pattern: &Regex, max_lookahead: Option<usize>) -> CssResult<String> {
        let window = max_lookahead.unwrap_or(self.chars.len() - self.position.min(self.chars.len()));
        let input = self.peek(window, 0);
        match pattern.find(&input) {
            Some(found) if found.start() == 0 && !found.as_str().is_empty() => {
                let count = found.as_str().chars().count();
                self.consume_count(count)
            }
            _ => Err(CssError::unexpected_token(
                pattern.as_str(),
                self.peek(5, 0),
                MatchKind::Expression,
                self.location(),
            )),
        }
    }

    /// Consume a comment if one starts at the cursor
    pub fn consume_comment(&mut self) -> CssResult<Option<Comment>> {
        if !self.comes("/*") {
            return Ok(None);
        }
        let location = self.location();
        self.advance(); // consume '/'
        self.advance(); // consume '*'

        let mut text = String::new();
        loop {
            if self.comes("*/") {
                self.advance();
                self.advance();
                return Ok(Some(Comment::at(text, location)));
            }
            text.push(self.consume_char()?);
        }
    }

    /// Consume whitespace interleaved with comments, returning the comments.
    ///
    /// In lenient mode an unterminated comment moves the cursor to the end of input
    /// instead of failing.
    pub fn consume_white_space(&mut self) -> CssResult<Vec<Comment>> {
        let mut comments = Vec::new();
        loop {
            while self.comes_whitespace() {
                self.advance();
            }
            let comment = match self.consume_comment() {
                Ok(comment) => comment,
                Err(err) if self.lenient && matches!(err, CssError::UnexpectedEof { .. }) => {
                    let location = err.location();
                    self.report(log::Level::Warn, "Unterminated comment, skipping to end of input", location);
                    while self.advance().is_some() {}
                    return Ok(comments);
                }
                Err(err) => return Err(err),
            };
            match comment {
                Some(comment) => comments.push(comment),
                None => return Ok(comments),
            }
        }
    }

    /// Consume until one of the stop characters, collecting comments found on the way.
    /// Fails at the end of input unless the stop condition allows it.
    pub fn consume_until(&mut self, until: Until<'_>, comments: &mut Vec<Comment>) -> CssResult<String> {
        let start = self.anchor();
        let mut out = String::new();

        while let Some(c) = self.peek_char() {
            if until.chars.contains(&c) {
                if until.include_end {
                    self.advance();
                    out.push(c);
                } else if until.consume_end {
                    self.advance();
                }
                return Ok(out);
            }
            self.advance();
            out.push(c);
            if let Some(comment) = self.consume_comment()? {
                comments.push(comment);
            }
        }

        if until.or_eof {
            return Ok(out);
        }

        self.backtrack(start);
        Err(CssError::unexpected_eof(until.describe(), self.peek(5, 0), MatchKind::Search, self.location()))
    }

    /// Skip the rest of a `{ ... }` block whose opening brace was already consumed,
    /// including nested blocks, strings and comments. Stops at the end of input.
    pub fn skip_block(&mut self) {
        let mut depth = 1usize;
        let mut quote: Option<char> = None;

        while let Some(c) = self.advance() {
            if let Some(q) = quote {
                if c == '\\' {
                    self.advance();
                } else if c == q || c == '\n' {
                    quote = None;
                }
                continue;
            }
            match c {
                '"' | '\'' => quote = Some(c),
                '\\' => {
                    self.advance();
                }
                '/' if self.comes("*") => {
                    while !self.is_end() && !self.comes("*/") {
                        self.advance();
                    }
                    self.advance();
                    self.advance();
                }
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }

    /// Parse an identifier, decoding escapes. Characters that are not identifier
    /// characters after decoding are kept escaped.
    pub fn parse_identifier(&mut self, ignore_case: bool) -> CssResult<String> {
        if self.is_end() {
            return Err(CssError::unexpected_eof("", "", MatchKind::Identifier, self.location()));
        }

        let mut result = String::new();
        let mut first = true;

        while !self.is_end() {
            let escaped = self.comes("\\");
            let Some(part) = self.parse_character(true)? else {
                break;
            };
            first = false;
            if escaped {
                for c in part.chars() {
                    if !is_identifier_char(c) {
                        result.push('\\');
                    }
                    result.push(c);
                }
            } else {
                result.push_str(&part);
            }
        }

        if first {
            return Err(CssError::unexpected_token(
                "",
                self.peek(5, 0),
                MatchKind::Identifier,
                self.location(),
            ));
        }

        if ignore_case {
            result = result.to_lowercase();
        }
        Ok(result)
    }

    /// Parse one (possibly escaped) character.
    ///
    /// Returns `None` when `for_identifier` is set and the next character cannot be part
    /// of an identifier. An escaped newline yields an empty string.
    pub fn parse_character(&mut self, for_identifier: bool) -> CssResult<Option<String>> {
        if self.comes("\\") {
            if for_identifier && self.lenient && (self.comes("\\0") || self.comes("\\9")) {
                // Legacy IE hack token, handled by the declaration grammar
                return Ok(None);
            }
            self.consume("\\")?;
            if self.comes("\n") || self.comes("\r") {
                if self.comes("\r\n") {
                    self.consume_count(2)?;
                } else {
                    self.consume_count(1)?;
                }
                return Ok(Some(String::new()));
            }
            if !self.peek_char().map(|c| c.is_ascii_hexdigit()).unwrap_or(false) {
                return self.consume_char().map(|c| Some(c.to_string()));
            }

            let hex = self.consume_expression(&HEX_ESCAPE, Some(6))?;
            if hex.len() < 6 && self.comes_whitespace() {
                if self.comes("\r\n") {
                    self.consume_count(2)?;
                } else {
                    self.consume_count(1)?;
                }
            }
            let code_point = u32::from_str_radix(&hex, 16).unwrap_or(0);
            let decoded = match code_point {
                0 => char::REPLACEMENT_CHARACTER,
                n => char::from_u32(n).unwrap_or(char::REPLACEMENT_CHARACTER),
            };
            return Ok(Some(decoded.to_string()));
        }

        let Some(c) = self.peek_char() else {
            return Err(CssError::unexpected_eof("1", "", MatchKind::Count, self.location()));
        };
        if for_identifier && !is_identifier_char(c) {
            return Ok(None);
        }
        self.advance();
        Ok(Some(c.to_string()))
    }
}

/// Whitespace as CSS understands it
pub fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0B' | '\x0C')
}

/// Check if character can be part of an identifier
pub fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || c >= '\u{A0}'
}
