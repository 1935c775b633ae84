//! CSS Parser
//!
//! Parses complete stylesheets: the rule list grammar, at-rule dispatch and the
//! `@charset`/`@import` placement rules.

use url::Url;

use crate::at_rule::{identifier_is, is_block_rule, is_keyframes, Charset, Import, Namespace};
use crate::document::Document;
use crate::error::{CssError, CssResult, Diagnostic};
use crate::import::{FileLoader, ImportResolver, StylesheetLoader};
use crate::list::{AtRuleBlockList, CssItem, CssList, KeyFrame};
use crate::rule_set::{AtRuleSet, DeclarationBlock};
use crate::scanner::{Scanner, Until};
use crate::settings::ParserSettings;

/// Which kind of rule list is being parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Root,
    Block,
    /// Inside `@keyframes`: selectors are `from`, `to` and percentages
    KeyFrame,
}

/// Result of parsing one item of a rule list
enum Parsed {
    Item(CssItem),
    /// A block at-rule whose `{` was consumed; its rule list follows
    Open(CssItem, ListKind),
    Skipped,
}

/// A block at-rule whose closing `}` has not been reached yet
struct OpenBlock {
    item: CssItem,
    kind: ListKind,
}

/// CSS Parser
pub struct Parser {
    scanner: Scanner,
    settings: ParserSettings,
    loader: Option<Box<dyn StylesheetLoader>>,
    base_url: Option<Url>,
    diagnostics: Vec<Diagnostic>,
    /// A rule other than `@charset`/`@import` was seen
    seen_other_rule: bool,
    charset_kept: bool,
}

impl Parser {
    /// Create a new parser
    pub fn new(input: &str, settings: ParserSettings) -> Self {
        Self {
            scanner: Scanner::new(input, &settings),
            settings,
            loader: None,
            base_url: None,
            diagnostics: Vec::new(),
            seen_other_rule: false,
            charset_kept: false,
        }
    }

    /// Use `loader` instead of the file system for `@import`
    pub fn with_loader(mut self, loader: impl StylesheetLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    /// Locator of the sheet being parsed, for resolving relative imports
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Problems recovered from while parsing
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Parse the whole input
    pub fn parse(&mut self) -> CssResult<Document> {
        let mut list = CssList::new();
        list.location = Some(self.scanner.location());
        let result = self.scanner.check_encoding().and_then(|_| self.parse_list(&mut list));
        self.diagnostics.extend(self.scanner.take_diagnostics());
        result?;

        let mut document = Document::from_list(list).with_default_charset(self.settings.default_charset.clone());
        document.normalize_charset();

        if self.settings.resolve_imports {
            let file_loader = FileLoader;
            let loader: &dyn StylesheetLoader = match &self.loader {
                Some(loader) => loader.as_ref(),
                None => &file_loader,
            };
            let mut resolver = ImportResolver::new(loader, &self.settings);
            let resolved = resolver.resolve(&mut document, self.base_url.as_ref());
            self.diagnostics.extend(resolver.into_diagnostics());
            resolved?;
        }

        Ok(document)
    }

    /// Parse the root rule list. Block at-rules are kept on a stack until their `}`.
    fn parse_list(&mut self, root: &mut CssList) -> CssResult<()> {
        let lenient = self.scanner.is_lenient();
        let mut open: Vec<OpenBlock> = Vec::new();
        let mut comments = Vec::new();

        loop {
            comments.extend(self.scanner.consume_white_space()?);
            if self.scanner.is_end() {
                break;
            }

            if self.scanner.comes("}") {
                let Some(mut closed) = open.pop() else {
                    return Err(CssError::source("Unopened {", self.scanner.location()));
                };
                self.scanner.consume("}")?;
                self.scanner.leave_nesting();
                if let Some(list) = closed.item.nested_list_mut() {
                    list.comments.append(&mut comments);
                }
                current_list(root, &mut open).append(closed.item);
                continue;
            }

            let kind = open.last().map(|block| block.kind).unwrap_or(ListKind::Root);
            let before = self.scanner.anchor();
            let parsed = match self.parse_list_item(kind) {
                Ok(parsed) => parsed,
                Err(err) if lenient && err.is_unexpected_token() => {
                    self.scanner
                        .report(log::Level::Warn, format!("Skipping rule: {}", err), err.location());
                    if self.scanner.anchor() == before {
                        let mut skipped = Vec::new();
                        self.scanner.consume_until(
                            Until::any_of(&[';', '}']).consuming_end().or_eof(),
                            &mut skipped,
                        )?;
                    }
                    Parsed::Skipped
                }
                Err(err) => return Err(err),
            };

            match parsed {
                Parsed::Item(mut item) => {
                    item.prepend_comments(std::mem::take(&mut comments));
                    current_list(root, &mut open).append(item);
                }
                Parsed::Open(mut item, kind) => {
                    self.scanner.enter_nesting()?;
                    item.prepend_comments(std::mem::take(&mut comments));
                    open.push(OpenBlock { item, kind });
                }
                Parsed::Skipped => comments.clear(),
            }
        }

        current_list(root, &mut open).comments.append(&mut comments);
        while let Some(closed) = open.pop() {
            let location = self.scanner.location();
            if !lenient {
                return Err(CssError::source("Unexpected end of document", location));
            }
            self.scanner
                .report(log::Level::Warn, "Unexpected end of document", Some(location));
            self.scanner.leave_nesting();
            current_list(root, &mut open).append(closed.item);
        }
        Ok(())
    }

    fn parse_list_item(&mut self, kind: ListKind) -> CssResult<Parsed> {
        if self.scanner.comes("@") {
            return self.parse_at_rule(kind);
        }
        self.seen_other_rule = true;
        let block = DeclarationBlock::parse(&mut self.scanner, kind == ListKind::KeyFrame)?;
        Ok(block.map(|block| Parsed::Item(block.into())).unwrap_or(Parsed::Skipped))
    }

    fn parse_at_rule(&mut self, kind: ListKind) -> CssResult<Parsed> {
        let location = self.scanner.location();
        self.scanner.consume("@")?;
        let identifier = self.scanner.parse_identifier(true)?;
        self.scanner.consume_white_space()?;

        if identifier == "import" {
            let import = Import::parse_body(&mut self.scanner, location)?;
            if kind != ListKind::Root || self.seen_other_rule {
                self.scanner
                    .report(log::Level::Debug, "Ignoring @import after other rules", Some(location));
                return Ok(Parsed::Skipped);
            }
            return Ok(Parsed::Item(import.into()));
        }

        if identifier == "charset" {
            let charset = Charset::parse_body(&mut self.scanner, location)?;
            if kind != ListKind::Root || self.seen_other_rule || self.charset_kept {
                self.scanner
                    .report(log::Level::Debug, "Ignoring misplaced @charset", Some(location));
                return Ok(Parsed::Skipped);
            }
            self.charset_kept = true;
            return Ok(Parsed::Item(charset.into()));
        }

        self.seen_other_rule = true;

        if is_keyframes(&identifier) {
            let mut comments = Vec::new();
            let name = self
                .scanner
                .consume_until(Until::any_of(&['{']).consuming_end(), &mut comments)?;
            let mut frame = KeyFrame::new(identifier, name.trim());
            frame.list.location = Some(location);
            return Ok(Parsed::Open(frame.into(), ListKind::KeyFrame));
        }

        if identifier_is(&identifier, "namespace") {
            let namespace = Namespace::parse_body(&mut self.scanner, location)?;
            return Ok(Parsed::Item(namespace.into()));
        }

        let mut comments = Vec::new();
        let args = self
            .scanner
            .consume_until(Until::any_of(&['{']).consuming_end(), &mut comments)?;
        let args = args.trim();
        if args.matches('(').count() != args.matches(')').count() {
            if !self.scanner.is_lenient() {
                return Err(CssError::source("Unmatched brace count in media query", location));
            }
            self.scanner.report(
                log::Level::Warn,
                format!("Skipping @{} with unbalanced parentheses", identifier),
                Some(location),
            );
            self.scanner.skip_block();
            return Ok(Parsed::Skipped);
        }

        if is_block_rule(&identifier) {
            let mut block = AtRuleBlockList::new(identifier, args);
            block.list.location = Some(location);
            Ok(Parsed::Open(block.into(), ListKind::Block))
        } else {
            let mut rule = AtRuleSet::new(identifier, args);
            rule.rule_set.location = Some(location);
            rule.rule_set.parse_rules(&mut self.scanner)?;
            Ok(Parsed::Item(rule.into()))
        }
    }
}

/// The innermost rule list still being filled
fn current_list<'a>(root: &'a mut CssList, open: &'a mut [OpenBlock]) -> &'a mut CssList {
    match open.last_mut().and_then(|block| block.item.nested_list_mut()) {
        Some(list) => list,
        None => root,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    fn parse(css: &str) -> Document {
        Parser::new(css, ParserSettings::default()).parse().unwrap()
    }

    fn parse_strict(css: &str) -> CssResult<Document> {
        Parser::new(css, ParserSettings::strict()).parse()
    }

    #[test]
    fn test_simple_rule() {
        let document = parse("p { color: red; }");
        assert_eq!(document.len(), 1);
        let blocks = document.all_declaration_blocks();
        assert_eq!(blocks[0].selectors()[0].text(), "p");
        assert_eq!(blocks[0].declarations()[0].property, "color");
    }

    #[test]
    fn test_multiple_rules() {
        let document = parse("p { color: red; } div { color: blue; } span { color: green; }");
        assert_eq!(document.len(), 3);
    }

    #[test]
    fn test_empty_stylesheet() {
        assert!(parse("   ").is_empty());
        assert!(parse("").is_empty());
    }

    #[test]
    fn test_media_rule() {
        let document = parse("@media screen and (max-width: 600px) { p { font-size: 14px; } }");
        match &document.contents()[0] {
            CssItem::AtRuleBlock(media) => {
                assert_eq!(media.name, "media");
                assert_eq!(media.args, "screen and (max-width: 600px)");
                assert_eq!(media.len(), 1);
            }
            other => panic!("expected a media block, got {:?}", other),
        }
    }

    #[test]
    fn test_font_face() {
        let document = parse("@font-face { font-family: 'MyFont'; src: url('myfont.woff2') format('woff2'); }");
        match &document.contents()[0] {
            CssItem::AtRuleSet(rule) => {
                assert_eq!(rule.name, "font-face");
                assert_eq!(rule.declarations().len(), 2);
            }
            other => panic!("expected an at-rule set, got {:?}", other),
        }
    }

    #[test]
    fn test_keyframes() {
        let document = parse("@-webkit-keyframes fadeIn { from { opacity: 0; } 50% { opacity: .5 } to { opacity: 1; } }");
        match &document.contents()[0] {
            CssItem::KeyFrame(frame) => {
                assert_eq!(frame.vendor_key_frame, "-webkit-keyframes");
                assert_eq!(frame.animation_name, "fadeIn");
                assert_eq!(frame.len(), 3);
                assert!(frame.all_declaration_blocks()[1].selectors()[0].is_keyframe());
            }
            other => panic!("expected keyframes, got {:?}", other),
        }
    }

    #[test]
    fn test_namespace() {
        let document = parse("@namespace svg url(http://www.w3.org/2000/svg); svg|a { color: red }");
        assert!(matches!(document.contents()[0], CssItem::Namespace(_)));
    }

    #[test]
    fn test_comments_attach_to_next_item() {
        let document = parse("/* header */ p { color: red } /* trailing */");
        assert_eq!(document.contents()[0].comments()[0].text, " header ");
        assert_eq!(document.comments[0].text, " trailing ");
    }

    #[test]
    fn test_unopened_brace_is_fatal() {
        let err = Parser::new("p { color: red } }", ParserSettings::default()).parse().unwrap_err();
        assert!(matches!(err, CssError::Source { .. }));
    }

    #[test]
    fn test_unclosed_block() {
        let document = parse("@media screen { p { color: red }");
        assert_eq!(document.all_declaration_blocks().len(), 1);
        assert!(matches!(parse_strict("@media screen { p { color: red }"), Err(CssError::Source { .. })));
    }

    #[test]
    fn test_unbalanced_at_rule_prelude() {
        let document = parse("@media (min-width: 10px { color: red } a { color: blue }");
        let blocks = document.all_declaration_blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].selectors()[0].text(), "a");
        assert!(matches!(parse_strict("@media (x { }"), Err(CssError::Source { .. })));
    }

    #[test]
    fn test_unbalanced_at_rule_prelude_with_nested_rules() {
        let document = parse("@media screen and (max-width: 600px { .a { color: red; } } .b { color: blue }");
        let blocks = document.all_declaration_blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].selectors()[0].text(), ".b");

        let document = parse("@supports (display:grid { a { b: \"}\"; } } p { color: blue }");
        assert_eq!(document.all_declaration_blocks()[0].selectors()[0].text(), "p");
    }

    #[test]
    fn test_misplaced_charset_and_import() {
        let mut parser = Parser::new(
            "@import 'a.css'; @charset 'utf-8'; p { color: red } @charset 'latin1'; @import 'b.css';",
            ParserSettings::default(),
        );
        let document = parser.parse().unwrap();
        assert_eq!(document.len(), 3);
        assert_eq!(document.charset().map(Charset::name), Some("utf-8"));
        assert!(matches!(document.contents()[1], CssItem::Import(_)));
        assert_eq!(parser.diagnostics().len(), 2);
    }

    #[test]
    fn test_nested_charset_dropped() {
        let document = parse("@media print { @charset 'utf-8'; p { color: red } }");
        assert_eq!(document.all_declaration_blocks().len(), 1);
        assert!(document.charset().is_none());
    }

    #[test]
    fn test_nesting_limit() {
        let settings = ParserSettings::default().with_max_nesting_depth(3);
        let css = "@media a { @media b { @media c { @media d { p { color: red } } } } }";
        let err = Parser::new(css, settings).parse().unwrap_err();
        assert!(matches!(err, CssError::NestingTooDeep { limit: 3, .. }));
    }

    #[test]
    fn test_nested_blocks_keep_order_and_comments() {
        let document = parse("@media a { p { color: red } @media b { /* inner */ } q { color: blue } } r { color: green }");
        assert_eq!(document.len(), 2);
        let CssItem::AtRuleBlock(outer) = &document.contents()[0] else {
            panic!("expected a media block");
        };
        assert_eq!(outer.len(), 3);
        assert_eq!(outer.contents()[1].nested_list().unwrap().comments[0].text, " inner ");
        let selectors: Vec<_> = document
            .all_declaration_blocks()
            .iter()
            .map(|block| block.selectors()[0].text().to_string())
            .collect();
        assert_eq!(selectors, ["p", "q", "r"]);
    }

    #[test]
    fn test_effective_charset() {
        let settings = ParserSettings::default().with_default_charset("iso-8859-15");
        let document = Parser::new("p { color: red }", settings.clone()).parse().unwrap();
        assert_eq!(document.effective_charset(), "iso-8859-15");
        let document = Parser::new("@charset \"utf-8\"; p { color: red }", settings).parse().unwrap();
        assert_eq!(document.effective_charset(), "utf-8");
    }

    #[test]
    fn test_multibyte_disabled() {
        let css = "p { content: \"é\" }";
        let strict = ParserSettings::strict().with_multibyte(false);
        assert!(matches!(Parser::new(css, strict).parse(), Err(CssError::Source { .. })));

        let mut parser = Parser::new(css, ParserSettings::default().with_multibyte(false));
        let document = parser.parse().unwrap();
        assert_eq!(document.all_declaration_blocks().len(), 1);
        assert_eq!(parser.diagnostics().len(), 1);

        let ascii = ParserSettings::strict().with_multibyte(false);
        assert!(Parser::new("p { color: red }", ascii).parse().is_ok());
    }

    #[test]
    fn test_line_numbers() {
        let settings = ParserSettings::strict().with_line_offset(10);
        let err = Parser::new("p {\n  color: red;\n  width: ;\n}", settings).parse().unwrap_err();
        assert_eq!(err.line(), Some(12));
    }

    #[test]
    fn test_render_round_trip() {
        let css = "@media screen{.a{color:red}}";
        let document = parse(css);
        assert_eq!(document.render(&OutputFormat::compact()).unwrap(), css);
    }
}
