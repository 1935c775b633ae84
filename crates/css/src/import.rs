//! `@import` resolution
//!
//! Imported stylesheets are fetched through a [`StylesheetLoader`], parsed with the
//! importing sheet's settings and spliced in place of the `@import` rule.

use rustc_hash::FxHashSet;
use url::Url;

use crate::at_rule::Import;
use crate::document::Document;
use crate::error::{CssError, CssResult, Diagnostic};
use crate::list::{AtRuleBlockList, CssItem};
use crate::parser::Parser;
use crate::settings::ParserSettings;

/// Source of stylesheet text for `@import`
pub trait StylesheetLoader {
    fn fetch(&self, locator: &Url) -> CssResult<String>;
}

/// Loads `file://` locators from the local file system
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl StylesheetLoader for FileLoader {
    fn fetch(&self, locator: &Url) -> CssResult<String> {
        let path = locator.to_file_path().map_err(|_| CssError::Load {
            locator: locator.to_string(),
            message: String::from("not a file locator"),
        })?;
        std::fs::read_to_string(&path).map_err(|err| CssError::Load {
            locator: locator.to_string(),
            message: err.to_string(),
        })
    }
}

/// Resolve `href` against the importing sheet's locator
pub fn resolve_locator(base: Option<&Url>, href: &str) -> CssResult<Url> {
    let load_error = |message: String| CssError::Load { locator: href.to_string(), message };

    if let Ok(url) = Url::parse(href) {
        return Ok(url);
    }
    let base = match base {
        Some(base) => base.clone(),
        None => std::env::current_dir()
            .ok()
            .and_then(|dir| Url::from_directory_path(dir).ok())
            .ok_or_else(|| load_error(String::from("no base to resolve against")))?,
    };
    base.join(href).map_err(|err| load_error(err.to_string()))
}

/// Splices imported stylesheets into a document, visiting each locator once
pub(crate) struct ImportResolver<'a> {
    loader: &'a dyn StylesheetLoader,
    settings: &'a ParserSettings,
    visited: FxHashSet<String>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> ImportResolver<'a> {
    pub fn new(loader: &'a dyn StylesheetLoader, settings: &'a ParserSettings) -> Self {
        Self { loader, settings, visited: FxHashSet::default(), diagnostics: Vec::new() }
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    fn report(&mut self, level: log::Level, message: String, import: &Import) {
        match import.location {
            Some(location) => log::log!(level, "{} [{}]", message, location),
            None => log::log!(level, "{}", message),
        }
        self.diagnostics.push(Diagnostic { level, message, location: import.location });
    }

    /// Replace the leading `@import` rules of `document` by the sheets they name
    pub fn resolve(&mut self, document: &mut Document, base: Option<&Url>) -> CssResult<()> {
        if let Some(base) = base {
            self.visited.insert(base.to_string());
        }

        let mut index = 0;
        while index < document.len() {
            let import = match &document.contents()[index] {
                CssItem::Import(import) => import.clone(),
                CssItem::Charset(_) => {
                    index += 1;
                    continue;
                }
                _ => break,
            };

            match self.load(&import, base)? {
                Some(items) => {
                    let count = items.len();
                    document.replace(index, items);
                    index += count;
                }
                None => index += 1,
            }
        }
        Ok(())
    }

    /// The items replacing `import`, or `None` to keep the rule as is
    fn load(&mut self, import: &Import, base: Option<&Url>) -> CssResult<Option<Vec<CssItem>>> {
        let locator = match resolve_locator(base, &import.url.url.text) {
            Ok(locator) => locator,
            Err(err) => return self.failed(err, import),
        };

        let key = locator.to_string();
        if !self.visited.insert(key.clone()) {
            self.report(log::Level::Debug, format!("Skipping already imported '{}'", key), import);
            return Ok(Some(Vec::new()));
        }

        let text = match self.loader.fetch(&locator) {
            Ok(text) => text,
            Err(err) => return self.failed(err, import),
        };
        log::debug!("Importing '{}'", key);

        let settings = self.settings.clone().with_import_resolution(false);
        let mut parser = Parser::new(&text, settings);
        let parsed = parser.parse();
        self.diagnostics.extend(parser.take_diagnostics());
        let mut imported = match parsed {
            Ok(imported) => imported,
            Err(err) => return self.failed(err, import),
        };
        self.resolve(&mut imported, Some(&locator))?;

        let items: Vec<CssItem> = imported
            .into_list()
            .into_contents()
            .into_iter()
            .filter(|item| !matches!(item, CssItem::Charset(_)))
            .collect();

        Ok(Some(match &import.media_query {
            Some(query) => {
                let mut media = AtRuleBlockList::new("media", query.clone());
                media.set_contents(items);
                vec![CssItem::AtRuleBlock(media)]
            }
            None => items,
        }))
    }

    fn failed(&mut self, err: CssError, import: &Import) -> CssResult<Option<Vec<CssItem>>> {
        if !self.settings.lenient {
            return Err(err);
        }
        self.report(log::Level::Warn, format!("Keeping unresolved import: {}", err), import);
        Ok(None)
    }
}
