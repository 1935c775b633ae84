//! Sheetcraft - parse, inspect and reformat CSS
//!
//! Usage: sheetcraft [OPTIONS] [FILE]

use std::env;
use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process::ExitCode;

use url::Url;

use sheetcraft_css::{Document, OutputFormat, Parser, ParserSettings, SpecificityCache};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Default,
    Compact,
    Pretty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Render(Style),
    Json,
    Specificity,
}

#[derive(Debug)]
struct Options {
    mode: Mode,
    strict: bool,
    resolve_imports: bool,
    expand_shorthands: bool,
    create_shorthands: bool,
    input: Option<String>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("sheetcraft");

    let mut options = Options {
        mode: Mode::Render(Style::Default),
        strict: false,
        resolve_imports: false,
        expand_shorthands: false,
        create_shorthands: false,
        input: None,
    };

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => {
                print_usage(program);
                return ExitCode::SUCCESS;
            }
            "--version" | "-V" => {
                println!("Sheetcraft {}", VERSION);
                return ExitCode::SUCCESS;
            }
            "--compact" => options.mode = Mode::Render(Style::Compact),
            "--pretty" => options.mode = Mode::Render(Style::Pretty),
            "--json" => options.mode = Mode::Json,
            "--specificity" => options.mode = Mode::Specificity,
            "--strict" => options.strict = true,
            "--resolve-imports" => options.resolve_imports = true,
            "--expand" => options.expand_shorthands = true,
            "--shorten" => options.create_shorthands = true,
            "-" => options.input = None,
            flag if flag.starts_with("--") => {
                eprintln!("Unknown option: {}", flag);
                print_usage(program);
                return ExitCode::FAILURE;
            }
            path => options.input = Some(path.to_string()),
        }
    }

    if let Err(e) = run(&options) {
        eprintln!("Error: {}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn print_usage(program: &str) {
    println!(
        r#"Sheetcraft {} - parse, inspect and reformat CSS

USAGE:
    {} [OPTIONS] [FILE]

Reads standard input when FILE is missing or `-`.

OPTIONS:
    -h, --help           Print this help message
    -V, --version        Print version information
    --compact            Render without optional whitespace
    --pretty             Render with blank lines and comments
    --json               Print the document tree as JSON
    --specificity        List selectors with their specificity
    --strict             Fail on the first malformed construct
    --resolve-imports    Replace @import rules by the imported sheets
    --expand             Expand shorthand properties
    --shorten            Combine longhand properties into shorthands

EXAMPLES:
    {} --compact style.css
    cat style.css | {} --specificity
"#,
        VERSION, program, program, program
    );
}

fn run(options: &Options) -> Result<(), Box<dyn Error>> {
    let (css, base_url) = read_input(options.input.as_deref())?;

    let settings = if options.strict { ParserSettings::strict() } else { ParserSettings::default() }
        .with_import_resolution(options.resolve_imports);
    let mut parser = Parser::new(&css, settings);
    if let Some(base_url) = base_url {
        parser = parser.with_base_url(base_url);
    }

    let mut document = parser.parse()?;
    log::info!(
        "Parsed {} top-level items ({}), {} diagnostics",
        document.len(),
        document.effective_charset(),
        parser.diagnostics().len()
    );

    if options.expand_shorthands {
        document.expand_shorthands();
    }
    if options.create_shorthands {
        document.create_shorthands();
    }

    match options.mode {
        Mode::Render(style) => {
            let format = match style {
                Style::Default => OutputFormat::default(),
                Style::Compact => OutputFormat::compact(),
                Style::Pretty => OutputFormat::pretty(),
            };
            println!("{}", document.render(&format)?);
        }
        Mode::Json => println!("{}", serde_json::to_string_pretty(&document.to_array())?),
        Mode::Specificity => print_specificity(&document),
    }

    Ok(())
}

/// Read the stylesheet and, for files, the locator relative imports resolve against
fn read_input(input: Option<&str>) -> Result<(String, Option<Url>), Box<dyn Error>> {
    let Some(path_str) = input else {
        let mut css = String::new();
        io::stdin().read_to_string(&mut css)?;
        return Ok((css, None));
    };

    let path = Path::new(path_str);
    let css = fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path_str, e))?;
    let base_url = fs::canonicalize(path).ok().and_then(|path| Url::from_file_path(path).ok());
    Ok((css, base_url))
}

fn print_specificity(document: &Document) {
    let cache = SpecificityCache::new();
    for block in document.all_declaration_blocks() {
        for selector in block.selectors() {
            println!("{:>6}  {}", selector.specificity_in(&cache), selector.text());
        }
    }
    log::debug!("{} distinct selectors", cache.len());
}
