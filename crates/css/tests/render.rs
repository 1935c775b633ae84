use sheetcraft_css::{parse, parse_with, OutputFormat, ParserSettings};

const SHEET: &str = r#"
@charset "utf-8";
@import url("base.css") screen;
html, body { margin: 0 auto; font: bold 12px/1.5 Arial, sans-serif; }
#nav > li:hover { color: rgb(255, 0, 0) !important; background: url("bg.png") no-repeat; }
@media screen and (max-width: 600px) {
    .col { width: calc(100% - 2em); }
}
@font-face { font-family: "Icons"; src: url("icons.woff") format("woff"), url("icons.ttf"); }
@keyframes pulse { from { opacity: 0 } 50% { opacity: .5 } to { opacity: 1 } }
"#;

#[test]
fn test_hex_colors() {
    let document = parse(".a,.b{color:#ff0000}").unwrap();
    assert_eq!(document.render(&OutputFormat::compact()).unwrap(), ".a,.b{color:#f00}");
    assert_eq!(document.render(&OutputFormat::default()).unwrap(), ".a, .b {\n\tcolor: #ff0000;\n}");
}

#[test]
fn test_rgb_without_hash_notation() {
    let document = parse("a{color:#f00}").unwrap();
    let mut format = OutputFormat::compact();
    format.set_rgb_hash_notation(false);
    assert_eq!(document.render(&format).unwrap(), "a{color:rgb(255,0,0)}");
}

#[test]
fn test_rendering_is_idempotent() {
    for format in [OutputFormat::default(), OutputFormat::compact(), OutputFormat::pretty()] {
        let first = parse(SHEET).unwrap().render(&format).unwrap();
        let second = parse(&first).unwrap().render(&format).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_compact_round_trip_is_stable_under_strict_parsing() {
    let compact = parse(SHEET).unwrap().render(&OutputFormat::compact()).unwrap();
    let reparsed = parse_with(&compact, ParserSettings::strict()).unwrap();
    assert_eq!(reparsed.render(&OutputFormat::compact()).unwrap(), compact);
}

#[test]
fn test_nested_default_output() {
    let document = parse("@media print { a { color: red; margin: 0; } }").unwrap();
    assert_eq!(
        document.render(&OutputFormat::default()).unwrap(),
        "@media print {\n\ta {\n\t\tcolor: red;\n\t\tmargin: 0;\n\t}\n}"
    );
}

#[test]
fn test_comments_only_in_pretty_output() {
    let document = parse("/* header */\na { color: red }").unwrap();
    let pretty = document.render(&OutputFormat::pretty()).unwrap();
    assert!(pretty.starts_with("/* header */"));
    let compact = document.render(&OutputFormat::compact()).unwrap();
    assert_eq!(compact, "a{color:red}");
}

#[test]
fn test_important_and_strings() {
    let document = parse("a { content: 'x'; color: blue !important }").unwrap();
    assert_eq!(
        document.render(&OutputFormat::compact()).unwrap(),
        "a{content:\"x\";color:blue !important}"
    );
}

#[test]
fn test_shorthand_round_trip() {
    let mut document = parse("p { margin: 0 auto; border: 1px solid #000; }").unwrap();
    document.expand_shorthands();
    {
        let blocks = document.all_declaration_blocks();
        assert_eq!(blocks[0].declarations().len(), 4 + 12);
        assert!(blocks[0].rules(Some("margin")).is_empty());
    }

    document.create_shorthands();
    let format = OutputFormat::compact();
    let blocks = document.all_declaration_blocks();
    let rules = blocks[0].rules_assoc(None);
    assert_eq!(rules.len(), 2);
    assert_eq!(rules["margin"].value.render(&format), "0 auto");
    assert_eq!(rules["border"].value.render(&format), "1px solid #000");
}

#[test]
fn test_slash_alpha_color_survives() {
    let document = parse("p{color:rgba(0 0 0 / 50%);width:1px}").unwrap();
    assert_eq!(
        document.render(&OutputFormat::compact()).unwrap(),
        "p{color:rgba(0,0,0,50%);width:1px}"
    );
}
