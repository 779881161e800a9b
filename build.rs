//! Minifies the live-reload client into `OUT_DIR/hotreload.min.js`.
//!
//! The overlay stylesheet is minified and spliced into the script's
//! `__KILN_ERROR_OVERLAY_CSS__` template literal first.

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;
use std::{env, fs, path::PathBuf};

const CLIENT_JS: &str = "src/embed/serve/hotreload.js";
const OVERLAY_CSS: &str = "src/embed/serve/error-overlay.css";
const CSS_SLOT: &str = "__KILN_ERROR_OVERLAY_CSS__";

fn main() {
    println!("cargo:rerun-if-changed={CLIENT_JS}");
    println!("cargo:rerun-if-changed={OVERLAY_CSS}");

    let js = fs::read_to_string(CLIENT_JS).expect("read live-reload client");
    let css = fs::read_to_string(OVERLAY_CSS).expect("read overlay stylesheet");
    assert_eq!(
        js.matches(CSS_SLOT).count(),
        1,
        "{CLIENT_JS} needs exactly one {CSS_SLOT}"
    );

    let css = minify_css(&css)
        .replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${");
    let client = minify_js(&js.replace(CSS_SLOT, &css));

    let out = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    fs::write(out.join("hotreload.min.js"), client).expect("write hotreload.min.js");
}

fn minify_css(source: &str) -> String {
    let sheet = StyleSheet::parse(source, ParserOptions::default()).expect("overlay CSS parses");
    sheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .expect("overlay CSS prints")
        .code
}

fn minify_js(source: &str) -> String {
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, source, SourceType::mjs()).parse();
    assert!(parsed.errors.is_empty(), "client parse errors: {:?}", parsed.errors);

    let mut program = parsed.program;
    let minified = Minifier::new(MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    })
    .minify(&allocator, &mut program);

    Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(minified.scoping)
        .build(&program)
        .code
}
