//! Script and stylesheet minification.
//!
//! Uses oxc for JavaScript and lightningcss for CSS. Errors carry the
//! offending file and, when the parser reports one, a 1-based location.

use std::path::Path;

use lightningcss::stylesheet::{
    MinifyOptions, ParserFlags, ParserOptions, PrinterOptions, StyleSheet,
};
use lightningcss::targets::{Browsers, Targets};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use crate::task::TaskError;

/// Minify a classic (non-module) script.
///
/// Top-level names are globals that other files of the same bundle may
/// use, so they are neither renamed nor dropped. Only whitespace,
/// comments and local names shrink.
pub fn minify_js(path: &Path, source: &str) -> Result<String, TaskError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::script()).parse();
    if let Some(error) = ret.errors.first() {
        let offset = error
            .labels
            .as_ref()
            .and_then(|labels| labels.first())
            .map(|label| label.offset());
        return Err(match offset {
            Some(offset) => TaskError::transform_at_offset(path, source, offset, error.to_string()),
            None => TaskError::transform(path, error.to_string()),
        });
    }

    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions {
            top_level: Some(false),
            ..MangleOptions::default()
        }),
        compress: None,
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    Ok(Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code)
}

/// Browser targets for a list of browserslist queries.
pub fn css_targets(browsers: &[String]) -> Targets {
    match Browsers::from_browserslist(browsers) {
        Ok(Some(browsers)) => Targets::from(browsers),
        _ => Targets::default(),
    }
}

/// Parse, vendor-prefix and minify a stylesheet.
///
/// Nesting is lowered when `targets` need it.
pub fn minify_css(path: &Path, source: &str, targets: Targets) -> Result<String, TaskError> {
    let options = ParserOptions {
        filename: path.display().to_string(),
        flags: ParserFlags::NESTING,
        ..ParserOptions::default()
    };

    let mut stylesheet = StyleSheet::parse(source, options)
        .map_err(|e| css_error(path, e.kind.to_string(), e.loc.map(|l| (l.line, l.column))))?;

    stylesheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| css_error(path, e.kind.to_string(), e.loc.map(|l| (l.line, l.column))))?;

    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| css_error(path, e.kind.to_string(), e.loc.map(|l| (l.line, l.column))))?;

    Ok(result.code)
}

/// lightningcss lines are 0-based, columns 1-based.
fn css_error(path: &Path, message: String, loc: Option<(u32, u32)>) -> TaskError {
    match loc {
        Some((line, column)) => {
            TaskError::transform_at(path, line as usize + 1, column as usize, message)
        }
        None => TaskError::transform(path, message),
    }
}
