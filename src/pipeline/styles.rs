//! `styles`: compile `scss/*.scss` entries into `css/<entry>.min.css`.
//!
//! ```text
//! entry.scss ─> glob imports ─> sass | builtin ─> lightningcss ─> .min.css
//! ```
//!
//! Partials (`_name.scss`) are never entries. The external `sass` binary is
//! preferred; the builtin compiler inlines partials and leaves nesting to
//! lightningcss, so it covers plain nested SCSS without variables or mixins.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use globset::GlobSet;
use regex::Regex;
use rustc_hash::FxHashSet;

use crate::asset::minify::{css_targets, minify_css};
use crate::asset::scan;
use crate::config::{Config, StyleCompiler};
use crate::task::{Artifact, Inputs, Task, TaskError, TaskInput};
use crate::utils::exec::{Cmd, SASS_FILTER};

use super::STYLES;

/// `@import "blocks/*";` style statements.
static GLOB_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^([ \t]*)@(import|use)[ \t]+["']([^"'\n]*\*[^"'\n]*)["'][ \t]*;"#)
        .expect("valid glob import pattern")
});

/// `@import "a", "b";` and `@use "a" as b;` statements.
static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*@(import|use)[ \t]+([^;\n]+);").expect("valid import pattern")
});

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)"|'([^']*)'"#).expect("valid quoted pattern"));

pub fn task(config: &Arc<Config>) -> Task {
    let config = Arc::clone(config);
    let inputs = Inputs::glob(&config.source_dir, ["scss/*.scss"]);
    Task::new(STYLES, move |input| compile_entries(&config, input)).inputs(inputs)
}

fn compile_entries(config: &Config, input: &TaskInput<'_>) -> Result<Vec<Artifact>, TaskError> {
    let compiler = Compiler::resolve(config.styles.compiler);
    let targets = css_targets(&config.styles.browsers);
    let load_path = config.source_dir.join("scss");

    input
        .files
        .iter()
        .filter(|path| !is_partial(path))
        .map(|entry| {
            let source = input.read_to_string(entry)?;
            let source = expand_glob_imports(entry, &source)?;
            let css = compiler.compile(entry, &source, &load_path)?;
            let minified = minify_css(entry, &css, targets)?;
            let stem = entry
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(Artifact::new(format!("css/{stem}.min.css"), minified))
        })
        .collect()
}

fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

// ============================================================================
// Compilers
// ============================================================================

enum Compiler {
    Sass(PathBuf),
    /// `sass` was requested but is not installed.
    MissingSass,
    Builtin,
}

impl Compiler {
    fn resolve(choice: StyleCompiler) -> Self {
        match (choice, which::which("sass")) {
            (StyleCompiler::Builtin, _) => Self::Builtin,
            (_, Ok(path)) => Self::Sass(path),
            (StyleCompiler::Sass, Err(_)) => Self::MissingSass,
            (StyleCompiler::Auto, Err(_)) => {
                crate::debug!("styles"; "sass not found, using builtin compiler");
                Self::Builtin
            }
        }
    }

    fn compile(&self, entry: &Path, source: &str, load_path: &Path) -> Result<String, TaskError> {
        match self {
            Self::Sass(sass) => {
                let entry_dir = entry.parent().unwrap_or(load_path);
                let output = Cmd::new(sass)
                    .args(["--stdin", "--no-source-map", "--load-path"])
                    .arg(load_path)
                    .cwd(entry_dir)
                    .stdin(source)
                    .filter(&SASS_FILTER)
                    .run()
                    .map_err(|e| TaskError::transform(entry, format!("{e:#}")))?;
                String::from_utf8(output.stdout)
                    .map_err(|e| TaskError::transform(entry, e.to_string()))
            }
            Self::MissingSass => Err(TaskError::transform(
                entry,
                "`sass` not found on PATH (set styles.compiler = \"builtin\" to skip it)",
            )),
            Self::Builtin => {
                let mut inliner = Inliner {
                    load_path,
                    stack: vec![entry.to_path_buf()],
                    used: FxHashSet::default(),
                };
                inliner.inline(entry, source)
            }
        }
    }
}

// ============================================================================
// Glob imports
// ============================================================================

/// Expand `@import "dir/*";` into one import per matching stylesheet,
/// relative to the importing file and sorted.
pub fn expand_glob_imports(file: &Path, source: &str) -> Result<String, TaskError> {
    if !GLOB_IMPORT.is_match(source) {
        return Ok(source.to_string());
    }

    let dir = file.parent().unwrap_or(Path::new("."));
    let mut out = String::with_capacity(source.len());
    let mut last = 0;

    for caps in GLOB_IMPORT.captures_iter(source) {
        let (Some(whole), Some(indent), Some(rule), Some(pattern)) =
            (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
        else {
            continue;
        };
        out.push_str(&source[last..whole.start()]);
        last = whole.end();

        let globs: GlobSet = scan::build_globset(&[pattern.as_str()])
            .map_err(|e| TaskError::transform_at_offset(file, source, whole.start(), e.to_string()))?;

        let imports: Vec<_> = scan::scan(dir, &globs)?
            .into_iter()
            .filter(|path| path != file && is_stylesheet(path))
            .filter_map(|path| crate::utils::path::relative_slash_path(&path, dir))
            .map(|rel| format!("{}@{} \"{}\";", indent.as_str(), rule.as_str(), rel))
            .collect();
        out.push_str(&imports.join("\n"));
    }
    out.push_str(&source[last..]);
    Ok(out)
}

fn is_stylesheet(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("scss" | "sass" | "css")
    )
}

// ============================================================================
// Builtin compiler
// ============================================================================

/// Inlines `@import`/`@use` of local stylesheets and drops `//` comments.
struct Inliner<'a> {
    load_path: &'a Path,
    /// Files being inlined, for cycle detection.
    stack: Vec<PathBuf>,
    /// Modules already pulled in by `@use` (loaded once).
    used: FxHashSet<PathBuf>,
}

impl Inliner<'_> {
    fn inline(&mut self, file: &Path, source: &str) -> Result<String, TaskError> {
        let source = strip_line_comments(source);
        let dir = file.parent().unwrap_or(self.load_path).to_path_buf();

        let mut out = String::with_capacity(source.len());
        let mut last = 0;

        for caps in IMPORT.captures_iter(&source) {
            let (Some(whole), Some(rule), Some(args)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            out.push_str(&source[last..whole.start()]);
            last = whole.end();

            let is_use = rule.as_str() == "use";
            let names: Vec<_> = QUOTED
                .captures_iter(args.as_str())
                .filter_map(|c| c.get(1).or_else(|| c.get(2)))
                .map(|m| m.as_str().to_string())
                .collect();
            // `@use` takes a single module; the rest is `as`/`with` clauses.
            let names = if is_use {
                names.into_iter().take(1).collect()
            } else {
                names
            };

            if names.is_empty() || args.as_str().trim_start().starts_with("url(") {
                out.push_str(whole.as_str());
                continue;
            }

            for name in names {
                if is_plain_css_import(&name) {
                    out.push_str(&format!("@import \"{name}\";\n"));
                    continue;
                }
                let resolved = self.resolve(&dir, &name).ok_or_else(|| {
                    TaskError::transform_at_offset(
                        file,
                        &source,
                        whole.start(),
                        format!("can't find stylesheet to import: `{name}`"),
                    )
                })?;

                if is_use && !self.used.insert(resolved.clone()) {
                    continue;
                }
                if self.stack.contains(&resolved) {
                    return Err(TaskError::transform_at_offset(
                        file,
                        &source,
                        whole.start(),
                        format!("import cycle through `{}`", resolved.display()),
                    ));
                }

                let nested = std::fs::read_to_string(&resolved)
                    .map_err(|e| TaskError::Read(resolved.clone(), e))?;
                let nested = expand_glob_imports(&resolved, &nested)?;
                self.stack.push(resolved.clone());
                let inlined = self.inline(&resolved, &nested)?;
                self.stack.pop();

                out.push_str(&inlined);
                out.push('\n');
            }
        }
        out.push_str(&source[last..]);
        Ok(out)
    }

    /// Sass lookup order: exact, partial, then `.scss`/`.sass`/`.css`,
    /// relative to the importing file, then to the load path.
    fn resolve(&self, dir: &Path, name: &str) -> Option<PathBuf> {
        let rel = Path::new(name);
        let file_name = rel.file_name()?.to_string_lossy().into_owned();
        let parent = rel.parent().unwrap_or(Path::new(""));

        let mut candidates = vec![rel.to_path_buf()];
        for ext in ["scss", "sass", "css"] {
            candidates.push(parent.join(format!("_{file_name}.{ext}")));
            candidates.push(parent.join(format!("{file_name}.{ext}")));
        }
        candidates.push(parent.join(format!("_{file_name}")));

        [dir, self.load_path].iter().find_map(|base| {
            candidates
                .iter()
                .map(|c| base.join(c))
                .find(|p| p.is_file())
                .map(|p| crate::utils::path::normalize_path(&p))
        })
    }
}

/// Imports Sass leaves to the browser.
fn is_plain_css_import(name: &str) -> bool {
    name.starts_with("http://") || name.starts_with("https://") || name.starts_with("//")
}

/// Remove `//` comments outside strings, `url(...)` and block comments.
fn strip_line_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    for line in source.lines() {
        let cut = line_comment_start(line).unwrap_or(line.len());
        let kept = line[..cut].trim_end();
        if kept.is_empty() && cut < line.len() {
            continue;
        }
        out.push_str(kept);
        out.push('\n');
    }
    out
}

fn line_comment_start(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut quote = None;
    let mut parens = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(_) if b == b'\\' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'(' => parens += 1,
                b')' => parens = parens.saturating_sub(1),
                b'/' if parens == 0 && bytes.get(i + 1) == Some(&b'/') => return Some(i),
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    // Skip a block comment on the same line.
                    match line[i + 2..].find("*/") {
                        Some(end) => i += end + 3,
                        None => return None,
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}
