//! Terminal output.
//!
//! - `log!` / `debug!` print one line behind a coloured `[module]` prefix.
//! - `status_*` keep a single overwritten status block (watch mode).
//! - `ProgressLine` shows a `[build] tasks(3/8)` counter during a build.
//!
//! ```ignore
//! log!("build"; "{} written", files);
//!
//! let progress = ProgressLine::new("tasks", 8);
//! progress.inc();
//! progress.finish();
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    io::{Write, stdout},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

/// Set by `--verbose`.
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// A progress line is on screen; log lines must clear it first.
static PROGRESS_ACTIVE: AtomicBool = AtomicBool::new(false);

pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

/// Log a message with a colored module prefix
///
/// ```ignore
/// log!("serve"; "http://{}", addr);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Like `log!`, only with `--verbose`.
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

pub fn log(module: &str, message: &str) {
    let mut stdout = stdout().lock();
    if PROGRESS_ACTIVE.load(Ordering::SeqCst) {
        execute!(stdout, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine)).ok();
    }
    writeln!(stdout, "{} {message}", prefix(module)).ok();
    stdout.flush().ok();
}

fn prefix(module: &str) -> String {
    let tag = format!("[{module}]");
    match module {
        "serve" | "reload" => tag.bright_blue().bold().to_string(),
        "watch" | "dev" => tag.bright_green().bold().to_string(),
        "error" => tag.bright_red().bold().to_string(),
        "warning" => tag.bright_magenta().bold().to_string(),
        _ => tag.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Status block
// ============================================================================

/// Lines printed by the previous status, erased before the next one.
static STATUS_LINES: Mutex<usize> = Mutex::new(0);

/// UTC wall-clock `HH:MM:SS`.
fn clock() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    format!("{:02}:{:02}:{:02}", (secs / 3600) % 24, (secs / 60) % 60, secs % 60)
}

fn status(symbol: Option<String>, message: &str) {
    let mut last = STATUS_LINES.lock();
    let mut stdout = stdout().lock();

    if *last > 0 {
        #[allow(clippy::cast_possible_truncation)]
        let up = *last as u16;
        execute!(stdout, cursor::MoveUp(up), Clear(ClearType::FromCursorDown)).ok();
    }

    let time = format!("[{}]", clock()).dimmed().to_string();
    match symbol {
        Some(symbol) => writeln!(stdout, "{time} {symbol} {message}").ok(),
        None => writeln!(stdout, "{time} {message}").ok(),
    };
    stdout.flush().ok();

    *last = line_count(message);
}

fn line_count(message: &str) -> usize {
    message.lines().count().max(1)
}

/// A run that wrote something.
pub fn status_success(message: &str) {
    status(Some("✓".green().to_string()), message);
}

/// A run that left every output as it was.
pub fn status_unchanged(message: &str) {
    status(None, &message.dimmed().to_string());
}

/// A failed run, with the failure detail below the summary.
pub fn status_error(summary: &str, detail: &str) {
    let message = if detail.is_empty() {
        summary.to_string()
    } else {
        format!("{summary}\n{detail}")
    };
    status(Some("✗".red().to_string()), &message);
}

// ============================================================================
// Progress line
// ============================================================================

/// One-line `label(done/total)` counter.
///
/// Workers call `inc` concurrently; redraws use `try_lock` and are simply
/// skipped when another thread is drawing.
pub struct ProgressLine {
    label: &'static str,
    total: usize,
    done: AtomicUsize,
    draw: Mutex<()>,
}

impl ProgressLine {
    pub fn new(label: &'static str, total: usize) -> Self {
        PROGRESS_ACTIVE.store(true, Ordering::SeqCst);
        let progress = Self {
            label,
            total,
            done: AtomicUsize::new(0),
            draw: Mutex::new(()),
        };
        progress.redraw(false);
        progress
    }

    pub fn inc(&self) {
        self.done.fetch_add(1, Ordering::Relaxed);
        if let Some(_guard) = self.draw.try_lock() {
            self.redraw(false);
        }
    }

    fn render(&self) -> String {
        format!(
            "{}({}/{})",
            self.label,
            self.done.load(Ordering::Relaxed).min(self.total),
            self.total
        )
    }

    fn redraw(&self, done: bool) {
        let line = format!("{} {}", prefix("build"), self.render());
        let mut stdout = stdout().lock();
        execute!(stdout, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine)).ok();
        if done {
            writeln!(stdout, "{line}").ok();
        } else {
            write!(stdout, "{line}").ok();
        }
        stdout.flush().ok();
    }

    /// Leave the final counter on screen.
    pub fn finish(self) {
        let _guard = self.draw.lock();
        self.redraw(true);
        PROGRESS_ACTIVE.store(false, Ordering::SeqCst);
    }
}

impl Drop for ProgressLine {
    fn drop(&mut self) {
        if PROGRESS_ACTIVE.swap(false, Ordering::SeqCst) {
            let mut stdout = stdout().lock();
            execute!(stdout, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine)).ok();
            stdout.flush().ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_count() {
        assert_eq!(line_count(""), 1);
        assert_eq!(line_count("styles: 1 written"), 1);
        assert_eq!(
            line_count("styles failed\nsrc/scss/style.scss:3:1\nunexpected token"),
            3
        );
    }

    #[test]
    fn test_progress_render() {
        let progress = ProgressLine::new("tasks", 3);
        progress.inc();
        assert_eq!(progress.render(), "tasks(1/3)");
        progress.inc();
        progress.inc();
        progress.inc();
        assert_eq!(progress.render(), "tasks(3/3)");
        progress.finish();
    }

    #[test]
    fn test_clock_format() {
        let clock = clock();
        assert_eq!(clock.len(), 8);
        assert_eq!(clock.as_bytes()[2], b':');
    }

    #[test]
    fn test_verbose_toggle() {
        set_verbose(true);
        assert!(is_verbose());
        set_verbose(false);
        assert!(!is_verbose());
    }
}
