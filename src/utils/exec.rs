//! External tools (the `sass` binary).
//!
//! ```ignore
//! let output = Cmd::new(sass)
//!     .args(["--stdin", "--no-source-map"])
//!     .cwd(scss_dir)
//!     .stdin(source)
//!     .filter(&SASS_FILTER)
//!     .run()?;
//! ```
//!
//! Stdout is returned untouched; stderr is logged (or folded into the
//! error on failure) minus the lines the filter marks as noise.

use anyhow::{Context, Result};
use regex::Regex;
use std::{
    ffi::{OsStr, OsString},
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
    sync::LazyLock,
};

/// ANSI colour sequences some tools print even without a TTY.
static ANSI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("valid ANSI regex"));

/// Line prefixes of tool output that carry no information.
pub struct FilterRule {
    noise: &'static [&'static str],
}

/// Dart Sass deprecation chatter and its box-drawing excerpts.
pub const SASS_FILTER: FilterRule = FilterRule {
    noise: &["Deprecation Warning", "More info", "Recommendation:", "│", "╷", "╵"],
};

const NO_FILTER: FilterRule = FilterRule { noise: &[] };

impl FilterRule {
    fn is_noise(&self, line: &str) -> bool {
        line.is_empty() || self.noise.iter().any(|p| line.starts_with(p))
    }

    /// Meaningful stderr lines, colour codes removed.
    fn keep(&self, stderr: &[u8]) -> Vec<String> {
        String::from_utf8_lossy(stderr)
            .lines()
            .map(|line| ANSI.replace_all(line, "").trim().to_string())
            .filter(|line| !self.is_noise(line))
            .collect()
    }
}

/// One invocation of an external program.
#[derive(Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    stdin: Option<Vec<u8>>,
    filter: Option<&'static FilterRule>,
}

impl Cmd {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
        }
    }

    /// Empty arguments are dropped.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        let arg = arg.as_ref();
        if !arg.is_empty() {
            self.args.push(arg.to_owned());
        }
        self
    }

    pub fn args<I, S>(self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        args.into_iter().fold(self, Self::arg)
    }

    pub fn cwd(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    pub fn stdin(mut self, data: impl AsRef<[u8]>) -> Self {
        self.stdin = Some(data.as_ref().to_vec());
        self
    }

    pub fn filter(mut self, filter: &'static FilterRule) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Run to completion. A non-zero exit is an error carrying stderr.
    pub fn run(self) -> Result<Output> {
        let name = Path::new(&self.program)
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned();
        let filter = self.filter.unwrap_or(&NO_FILTER);

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(if self.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.cwd {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .with_context(|| format!("failed to start `{name}`"))?;
        if let (Some(data), Some(mut pipe)) = (self.stdin, child.stdin.take()) {
            pipe.write_all(&data)
                .with_context(|| format!("failed to write to `{name}`"))?;
        }
        let output = child
            .wait_with_output()
            .with_context(|| format!("`{name}` did not finish"))?;

        let stderr = filter.keep(&output.stderr);
        if !output.status.success() {
            let mut message = format!("`{name}` exited with {}", output.status);
            for line in &stderr {
                message.push('\n');
                message.push_str(line);
            }
            anyhow::bail!(message);
        }
        if !stderr.is_empty() {
            crate::log!(&name; "{}", stderr.join("\n"));
        }
        Ok(output)
    }
}
