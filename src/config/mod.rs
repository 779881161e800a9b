//! Project configuration (`kiln.toml`).
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── error.rs     # ConfigError, ConfigDiagnostics, FieldPath
//! ├── section.rs   # [styles] [scripts] [html] [svg] [watch] [serve]
//! └── mod.rs       # Config (this file)
//! ```
//!
//! The config file is optional. The project root is the directory holding
//! it, or the current directory when there is none. `Config` is built once
//! at startup and handed to every component that needs it.

mod error;
pub mod section;

pub use error::{ConfigDiagnostics, ConfigError, FieldPath};
pub use section::{
    HtmlConfig, ScriptsConfig, ServeConfig, StyleCompiler, StylesConfig, SvgConfig, WatchConfig,
};

use crate::{
    cli::{Cli, ServeArgs},
    log,
    utils::path::normalize_path,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing kiln.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Source tree, relative to the root
    pub source_dir: PathBuf,

    /// Destination tree, relative to the root
    pub build_dir: PathBuf,

    pub styles: StylesConfig,
    pub scripts: ScriptsConfig,
    pub html: HtmlConfig,
    pub svg: SvgConfig,
    pub watch: WatchConfig,
    pub serve: ServeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            root: PathBuf::new(),
            source_dir: PathBuf::from("src"),
            build_dir: PathBuf::from("build"),
            styles: StylesConfig::default(),
            scripts: ScriptsConfig::default(),
            html: HtmlConfig::default(),
            svg: SvgConfig::default(),
            watch: WatchConfig::default(),
            serve: ServeConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from CLI arguments, apply overrides, validate.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;
        let config_path = if cli.config.is_absolute() {
            cli.config.clone()
        } else {
            cwd.join(&cli.config)
        };

        let (mut config, root) = if config_path.is_file() {
            let root = config_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| cwd.clone());
            (Self::from_path(&config_path)?, root)
        } else {
            crate::debug!("config"; "no {} found, using defaults", cli.config.display());
            (Self::default(), cwd)
        };

        config.config_path = config_path;
        config.apply_cli(cli);
        config.finalize(&root);
        config.validate()?;
        Ok(config)
    }

    /// Default configuration rooted at `root`, paths resolved, not validated.
    pub fn with_root(root: &Path) -> Self {
        let mut config = Self::default();
        config.finalize(root);
        config
    }

    /// Read and parse `path`; unknown keys are warned about, not rejected.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        let (config, unknown) = Self::parse_with_ignored(&content)?;
        if !unknown.is_empty() {
            log!("warning"; "ignoring unknown keys in {}: {}", path.display(), unknown.join(", "));
        }
        Ok(config)
    }

    /// Parse TOML, returning the dotted paths of keys nothing consumed.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut unknown = Vec::new();
        let config = serde_ignored::deserialize(toml::Deserializer::new(content), |key| {
            unknown.push(key.to_string());
        })?;
        Ok((config, unknown))
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Flags given on the command line win over the file.
    fn apply_cli(&mut self, cli: &Cli) {
        override_with(&mut self.source_dir, &cli.source_dir);
        override_with(&mut self.build_dir, &cli.build_dir);
        if let Some(ServeArgs { interface, port }) = cli.serve_args() {
            override_with(&mut self.serve.interface, interface);
            override_with(&mut self.serve.port, port);
        }
    }

    // ========================================================================
    // path normalization
    // ========================================================================

    /// Resolve every configured path against the root.
    fn finalize(&mut self, root: &Path) {
        let root = normalize_path(root);
        self.source_dir = Self::resolve(&root, &self.source_dir);
        self.build_dir = Self::resolve(&root, &self.build_dir);
        self.scripts.vendors = self
            .scripts
            .vendors
            .iter()
            .map(|p| Self::resolve(&root, p))
            .collect();
        self.root = root;
    }

    /// Tilde-expand `path` and join it to `root` when relative.
    fn resolve(root: &Path, path: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
        let path = PathBuf::from(expanded);
        let full_path = if path.is_relative() {
            root.join(&path)
        } else {
            path
        };
        normalize_path(&full_path)
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate the configuration, collecting all errors at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        const SOURCE_DIR: FieldPath = FieldPath::new("source_dir");
        const BUILD_DIR: FieldPath = FieldPath::new("build_dir");

        let mut diag = ConfigDiagnostics::new();

        if !self.source_dir.is_dir() {
            diag.error_with_hint(
                SOURCE_DIR,
                format!("`{}` is not a directory", self.source_dir.display()),
                "create it or pass --source-dir",
            );
        }

        // The clean step removes build_dir recursively.
        if self.build_dir == self.root || self.root.starts_with(&self.build_dir) {
            diag.error(BUILD_DIR, "must not be the project root or one of its parents");
        } else if self.build_dir == self.source_dir {
            diag.error(BUILD_DIR, "must differ from source_dir");
        } else if self.source_dir.starts_with(&self.build_dir) {
            diag.error(BUILD_DIR, "must not contain source_dir");
        }

        self.styles.validate(&mut diag);
        self.scripts.validate(&mut diag);
        self.svg.validate(&mut diag);
        self.watch.validate(&mut diag);
        self.serve.validate(&mut diag);

        diag.into_result().map_err(ConfigError::Diagnostics)
    }

    /// Path relative to the source directory, `/`-separated.
    pub fn source_relative(&self, path: &Path) -> Option<String> {
        crate::utils::path::relative_slash_path(path, &self.source_dir)
    }
}

fn override_with<T: Clone>(value: &mut T, flag: &Option<T>) {
    if let Some(flag) = flag {
        *value = flag.clone();
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> Config {
    let (parsed, ignored) = Config::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

/// Scratch project with an existing source directory.
#[cfg(test)]
pub fn test_project() -> (tempfile::TempDir, Config) {
    let temp = tempfile::TempDir::new().unwrap();
    let config = Config::with_root(temp.path());
    fs::create_dir_all(&config.source_dir).unwrap();
    (temp, config)
}
