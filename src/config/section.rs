//! Configuration sections of `kiln.toml`.
//!
//! ```toml
//! [styles]
//! compiler = "auto"              # auto | sass | builtin
//! browsers = ["last 2 versions"]
//!
//! [scripts]
//! minify = true
//! bundle = "script.min.js"
//! vendors = ["node_modules/jquery/dist/jquery.min.js"]
//! vendor_bundle = "vendors.min.js"
//!
//! [html]
//! strip_dev_blocks = true
//!
//! [svg]
//! sprite = "sprite-svg.svg"
//!
//! [watch]
//! debounce_ms = 300
//!
//! [serve]
//! interface = "127.0.0.1"
//! port = 3000
//! ws_port = 35729
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use lightningcss::targets::Browsers;
use serde::{Deserialize, Serialize};

use super::{ConfigDiagnostics, FieldPath};

// ============================================================================
// [styles]
// ============================================================================

/// Which stylesheet compiler runs the `styles` task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleCompiler {
    /// External `sass` when it is on `PATH`, builtin otherwise.
    #[default]
    Auto,
    /// Always the external `sass` binary.
    Sass,
    /// Always the builtin partial inliner.
    Builtin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StylesConfig {
    pub compiler: StyleCompiler,
    /// Browserslist queries used for vendor prefixing.
    pub browsers: Vec<String>,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            compiler: StyleCompiler::Auto,
            browsers: vec!["last 2 versions".to_string()],
        }
    }
}

impl StylesConfig {
    const BROWSERS: FieldPath = FieldPath::new("styles.browsers");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if let Err(e) = Browsers::from_browserslist(&self.browsers) {
            diag.error_with_hint(
                Self::BROWSERS,
                format!("invalid browserslist query: {e}"),
                "e.g. [\"last 2 versions\", \"> 0.5%\"]",
            );
        }
    }
}

// ============================================================================
// [scripts]
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    pub minify: bool,
    /// File name of the script bundle under `js/`.
    pub bundle: String,
    /// Vendor files (project-root relative), concatenated in order.
    pub vendors: Vec<PathBuf>,
    /// File name of the vendor bundle under `js/`.
    pub vendor_bundle: String,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            minify: true,
            bundle: "script.min.js".to_string(),
            vendors: Vec::new(),
            vendor_bundle: "vendors.min.js".to_string(),
        }
    }
}

impl ScriptsConfig {
    const BUNDLE: FieldPath = FieldPath::new("scripts.bundle");
    const VENDOR_BUNDLE: FieldPath = FieldPath::new("scripts.vendor_bundle");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        check_file_name(&self.bundle, Self::BUNDLE, diag);
        check_file_name(&self.vendor_bundle, Self::VENDOR_BUNDLE, diag);
        if self.bundle == self.vendor_bundle {
            diag.error(
                Self::VENDOR_BUNDLE,
                format!("`{}` is also the script bundle", self.vendor_bundle),
            );
        }
    }
}

// ============================================================================
// [html]
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlConfig {
    /// Remove `<!--DEV ... -->` blocks from pages.
    pub strip_dev_blocks: bool,
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self {
            strip_dev_blocks: true,
        }
    }
}

// ============================================================================
// [svg]
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SvgConfig {
    /// File name of the sprite under `img/`.
    pub sprite: String,
}

impl Default for SvgConfig {
    fn default() -> Self {
        Self {
            sprite: "sprite-svg.svg".to_string(),
        }
    }
}

impl SvgConfig {
    const SPRITE: FieldPath = FieldPath::new("svg.sprite");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        check_file_name(&self.sprite, Self::SPRITE, diag);
    }
}

// ============================================================================
// [watch]
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Quiet period before a burst of changes is dispatched.
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

impl WatchConfig {
    const DEBOUNCE_MS: FieldPath = FieldPath::new("watch.debounce_ms");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.debounce_ms == 0 {
            diag.error(Self::DEBOUNCE_MS, "must be greater than 0");
        }
    }
}

// ============================================================================
// [serve]
// ============================================================================

/// Development server settings.
///
/// Use `interface = "0.0.0.0"` to make the server accessible from LAN.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    pub interface: IpAddr,
    /// HTTP port number.
    pub port: u16,
    /// WebSocket port for live reload.
    pub ws_port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 3000,
            ws_port: 35729,
        }
    }
}

impl ServeConfig {
    const WS_PORT: FieldPath = FieldPath::new("serve.ws_port");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.port == self.ws_port {
            diag.error_with_hint(
                Self::WS_PORT,
                format!("port {} is also the HTTP port", self.ws_port),
                "the default live reload port is 35729",
            );
        }
    }
}

/// Output names must be plain file names, not paths.
fn check_file_name(name: &str, field: FieldPath, diag: &mut ConfigDiagnostics) {
    if name.is_empty() {
        diag.error(field, "must not be empty");
    } else if name.contains(['/', '\\']) || name == "." || name == ".." {
        diag.error(field, format!("`{name}` must be a file name, not a path"));
    }
}
