//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// kiln asset pipeline CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: kiln.toml)
    #[arg(short = 'C', long, global = true, default_value = "kiln.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Source directory path (relative to project root)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub source_dir: Option<PathBuf>,

    /// Build directory path (relative to project root)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub build_dir: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands (default: dev)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Clean the build directory, then run every pipeline in parallel
    #[command(visible_alias = "b")]
    Build,

    /// Build, then watch sources and serve with live reload
    #[command(visible_alias = "d")]
    Dev {
        #[command(flatten)]
        serve_args: ServeArgs,
    },

    /// Watch sources and re-run the bound tasks on change
    #[command(visible_alias = "w")]
    Watch,

    /// Serve the build directory with live reload
    #[command(visible_alias = "s")]
    Serve {
        #[command(flatten)]
        serve_args: ServeArgs,
    },

    /// Remove the build directory
    Clean,

    /// Compile stylesheets into css/<entry>.min.css
    Styles,

    /// Minify and bundle scripts into js/script.min.js
    Scripts,

    /// Concatenate vendor scripts into js/vendors.min.js
    #[command(name = "scripts-vendors", alias = "scriptsVendors")]
    ScriptsVendors,

    /// Copy HTML pages, stripping development blocks
    #[command(alias = "htmls")]
    Html,

    /// Copy images
    Images,

    /// Combine SVG icons into img/sprite-svg.svg
    #[command(name = "svg-sprite", alias = "svgSprite")]
    SvgSprite,

    /// Copy plain stylesheets
    #[command(name = "css-copy", alias = "cssCopy")]
    CssCopy,
}

/// Shared arguments for Dev and Serve commands
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
    #[arg(short, long)]
    pub interface: Option<std::net::IpAddr>,

    /// Port number to listen on
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl Commands {
    /// Registry name of a standalone task command.
    pub const fn task_name(&self) -> Option<&'static str> {
        match self {
            Self::Clean => Some("clean"),
            Self::Styles => Some("styles"),
            Self::Scripts => Some("scripts"),
            Self::ScriptsVendors => Some("scriptsVendors"),
            Self::Html => Some("html"),
            Self::Images => Some("images"),
            Self::SvgSprite => Some("svgSprite"),
            Self::CssCopy => Some("cssCopy"),
            Self::Build | Self::Dev { .. } | Self::Watch | Self::Serve { .. } => None,
        }
    }
}

impl Cli {
    /// Subcommand to run; no subcommand means dev mode.
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Dev {
            serve_args: ServeArgs::default(),
        })
    }

    /// Serve arguments of the active command, if it serves.
    pub fn serve_args(&self) -> Option<&ServeArgs> {
        match &self.command {
            Some(Commands::Dev { serve_args } | Commands::Serve { serve_args }) => Some(serve_args),
            _ => None,
        }
    }
}
