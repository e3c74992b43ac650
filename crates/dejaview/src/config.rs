//! Configuration
//!
//! Layered the usual way: built-in defaults, then `dejaview.toml` (or the file
//! named by `--config`), then `DEJAVIEW_*` environment variables, then command
//! line flags.

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use dejaview_bridge::{BindingName, BridgeError, DEFAULT_BINDING_NAME, Style};

/// Where intercepted console lines are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleOutput {
    /// Straight to standard output.
    #[default]
    Stdout,
    /// Into the log stream, under the `dejaview::console` target.
    Tracing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Color when standard output is a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DejaviewConfig {
    /// Entry page, relative to the resource root. Empty loads the test page.
    #[serde(alias = "page_relative_path")]
    pub page_relative_path: String,

    /// Window icon, relative to the resource root. Empty means none.
    #[serde(alias = "icon_relative_path")]
    pub icon_relative_path: String,

    /// Global name the native API is bound under.
    #[serde(alias = "api_var_name")]
    pub api_var_name: String,

    #[serde(alias = "disable_right_click")]
    pub disable_right_click: bool,

    pub title: String,

    pub width: f64,

    pub height: f64,

    /// Directory relative resources resolve against. Defaults to the working
    /// directory.
    #[serde(alias = "resource_root", skip_serializing_if = "Option::is_none")]
    pub resource_root: Option<PathBuf>,

    pub console: ConsoleOutput,

    pub color: ColorMode,
}

impl Default for DejaviewConfig {
    fn default() -> Self {
        Self {
            page_relative_path: String::new(),
            icon_relative_path: String::new(),
            api_var_name: DEFAULT_BINDING_NAME.to_string(),
            disable_right_click: true,
            title: "DeJaView".to_string(),
            width: 1200.0,
            height: 800.0,
            resource_root: None,
            console: ConsoleOutput::default(),
            color: ColorMode::default(),
        }
    }
}

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration: {0}")]
    Figment(#[from] figment::Error),

    #[error("Invalid apiVarName: {0}")]
    Binding(#[from] BridgeError),

    #[error("Invalid window size: {width}x{height}")]
    WindowSize { width: f64, height: f64 },
}

impl DejaviewConfig {
    /// Looked up in the working directory when `--config` is not given.
    pub const FILE_NAME: &'static str = "dejaview.toml";

    /// Prefix of environment overrides, e.g. `DEJAVIEW_API_VAR_NAME`.
    pub const ENV_PREFIX: &'static str = "DEJAVIEW_";

    /// Load and validate the layered configuration.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(args)?.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// The provider stack, without extracting.
    pub fn figment(args: &Args) -> Result<Figment, ConfigError> {
        let file = match &args.config {
            Some(path) if !path.exists() => return Err(ConfigError::FileNotFound(path.clone())),
            Some(path) => Toml::file(path),
            None => Toml::file(Self::FILE_NAME),
        };

        Ok(Figment::from(Serialized::defaults(Self::default()))
            .merge(file)
            .merge(Env::prefixed(Self::ENV_PREFIX))
            .merge(Serialized::defaults(args.overrides())))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.binding_name()?;
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(self.width) || !valid(self.height) {
            return Err(ConfigError::WindowSize {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    pub fn binding_name(&self) -> Result<BindingName, ConfigError> {
        Ok(BindingName::new(&self.api_var_name)?)
    }

    /// Rendering style for console lines and evaluation results.
    pub fn style(&self) -> Style {
        match (self.color, self.console) {
            (ColorMode::Always, _) => Style::Ansi,
            (ColorMode::Never, _) => Style::Plain,
            // Log lines are plain unless asked otherwise.
            (ColorMode::Auto, ConsoleOutput::Tracing) => Style::Plain,
            (ColorMode::Auto, ConsoleOutput::Stdout) => {
                Style::from_color(std::io::stdout().is_terminal())
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command Line
// ─────────────────────────────────────────────────────────────────────────────

/// DeJaView: host a page with a native API bridge
#[derive(Parser, Debug, Default)]
#[command(name = "dejaview")]
#[command(about = "Host a page and bridge a native API into its scripts", long_about = None)]
pub struct Args {
    /// Configuration file (defaults to ./dejaview.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Entry page, relative to the resource root
    #[arg(short, long)]
    pub page: Option<String>,

    /// Window icon, relative to the resource root
    #[arg(long)]
    pub icon: Option<String>,

    /// Global name to bind the native API under
    #[arg(long)]
    pub api_var_name: Option<String>,

    /// Keep the surface's default context menu
    #[arg(long)]
    pub enable_right_click: bool,

    /// Directory relative resources resolve against
    #[arg(long)]
    pub resource_root: Option<PathBuf>,

    #[arg(long)]
    pub title: Option<String>,

    /// Where console lines go
    #[arg(long, value_enum)]
    pub console: Option<ConsoleOutput>,

    #[arg(long, value_enum)]
    pub color: Option<ColorMode>,

    /// Read script from standard input and evaluate it against the page
    #[arg(long)]
    pub repl: bool,

    /// Print the resolved configuration and exit
    #[arg(long)]
    pub print_config: bool,
}

/// Flags that were actually given, as a figment layer.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    page_relative_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon_relative_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_var_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    disable_right_click: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource_root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    console: Option<ConsoleOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<ColorMode>,
}

impl Args {
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            page_relative_path: self.page.clone(),
            icon_relative_path: self.icon.clone(),
            api_var_name: self.api_var_name.clone(),
            disable_right_click: self.enable_right_click.then_some(false),
            resource_root: self.resource_root.clone(),
            title: self.title.clone(),
            console: self.console,
            color: self.color,
        }
    }
}
