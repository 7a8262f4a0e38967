// src/config/model.rs

use serde::Deserialize;

use crate::config::paths::{PathEntry, PathTable};
use crate::types::{AssetClass, SassOutputStyle};

/// Top-level configuration as read from `Assetflow.toml`.
///
/// Every section is optional; an empty file (or no file at all) yields the
/// stock layout:
///
/// ```toml
/// [paths.style]
/// input = "src/assets/scss/**/*.scss"
/// output = "dist/assets/css"
///
/// [style]
/// browsers = ["last 2 versions", "> 5%"]
///
/// [server]
/// port = 3000
/// ```
///
/// This is the unvalidated form; use [`ConfigFile`] via
/// [`crate::config::load_and_validate`] in the rest of the application.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub style: StyleSection,

    #[serde(default)]
    pub template: TemplateSection,

    #[serde(default)]
    pub script: ScriptSection,

    #[serde(default)]
    pub image: ImageSection,

    #[serde(default)]
    pub server: ServerSection,
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (see `validate.rs`),
/// so holders can rely on the path table globs compiling and option ranges
/// being sane.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    paths: PathTable,
    pub style: StyleSection,
    pub template: TemplateSection,
    pub script: ScriptSection,
    pub image: ImageSection,
    pub server: ServerSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile, paths: PathTable) -> Self {
        Self {
            paths,
            style: raw.style,
            template: raw.template,
            script: raw.script,
            image: raw.image,
            server: raw.server,
        }
    }

    /// The static (class -> input glob, output dir) table.
    pub fn paths(&self) -> &PathTable {
        &self.paths
    }

    /// Built-in configuration, used when no config file is present.
    pub fn builtin() -> crate::errors::Result<Self> {
        Self::try_from(RawConfigFile::default())
    }
}

/// `[paths.<class>]` sections.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsSection {
    #[serde(default = "default_style_paths")]
    pub style: PathEntry,
    #[serde(default = "default_script_paths")]
    pub script: PathEntry,
    #[serde(default = "default_image_paths")]
    pub image: PathEntry,
    #[serde(default = "default_template_paths")]
    pub template: PathEntry,
}

impl PathsSection {
    pub fn entry(&self, class: AssetClass) -> &PathEntry {
        match class {
            AssetClass::Style => &self.style,
            AssetClass::Script => &self.script,
            AssetClass::Image => &self.image,
            AssetClass::Template => &self.template,
        }
    }
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            style: default_style_paths(),
            script: default_script_paths(),
            image: default_image_paths(),
            template: default_template_paths(),
        }
    }
}

fn default_style_paths() -> PathEntry {
    PathEntry::new("src/assets/scss/**/*.scss", "dist/assets/css")
}

fn default_script_paths() -> PathEntry {
    PathEntry::new("src/assets/js/*.js", "dist/assets/js")
}

fn default_image_paths() -> PathEntry {
    PathEntry::new("src/assets/images/**/*", "dist/assets/images")
}

fn default_template_paths() -> PathEntry {
    PathEntry {
        watch: Some(vec!["src/**/*.pug".to_string()]),
        ..PathEntry::new("src/views/**/*.pug", "dist")
    }
}

/// `[style]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StyleSection {
    /// Output style of the Sass compile stage (`"expanded"` or `"compressed"`).
    #[serde(default)]
    pub output_style: SassOutputStyle,

    /// Extra Sass load paths, relative to the project root.
    #[serde(default = "default_include_paths")]
    pub include_paths: Vec<String>,

    /// Browserslist queries driving vendor prefixing and syntax lowering.
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,

    /// Write `maps/<stem>.css.map` next to each stylesheet.
    #[serde(default = "default_true")]
    pub source_maps: bool,
}

impl Default for StyleSection {
    fn default() -> Self {
        Self {
            output_style: SassOutputStyle::default(),
            include_paths: default_include_paths(),
            browsers: default_browsers(),
            source_maps: true,
        }
    }
}

fn default_include_paths() -> Vec<String> {
    vec!["node_modules".to_string(), "src/sass".to_string()]
}

fn default_browsers() -> Vec<String> {
    [
        "last 2 versions",
        "> 5%",
        "ie 11",
        "not ie <= 10",
        "ios >= 8",
        "android >= 5",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// `[template]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateSection {
    /// Indent nested elements one per line; otherwise emit compact markup.
    #[serde(default = "default_true")]
    pub pretty: bool,

    /// Directory that absolute (`/...`) includes and extends resolve against.
    #[serde(default = "default_basedir")]
    pub basedir: String,
}

impl Default for TemplateSection {
    fn default() -> Self {
        Self {
            pretty: true,
            basedir: default_basedir(),
        }
    }
}

fn default_basedir() -> String {
    "src/views".to_string()
}

/// `[script]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptSection {
    /// Shell command the source is piped through (stdin to stdout).
    ///
    /// An empty string disables transpilation.
    #[serde(default = "default_transpile")]
    pub transpile: String,
}

impl ScriptSection {
    pub fn transpile_command(&self) -> Option<&str> {
        let cmd = self.transpile.trim();
        if cmd.is_empty() { None } else { Some(cmd) }
    }
}

impl Default for ScriptSection {
    fn default() -> Self {
        Self {
            transpile: default_transpile(),
        }
    }
}

fn default_transpile() -> String {
    "npx --no-install babel --presets=@babel/preset-env".to_string()
}

/// `[image]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageSection {
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Maximum palette size for PNG quantization (2..=256).
    #[serde(default = "default_png_colors")]
    pub png_colors: usize,

    #[serde(default = "default_true")]
    pub svg_preserve_viewbox: bool,
}

impl Default for ImageSection {
    fn default() -> Self {
        Self {
            jpeg_quality: default_jpeg_quality(),
            png_colors: default_png_colors(),
            svg_preserve_viewbox: true,
        }
    }
}

fn default_jpeg_quality() -> u8 {
    80
}

fn default_png_colors() -> usize {
    256
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory to serve. Defaults to the template output directory.
    #[serde(default)]
    pub root: Option<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            root: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_true() -> bool {
    true
}
