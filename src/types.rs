use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// One of the four categories of source file, each with its own transform
/// chain, input glob and output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Style,
    Script,
    Image,
    Template,
}

impl AssetClass {
    /// All classes, in the order the initial build lists them.
    pub const ALL: [AssetClass; 4] = [
        AssetClass::Style,
        AssetClass::Script,
        AssetClass::Image,
        AssetClass::Template,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AssetClass::Style => "style",
            AssetClass::Script => "script",
            AssetClass::Image => "image",
            AssetClass::Template => "template",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "style" | "css" | "scss" => Ok(AssetClass::Style),
            "script" | "js" => Ok(AssetClass::Script),
            "image" | "img" => Ok(AssetClass::Image),
            "template" | "pug" | "html" => Ok(AssetClass::Template),
            other => Err(format!(
                "invalid asset class: {other} (expected \"style\", \"script\", \"image\" or \"template\")"
            )),
        }
    }
}

/// Output style of the Sass compile stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SassOutputStyle {
    #[default]
    Expanded,
    Compressed,
}
