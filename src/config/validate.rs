// src/config/validate.rs

use std::collections::BTreeMap;

use tracing::warn;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::config::paths::{ClassPaths, PathTable};
use crate::errors::{AssetflowError, Result};
use crate::types::AssetClass;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::AssetflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        let paths = compile_path_table(&raw)?;
        warn_on_shared_inputs(&paths);
        Ok(ConfigFile::new_unchecked(raw, paths))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_path_entries(cfg)?;
    validate_image_section(cfg)?;
    validate_server_section(cfg)?;
    Ok(())
}

fn validate_path_entries(cfg: &RawConfigFile) -> Result<()> {
    for class in AssetClass::ALL {
        let entry = cfg.paths.entry(class);
        if entry.input.trim().is_empty() {
            return Err(AssetflowError::ConfigError(format!(
                "[paths.{class}].input must not be empty"
            )));
        }
        if entry.output.trim().is_empty() {
            return Err(AssetflowError::ConfigError(format!(
                "[paths.{class}].output must not be empty"
            )));
        }
    }
    Ok(())
}

fn validate_image_section(cfg: &RawConfigFile) -> Result<()> {
    let quality = cfg.image.jpeg_quality;
    if !(1..=100).contains(&quality) {
        return Err(AssetflowError::ConfigError(format!(
            "[image].jpeg_quality must be within 1..=100 (got {quality})"
        )));
    }

    let colors = cfg.image.png_colors;
    if !(2..=256).contains(&colors) {
        return Err(AssetflowError::ConfigError(format!(
            "[image].png_colors must be within 2..=256 (got {colors})"
        )));
    }
    Ok(())
}

fn validate_server_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.server.host.trim().is_empty() {
        return Err(AssetflowError::ConfigError(
            "[server].host must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn compile_path_table(cfg: &RawConfigFile) -> Result<PathTable> {
    let mut entries = BTreeMap::new();
    for class in AssetClass::ALL {
        let compiled = ClassPaths::compile(class, cfg.paths.entry(class))?;
        entries.insert(class, compiled);
    }
    Ok(PathTable::new(entries))
}

// Distinct classes are assumed not to overlap; we only point it out.
fn warn_on_shared_inputs(paths: &PathTable) {
    let all: Vec<&ClassPaths> = paths.iter().collect();
    for (i, a) in all.iter().enumerate() {
        for b in &all[i + 1..] {
            if a.input() == b.input() {
                warn!(
                    first = %a.class(),
                    second = %b.class(),
                    glob = a.input(),
                    "two asset classes share the same input glob"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = ConfigFile::try_from(RawConfigFile::default()).unwrap();
        let style = cfg.paths().get(AssetClass::Style);
        assert_eq!(style.input(), "src/assets/scss/**/*.scss");
        assert_eq!(style.output().to_string_lossy(), "dist/assets/css");
        let template = cfg.paths().get(AssetClass::Template);
        assert_eq!(template.watch_patterns(), ["src/**/*.pug".to_string()]);
        assert_eq!(cfg.image.jpeg_quality, 80);
    }

    #[test]
    fn rejects_out_of_range_quality() {
        let mut raw = RawConfigFile::default();
        raw.image.jpeg_quality = 0;
        match ConfigFile::try_from(raw) {
            Err(AssetflowError::ConfigError(msg)) => assert!(msg.contains("jpeg_quality")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_glob() {
        let mut raw = RawConfigFile::default();
        raw.paths.script.input = "src/[js".to_string();
        assert!(ConfigFile::try_from(raw).is_err());
    }

    #[test]
    fn rejects_empty_output() {
        let mut raw = RawConfigFile::default();
        raw.paths.image.output = "  ".to_string();
        match ConfigFile::try_from(raw) {
            Err(AssetflowError::ConfigError(msg)) => assert!(msg.contains("[paths.image]")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }
}
