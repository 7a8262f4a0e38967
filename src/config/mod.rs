// src/config/mod.rs

//! Configuration loading and validation for assetflow.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Compile the class -> (input glob, output dir) table (`paths.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate option ranges and globs (`validate.rs`).

pub mod loader;
pub mod model;
pub mod paths;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, resolve_config};
pub use model::{
    ConfigFile, ImageSection, PathsSection, RawConfigFile, ScriptSection, ServerSection,
    StyleSection, TemplateSection,
};
pub use paths::{ClassPaths, PathEntry, PathTable};
