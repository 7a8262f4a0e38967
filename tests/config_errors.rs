// tests/config_errors.rs

mod common;
use crate::common::{ConfigFileBuilder, Project};

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tempfile::NamedTempFile;

use assetflow::config::{ConfigFile, load_and_validate, resolve_config};
use assetflow::errors::AssetflowError;
use assetflow::pipeline::ConsoleReporter;
use assetflow::types::AssetClass;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn full_example_config_loads() {
    let file = config_file(
        r#"
[paths.style]
input = "web/scss/**/*.scss"
output = "public/css"

[paths.template]
input = "web/pages/**/*.pug"
watch = ["web/**/*.pug"]
output = "public"

[style]
output_style = "compressed"
source_maps = false

[script]
transpile = ""

[image]
jpeg_quality = 60
png_colors = 64

[server]
port = 4000
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    let style = cfg.paths().get(AssetClass::Style);
    assert_eq!(style.input(), "web/scss/**/*.scss");
    assert_eq!(style.output(), Path::new("public/css"));
    assert_eq!(
        cfg.paths().get(AssetClass::Template).watch_patterns(),
        ["web/**/*.pug".to_string()]
    );
    // Untouched sections keep the built-in layout.
    assert_eq!(cfg.paths().get(AssetClass::Script).input(), "src/assets/js/*.js");
    assert_eq!(cfg.script.transpile_command(), None);
    assert_eq!(cfg.image.jpeg_quality, 60);
    assert_eq!(cfg.server.port, 4000);
    assert!(!cfg.style.source_maps);
}

#[test]
fn out_of_range_options_are_config_errors() {
    for (toml, needle) in [
        ("[image]\njpeg_quality = 0\n", "jpeg_quality"),
        ("[image]\npng_colors = 1000\n", "png_colors"),
        ("[server]\nhost = \"  \"\n", "host"),
        ("[paths.image]\ninput = \"\"\noutput = \"dist/img\"\n", "[paths.image].input"),
    ] {
        let file = config_file(toml);
        match load_and_validate(file.path()) {
            Err(AssetflowError::ConfigError(msg)) => assert!(msg.contains(needle), "{msg}"),
            other => panic!("expected ConfigError for {toml:?}, got {other:?}"),
        }
    }
}

#[test]
fn unknown_keys_are_toml_errors() {
    let file = config_file("[style]\nautoprefix = true\n");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(AssetflowError::TomlError(_))
    ));
}

#[test]
fn invalid_glob_is_rejected() {
    let file = config_file("[paths.script]\ninput = \"src/[js\"\noutput = \"dist/js\"\n");
    match load_and_validate(file.path()) {
        Err(AssetflowError::Other(err)) => {
            let msg = format!("{err:#}");
            assert!(msg.contains("building input glob for script"), "{msg}");
            assert!(msg.contains("invalid glob pattern: src/[js"), "{msg}");
        }
        other => panic!("expected a glob error, got {other:?}"),
    }
}

#[test]
fn missing_default_file_falls_back_to_builtin() {
    let project = Project::new();
    let cfg = resolve_config(&project.path("Assetflow.toml"), false).unwrap();
    assert_eq!(
        cfg.paths().get(AssetClass::Template).output(),
        ConfigFile::builtin().unwrap().paths().get(AssetClass::Template).output()
    );
}

#[test]
fn missing_explicit_file_is_an_io_error() {
    let project = Project::new();
    let err = resolve_config(&project.path("custom.toml"), true).unwrap_err();
    assert!(matches!(err, AssetflowError::IoError(_)), "{err}");
}

#[test]
fn unknown_browser_query_fails_pipeline_construction() {
    let mut raw = ConfigFileBuilder::new().raw();
    raw.style.browsers = vec!["definitely not a browser".to_string()];
    let cfg = ConfigFile::try_from(raw).unwrap();

    let project = Project::new();
    let ctx = assetflow::pipeline::TaskContext {
        root: project.root().to_path_buf(),
        fs: Arc::new(assetflow::fs::RealFileSystem),
        reporter: Arc::new(ConsoleReporter),
    };
    let err = assetflow::pipeline::Pipeline::new(&cfg, ctx).unwrap_err();
    assert!(format!("{err:#}").contains("[style].browsers"), "{err:#}");
}
