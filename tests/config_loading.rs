// tests/config_loading.rs

mod common;
use crate::common::{init_tracing, ConfigFileBuilder};

use std::fs;
use std::path::PathBuf;

use rendermill::config::{load_and_validate, ConfigOverrides, ConfigSource, RawConfigFile};
use rendermill::errors::RendermillError;
use rendermill::types::{CachePolicy, Concurrency, ProcessingMode};

#[test]
fn enum_defaults() {
    assert_eq!(ProcessingMode::default(), ProcessingMode::Strict);
    assert_eq!(CachePolicy::default(), CachePolicy::Cache);
    assert_eq!(Concurrency::default(), Concurrency::Auto);
}

fn config_error(err: RendermillError) -> String {
    match err {
        RendermillError::ConfigError(msg) => msg,
        other => panic!("expected a configuration error, got {other:?}"),
    }
}

#[test]
fn defaults_are_valid() {
    init_tracing();

    let cfg = ConfigFileBuilder::new().build();

    assert!(cfg.render().source_dir.is_absolute());
    assert!(cfg.render().source_dir.ends_with("src/main/dita"));
    assert!(cfg.render().output_dir.ends_with("target/dita/output"));
    assert_eq!(cfg.render().format, "html5");
    assert_eq!(cfg.render().mode, ProcessingMode::Strict);
    assert_eq!(cfg.concurrency(), Concurrency::Auto);
    assert!(cfg.selection_rule().matches("dm-guide.ditamap"));
    assert!(!cfg.selection_rule().matches("topic.dita"));
    assert_eq!(cfg.distribution().version, "3.0.2");
    assert_eq!(cfg.distribution().cache_policy(), CachePolicy::Cache);
    assert_eq!(
        cfg.distribution().resolved_download_url(),
        "https://github.com/dita-ot/dita-ot/releases/download/3.0.2/dita-ot-3.0.2.zip"
    );
}

#[test]
fn render_configuration_and_plan_follow_the_file() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = ConfigFileBuilder::new()
        .rooted_at(tmp.path())
        .format("pdf")
        .mode(ProcessingMode::Lax)
        .parallelism(0)
        .property("args.copycss", "yes")
        .include("guide.ditamap")
        .build();

    let render = cfg.render_configuration();
    assert_eq!(render.format, "pdf");
    assert_eq!(render.mode, ProcessingMode::Lax);
    assert_eq!(render.properties.get("args.copycss").map(String::as_str), Some("yes"));

    let plan = cfg.render_plan();
    assert_eq!(plan.source_root, tmp.path().join("src"));
    assert_eq!(plan.output_root, tmp.path().join("out"));
    assert_eq!(plan.concurrency, Concurrency::Inline);
    // Allow-list wins over the default pattern.
    assert!(plan.rule.matches("guide.ditamap"));
    assert!(!plan.rule.matches("dm-guide.ditamap"));
}

#[test]
fn invalid_pattern_is_a_configuration_error() {
    let err = ConfigFileBuilder::new().pattern("dm-[").try_build().unwrap_err();
    let msg = config_error(err);
    assert!(msg.contains("[render].patterns"), "{msg}");
    assert!(msg.contains("dm-["), "{msg}");
}

#[test]
fn invalid_property_name_is_a_configuration_error() {
    let err = ConfigFileBuilder::new()
        .property("args copycss", "yes")
        .try_build()
        .unwrap_err();
    let msg = config_error(err);
    assert!(msg.contains("[render]"), "{msg}");
    assert!(msg.contains("args copycss"), "{msg}");
}

#[test]
fn empty_format_is_rejected() {
    let err = ConfigFileBuilder::new().format("  ").try_build().unwrap_err();
    assert!(config_error(err).contains("format"));
}

#[test]
fn output_dir_must_differ_from_source_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let err = ConfigFileBuilder::new()
        .source_dir(tmp.path())
        .output_dir(tmp.path())
        .try_build()
        .unwrap_err();
    assert!(config_error(err).contains("output_dir"));
}

#[test]
fn empty_distribution_version_is_rejected() {
    let mut raw = RawConfigFile::default();
    raw.distribution.version = String::new();
    let err = rendermill::config::ConfigFile::try_from(raw).unwrap_err();
    assert!(config_error(err).contains("version"));
}

#[test]
fn toml_file_is_loaded_and_validated() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("Rendermill.toml");
    fs::write(
        &path,
        r#"
[render]
source_dir = "docs"
output_dir = "site"
format = "pdf"
mode = "skip"
parallelism = 4
patterns = ["guide-.*\\.ditamap"]
clean_on_failure = false

[render.properties]
"args.copycss" = "yes"

[distribution]
version = "4.1"
cache = false
"#,
    )
    .unwrap();

    let cfg = load_and_validate(&path).unwrap();

    assert_eq!(cfg.render().format, "pdf");
    assert_eq!(cfg.render().mode, ProcessingMode::Skip);
    assert_eq!(cfg.concurrency(), Concurrency::Fixed(4));
    assert!(!cfg.render().clean_on_failure);
    assert!(cfg.render().source_dir.ends_with("docs"));
    assert!(cfg.selection_rule().matches("guide-intro.ditamap"));
    assert!(!cfg.selection_rule().matches("dm-intro.ditamap"));
    assert_eq!(cfg.distribution().version, "4.1");
    assert_eq!(cfg.distribution().cache_policy(), CachePolicy::ReadOnly);
    // Unset keys keep their defaults.
    assert_eq!(cfg.render().temp_dir.file_name().unwrap(), "temp");
}

#[test]
fn unknown_processing_mode_in_file_is_a_toml_error() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("Rendermill.toml");
    fs::write(&path, "[render]\nmode = \"sloppy\"\n").unwrap();

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, RendermillError::TomlError(_)), "got {err:?}");
}

#[test]
fn missing_file_is_an_io_error() {
    let tmp = tempfile::tempdir().unwrap();
    let err = load_and_validate(tmp.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, RendermillError::IoError(_)), "got {err:?}");
}

#[test]
fn overrides_replace_file_values() {
    let mut raw = RawConfigFile::default();
    let overrides = ConfigOverrides {
        format: Some("xhtml".to_string()),
        mode: Some("LAX".to_string()),
        parallelism: Some(0),
        patterns: vec![".*\\.ditamap".to_string()],
        properties: vec!["args.copycss=yes".to_string(), "nav-toc=full=partial".to_string()],
        dita_version: Some("3.7.4".to_string()),
        ..ConfigOverrides::default()
    };

    overrides.apply(&mut raw).unwrap();

    assert_eq!(raw.render.format, "xhtml");
    assert_eq!(raw.render.mode, ProcessingMode::Lax);
    assert_eq!(raw.render.parallelism, 0);
    assert_eq!(raw.render.patterns, vec![".*\\.ditamap".to_string()]);
    assert_eq!(raw.render.properties["args.copycss"], "yes");
    // Only the first `=` separates key and value.
    assert_eq!(raw.render.properties["nav-toc"], "full=partial");
    assert_eq!(raw.distribution.version, "3.7.4");
    assert!(raw.render.includes.is_none());
}

#[test]
fn malformed_overrides_are_configuration_errors() {
    let bad_property = ConfigOverrides {
        properties: vec!["novalue".to_string()],
        ..ConfigOverrides::default()
    };
    let err = bad_property.apply(&mut RawConfigFile::default()).unwrap_err();
    assert!(config_error(err).contains("novalue"));

    let bad_mode = ConfigOverrides {
        mode: Some("sloppy".to_string()),
        ..ConfigOverrides::default()
    };
    let err = bad_mode.apply(&mut RawConfigFile::default()).unwrap_err();
    assert!(config_error(err).contains("sloppy"));
}

#[test]
fn config_source_combines_file_and_overrides() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("custom.toml");
    fs::write(&path, "[render]\nformat = \"pdf\"\nparallelism = 2\n").unwrap();

    let overrides = ConfigOverrides {
        parallelism: Some(0),
        ..ConfigOverrides::default()
    };
    let source = ConfigSource::new(Some(path.clone()), overrides);
    let cfg = source.load().unwrap();

    assert_eq!(source.path(), Some(path.as_path()));
    assert_eq!(cfg.render().format, "pdf");
    assert_eq!(cfg.concurrency(), Concurrency::Inline);

    // Edits to the file are seen on the next load.
    fs::write(&path, "[render]\nformat = \"html5\"\n").unwrap();
    let cfg = source.load().unwrap();
    assert_eq!(cfg.render().format, "html5");
    assert_eq!(cfg.concurrency(), Concurrency::Inline);
}

#[test]
fn config_source_without_file_uses_defaults() {
    let source = ConfigSource::new(None, ConfigOverrides::default());
    let cfg = source.load().unwrap();

    assert!(source.path().is_none());
    assert_eq!(cfg.render().format, "html5");
    assert_eq!(
        cfg.render().source_dir,
        std::path::absolute(PathBuf::from("src/main/dita")).unwrap()
    );
}
