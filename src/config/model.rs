// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::jobs::SelectionRule;
use crate::render::{RenderConfiguration, RenderPlan};
use crate::types::{CachePolicy, Concurrency, ProcessingMode};

/// Configuration exactly as read from a TOML file.
///
/// ```toml
/// [render]
/// source_dir = "src/main/dita"
/// output_dir = "target/dita/output"
/// format = "html5"
/// patterns = ["dm\\-.*ditamap"]
///
/// [render.properties]
/// "args.copycss" = "yes"
///
/// [distribution]
/// version = "3.0.2"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub render: RenderSection,

    #[serde(default)]
    pub distribution: DistributionSection,
}

/// Validated configuration.
///
/// Built via `TryFrom<RawConfigFile>`, which checks the settings, compiles the
/// selection patterns and makes directories absolute.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    render: RenderSection,
    distribution: DistributionSection,
    selection: SelectionRule,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        render: RenderSection,
        distribution: DistributionSection,
        selection: SelectionRule,
    ) -> Self {
        Self {
            render,
            distribution,
            selection,
        }
    }

    pub fn render(&self) -> &RenderSection {
        &self.render
    }

    pub fn distribution(&self) -> &DistributionSection {
        &self.distribution
    }

    pub fn selection_rule(&self) -> &SelectionRule {
        &self.selection
    }

    pub fn concurrency(&self) -> Concurrency {
        Concurrency::from_level(self.render.parallelism)
    }

    /// Engine settings for this configuration.
    pub fn render_configuration(&self) -> RenderConfiguration {
        RenderConfiguration {
            format: self.render.format.clone(),
            mode: self.render.mode,
            properties: self.render.properties.clone(),
            clean_on_failure: self.render.clean_on_failure,
            debug_log: self.render.debug_log,
        }
    }

    /// Directories, selection and concurrency for one pass.
    pub fn render_plan(&self) -> RenderPlan {
        RenderPlan {
            source_root: self.render.source_dir.clone(),
            output_root: self.render.output_dir.clone(),
            rule: self.selection.clone(),
            concurrency: self.concurrency(),
        }
    }
}

/// `[render]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RenderSection {
    /// Directory whose immediate children are candidate render roots.
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Scratch space for the engines and the extracted distribution.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    #[serde(default = "default_format")]
    pub format: String,

    #[serde(default)]
    pub mode: ProcessingMode,

    #[serde(default = "default_true")]
    pub clean_on_failure: bool,

    #[serde(default)]
    pub debug_log: bool,

    /// `0` renders inline, a negative value uses every available core, a
    /// positive value fixes the number of workers.
    #[serde(default = "default_parallelism")]
    pub parallelism: i64,

    /// Regex patterns matched against the full file name.
    #[serde(default = "default_patterns")]
    pub patterns: Vec<String>,

    /// Explicit file names. When set, `patterns` is ignored.
    #[serde(default)]
    pub includes: Option<Vec<String>>,

    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("src/main/dita")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("target/dita/output")
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("target/dita/temp")
}

fn default_format() -> String {
    "html5".to_string()
}

fn default_true() -> bool {
    true
}

fn default_parallelism() -> i64 {
    -1
}

fn default_patterns() -> Vec<String> {
    vec![r"dm\-.*ditamap".to_string()]
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            output_dir: default_output_dir(),
            temp_dir: default_temp_dir(),
            format: default_format(),
            mode: ProcessingMode::default(),
            clean_on_failure: true,
            debug_log: false,
            parallelism: default_parallelism(),
            patterns: default_patterns(),
            includes: None,
            properties: BTreeMap::new(),
        }
    }
}

/// `[distribution]` section: where the engine installation comes from.
#[derive(Debug, Clone, Deserialize)]
pub struct DistributionSection {
    #[serde(default = "default_version")]
    pub version: String,

    /// Download location; `$version` is replaced by [`Self::version`].
    #[serde(default = "default_download_url")]
    pub download_url: String,

    /// Store downloaded archives in the cache directory.
    #[serde(default = "default_true")]
    pub cache: bool,

    /// Use this installation directly instead of acquiring one.
    #[serde(default)]
    pub home: Option<PathBuf>,

    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Local distribution archive to extract instead of downloading.
    #[serde(default)]
    pub archive: Option<PathBuf>,
}

fn default_version() -> String {
    "3.0.2".to_string()
}

fn default_download_url() -> String {
    "https://github.com/dita-ot/dita-ot/releases/download/$version/dita-ot-$version.zip"
        .to_string()
}

impl Default for DistributionSection {
    fn default() -> Self {
        Self {
            version: default_version(),
            download_url: default_download_url(),
            cache: true,
            home: None,
            cache_dir: None,
            archive: None,
        }
    }
}

impl DistributionSection {
    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy::from(self.cache)
    }

    /// Download URL with the version substituted.
    pub fn resolved_download_url(&self) -> String {
        self.download_url.replace("$version", &self.version)
    }
}
