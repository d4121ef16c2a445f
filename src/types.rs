use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Processing mode handed to the render engine.
///
/// - `Strict`: stop on the first content error.
/// - `Skip`: skip the offending element and continue.
/// - `Lax`: try to recover and continue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    #[default]
    Strict,
    Skip,
    Lax,
}

impl ProcessingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingMode::Strict => "strict",
            ProcessingMode::Skip => "skip",
            ProcessingMode::Lax => "lax",
        }
    }
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(ProcessingMode::Strict),
            "skip" => Ok(ProcessingMode::Skip),
            "lax" => Ok(ProcessingMode::Lax),
            other => Err(format!(
                "invalid processing mode: {other} (expected \"strict\", \"skip\" or \"lax\")"
            )),
        }
    }
}

/// Whether a freshly downloaded distribution archive is written back into the
/// local cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CachePolicy {
    /// Look up the cache and store downloads in it.
    #[default]
    Cache,
    /// Look up the cache but never write to it.
    ReadOnly,
}

impl From<bool> for CachePolicy {
    fn from(cache: bool) -> Self {
        if cache {
            CachePolicy::Cache
        } else {
            CachePolicy::ReadOnly
        }
    }
}

/// How many render jobs may run at once.
///
/// This is the typed form of the `parallelism` setting:
/// `0` → [`Concurrency::Inline`], negative → [`Concurrency::Auto`],
/// positive → [`Concurrency::Fixed`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Concurrency {
    /// Run every job sequentially on the calling task.
    Inline,
    /// One worker per available processing unit.
    #[default]
    Auto,
    /// A fixed number of workers.
    Fixed(usize),
}

impl Concurrency {
    pub fn from_level(level: i64) -> Self {
        match level {
            0 => Concurrency::Inline,
            n if n < 0 => Concurrency::Auto,
            n => Concurrency::Fixed(n as usize),
        }
    }

    /// Number of jobs allowed to run at the same time.
    pub fn worker_count(&self) -> usize {
        match self {
            Concurrency::Inline => 1,
            Concurrency::Auto => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            Concurrency::Fixed(n) => (*n).max(1),
        }
    }
}
