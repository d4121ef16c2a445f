// src/jobs/filter.rs

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use crate::errors::RendermillError;
use crate::fs::FileSystem;
use crate::jobs::JobDescriptor;

/// Which children of the source root are render roots.
///
/// The two variants encode the selection precedence:
///
/// - When an allow-list is configured it is authoritative; patterns are never
///   consulted, even when the pattern list is empty.
/// - Without an allow-list, an empty pattern list selects every entry;
///   otherwise an entry is selected when any pattern matches its full name.
#[derive(Clone)]
pub enum SelectionRule {
    AllowList(BTreeSet<String>),
    Patterns(Vec<Regex>),
}

impl fmt::Debug for SelectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionRule::AllowList(names) => f.debug_tuple("AllowList").field(names).finish(),
            SelectionRule::Patterns(patterns) => {
                let sources: Vec<&str> = patterns.iter().map(|p| p.as_str()).collect();
                f.debug_tuple("Patterns").field(&sources).finish()
            }
        }
    }
}

impl SelectionRule {
    /// Build the rule from the raw `includes` / `patterns` settings.
    ///
    /// Patterns are anchored so they must match the whole file name.
    pub fn from_parts(includes: Option<&[String]>, patterns: &[String]) -> Result<Self> {
        if let Some(names) = includes {
            return Ok(SelectionRule::AllowList(names.iter().cloned().collect()));
        }

        let compiled = patterns
            .iter()
            .map(|p| compile_full_match(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(SelectionRule::Patterns(compiled))
    }

    /// Rule that selects every entry.
    pub fn match_all() -> Self {
        SelectionRule::Patterns(Vec::new())
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            SelectionRule::AllowList(names) => names.contains(name),
            SelectionRule::Patterns(patterns) if patterns.is_empty() => true,
            SelectionRule::Patterns(patterns) => patterns.iter().any(|p| p.is_match(name)),
        }
    }
}

fn compile_full_match(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{pattern})$"))
        .with_context(|| format!("invalid file pattern: {pattern}"))
}

/// List the immediate children of `source_root` selected by `rule`, sorted by
/// file name, as job descriptors targeting `output_root`.
///
/// A missing, non-directory or unreadable source root is a configuration
/// error; it is reported before any job is created.
pub fn select_jobs(
    fs: &dyn FileSystem,
    source_root: &Path,
    output_root: &Path,
    rule: &SelectionRule,
) -> crate::errors::Result<Vec<JobDescriptor>> {
    if !fs.is_dir(source_root) {
        return Err(RendermillError::config_path(
            "source directory",
            source_root,
            "missing or not a directory",
        ));
    }

    let entries = fs.list_children(source_root).map_err(|e| {
        RendermillError::config_path("cannot list source directory", source_root, format!("{e:#}"))
    })?;

    let selected: Vec<_> = entries
        .into_iter()
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| rule.matches(name))
        })
        .collect();

    debug!(
        root = %source_root.display(),
        selected = selected.len(),
        ?rule,
        "selected render roots"
    );

    Ok(selected
        .into_iter()
        .map(|input| JobDescriptor::new(source_root, output_root, input))
        .collect())
}
