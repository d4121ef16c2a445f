// src/distribution/local.rs

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::config::ConfigFile;
use crate::distribution::archive::extract_archive;
use crate::distribution::download::download_to;
use crate::distribution::{DistributionProvider, EXTRACTED_DIR_NAME};
use crate::errors::{Result, RendermillError};
use crate::types::CachePolicy;

/// Marker written into an extracted installation, holding its version.
pub const VERSION_MARKER: &str = ".rendermill-version";

/// Filesystem- and HTTP-backed distribution provider.
///
/// Lookup order for [`acquire`](DistributionProvider::acquire):
///
/// 1. `home`, used as-is.
/// 2. `<temp_dir>/dita_distribution` if it was extracted for the same version.
/// 3. An archive: `archive` if configured, else the cached copy, else a
///    download of `download_url` (`$version` substituted). With
///    [`CachePolicy::Cache`] a downloaded archive is copied into the cache.
/// 4. The archive is extracted into `<temp_dir>/dita_distribution`.
#[derive(Debug, Clone)]
pub struct LocalDistributionProvider {
    home: Option<PathBuf>,
    temp_dir: PathBuf,
    cache_dir: Option<PathBuf>,
    archive: Option<PathBuf>,
    download_url: String,
}

impl LocalDistributionProvider {
    pub fn new(temp_dir: impl Into<PathBuf>, download_url: impl Into<String>) -> Self {
        Self {
            home: None,
            temp_dir: temp_dir.into(),
            cache_dir: None,
            archive: None,
            download_url: download_url.into(),
        }
    }

    pub fn from_config(cfg: &ConfigFile) -> Self {
        let dist = cfg.distribution();
        Self {
            home: dist.home.clone(),
            temp_dir: cfg.render().temp_dir.clone(),
            cache_dir: dist.cache_dir.clone().or_else(default_cache_dir),
            archive: dist.archive.clone(),
            download_url: dist.download_url.clone(),
        }
    }

    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(cache_dir.into());
        self
    }

    pub fn with_archive(mut self, archive: impl Into<PathBuf>) -> Self {
        self.archive = Some(archive.into());
        self
    }

    pub fn extracted_dir(&self) -> PathBuf {
        self.temp_dir.join(EXTRACTED_DIR_NAME)
    }

    /// Location of the cached archive for `version`, if a cache is configured.
    pub fn cached_archive(&self, version: &str) -> Option<PathBuf> {
        self.cache_dir.as_ref().map(|dir| {
            dir.join("dita-distribution")
                .join(version)
                .join(format!("dita-distribution-{version}.zip"))
        })
    }

    async fn acquire_inner(&self, version: &str, policy: CachePolicy) -> anyhow::Result<PathBuf> {
        if let Some(home) = &self.home {
            anyhow::ensure!(
                home.join("bin").is_dir(),
                "{} is not an engine installation (no bin directory)",
                home.display()
            );
            debug!(home = %home.display(), "using configured installation");
            return Ok(home.clone());
        }

        let extracted = self.extracted_dir();
        if installed_version(&extracted).as_deref() == Some(version) {
            debug!(dir = %extracted.display(), "reusing extracted installation");
            return Ok(extracted);
        }

        let archive = self.locate_archive(version, policy).await?;

        let destination = extracted.clone();
        let marker_version = version.to_string();
        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            extract_archive(&archive, &destination, true)?;
            std::fs::write(destination.join(VERSION_MARKER), marker_version)
                .with_context(|| format!("writing version marker in {:?}", destination))?;
            Ok(())
        })
        .await
        .context("extraction task failed")??;

        Ok(extracted)
    }

    async fn locate_archive(&self, version: &str, policy: CachePolicy) -> anyhow::Result<PathBuf> {
        if let Some(archive) = &self.archive {
            anyhow::ensure!(
                archive.is_file(),
                "distribution archive {} does not exist",
                archive.display()
            );
            return Ok(archive.clone());
        }

        let cached = self.cached_archive(version);
        if let Some(cached) = cached.as_ref().filter(|p| p.is_file()) {
            info!(archive = %cached.display(), "using cached distribution");
            return Ok(cached.clone());
        }

        let url = self.download_url.replace("$version", version);
        let downloaded = self.temp_dir.join(format!("{EXTRACTED_DIR_NAME}.zip"));
        download_to(&url, &downloaded).await?;

        if policy == CachePolicy::Cache {
            if let Some(cached) = cached {
                if let Err(e) = store_in_cache(&downloaded, &cached).await {
                    warn!(cache = %cached.display(), error = %e, "failed to cache distribution");
                }
            }
        }

        Ok(downloaded)
    }
}

impl DistributionProvider for LocalDistributionProvider {
    fn acquire<'a>(
        &'a self,
        version: &'a str,
        policy: CachePolicy,
    ) -> Pin<Box<dyn Future<Output = Result<PathBuf>> + Send + 'a>> {
        Box::pin(async move {
            self.acquire_inner(version, policy)
                .await
                .map_err(|e| RendermillError::DistributionError(format!("{e:#}")))
        })
    }
}

/// Version recorded in an extracted installation, if any.
pub fn installed_version(dir: &Path) -> Option<String> {
    std::fs::read_to_string(dir.join(VERSION_MARKER))
        .ok()
        .map(|s| s.trim().to_string())
}

async fn store_in_cache(archive: &Path, cached: &Path) -> anyhow::Result<()> {
    if cached.exists() {
        return Ok(());
    }
    if let Some(parent) = cached.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::copy(archive, cached).await?;
    info!(cache = %cached.display(), "stored distribution in cache");
    Ok(())
}

fn default_cache_dir() -> Option<PathBuf> {
    std::env::var_os("RENDERMILL_CACHE")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache").join("rendermill")))
}
