// src/distribution/archive.rs

use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;
use zip::ZipArchive;

/// Extract `archive` into `destination`.
///
/// With `strip_root`, the first path component of every entry is dropped, so
/// `dita-ot-3.0.2/bin/dita` lands at `<destination>/bin/dita`. Entries that
/// would escape `destination` are skipped. Unix permissions stored in the
/// archive are restored, which keeps the launcher executable.
///
/// The archive is first unpacked next to `destination` and renamed into place
/// once complete, so an interrupted extraction is never mistaken for a usable
/// installation.
pub fn extract_archive(archive: &Path, destination: &Path, strip_root: bool) -> Result<()> {
    info!(
        "Extracting '{}' to '{}'",
        archive.display(),
        destination.display()
    );

    let staging = staging_dir(destination);
    if staging.exists() {
        fs::remove_dir_all(&staging)
            .with_context(|| format!("removing stale staging dir {:?}", staging))?;
    }
    fs::create_dir_all(&staging).with_context(|| format!("creating dir {:?}", staging))?;

    if let Err(e) = unpack(archive, &staging, strip_root) {
        let _ = fs::remove_dir_all(&staging);
        return Err(e);
    }

    if destination.exists() {
        fs::remove_dir_all(destination)
            .with_context(|| format!("removing previous installation {:?}", destination))?;
    }
    fs::rename(&staging, destination)
        .with_context(|| format!("moving {:?} to {:?}", staging, destination))?;

    Ok(())
}

fn unpack(archive: &Path, staging: &Path, strip_root: bool) -> Result<()> {
    let file = File::open(archive).with_context(|| format!("opening archive {:?}", archive))?;
    let mut zip = ZipArchive::new(file).with_context(|| format!("reading archive {:?}", archive))?;

    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .with_context(|| format!("reading entry {index} of {:?}", archive))?;

        let Some(relative) = entry.enclosed_name().map(|p| entry_path(p, strip_root)) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }

        let target = staging.join(&relative);
        if entry.is_dir() {
            fs::create_dir_all(&target).with_context(|| format!("creating dir {:?}", target))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        let mut out =
            File::create(&target).with_context(|| format!("creating file {:?}", target))?;
        io::copy(&mut entry, &mut out).with_context(|| format!("writing file {:?}", target))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode))
                .with_context(|| format!("setting permissions on {:?}", target))?;
        }
    }
    Ok(())
}

fn entry_path(path: &Path, strip_root: bool) -> PathBuf {
    let components = path
        .components()
        .filter(|c| matches!(c, Component::Normal(_)));
    if strip_root {
        components.skip(1).collect()
    } else {
        components.collect()
    }
}

fn staging_dir(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    destination.with_file_name(name)
}
