// tests/distribution.rs

mod common;
use crate::common::init_tracing;

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::FileOptions;
use zip::ZipWriter;

use rendermill::distribution::archive::extract_archive;
use rendermill::distribution::local::{installed_version, VERSION_MARKER};
use rendermill::distribution::{DistributionProvider, LocalDistributionProvider};
use rendermill::errors::RendermillError;
use rendermill::types::CachePolicy;

const UNREACHABLE_URL: &str = "http://127.0.0.1:9/dita-ot-$version.zip";

/// Write a distribution-shaped archive: everything under one top-level
/// directory, with an executable launcher.
fn write_distribution(path: &Path, root: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut zip = ZipWriter::new(File::create(path).unwrap());

    zip.add_directory(format!("{root}/"), FileOptions::default())
        .unwrap();
    zip.add_directory(format!("{root}/bin/"), FileOptions::default())
        .unwrap();
    zip.start_file(
        format!("{root}/bin/dita"),
        FileOptions::default().unix_permissions(0o755),
    )
    .unwrap();
    zip.write_all(b"#!/bin/sh\nexit 0\n").unwrap();
    zip.start_file(format!("{root}/lib/dost.jar"), FileOptions::default())
        .unwrap();
    zip.write_all(b"jar").unwrap();

    zip.finish().unwrap();
}

fn partial_dir(destination: &Path) -> PathBuf {
    let mut name = destination.file_name().unwrap().to_os_string();
    name.push(".partial");
    destination.with_file_name(name)
}

#[test]
fn extraction_strips_the_top_level_directory() {
    init_tracing();

    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("dist.zip");
    write_distribution(&archive, "dita-ot-3.0.2");
    let dest = tmp.path().join("dita_distribution");

    extract_archive(&archive, &dest, true).unwrap();

    assert!(dest.join("bin/dita").is_file());
    assert_eq!(fs::read(dest.join("lib/dost.jar")).unwrap(), b"jar");
    assert!(!dest.join("dita-ot-3.0.2").exists());
    assert!(!partial_dir(&dest).exists());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(dest.join("bin/dita")).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111, "launcher must stay executable");
    }
}

#[test]
fn extraction_without_stripping_keeps_the_layout() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("dist.zip");
    write_distribution(&archive, "dita-ot");
    let dest = tmp.path().join("unpacked");

    extract_archive(&archive, &dest, false).unwrap();

    assert!(dest.join("dita-ot/bin/dita").is_file());
}

#[test]
fn extraction_replaces_a_previous_installation() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("dist.zip");
    write_distribution(&archive, "dita-ot");
    let dest = tmp.path().join("dita_distribution");
    fs::create_dir_all(&dest).unwrap();
    fs::write(dest.join("stale.txt"), "old").unwrap();

    extract_archive(&archive, &dest, true).unwrap();

    assert!(!dest.join("stale.txt").exists());
    assert!(dest.join("bin/dita").is_file());
}

#[test]
fn corrupt_archive_leaves_no_installation() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("dist.zip");
    fs::write(&archive, "definitely not a zip").unwrap();
    let dest = tmp.path().join("dita_distribution");

    let err = extract_archive(&archive, &dest, true).unwrap_err();

    assert!(format!("{err:#}").contains("dist.zip"));
    assert!(!dest.exists());
    assert!(!partial_dir(&dest).exists());
}

#[tokio::test]
async fn configured_home_is_used_as_is() {
    let tmp = tempfile::tempdir().unwrap();
    let home = tmp.path().join("dita-ot");
    fs::create_dir_all(home.join("bin")).unwrap();

    let provider = LocalDistributionProvider::new(tmp.path().join("temp"), UNREACHABLE_URL)
        .with_home(&home);
    let dir = provider.acquire("3.0.2", CachePolicy::Cache).await.unwrap();

    assert_eq!(dir, home);
    assert!(!provider.extracted_dir().exists());
}

#[tokio::test]
async fn home_without_launcher_directory_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();

    let provider = LocalDistributionProvider::new(tmp.path().join("temp"), UNREACHABLE_URL)
        .with_home(tmp.path().join("missing"));
    let err = provider.acquire("3.0.2", CachePolicy::Cache).await.unwrap_err();

    assert!(matches!(err, RendermillError::DistributionError(_)), "got {err:?}");
}

#[tokio::test]
async fn local_archive_is_extracted_once_per_version() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("dita-ot.zip");
    write_distribution(&archive, "dita-ot-3.0.2");

    let provider = LocalDistributionProvider::new(tmp.path().join("temp"), UNREACHABLE_URL)
        .with_archive(&archive);
    let dir = provider.acquire("3.0.2", CachePolicy::Cache).await.unwrap();

    assert_eq!(dir, tmp.path().join("temp/dita_distribution"));
    assert!(dir.join("bin/dita").is_file());
    assert_eq!(installed_version(&dir).as_deref(), Some("3.0.2"));
    assert!(dir.join(VERSION_MARKER).is_file());

    // The extracted copy is reused even when the archive is gone.
    fs::remove_file(&archive).unwrap();
    let again = provider.acquire("3.0.2", CachePolicy::Cache).await.unwrap();
    assert_eq!(again, dir);

    // A different version needs the archive again.
    let err = provider.acquire("4.0", CachePolicy::Cache).await.unwrap_err();
    assert!(matches!(err, RendermillError::DistributionError(_)));
}

#[tokio::test]
async fn cached_archive_is_preferred_over_downloading() {
    let tmp = tempfile::tempdir().unwrap();
    let provider = LocalDistributionProvider::new(tmp.path().join("temp"), UNREACHABLE_URL)
        .with_cache_dir(tmp.path().join("cache"));

    let cached = provider.cached_archive("3.0.2").unwrap();
    assert_eq!(
        cached,
        tmp.path()
            .join("cache/dita-distribution/3.0.2/dita-distribution-3.0.2.zip")
    );
    write_distribution(&cached, "dita-ot-3.0.2");

    let dir = provider
        .acquire("3.0.2", CachePolicy::ReadOnly)
        .await
        .unwrap();

    assert!(dir.join("bin/dita").is_file());
    assert_eq!(installed_version(&dir).as_deref(), Some("3.0.2"));
}

#[tokio::test]
async fn failed_download_is_a_distribution_error() {
    let tmp = tempfile::tempdir().unwrap();
    let provider = LocalDistributionProvider::new(tmp.path().join("temp"), UNREACHABLE_URL)
        .with_cache_dir(tmp.path().join("cache"));

    let err = provider.acquire("3.0.2", CachePolicy::Cache).await.unwrap_err();

    match err {
        RendermillError::DistributionError(msg) => {
            assert!(msg.contains("127.0.0.1:9/dita-ot-3.0.2.zip"), "{msg}")
        }
        other => panic!("expected a distribution error, got {other:?}"),
    }
    assert!(!provider.cached_archive("3.0.2").unwrap().exists());
}
