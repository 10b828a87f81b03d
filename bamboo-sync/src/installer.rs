//! Download-and-install transaction.
//!
//! ## `install` protocol
//!
//! 1. Build the artifact URL from server, plan, build and artifact path.
//! 2. GET it; a non-2xx status aborts before anything is written.
//! 3. Stream the body into `<path>.tmp` in fixed-size chunks.
//! 4. Save the metadata record for the build about to become current.
//! 5. Rename `<path>.tmp` onto `<path>` (atomic on POSIX).
//!
//! A failure in any step removes `<path>.tmp` before the error is returned,
//! and `<path>` itself is only ever touched by step 5.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use bamboo_core::{ArtifactSpec, PlanKey, ServerUrl};

use crate::error::{io_err, SyncError};
use crate::http::HttpClient;
use crate::meta_store::{self, LocalMetadata};

const CHUNK_SIZE: usize = 64 * 1024;

/// Outcome of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installed {
    pub path: PathBuf,
    pub build: u64,
    pub bytes: u64,
    pub metadata: LocalMetadata,
}

/// `{server}/browse/{plan}-{build}/artifact/{artifact_path}`
pub fn artifact_url(server: &ServerUrl, plan: &PlanKey, build: u64, artifact_path: &str) -> String {
    server.endpoint(&format!(
        "browse/{plan}-{build}/artifact/{}",
        artifact_path.trim_start_matches('/')
    ))
}

/// Download build `build` of the artifact described by `spec` and install it
/// at `spec.path`, recording the new metadata.
pub fn install<C: HttpClient + ?Sized>(
    client: &C,
    spec: &ArtifactSpec,
    build: u64,
) -> Result<Installed, SyncError> {
    let tmp = spec.temp_file();
    let result = download_and_install(client, spec, build, &tmp);
    if result.is_err() && tmp.exists() {
        if let Err(e) = std::fs::remove_file(&tmp) {
            tracing::warn!("could not remove {}: {e}", tmp.display());
        }
    }
    result
}

fn download_and_install<C: HttpClient + ?Sized>(
    client: &C,
    spec: &ArtifactSpec,
    build: u64,
    tmp: &Path,
) -> Result<Installed, SyncError> {
    let url = artifact_url(&spec.server, &spec.plan, build, &spec.artifact_path);
    tracing::info!("will download {url}");

    let response = client.get(&url)?;
    if !response.is_success() {
        return Err(response.into_remote_error(&url));
    }

    let bytes = stream_to_file(&url, response.body, tmp)?;

    let metadata = LocalMetadata::from_spec(spec, build);
    meta_store::save(&spec.path, &metadata)?;

    std::fs::rename(tmp, &spec.path).map_err(|e| io_err(&spec.path, e))?;

    tracing::info!(
        "installed build {build} of {} at {} ({bytes} bytes)",
        spec.plan,
        spec.path.display()
    );
    Ok(Installed {
        path: spec.path.clone(),
        build,
        bytes,
        metadata,
    })
}

/// Copy `body` into `dest`, distinguishing network read errors from local
/// write errors.
fn stream_to_file(url: &str, mut body: impl Read, dest: &Path) -> Result<u64, SyncError> {
    let file = File::create(dest).map_err(|e| io_err(dest, e))?;
    let mut writer = BufWriter::new(file);
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let n = match body.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(SyncError::Transport {
                    url: url.to_string(),
                    source: Box::new(e),
                })
            }
        };
        writer.write_all(&buf[..n]).map_err(|e| io_err(dest, e))?;
        total += n as u64;
    }

    let file = writer
        .into_inner()
        .map_err(|e| io_err(dest, e.into_error()))?;
    file.sync_all().map_err(|e| io_err(dest, e))?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::fake::FakeClient;
    use bamboo_core::{BuildSelector, Ensure};
    use std::fs;
    use tempfile::TempDir;

    const DOWNLOAD: &str = "http://ci/browse/REL-42/artifact/shared/app.jar";

    fn spec_at(dir: &Path) -> ArtifactSpec {
        ArtifactSpec {
            ensure: Ensure::Present,
            path: dir.join("app.jar"),
            server: ServerUrl::from("http://ci"),
            plan: PlanKey::from("REL"),
            build: BuildSelector::Latest,
            artifact_path: "shared/app.jar".to_string(),
            user: None,
        }
    }

    #[test]
    fn url_follows_browse_layout() {
        let url = artifact_url(&ServerUrl::from("http://ci"), &PlanKey::from("REL"), 42, "/shared/app.jar");
        assert_eq!(url, DOWNLOAD);
    }

    #[test]
    fn install_writes_target_and_metadata() {
        let tmp = TempDir::new().unwrap();
        let spec = spec_at(tmp.path());
        let client = FakeClient::new().reply(DOWNLOAD, 200, b"jar-bytes".to_vec());

        let installed = install(&client, &spec, 42).unwrap();
        assert_eq!(installed.build, 42);
        assert_eq!(installed.bytes, 9);
        assert_eq!(fs::read(&spec.path).unwrap(), b"jar-bytes");
        assert_eq!(meta_store::load(&spec.path).build, Some(42));
        assert!(!spec.temp_file().exists());
    }

    #[test]
    fn not_found_leaves_target_untouched() {
        let tmp = TempDir::new().unwrap();
        let spec = spec_at(tmp.path());
        fs::write(&spec.path, b"old").unwrap();
        let client = FakeClient::new();

        let err = install(&client, &spec, 42).unwrap_err();
        match err {
            SyncError::Remote { url, status, .. } => {
                assert_eq!(url, DOWNLOAD);
                assert_eq!(status, 404);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fs::read(&spec.path).unwrap(), b"old");
        assert!(!spec.temp_file().exists());
        assert!(meta_store::load(&spec.path).is_empty());
    }

    #[test]
    fn truncated_stream_cleans_tmp_and_keeps_target() {
        let tmp = TempDir::new().unwrap();
        let spec = spec_at(tmp.path());
        fs::write(&spec.path, b"previous build").unwrap();
        let client = FakeClient::new().truncated(DOWNLOAD, vec![7u8; 3 * CHUNK_SIZE / 2]);

        let err = install(&client, &spec, 42).unwrap_err();
        assert!(matches!(err, SyncError::Transport { .. }), "got: {err}");
        assert_eq!(fs::read(&spec.path).unwrap(), b"previous build");
        assert!(!spec.temp_file().exists(), ".tmp must be cleaned up");
        assert!(meta_store::load(&spec.path).is_empty());
    }

    #[test]
    fn stale_tmp_from_crashed_run_is_removed_on_failure() {
        let tmp = TempDir::new().unwrap();
        let spec = spec_at(tmp.path());
        fs::write(spec.temp_file(), b"CRASH - INCOMPLETE WRITE").unwrap();
        let client = FakeClient::new().unreachable(DOWNLOAD);

        install(&client, &spec, 42).unwrap_err();
        assert!(!spec.temp_file().exists());
        assert!(!spec.path.exists());
    }

    #[test]
    #[cfg(unix)]
    fn metadata_failure_prevents_rename() {
        let tmp = TempDir::new().unwrap();
        let spec = spec_at(tmp.path());
        fs::write(&spec.path, b"old").unwrap();
        // A directory squatting on the metadata path makes the rename fail.
        fs::create_dir(spec.meta_file()).unwrap();
        fs::write(spec.meta_file().join("keep"), b"x").unwrap();
        let client = FakeClient::new().reply(DOWNLOAD, 200, b"new".to_vec());

        let err = install(&client, &spec, 42).unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }), "got: {err}");
        assert_eq!(fs::read(&spec.path).unwrap(), b"old");
        assert!(!spec.temp_file().exists());
    }
}
