//! Policy store backed by local JSON files; the resource name is the file path.
//!
//! Writes hold an exclusive advisory lock on a `<file>.lock` sidecar while they
//! re-read the etag on disk, and replace the policy file with a renamed temp
//! file, so readers never observe a partial document.

use async_trait::async_trait;
use fs2::FileExt;
use iam_bindings_core::store::check_etag;
use iam_bindings_core::{Policy, PolicyStore, StoreError, StoreResult};
use log::debug;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct FilePolicyStore;

fn decode(resource: &str, read: std::io::Result<String>) -> StoreResult<Policy> {
    match read {
        Ok(contents) => Ok(serde_json::from_str(&contents)?),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("{} does not exist, starting from an empty policy", resource);
            Ok(Policy::default())
        }
        Err(e) => Err(e.into()),
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

/// Compare-and-swap of the policy file under the sidecar lock
fn write_locked(resource: &str, policy: &Policy) -> StoreResult<Policy> {
    let path = Path::new(resource);
    let lock_file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path(path))?;
    lock_file.lock_exclusive()?;

    let on_disk = decode(resource, std::fs::read_to_string(path))?;
    check_etag(&on_disk.etag, &policy.etag)?;

    let stored = policy.clone().with_etag(Uuid::new_v4().to_string());
    let mut json = serde_json::to_string_pretty(&stored)?;
    json.push('\n');

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::from(e.error))?;

    debug!("Wrote {} with etag {}", resource, stored.etag);
    // The lock is released when `lock_file` closes
    Ok(stored)
}

#[async_trait]
impl PolicyStore for FilePolicyStore {
    async fn get_policy(&self, resource: &str) -> StoreResult<Policy> {
        decode(resource, tokio::fs::read_to_string(resource).await)
    }

    async fn set_policy(&self, resource: &str, policy: &Policy) -> StoreResult<Policy> {
        let resource = resource.to_owned();
        let policy = policy.clone();
        tokio::task::spawn_blocking(move || write_locked(&resource, &policy))
            .await
            .map_err(|e| StoreError::Unavailable(format!("Policy write task failed: {e}")))?
    }
}
