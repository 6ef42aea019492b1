//! On-disk cache for profile pictures and inline images.
//!
//! Each asset is keyed by its remote identifier and stored under a file name
//! derived from that identifier only, so a file written by an earlier run is
//! reused without a request. Every identifier is fetched at most once per run,
//! failures included.
//!
//! The cache is owned by a single exporter and mutated through `&mut self`.
//! Fetching in parallel would need a per-identifier lock so the first writer
//! wins.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::domain::{AppError, Result};
use crate::infrastructure::{GraphClient, Transport};

/// Extensions an asset can be stored under. `bin` catches unknown formats.
const EXTENSIONS: &[&str] = &["jpg", "png", "gif", "webp", "bmp", "bin"];

/// Remote id → local file cache.
pub struct AssetCache {
    dir: PathBuf,
    resolved: HashMap<String, Option<PathBuf>>,
}

impl AssetCache {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            resolved: HashMap::new(),
        }
    }

    /// Profile picture of `user_id`, or `None` if the user has none.
    pub async fn get_asset<T: Transport>(
        &mut self,
        client: &GraphClient<T>,
        user_id: &str,
    ) -> Option<PathBuf> {
        let key = format!("avatar:{user_id}");
        let stem = format!("avatar-{}", file_stem(user_id));

        if let Some(known) = self.lookup(&key, &stem) {
            return known;
        }

        let fetched = client.profile_photo(user_id).await;
        self.store(key, &stem, fetched)
    }

    /// Local copy of the inline image at `url`.
    pub async fn get_embedded_image<T: Transport>(
        &mut self,
        client: &GraphClient<T>,
        url: &str,
    ) -> Option<PathBuf> {
        let key = format!("image:{url}");
        let stem = format!("image-{}", &sha256_hex(url)[..32]);

        if let Some(known) = self.lookup(&key, &stem) {
            return known;
        }

        let fetched = client.download(url).await;
        self.store(key, &stem, fetched)
    }

    /// Outcome already known this run, or a file left by an earlier run.
    fn lookup(&mut self, key: &str, stem: &str) -> Option<Option<PathBuf>> {
        if let Some(known) = self.resolved.get(key) {
            return Some(known.clone());
        }

        let existing = EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{stem}.{ext}")))
            .find(|path| path.is_file())?;

        tracing::debug!("Asset cache hit: {}", existing.display());
        self.resolved.insert(key.to_string(), Some(existing.clone()));
        Some(Some(existing))
    }

    fn store(&mut self, key: String, stem: &str, fetched: Result<Vec<u8>>) -> Option<PathBuf> {
        let outcome = match fetched.and_then(|bytes| self.write(stem, &bytes)) {
            Ok(path) => {
                tracing::debug!("Cached {} as {}", key, path.display());
                Some(path)
            }
            Err(AppError::RemoteFetch { status: 404, .. }) => {
                tracing::debug!("No remote asset for {}", key);
                None
            }
            Err(e) => {
                tracing::warn!("Failed to cache {}: {}", key, e);
                None
            }
        };

        self.resolved.insert(key, outcome.clone());
        outcome
    }

    fn write(&self, stem: &str, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| AppError::io("Failed to create assets directory", e))?;

        let ext = infer::get(bytes)
            .map(|kind| kind.extension())
            .filter(|ext| EXTENSIONS.contains(ext))
            .unwrap_or("bin");
        let path = self.dir.join(format!("{stem}.{ext}"));

        let mut tmp = NamedTempFile::new_in(&self.dir)
            .map_err(|e| AppError::io("Failed to create temporary asset file", e))?;
        tmp.write_all(bytes)
            .map_err(|e| AppError::io("Failed to write asset", e))?;

        match tmp.persist_noclobber(&path) {
            Ok(_) => Ok(path),
            // Someone else wrote it first; theirs stays.
            Err(_) if path.is_file() => Ok(path),
            Err(e) => Err(AppError::io(
                format!("Failed to persist {}", path.display()),
                e.error,
            )),
        }
    }
}

/// Link to a cached asset relative to the exported documents.
#[must_use]
pub fn asset_href(path: &Path) -> String {
    path.file_name().map_or_else(String::new, |name| {
        format!("assets/{}", name.to_string_lossy())
    })
}

/// Identifier usable as a file name; anything else is replaced by its hash.
fn file_stem(remote_id: &str) -> String {
    let safe = !remote_id.is_empty()
        && remote_id.len() <= 64
        && remote_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if safe {
        remote_id.to_string()
    } else {
        sha256_hex(remote_id)[..32].to_string()
    }
}

pub(crate) fn sha256_hex(value: &str) -> String {
    Sha256::digest(value.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::transport::fake::FakeTransport;
    use tempfile::tempdir;

    const BASE: &str = "https://graph.test/v1.0";
    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn photo_url(user: &str) -> String {
        format!("{BASE}/users/{user}/photo/$value")
    }

    #[tokio::test]
    async fn test_second_call_does_not_fetch() {
        let dir = tempdir().unwrap();
        let transport = FakeTransport::new().bytes(&photo_url("u1"), PNG);
        let client = GraphClient::new(transport, BASE, 50).unwrap();
        let mut cache = AssetCache::new(dir.path().join("assets"));

        let first = cache.get_asset(&client, "u1").await.unwrap();
        let second = cache.get_asset(&client, "u1").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.extension().unwrap(), "png");
        assert_eq!(client.transport().calls(&photo_url("u1")), 1);
    }

    #[tokio::test]
    async fn test_existing_file_is_reused_across_runs() {
        let dir = tempdir().unwrap();
        let assets = dir.path().join("assets");
        fs::create_dir_all(&assets).unwrap();
        fs::write(assets.join("avatar-u1.jpg"), b"old").unwrap();

        let client = GraphClient::new(FakeTransport::new(), BASE, 50).unwrap();
        let mut cache = AssetCache::new(&assets);

        let path = cache.get_asset(&client, "u1").await.unwrap();
        assert_eq!(path, assets.join("avatar-u1.jpg"));
        assert_eq!(client.transport().total_calls(), 0);
        assert_eq!(fs::read(&path).unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_failed_fetch_is_attempted_once() {
        let dir = tempdir().unwrap();
        let transport = FakeTransport::new().status(&photo_url("u2"), 404);
        let client = GraphClient::new(transport, BASE, 50).unwrap();
        let mut cache = AssetCache::new(dir.path().join("assets"));

        assert!(cache.get_asset(&client, "u2").await.is_none());
        assert!(cache.get_asset(&client, "u2").await.is_none());
        assert_eq!(client.transport().calls(&photo_url("u2")), 1);
    }

    #[tokio::test]
    async fn test_embedded_image_cached_by_url() {
        let dir = tempdir().unwrap();
        let url = format!("{BASE}/chats/c1/messages/m1/hostedContents/aWQ=/$value");
        let transport = FakeTransport::new().bytes(&url, b"not an image");
        let client = GraphClient::new(transport, BASE, 50).unwrap();
        let mut cache = AssetCache::new(dir.path().join("assets"));

        let first = cache.get_embedded_image(&client, &url).await.unwrap();
        let second = cache.get_embedded_image(&client, &url).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.extension().unwrap(), "bin");
        assert!(first.file_name().unwrap().to_string_lossy().starts_with("image-"));
        assert_eq!(client.transport().calls(&url), 1);
    }

    #[test]
    fn test_file_stem_hashes_unsafe_ids() {
        assert_eq!(file_stem("8a1c-44_ff"), "8a1c-44_ff");
        let hashed = file_stem("../etc/passwd");
        assert_eq!(hashed.len(), 32);
        assert!(hashed.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hashed, file_stem("../etc/passwd"));
    }

    #[test]
    fn test_asset_href() {
        assert_eq!(asset_href(Path::new("/out/assets/avatar-u1.png")), "assets/avatar-u1.png");
    }
}
