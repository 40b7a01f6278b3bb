//! Edge Cache Storage
//!
//! Named cache generations persisted on disk. Each generation is a directory;
//! each stored response is a metadata file plus a body file named by the
//! SHA-256 of its request key.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use uuid::Uuid;

use crate::error::Result;
use crate::fetch::FetchedResource;

const META_EXT: &str = "json";
const BODY_EXT: &str = "body";
const TMP_EXT: &str = "tmp";

#[derive(Debug, Serialize, Deserialize)]
struct StoredMeta {
    request: String,
    status: u16,
    content_type: Option<String>,
}

// == Cache Storage ==
/// Root of all cache generations.
#[derive(Debug, Clone)]
pub struct CacheStorage {
    root: PathBuf,
}

impl CacheStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Opens a generation, creating it if missing.
    pub async fn open(&self, name: &str) -> Result<CacheGeneration> {
        let dir = self.root.join(name);
        fs::create_dir_all(&dir).await?;
        Ok(CacheGeneration {
            name: name.to_string(),
            dir,
        })
    }

    /// Names of all generations on disk, sorted.
    pub async fn keys(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(names),
            Err(err) => return Err(err.into()),
        };
        while let Some(entry) = dir.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Deletes a generation; false if it did not exist.
    pub async fn delete(&self, name: &str) -> Result<bool> {
        match fs::remove_dir_all(self.root.join(name)).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

// == Cache Generation ==
/// One named generation of stored responses.
#[derive(Debug, Clone)]
pub struct CacheGeneration {
    name: String,
    dir: PathBuf,
}

impl CacheGeneration {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stored response for `request`, if any.
    ///
    /// A half-written entry (metadata without body) counts as a miss.
    pub async fn match_request(&self, request: &str) -> Result<Option<FetchedResource>> {
        let (meta_path, body_path) = self.paths(request);
        let meta = match fs::read(&meta_path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let meta: StoredMeta = serde_json::from_slice(&meta)?;
        let body = match fs::read(&body_path).await {
            Ok(body) => body,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(FetchedResource::new(
            meta.status,
            meta.content_type.as_deref(),
            body,
        )))
    }

    /// Stores `resource` as the response for `request`.
    ///
    /// Both files are written under unique temporary names and renamed into
    /// place, body first and metadata last. Readers therefore see either no
    /// entry or a complete one, even with concurrent writers.
    pub async fn put(&self, request: &str, resource: &FetchedResource) -> Result<()> {
        let (meta_path, body_path) = self.paths(request);
        let meta = StoredMeta {
            request: request.to_string(),
            status: resource.status,
            content_type: resource.content_type.clone(),
        };

        write_atomic(&body_path, &resource.body).await?;
        write_atomic(&meta_path, &serde_json::to_vec(&meta)?).await?;
        Ok(())
    }

    /// Request keys currently stored.
    pub async fn keys(&self) -> Result<Vec<String>> {
        let mut requests = Vec::new();
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(requests),
            Err(err) => return Err(err.into()),
        };
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(META_EXT) {
                continue;
            }
            let meta: StoredMeta = serde_json::from_slice(&fs::read(&path).await?)?;
            requests.push(meta.request);
        }
        requests.sort();
        Ok(requests)
    }

    pub async fn len(&self) -> Result<usize> {
        Ok(self.keys().await?.len())
    }

    /// Removes every stored response, keeping the generation itself.
    pub async fn clear(&self) -> Result<usize> {
        let count = self.len().await?;
        match fs::remove_dir_all(&self.dir).await {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        fs::create_dir_all(&self.dir).await?;
        Ok(count)
    }

    fn paths(&self, request: &str) -> (PathBuf, PathBuf) {
        let stem = hash_request(request);
        (
            self.dir.join(format!("{stem}.{META_EXT}")),
            self.dir.join(format!("{stem}.{BODY_EXT}")),
        )
    }
}

async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp = tmp_path(path);
    if let Err(err) = fs::write(&tmp, contents).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(err.into());
    }
    if let Err(err) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(err.into());
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(".{}.{TMP_EXT}", Uuid::new_v4().simple()));
    path.with_file_name(name)
}

fn hash_request(request: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request.as_bytes());
    hex::encode(hasher.finalize())
}
