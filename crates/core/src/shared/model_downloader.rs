use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResourceDownloadError {
    #[error("request failed for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("download task aborted: {0}")]
    Aborted(String),
}

/// Result of fetching a single weight file.
#[derive(Debug)]
pub struct DownloadOutcome {
    pub name: String,
    pub result: Result<PathBuf, ResourceDownloadError>,
}

impl DownloadOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// A downloadable file: the name it is saved under and where it comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelResource {
    pub name: String,
    pub url: String,
}

impl ModelResource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// A resource published as `name` under `base_url`.
    pub fn under(base_url: &str, name: &str) -> Self {
        Self::new(name, resource_url(base_url, name))
    }
}

/// Joins a base location and a resource name with exactly one `/`.
pub fn resource_url(base_url: &str, name: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), name)
}

/// Fetches every resource into `dest_dir`, each saved under its name.
///
/// Downloads run concurrently and independently: one failing resource
/// never aborts the others. Outcomes are returned in input order.
pub async fn download_all(
    client: &reqwest::Client,
    resources: &[ModelResource],
    dest_dir: &Path,
) -> Vec<DownloadOutcome> {
    let handles: Vec<_> = resources
        .iter()
        .map(|resource| {
            let client = client.clone();
            let url = resource.url.clone();
            let dest = dest_dir.join(&resource.name);
            (
                resource.name.clone(),
                tokio::spawn(async move { download(&client, &url, &dest).await }),
            )
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for (name, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(ResourceDownloadError::Aborted(e.to_string())),
        };
        outcomes.push(DownloadOutcome { name, result });
    }
    outcomes
}

async fn download(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
) -> Result<PathBuf, ResourceDownloadError> {
    let http_err = |source| ResourceDownloadError::Http {
        url: url.to_string(),
        source,
    };

    let response = client.get(url).send().await.map_err(http_err)?;
    let status = response.status();
    if !status.is_success() {
        return Err(ResourceDownloadError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let bytes = response.bytes().await.map_err(http_err)?;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ResourceDownloadError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
    }

    // Write to a temp file first, then rename so a failed write never
    // leaves a truncated resource behind.
    let temp_path = part_path(dest);
    if let Err(e) = tokio::fs::write(&temp_path, &bytes).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(ResourceDownloadError::Write {
            path: temp_path,
            source: e,
        });
    }
    tokio::fs::rename(&temp_path, dest)
        .await
        .map_err(|e| ResourceDownloadError::Write {
            path: dest.to_path_buf(),
            source: e,
        })?;

    log::debug!("Saved {} bytes to {}", bytes.len(), dest.display());
    Ok(dest.to_path_buf())
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}
