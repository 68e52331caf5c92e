// Dataset location and download
//
// The point cloud of a panorama lives next to its image pyramid: the pyramid
// path segment is swapped for the point cloud one and the image name plus a
// format suffix is appended. Every suffix is probed at once; the first suffix in
// declaration order that answers wins, whatever order the answers arrive in.

use std::future::Future;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::Dataset;
use crate::error::{FetchError, OverlayResult};

/// Where a panorama's tiles come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLocation {
    /// Tile source directory of the panorama, e.g. `https://host/data/pyramid/pano_01/`
    pub tile_source_dir: String,
    pub image_name: String,
}

impl DatasetLocation {
    pub fn new(tile_source_dir: impl Into<String>, image_name: impl Into<String>) -> Self {
        Self {
            tile_source_dir: tile_source_dir.into(),
            image_name: image_name.into(),
        }
    }
}

/// Tile source path → point cloud URL rewrite rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlRewrite {
    /// Path segment replaced, along with everything after it
    pub replace_segment: String,
    pub replace_with: String,
    /// Candidate format suffixes, in preference order
    pub suffixes: Vec<String>,
}

impl Default for UrlRewrite {
    fn default() -> Self {
        Self {
            replace_segment: "/pyramid/".to_string(),
            replace_with: "/pointcloud/".to_string(),
            suffixes: vec![".json".to_string()],
        }
    }
}

impl UrlRewrite {
    /// One URL per suffix, in suffix order.
    ///
    /// When the tile source path does not contain `replace_segment`, the point
    /// cloud directory is appended to the path instead.
    pub fn candidate_urls(&self, location: &DatasetLocation) -> Vec<String> {
        let dir = &location.tile_source_dir;
        let base = match dir.find(&self.replace_segment) {
            Some(at) => format!("{}{}", &dir[..at], self.replace_with),
            None => format!("{}{}", dir.trim_end_matches('/'), self.replace_with),
        };

        self.suffixes
            .iter()
            .map(|suffix| format!("{base}{}{suffix}", location.image_name))
            .collect()
    }
}

/// Transport used to reach point cloud datasets.
pub trait DatasetFetcher {
    /// Check that `url` exists without downloading it.
    fn probe(&self, url: &str) -> impl Future<Output = Result<(), FetchError>>;

    /// Download the payload at `url`.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, FetchError>>;
}

/// Probe every candidate URL concurrently and return the first reachable one in
/// suffix order.
pub async fn resolve_dataset_url<F: DatasetFetcher>(
    fetcher: &F,
    rewrite: &UrlRewrite,
    location: &DatasetLocation,
) -> Result<String, FetchError> {
    let candidates = rewrite.candidate_urls(location);
    let results = join_all(candidates.iter().map(|url| fetcher.probe(url))).await;

    for (url, result) in candidates.iter().zip(results) {
        match result {
            Ok(()) => {
                info!("point cloud found at {}", url);
                return Ok(url.clone());
            }
            Err(e) => debug!("probe failed: {}", e),
        }
    }

    Err(FetchError::NoCandidate {
        tried: candidates.len(),
    })
}

/// Download and parse the dataset at `url`.
pub async fn fetch_dataset<F: DatasetFetcher>(fetcher: &F, url: &str) -> OverlayResult<Dataset> {
    let body = fetcher.fetch(url).await?;
    Ok(Dataset::from_json(&body)?)
}
