//! Fetching and decoding model files.
//!
//! Natively models are read from the asset root on disk, in the browser they
//! are fetched relative to the page origin. Every requested path produces
//! exactly one [`LoadOutcome`], delivered in completion order, so the caller
//! can tell when the whole assembly has been accounted for.

use anyhow::Context as _;
use futures::{StreamExt, stream::FuturesUnordered};

use crate::resources::stl::StlGeometry;

pub mod mesh;
pub mod stl;

/// Result of loading one model.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded { path: String, geometry: StlGeometry },
    Failed { path: String, reason: String },
}

impl LoadOutcome {
    pub fn path(&self) -> &str {
        match self {
            LoadOutcome::Loaded { path, .. } | LoadOutcome::Failed { path, .. } => path,
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn format_url(asset_root: &str, file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().context("no window")?;
    let origin = window
        .location()
        .origin()
        .map_err(|e| anyhow::anyhow!("page origin unavailable: {:?}", e))?;
    let base = reqwest::Url::parse(&format!("{}/{}/", origin, asset_root.trim_matches('/')))?;
    Ok(base.join(file_name)?)
}

pub async fn load_binary(asset_root: &str, file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(asset_root, file_name)?;
        reqwest::get(url.clone())
            .await?
            .error_for_status()
            .with_context(|| format!("fetching {url}"))?
            .bytes()
            .await?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new(asset_root).join(file_name);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?
    };

    Ok(data)
}

pub async fn load_model(asset_root: &str, file_name: &str) -> anyhow::Result<StlGeometry> {
    let data = load_binary(asset_root, file_name).await?;
    stl::parse_stl(&data).with_context(|| format!("decoding {file_name}"))
}

/// Loads all `paths` concurrently and hands each outcome to `sink` as soon as
/// it is known.
///
/// Returns the number of outcomes delivered, which always equals
/// `paths.len()`.
pub async fn load_models<F>(asset_root: &str, paths: &[String], mut sink: F) -> usize
where
    F: FnMut(LoadOutcome),
{
    let mut pending: FuturesUnordered<_> = paths
        .iter()
        .map(|path| async move {
            match load_model(asset_root, path).await {
                Ok(geometry) => LoadOutcome::Loaded {
                    path: path.clone(),
                    geometry,
                },
                Err(e) => LoadOutcome::Failed {
                    path: path.clone(),
                    reason: format!("{e:#}"),
                },
            }
        })
        .collect();

    let mut delivered = 0;
    while let Some(outcome) = pending.next().await {
        match &outcome {
            LoadOutcome::Loaded { path, geometry } => {
                log::debug!("{} loaded, {} triangles", path, geometry.triangle_count())
            }
            LoadOutcome::Failed { path, reason } => log::warn!("{path} failed to load: {reason}"),
        }
        sink(outcome);
        delivered += 1;
    }
    delivered
}
