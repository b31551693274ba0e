//! Static assets painted into the capture region (logo and background).
//!
//! Assets are decoded fully into memory when the region is mounted, so the
//! capture itself never waits on I/O. Remote sources are fetched with a
//! bounded timeout when the `remote-assets` feature is enabled.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::RgbaImage;

use crate::{Error, Result};

/// Conventional logo location, relative to the working directory.
pub const DEFAULT_LOGO_PATH: &str = "public/logo.png";
/// Conventional background location, relative to the working directory.
pub const DEFAULT_BACKGROUND_PATH: &str = "public/bg.jpg";

/// Where an asset is loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    File(PathBuf),
    #[cfg(feature = "remote-assets")]
    Url(url::Url),
}

impl FromStr for AssetSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.starts_with("http://") || s.starts_with("https://") {
            #[cfg(feature = "remote-assets")]
            {
                return url::Url::parse(s)
                    .map(AssetSource::Url)
                    .map_err(|e| Error::ConfigError(format!("Invalid asset URL {}: {}", s, e)));
            }
            #[cfg(not(feature = "remote-assets"))]
            {
                return Err(Error::ConfigError(format!(
                    "Remote asset {} requires the `remote-assets` feature",
                    s
                )));
            }
        }
        if s.is_empty() {
            return Err(Error::ConfigError("Empty asset path".into()));
        }
        Ok(AssetSource::File(PathBuf::from(s)))
    }
}

impl fmt::Display for AssetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetSource::File(p) => write!(f, "{}", p.display()),
            #[cfg(feature = "remote-assets")]
            AssetSource::Url(u) => write!(f, "{}", u),
        }
    }
}

/// Decoded assets available to the rasterizer.
#[derive(Clone, Default)]
pub struct AssetSet {
    pub logo: Option<RgbaImage>,
    pub background: Option<RgbaImage>,
}

impl fmt::Debug for AssetSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims = |img: &Option<RgbaImage>| img.as_ref().map(|i| i.dimensions());
        f.debug_struct("AssetSet")
            .field("logo", &dims(&self.logo))
            .field("background", &dims(&self.background))
            .finish()
    }
}

fn read_bytes(source: &AssetSource, _timeout_ms: u64) -> Result<Vec<u8>> {
    match source {
        AssetSource::File(path) => std::fs::read(path)
            .map_err(|e| Error::CaptureFailure(format!("Failed to read asset {}: {}", path.display(), e))),
        #[cfg(feature = "remote-assets")]
        AssetSource::Url(url) => {
            let client = reqwest::blocking::Client::builder()
                .timeout(std::time::Duration::from_millis(_timeout_ms))
                .build()
                .map_err(|e| Error::CaptureFailure(format!("Failed to build HTTP client: {}", e)))?;
            let resp = client
                .get(url.as_str())
                .send()
                .map_err(|e| Error::CaptureFailure(format!("Failed to fetch {}: {}", url, e)))?;
            if !resp.status().is_success() {
                return Err(Error::CaptureFailure(format!(
                    "Failed to fetch {}: HTTP {}",
                    url,
                    resp.status()
                )));
            }
            resp.bytes()
                .map(|b| b.to_vec())
                .map_err(|e| Error::CaptureFailure(format!("Failed to read {}: {}", url, e)))
        }
    }
}

/// `base/relative` as a file source, if that file exists.
pub fn default_asset(base: &Path, relative: &str) -> Option<AssetSource> {
    let path = base.join(relative);
    if path.is_file() {
        log::debug!("using default asset {}", path.display());
        Some(AssetSource::File(path))
    } else {
        None
    }
}

/// Load and decode a single asset.
pub fn load_asset(source: &AssetSource, timeout_ms: u64) -> Result<RgbaImage> {
    let bytes = read_bytes(source, timeout_ms)?;
    let img = image::load_from_memory(&bytes)
        .map_err(|e| Error::CaptureFailure(format!("Failed to decode asset {}: {}", source, e)))?;
    log::debug!("loaded asset {} ({}x{})", source, img.width(), img.height());
    Ok(img.to_rgba8())
}

/// Load every configured asset; absent sources stay `None`.
pub fn load_assets(
    logo: Option<&AssetSource>,
    background: Option<&AssetSource>,
    timeout_ms: u64,
) -> Result<AssetSet> {
    Ok(AssetSet {
        logo: logo.map(|s| load_asset(s, timeout_ms)).transpose()?,
        background: background.map(|s| load_asset(s, timeout_ms)).transpose()?,
    })
}
