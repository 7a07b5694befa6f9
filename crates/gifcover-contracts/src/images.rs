use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::PluginError;

/// Reference width the remote site's thumbnails are scaled to; the aspect
/// ratio of a record is this width over the reported height.
pub const REFERENCE_WIDTH: f64 = 300.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub name: String,
    pub url: String,
    pub url_hd: String,
    pub set_url: String,
    pub aspect_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GallerySearchResult {
    pub description: String,
    pub images: Vec<ImageRecord>,
}

impl GallerySearchResult {
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectFilter {
    #[default]
    Both,
    Vertical,
    Landscape,
}

impl AspectFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Both => "both",
            Self::Vertical => "vertical",
            Self::Landscape => "landscape",
        }
    }

    /// `> 1` is landscape, `< 1` is vertical. A square record only passes
    /// `Both`.
    pub fn accepts(&self, aspect_ratio: f64) -> bool {
        match self {
            Self::Both => true,
            Self::Vertical => aspect_ratio < 1.0,
            Self::Landscape => aspect_ratio > 1.0,
        }
    }

    pub fn apply(&self, images: Vec<ImageRecord>) -> Vec<ImageRecord> {
        if *self == Self::Both {
            return images;
        }
        images
            .into_iter()
            .filter(|image| self.accepts(image.aspect_ratio))
            .collect()
    }
}

impl FromStr for AspectFilter {
    type Err = PluginError;

    /// Anything that is neither `both` nor `vertical` filters for landscape,
    /// matching how the plugin UI has always sent the value.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "" => Err(PluginError::invalid_argument("aspect must not be empty")),
            "both" => Ok(Self::Both),
            "vertical" => Ok(Self::Vertical),
            _ => Ok(Self::Landscape),
        }
    }
}

impl fmt::Display for AspectFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Width-over-height proxy; a missing or zero height counts as square.
pub fn aspect_ratio_for_height(height: Option<u64>) -> f64 {
    let height = height.filter(|value| *value > 0).unwrap_or(300);
    REFERENCE_WIDTH / height as f64
}
