//! Reply shapes of the AINVR REST API. Unknown fields are ignored.

use anyhow::{anyhow, Result};
use serde::Deserialize;

use crate::geometry::{GeometryError, Point};

#[derive(Debug, Deserialize)]
pub(crate) struct AuthReply {
    pub token: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraInfo {
    pub stream_url: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RoiInfo {
    pub region: RegionField,
}

/// The server sends `region` as a JSON-encoded string; an inline array is
/// accepted too.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum RegionField {
    Encoded(String),
    Decoded(Vec<RoiRegion>),
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RoiRegion {
    pub contour: Vec<Point>,
}

impl RoiInfo {
    pub fn regions(&self) -> Result<Vec<RoiRegion>> {
        match &self.region {
            RegionField::Encoded(raw) => serde_json::from_str(raw)
                .map_err(|e| anyhow!("invalid roi region encoding: {}", e)),
            RegionField::Decoded(regions) => Ok(regions.clone()),
        }
    }

    /// Contour of the first region; the check never looks past it.
    pub fn first_contour(&self) -> Result<Vec<Point>> {
        let regions = self.regions()?;
        let first = regions
            .into_iter()
            .next()
            .ok_or_else(|| GeometryError::InvalidInput("roi has no regions".into()))?;
        Ok(first.contour)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct FaceDetection {
    pub descriptor: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub age: serde_json::Value,
    #[serde(default)]
    pub gender: serde_json::Value,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceKeyMatch {
    pub face_target: FaceTarget,
}

#[derive(Clone, Debug, Deserialize)]
pub struct FaceTarget {
    pub name: String,
}

/// Snapshot creation answers with the image URL as plain text, sometimes
/// JSON-quoted.
pub fn parse_snapshot_reply(text: &str) -> Result<String> {
    let trimmed = text.trim();
    let url = if trimmed.starts_with('"') {
        serde_json::from_str::<String>(trimmed)
            .map_err(|e| anyhow!("invalid snapshot reply: {}", e))?
    } else {
        trimmed.to_string()
    };
    if url.is_empty() {
        return Err(anyhow!("snapshot reply is empty"));
    }
    Ok(url)
}
