use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::geometry::GeometryError;

/// One object returned by the AINVR detection endpoint.
///
/// Coordinates are image pixels: `(x, y)` is the top-left corner of the
/// bounding box and `w`, `h` its extents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedObject {
    pub object_type: String,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    #[serde(default)]
    pub confidence: f64,
    /// Vendor-specific attributes (colour, make, ...). Never inspected.
    #[serde(default)]
    pub properties: serde_json::Value,
}

impl DetectedObject {
    pub fn new(object_type: impl Into<String>, x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            object_type: object_type.into(),
            x,
            y,
            w,
            h,
            confidence: 0.0,
            properties: serde_json::Value::Null,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Center of the bounding box.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

impl fmt::Display for DetectedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "objectType={}, confidence={}, [{},{},{},{}]",
            self.object_type, self.confidence, self.x, self.y, self.w, self.h
        )
    }
}

/// Parses the detection endpoint reply (a JSON array of objects).
///
/// Any malformed entry fails the whole reply with
/// [`GeometryError::InvalidInput`].
pub fn parse_detected_objects(payload: &[u8]) -> anyhow::Result<Vec<DetectedObject>> {
    serde_json::from_slice(payload).map_err(|e| anyhow::Error::new(invalid_payload(&e)))
}

/// Parses the detection reply, keeping only entries whose `objectType` is in
/// `targets`.
///
/// Every entry needs a string `objectType`; the remaining fields are only
/// checked on entries that survive the filter.
pub fn parse_target_objects<S: AsRef<str>>(
    payload: &[u8],
    targets: &[S],
) -> anyhow::Result<Vec<DetectedObject>> {
    let entries: Vec<Value> = serde_json::from_slice(payload).map_err(|e| invalid_payload(&e))?;
    let mut objects = Vec::new();
    for entry in entries {
        let object_type = entry
            .get("objectType")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                GeometryError::InvalidInput(format!(
                    "detected object without a string objectType: {}",
                    entry
                ))
            })?;
        if !targets.iter().any(|t| t.as_ref() == object_type) {
            continue;
        }
        let object: DetectedObject =
            serde_json::from_value(entry).map_err(|e| invalid_payload(&e))?;
        objects.push(object);
    }
    Ok(objects)
}

fn invalid_payload(err: &serde_json::Error) -> GeometryError {
    GeometryError::InvalidInput(format!("invalid detected object payload: {}", err))
}
