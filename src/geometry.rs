//! ROI geometry and the containment check.
//!
//! The vendor describes a region of interest as a polygon contour. The
//! check only ever uses the polygon's axis-aligned bounding rectangle and
//! tests each detected object's center against it with inclusive bounds.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::detect::DetectedObject;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GeometryError {
    /// Structurally invalid input: empty contour, non-finite coordinate,
    /// negative extent.
    InvalidInput(String),
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryError::InvalidInput(message) => write!(f, "invalid input: {}", message),
        }
    }
}

impl std::error::Error for GeometryError {}

/// A contour vertex in image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding rectangle of an ROI contour.
///
/// The far edges are kept as the contour extrema; `x + w` does not always
/// round back to them.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RoiRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    #[serde(skip)]
    max_x: f64,
    #[serde(skip)]
    max_y: f64,
}

impl RoiRect {
    /// Derives the bounding rectangle of a polygon contour.
    pub fn from_contour(contour: &[Point]) -> Result<Self, GeometryError> {
        let (first, rest) = contour
            .split_first()
            .ok_or_else(|| GeometryError::InvalidInput("roi contour has no vertices".into()))?;
        ensure_finite_point(first)?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for point in rest {
            ensure_finite_point(point)?;
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }
        Ok(Self {
            x: min_x,
            y: min_y,
            w: max_x - min_x,
            h: max_y - min_y,
            max_x,
            max_y,
        })
    }

    pub fn max_x(&self) -> f64 {
        self.max_x
    }

    pub fn max_y(&self) -> f64 {
        self.max_y
    }

    /// Inclusive on every edge.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.x <= x && x <= self.max_x() && self.y <= y && y <= self.max_y()
    }
}

impl fmt::Display for RoiRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{},{},{}]", self.x, self.y, self.w, self.h)
    }
}

fn ensure_finite_point(point: &Point) -> Result<(), GeometryError> {
    if point.x.is_finite() && point.y.is_finite() {
        Ok(())
    } else {
        Err(GeometryError::InvalidInput(format!(
            "roi contour vertex ({}, {}) is not finite",
            point.x, point.y
        )))
    }
}

/// Verdict for a single detected object.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContainmentResult {
    pub object_type: String,
    pub center_x: f64,
    pub center_y: f64,
    pub inside: bool,
}

/// Per-object verdicts plus the aggregate for one ROI.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContainmentReport {
    pub roi: RoiRect,
    pub results: Vec<ContainmentResult>,
    pub any_inside: bool,
}

impl ContainmentReport {
    /// Writes the audit trail: one block per object, then ROI extents and
    /// the aggregate verdict.
    pub fn log(&self) {
        for result in &self.results {
            log::info!("----------");
            log::info!("objectType: {}", result.object_type);
            log::info!("centerX: {}", result.center_x);
            log::info!("centerY: {}", result.center_y);
            if result.inside {
                log::info!("the object is in the roi");
            }
        }
        log::info!("==========");
        log::info!("roi_minX: {}", self.roi.x);
        log::info!("roi_maxX: {}", self.roi.max_x());
        log::info!("roi_minY: {}", self.roi.y);
        log::info!("roi_maxY: {}", self.roi.max_y());
        log::info!("==========");
        log::info!("result: {}", self.any_inside);
    }
}

/// Tests every object's center against `roi`.
///
/// Callers filter by object type first. Fails without a partial result if
/// any object has a non-finite coordinate or a negative extent.
pub fn evaluate_containment(
    objects: &[DetectedObject],
    roi: &RoiRect,
) -> Result<ContainmentReport, GeometryError> {
    let mut results = Vec::with_capacity(objects.len());
    for object in objects {
        validate_object(object)?;
        let (center_x, center_y) = object.center();
        results.push(ContainmentResult {
            object_type: object.object_type.clone(),
            center_x,
            center_y,
            inside: roi.contains(center_x, center_y),
        });
    }
    let any_inside = results.iter().any(|r| r.inside);
    Ok(ContainmentReport {
        roi: *roi,
        results,
        any_inside,
    })
}

fn validate_object(object: &DetectedObject) -> Result<(), GeometryError> {
    let coords = [object.x, object.y, object.w, object.h];
    if coords.iter().any(|c| !c.is_finite()) {
        return Err(GeometryError::InvalidInput(format!(
            "detected object has non-finite geometry: {}",
            object
        )));
    }
    if object.w < 0.0 || object.h < 0.0 {
        return Err(GeometryError::InvalidInput(format!(
            "detected object has negative extent: {}",
            object
        )));
    }
    Ok(())
}
