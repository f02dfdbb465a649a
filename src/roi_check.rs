//! Snapshot a camera, detect objects, and check them against an ROI.

use anyhow::{Context, Result};

use crate::client::VmsApi;
use crate::geometry::{evaluate_containment, ContainmentReport, RoiRect};

#[derive(Clone, Debug)]
pub struct RoiCheckRequest {
    pub camera_id: u64,
    pub roi_id: u64,
    pub object_targets: Vec<String>,
}

#[derive(Debug)]
pub struct RoiCheckOutcome {
    pub report: ContainmentReport,
    /// Image the detection ran on.
    pub snapshot: Vec<u8>,
}

pub fn run_roi_check<A: VmsApi + ?Sized>(
    api: &mut A,
    request: &RoiCheckRequest,
) -> Result<RoiCheckOutcome> {
    let camera = api
        .camera(request.camera_id)
        .with_context(|| format!("get camera {}", request.camera_id))?;
    log::debug!("streamUrl: {}", camera.stream_url);

    let snapshot_url = api.create_snapshot(&camera.stream_url)?;
    log::debug!("snapshot: {}", snapshot_url);
    let snapshot = api.fetch_snapshot(&snapshot_url)?;

    let targets = api.detect_objects_of_type(&snapshot, &request.object_targets)?;
    for object in &targets {
        log::debug!("object: {}", object);
    }

    let roi_info = api
        .roi(request.roi_id)
        .with_context(|| format!("get roi {}", request.roi_id))?;
    let contour = roi_info.first_contour()?;
    log::debug!("roi contour: {:?}", contour);
    let roi = RoiRect::from_contour(&contour)?;

    let report = evaluate_containment(&targets, &roi)?;
    report.log();
    Ok(RoiCheckOutcome { report, snapshot })
}
