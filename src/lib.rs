//! AINVR toolkit
//!
//! Small tools built on the AINVR video-management REST API.
//!
//! # Module Structure
//!
//! - `geometry`: ROI bounding rectangle and the inclusive center-point containment check
//! - `detect`: detected object records and type filtering
//! - `client`: authenticated REST client with one-shot token refresh
//! - `roi_check`: snapshot → detect → filter → ROI containment driver
//! - `recognition`: face identification and plate recognition on still images
//! - `alert`: webhook listener for alert notifications
//! - `config`: file + environment configuration

pub mod alert;
pub mod client;
pub mod config;
pub mod detect;
pub mod geometry;
pub mod recognition;
pub mod roi_check;

pub use alert::{Alert, AlertConfig, AlertHandle, AlertReceiver};
pub use client::{AinvrClient, RecognitionApi, RetryPolicy, VmsApi};
pub use config::AinvrConfig;
pub use detect::{filter_by_type, DetectedObject};
pub use geometry::{
    evaluate_containment, ContainmentReport, ContainmentResult, GeometryError, Point, RoiRect,
};
pub use recognition::{identify_face, recognize_plates, FaceIdentity};
pub use roi_check::{run_roi_check, RoiCheckOutcome, RoiCheckRequest};
