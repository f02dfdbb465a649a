//! ROI containment check, end to end through the driver with an in-memory
//! AINVR double, plus the geometric properties the check relies on.

use anyhow::{anyhow, Result};
use ainvr_kit::client::{CameraInfo, RegionField, RoiInfo, RoiRegion};
use ainvr_kit::detect::parse_target_objects;
use ainvr_kit::{
    evaluate_containment, filter_by_type, run_roi_check, DetectedObject, GeometryError, Point,
    RoiCheckRequest, RoiRect, VmsApi,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn square_contour() -> Vec<Point> {
    vec![
        Point::new(0.0, 0.0),
        Point::new(0.0, 100.0),
        Point::new(100.0, 100.0),
        Point::new(100.0, 0.0),
    ]
}

struct FakeVms {
    objects: Vec<DetectedObject>,
    region: RegionField,
    calls: Vec<String>,
}

impl FakeVms {
    fn new(objects: Vec<DetectedObject>) -> Self {
        Self {
            objects,
            region: RegionField::Decoded(vec![RoiRegion {
                contour: square_contour(),
            }]),
            calls: Vec::new(),
        }
    }
}

impl VmsApi for FakeVms {
    fn camera(&mut self, camera_id: u64) -> Result<CameraInfo> {
        self.calls.push(format!("camera:{}", camera_id));
        Ok(CameraInfo {
            stream_url: format!("rtsp://cam/{}", camera_id),
        })
    }

    fn create_snapshot(&mut self, stream_url: &str) -> Result<String> {
        self.calls.push(format!("snapshot:{}", stream_url));
        Ok("http://nvr/snap.jpg".to_string())
    }

    fn fetch_snapshot(&mut self, snapshot_url: &str) -> Result<Vec<u8>> {
        self.calls.push(format!("fetch:{}", snapshot_url));
        Ok(vec![0xFF, 0xD8, 0xFF])
    }

    fn detect_objects(&mut self, image: &[u8]) -> Result<Vec<DetectedObject>> {
        self.calls.push(format!("detect:{}", image.len()));
        Ok(self.objects.clone())
    }

    fn roi(&mut self, roi_id: u64) -> Result<RoiInfo> {
        self.calls.push(format!("roi:{}", roi_id));
        Ok(RoiInfo {
            region: self.region.clone(),
        })
    }
}

fn request() -> RoiCheckRequest {
    RoiCheckRequest {
        camera_id: 7,
        roi_id: 3,
        object_targets: vec!["car".to_string()],
    }
}

#[test]
fn scenario_square_roi_with_inside_and_outside_cars() {
    let mut api = FakeVms::new(vec![
        DetectedObject::new("car", 40.0, 40.0, 20.0, 20.0),
        DetectedObject::new("car", 200.0, 200.0, 10.0, 10.0),
    ]);
    let outcome = run_roi_check(&mut api, &request()).unwrap();
    let report = outcome.report;

    assert_eq!(
        (report.roi.x, report.roi.y, report.roi.w, report.roi.h),
        (0.0, 0.0, 100.0, 100.0)
    );
    assert_eq!(report.results.len(), 2);
    assert_eq!(
        (report.results[0].center_x, report.results[0].center_y),
        (50.0, 50.0)
    );
    assert!(report.results[0].inside);
    assert_eq!(
        (report.results[1].center_x, report.results[1].center_y),
        (205.0, 205.0)
    );
    assert!(!report.results[1].inside);
    assert!(report.any_inside);
    assert_eq!(outcome.snapshot, vec![0xFF, 0xD8, 0xFF]);
    assert_eq!(
        api.calls,
        vec![
            "camera:7",
            "snapshot:rtsp://cam/7",
            "fetch:http://nvr/snap.jpg",
            "detect:3",
            "roi:3"
        ]
    );
}

#[test]
fn non_target_objects_never_reach_the_evaluator() {
    let mut api = FakeVms::new(vec![
        DetectedObject::new("person", 40.0, 40.0, 20.0, 20.0).with_confidence(0.99),
        DetectedObject::new("car", 500.0, 500.0, 10.0, 10.0),
    ]);
    let report = run_roi_check(&mut api, &request()).unwrap().report;
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].object_type, "car");
    assert!(!report.any_inside);
}

#[test]
fn no_target_objects_means_not_inside() {
    let mut api = FakeVms::new(vec![DetectedObject::new("person", 1.0, 1.0, 2.0, 2.0)]);
    let report = run_roi_check(&mut api, &request()).unwrap().report;
    assert!(report.results.is_empty());
    assert!(!report.any_inside);
}

#[test]
fn empty_roi_region_is_invalid_input() {
    let mut api = FakeVms::new(vec![DetectedObject::new("car", 1.0, 1.0, 2.0, 2.0)]);
    api.region = RegionField::Encoded("[]".to_string());
    let err = run_roi_check(&mut api, &request()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GeometryError>(),
        Some(GeometryError::InvalidInput(_))
    ));
}

#[test]
fn empty_contour_is_invalid_input() {
    let mut api = FakeVms::new(vec![]);
    api.region = RegionField::Encoded(r#"[{"contour": []}]"#.to_string());
    let err = run_roi_check(&mut api, &request()).unwrap_err();
    assert!(err.downcast_ref::<GeometryError>().is_some());
}

/// Serves a raw detection reply through the type-aware parser.
struct RawDetectionVms {
    inner: FakeVms,
    payload: &'static [u8],
}

impl VmsApi for RawDetectionVms {
    fn camera(&mut self, camera_id: u64) -> Result<CameraInfo> {
        self.inner.camera(camera_id)
    }

    fn create_snapshot(&mut self, stream_url: &str) -> Result<String> {
        self.inner.create_snapshot(stream_url)
    }

    fn fetch_snapshot(&mut self, snapshot_url: &str) -> Result<Vec<u8>> {
        self.inner.fetch_snapshot(snapshot_url)
    }

    fn detect_objects(&mut self, _image: &[u8]) -> Result<Vec<DetectedObject>> {
        Err(anyhow!("untyped detection not expected"))
    }

    fn detect_objects_of_type(
        &mut self,
        _image: &[u8],
        targets: &[String],
    ) -> Result<Vec<DetectedObject>> {
        parse_target_objects(self.payload, targets)
    }

    fn roi(&mut self, roi_id: u64) -> Result<RoiInfo> {
        self.inner.roi(roi_id)
    }
}

#[test]
fn malformed_non_target_does_not_fail_the_check() {
    let mut api = RawDetectionVms {
        inner: FakeVms::new(vec![]),
        payload: br#"[
            {"objectType": "person", "y": 10, "h": 30},
            {"objectType": "car", "x": 40, "y": 40, "w": 20, "h": 20}
        ]"#,
    };
    let report = run_roi_check(&mut api, &request()).unwrap().report;
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].object_type, "car");
    assert!(report.any_inside);
}

#[test]
fn malformed_target_fails_the_check() {
    let mut api = RawDetectionVms {
        inner: FakeVms::new(vec![]),
        payload: br#"[{"objectType": "car", "x": 40, "y": 40, "h": 20}]"#,
    };
    let err = run_roi_check(&mut api, &request()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GeometryError>(),
        Some(GeometryError::InvalidInput(_))
    ));
}

#[test]
fn collaborator_failure_propagates() {
    struct BrokenVms;
    impl VmsApi for BrokenVms {
        fn camera(&mut self, _camera_id: u64) -> Result<CameraInfo> {
            Err(anyhow!("connection refused"))
        }
        fn create_snapshot(&mut self, _stream_url: &str) -> Result<String> {
            unreachable!()
        }
        fn fetch_snapshot(&mut self, _snapshot_url: &str) -> Result<Vec<u8>> {
            unreachable!()
        }
        fn detect_objects(&mut self, _image: &[u8]) -> Result<Vec<DetectedObject>> {
            unreachable!()
        }
        fn roi(&mut self, _roi_id: u64) -> Result<RoiInfo> {
            unreachable!()
        }
    }
    let err = run_roi_check(&mut BrokenVms, &request()).unwrap_err();
    assert!(format!("{:#}", err).contains("connection refused"));
    assert!(err.to_string().contains("get camera 7"));
}

#[test]
fn every_vertex_lies_within_derived_rect() {
    let contours: Vec<Vec<Point>> = vec![
        square_contour(),
        vec![Point::new(3.5, -2.0)],
        vec![Point::new(-10.0, 4.0), Point::new(25.0, 4.0)],
        vec![
            Point::new(640.0, 12.0),
            Point::new(1280.0, 300.25),
            Point::new(900.0, 719.0),
            Point::new(10.0, 500.0),
            Point::new(320.0, 40.0),
        ],
        (0..24)
            .map(|i| {
                let angle = i as f64 * std::f64::consts::PI / 12.0;
                Point::new(300.0 + 80.0 * angle.cos(), 200.0 + 45.0 * angle.sin())
            })
            .collect(),
        vec![Point::new(12.3, 0.0), Point::new(45.6, 10.0)],
        vec![Point::new(321.64, 0.0), Point::new(1547.16, 5.0)],
        vec![
            Point::new(0.1, 0.7),
            Point::new(1919.99, 0.3),
            Point::new(1033.33, 1079.9),
        ],
    ];
    for contour in contours {
        assert_vertices_contained(&contour);
    }
}

fn assert_vertices_contained(contour: &[Point]) {
    let roi = RoiRect::from_contour(contour).unwrap();
    assert!(roi.w >= 0.0 && roi.h >= 0.0);
    for vertex in contour {
        assert!(
            roi.contains(vertex.x, vertex.y),
            "vertex {:?} outside {}",
            vertex,
            roi
        );
    }
}

/// Pixel coordinate in `[1, upper)` with two decimals, like the vendor's ROI editor.
fn hundredths(rng: &mut StdRng, upper: u32) -> f64 {
    f64::from(rng.gen_range(100..upper * 100)) / 100.0
}

#[test]
fn generated_contours_contain_their_vertices() {
    let mut rng = StdRng::seed_from_u64(0x5eed_0a1e);
    for _ in 0..2000 {
        let count = rng.gen_range(3..=8);
        let contour: Vec<Point> = (0..count)
            .map(|_| Point::new(hundredths(&mut rng, 1920), hundredths(&mut rng, 1080)))
            .collect();
        assert_vertices_contained(&contour);

        let roi = RoiRect::from_contour(&contour).unwrap();
        let on_corner = DetectedObject::new("car", roi.max_x() - 1.0, roi.max_y() - 1.0, 2.0, 2.0);
        let report = evaluate_containment(&[on_corner], &roi).unwrap();
        assert!(
            report.any_inside,
            "center ({}, {}) outside {:?}",
            report.results[0].center_x,
            report.results[0].center_y,
            contour
        );
    }
}

#[test]
fn center_on_fractional_max_vertex_is_inside() {
    let roi = RoiRect::from_contour(&[Point::new(12.3, 0.0), Point::new(45.6, 10.0)]).unwrap();
    let car = DetectedObject::new("car", 44.6, 4.0, 2.0, 2.0);
    let report = evaluate_containment(&[car], &roi).unwrap();
    assert_eq!(
        (report.results[0].center_x, report.results[0].center_y),
        (45.6, 5.0)
    );
    assert!(report.any_inside);

    let roi = RoiRect::from_contour(&[Point::new(321.64, 0.0), Point::new(1547.16, 5.0)]).unwrap();
    let on_corner = DetectedObject::new("car", 1546.16, 4.0, 2.0, 2.0);
    assert!(evaluate_containment(&[on_corner], &roi).unwrap().any_inside);
}

#[test]
fn boundary_centers_count_as_inside() {
    let roi = RoiRect::from_contour(&square_contour()).unwrap();
    let corners = [
        (0.0, 0.0),
        (100.0, 0.0),
        (0.0, 100.0),
        (100.0, 100.0),
        (50.0, 0.0),
        (100.0, 50.0),
    ];
    for (cx, cy) in corners {
        let object = DetectedObject::new("car", cx - 5.0, cy - 5.0, 10.0, 10.0);
        let report = evaluate_containment(&[object], &roi).unwrap();
        assert!(report.any_inside, "center ({}, {}) should be inside", cx, cy);
    }
    let just_outside = DetectedObject::new("car", 95.0, 95.0, 10.02, 10.0);
    assert!(!evaluate_containment(&[just_outside], &roi).unwrap().any_inside);
}

#[test]
fn degenerate_line_roi_only_matches_exact_centers() {
    let roi = RoiRect::from_contour(&[Point::new(10.0, 50.0), Point::new(90.0, 50.0)]).unwrap();
    assert_eq!(roi.h, 0.0);
    let on_line = DetectedObject::new("car", 20.0, 40.0, 20.0, 20.0);
    let off_line = DetectedObject::new("car", 20.0, 40.0, 20.0, 21.0);
    let report = evaluate_containment(&[on_line, off_line], &roi).unwrap();
    assert!(report.results[0].inside);
    assert!(!report.results[1].inside);
}

#[test]
fn evaluation_is_idempotent() {
    let roi = RoiRect::from_contour(&square_contour()).unwrap();
    let objects = vec![
        DetectedObject::new("car", 10.0, 10.0, 5.0, 5.0),
        DetectedObject::new("car", -50.0, 10.0, 5.0, 5.0),
        DetectedObject::new("car", 99.0, 99.0, 2.0, 2.0),
    ];
    let first = evaluate_containment(&objects, &roi).unwrap();
    let second = evaluate_containment(&objects, &roi).unwrap();
    assert_eq!(first, second);
}

#[test]
fn strictly_inside_target_sets_aggregate() {
    let roi = RoiRect::from_contour(&square_contour()).unwrap();
    let detected = vec![
        DetectedObject::new("truck", 400.0, 400.0, 10.0, 10.0),
        DetectedObject::new("bus", 30.0, 60.0, 8.0, 8.0),
    ];
    let targets = filter_by_type(&detected, &["bus", "truck"]);
    let report = evaluate_containment(&targets, &roi).unwrap();
    assert_eq!(report.results.len(), 2);
    assert!(report.any_inside);
}

#[test]
fn empty_object_list_for_any_roi() {
    let roi = RoiRect::from_contour(&[Point::new(-3.0, 8.0)]).unwrap();
    let report = evaluate_containment(&[], &roi).unwrap();
    assert!(report.results.is_empty());
    assert!(!report.any_inside);
}
