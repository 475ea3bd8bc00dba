use nalgebra::{Point2, Point3, Vector3};

use voxel_scalpel::camera::{Camera, CameraOptions, Projection};
use voxel_scalpel::grid::{GridGeometry, VoxelGrid};
use voxel_scalpel::interaction::{InteractionMode, ModeRequest, PointerEvent};
use voxel_scalpel::masking::MaskOperation;
use voxel_scalpel::measurement::SurfacePicker;
use voxel_scalpel::session::EditorSession;

/// A picker whose rays never hit a surface; crop gestures don't consult it.
struct MissPicker;

impl SurfacePicker for MissPicker {
    fn pick(&self, _screen_point: Point2<f64>) -> Option<Point3<f64>> {
        None
    }
}

fn parallel_camera() -> Camera {
    Camera::new(
        Point3::new(5.0, 5.0, 50.0),
        Point3::new(5.0, 5.0, 5.0),
        Vector3::new(0.0, 1.0, 0.0),
        Projection::Parallel { scale: 10.0 },
        [0.1, 1000.0],
        [100.0, 100.0],
        CameraOptions::default(),
    )
}

fn perspective_camera() -> Camera {
    Camera::new(
        Point3::new(5.0, 5.0, 50.0),
        Point3::new(5.0, 5.0, 5.0),
        Vector3::new(0.0, 1.0, 0.0),
        Projection::Perspective { view_angle: 30.0 },
        [0.1, 1000.0],
        [100.0, 100.0],
        CameraOptions::default(),
    )
}

fn ramp_volume() -> VoxelGrid<i16> {
    let geometry = GridGeometry::unit(Vector3::new(10, 10, 10));
    let values: Vec<i16> = (0..geometry.voxel_count())
        .map(|i| (i % 1000) as i16 - 500)
        .collect();
    VoxelGrid::from_values(geometry, values)
}

/// Draws a closed square with corners at the given display coordinates.
fn draw_square(session: &mut EditorSession, corners: [(f64, f64); 4]) {
    session.handle_pointer(
        PointerEvent::Down(Point2::new(corners[0].0, corners[0].1)),
        &MissPicker,
    );
    session.handle_pointer(
        PointerEvent::Move(Point2::new(corners[1].0, corners[1].1)),
        &MissPicker,
    );
    session.handle_pointer(
        PointerEvent::Move(Point2::new(corners[2].0, corners[2].1)),
        &MissPicker,
    );
    session.handle_pointer(
        PointerEvent::Up(Point2::new(corners[3].0, corners[3].1)),
        &MissPicker,
    );
}

// Under the parallel test camera screen pixels map linearly to world
// coordinates: pixel 35 is world 2, pixel 60 is world 7. The square below
// covers world x, y in [2, 7].
const SQUARE: [(f64, f64); 4] = [(35.0, 35.0), (60.0, 35.0), (60.0, 60.0), (35.0, 60.0)];

#[test]
fn test_freehand_crop_inside_fills_square_and_reset_restores() {
    let original = ramp_volume();
    let mut session = EditorSession::builder(original.clone(), parallel_camera()).build();
    session.mark_ready();

    session.select_mode(ModeRequest::FreehandCrop {
        operation: MaskOperation::Inside,
        fill_value: -1000,
    });
    draw_square(&mut session, SQUARE);

    // Interior voxels under the square are painted through the whole depth.
    for z in 0..10 {
        for y in 3..=6 {
            for x in 3..=6 {
                assert_eq!(
                    session.working_volume().value_at(&Point3::new(x, y, z)),
                    Some(-1000),
                    "Voxel ({}, {}, {}) should be painted",
                    x,
                    y,
                    z
                );
                assert_eq!(session.mask().value_at(&Point3::new(x, y, z)), Some(1));
            }
        }
    }

    // Voxels clearly outside the square keep their source values.
    for z in 0..10 {
        for &x in &[0, 1, 8, 9] {
            for y in 0..10 {
                assert_eq!(
                    session.working_volume().value_at(&Point3::new(x, y, z)),
                    original.value_at(&Point3::new(x, y, z)),
                    "Voxel ({}, {}, {}) should be untouched",
                    x,
                    y,
                    z
                );
                assert_eq!(session.mask().value_at(&Point3::new(x, y, z)), Some(0));
            }
        }
    }

    // The gesture committed and the session reverted to the default mode.
    assert_eq!(session.mode(), InteractionMode::Default);

    // A subsequent revert restores every painted voxel exactly.
    session.revert_masked_edits();
    assert_eq!(session.working_volume().values(), original.values());
    assert!(session.mask().values().iter().all(|v| *v == 0));
}

#[test]
fn test_freehand_crop_mask_is_cumulative_across_strokes() {
    let original = ramp_volume();
    let mut session = EditorSession::builder(original.clone(), parallel_camera()).build();
    session.mark_ready();

    session.select_mode(ModeRequest::FreehandCrop {
        operation: MaskOperation::Inside,
        fill_value: -1000,
    });
    // Two disjoint strokes; mode auto-reverts after each, so re-select.
    draw_square(&mut session, [(35.0, 35.0), (45.0, 35.0), (45.0, 45.0), (35.0, 45.0)]);
    session.select_mode(ModeRequest::FreehandCrop {
        operation: MaskOperation::Inside,
        fill_value: -1000,
    });
    draw_square(&mut session, [(55.0, 55.0), (65.0, 55.0), (65.0, 65.0), (55.0, 65.0)]);

    // Both strokes are present in the cumulative mask.
    assert_eq!(session.mask().value_at(&Point3::new(3, 3, 5)), Some(1));
    assert_eq!(session.mask().value_at(&Point3::new(7, 7, 5)), Some(1));
    assert_eq!(session.working_volume().value_at(&Point3::new(3, 3, 5)), Some(-1000));
    assert_eq!(session.working_volume().value_at(&Point3::new(7, 7, 5)), Some(-1000));

    // The full reset restores the pristine data and zeroes the mask.
    session.reset();
    assert_eq!(session.working_volume().values(), original.values());
    assert!(session.mask().values().iter().all(|v| *v == 0));
}

#[test]
fn test_freehand_crop_under_perspective_camera() {
    let original = ramp_volume();
    let mut session = EditorSession::builder(original.clone(), perspective_camera()).build();
    session.mark_ready();

    session.select_mode(ModeRequest::FreehandCrop {
        operation: MaskOperation::Inside,
        fill_value: -1000,
    });
    // A square around the screen center; its frustum contains the central
    // voxel column and misses the grid corners at every depth.
    draw_square(&mut session, [(40.0, 40.0), (60.0, 40.0), (60.0, 60.0), (40.0, 60.0)]);

    for z in 0..10 {
        assert_eq!(
            session.working_volume().value_at(&Point3::new(5, 5, z)),
            Some(-1000),
            "Central voxel at depth {} should be painted",
            z
        );
        assert_eq!(
            session.working_volume().value_at(&Point3::new(0, 0, z)),
            original.value_at(&Point3::new(0, 0, z)),
            "Corner voxel at depth {} should be untouched",
            z
        );
    }

    assert_eq!(session.mode(), InteractionMode::Default);
}

#[test]
fn test_freehand_crop_outside_spares_only_masked_region() {
    let original = ramp_volume();
    let mut session = EditorSession::builder(original.clone(), parallel_camera()).build();
    session.mark_ready();

    session.select_mode(ModeRequest::FreehandCrop {
        operation: MaskOperation::Outside,
        fill_value: -1000,
    });
    draw_square(&mut session, SQUARE);

    // The complement of the mask is painted, the masked square survives.
    assert_eq!(
        session.working_volume().value_at(&Point3::new(4, 4, 5)),
        original.value_at(&Point3::new(4, 4, 5))
    );
    assert_eq!(
        session.working_volume().value_at(&Point3::new(0, 0, 5)),
        Some(-1000)
    );
}
