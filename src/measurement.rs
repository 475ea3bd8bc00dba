use nalgebra::{Point2, Point3, Rotation3, Unit};

use crate::camera::Camera;
use crate::geometry;
use crate::projection::{ProjectionError, Projector};

#[cfg(test)]
use mockall::automock;

/// Fraction of the shorter ray used as the angle annotation arc radius.
const ARC_RADIUS_FACTOR: f64 = 0.25;

/// The host renderer's picking primitive: shoots a ray through a display
/// point and returns where it first hits the rendered surface, or `None` on
/// a miss.
#[cfg_attr(test, automock)]
pub trait SurfacePicker {
    fn pick(&self, screen_point: Point2<f64>) -> Option<Point3<f64>>;
}

/// Picks a world-space point on the rendered surface, falling back to the
/// camera's focal plane when the ray misses the surface.
pub fn pick_surface_point(
    picker: &dyn SurfacePicker,
    screen_point: &Point2<f64>,
    camera: &Camera,
) -> Result<Point3<f64>, ProjectionError> {
    if let Some(hit) = picker.pick(*screen_point) {
        return Ok(hit);
    }

    let depth = camera
        .focal_display_depth()
        .ok_or(ProjectionError::DegenerateGeometry)?;
    Projector::unproject(screen_point, camera, depth)
}

/// Picks a world-space point on the rendered surface; when the ray misses,
/// the point is taken on the plane through `reference_point` perpendicular
/// to the view direction instead, so a measurement point always exists even
/// off-surface.
pub fn pick_constrained(
    picker: &dyn SurfacePicker,
    screen_point: &Point2<f64>,
    camera: &Camera,
    reference_point: &Point3<f64>,
) -> Result<Point3<f64>, ProjectionError> {
    if let Some(hit) = picker.pick(*screen_point) {
        return Ok(hit);
    }

    let depth = camera
        .focal_display_depth()
        .ok_or(ProjectionError::DegenerateGeometry)?;
    let pick_position = Projector::unproject(screen_point, camera, depth)?;

    let ray_direction = if camera.is_parallel() {
        camera.direction_of_projection()
    } else {
        pick_position - camera.position()
    };

    geometry::ray_plane_intersection(
        &pick_position,
        &ray_direction,
        reference_point,
        &camera.direction_of_projection(),
    )
    .ok_or(ProjectionError::ZeroRayLength)
}

/// Euclidean distance between two world-space points, in millimeters given
/// millimeter spacing units.
pub fn distance_mm(a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    nalgebra::distance(a, b)
}

/// A completed measurement: its world-space points, the derived scalar and a
/// display-space label position. Retained until explicitly cleared; never
/// mutates the volume.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum MeasurementRecord {
    Length {
        points: [Point3<f64>; 2],
        distance_mm: f64,
        label_position: Point2<f64>,
    },
    /// `points[1]` is the vertex; the angle opens between the vectors toward
    /// `points[0]` and `points[2]`.
    Angle {
        points: [Point3<f64>; 3],
        angle_degrees: f64,
        label_position: Point2<f64>,
    },
}

impl MeasurementRecord {
    /// Builds a length record between two picked points, with its label next
    /// to the projected segment midpoint.
    pub fn length(
        points: [Point3<f64>; 2],
        camera: &Camera,
        label_offset: [f64; 2],
    ) -> MeasurementRecord {
        let midpoint = nalgebra::center(&points[0], &points[1]);

        MeasurementRecord::Length {
            points,
            distance_mm: distance_mm(&points[0], &points[1]),
            label_position: label_anchor(&midpoint, camera, label_offset),
        }
    }

    /// Builds an angle record from three picked points with the vertex in
    /// the middle, its label next to the projected vertex.
    ///
    /// Returns `None` when either ray has zero length and the angle is
    /// undefined.
    pub fn angle(
        points: [Point3<f64>; 3],
        camera: &Camera,
        label_offset: [f64; 2],
    ) -> Option<MeasurementRecord> {
        let v1 = points[0] - points[1];
        let v2 = points[2] - points[1];
        let angle_degrees = geometry::angle_between_degrees(&v1, &v2)?;

        Some(MeasurementRecord::Angle {
            points,
            angle_degrees,
            label_position: label_anchor(&points[1], camera, label_offset),
        })
    }

    /// The measurement's derived scalar: distance in millimeters or angle in
    /// degrees.
    pub fn value(&self) -> f64 {
        match self {
            MeasurementRecord::Length { distance_mm, .. } => *distance_mm,
            MeasurementRecord::Angle { angle_degrees, .. } => *angle_degrees,
        }
    }

    pub fn label_position(&self) -> Point2<f64> {
        match self {
            MeasurementRecord::Length { label_position, .. } => *label_position,
            MeasurementRecord::Angle { label_position, .. } => *label_position,
        }
    }

    /// Polyline of the annotation arc between the two rays of an angle
    /// measurement, at a radius proportional to the shorter ray.
    ///
    /// Returns `None` for length records and for degenerate (collinear) rays
    /// where no arc plane exists.
    pub fn arc_points(&self, resolution: u32) -> Option<Vec<Point3<f64>>> {
        let points = match self {
            MeasurementRecord::Angle { points, .. } => points,
            MeasurementRecord::Length { .. } => return None,
        };

        let vertex = points[1];
        let v1 = points[0] - vertex;
        let v2 = points[2] - vertex;
        let radius = ARC_RADIUS_FACTOR * v1.norm().min(v2.norm());

        let axis = v1.cross(&v2);
        if approx::relative_eq!(axis.norm(), 0.0) {
            return None;
        }
        let axis = Unit::new_normalize(axis);
        let angle = geometry::angle_between_degrees(&v1, &v2)?.to_radians();
        let start = v1.normalize() * radius;

        let mut arc = Vec::with_capacity(resolution as usize + 1);
        for step in 0..=resolution {
            let fraction = f64::from(step) / f64::from(resolution.max(1));
            let rotation = Rotation3::from_axis_angle(&axis, angle * fraction);
            arc.push(vertex + rotation * start);
        }

        Some(arc)
    }
}

/// Projects a world-space anchor to display coordinates and applies the
/// configured label offset. An unprojectable anchor parks the label at the
/// display origin.
fn label_anchor(anchor: &Point3<f64>, camera: &Camera, label_offset: [f64; 2]) -> Point2<f64> {
    match camera.world_to_display(anchor) {
        Some(display) => Point2::new(display.x + label_offset[0], display.y + label_offset[1]),
        None => {
            log::debug!("Measurement label anchor is not projectable");
            Point2::origin()
        }
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector3;

    use crate::camera::{CameraOptions, Projection};

    use super::*;

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

    #[test]
    fn test_measurement_right_angle_is_90_degrees() {
        let camera = parallel_camera();
        let record = MeasurementRecord::angle(
            [
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            &camera,
            [0.0, 0.0],
        )
        .expect("Angle is well defined");

        approx::assert_relative_eq!(record.value(), 90.0, epsilon = 1e-3);
    }

    #[test]
    fn test_measurement_angle_with_zero_ray_is_undefined() {
        let camera = parallel_camera();
        let record = MeasurementRecord::angle(
            [
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            &camera,
            [0.0, 0.0],
        );

        assert_eq!(record, None);
    }

    #[test]
    fn test_measurement_length_distance_and_label() {
        let camera = parallel_camera();
        let record = MeasurementRecord::length(
            [Point3::new(5.0, 5.0, 5.0), Point3::new(8.0, 9.0, 5.0)],
            &camera,
            [4.0, -2.0],
        );

        approx::assert_relative_eq!(record.value(), 5.0);
        // Midpoint (6.5, 7, 5) maps to pixel (57.5, 60) under the test
        // camera, plus the configured offset.
        approx::assert_relative_eq!(
            record.label_position(),
            Point2::new(61.5, 58.0),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_measurement_arc_spans_between_the_rays() {
        let camera = parallel_camera();
        let record = MeasurementRecord::angle(
            [
                Point3::new(4.0, 0.0, 0.0),
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(0.0, 8.0, 0.0),
            ],
            &camera,
            [0.0, 0.0],
        )
        .expect("Angle is well defined");

        let arc = record.arc_points(16).expect("Arc exists");

        assert_eq!(arc.len(), 17);
        // Radius is a quarter of the shorter ray.
        approx::assert_relative_eq!(arc[0], Point3::new(1.0, 0.0, 0.0), epsilon = 1e-9);
        approx::assert_relative_eq!(arc[16], Point3::new(0.0, 1.0, 0.0), epsilon = 1e-9);
        for point in &arc {
            approx::assert_relative_eq!((point - Point3::origin()).norm(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_measurement_pick_prefers_surface_hit() {
        let camera = parallel_camera();
        let mut picker = MockSurfacePicker::new();
        picker
            .expect_pick()
            .returning(|_| Some(Point3::new(1.0, 2.0, 3.0)));

        let picked = pick_surface_point(&picker, &Point2::new(50.0, 50.0), &camera)
            .expect("Pick succeeds");

        assert_eq!(picked, Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_measurement_pick_falls_back_to_focal_plane() {
        let camera = parallel_camera();
        let mut picker = MockSurfacePicker::new();
        picker.expect_pick().returning(|_| None);

        let picked = pick_surface_point(&picker, &Point2::new(25.0, 50.0), &camera)
            .expect("Fallback pick succeeds");

        approx::assert_relative_eq!(picked, Point3::new(0.0, 5.0, 5.0), epsilon = 1e-9);
    }

    #[test]
    fn test_measurement_constrained_pick_lands_on_reference_plane() {
        let camera = parallel_camera();
        let mut picker = MockSurfacePicker::new();
        picker.expect_pick().returning(|_| None);
        let reference_point = Point3::new(5.0, 5.0, 2.0);

        let picked = pick_constrained(
            &picker,
            &Point2::new(75.0, 50.0),
            &camera,
            &reference_point,
        )
        .expect("Constrained pick succeeds");

        // On the plane through the reference point, perpendicular to the
        // view direction.
        let direction_of_projection = camera.direction_of_projection();
        approx::assert_relative_eq!(
            (picked - reference_point).dot(&direction_of_projection),
            0.0,
            epsilon = 1e-9
        );
        approx::assert_relative_eq!(picked, Point3::new(10.0, 5.0, 2.0), epsilon = 1e-9);
    }
}
