use std::error::Error;
use std::fmt;

use arrayvec::ArrayVec;
use nalgebra::{Point2, Point3};

use crate::camera::Camera;
use crate::grid::GridGeometry;

/// Recoverable geometric failures during screen-to-world projection. Any of
/// these aborts or trims the current gesture without mutating the mask or the
/// working volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionError {
    /// Zero homogeneous divisor (or a singular view/projection transform)
    /// while unprojecting a display point.
    DegenerateGeometry,
    /// The pick ray is perpendicular to the direction of projection; the
    /// point carries no depth information.
    ZeroRayLength,
    /// The target grid has an empty (or inverted) extent.
    EmptyGridExtent,
}

impl fmt::Display for ProjectionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProjectionError::DegenerateGeometry => {
                write!(f, "Bad homogeneous coordinates while unprojecting")
            }
            ProjectionError::ZeroRayLength => {
                write!(f, "Pick ray has zero length along the projection direction")
            }
            ProjectionError::EmptyGridExtent => write!(f, "Voxel grid has an empty extent"),
        }
    }
}

impl Error for ProjectionError {}

/// Near/far depth bounds along the camera's direction of projection,
/// measured from the camera position.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClipRange {
    pub near: f64,
    pub far: f64,
}

/// Converts display-space points into world-space rays and depth ranges.
///
/// The clip range for a camera/grid pair is cached and recomputed only when
/// either identity changes, since every contour point of a gesture queries
/// the same range.
#[derive(Debug, Default)]
pub struct Projector {
    cached_clip_range: Option<(GridGeometry, Camera, ClipRange)>,
}

impl Projector {
    pub fn new() -> Self {
        Projector {
            cached_clip_range: None,
        }
    }

    /// Maps a display coordinate plus a normalized depth to a world-space
    /// point through the inverse view/projection transform.
    pub fn unproject(
        screen_point: &Point2<f64>,
        camera: &Camera,
        depth: f64,
    ) -> Result<Point3<f64>, ProjectionError> {
        camera
            .display_to_world(&Point3::new(screen_point.x, screen_point.y, depth))
            .ok_or(ProjectionError::DegenerateGeometry)
    }

    /// Computes the camera-space depth extent of the grid's half-voxel
    /// expanded bounding corners, tightened by the camera's own clipping
    /// range where the camera is tighter.
    pub fn clip_range(
        &mut self,
        geometry: &GridGeometry,
        camera: &Camera,
    ) -> Result<ClipRange, ProjectionError> {
        if let Some((cached_geometry, cached_camera, cached_range)) = &self.cached_clip_range {
            if cached_geometry == geometry && cached_camera == camera {
                return Ok(*cached_range);
            }
        }

        let corners = geometry
            .world_corners()
            .ok_or(ProjectionError::EmptyGridExtent)?;

        let position = camera.position();
        let direction_of_projection = camera.direction_of_projection();

        let mut near = f64::INFINITY;
        let mut far = f64::NEG_INFINITY;
        for corner in ArrayVec::from(corners).into_iter() {
            let depth = (corner - position).dot(&direction_of_projection);
            near = near.min(depth);
            far = far.max(depth);
        }
        near -= 0.5;
        far += 0.5;

        let [camera_near, camera_far] = camera.clipping_range();
        let clip_range = ClipRange {
            near: near.max(camera_near),
            far: far.min(camera_far),
        };

        self.cached_clip_range = Some((*geometry, *camera, clip_range));
        Ok(clip_range)
    }

    /// Drops the cached clip range. The cache also self-invalidates when the
    /// camera or grid passed to [`clip_range`] differs from the cached pair;
    /// this hook exists for hosts that mutate grids in place.
    ///
    /// [`clip_range`]: Projector::clip_range
    pub fn invalidate(&mut self) {
        self.cached_clip_range = None;
    }

    /// Computes the two world-space endpoints of the pick ray through
    /// `screen_point`, entering the clip range at `near` and leaving it at
    /// `far`.
    ///
    /// Perspective rays diverge from the camera position, so depths divide by
    /// the ray's projection onto the view direction; parallel rays all carry
    /// the same direction, so depths offset additively.
    pub fn ray_endpoints(
        screen_point: &Point2<f64>,
        camera: &Camera,
        clip_range: &ClipRange,
    ) -> Result<(Point3<f64>, Point3<f64>), ProjectionError> {
        let selection_depth = camera
            .focal_display_depth()
            .ok_or(ProjectionError::DegenerateGeometry)?;
        let pick_position = Projector::unproject(screen_point, camera, selection_depth)?;

        let ray = pick_position - camera.position();
        let ray_length = camera.direction_of_projection().dot(&ray);
        if ray_length == 0.0 {
            return Err(ProjectionError::ZeroRayLength);
        }

        if camera.is_parallel() {
            let direction_of_projection = camera.direction_of_projection();
            let t_front = clip_range.near - ray_length;
            let t_back = clip_range.far - ray_length;
            Ok((
                pick_position + direction_of_projection * t_front,
                pick_position + direction_of_projection * t_back,
            ))
        } else {
            let t_front = clip_range.near / ray_length;
            let t_back = clip_range.far / ray_length;
            Ok((
                camera.position() + ray * t_front,
                camera.position() + ray * t_back,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector3;

    use crate::camera::{CameraOptions, Projection};

    use super::*;

    fn camera(projection: Projection) -> Camera {
        Camera::new(
            Point3::new(5.0, 5.0, 50.0),
            Point3::new(5.0, 5.0, 5.0),
            Vector3::new(0.0, 1.0, 0.0),
            projection,
            [0.1, 1000.0],
            [100.0, 100.0],
            CameraOptions::default(),
        )
    }

    fn unit_grid_10() -> GridGeometry {
        GridGeometry::unit(Vector3::new(10, 10, 10))
    }

    #[test]
    fn test_projection_clip_range_for_grid_in_front_of_camera() {
        let camera = camera(Projection::Perspective { view_angle: 30.0 });
        let mut projector = Projector::new();

        let clip_range = projector
            .clip_range(&unit_grid_10(), &camera)
            .expect("Grid is not empty");

        assert!(clip_range.near < clip_range.far);
        assert!(clip_range.near.is_finite() && clip_range.far.is_finite());
        // Corner depths span [40.5, 50.5]; both bounds padded by half a unit.
        approx::assert_relative_eq!(clip_range.near, 40.0);
        approx::assert_relative_eq!(clip_range.far, 51.0);
    }

    #[test]
    fn test_projection_clip_range_tightened_by_camera_range() {
        let mut camera = camera(Projection::Perspective { view_angle: 30.0 });
        let mut projector = Projector::new();

        let wide = projector
            .clip_range(&unit_grid_10(), &camera)
            .expect("Grid is not empty");

        // A camera whose far plane cuts into the grid wins over the grid
        // extent; changing the camera also invalidates the cached range.
        camera = Camera::new(
            camera.position(),
            camera.focal_point(),
            camera.view_up(),
            camera.projection(),
            [42.0, 45.0],
            [100.0, 100.0],
            CameraOptions::default(),
        );
        let tight = projector
            .clip_range(&unit_grid_10(), &camera)
            .expect("Grid is not empty");

        assert!(wide.near < tight.near);
        approx::assert_relative_eq!(tight.near, 42.0);
        approx::assert_relative_eq!(tight.far, 45.0);
    }

    #[test]
    fn test_projection_clip_range_of_empty_grid() {
        let camera = camera(Projection::Perspective { view_angle: 30.0 });
        let mut projector = Projector::new();

        let result = projector.clip_range(&GridGeometry::unit(Vector3::new(0, 10, 10)), &camera);

        assert_eq!(result, Err(ProjectionError::EmptyGridExtent));
    }

    #[test]
    fn test_projection_ray_endpoints_lie_on_clip_planes_perspective() {
        let camera = camera(Projection::Perspective { view_angle: 30.0 });
        let clip_range = ClipRange {
            near: 40.0,
            far: 51.0,
        };

        let (front, back) =
            Projector::ray_endpoints(&Point2::new(30.0, 70.0), &camera, &clip_range)
                .expect("Ray is valid");

        let direction_of_projection = camera.direction_of_projection();
        approx::assert_relative_eq!(
            (front - camera.position()).dot(&direction_of_projection),
            40.0,
            epsilon = 1e-9
        );
        approx::assert_relative_eq!(
            (back - camera.position()).dot(&direction_of_projection),
            51.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_projection_ray_endpoints_lie_on_clip_planes_parallel() {
        let camera = camera(Projection::Parallel { scale: 10.0 });
        let clip_range = ClipRange {
            near: 40.0,
            far: 51.0,
        };

        let (front, back) =
            Projector::ray_endpoints(&Point2::new(30.0, 70.0), &camera, &clip_range)
                .expect("Ray is valid");

        // Parallel rays keep the pick point's lateral position; scale 10 over
        // a 100 px viewport maps pixel 30 to world offset -4 from the center.
        approx::assert_relative_eq!(front, Point3::new(1.0, 9.0, 10.0), epsilon = 1e-9);
        approx::assert_relative_eq!(back, Point3::new(1.0, 9.0, -1.0), epsilon = 1e-9);
    }

    #[test]
    fn test_projection_unproject_screen_center_at_focal_depth() {
        let camera = camera(Projection::Perspective { view_angle: 30.0 });
        let depth = camera.focal_display_depth().expect("Depth is computable");

        let world = Projector::unproject(&Point2::new(50.0, 50.0), &camera, depth)
            .expect("Point is unprojectable");

        approx::assert_relative_eq!(world, Point3::new(5.0, 5.0, 5.0), epsilon = 1e-6);
    }
}
