use std::f64;

use nalgebra::{Matrix4, Point3, Vector3};

/// Tunable interaction speeds for the camera. The defaults are calibrated for
/// pixel-delta pointer input.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CameraOptions {
    pub speed_rotate: f64,
    pub speed_pan: f64,
    pub speed_zoom: f64,
    pub polar_angle_distance_min: f64,
}

impl Default for CameraOptions {
    fn default() -> Self {
        CameraOptions {
            speed_rotate: 0.005,
            speed_pan: 1.0,
            speed_zoom: 0.95,
            polar_angle_distance_min: 0.001,
        }
    }
}

/// Projection kind of the host renderer's camera.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Projection {
    /// Pinhole projection with a vertical view angle in degrees.
    Perspective { view_angle: f64 },
    /// Parallel projection; `scale` is half the viewport height in world
    /// units.
    Parallel { scale: f64 },
}

/// Boundary snapshot of the rendering surface's camera.
///
/// The engine never renders; it consumes this state for unprojection, clip
/// range computation and the trackball/pan gestures of the interaction modes.
/// Display coordinates are pixels with the origin in the lower left corner,
/// normalized display depth lies in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Camera {
    position: Point3<f64>,
    focal_point: Point3<f64>,
    view_up: Vector3<f64>,
    clipping_range: [f64; 2],
    projection: Projection,
    screen_size: [f64; 2],
    options: CameraOptions,
}

impl Camera {
    /// Creates a camera from the host renderer's state.
    ///
    /// # Panics
    /// Panics if the position coincides with the focal point, if the view up
    /// vector is parallel to the view direction, or if the screen size is not
    /// positive.
    pub fn new(
        position: Point3<f64>,
        focal_point: Point3<f64>,
        view_up: Vector3<f64>,
        projection: Projection,
        clipping_range: [f64; 2],
        screen_size: [f64; 2],
        options: CameraOptions,
    ) -> Self {
        let view_direction = focal_point - position;
        assert!(
            view_direction.norm() > 0.0,
            "Camera position can't coincide with its focal point"
        );
        assert!(
            view_direction.cross(&view_up).norm() > 0.0,
            "Camera view up can't be parallel to the view direction"
        );
        assert!(
            screen_size[0] > 0.0 && screen_size[1] > 0.0,
            "Screen size must be positive"
        );

        Camera {
            position,
            focal_point,
            view_up: view_up.normalize(),
            clipping_range,
            projection,
            screen_size,
            options,
        }
    }

    pub fn position(&self) -> Point3<f64> {
        self.position
    }

    pub fn focal_point(&self) -> Point3<f64> {
        self.focal_point
    }

    pub fn view_up(&self) -> Vector3<f64> {
        self.view_up
    }

    pub fn clipping_range(&self) -> [f64; 2] {
        self.clipping_range
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self.projection, Projection::Parallel { .. })
    }

    pub fn set_screen_size(&mut self, screen_size: [f64; 2]) {
        assert!(
            screen_size[0] > 0.0 && screen_size[1] > 0.0,
            "Screen size must be positive"
        );
        self.screen_size = screen_size;
    }

    /// Unit vector from the camera position toward its focal point.
    pub fn direction_of_projection(&self) -> Vector3<f64> {
        (self.focal_point - self.position).normalize()
    }

    fn aspect_ratio(&self) -> f64 {
        self.screen_size[0] / self.screen_size[1]
    }

    pub fn view_matrix(&self) -> Matrix4<f64> {
        Matrix4::look_at_rh(&self.position, &self.focal_point, &self.view_up)
    }

    pub fn projection_matrix(&self) -> Matrix4<f64> {
        let [znear, zfar] = self.clipping_range;
        match self.projection {
            Projection::Perspective { view_angle } => Matrix4::new_perspective(
                self.aspect_ratio(),
                view_angle.to_radians(),
                znear,
                zfar,
            ),
            Projection::Parallel { scale } => {
                let half_height = scale;
                let half_width = scale * self.aspect_ratio();
                Matrix4::new_orthographic(
                    -half_width,
                    half_width,
                    -half_height,
                    half_height,
                    znear,
                    zfar,
                )
            }
        }
    }

    /// Maps a world-space point to display coordinates (pixels, plus a
    /// normalized depth in `[0, 1]`).
    ///
    /// Returns `None` when the homogeneous divisor vanishes.
    pub fn world_to_display(&self, world: &Point3<f64>) -> Option<Point3<f64>> {
        let clip = self.projection_matrix() * self.view_matrix() * world.to_homogeneous();
        if clip.w == 0.0 {
            return None;
        }

        let ndc = clip / clip.w;
        Some(Point3::new(
            (ndc.x + 1.0) / 2.0 * self.screen_size[0],
            (ndc.y + 1.0) / 2.0 * self.screen_size[1],
            (ndc.z + 1.0) / 2.0,
        ))
    }

    /// Maps display coordinates (pixels plus normalized depth) back to a
    /// world-space point through the inverse view/projection transform.
    ///
    /// Returns `None` when the transform is singular or the homogeneous
    /// divisor vanishes.
    pub fn display_to_world(&self, display: &Point3<f64>) -> Option<Point3<f64>> {
        let inverse = (self.projection_matrix() * self.view_matrix()).try_inverse()?;
        let ndc = Point3::new(
            display.x / self.screen_size[0] * 2.0 - 1.0,
            display.y / self.screen_size[1] * 2.0 - 1.0,
            display.z * 2.0 - 1.0,
        );

        let world = inverse * ndc.to_homogeneous();
        if world.w == 0.0 {
            return None;
        }

        Some(Point3::new(
            world.x / world.w,
            world.y / world.w,
            world.z / world.w,
        ))
    }

    /// Normalized display depth of the focal plane; the depth at which pick
    /// points are unprojected.
    pub fn focal_display_depth(&self) -> Option<f64> {
        self.world_to_display(&self.focal_point)
            .map(|display| display.z)
    }

    /// Orbits the camera position around the focal point, world Z up. Pointer
    /// deltas are in pixels.
    pub fn rotate(&mut self, dtheta: f64, dphi: f64) {
        let offset = self.position - self.focal_point;
        let radius = offset.norm();

        let azimuthal_angle = offset.y.atan2(offset.x) + dtheta * self.options.speed_rotate;
        let polar_angle = clamp(
            (offset.z / radius).max(-1.0).min(1.0).acos() + dphi * self.options.speed_rotate,
            self.options.polar_angle_distance_min,
            f64::consts::PI - self.options.polar_angle_distance_min,
        );

        self.position = self.focal_point
            + Vector3::new(
                radius * azimuthal_angle.cos() * polar_angle.sin(),
                radius * azimuthal_angle.sin() * polar_angle.sin(),
                radius * polar_angle.cos(),
            );
    }

    /// Pans the camera parallel to the screen plane, moving position and
    /// focal point together. Pointer deltas are in pixels.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let view_direction = self.direction_of_projection();
        let screen_right = view_direction.cross(&self.view_up).normalize();
        let screen_up = screen_right.cross(&view_direction);

        let radius = (self.position - self.focal_point).norm();
        let pan_factor = self.options.speed_pan * radius / self.screen_size[1];
        let translation = (screen_right * -dx + screen_up * -dy) * pan_factor;

        self.position += translation;
        self.focal_point += translation;
    }

    /// Moves the camera position toward (factor > 1) or away from (factor in
    /// (0, 1)) the focal point.
    ///
    /// # Panics
    /// Panics if the factor is not positive.
    pub fn dolly(&mut self, factor: f64) {
        assert!(factor > 0.0, "Dolly factor must be positive");
        self.position = self.focal_point + (self.position - self.focal_point) / factor;
    }
}

fn clamp(x: f64, min: f64, max: f64) -> f64 {
    x.max(min).min(max)
}
