use nalgebra::{Matrix4, Point2, Point3};

use crate::camera::Camera;
use crate::contour::{Contour2D, MIN_CONTOUR_POINTS};
use crate::geometry;
use crate::projection::{ClipRange, ProjectionError, Projector};

/// A closed triangulated solid swept from a screen-space contour through the
/// camera frustum: a front cap on the near clip bound, a back cap on the far
/// clip bound, and a skirt of quads connecting the two rings.
///
/// Vertices are interleaved ring pairs: the front point of contour point `i`
/// sits at index `2i`, its back point at `2i + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtrudedSolid {
    vertices: Vec<Point3<f64>>,
    triangles: Vec<[u32; 3]>,
}

impl ExtrudedSolid {
    /// Extrudes a closed contour into a world-space solid.
    ///
    /// The contour winding is normalized to counter-clockwise first so the
    /// generated face normals are outward-consistent regardless of the
    /// drawing direction. Contour points whose pick ray carries no depth
    /// information are dropped with a warning; the extrusion aborts when
    /// fewer than [`MIN_CONTOUR_POINTS`] usable points remain, or when any
    /// point fails to unproject at all.
    pub fn from_contour(
        contour: &Contour2D,
        camera: &Camera,
        clip_range: &ClipRange,
    ) -> Result<ExtrudedSolid, ProjectionError> {
        let mut screen_points: Vec<Point2<f64>> = contour.points().to_vec();
        if geometry::polygon_signed_area(&screen_points) < 0.0 {
            screen_points.reverse();
        }

        let mut ring_pairs = Vec::with_capacity(screen_points.len());
        for screen_point in &screen_points {
            match Projector::ray_endpoints(screen_point, camera, clip_range) {
                Ok(pair) => ring_pairs.push(pair),
                Err(ProjectionError::ZeroRayLength) => {
                    log::warn!("Dropping contour point whose pick ray has zero length");
                }
                Err(error) => return Err(error),
            }
        }

        if ring_pairs.len() < MIN_CONTOUR_POINTS {
            log::warn!(
                "Aborting extrusion, only {} of {} contour points are usable",
                ring_pairs.len(),
                screen_points.len()
            );
            return Err(ProjectionError::ZeroRayLength);
        }

        let point_count = ring_pairs.len();
        let mut vertices = Vec::with_capacity(point_count * 2);
        for (front, back) in ring_pairs {
            vertices.push(front);
            vertices.push(back);
        }

        let front_of = |i: usize| (2 * i) as u32;
        let back_of = |i: usize| (2 * i + 1) as u32;

        // Skirt quads around the loop, two triangles each.
        let mut triangles = Vec::with_capacity(point_count * 2 + (point_count - 2) * 2);
        for i in 0..point_count {
            let j = (i + 1) % point_count;
            triangles.push([front_of(i), back_of(i), back_of(j)]);
            triangles.push([front_of(i), back_of(j), front_of(j)]);
        }

        // Front and back caps as fans over the respective rings, wound in
        // opposite directions so both face outward.
        for i in 1..point_count - 1 {
            triangles.push([front_of(0), front_of(i), front_of(i + 1)]);
            triangles.push([back_of(0), back_of(i + 1), back_of(i)]);
        }

        Ok(ExtrudedSolid {
            vertices,
            triangles,
        })
    }

    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// Returns the solid with every vertex pushed through an affine
    /// transform, typically the mask's world-to-index matrix.
    pub fn transformed(&self, matrix: &Matrix4<f64>) -> ExtrudedSolid {
        ExtrudedSolid {
            vertices: self
                .vertices
                .iter()
                .map(|vertex| matrix.transform_point(vertex))
                .collect(),
            triangles: self.triangles.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector3;

    use crate::camera::{CameraOptions, Projection};
    use crate::contour::ContourCapture;

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

    fn square_contour(points: &[(f64, f64)]) -> Contour2D {
        let mut capture = ContourCapture::new();
        capture.begin(Point2::new(points[0].0, points[0].1));
        for (x, y) in &points[1..points.len() - 1] {
            capture.extend(Point2::new(*x, *y));
        }
        let (x, y) = points[points.len() - 1];
        capture.finish(Point2::new(x, y)).expect("Enough points")
    }

    #[test]
    fn test_extrusion_builds_ring_pair_with_caps_and_skirt() {
        let camera = parallel_camera();
        let clip_range = ClipRange {
            near: 40.0,
            far: 51.0,
        };
        let contour =
            square_contour(&[(30.0, 30.0), (70.0, 30.0), (70.0, 70.0), (30.0, 70.0)]);

        let solid = ExtrudedSolid::from_contour(&contour, &camera, &clip_range)
            .expect("Square contour extrudes");

        assert_eq!(solid.vertices().len(), 8);
        // 8 skirt triangles plus 2 × 2 cap triangles.
        assert_eq!(solid.triangles().len(), 12);

        let direction_of_projection = camera.direction_of_projection();
        for pair in solid.vertices().chunks(2) {
            let front_depth = (pair[0] - camera.position()).dot(&direction_of_projection);
            let back_depth = (pair[1] - camera.position()).dot(&direction_of_projection);
            approx::assert_relative_eq!(front_depth, 40.0, epsilon = 1e-9);
            approx::assert_relative_eq!(back_depth, 51.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_extrusion_normalizes_contour_winding() {
        let camera = parallel_camera();
        let clip_range = ClipRange {
            near: 40.0,
            far: 51.0,
        };
        let counter_clockwise =
            square_contour(&[(30.0, 30.0), (70.0, 30.0), (70.0, 70.0), (30.0, 70.0)]);
        let clockwise =
            square_contour(&[(30.0, 30.0), (30.0, 70.0), (70.0, 70.0), (70.0, 30.0)]);

        let solid_ccw = ExtrudedSolid::from_contour(&counter_clockwise, &camera, &clip_range)
            .expect("Contour extrudes");
        let solid_cw = ExtrudedSolid::from_contour(&clockwise, &camera, &clip_range)
            .expect("Contour extrudes");

        // The clockwise contour is reversed before extrusion, so both solids
        // span the identical vertex set.
        let mut vertices_ccw: Vec<_> = solid_ccw
            .vertices()
            .iter()
            .map(|v| (format!("{:.6}", v.x), format!("{:.6}", v.y), format!("{:.6}", v.z)))
            .collect();
        let mut vertices_cw: Vec<_> = solid_cw
            .vertices()
            .iter()
            .map(|v| (format!("{:.6}", v.x), format!("{:.6}", v.y), format!("{:.6}", v.z)))
            .collect();
        vertices_ccw.sort();
        vertices_cw.sort();
        assert_eq!(vertices_ccw, vertices_cw);
    }

    #[test]
    fn test_extrusion_transformed_applies_affine_matrix() {
        let camera = parallel_camera();
        let clip_range = ClipRange {
            near: 40.0,
            far: 51.0,
        };
        let contour =
            square_contour(&[(30.0, 30.0), (70.0, 30.0), (70.0, 70.0), (30.0, 70.0)]);
        let solid = ExtrudedSolid::from_contour(&contour, &camera, &clip_range)
            .expect("Square contour extrudes");

        let translation = Matrix4::new_translation(&Vector3::new(10.0, 0.0, 0.0));
        let transformed = solid.transformed(&translation);

        for (original, moved) in solid.vertices().iter().zip(transformed.vertices()) {
            approx::assert_relative_eq!(moved.x, original.x + 10.0);
            approx::assert_relative_eq!(moved.y, original.y);
            approx::assert_relative_eq!(moved.z, original.z);
        }
        assert_eq!(solid.triangles(), transformed.triangles());
    }
}
