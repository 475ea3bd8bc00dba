use nalgebra::{Point2, Point3, Vector3};

/// Computes the signed area of a 2D polygon using the shoelace formula.
///
/// The result is positive for counter-clockwise winding and negative for
/// clockwise winding. Degenerate polygons (fewer than 3 points) have zero
/// area.
pub fn polygon_signed_area(points: &[Point2<f64>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let mut twice_area = 0.0;
    for (i, current) in points.iter().enumerate() {
        let next = &points[(i + 1) % points.len()];
        twice_area += current.x * next.y - next.x * current.y;
    }

    twice_area / 2.0
}

/// Intersects a ray with an endless plane defined by its origin and normal.
///
/// Returns `None` when the ray runs parallel to the plane and therefore never
/// crosses it.
pub fn ray_plane_intersection(
    ray_origin: &Point3<f64>,
    ray_direction: &Vector3<f64>,
    plane_origin: &Point3<f64>,
    plane_normal: &Vector3<f64>,
) -> Option<Point3<f64>> {
    let denominator = ray_direction.dot(plane_normal);
    if approx::relative_eq!(denominator, 0.0) {
        return None;
    }

    let t = (plane_origin - ray_origin).dot(plane_normal) / denominator;
    Some(ray_origin + ray_direction * t)
}

/// Computes the angle between two vectors in degrees.
///
/// The cosine is clamped before `acos` so that collinear vectors, which can
/// produce dot products epsilon-above 1 in floating point, don't yield NaN.
/// Returns `None` if either vector has zero length.
pub fn angle_between_degrees(v1: &Vector3<f64>, v2: &Vector3<f64>) -> Option<f64> {
    let norms = v1.norm() * v2.norm();
    if approx::relative_eq!(norms, 0.0) {
        return None;
    }

    let cosine = (v1.dot(v2) / norms).max(-1.0).min(1.0);
    Some(cosine.acos().to_degrees())
}
