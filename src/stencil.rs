use nalgebra::Point3;
use smallvec::SmallVec;

use crate::convert::{cast_i32, cast_usize};
use crate::extrusion::ExtrudedSolid;
use crate::grid::{GridGeometry, VoxelGrid};

/// Offset applied to every scan ray so it leaves the voxel-center lattice and
/// can't graze triangle vertices or edges exactly, which would double-count
/// parity crossings.
const RAY_OFFSET_Y: f64 = 1.234e-6;
const RAY_OFFSET_Z: f64 = 2.717e-6;

/// Tolerance for treating a crossing that lands exactly on a voxel center as
/// covering that voxel.
const BOUNDARY_EPSILON: f64 = 1e-6;

/// Rasterizes a closed solid, already transformed into the grid's index
/// space, into a binary stencil covering the grid's full voxel extent.
///
/// A voxel is set to 1 iff its center lies inside the solid under the
/// even-odd fill rule: one scan ray per (y, z) voxel row is intersected with
/// the solid's triangles and the spans between successive crossing pairs are
/// filled. Rows with an unpaired crossing (a numerically grazed edge) drop
/// the dangling crossing.
pub fn rasterize_solid(solid_index_space: &ExtrudedSolid, geometry: &GridGeometry) -> VoxelGrid<u8> {
    let mut stencil: VoxelGrid<u8> = VoxelGrid::zeroed(*geometry);
    let dimensions = geometry.dimensions();
    if geometry.is_empty() {
        return stencil;
    }

    let vertices = solid_index_space.vertices();
    let triangles: Vec<[Point3<f64>; 3]> = solid_index_space
        .triangles()
        .iter()
        .map(|triangle| {
            [
                vertices[cast_usize(triangle[0])],
                vertices[cast_usize(triangle[1])],
                vertices[cast_usize(triangle[2])],
            ]
        })
        .collect();

    // Bucket triangles into the z rows they can intersect, so each row only
    // tests a slab of the solid.
    // FIXME: @Optimization Bucket by y within each z slab as well; for long
    // contours most skirt triangles still fail the y test per row.
    let z_count = cast_i32(dimensions.z);
    let mut z_buckets: Vec<Vec<u32>> = vec![Vec::new(); cast_usize(dimensions.z)];
    for (triangle_index, triangle) in triangles.iter().enumerate() {
        let z_min = triangle[0].z.min(triangle[1].z).min(triangle[2].z);
        let z_max = triangle[0].z.max(triangle[1].z).max(triangle[2].z);
        let z_low = ((z_min.floor() as i64 - 1).max(0) as i32).min(z_count - 1);
        let z_high = ((z_max.ceil() as i64 + 1).min(i64::from(z_count - 1))) as i32;
        for z in z_low..=z_high {
            z_buckets[cast_usize(z)].push(triangle_index as u32);
        }
    }

    let x_count = cast_i32(dimensions.x);
    let row_length = cast_usize(dimensions.x);
    let values = stencil.values_mut();

    for z in 0..dimensions.z {
        let ray_z = f64::from(z) + RAY_OFFSET_Z;
        let bucket = &z_buckets[cast_usize(z)];

        for y in 0..dimensions.y {
            let ray_y = f64::from(y) + RAY_OFFSET_Y;

            let mut crossings: SmallVec<[f64; 8]> = SmallVec::new();
            for &triangle_index in bucket {
                let [a, b, c] = &triangles[cast_usize(triangle_index)];
                if let Some(crossing) = ray_triangle_crossing(ray_y, ray_z, a, b, c) {
                    crossings.push(crossing);
                }
            }

            crossings.sort_unstable_by(|lhs, rhs| lhs.partial_cmp(rhs).expect("No NaN crossings"));
            if crossings.len() % 2 == 1 {
                log::debug!(
                    "Dropping unpaired scanline crossing at row y={} z={}",
                    y,
                    z
                );
                crossings.pop();
            }

            let row_start = (cast_usize(z) * cast_usize(dimensions.y) + cast_usize(y)) * row_length;
            for pair in crossings.chunks(2) {
                let span_start = ((pair[0] - BOUNDARY_EPSILON).ceil() as i64).max(0) as i32;
                let span_end =
                    ((pair[1] + BOUNDARY_EPSILON).floor() as i64).min(i64::from(x_count - 1)) as i32;
                for x in span_start..=span_end {
                    values[row_start + cast_usize(x)] = 1;
                }
            }
        }
    }

    stencil
}

/// Intersects the +x scan ray at `(ray_y, ray_z)` with one triangle in the
/// (y, z) plane and returns the crossing's x coordinate.
///
/// Triangles edge-on to the scan direction (degenerate in the (y, z)
/// projection) are skipped; their crossings belong to the adjacent faces of
/// the closed solid.
fn ray_triangle_crossing(
    ray_y: f64,
    ray_z: f64,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> Option<f64> {
    let denominator = (b.y - a.y) * (c.z - a.z) - (c.y - a.y) * (b.z - a.z);
    if denominator.abs() < 1e-12 {
        return None;
    }

    let u = ((ray_y - a.y) * (c.z - a.z) - (c.y - a.y) * (ray_z - a.z)) / denominator;
    let v = ((b.y - a.y) * (ray_z - a.z) - (ray_y - a.y) * (b.z - a.z)) / denominator;
    if u < 0.0 || v < 0.0 || u + v > 1.0 {
        return None;
    }

    Some(a.x + u * (b.x - a.x) + v * (c.x - a.x))
}

/// Merges a rasterized stencil into the persistent mask via logical OR, so
/// the mask stays cumulative across repeated freehand strokes.
///
/// # Panics
/// Panics if mask and stencil don't share identical geometry.
pub fn merge_stencil(mask: &mut VoxelGrid<u8>, stencil: &VoxelGrid<u8>) {
    assert_eq!(
        mask.geometry(),
        stencil.geometry(),
        "Mask and stencil must share identical geometry"
    );

    for (mask_value, stencil_value) in mask.values_mut().iter_mut().zip(stencil.values()) {
        if *stencil_value != 0 {
            *mask_value = 1;
        }
    }
}
