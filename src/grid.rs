use nalgebra::{Matrix3, Matrix4, Point3, Vector3};
use num_traits::Zero;

use crate::bounding_box::BoundingBox;
use crate::convert::{cast_i32, cast_usize};

/// Spatial metadata of a voxel grid: how many voxels it has and how their
/// integer indices map to world-space positions.
///
/// The mapping is `world = origin + direction * (spacing ⊙ index)`, with the
/// direction matrix expected to be a rotation. The three metadata fields are
/// only ever mutated together through [`set_image_to_world_matrix`], so the
/// index-to-world mapping can never be observed in a partially updated state.
///
/// [`set_image_to_world_matrix`]: GridGeometry::set_image_to_world_matrix
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GridGeometry {
    dimensions: Vector3<u32>,
    origin: Point3<f64>,
    spacing: Vector3<f64>,
    direction: Matrix3<f64>,
}

impl GridGeometry {
    /// Creates grid geometry from explicit metadata.
    ///
    /// # Panics
    /// Panics if any spacing component is below or equal to zero.
    pub fn new(
        dimensions: Vector3<u32>,
        origin: Point3<f64>,
        spacing: Vector3<f64>,
        direction: Matrix3<f64>,
    ) -> Self {
        assert!(
            spacing.x > 0.0 && spacing.y > 0.0 && spacing.z > 0.0,
            "One or more spacing components are below or equal to zero"
        );

        GridGeometry {
            dimensions,
            origin,
            spacing,
            direction,
        }
    }

    /// Creates grid geometry with the given dimensions, unit spacing, zero
    /// origin and identity direction.
    pub fn unit(dimensions: Vector3<u32>) -> Self {
        GridGeometry::new(
            dimensions,
            Point3::origin(),
            Vector3::new(1.0, 1.0, 1.0),
            Matrix3::identity(),
        )
    }

    pub fn dimensions(&self) -> Vector3<u32> {
        self.dimensions
    }

    pub fn origin(&self) -> Point3<f64> {
        self.origin
    }

    pub fn spacing(&self) -> Vector3<f64> {
        self.spacing
    }

    pub fn direction(&self) -> Matrix3<f64> {
        self.direction
    }

    /// Total number of voxels in the grid.
    pub fn voxel_count(&self) -> usize {
        cast_usize(self.dimensions.x) * cast_usize(self.dimensions.y) * cast_usize(self.dimensions.z)
    }

    /// A grid with any zero (or inverted, which u32 cannot express)
    /// dimension contains no voxels.
    pub fn is_empty(&self) -> bool {
        self.dimensions.x == 0 || self.dimensions.y == 0 || self.dimensions.z == 0
    }

    /// Builds the 4×4 matrix mapping integer voxel indices to world-space
    /// positions: the direction columns scaled by spacing, translated by the
    /// origin.
    pub fn image_to_world_matrix(&self) -> Matrix4<f64> {
        let mut matrix = Matrix4::identity();
        for row in 0..3 {
            for col in 0..3 {
                matrix[(row, col)] = self.spacing[col] * self.direction[(row, col)];
            }
            matrix[(row, 3)] = self.origin[row];
        }

        matrix
    }

    /// Builds the inverse mapping, from world-space positions to continuous
    /// voxel indices.
    ///
    /// Returns `None` if the image-to-world matrix is singular, which can
    /// only happen for a non-rotational direction matrix.
    pub fn world_to_image_matrix(&self) -> Option<Matrix4<f64>> {
        self.image_to_world_matrix().try_inverse()
    }

    /// Decomposes a 4×4 image-to-world matrix back into spacing (column
    /// norms), direction (normalized columns) and origin (translation), and
    /// sets all three at once.
    ///
    /// # Panics
    /// Panics if any matrix column has zero length.
    pub fn set_image_to_world_matrix(&mut self, matrix: &Matrix4<f64>) {
        let mut spacing = Vector3::zeros();
        let mut direction = Matrix3::identity();

        for col in 0..3 {
            let mut length_squared = 0.0;
            for row in 0..3 {
                length_squared += matrix[(row, col)] * matrix[(row, col)];
            }
            let length = length_squared.sqrt();
            assert!(
                length > 0.0,
                "Image-to-world matrix columns can't have zero length"
            );

            spacing[col] = length;
            for row in 0..3 {
                direction[(row, col)] = matrix[(row, col)] / length;
            }
        }

        self.spacing = spacing;
        self.direction = direction;
        self.origin = Point3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)]);
    }

    /// Computes the world-space position of a voxel center.
    pub fn voxel_to_world(&self, index: &Point3<i32>) -> Point3<f64> {
        let scaled = Vector3::new(
            f64::from(index.x) * self.spacing.x,
            f64::from(index.y) * self.spacing.y,
            f64::from(index.z) * self.spacing.z,
        );

        self.origin + self.direction * scaled
    }

    /// Collects the 8 world-space corners of the grid extent expanded by half
    /// a voxel in each direction, so that boundary voxels are covered fully.
    ///
    /// Returns `None` for an empty grid.
    pub fn world_corners(&self) -> Option<[Point3<f64>; 8]> {
        if self.is_empty() {
            return None;
        }

        let matrix = self.image_to_world_matrix();
        let index_bounds = BoundingBox::new(
            &Point3::new(-0.5, -0.5, -0.5),
            &Point3::new(
                f64::from(self.dimensions.x) - 0.5,
                f64::from(self.dimensions.y) - 0.5,
                f64::from(self.dimensions.z) - 0.5,
            ),
        );

        let mut corners = index_bounds.corners();
        for corner in &mut corners {
            *corner = matrix.transform_point(corner);
        }

        Some(corners)
    }

    /// Computes the axis-aligned world-space bounds of the half-voxel
    /// expanded grid extent.
    ///
    /// Returns `None` for an empty grid.
    pub fn world_bounds(&self) -> Option<BoundingBox> {
        self.world_corners()
            .and_then(|corners| BoundingBox::from_points(corners.iter()))
    }
}

/// A block of scalar voxel samples with world-space geometry metadata.
///
/// Values are stored contiguously with x varying fastest, then y, then z,
/// matching the linear layout the mask engine sweeps over. The grid is never
/// resized after construction; only its scalar contents change.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct VoxelGrid<T> {
    geometry: GridGeometry,
    values: Vec<T>,
}

impl<T: Copy> VoxelGrid<T> {
    /// Creates a voxel grid with every sample set to `value`.
    pub fn filled(geometry: GridGeometry, value: T) -> Self {
        let values = vec![value; geometry.voxel_count()];

        VoxelGrid { geometry, values }
    }

    /// Creates a voxel grid from an existing scalar buffer.
    ///
    /// # Panics
    /// Panics if the buffer length doesn't match the geometry's voxel count.
    pub fn from_values(geometry: GridGeometry, values: Vec<T>) -> Self {
        assert_eq!(
            values.len(),
            geometry.voxel_count(),
            "Scalar buffer length must match the grid dimensions"
        );

        VoxelGrid { geometry, values }
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }

    /// Reads the sample at the given voxel coordinate.
    ///
    /// Returns `None` for out-of-bounds coordinates.
    pub fn value_at(&self, index: &Point3<i32>) -> Option<T> {
        voxel_to_linear_coordinate(index, &self.geometry.dimensions)
            .map(|one_dimensional| self.values[one_dimensional])
    }

    /// Writes the sample at the given voxel coordinate. Out-of-bounds
    /// coordinates are silently ignored.
    pub fn set_value_at(&mut self, index: &Point3<i32>, value: T) {
        if let Some(one_dimensional) = voxel_to_linear_coordinate(index, &self.geometry.dimensions)
        {
            self.values[one_dimensional] = value;
        }
    }

    /// Sets every sample to `value`.
    pub fn fill(&mut self, value: T) {
        for sample in &mut self.values {
            *sample = value;
        }
    }

    /// Overwrites this grid's samples with another grid's samples.
    ///
    /// # Panics
    /// Panics if the two grids don't share identical geometry.
    pub fn copy_values_from(&mut self, other: &VoxelGrid<T>) {
        assert_eq!(
            self.geometry, other.geometry,
            "Voxel grids must share identical geometry"
        );

        self.values.copy_from_slice(&other.values);
    }
}

impl<T: Copy + Zero> VoxelGrid<T> {
    /// Creates a voxel grid with every sample set to zero.
    pub fn zeroed(geometry: GridGeometry) -> Self {
        VoxelGrid::filled(geometry, T::zero())
    }
}

/// Computes an index to the linear representation of the voxel block from a
/// voxel coordinate.
///
/// Returns `None` if out of bounds.
pub fn voxel_to_linear_coordinate(
    coordinate: &Point3<i32>,
    dimensions: &Vector3<u32>,
) -> Option<usize> {
    if coordinate
        .iter()
        .enumerate()
        .all(|(i, c)| *c >= 0 && *c < cast_i32(dimensions[i]))
    {
        let index = coordinate.z * cast_i32(dimensions.x) * cast_i32(dimensions.y)
            + coordinate.y * cast_i32(dimensions.x)
            + coordinate.x;
        Some(cast_usize(index))
    } else {
        None
    }
}

/// Computes a voxel coordinate from an index to the linear representation of
/// the voxel block.
///
/// Returns `None` if out of bounds.
pub fn linear_to_voxel_coordinate(
    one_dimensional: usize,
    dimensions: &Vector3<u32>,
) -> Option<Point3<i32>> {
    let values_len = cast_usize(dimensions.x) * cast_usize(dimensions.y) * cast_usize(dimensions.z);
    if one_dimensional < values_len {
        let one_dimensional_i32 = cast_i32(one_dimensional);
        let horizontal_area_i32 = cast_i32(dimensions.x * dimensions.y);
        let x_dimension_i32 = cast_i32(dimensions.x);
        let z = one_dimensional_i32 / horizontal_area_i32;
        let y = (one_dimensional_i32 % horizontal_area_i32) / x_dimension_i32;
        let x = one_dimensional_i32 % x_dimension_i32;
        Some(Point3::new(x, y, z))
    } else {
        None
    }
}
