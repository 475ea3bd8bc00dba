use nalgebra::{Point3, Vector3};

/// World-origin-based axis-aligned bounding box contains the entire given
/// geometry and defines an envelope aligned to the world (euclidean)
/// coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BoundingBox {
    minimum_point: Point3<f64>,
    maximum_point: Point3<f64>,
}

impl BoundingBox {
    /// Creates a new bounding box. The two input points will be deconstructed
    /// and a new couple of points will be created: minimum point with minimum
    /// values of x, y, z and maximum point with maximum values of x, y, z.
    pub fn new(box_corner1: &Point3<f64>, box_corner2: &Point3<f64>) -> Self {
        BoundingBox {
            minimum_point: Point3::new(
                box_corner1.x.min(box_corner2.x),
                box_corner1.y.min(box_corner2.y),
                box_corner1.z.min(box_corner2.z),
            ),
            maximum_point: Point3::new(
                box_corner1.x.max(box_corner2.x),
                box_corner1.y.max(box_corner2.y),
                box_corner1.z.max(box_corner2.z),
            ),
        }
    }

    /// Creates a new bounding box from an iterator of points. The resulting
    /// bounding box will encompass all the input points.
    ///
    /// Returns `None` if the iterator is empty.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3<f64>>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut bounding_box = BoundingBox::new(first, first);
        bounding_box.grow_to_contain_points(points);

        Some(bounding_box)
    }

    /// Gets the minimum point of the bounding box. All the components of the
    /// minimum point are the minimum values of the bounding box coordinates.
    pub fn minimum_point(&self) -> Point3<f64> {
        self.minimum_point
    }

    /// Gets the maximum point of the bounding box. All the components of the
    /// maximum point are the maximum values of the bounding box coordinates.
    pub fn maximum_point(&self) -> Point3<f64> {
        self.maximum_point
    }

    /// Collects all 8 corners of the bounding box as points defined in the
    /// units of the bounding box.
    pub fn corners(&self) -> [Point3<f64>; 8] {
        [
            Point3::new(
                self.minimum_point.x,
                self.minimum_point.y,
                self.minimum_point.z,
            ),
            Point3::new(
                self.minimum_point.x,
                self.minimum_point.y,
                self.maximum_point.z,
            ),
            Point3::new(
                self.maximum_point.x,
                self.minimum_point.y,
                self.maximum_point.z,
            ),
            Point3::new(
                self.maximum_point.x,
                self.minimum_point.y,
                self.minimum_point.z,
            ),
            Point3::new(
                self.minimum_point.x,
                self.maximum_point.y,
                self.minimum_point.z,
            ),
            Point3::new(
                self.minimum_point.x,
                self.maximum_point.y,
                self.maximum_point.z,
            ),
            Point3::new(
                self.maximum_point.x,
                self.maximum_point.y,
                self.maximum_point.z,
            ),
            Point3::new(
                self.maximum_point.x,
                self.maximum_point.y,
                self.minimum_point.z,
            ),
        ]
    }

    /// Grows the current bounding box so that it contains also the input
    /// points. This doesn't shrink the existing bounding box.
    pub fn grow_to_contain_points<'a, I>(&mut self, points: I)
    where
        I: IntoIterator<Item = &'a Point3<f64>>,
    {
        for point in points {
            self.minimum_point.x = self.minimum_point.x.min(point.x);
            self.minimum_point.y = self.minimum_point.y.min(point.y);
            self.minimum_point.z = self.minimum_point.z.min(point.z);
            self.maximum_point.x = self.maximum_point.x.max(point.x);
            self.maximum_point.y = self.maximum_point.y.max(point.y);
            self.maximum_point.z = self.maximum_point.z.max(point.z);
        }
    }

    /// Computes center of the current bounding box.
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.minimum_point, &self.maximum_point)
    }

    /// Computes the diagonal vector of the current bounding box.
    pub fn diagonal(&self) -> Vector3<f64> {
        self.maximum_point - self.minimum_point
    }

    /// Creates a new bounding box grown in all directions by the given offset
    /// vector. Negative components shrink the box.
    pub fn offset(&self, offset: Vector3<f64>) -> Self {
        BoundingBox::new(
            &(self.minimum_point - offset),
            &(self.maximum_point + offset),
        )
    }
}
