use nalgebra::Point2;

/// The fewest contour points that can still bound an area on screen.
pub const MIN_CONTOUR_POINTS: usize = 3;

/// An ordered loop of display-space points collected during one drag.
///
/// The contour is implicitly closed: the last point connects back to the
/// first. It is replaced wholesale by the next drag and discarded after
/// rasterization.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Contour2D {
    points: Vec<Point2<f64>>,
    closed: bool,
}

impl Contour2D {
    pub fn points(&self) -> &[Point2<f64>] {
        &self.points
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Consumes the contour, returning its points.
    pub fn into_points(self) -> Vec<Point2<f64>> {
        self.points
    }
}

/// Accumulates a freehand contour while a pointer drag is active.
///
/// Two pieces of preview geometry exist during the drag: the committed
/// polyline (all accumulated points) and a thin segment previewing the
/// closing edge, from the first contour point to the current pointer
/// position.
#[derive(Debug, Default)]
pub struct ContourCapture {
    dragging: bool,
    points: Vec<Point2<f64>>,
    preview_segment: Option<[Point2<f64>; 2]>,
}

impl ContourCapture {
    pub fn new() -> Self {
        ContourCapture::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Points committed so far, for drawing the contour preview.
    pub fn committed_points(&self) -> &[Point2<f64>] {
        &self.points
    }

    /// The thin closing-edge preview segment, from the first contour point
    /// to the current pointer position.
    pub fn preview_segment(&self) -> Option<[Point2<f64>; 2]> {
        self.preview_segment
    }

    /// Starts a new contour at the pointer-down position, discarding any
    /// previous one.
    pub fn begin(&mut self, position: Point2<f64>) {
        self.dragging = true;
        self.points.clear();
        self.points.push(position);
        self.preview_segment = Some([position, position]);
    }

    /// Appends the current pointer position while dragging. Ignored when no
    /// drag is active.
    pub fn extend(&mut self, position: Point2<f64>) {
        if !self.dragging {
            return;
        }

        self.points.push(position);
        if let Some(segment) = &mut self.preview_segment {
            segment[1] = position;
        }
    }

    /// Finishes the drag at the pointer-up position and closes the polyline.
    ///
    /// Returns `None` (and clears the preview) when the contour has fewer
    /// than [`MIN_CONTOUR_POINTS`] points; such a gesture is silently
    /// discarded.
    pub fn finish(&mut self, position: Point2<f64>) -> Option<Contour2D> {
        if !self.dragging {
            return None;
        }

        self.dragging = false;
        self.points.push(position);
        self.preview_segment = None;

        if self.points.len() < MIN_CONTOUR_POINTS {
            log::debug!(
                "Discarding contour with only {} points",
                self.points.len()
            );
            self.points.clear();
            return None;
        }

        Some(Contour2D {
            points: std::mem::replace(&mut self.points, Vec::new()),
            closed: true,
        })
    }

    /// Drops any in-progress drag and preview geometry.
    pub fn cancel(&mut self) {
        self.dragging = false;
        self.points.clear();
        self.preview_segment = None;
    }
}
