use nalgebra::{Point2, Point3, Vector3};

use crate::bounding_box::BoundingBox;
use crate::contour::ContourCapture;
use crate::masking::MaskOperation;

/// Pointer event delivered by the host rendering surface, with display
/// coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Point2<f64>),
    Move(Point2<f64>),
    Up(Point2<f64>),
}

impl PointerEvent {
    pub fn position(&self) -> Point2<f64> {
        match self {
            PointerEvent::Down(position)
            | PointerEvent::Move(position)
            | PointerEvent::Up(position) => *position,
        }
    }
}

/// Discriminant of the active interaction mode. Exactly one is active at a
/// time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum InteractionMode {
    Default,
    FreehandCrop,
    BoxCrop,
    Pan,
    LengthMeasurement,
    AngleMeasurement,
}

/// Mode-select request from the external command interface, carrying the
/// parameters the requested mode needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModeRequest {
    Default,
    FreehandCrop {
        operation: MaskOperation,
        fill_value: i16,
    },
    BoxCrop,
    Pan,
    LengthMeasurement,
    AngleMeasurement,
}

/// Active crop parameters for the freehand tool.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CropSettings {
    pub operation: MaskOperation,
    pub fill_value: i16,
}

/// State change notifications a pointer event or mode request produced, for
/// the host to schedule re-renders and re-reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    CameraChanged,
    ContourPreviewChanged,
    VolumeModified,
    MaskModified,
    MeasurementPreviewChanged,
    MeasurementAdded,
    ClipPlanesChanged,
    ModeChanged,
}

/// One clipping plane fed to the renderer's clipping-plane set.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClipPlane {
    pub origin: Point3<f64>,
    pub normal: Vector3<f64>,
}

/// The box-crop widget: an axis-aligned box whose six inward-facing planes
/// clip the rendered volume directly, with no voxel mutation.
///
/// The widget persists across mode changes; selecting the box-crop mode only
/// toggles its enabled state.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BoxWidget {
    bounds: BoundingBox,
    enabled: bool,
}

impl BoxWidget {
    /// Creates a disabled widget placed over the given world bounds.
    pub fn new(bounds: BoundingBox) -> Self {
        BoxWidget {
            bounds,
            enabled: false,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Re-places the widget, e.g. when the host moves a box face or a reset
    /// restores the full volume bounds.
    pub fn place(&mut self, bounds: BoundingBox) {
        self.bounds = bounds;
    }

    /// The six planes of the box with normals pointing into it. Geometry
    /// outside any plane is clipped by the renderer.
    pub fn clip_planes(&self) -> [ClipPlane; 6] {
        let minimum = self.bounds.minimum_point();
        let maximum = self.bounds.maximum_point();

        [
            ClipPlane {
                origin: minimum,
                normal: Vector3::x(),
            },
            ClipPlane {
                origin: maximum,
                normal: -Vector3::x(),
            },
            ClipPlane {
                origin: minimum,
                normal: Vector3::y(),
            },
            ClipPlane {
                origin: maximum,
                normal: -Vector3::y(),
            },
            ClipPlane {
                origin: minimum,
                normal: Vector3::z(),
            },
            ClipPlane {
                origin: maximum,
                normal: -Vector3::z(),
            },
        ]
    }
}

/// Tracks a pointer drag and yields per-move deltas, shared by the trackball
/// and pan handlers.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct DragTracker {
    last: Option<Point2<f64>>,
}

impl DragTracker {
    pub fn on_down(&mut self, position: Point2<f64>) {
        self.last = Some(position);
    }

    /// Returns the pointer delta since the previous event while a drag is
    /// active.
    pub fn on_move(&mut self, position: Point2<f64>) -> Option<(f64, f64)> {
        let last = self.last?;
        self.last = Some(position);
        Some((position.x - last.x, position.y - last.y))
    }

    /// Ends the drag; returns whether one was active.
    pub fn on_up(&mut self) -> bool {
        self.last.take().is_some()
    }
}

/// Two-click length gesture: the first click plants the start point, moves
/// drag a provisional end point along, the second click fixes it.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct LengthGesture {
    first: Option<Point3<f64>>,
    provisional: Option<Point3<f64>>,
    clicks: u8,
}

impl LengthGesture {
    pub fn new() -> Self {
        LengthGesture::default()
    }

    /// The planted start point; the reference for constrained picking.
    pub fn first(&self) -> Option<Point3<f64>> {
        self.first
    }

    /// Both points of the in-progress measurement, for live preview.
    pub fn preview(&self) -> Option<[Point3<f64>; 2]> {
        match (self.first, self.provisional) {
            (Some(first), Some(provisional)) => Some([first, provisional]),
            _ => None,
        }
    }

    pub fn on_down(&mut self, picked: Point3<f64>) {
        self.clicks += 1;
        if self.clicks == 1 {
            self.first = Some(picked);
            self.provisional = Some(picked);
        }
    }

    pub fn on_move(&mut self, picked: Point3<f64>) {
        if self.clicks == 1 {
            self.provisional = Some(picked);
        }
    }

    /// Completes the gesture on pointer-up after the second click.
    pub fn on_up(&mut self) -> Option<[Point3<f64>; 2]> {
        if self.clicks >= 2 {
            Some([self.first?, self.provisional?])
        } else {
            None
        }
    }
}

/// Three-click angle gesture: first and second clicks plant an endpoint and
/// the vertex, the third plants the remaining endpoint; moves drag the next
/// unplanted point along.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct AngleGesture {
    first: Option<Point3<f64>>,
    vertex: Option<Point3<f64>>,
    provisional: Option<Point3<f64>>,
    clicks: u8,
}

impl AngleGesture {
    pub fn new() -> Self {
        AngleGesture::default()
    }

    /// The first planted point; the reference for constrained picking.
    pub fn first(&self) -> Option<Point3<f64>> {
        self.first
    }

    /// The points placed or dragged so far, for live preview. The vertex is
    /// the middle point.
    pub fn preview(&self) -> Option<[Point3<f64>; 3]> {
        match (self.first, self.vertex, self.provisional) {
            (Some(first), Some(vertex), Some(provisional)) => Some([first, vertex, provisional]),
            _ => None,
        }
    }

    pub fn on_down(&mut self, picked: Point3<f64>) {
        self.clicks += 1;
        if self.clicks == 1 {
            self.first = Some(picked);
            self.vertex = Some(picked);
            self.provisional = Some(picked);
        }
    }

    pub fn on_move(&mut self, picked: Point3<f64>) {
        match self.clicks {
            1 => {
                self.vertex = Some(picked);
                self.provisional = Some(picked);
            }
            2 => {
                self.provisional = Some(picked);
            }
            _ => (),
        }
    }

    /// Completes the gesture on pointer-up after the third click, yielding
    /// the points with the vertex in the middle.
    pub fn on_up(&mut self) -> Option<[Point3<f64>; 3]> {
        if self.clicks >= 3 {
            Some([self.first?, self.vertex?, self.provisional?])
        } else {
            None
        }
    }
}

/// Per-mode gesture state. The session dispatches each pointer event to the
/// handler of the active variant; transitions swap the whole variant, so no
/// stale gesture state survives a mode change.
#[derive(Debug)]
pub enum ModeState {
    Default { drag: DragTracker },
    FreehandCrop { capture: ContourCapture },
    BoxCrop { drag: DragTracker },
    Pan { drag: DragTracker },
    Length { gesture: LengthGesture },
    Angle { gesture: AngleGesture },
}

impl ModeState {
    pub fn initial() -> Self {
        ModeState::Default {
            drag: DragTracker::default(),
        }
    }

    pub fn mode(&self) -> InteractionMode {
        match self {
            ModeState::Default { .. } => InteractionMode::Default,
            ModeState::FreehandCrop { .. } => InteractionMode::FreehandCrop,
            ModeState::BoxCrop { .. } => InteractionMode::BoxCrop,
            ModeState::Pan { .. } => InteractionMode::Pan,
            ModeState::Length { .. } => InteractionMode::LengthMeasurement,
            ModeState::Angle { .. } => InteractionMode::AngleMeasurement,
        }
    }
}
