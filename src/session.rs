use nalgebra::{Matrix4, Point3};

use crate::bounding_box::BoundingBox;
use crate::camera::Camera;
use crate::config::EngineOptions;
use crate::contour::{Contour2D, ContourCapture};
use crate::extrusion::ExtrudedSolid;
use crate::geometry;
use crate::grid::VoxelGrid;
use crate::interaction::{
    AngleGesture, BoxWidget, ClipPlane, CropSettings, DragTracker, EngineEvent, InteractionMode,
    LengthGesture, ModeRequest, ModeState, PointerEvent,
};
use crate::masking::{self, MaskValue};
use crate::measurement::{self, MeasurementRecord, SurfacePicker};
use crate::projection::Projector;
use crate::stencil;

/// Live annotation geometry of an in-progress measurement gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeasurementPreview {
    Length {
        points: [Point3<f64>; 2],
        distance_mm: f64,
    },
    Angle {
        points: [Point3<f64>; 3],
        /// `None` while the dragged rays are still degenerate.
        angle_degrees: Option<f64>,
    },
}

/// What a dispatched pointer event asked the session to finish once the mode
/// state borrow is released.
enum Completion {
    Freehand(Option<Contour2D>),
    Length([Point3<f64>; 2]),
    Angle([Point3<f64>; 3]),
    PanEnd,
}

/// Explicit construction of a session's object graph: the working volume,
/// the mask and the box widget all exist before the first gesture, so the
/// event handlers carry no lazy-initialization checks.
#[derive(Debug)]
pub struct SessionBuilder {
    source_volume: VoxelGrid<i16>,
    camera: Camera,
    options: EngineOptions,
}

impl SessionBuilder {
    pub fn new(source_volume: VoxelGrid<i16>, camera: Camera) -> Self {
        SessionBuilder {
            source_volume,
            camera,
            options: EngineOptions::default(),
        }
    }

    pub fn options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the session around the fully materialized source volume.
    ///
    /// The session starts not yet ready: it refuses pointer events and mode
    /// requests until [`EditorSession::mark_ready`] signals that the host's
    /// display pipeline is up.
    ///
    /// # Panics
    /// Panics if the source volume is empty.
    pub fn build(self) -> EditorSession {
        let geometry = *self.source_volume.geometry();
        assert!(
            !geometry.is_empty(),
            "Session requires a non-empty source volume"
        );

        let working_volume = self.source_volume.clone();
        let mask = VoxelGrid::zeroed(geometry);
        let world_to_index = geometry
            .world_to_image_matrix()
            .expect("Volume direction matrix must be invertible");
        let box_widget = BoxWidget::new(
            geometry
                .world_bounds()
                .expect("Non-empty grid has world bounds"),
        );
        let crop_settings = CropSettings {
            operation: self.options.crop.default_operation,
            fill_value: self.options.crop.default_fill_value,
        };

        EditorSession {
            options: self.options,
            camera: self.camera,
            source_volume: self.source_volume,
            working_volume,
            mask,
            world_to_index,
            projector: Projector::new(),
            mode_state: ModeState::initial(),
            crop_settings,
            box_widget,
            measurements: Vec::new(),
            ready: false,
        }
    }
}

/// One editing session over one study/series: owns the pristine source
/// volume, the working volume displayed and edited in place, the cumulative
/// crop mask, the measurement list and the active interaction mode.
///
/// All methods run synchronously on the thread driving the interaction loop;
/// one pointer event is fully processed, including any volume mutation,
/// before the next is accepted.
#[derive(Debug)]
pub struct EditorSession {
    options: EngineOptions,
    camera: Camera,
    source_volume: VoxelGrid<i16>,
    working_volume: VoxelGrid<i16>,
    mask: VoxelGrid<MaskValue>,
    /// World-to-index transform of the mask geometry; recomputed only when
    /// the mask geometry is established, not per rasterization.
    world_to_index: Matrix4<f64>,
    projector: Projector,
    mode_state: ModeState,
    crop_settings: CropSettings,
    box_widget: BoxWidget,
    measurements: Vec<MeasurementRecord>,
    ready: bool,
}

impl EditorSession {
    pub fn builder(source_volume: VoxelGrid<i16>, camera: Camera) -> SessionBuilder {
        SessionBuilder::new(source_volume, camera)
    }

    /// Signals that the host finished materializing and displaying the
    /// volume; edits are accepted from here on.
    pub fn mark_ready(&mut self) {
        self.ready = true;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Replaces the camera snapshot, e.g. after a host-side resize or camera
    /// reset. The projector's clip range cache self-invalidates on the next
    /// query.
    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    pub fn working_volume(&self) -> &VoxelGrid<i16> {
        &self.working_volume
    }

    pub fn mask(&self) -> &VoxelGrid<MaskValue> {
        &self.mask
    }

    pub fn measurements(&self) -> &[MeasurementRecord] {
        &self.measurements
    }

    pub fn clear_measurements(&mut self) {
        self.measurements.clear();
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode_state.mode()
    }

    pub fn crop_settings(&self) -> CropSettings {
        self.crop_settings
    }

    pub fn box_widget(&self) -> &BoxWidget {
        &self.box_widget
    }

    /// Moves the box widget, typically when the host drags a box face.
    pub fn set_box_bounds(&mut self, bounds: BoundingBox) {
        self.box_widget.place(bounds);
    }

    /// The renderer's clipping planes while the box widget is enabled.
    pub fn clip_planes(&self) -> Option<[ClipPlane; 6]> {
        if self.box_widget.enabled() {
            Some(self.box_widget.clip_planes())
        } else {
            None
        }
    }

    /// The in-progress freehand contour, for drawing the preview polyline.
    pub fn contour_preview(&self) -> Option<&ContourCapture> {
        match &self.mode_state {
            ModeState::FreehandCrop { capture } => Some(capture),
            _ => None,
        }
    }

    /// The in-progress measurement annotation, with its live scalar.
    pub fn measurement_preview(&self) -> Option<MeasurementPreview> {
        match &self.mode_state {
            ModeState::Length { gesture } => gesture.preview().map(|points| {
                MeasurementPreview::Length {
                    points,
                    distance_mm: measurement::distance_mm(&points[0], &points[1]),
                }
            }),
            ModeState::Angle { gesture } => gesture.preview().map(|points| {
                MeasurementPreview::Angle {
                    points,
                    angle_degrees: geometry::angle_between_degrees(
                        &(points[0] - points[1]),
                        &(points[2] - points[1]),
                    ),
                }
            }),
            _ => None,
        }
    }

    /// Switches the active interaction mode. Selecting the box crop toggles
    /// the persistent widget instead of consuming the pointer; every other
    /// mode replaces the gesture state wholesale.
    pub fn select_mode(&mut self, request: ModeRequest) -> Vec<EngineEvent> {
        if !self.ready {
            log::warn!("Ignoring mode request before the session is ready");
            return Vec::new();
        }

        let mut events = Vec::new();
        match request {
            ModeRequest::Default => {
                self.mode_state = ModeState::initial();
            }
            ModeRequest::FreehandCrop {
                operation,
                fill_value,
            } => {
                self.crop_settings = CropSettings {
                    operation,
                    fill_value,
                };
                self.mode_state = ModeState::FreehandCrop {
                    capture: ContourCapture::new(),
                };
            }
            ModeRequest::BoxCrop => {
                self.box_widget.toggle();
                events.push(EngineEvent::ClipPlanesChanged);
                self.mode_state = if self.box_widget.enabled() {
                    ModeState::BoxCrop {
                        drag: DragTracker::default(),
                    }
                } else {
                    ModeState::initial()
                };
            }
            ModeRequest::Pan => {
                self.mode_state = ModeState::Pan {
                    drag: DragTracker::default(),
                };
            }
            ModeRequest::LengthMeasurement => {
                self.mode_state = ModeState::Length {
                    gesture: LengthGesture::new(),
                };
            }
            ModeRequest::AngleMeasurement => {
                self.mode_state = ModeState::Angle {
                    gesture: AngleGesture::new(),
                };
            }
        }
        events.push(EngineEvent::ModeChanged);

        events
    }

    /// Routes one pointer event to the active mode's handler. Gestures that
    /// complete revert the session to the default mode.
    pub fn handle_pointer(
        &mut self,
        event: PointerEvent,
        picker: &dyn SurfacePicker,
    ) -> Vec<EngineEvent> {
        if !self.ready {
            log::warn!("Ignoring pointer event before the session is ready");
            return Vec::new();
        }

        let mut events = Vec::new();
        let mut completion = None;

        match &mut self.mode_state {
            ModeState::Default { drag } | ModeState::BoxCrop { drag } => match event {
                PointerEvent::Down(position) => drag.on_down(position),
                PointerEvent::Move(position) => {
                    if let Some((dx, dy)) = drag.on_move(position) {
                        self.camera.rotate(-dx, -dy);
                        events.push(EngineEvent::CameraChanged);
                    }
                }
                PointerEvent::Up(_) => {
                    drag.on_up();
                }
            },

            ModeState::Pan { drag } => match event {
                PointerEvent::Down(position) => drag.on_down(position),
                PointerEvent::Move(position) => {
                    if let Some((dx, dy)) = drag.on_move(position) {
                        self.camera.pan(dx, dy);
                        events.push(EngineEvent::CameraChanged);
                    }
                }
                PointerEvent::Up(_) => {
                    if drag.on_up() {
                        completion = Some(Completion::PanEnd);
                    }
                }
            },

            ModeState::FreehandCrop { capture } => match event {
                PointerEvent::Down(position) => {
                    capture.begin(position);
                    events.push(EngineEvent::ContourPreviewChanged);
                }
                PointerEvent::Move(position) => {
                    if capture.is_dragging() {
                        capture.extend(position);
                        events.push(EngineEvent::ContourPreviewChanged);
                    }
                }
                PointerEvent::Up(position) => {
                    if capture.is_dragging() {
                        completion = Some(Completion::Freehand(capture.finish(position)));
                    }
                }
            },

            ModeState::Length { gesture } => match event {
                PointerEvent::Down(position) => {
                    let picked = match gesture.first() {
                        None => measurement::pick_surface_point(picker, &position, &self.camera),
                        Some(first) => {
                            measurement::pick_constrained(picker, &position, &self.camera, &first)
                        }
                    };
                    match picked {
                        Ok(point) => {
                            gesture.on_down(point);
                            events.push(EngineEvent::MeasurementPreviewChanged);
                        }
                        Err(err) => log::warn!("Dropping measurement click: {}", err),
                    }
                }
                PointerEvent::Move(position) => {
                    if let Some(first) = gesture.first() {
                        match measurement::pick_constrained(picker, &position, &self.camera, &first)
                        {
                            Ok(point) => {
                                gesture.on_move(point);
                                events.push(EngineEvent::MeasurementPreviewChanged);
                            }
                            Err(err) => log::debug!("Dropping measurement move: {}", err),
                        }
                    }
                }
                PointerEvent::Up(_) => {
                    if let Some(points) = gesture.on_up() {
                        completion = Some(Completion::Length(points));
                    }
                }
            },

            ModeState::Angle { gesture } => match event {
                PointerEvent::Down(position) => {
                    let picked = match gesture.first() {
                        None => measurement::pick_surface_point(picker, &position, &self.camera),
                        Some(first) => {
                            measurement::pick_constrained(picker, &position, &self.camera, &first)
                        }
                    };
                    match picked {
                        Ok(point) => {
                            gesture.on_down(point);
                            events.push(EngineEvent::MeasurementPreviewChanged);
                        }
                        Err(err) => log::warn!("Dropping measurement click: {}", err),
                    }
                }
                PointerEvent::Move(position) => {
                    if let Some(first) = gesture.first() {
                        match measurement::pick_constrained(picker, &position, &self.camera, &first)
                        {
                            Ok(point) => {
                                gesture.on_move(point);
                                events.push(EngineEvent::MeasurementPreviewChanged);
                            }
                            Err(err) => log::debug!("Dropping measurement move: {}", err),
                        }
                    }
                }
                PointerEvent::Up(_) => {
                    if let Some(points) = gesture.on_up() {
                        completion = Some(Completion::Angle(points));
                    }
                }
            },
        }

        if let Some(completion) = completion {
            events.extend(self.complete_gesture(completion));
        }

        events
    }

    /// Restores the original samples under the mask and zeroes the mask; the
    /// narrow revert primitive for hosts that only need to undo inside
    /// paints.
    pub fn revert_masked_edits(&mut self) -> Vec<EngineEvent> {
        masking::reset_volume(&mut self.working_volume, &self.source_volume, &mut self.mask);
        vec![EngineEvent::VolumeModified, EngineEvent::MaskModified]
    }

    /// The reset action: full revert to the pristine source data, zeroed
    /// mask, cleared measurements, disabled and re-placed box widget, default
    /// mode.
    pub fn reset(&mut self) -> Vec<EngineEvent> {
        self.working_volume.copy_values_from(&self.source_volume);
        self.mask.fill(0);
        self.measurements.clear();

        if self.box_widget.enabled() {
            self.box_widget.toggle();
        }
        self.box_widget.place(
            self.working_volume
                .geometry()
                .world_bounds()
                .expect("Non-empty grid has world bounds"),
        );

        self.mode_state = ModeState::initial();

        vec![
            EngineEvent::VolumeModified,
            EngineEvent::MaskModified,
            EngineEvent::ClipPlanesChanged,
            EngineEvent::ModeChanged,
        ]
    }

    fn complete_gesture(&mut self, completion: Completion) -> Vec<EngineEvent> {
        let mut events = Vec::new();

        match completion {
            Completion::Freehand(maybe_contour) => {
                if let Some(contour) = maybe_contour {
                    events.extend(self.commit_freehand(&contour));
                }
                events.push(EngineEvent::ContourPreviewChanged);
            }
            Completion::Length(points) => {
                self.measurements.push(MeasurementRecord::length(
                    points,
                    &self.camera,
                    self.options.measurement.label_offset,
                ));
                events.push(EngineEvent::MeasurementAdded);
            }
            Completion::Angle(points) => {
                match MeasurementRecord::angle(
                    points,
                    &self.camera,
                    self.options.measurement.label_offset,
                ) {
                    Some(record) => {
                        self.measurements.push(record);
                        events.push(EngineEvent::MeasurementAdded);
                    }
                    None => log::warn!("Discarding angle measurement with degenerate rays"),
                }
            }
            Completion::PanEnd => (),
        }

        self.mode_state = ModeState::initial();
        events.push(EngineEvent::ModeChanged);

        events
    }

    /// The freehand pipeline: contour → extruded solid → index-space stencil
    /// → cumulative mask → destructive volume paint. Any recoverable
    /// geometric failure aborts with both the volume and the mask untouched.
    fn commit_freehand(&mut self, contour: &Contour2D) -> Vec<EngineEvent> {
        let geometry = *self.working_volume.geometry();

        let clip_range = match self.projector.clip_range(&geometry, &self.camera) {
            Ok(clip_range) => clip_range,
            Err(err) => {
                log::warn!("Aborting freehand crop: {}", err);
                return Vec::new();
            }
        };

        let solid = match ExtrudedSolid::from_contour(contour, &self.camera, &clip_range) {
            Ok(solid) => solid,
            Err(err) => {
                log::warn!("Aborting freehand crop: {}", err);
                return Vec::new();
            }
        };

        let stencil = stencil::rasterize_solid(&solid.transformed(&self.world_to_index), &geometry);
        if log::log_enabled!(log::Level::Debug) {
            let stenciled = stencil.values().iter().filter(|v| **v == 1).count();
            log::debug!(
                "Freehand stencil covers {} of {} voxels",
                stenciled,
                geometry.voxel_count()
            );
        }

        stencil::merge_stencil(&mut self.mask, &stencil);
        masking::apply_mask(
            &mut self.working_volume,
            &self.mask,
            self.crop_settings.operation,
            self.crop_settings.fill_value,
        );

        vec![EngineEvent::MaskModified, EngineEvent::VolumeModified]
    }
}
