use std::error;
use std::fmt;
use std::fs::File;
use std::io::prelude::*;
use std::io::{self, BufReader};
use std::path::Path;

use serde::Serialize;

use crate::camera::CameraOptions;
use crate::masking::MaskOperation;

pub const DEFAULT_OPTIONS_FILENAME: &str = "voxel_scalpel.ron";

/// Default crop parameters used when the mode-select trigger supplies none.
/// -1000 HU is air.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CropOptions {
    pub default_operation: MaskOperation,
    pub default_fill_value: i16,
}

impl Default for CropOptions {
    fn default() -> Self {
        CropOptions {
            default_operation: MaskOperation::Inside,
            default_fill_value: -1000,
        }
    }
}

/// Annotation placement parameters for measurement labels and arcs.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MeasurementOptions {
    /// Display-space offset of a label from its anchor, in pixels.
    pub label_offset: [f64; 2],
    /// Number of segments in an angle annotation arc.
    pub arc_resolution: u32,
}

impl Default for MeasurementOptions {
    fn default() -> Self {
        MeasurementOptions {
            label_offset: [10.0, 10.0],
            arc_resolution: 30,
        }
    }
}

/// All tunable engine parameters, loadable from a RON file next to the host
/// application.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct EngineOptions {
    pub camera: CameraOptions,
    pub crop: CropOptions,
    pub measurement: MeasurementOptions,
}

#[derive(Debug)]
pub enum OptionsError {
    SerializingError(ron::ser::Error),
    DeserializingError(ron::de::Error),
    FileNotFound,
    PermissionDenied,
    UnexpectedError,
}

impl error::Error for OptionsError {}

impl fmt::Display for OptionsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OptionsError::SerializingError(err) => write!(
                f,
                "An error occurred while serializing the options file: {}",
                err
            ),
            OptionsError::DeserializingError(err) => write!(
                f,
                "An error occurred while deserializing the options file: {}",
                err
            ),
            OptionsError::FileNotFound => write!(f, "File was not found."),
            OptionsError::PermissionDenied => {
                write!(f, "Permission denied while accessing the file.")
            }
            OptionsError::UnexpectedError => write!(f, "An unexpected error occurred."),
        }
    }
}

impl From<ron::ser::Error> for OptionsError {
    fn from(err: ron::ser::Error) -> Self {
        OptionsError::SerializingError(err)
    }
}

impl From<ron::de::Error> for OptionsError {
    fn from(err: ron::de::Error) -> Self {
        OptionsError::DeserializingError(err)
    }
}

impl From<io::Error> for OptionsError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => OptionsError::FileNotFound,
            io::ErrorKind::PermissionDenied => OptionsError::PermissionDenied,
            _ => OptionsError::UnexpectedError,
        }
    }
}

pub fn save<P: AsRef<Path>>(path: P, options: &EngineOptions) -> Result<(), OptionsError> {
    let pretty_config = ron::ser::PrettyConfig::default();
    let mut serializer = ron::ser::Serializer::new(Some(pretty_config), true);
    options.serialize(&mut serializer)?;

    let contents = serializer.into_output_string();
    let mut file = File::create(path)?;

    file.write_all(contents.as_bytes())?;

    Ok(())
}

pub fn open<P: AsRef<Path>>(path: P) -> Result<EngineOptions, OptionsError> {
    let file = File::open(path)?;
    let buf_reader = BufReader::new(file);
    let options = ron::de::from_reader(buf_reader)?;

    Ok(options)
}

/// Loads options from the given path, falling back to defaults when the file
/// is missing or invalid.
pub fn open_or_default<P: AsRef<Path>>(path: P) -> EngineOptions {
    match open(&path) {
        Ok(options) => options,
        Err(OptionsError::FileNotFound) => EngineOptions::default(),
        Err(err) => {
            log::warn!("Falling back to default engine options: {}", err);
            EngineOptions::default()
        }
    }
}
