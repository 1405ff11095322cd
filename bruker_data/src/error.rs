use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrukerError {
    #[error("study folder {0:?} does not exist or is not a directory")]
    SourceMissing(PathBuf),

    #[error("no reconstructed scans found in {0:?}")]
    NoScans(PathBuf),

    #[error("parameter {name} not found in {file}")]
    MissingParameter { name: String, file: String },

    #[error("parameter {name} in {file} is malformed: {value}")]
    MalformedParameter { name: String, file: String, value: String },

    #[error("unsupported word type {0}")]
    UnsupportedWordType(String),

    #[error("unsupported byte order {0}")]
    UnsupportedByteOrder(String),

    #[error("{path:?} holds {found} bytes but the frame layout needs {expected}")]
    DataSize { path: PathBuf, expected: usize, found: usize },

    #[error("frame groups describe {described} frames but VisuCoreFrameCount is {count}")]
    FrameCount { described: usize, count: usize },

    #[error("cannot shape image data: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("NIfTI error: {0}")]
    Nifti(#[from] nifti::NiftiError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
