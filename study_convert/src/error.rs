use std::path::PathBuf;
use bruker_data::BrukerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    /// convert() was called before the converter resource was loaded
    #[error("converter for study '{study_name}' is not loaded; call load() before convert()")]
    NotLoaded { study_name: String },

    #[error(transparent)]
    Bruker(#[from] BrukerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config {path:?}: {source}")]
    ConfigRead { path: PathBuf, source: toml::de::Error },

    #[error("cannot serialize config: {0}")]
    ConfigWrite(#[from] toml::ser::Error),
}
