pub mod error;
pub mod converter;
pub mod bruker_backend;
pub mod convert_config;

pub use bruker_backend::{BrukerBackend, BrukerConversion};
pub use converter::{ConverterBackend, LoadTiming, StudyConversion, StudyConverter, StudyJob};
pub use error::ConvertError;
