//! Reading of Bruker ParaVision study directories and export of their
//! reconstructions to NIfTI-1.
//!
//! A study folder holds an optional `subject` parameter file and numbered scan
//! directories. Each scan holds `acqp`/`method` parameter files and numbered
//! reconstructions under `pdata/`, each with a `2dseq` image file described by
//! its `visu_pars`.

pub mod error;
pub mod jcamp;
pub mod study;
pub mod two_dseq;
pub mod geometry;
pub mod export;

pub use error::BrukerError;
pub use export::{ConversionOptions, ExportReport, StudyExporter};
pub use study::BrukerStudy;
