//! Study conversion job: three configuration values plus a lazily created
//! converter handle.
//!
//! The handle is produced by a [`ConverterBackend`] from the job configuration
//! and is the only route to conversion. It is absent until [`StudyConverter::load`]
//! runs, either explicitly or during construction with [`LoadTiming::Eager`].
//! Whether repeated conversions are idempotent is up to the backend.

use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::error::ConvertError;

#[derive(Clone,Debug,PartialEq,Eq,Serialize,Deserialize)]
pub struct StudyJob {
    pub source:PathBuf,
    pub destination:PathBuf,
    pub study_name:String,
}

impl StudyJob {
    pub fn new(source:impl Into<PathBuf>,destination:impl Into<PathBuf>,study_name:impl Into<String>) -> Self {
        Self {
            source:source.into(),
            destination:destination.into(),
            study_name:study_name.into(),
        }
    }
}

/// when the converter handle is created
#[derive(Clone,Copy,Debug,Default,PartialEq,Eq,Serialize,Deserialize)]
pub enum LoadTiming {
    /// on the first explicit load()
    #[default]
    Lazy,
    /// as part of construction
    Eager,
}

/// a materialized converter bound to one job
pub trait StudyConversion {
    fn job(&self) -> &StudyJob;
    fn convert(&mut self) -> Result<(),ConvertError>;
}

/// constructs converter handles from job configuration
pub trait ConverterBackend {
    type Handle:StudyConversion;
    fn open(&self,job:&StudyJob) -> Result<Self::Handle,ConvertError>;
}

pub struct StudyConverter<B:ConverterBackend> {
    job:StudyJob,
    backend:B,
    handle:Option<B::Handle>,
}

impl<B:ConverterBackend> StudyConverter<B> {

    pub fn new(job:StudyJob,backend:B,timing:LoadTiming) -> Result<Self,ConvertError> {
        let mut converter = Self {
            job,
            backend,
            handle:None,
        };
        if timing == LoadTiming::Eager {
            converter.load()?;
        }
        Ok(converter)
    }

    /// build a new handle from the job configuration, replacing any previous one.
    /// The previous handle is dropped even if the backend fails.
    pub fn load(&mut self) -> Result<&mut B::Handle,ConvertError> {
        if self.handle.take().is_some() {
            debug!("replacing converter handle for {}",self.job.study_name);
        }
        let handle = self.backend.open(&self.job)?;
        Ok(self.handle.insert(handle))
    }

    pub fn convert(&mut self) -> Result<(),ConvertError> {
        match self.handle.as_mut() {
            Some(handle) => handle.convert(),
            None => Err(ConvertError::NotLoaded{study_name:self.job.study_name.clone()})
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle(&self) -> Option<&B::Handle> {
        self.handle.as_ref()
    }

    pub fn job(&self) -> &StudyJob {
        &self.job
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}
