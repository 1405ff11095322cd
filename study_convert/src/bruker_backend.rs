use bruker_data::{BrukerStudy, ConversionOptions, ExportReport, StudyExporter};
use tracing::info;
use crate::converter::{ConverterBackend, StudyConversion, StudyJob};
use crate::error::ConvertError;

/// Opens Bruker ParaVision study folders as converter handles.
#[derive(Clone,Debug,Default)]
pub struct BrukerBackend {
    options:ConversionOptions,
}

impl BrukerBackend {
    pub fn new(options:ConversionOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }
}

impl ConverterBackend for BrukerBackend {
    type Handle = BrukerConversion;

    fn open(&self,job:&StudyJob) -> Result<BrukerConversion,ConvertError> {
        info!("loading study {:?}",job.source);
        let study = BrukerStudy::open(&job.source)?;
        info!("found {} scans with {} reconstructions",study.scans().len(),study.n_reconstructions());
        Ok(BrukerConversion {
            job:job.clone(),
            study,
            options:self.options.clone(),
            last_report:None,
        })
    }
}

pub struct BrukerConversion {
    job:StudyJob,
    study:BrukerStudy,
    options:ConversionOptions,
    last_report:Option<ExportReport>,
}

impl BrukerConversion {
    pub fn study(&self) -> &BrukerStudy {
        &self.study
    }

    /// the job's study name, or the name recorded in the study when it is empty
    pub fn study_name(&self) -> String {
        match self.job.study_name.trim().is_empty() {
            true => self.study.default_study_name(),
            false => self.job.study_name.clone()
        }
    }

    pub fn last_report(&self) -> Option<&ExportReport> {
        self.last_report.as_ref()
    }
}

impl StudyConversion for BrukerConversion {
    fn job(&self) -> &StudyJob {
        &self.job
    }

    fn convert(&mut self) -> Result<(),ConvertError> {
        let name = self.study_name();
        let exporter = StudyExporter::new(&self.study,&self.job.destination,&name,self.options.clone());
        let report = exporter.export()?;
        info!("wrote {} volumes to {:?}",report.volumes.len(),report.study_dir);
        self.last_report = Some(report);
        Ok(())
    }
}
