use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use bruker_data::ConversionOptions;
use crate::bruker_backend::BrukerBackend;
use crate::converter::{ConverterBackend, LoadTiming, StudyConverter, StudyJob};
use crate::error::ConvertError;

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct ConversionSettings {
    pub compress:bool,
    pub correct_slope:bool,
    pub correct_offset:bool,
    pub sample_upside_down:bool,
    pub sform_code:i16,
    pub save_parameters:bool,
    pub save_headfile:bool,
    pub save_b_table:bool,
}

impl Config for ConversionSettings {
    fn default() -> Self {
        ConversionOptions::default().into()
    }
}

impl From<ConversionOptions> for ConversionSettings {
    fn from(o:ConversionOptions) -> Self {
        Self {
            compress: o.compress,
            correct_slope: o.correct_slope,
            correct_offset: o.correct_offset,
            sample_upside_down: o.sample_upside_down,
            sform_code: o.sform_code,
            save_parameters: o.save_parameters,
            save_headfile: o.save_headfile,
            save_b_table: o.save_b_table,
        }
    }
}

impl ConversionSettings {
    pub fn options(&self) -> ConversionOptions {
        ConversionOptions {
            compress: self.compress,
            correct_slope: self.correct_slope,
            correct_offset: self.correct_offset,
            sample_upside_down: self.sample_upside_down,
            sform_code: self.sform_code,
            save_parameters: self.save_parameters,
            save_headfile: self.save_headfile,
            save_b_table: self.save_b_table,
        }
    }
}

impl ConfigFile for ConversionSettings {
    fn file_ext() -> String {
        String::from("conversion_settings")
    }
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct StudyJobConfig {
    pub source:PathBuf,
    pub destination:PathBuf,
    /// leave empty to use the study name recorded by the scanner
    #[serde(default)]
    pub study_name:String,
    #[serde(default)]
    pub load_timing:LoadTiming,
}

impl StudyJobConfig {
    pub fn job(&self) -> StudyJob {
        StudyJob::new(&self.source,&self.destination,&self.study_name)
    }
}

/// a list of studies to convert with shared settings
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct ConversionPlan {
    pub settings:ConversionSettings,
    pub jobs:Vec<StudyJobConfig>,
}

impl Config for ConversionPlan {
    fn default() -> Self {
        Self {
            settings: ConversionSettings::default(),
            jobs: vec![
                StudyJobConfig {
                    source: PathBuf::from("/data/CM033.zJ1"),
                    destination: PathBuf::from("/data/nifti"),
                    study_name: String::from("CM033"),
                    load_timing: LoadTiming::Lazy,
                }
            ],
        }
    }
}

impl ConfigFile for ConversionPlan {
    fn file_ext() -> String {
        String::from("conversion_plan")
    }
}

impl ConversionPlan {

    pub fn run(&self) -> Result<Vec<StudyJob>,ConvertError> {
        self.run_with(BrukerBackend::new(self.settings.options()))
    }

    /// convert every job in order, stopping at the first failure.
    /// Returns the completed jobs.
    pub fn run_with<B:ConverterBackend + Clone>(&self,backend:B) -> Result<Vec<StudyJob>,ConvertError> {
        let mut done = Vec::<StudyJob>::new();
        for (i,job_config) in self.jobs.iter().enumerate() {
            info!("job {} of {}: {:?}",i+1,self.jobs.len(),job_config.source);
            let result = StudyConverter::new(job_config.job(),backend.clone(),job_config.load_timing)
                .and_then(|mut converter| {
                    if !converter.is_loaded() {
                        converter.load()?;
                    }
                    converter.convert()?;
                    Ok(converter.job().clone())
                });
            match result {
                Ok(job) => done.push(job),
                Err(e) => {
                    error!("job {} failed after {} completed",i+1,done.len());
                    return Err(e);
                }
            }
        }
        Ok(done)
    }
}

pub trait Config {
    fn default() -> Self;
}

pub trait ConfigFile:Serialize + for<'de> Deserialize<'de> {

    fn file_ext() -> String;

    fn to_file(&self,filename:&Path) -> Result<(),ConvertError> {
        let t = toml::to_string_pretty(&self)?;
        utils::write_to_file(filename,&Self::file_ext(),&t)?;
        Ok(())
    }

    fn from_file(filename:&Path) -> Result<Self,ConvertError> {
        let t = utils::read_to_string(filename,&Self::file_ext())?;
        toml::from_str(&t).map_err(|source| ConvertError::ConfigRead{
            path:filename.with_extension(Self::file_ext()),
            source
        })
    }

    fn exists(filename:&Path) -> bool {
        filename.with_extension(Self::file_ext()).exists()
    }
}
