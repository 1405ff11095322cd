use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use crate::error::BrukerError;
use crate::jcamp::ParamFile;

pub const SUBJECT_FILE:&str = "subject";
pub const ACQP_FILE:&str = "acqp";
pub const METHOD_FILE:&str = "method";
pub const RECO_FILE:&str = "reco";
pub const VISU_PARS_FILE:&str = "visu_pars";
pub const IMAGE_FILE:&str = "2dseq";

#[derive(Debug)]
pub struct BrukerStudy {
    dir:PathBuf,
    subject:Option<ParamFile>,
    scans:Vec<Scan>,
}

#[derive(Debug)]
pub struct Scan {
    pub number:u32,
    pub dir:PathBuf,
    pub acqp:Option<ParamFile>,
    pub method:Option<ParamFile>,
    pub reconstructions:Vec<Reconstruction>,
}

#[derive(Debug)]
pub struct Reconstruction {
    pub number:u32,
    pub dir:PathBuf,
    pub visu_pars:ParamFile,
    pub reco:Option<ParamFile>,
}

impl Reconstruction {
    pub fn image_file(&self) -> PathBuf {
        self.dir.join(IMAGE_FILE)
    }

    fn open(number:u32,dir:&Path) -> Result<Option<Self>,BrukerError> {
        if !dir.join(IMAGE_FILE).is_file() || !dir.join(VISU_PARS_FILE).is_file() {
            debug!("skipping {:?}: no {} with {}",dir,IMAGE_FILE,VISU_PARS_FILE);
            return Ok(None);
        }
        Ok(Some(Self {
            number,
            dir:dir.to_owned(),
            visu_pars:ParamFile::from_file(&dir.join(VISU_PARS_FILE))?,
            reco:ParamFile::open_optional(&dir.join(RECO_FILE))?,
        }))
    }
}

impl Scan {

    fn open(number:u32,dir:&Path) -> Result<Option<Self>,BrukerError> {
        let pdata = dir.join("pdata");
        if !dir.join(ACQP_FILE).is_file() && !pdata.is_dir() {
            return Ok(None);
        }
        let mut reconstructions = Vec::<Reconstruction>::new();
        if pdata.is_dir() {
            for (n,reco_dir) in utils::numbered_dirs(&pdata)? {
                if let Some(r) = Reconstruction::open(n,&reco_dir)? {
                    reconstructions.push(r);
                }
            }
        }
        Ok(Some(Self {
            number,
            dir:dir.to_owned(),
            acqp:ParamFile::open_optional(&dir.join(ACQP_FILE))?,
            method:ParamFile::open_optional(&dir.join(METHOD_FILE))?,
            reconstructions,
        }))
    }

    /// name of the method (pulse program), e.g. Bruker:RARE
    pub fn method_name(&self) -> Option<String> {
        self.method.as_ref().and_then(|m| m.text("Method").ok())
            .or_else(|| self.acqp.as_ref().and_then(|a| a.text("ACQ_method").ok()))
    }

    pub fn is_diffusion_weighted(&self) -> bool {
        self.method.as_ref().is_some_and(|m| m.has("PVM_DwEffBval"))
    }
}

impl BrukerStudy {

    /// probe the study folder and parse every parameter file it holds
    pub fn open(dir:&Path) -> Result<Self,BrukerError> {
        if !dir.is_dir() {
            return Err(BrukerError::SourceMissing(dir.to_owned()));
        }
        let subject = ParamFile::open_optional(&dir.join(SUBJECT_FILE))?;
        if subject.is_none() {
            warn!("no {} file in {:?}",SUBJECT_FILE,dir);
        }
        let mut scans = Vec::<Scan>::new();
        for (n,scan_dir) in utils::numbered_dirs(dir)? {
            match Scan::open(n,&scan_dir)? {
                Some(scan) if !scan.reconstructions.is_empty() => scans.push(scan),
                Some(_) => warn!("scan {} has no reconstructed images ... skipping",n),
                None => {}
            }
        }
        if scans.is_empty() {
            return Err(BrukerError::NoScans(dir.to_owned()));
        }
        debug!("found {} scans in {:?}",scans.len(),dir);
        Ok(Self {
            dir:dir.to_owned(),
            subject,
            scans,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn scans(&self) -> &[Scan] {
        &self.scans
    }

    pub fn subject(&self) -> Option<&ParamFile> {
        self.subject.as_ref()
    }

    pub fn subject_id(&self) -> Option<String> {
        self.subject.as_ref().and_then(|s| s.text("SUBJECT_id").ok())
    }

    /// subject study name, else the folder name
    pub fn default_study_name(&self) -> String {
        self.subject.as_ref()
            .and_then(|s| s.text("SUBJECT_study_name").ok())
            .filter(|name| !name.trim().is_empty())
            .map(|name| name.trim().replace(' ',"_"))
            .unwrap_or_else(|| {
                self.dir.file_name().map(|f| f.to_string_lossy().to_string()).unwrap_or_else(|| String::from("study"))
            })
    }

    pub fn n_reconstructions(&self) -> usize {
        self.scans.iter().map(|s| s.reconstructions.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{create_dir_all, write};

    fn touch_reco(dir:&Path) {
        create_dir_all(dir).unwrap();
        write(dir.join(VISU_PARS_FILE),"##$VisuCoreWordType=_16BIT_SGN_INT\n##END=\n").unwrap();
        write(dir.join(IMAGE_FILE),[0u8;4]).unwrap();
    }

    #[test]
    fn discovers_scans_and_reconstructions(){
        let tmp = tempfile::tempdir().unwrap();
        let study = tmp.path().join("20180312_mouse01");
        create_dir_all(&study).unwrap();
        write(study.join(SUBJECT_FILE),"##$SUBJECT_study_name=( 64 )\n<fmri pilot>\n##$SUBJECT_id=( 64 )\n<M01>\n##END=\n").unwrap();
        touch_reco(&study.join("10/pdata/1"));
        touch_reco(&study.join("2/pdata/2"));
        touch_reco(&study.join("2/pdata/1"));
        create_dir_all(study.join("3/pdata/1")).unwrap();
        write(study.join("3/acqp"),"##$ACQ_method=<Bruker:FLASH>\n##END=\n").unwrap();
        create_dir_all(study.join("AdjResult")).unwrap();

        let s = BrukerStudy::open(&study).unwrap();
        let numbers:Vec<u32> = s.scans().iter().map(|s| s.number).collect();
        assert_eq!(numbers,vec![2,10]);
        let recos:Vec<u32> = s.scans()[0].reconstructions.iter().map(|r| r.number).collect();
        assert_eq!(recos,vec![1,2]);
        assert_eq!(s.n_reconstructions(),3);
        assert_eq!(s.default_study_name(),"fmri_pilot");
        assert_eq!(s.subject_id().as_deref(),Some("M01"));
    }

    #[test]
    fn study_name_falls_back_to_folder(){
        let tmp = tempfile::tempdir().unwrap();
        let study = tmp.path().join("CM033.zJ1");
        touch_reco(&study.join("1/pdata/1"));
        assert_eq!(BrukerStudy::open(&study).unwrap().default_study_name(),"CM033.zJ1");
    }

    #[test]
    fn empty_and_missing_studies_fail(){
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(BrukerStudy::open(&tmp.path().join("missing")),Err(BrukerError::SourceMissing(_))));
        assert!(matches!(BrukerStudy::open(tmp.path()),Err(BrukerError::NoScans(_))));
    }

    #[test]
    fn diffusion_is_detected_from_method(){
        let tmp = tempfile::tempdir().unwrap();
        let study = tmp.path().join("dwi");
        touch_reco(&study.join("5/pdata/1"));
        write(study.join("5/method"),"##$Method=<Bruker:DtiEpi>\n##$PVM_DwEffBval=( 2 )\n0 1000\n##END=\n").unwrap();
        let s = BrukerStudy::open(&study).unwrap();
        assert!(s.scans()[0].is_diffusion_weighted());
        assert_eq!(s.scans()[0].method_name().as_deref(),Some("Bruker:DtiEpi"));
    }
}
