use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use ndarray::{Array4, Axis, ShapeBuilder};
use nifti::NiftiHeader;
use nifti::writer::WriterOptions;
use tracing::{debug, info};
use headfile::headfile::{ConversionHeadfileParams, Headfile};
use crate::error::BrukerError;
use crate::geometry::Geometry;
use crate::jcamp::ParamFile;
use crate::study::{BrukerStudy, Reconstruction, Scan};
use crate::two_dseq::{self, Endian, FrameLayout, WordType};

#[derive(Clone,Debug,PartialEq)]
pub struct ConversionOptions {
    /// write .nii.gz instead of .nii
    pub compress:bool,
    pub correct_slope:bool,
    pub correct_offset:bool,
    pub sample_upside_down:bool,
    pub sform_code:i16,
    /// json dumps of acqp, method, reco and visu_pars
    pub save_parameters:bool,
    pub save_headfile:bool,
    /// b-values and gradient directions of diffusion scans
    pub save_b_table:bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            compress: true,
            correct_slope: true,
            correct_offset: true,
            sample_upside_down: false,
            sform_code: 2,
            save_parameters: true,
            save_headfile: true,
            save_b_table: true,
        }
    }
}

impl ConversionOptions {
    fn nifti_ext(&self) -> &'static str {
        match self.compress {
            true => "nii.gz",
            false => "nii"
        }
    }
}

#[derive(Clone,Debug,Default)]
pub struct ExportReport {
    pub study_dir:PathBuf,
    pub volumes:Vec<PathBuf>,
}

/// Writes every reconstruction of a study to `<destination>/<study_name>/`.
pub struct StudyExporter<'a> {
    study:&'a BrukerStudy,
    destination:PathBuf,
    study_name:String,
    options:ConversionOptions,
}

impl<'a> StudyExporter<'a> {

    pub fn new(study:&'a BrukerStudy,destination:&Path,study_name:&str,options:ConversionOptions) -> Self {
        Self {
            study,
            destination:destination.to_owned(),
            study_name:study_name.to_string(),
            options,
        }
    }

    pub fn study_dir(&self) -> PathBuf {
        self.destination.join(&self.study_name)
    }

    /// `<study>_<scan>`, with `_<reco>` appended when a scan has several reconstructions
    pub fn output_name(&self,scan:&Scan,reco:&Reconstruction) -> String {
        match scan.reconstructions.len() > 1 {
            true => format!("{}_{}_{}",self.study_name,scan.number,reco.number),
            false => format!("{}_{}",self.study_name,scan.number)
        }
    }

    pub fn export(&self) -> Result<ExportReport,BrukerError> {
        let study_dir = self.study_dir();
        create_dir_all(&study_dir)?;
        info!("converting {:?} to {:?}",self.study.dir(),study_dir);

        if self.options.save_parameters {
            if let Some(subject) = self.study.subject() {
                write_text(&study_dir.join("subject.json"),&subject.to_json()?)?;
            }
        }

        let mut report = ExportReport {
            study_dir:study_dir.clone(),
            volumes:vec![],
        };
        for scan in self.study.scans() {
            for reco in scan.reconstructions.iter() {
                let name = self.output_name(scan,reco);
                let out_dir = study_dir.join(&name);
                create_dir_all(&out_dir)?;
                let nii = self.write_volume(scan,reco,&out_dir,&name)?;
                if self.options.save_parameters {
                    self.write_parameters(scan,reco,&out_dir,&name)?;
                }
                if self.options.save_b_table && scan.is_diffusion_weighted() {
                    self.write_b_table(scan,&out_dir,&name)?;
                }
                info!("scan {} reco {} -> {:?}",scan.number,reco.number,nii);
                report.volumes.push(nii);
            }
        }
        Ok(report)
    }

    fn write_volume(&self,scan:&Scan,reco:&Reconstruction,out_dir:&Path,name:&str) -> Result<PathBuf,BrukerError> {
        let visu = &reco.visu_pars;
        let word = WordType::from_visu(visu)?;
        let endian = Endian::from_visu(visu)?;
        let layout = FrameLayout::from_visu(visu)?;
        debug!("{:?}: {:?} {:?} {:?}",reco.dir,word,endian,layout);

        let mut data = two_dseq::read_frames(&reco.image_file(),word,endian,&layout)?;
        let (slopes,offsets) = two_dseq::slope_params(visu)?;
        two_dseq::apply_slope(&mut data,layout.frame_len(),&slopes,&offsets,self.options.correct_slope,self.options.correct_offset);

        let mut vol = two_dseq::to_volume(data,&layout)?;
        let mut geometry = Geometry::from_visu(visu,&layout)?;
        if self.options.sample_upside_down {
            vol = flip_slices(vol)?;
            geometry.flip_slices(vol.dim().2);
        }

        let mut header = NiftiHeader::default();
        geometry.apply_to(&mut header,self.options.sform_code);

        let nii = out_dir.join(format!("{}.{}",name,self.options.nifti_ext()));
        let nii_writer = WriterOptions::new(&nii).reference_header(&header);
        let (_,_,_,t) = vol.dim();
        match t {
            1 => nii_writer.write_nifti(&vol.index_axis(Axis(3),0))?,
            _=> nii_writer.write_nifti(&vol)?
        }

        if self.options.save_headfile {
            let (x,y,z,t) = vol.dim();
            let params = ConversionHeadfileParams {
                study_name:self.study_name.clone(),
                subject_id:self.study.subject_id(),
                scan:scan.number,
                reconstruction:reco.number,
                source:reco.dir.clone(),
                output:nii.clone(),
                method:scan.method_name(),
                dims:vec![x,y,z,t],
                voxel_size_mm:geometry.voxel_size.map(|v| v as f32),
                word_type:word.print(),
                slope_corrected:self.options.correct_slope,
            };
            let hf = Headfile::open(&out_dir.join(format!("{}.headfile",name)))?;
            hf.append(&params.to_hash())?;
            debug!("updated {:?}",hf.path());
        }
        Ok(nii)
    }

    fn write_parameters(&self,scan:&Scan,reco:&Reconstruction,out_dir:&Path,name:&str) -> Result<(),BrukerError> {
        let files:[(&str,Option<&ParamFile>);4] = [
            ("acqp",scan.acqp.as_ref()),
            ("method",scan.method.as_ref()),
            ("reco",reco.reco.as_ref()),
            ("visu_pars",Some(&reco.visu_pars)),
        ];
        for (label,params) in files {
            if let Some(p) = params {
                write_text(&out_dir.join(format!("{}_{}.json",name,label)),&p.to_json()?)?;
            }
        }
        Ok(())
    }

    fn write_b_table(&self,scan:&Scan,out_dir:&Path,name:&str) -> Result<(),BrukerError> {
        let method = match scan.method.as_ref() {
            Some(m) => m,
            None => return Ok(())
        };
        let b_vals = method.f64s("PVM_DwEffBval")?;
        let txt:String = b_vals.iter().map(|b| format!("{}\n",b)).collect();
        write_text(&out_dir.join(format!("{}_DwEffBval.txt",name)),&txt)?;

        if method.has("PVM_DwGradVec") {
            let grad = method.f64s("PVM_DwGradVec")?;
            let txt:String = grad.chunks(3).map(|g| format!("{}\n",utils::vec_to_string(g))).collect();
            write_text(&out_dir.join(format!("{}_DwGradVec.txt",name)),&txt)?;
        }
        debug!("wrote b-table with {} entries for scan {}",b_vals.len(),scan.number);
        Ok(())
    }
}

/// reverse the slice axis, keeping the column-major layout the nifti writer expects
fn flip_slices(mut vol:Array4<f32>) -> Result<Array4<f32>,BrukerError> {
    vol.invert_axis(Axis(2));
    let flat:Vec<f32> = vol.t().iter().copied().collect();
    Ok(Array4::from_shape_vec(vol.raw_dim().f(),flat)?)
}

fn write_text(path:&Path,text:&str) -> Result<(),BrukerError> {
    let mut f = File::create(path)?;
    f.write_all(text.as_bytes())?;
    Ok(())
}
