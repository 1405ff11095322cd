use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path,PathBuf};
use tracing::debug;

pub type HeadfileHash = BTreeMap<String,String>;

/// Plain text key=value summary written next to each converted volume.
pub struct Headfile{
    file:PathBuf
}

impl Headfile{

    pub fn new(file_path:&Path) -> io::Result<Self> {
        File::create(file_path)?;
        Ok(Self {
            file:file_path.to_owned()
        })
    }

    pub fn open(file_path:&Path) -> io::Result<Self> {
        match file_path.exists() {
            false => Headfile::new(file_path),
            true => Ok(Self{
                file:file_path.to_owned()
            })
        }
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    pub fn read(&self) -> io::Result<HeadfileHash> {
        let mut f = File::open(&self.file)?;
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        Ok(Self::txt_to_hash(&s))
    }

    /// merge hash into the file contents. Keys already present are overwritten.
    pub fn append(&self,hash:&HeadfileHash) -> io::Result<()> {
        let h1 = Self::merge(self.read()?,hash.clone());
        let txt = Self::hash_to_txt(&h1);
        let mut f = File::create(&self.file)?;
        f.write_all(txt.as_bytes())?;
        debug!("wrote {} fields to {:?}",h1.len(),self.file);
        Ok(())
    }

    fn merge(map1:HeadfileHash,map2:HeadfileHash) -> HeadfileHash {
        map1.into_iter().chain(map2).collect()
    }

    pub fn hash_to_txt(hash:&HeadfileHash) -> String {
        let mut strbuf = String::new();
        for (key, val) in hash.iter() {
            strbuf.push_str(key);
            strbuf.push('=');
            strbuf.push_str(val);
            strbuf.push('\n');
        }
        strbuf
    }

    fn txt_to_hash(headfile_str:&str) -> HeadfileHash{
        let mut hf = HeadfileHash::new();
        headfile_str.lines().for_each(|line|{
            // split on the first = we find
            if let Some((key,val)) = line.split_once('=') {
                hf.insert(key.to_string(),val.to_string());
            }
        });
        hf
    }

}

pub struct ConversionHeadfileParams {
    pub study_name:String,
    pub subject_id:Option<String>,
    pub scan:u32,
    pub reconstruction:u32,
    pub source:PathBuf,
    pub output:PathBuf,
    pub method:Option<String>,
    pub dims:Vec<usize>,
    pub voxel_size_mm:[f32;3],
    pub word_type:String,
    pub slope_corrected:bool,
}

impl ConversionHeadfileParams {
    pub fn to_hash(&self) -> HeadfileHash {
        let mut h = HeadfileHash::new();
        h.insert(String::from("U_study_name"),self.study_name.clone());
        h.insert(String::from("U_specid"),self.subject_id.clone().unwrap_or_default());
        h.insert(String::from("U_scan"),self.scan.to_string());
        h.insert(String::from("U_reco"),self.reconstruction.to_string());
        h.insert(String::from("source_directory"),self.source.to_string_lossy().to_string());
        h.insert(String::from("output_file"),self.output.to_string_lossy().to_string());
        h.insert(String::from("S_PSDname"),self.method.clone().unwrap_or_default());
        ["dim_X","dim_Y","dim_Z","dim_T"].iter().enumerate().for_each(|(i,key)|{
            h.insert(key.to_string(),self.dims.get(i).copied().unwrap_or(1).to_string());
        });
        h.insert(String::from("vox_X"),self.voxel_size_mm[0].to_string());
        h.insert(String::from("vox_Y"),self.voxel_size_mm[1].to_string());
        h.insert(String::from("vox_Z"),self.voxel_size_mm[2].to_string());
        h.insert(String::from("word_type"),self.word_type.clone());
        h.insert(String::from("slope_corrected"),self.slope_corrected.to_string());
        h
    }
}
