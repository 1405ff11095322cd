use std::fs;
use std::path::Path;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use ndarray::{Array4, ArrayD, IxDyn, ShapeBuilder};
use crate::error::BrukerError;
use crate::jcamp::ParamFile;

pub const SLICE_GROUP:&str = "FG_SLICE";

#[derive(Clone,Copy,Debug,PartialEq)]
pub enum WordType {
    U8,
    I16,
    I32,
    F32,
}

impl WordType {
    pub fn from_visu(visu:&ParamFile) -> Result<Self,BrukerError> {
        let w = visu.text("VisuCoreWordType")?;
        match w.as_str() {
            "_8BIT_UNSGN_INT" => Ok(WordType::U8),
            "_16BIT_SGN_INT" => Ok(WordType::I16),
            "_32BIT_SGN_INT" => Ok(WordType::I32),
            "_32BIT_FLOAT" => Ok(WordType::F32),
            _=> Err(BrukerError::UnsupportedWordType(w))
        }
    }

    pub fn n_bytes(&self) -> usize {
        match self {
            WordType::U8 => 1,
            WordType::I16 => 2,
            WordType::I32 | WordType::F32 => 4,
        }
    }

    pub fn print(&self) -> String {
        match self {
            WordType::U8 => String::from("_8BIT_UNSGN_INT"),
            WordType::I16 => String::from("_16BIT_SGN_INT"),
            WordType::I32 => String::from("_32BIT_SGN_INT"),
            WordType::F32 => String::from("_32BIT_FLOAT"),
        }
    }
}

#[derive(Clone,Copy,Debug,PartialEq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    /// little endian unless visu_pars says otherwise
    pub fn from_visu(visu:&ParamFile) -> Result<Self,BrukerError> {
        match visu.text("VisuCoreByteOrder") {
            Err(BrukerError::MissingParameter{..}) => Ok(Endian::Little),
            Err(e) => Err(e),
            Ok(order) => match order.as_str() {
                "littleEndian" => Ok(Endian::Little),
                "bigEndian" => Ok(Endian::Big),
                _=> Err(BrukerError::UnsupportedByteOrder(order))
            }
        }
    }
}

#[derive(Clone,Debug,PartialEq)]
pub struct FrameGroup {
    pub len:usize,
    pub id:String,
}

/// how the frames of a 2dseq file are organized
#[derive(Clone,Debug,PartialEq)]
pub struct FrameLayout {
    pub core_size:Vec<usize>,
    pub n_frames:usize,
    pub groups:Vec<FrameGroup>,
}

impl FrameLayout {

    pub fn from_visu(visu:&ParamFile) -> Result<Self,BrukerError> {
        let mut core_size = visu.usizes("VisuCoreSize")?;
        if let Ok(core_dim) = visu.usize("VisuCoreDim") {
            core_size.truncate(core_dim);
        }
        let n_frames = match visu.has("VisuCoreFrameCount") {
            true => visu.usize("VisuCoreFrameCount")?,
            false => 1
        };
        let mut groups = Vec::<FrameGroup>::new();
        if visu.has("VisuFGOrderDesc") {
            for t in visu.tuples("VisuFGOrderDesc")? {
                let len = t.first().and_then(|l| l.trim().parse().ok()).ok_or_else(|| BrukerError::MalformedParameter{
                    name:String::from("VisuFGOrderDesc"),
                    file:visu.label().to_string(),
                    value:t.join(","),
                })?;
                groups.push(FrameGroup{len,id:t.get(1).cloned().unwrap_or_default()});
            }
            let described:usize = groups.iter().map(|g| g.len).product();
            if described != n_frames {
                return Err(BrukerError::FrameCount{described,count:n_frames});
            }
        }
        Ok(Self {
            core_size,
            n_frames,
            groups,
        })
    }

    pub fn frame_len(&self) -> usize {
        self.core_size.iter().product()
    }

    pub fn n_values(&self) -> usize {
        self.frame_len()*self.n_frames
    }

    pub fn is_2d(&self) -> bool {
        self.core_size.len() < 3
    }

    pub fn slice_group(&self) -> Option<usize> {
        self.groups.iter().position(|g| g.id == SLICE_GROUP)
    }

    /// number of slices along z once frames are shaped into a volume
    pub fn n_slices(&self) -> usize {
        match (self.is_2d(),self.groups.is_empty(),self.slice_group()) {
            (false,_,_) => self.core_size[2],
            (true,true,_) => self.n_frames,
            (true,false,Some(s)) => self.groups[s].len,
            (true,false,None) => 1,
        }
    }

    /// output dimensions (x, y, z, t)
    pub fn volume_dims(&self) -> (usize,usize,usize,usize) {
        let x = self.core_size.first().copied().unwrap_or(1);
        let y = self.core_size.get(1).copied().unwrap_or(1);
        let z = self.n_slices();
        let t = self.n_values()/(x*y*z).max(1);
        (x,y,z,t)
    }
}

fn decode<B:ByteOrder>(bytes:&[u8],word:WordType) -> Vec<f32> {
    let n = bytes.len()/word.n_bytes();
    match word {
        WordType::U8 => bytes.iter().map(|b| *b as f32).collect(),
        WordType::I16 => {
            let mut v = vec![0i16;n];
            B::read_i16_into(bytes,&mut v);
            v.into_iter().map(|x| x as f32).collect()
        }
        WordType::I32 => {
            let mut v = vec![0i32;n];
            B::read_i32_into(bytes,&mut v);
            v.into_iter().map(|x| x as f32).collect()
        }
        WordType::F32 => {
            let mut v = vec![0f32;n];
            B::read_f32_into(bytes,&mut v);
            v
        }
    }
}

/// decode every frame of a 2dseq file into a flat vector, x varying fastest
pub fn read_frames(path:&Path,word:WordType,endian:Endian,layout:&FrameLayout) -> Result<Vec<f32>,BrukerError> {
    let bytes = fs::read(path)?;
    let expected = layout.n_values()*word.n_bytes();
    if bytes.len() != expected {
        return Err(BrukerError::DataSize{path:path.to_owned(),expected,found:bytes.len()});
    }
    Ok(match endian {
        Endian::Little => decode::<LittleEndian>(&bytes,word),
        Endian::Big => decode::<BigEndian>(&bytes,word),
    })
}

/// per-frame slope and offset stored in visu_pars. Empty when absent.
pub fn slope_params(visu:&ParamFile) -> Result<(Vec<f64>,Vec<f64>),BrukerError> {
    let get = |name:&str| match visu.has(name) {
        true => visu.f64s(name),
        false => Ok(vec![])
    };
    Ok((get("VisuCoreDataSlope")?,get("VisuCoreDataOffs")?))
}

/// value*slope + offset for each frame. A single slope or offset applies to all frames.
pub fn apply_slope(data:&mut [f32],frame_len:usize,slopes:&[f64],offsets:&[f64],correct_slope:bool,correct_offset:bool) {
    if frame_len == 0 {
        return;
    }
    let pick = |values:&[f64],i:usize,enabled:bool,identity:f64| match enabled {
        true => values.get(i).or(values.first()).copied().unwrap_or(identity),
        false => identity
    };
    data.chunks_mut(frame_len).enumerate().for_each(|(i,frame)|{
        let slope = pick(slopes,i,correct_slope,1.0);
        let offset = pick(offsets,i,correct_offset,0.0);
        if slope != 1.0 || offset != 0.0 {
            frame.iter_mut().for_each(|v| *v = (*v as f64 * slope + offset) as f32);
        }
    });
}

/// shape flat frame data into an (x, y, z, t) volume.
/// 2D slice groups are moved to z, every other frame group is folded into t.
pub fn to_volume(data:Vec<f32>,layout:&FrameLayout) -> Result<Array4<f32>,BrukerError> {
    let (x,y,z,t) = layout.volume_dims();
    let slice_group = match (layout.is_2d(),layout.slice_group()) {
        (true,Some(s)) if s > 0 => s,
        _=> return Ok(Array4::from_shape_vec((x,y,z,t).f(),data)?)
    };

    let mut dims = vec![x,y];
    dims.extend(layout.groups.iter().map(|g| g.len));
    let arr = ArrayD::from_shape_vec(IxDyn(&dims).f(),data)?;

    let mut order = vec![0,1,2+slice_group];
    order.extend((2..dims.len()).filter(|axis| *axis != 2+slice_group));
    let permuted = arr.permuted_axes(order);
    // reversed axes iterate in column-major order of the permuted array
    let flat:Vec<f32> = permuted.t().iter().copied().collect();
    Ok(Array4::from_shape_vec((x,y,z,t).f(),flat)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visu(text:&str) -> ParamFile {
        ParamFile::parse("visu_pars",text)
    }

    #[test]
    fn word_types(){
        assert_eq!(WordType::from_visu(&visu("##$VisuCoreWordType=_32BIT_FLOAT\n")).unwrap(),WordType::F32);
        assert!(matches!(WordType::from_visu(&visu("##$VisuCoreWordType=_64BIT_FLOAT\n")),Err(BrukerError::UnsupportedWordType(_))));
        assert_eq!(WordType::I16.n_bytes(),2);
    }

    #[test]
    fn byte_order_defaults_to_little(){
        assert_eq!(Endian::from_visu(&visu("")).unwrap(),Endian::Little);
        assert_eq!(Endian::from_visu(&visu("##$VisuCoreByteOrder=bigEndian\n")).unwrap(),Endian::Big);
    }

    #[test]
    fn frame_groups_must_match_frame_count(){
        let v = visu("##$VisuCoreSize=( 2 )\n4 3\n##$VisuCoreFrameCount=6\n##$VisuFGOrderDesc=( 2 )\n(3, <FG_ECHO>, <>, 0, 1) (2, <FG_SLICE>, <>, 1, 2)\n");
        let layout = FrameLayout::from_visu(&v).unwrap();
        assert_eq!(layout.slice_group(),Some(1));
        assert_eq!(layout.volume_dims(),(4,3,2,3));

        let bad = visu("##$VisuCoreSize=( 2 )\n4 3\n##$VisuCoreFrameCount=5\n##$VisuFGOrderDesc=( 1 )\n(6, <FG_SLICE>, <>, 0, 2)\n");
        assert!(matches!(FrameLayout::from_visu(&bad),Err(BrukerError::FrameCount{described:6,count:5})));
    }

    #[test]
    fn three_d_core_uses_frames_as_time(){
        let v = visu("##$VisuCoreSize=( 3 )\n4 3 2\n##$VisuCoreDim=3\n##$VisuCoreFrameCount=5\n");
        assert_eq!(FrameLayout::from_visu(&v).unwrap().volume_dims(),(4,3,2,5));
    }

    #[test]
    fn slope_and_offset_per_frame(){
        let mut data = vec![1.0f32;4];
        apply_slope(&mut data,2,&[2.0,3.0],&[1.0],true,true);
        assert_eq!(data,vec![3.0,3.0,4.0,4.0]);

        let mut data = vec![1.0f32;4];
        apply_slope(&mut data,2,&[2.0,3.0],&[1.0],true,false);
        assert_eq!(data,vec![2.0,2.0,3.0,3.0]);
    }

    #[test]
    fn slice_group_moves_to_z(){
        // 2x1 pixels, echo group (2) stored before slice group (3)
        let layout = FrameLayout {
            core_size:vec![2,1],
            n_frames:6,
            groups:vec![
                FrameGroup{len:2,id:String::from("FG_ECHO")},
                FrameGroup{len:3,id:String::from(SLICE_GROUP)},
            ],
        };
        // value = x + 10*echo + 100*slice
        let mut data = Vec::<f32>::new();
        for slice in 0..3 {
            for echo in 0..2 {
                for x in 0..2 {
                    data.push((x + 10*echo + 100*slice) as f32);
                }
            }
        }
        let vol = to_volume(data,&layout).unwrap();
        assert_eq!(vol.dim(),(2,1,3,2));
        assert_eq!(vol[[1,0,2,1]],211.0);
        assert_eq!(vol[[0,0,1,0]],100.0);
    }

    #[test]
    fn wrong_file_size_is_rejected(){
        let tmp = tempfile::tempdir().unwrap();
        let f = tmp.path().join("2dseq");
        std::fs::write(&f,[0u8;10]).unwrap();
        let layout = FrameLayout{core_size:vec![2,2],n_frames:1,groups:vec![]};
        assert!(matches!(read_frames(&f,WordType::I16,Endian::Little,&layout),Err(BrukerError::DataSize{expected:8,found:10,..})));
    }

    #[test]
    fn big_endian_shorts(){
        let tmp = tempfile::tempdir().unwrap();
        let f = tmp.path().join("2dseq");
        std::fs::write(&f,[0u8,1,1,0]).unwrap();
        let layout = FrameLayout{core_size:vec![2,1],n_frames:1,groups:vec![]};
        assert_eq!(read_frames(&f,WordType::I16,Endian::Big,&layout).unwrap(),vec![1.0,256.0]);
    }
}
