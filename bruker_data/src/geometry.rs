use nifti::NiftiHeader;
use crate::error::BrukerError;
use crate::jcamp::ParamFile;
use crate::two_dseq::FrameLayout;

const NIFTI_UNITS_MM:u8 = 2;
const NIFTI_UNITS_SEC:u8 = 8;

/// voxel size and voxel-to-world transform of a reconstruction
#[derive(Clone,Debug,PartialEq)]
pub struct Geometry {
    pub voxel_size:[f64;3],
    /// row-major 4x4, RAS world coordinates in mm
    pub affine:[[f64;4];4],
    pub frame_time_s:Option<f64>,
}

fn optional(visu:&ParamFile,name:&str) -> Result<Option<Vec<f64>>,BrukerError> {
    match visu.has(name) {
        true => visu.f64s(name).map(Some),
        false => Ok(None)
    }
}

impl Geometry {

    pub fn from_visu(visu:&ParamFile,layout:&FrameLayout) -> Result<Self,BrukerError> {
        let extent = optional(visu,"VisuCoreExtent")?;
        let mut voxel_size = [1.0;3];
        for (i,n) in layout.core_size.iter().enumerate().take(3) {
            if let Some(e) = extent.as_ref().and_then(|e| e.get(i)) {
                voxel_size[i] = e/(*n).max(1) as f64;
            }
        }

        let positions = optional(visu,"VisuCorePosition")?.unwrap_or_default();
        if layout.is_2d() {
            voxel_size[2] = Self::slice_distance(&positions,layout)
                .or(optional(visu,"VisuCoreFrameThickness")?.and_then(|t| t.first().copied()))
                .unwrap_or(1.0);
        }

        let orientation = optional(visu,"VisuCoreOrientation")?
            .filter(|o| o.len() >= 9)
            .unwrap_or_else(|| vec![1.0,0.0,0.0,0.0,1.0,0.0,0.0,0.0,1.0]);
        let origin = match positions.len() >= 3 {
            true => [positions[0],positions[1],positions[2]],
            false => [0.0;3]
        };

        // rows of the orientation matrix are the directions of the image axes
        let mut affine = [[0.0;4];4];
        for i in 0..3 {
            for j in 0..3 {
                affine[i][j] = orientation[3*j + i]*voxel_size[j];
            }
            affine[i][3] = origin[i];
        }
        affine[3][3] = 1.0;
        // patient LPS to RAS
        for row in affine.iter_mut().take(2) {
            row.iter_mut().for_each(|v| *v = -*v);
        }

        let frame_time_s = optional(visu,"VisuAcqRepetitionTime")?
            .and_then(|tr| tr.first().copied())
            .map(|tr_ms| tr_ms/1000.0);

        Ok(Self {
            voxel_size,
            affine,
            frame_time_s,
        })
    }

    /// distance between the first two slices of a 2D multi-slice layout
    fn slice_distance(positions:&[f64],layout:&FrameLayout) -> Option<f64> {
        if layout.n_slices() < 2 {
            return None;
        }
        let stride:usize = match layout.slice_group() {
            Some(s) => layout.groups[..s].iter().map(|g| g.len).product(),
            None => 1
        };
        let p0 = positions.get(0..3)?;
        let p1 = positions.get(3*stride..3*stride + 3)?;
        let d = p0.iter().zip(p1).map(|(a,b)| (a-b).powi(2)).sum::<f64>().sqrt();
        match d > 0.0 {
            true => Some(d),
            false => None
        }
    }

    /// mirror the slice axis for samples placed upside down in the magnet
    pub fn flip_slices(&mut self,n_slices:usize) {
        let steps = n_slices.saturating_sub(1) as f64;
        for row in self.affine.iter_mut().take(3) {
            row[3] += row[2]*steps;
            row[2] = -row[2];
        }
    }

    pub fn apply_to(&self,header:&mut NiftiHeader,sform_code:i16) {
        header.pixdim[0] = 1.0;
        for i in 0..3 {
            header.pixdim[i+1] = self.voxel_size[i] as f32;
        }
        if let Some(t) = self.frame_time_s {
            header.pixdim[4] = t as f32;
        }
        header.xyzt_units = NIFTI_UNITS_MM | NIFTI_UNITS_SEC;
        header.sform_code = sform_code;
        header.qform_code = 0;
        let row = |i:usize| [self.affine[i][0] as f32,self.affine[i][1] as f32,self.affine[i][2] as f32,self.affine[i][3] as f32];
        header.srow_x = row(0);
        header.srow_y = row(1);
        header.srow_z = row(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::two_dseq::FrameGroup;

    fn layout_2d(n_slices:usize) -> FrameLayout {
        FrameLayout {
            core_size:vec![100,50],
            n_frames:n_slices,
            groups:vec![FrameGroup{len:n_slices,id:String::from("FG_SLICE")}],
        }
    }

    #[test]
    fn voxel_size_from_extent_and_slice_positions(){
        let visu = ParamFile::parse("visu_pars","##$VisuCoreExtent=( 2 )\n20 10\n##$VisuCorePosition=( 3, 3 )\n-10 -5 -1 -10 -5 -0.5 -10 -5 0\n##$VisuCoreFrameThickness=0.3\n");
        let g = Geometry::from_visu(&visu,&layout_2d(3)).unwrap();
        assert_eq!(g.voxel_size,[0.2,0.2,0.5]);
        // LPS origin (-10,-5,-1) becomes RAS (10,5,-1)
        assert_eq!(g.affine[0][3],10.0);
        assert_eq!(g.affine[1][3],5.0);
        assert_eq!(g.affine[2][3],-1.0);
        assert_eq!(g.affine[0][0],-0.2);
        assert_eq!(g.affine[2][2],0.5);
    }

    #[test]
    fn single_slice_uses_frame_thickness(){
        let visu = ParamFile::parse("visu_pars","##$VisuCoreExtent=( 2 )\n20 10\n##$VisuCoreFrameThickness=( 1 )\n0.7\n");
        let g = Geometry::from_visu(&visu,&layout_2d(1)).unwrap();
        assert_eq!(g.voxel_size[2],0.7);
        assert_eq!(g.frame_time_s,None);
    }

    #[test]
    fn flipping_keeps_the_last_slice_position(){
        let visu = ParamFile::parse("visu_pars","##$VisuCoreExtent=( 2 )\n20 10\n##$VisuCoreFrameThickness=2\n##$VisuAcqRepetitionTime=( 1 )\n1500\n");
        let mut g = Geometry::from_visu(&visu,&layout_2d(1)).unwrap();
        assert_eq!(g.frame_time_s,Some(1.5));
        g.flip_slices(5);
        assert_eq!(g.affine[2][2],-2.0);
        assert_eq!(g.affine[2][3],8.0);
    }

    #[test]
    fn header_gets_sform(){
        let visu = ParamFile::parse("visu_pars","##$VisuCoreExtent=( 3 )\n10 10 10\n");
        let layout = FrameLayout{core_size:vec![10,10,5],n_frames:1,groups:vec![]};
        let g = Geometry::from_visu(&visu,&layout).unwrap();
        let mut h = NiftiHeader::default();
        g.apply_to(&mut h,2);
        assert_eq!(h.sform_code,2);
        assert_eq!(h.pixdim[3],2.0);
        assert_eq!(h.srow_z,[0.0,0.0,2.0,0.0]);
    }
}
