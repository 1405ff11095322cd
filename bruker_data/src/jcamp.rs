//! JCAMP-DX parameter files as written by ParaVision (`acqp`, `method`,
//! `reco`, `visu_pars`, `subject`).
//!
//! ```text
//! ##$VisuCoreSize=( 2 )
//! 128 96
//! ##$VisuCoreWordType=_16BIT_SGN_INT
//! ##$VisuFGOrderDesc=( 1 )
//! (12, <FG_SLICE>, <>, 0, 2)
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use regex::Regex;
use serde::Serialize;
use crate::error::BrukerError;

#[derive(Clone,Debug,PartialEq,Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Scalar(String),
    Array{shape:Vec<usize>,values:Vec<String>},
}

impl ParamValue {
    pub fn tokens(&self) -> Vec<&str> {
        match self {
            ParamValue::Scalar(s) => vec![s.as_str()],
            ParamValue::Array{values,..} => values.iter().map(|v| v.as_str()).collect()
        }
    }

    pub fn shape(&self) -> Option<&[usize]> {
        match self {
            ParamValue::Scalar(_) => None,
            ParamValue::Array{shape,..} => Some(shape)
        }
    }
}

#[derive(Clone,Debug,Default,Serialize)]
pub struct ParamFile {
    #[serde(skip)]
    label:String,
    #[serde(flatten)]
    params:BTreeMap<String,ParamValue>,
}

fn size_header() -> &'static Regex {
    static RE:OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\(\s*\d+(\s*,\s*\d+)*\s*\)$").expect("static regex"))
}

fn token_pattern() -> &'static Regex {
    static RE:OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@(\d+)\*\(((?:<[^>]*>|[^)<])*)\)|<[^>]*>|\((?:<[^>]*>|[^)<])*\)|\S+").expect("static regex"))
}

fn strip_brackets(s:&str) -> &str {
    let s = s.trim();
    s.strip_prefix('<').and_then(|s| s.strip_suffix('>')).unwrap_or(s)
}

/// split an array body into values, expanding @N*(v) repeats
fn tokenize(body:&str) -> Vec<String> {
    let mut tokens = Vec::<String>::new();
    for cap in token_pattern().captures_iter(body) {
        match (cap.get(1),cap.get(2)) {
            (Some(n),Some(v)) => {
                let n:usize = n.as_str().parse().unwrap_or(0);
                let repeated = tokenize(v.as_str());
                for _ in 0..n {
                    tokens.extend(repeated.iter().cloned());
                }
            }
            _ => tokens.push(cap[0].to_string())
        }
    }
    tokens
}

/// fields of a tuple body, split on commas outside <strings>
fn split_fields(inner:&str) -> Vec<String> {
    let mut fields = vec![String::new()];
    let mut in_string = false;
    for c in inner.chars() {
        match c {
            ',' if !in_string => fields.push(String::new()),
            _ => {
                in_string = match c {
                    '<' => true,
                    '>' => false,
                    _ => in_string
                };
                if let Some(f) = fields.last_mut() {
                    f.push(c);
                }
            }
        }
    }
    fields.iter().map(|f| strip_brackets(f).to_string()).collect()
}

fn finish_record(lines:&[String]) -> ParamValue {
    let first = lines[0].trim();
    let body = lines[1..].iter().map(|l| l.trim()).collect::<Vec<&str>>().join(" ");
    let shape:Vec<usize> = match size_header().is_match(first) {
        true => first.trim_matches(|c| c == '(' || c == ')')
            .split(',')
            .flat_map(|d| d.trim().parse())
            .collect(),
        false => vec![]
    };
    let zero_length = shape.contains(&0);
    if !shape.is_empty() && (zero_length || !body.trim().is_empty()) {
        let values = tokenize(&body);
        // character arrays hold a single <string>
        if values.len() == 1 && values[0].starts_with('<') {
            return ParamValue::Scalar(values[0].clone());
        }
        return ParamValue::Array{shape,values};
    }
    let joined = std::iter::once(first).chain(lines[1..].iter().map(|l| l.trim()))
        .filter(|l| !l.is_empty())
        .collect::<Vec<&str>>()
        .join(" ");
    ParamValue::Scalar(joined)
}

impl ParamFile {

    pub fn parse(label:&str,text:&str) -> Self {
        let mut params = BTreeMap::<String,ParamValue>::new();
        let mut current:Option<(String,Vec<String>)> = None;
        for line in text.lines() {
            if line.starts_with("$$") {
                continue;
            }
            if let Some(record) = line.strip_prefix("##") {
                if let Some((name,lines)) = current.take() {
                    params.insert(name,finish_record(&lines));
                }
                let record = record.strip_prefix('$').unwrap_or(record);
                let (name,value) = record.split_once('=').unwrap_or((record,""));
                if name == "END" {
                    break;
                }
                current = Some((name.trim().to_string(),vec![value.to_string()]));
                continue;
            }
            if let Some((_,lines)) = current.as_mut() {
                lines.push(line.to_string());
            }
        }
        if let Some((name,lines)) = current.take() {
            params.insert(name,finish_record(&lines));
        }
        Self {
            label:label.to_string(),
            params
        }
    }

    pub fn from_file(path:&Path) -> Result<Self,BrukerError> {
        let bytes = fs::read(path)?;
        let label = path.file_name().map(|f| f.to_string_lossy().to_string()).unwrap_or_default();
        Ok(Self::parse(&label,&String::from_utf8_lossy(&bytes)))
    }

    /// parse the file if it exists
    pub fn open_optional(path:&Path) -> Result<Option<Self>,BrukerError> {
        match path.is_file() {
            true => Ok(Some(Self::from_file(path)?)),
            false => Ok(None)
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn has(&self,name:&str) -> bool {
        self.params.contains_key(name)
    }

    pub fn get(&self,name:&str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    fn require(&self,name:&str) -> Result<&ParamValue,BrukerError> {
        self.params.get(name).ok_or_else(|| BrukerError::MissingParameter{
            name:name.to_string(),
            file:self.label.clone()
        })
    }

    fn malformed(&self,name:&str,value:&str) -> BrukerError {
        BrukerError::MalformedParameter{
            name:name.to_string(),
            file:self.label.clone(),
            value:value.to_string()
        }
    }

    pub fn text(&self,name:&str) -> Result<String,BrukerError> {
        let v = self.require(name)?;
        Ok(v.tokens().iter().map(|t| strip_brackets(t)).collect::<Vec<&str>>().join(" "))
    }

    pub fn f64(&self,name:&str) -> Result<f64,BrukerError> {
        let v = self.require(name)?;
        let first = v.tokens().first().copied().unwrap_or("");
        first.parse().map_err(|_| self.malformed(name,first))
    }

    pub fn f64s(&self,name:&str) -> Result<Vec<f64>,BrukerError> {
        let v = self.require(name)?;
        v.tokens().iter().map(|t| t.parse::<f64>().map_err(|_| self.malformed(name,t))).collect()
    }

    pub fn usizes(&self,name:&str) -> Result<Vec<usize>,BrukerError> {
        let v = self.require(name)?;
        v.tokens().iter().map(|t| t.parse::<usize>().map_err(|_| self.malformed(name,t))).collect()
    }

    pub fn usize(&self,name:&str) -> Result<usize,BrukerError> {
        let v = self.usizes(name)?;
        v.first().copied().ok_or_else(|| self.malformed(name,""))
    }

    /// fields of each parenthesised struct entry, e.g. (12, <FG_SLICE>, <>, 0, 2)
    pub fn tuples(&self,name:&str) -> Result<Vec<Vec<String>>,BrukerError> {
        let v = self.require(name)?;
        let mut tuples = Vec::<Vec<String>>::new();
        for t in v.tokens() {
            let inner = t.trim().strip_prefix('(').and_then(|t| t.strip_suffix(')')).ok_or_else(|| self.malformed(name,t))?;
            tuples.push(split_fields(inner));
        }
        Ok(tuples)
    }

    pub fn shape(&self,name:&str) -> Result<Vec<usize>,BrukerError> {
        let v = self.require(name)?;
        Ok(v.shape().map(|s| s.to_vec()).unwrap_or_else(|| vec![1]))
    }

    pub fn to_json(&self) -> Result<String,BrukerError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VISU_PARS:&str = "##TITLE=Parameter List, ParaVision 6.0.1
##JCAMPDX=4.24
$$ Mon Mar 12 10:15:00 2018 CET (UT+1h) nmrsu
##$VisuCoreWordType=_16BIT_SGN_INT
##$VisuCoreByteOrder=littleEndian
##$VisuCoreSize=( 2 )
128 96
##$VisuCoreDataSlope=( 12 )
@12*(0.25)
##$VisuCoreExtent=( 2 )
20 15
##$VisuSubjectId=( 64 )
<mouse 01>
##$VisuFGOrderDesc=( 2 )
(6, <FG_SLICE>, <>, 0, 2) (2, <FG_ECHO>, <>, 2, 1)
##$VisuCoreOrientation=( 1, 9 )
1 0 0 0 1 0
0 0 1
##$VisuAcqSequenceName=( 65 )
<Bruker:RARE>
##END=
";

    fn visu() -> ParamFile {
        ParamFile::parse("visu_pars",VISU_PARS)
    }

    #[test]
    fn scalars(){
        let p = visu();
        assert_eq!(p.text("VisuCoreWordType").unwrap(),"_16BIT_SGN_INT");
        assert_eq!(p.text("VisuCoreByteOrder").unwrap(),"littleEndian");
        assert_eq!(p.text("TITLE").unwrap(),"Parameter List, ParaVision 6.0.1");
        assert!(!p.has("END"));
    }

    #[test]
    fn arrays_and_repeats(){
        let p = visu();
        assert_eq!(p.usizes("VisuCoreSize").unwrap(),vec![128,96]);
        assert_eq!(p.f64s("VisuCoreExtent").unwrap(),vec![20.0,15.0]);
        let slopes = p.f64s("VisuCoreDataSlope").unwrap();
        assert_eq!(slopes.len(),12);
        assert!(slopes.iter().all(|s| *s == 0.25));
        assert_eq!(p.shape("VisuCoreOrientation").unwrap(),vec![1,9]);
        assert_eq!(p.f64s("VisuCoreOrientation").unwrap().len(),9);
    }

    #[test]
    fn strings_keep_spaces(){
        let p = visu();
        assert_eq!(p.text("VisuSubjectId").unwrap(),"mouse 01");
        assert_eq!(p.text("VisuAcqSequenceName").unwrap(),"Bruker:RARE");
    }

    #[test]
    fn struct_tuples(){
        let t = visu().tuples("VisuFGOrderDesc").unwrap();
        assert_eq!(t.len(),2);
        assert_eq!(t[0],vec!["6","FG_SLICE","","0","2"]);
        assert_eq!(t[1][1],"FG_ECHO");
    }

    #[test]
    fn repeats_expand_every_value(){
        let p = ParamFile::parse("visu_pars","##$VisuCoreOrientation=( 2, 9 )\n@2*(1 0 0 0 1 0 0 0 1)\n##$VisuSubjectSex=( 3 )\n@3*(<not known>)\n");
        let o = p.f64s("VisuCoreOrientation").unwrap();
        assert_eq!(o.len(),18);
        assert_eq!(&o[9..12],&[1.0,0.0,0.0]);
        assert_eq!(p.get("VisuSubjectSex").map(|v| v.tokens().len()),Some(3));
        assert_eq!(p.text("VisuSubjectSex").unwrap(),"not known not known not known");
    }

    #[test]
    fn tuple_strings_may_hold_brackets_and_commas(){
        let p = ParamFile::parse("method","##$PVM_Setup=( 2 )\n(1, <a (b) c>, 2) (3, <x, y>, 4)\n");
        let t = p.tuples("PVM_Setup").unwrap();
        assert_eq!(t,vec![
            vec![String::from("1"),String::from("a (b) c"),String::from("2")],
            vec![String::from("3"),String::from("x, y"),String::from("4")],
        ]);
    }

    #[test]
    fn empty_arrays_have_no_values(){
        let p = ParamFile::parse("method","##$PVM_DwEffBval=( 0 )\n##$PVM_NRepetitions=1\n");
        assert_eq!(p.f64s("PVM_DwEffBval").unwrap(),Vec::<f64>::new());
        assert_eq!(p.shape("PVM_DwEffBval").unwrap(),vec![0]);
        assert_eq!(p.usize("PVM_NRepetitions").unwrap(),1);
    }

    #[test]
    fn missing_and_malformed(){
        let p = visu();
        assert!(matches!(p.f64("VisuCoreFrameThickness"),Err(BrukerError::MissingParameter{..})));
        assert!(matches!(p.f64("VisuCoreWordType"),Err(BrukerError::MalformedParameter{..})));
    }

    #[test]
    fn json_dump_is_a_map(){
        let json = visu().to_json().unwrap();
        let v:serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["VisuCoreWordType"],"_16BIT_SGN_INT");
        assert_eq!(v["VisuCoreSize"]["values"][1],"96");
    }
}
