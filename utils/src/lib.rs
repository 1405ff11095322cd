use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub fn read_to_string(filepath:&Path,extension:&str) -> io::Result<String> {
    let p = filepath.with_extension(extension);
    let mut f = File::open(&p)?;
    let mut s = String::new();
    f.read_to_string(&mut s)?;
    Ok(s)
}

pub fn write_to_file(filepath:&Path,extension:&str,string:&str) -> io::Result<()> {
    let p = filepath.with_extension(extension);
    let mut f = File::create(p)?;
    f.write_all(string.as_bytes())
}

pub fn vec_to_string<T>(vec:&[T]) -> String
    where T:std::string::ToString {
    let vstr:Vec<String> = vec.iter().map(|num| num.to_string()).collect();
    vstr.join(" ")
}

/// sub-directories of dir named by an unsigned integer, in numeric order.
/// Bruker studies number their scans and reconstructions this way.
pub fn numbered_dirs(dir:&Path) -> io::Result<Vec<(u32,PathBuf)>> {
    if !dir.is_dir() {
        return Err(io::Error::new(io::ErrorKind::NotFound,format!("{:?} is not a directory",dir)));
    }
    let mut dirs = Vec::<(u32,PathBuf)>::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_dir() {
            continue;
        }
        if let Some(n) = entry.file_name().to_str().and_then(|name| name.parse::<u32>().ok()) {
            dirs.push((n,entry.path().to_owned()));
        }
    }
    dirs.sort_by_key(|(n,_)| *n);
    Ok(dirs)
}
