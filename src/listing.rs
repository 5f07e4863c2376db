use std::{
    io::Write,
    ops::RangeInclusive,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::{
    display::StreamPrinter,
    ffmpeg::probe::{first_video_stream, StreamInfo},
};

pub const MIN_BITRATE: u64 = 4_000_000;
pub const MAX_BITRATE: u64 = 9_999_999_999;
pub const X_CHECK_BITRATE: RangeInclusive<u64> = 3_900_000..=4_100_000;
pub const DEFAULT_EXTENSIONS: &str = "mp4,mkv,avi,flv,vob,wmv,mov,mpg,m4v,webm";

#[derive(Debug, Clone)]
pub struct ListOptions {
    pub inputs: Vec<PathBuf>,
    pub print_mode: u8,
    pub bitrate_range: Option<RangeInclusive<u64>>,
    pub extensions: Option<Vec<String>>,
    pub names_only: bool,
    pub recursive: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            inputs: vec![PathBuf::from(".")],
            print_mode: 0,
            bitrate_range: None,
            extensions: Some(parse_extensions(DEFAULT_EXTENSIONS)),
            names_only: false,
            recursive: false,
        }
    }
}

pub fn parse_extensions(list: &str) -> Vec<String> {
    list.split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

pub fn matches_extension(path: &Path, extensions: Option<&[String]>) -> bool {
    let Some(extensions) = extensions else {
        return true;
    };
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

pub fn passes_bitrate(info: &StreamInfo, range: Option<&RangeInclusive<u64>>) -> bool {
    match (range, info.bit_rate()) {
        (Some(range), Some(bit_rate)) => range.contains(&bit_rate),
        _ => true,
    }
}

pub fn collect_files(path: &Path, recursive: bool) -> Vec<PathBuf> {
    debug!("PATH: {}", path.display());
    WalkDir::new(path)
        .follow_links(true)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("{}: {}", path.display(), e);
                None
            }
        })
        .filter(|entry| !entry.file_type().is_dir())
        .map(|entry| entry.into_path())
        .collect()
}

fn probe(path: &Path) -> Option<StreamInfo> {
    match first_video_stream(path) {
        Ok(info) => Some(info),
        Err(e) => {
            info!("skipping {}: {:#}", path.display(), e);
            None
        }
    }
}

pub fn list<W: Write>(options: &ListOptions, out: &mut W) -> anyhow::Result<()> {
    let printer = StreamPrinter::new(options.print_mode);
    if !options.names_only {
        writeln!(out, "{}", printer.header())?;
    }

    for input in &options.inputs {
        let files = collect_files(input, options.recursive)
            .into_iter()
            .filter(|f| matches_extension(f, options.extensions.as_deref()))
            .collect::<Vec<_>>();

        let probed = files
            .par_iter()
            .map(|f| probe(f))
            .collect::<Vec<_>>();

        for (path, info) in files.iter().zip(probed) {
            let Some(info) = info else { continue };
            if !passes_bitrate(&info, options.bitrate_range.as_ref()) {
                continue;
            }
            if options.names_only {
                writeln!(out, "{}", path.display())?;
            } else {
                writeln!(out, "{}", printer.line(&info, &path.display().to_string()))?;
            }
            out.flush()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs::{create_dir, File};

    use serde_json::{json, Value};
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_extensions() {
        let exts = parse_extensions("mp4, .MKV,,webm");
        assert_eq!(exts, vec!["mp4", "mkv", "webm"]);
        assert!(matches_extension(Path::new("a/b.MP4"), Some(exts.as_slice())));
        assert!(matches_extension(Path::new("b.mkv"), Some(exts.as_slice())));
        assert!(!matches_extension(Path::new("b.txt"), Some(exts.as_slice())));
        assert!(!matches_extension(Path::new("mp4"), Some(exts.as_slice())));
        assert!(matches_extension(Path::new("b.txt"), None));
    }

    #[test]
    fn test_passes_bitrate() {
        let info = |rate: Value| {
            StreamInfo::from_fields(json!({ "bit_rate": rate }).as_object().unwrap().clone())
        };
        let range = MIN_BITRATE..=MAX_BITRATE;
        assert!(passes_bitrate(&info(json!("4500000")), Some(&range)));
        assert!(!passes_bitrate(&info(json!("3000000")), Some(&range)));
        assert!(passes_bitrate(&info(json!("N/A")), Some(&range)));
        assert!(passes_bitrate(&info(json!("3000000")), None));
        assert!(!passes_bitrate(&info(json!("4200000")), Some(&X_CHECK_BITRATE)));
    }

    #[test]
    fn test_collect_files() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("b.mp4")).unwrap();
        File::create(dir.path().join("a.mkv")).unwrap();
        create_dir(dir.path().join("sub")).unwrap();
        File::create(dir.path().join("sub").join("c.mp4")).unwrap();

        let names = |files: Vec<PathBuf>| {
            files
                .iter()
                .map(|f| f.strip_prefix(dir.path()).unwrap().to_path_buf())
                .collect::<Vec<_>>()
        };

        assert_eq!(
            names(collect_files(dir.path(), false)),
            vec![PathBuf::from("a.mkv"), PathBuf::from("b.mp4")]
        );
        assert_eq!(
            names(collect_files(dir.path(), true)),
            vec![
                PathBuf::from("a.mkv"),
                PathBuf::from("b.mp4"),
                PathBuf::from("sub").join("c.mp4")
            ]
        );

        let file = dir.path().join("a.mkv");
        assert_eq!(collect_files(&file, false), vec![file.clone()]);
        assert!(collect_files(&dir.path().join("missing"), true).is_empty());
    }

    #[test]
    fn test_list_skips_unreadable_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("broken.mp4"), b"not a video").unwrap();

        let options = ListOptions {
            inputs: vec![dir.path().to_path_buf()],
            ..Default::default()
        };
        let mut out = Vec::new();
        list(&options, &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert_eq!(out, format!("{}\n", StreamPrinter::new(0).header()));

        let options = ListOptions {
            names_only: true,
            ..options
        };
        let mut out = Vec::new();
        list(&options, &mut out).unwrap();
        assert!(out.is_empty());
    }
}
