use std::{
    ffi::OsString,
    io::{self, BufRead, BufReader, Write},
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use anyhow::{anyhow, Context};
use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressDrawTarget};
use log::{debug, info};
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::{error::ToolError, progress::progress_bar};

use super::{log_command, probe::StreamInfo, VideoTimestamp};

pub const RESIZE_MIN_WIDTH: u64 = 1920;
pub const DEFAULT_SCALE: u64 = 1280;

const PROGRESS_TIME_PATTERN: &str = r"time=(\d+:\d+:\d+\.\d+)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Rotation {
    #[value(alias = "r")]
    Right,
    #[value(alias = "l")]
    Left,
}

impl Rotation {
    fn transpose_filter(self) -> &'static str {
        match self {
            Self::Right => "transpose=1",
            Self::Left => "transpose=2",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CanonOptions {
    pub output: Option<PathBuf>,
    pub level: Option<String>,
    pub scale: Option<u32>,
    pub rotate: Option<Rotation>,
    pub time_start: Option<VideoTimestamp>,
    pub time_end: Option<VideoTimestamp>,
    pub time_duration: Option<VideoTimestamp>,
    pub no_audio: bool,
    pub force: bool,
    pub copy_bitrate: bool,
    pub overwrite: bool,
    pub show_profile: bool,
    pub verbose: bool,
}

impl CanonOptions {
    pub fn implies_force(&self) -> bool {
        self.rotate.is_some()
            || self.scale.is_some()
            || self.time_start.is_some()
            || self.time_end.is_some()
            || self.time_duration.is_some()
            || self.no_audio
            || self.level.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonPlan {
    pub input: PathBuf,
    pub output: PathBuf,
    pub args: Vec<String>,
    pub total_duration: Option<VideoTimestamp>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CanonDecision {
    ProfileOnly,
    NoResize,
    Convert(CanonPlan),
}

/// `<stem>-dst.mp4` next to the input, stem in NFC.
pub fn default_output(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or(input.as_os_str());
    let mut name = match stem.to_str() {
        Some(stem) => OsString::from(stem.nfc().collect::<String>()),
        None => stem.to_os_string(),
    };
    name.push("-dst.mp4");
    input.with_file_name(name)
}

pub fn input_names<R: BufRead>(args: &[PathBuf], stdin: R) -> io::Result<Vec<PathBuf>> {
    if args != [PathBuf::from("-")] {
        return Ok(args.to_vec());
    }
    stdin
        .lines()
        .filter(|line| !matches!(line, Ok(l) if l.trim().is_empty()))
        .map(|line| line.map(|l| PathBuf::from(l.trim())))
        .collect()
}

pub fn plan(input: &Path, info: &StreamInfo, options: &CanonOptions) -> anyhow::Result<CanonDecision> {
    if options.show_profile {
        return Ok(CanonDecision::ProfileOnly);
    }

    let width = info.width().context("video stream has no width")?;
    if width < RESIZE_MIN_WIDTH && !options.force {
        return Ok(CanonDecision::NoResize);
    }

    let mut args = Vec::new();
    if options.overwrite {
        args.push("-y".to_string());
    }
    if options.no_audio {
        args.push("-an".to_string());
    }

    if options.copy_bitrate {
        let bit_rate = info
            .bit_rate()
            .ok_or_else(|| anyhow!("video stream has no bit_rate, re-encode with -R"))?;
        args.extend(["-b:v".to_string(), bit_rate.to_string()]);
    } else {
        let level = options
            .level
            .clone()
            .or_else(|| info.level())
            .ok_or_else(|| anyhow!("video stream has no level, pass --level"))?;
        args.extend(["-profile:v".to_string(), "high".to_string()]);
        args.extend(["-level:v".to_string(), level]);
    }

    let mut filters = Vec::new();
    match options.scale {
        Some(scale) => filters.push(format!("scale={}:-2", scale)),
        None if width > DEFAULT_SCALE => filters.push(format!("scale={}:-2", DEFAULT_SCALE)),
        None => {}
    }
    if let Some(rotate) = options.rotate {
        filters.push(rotate.transpose_filter().to_string());
    }
    if !filters.is_empty() {
        args.extend(["-vf".to_string(), filters.join(",")]);
    }

    let stream_duration = info.duration().map(VideoTimestamp::from_float_seconds);
    let start = options.time_start.unwrap_or_default();
    if let Some(ref start) = options.time_start {
        args.extend(["-ss".to_string(), start.as_ffmpeg_arg()]);
    }
    // -t wins over -to when both are given
    let total_duration = if let Some(duration) = options.time_duration {
        args.extend(["-t".to_string(), duration.as_ffmpeg_arg()]);
        Some(duration)
    } else if let Some(end) = options.time_end {
        args.extend(["-to".to_string(), end.as_ffmpeg_arg()]);
        Some(end.saturating_sub(&start))
    } else {
        stream_duration.map(|d| d.saturating_sub(&start))
    };

    Ok(CanonDecision::Convert(CanonPlan {
        input: input.to_path_buf(),
        output: options
            .output
            .clone()
            .unwrap_or_else(|| default_output(input)),
        args,
        total_duration,
    }))
}

impl CanonPlan {
    pub fn command(&self) -> Command {
        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-i").arg(&self.input);
        cmd.args(&self.args);
        cmd.arg(&self.output);
        cmd
    }
}

pub fn stderr_lines<R: BufRead>(reader: R) -> impl Iterator<Item = std::io::Result<String>> {
    reader
        .split(b'\r')
        .flat_map(|chunk| match chunk {
            Ok(chunk) => String::from_utf8_lossy(&chunk)
                .split('\n')
                .map(|line| Ok(line.to_string()))
                .collect::<Vec<_>>(),
            Err(e) => vec![Err(e)],
        })
        .filter(|line| !matches!(line, Ok(s) if s.trim().is_empty()))
}

pub fn parse_progress_time(re: &Regex, line: &str) -> Option<VideoTimestamp> {
    re.captures(line)?.get(1)?.as_str().parse().ok()
}

pub fn follow_stderr<R: BufRead, W: Write>(
    reader: R,
    out: &mut W,
    bar: Option<&ProgressBar>,
    verbose: bool,
    output: &Path,
) -> anyhow::Result<()> {
    let time_re = Regex::new(PROGRESS_TIME_PATTERN)?;

    for line in stderr_lines(reader) {
        let line = line?;
        if line.contains("Not overwriting") {
            return Err(ToolError::OutputExists(output.display().to_string()).into());
        }
        if verbose {
            writeln!(out, "{}", line)?;
        } else if let (Some(bar), Some(time)) = (bar, parse_progress_time(&time_re, &line)) {
            bar.set_position(time.as_float_seconds() as u64);
        } else {
            debug!("ffmpeg: {}", line);
        }
    }

    Ok(())
}

pub fn run(plan: &CanonPlan, verbose: bool) -> anyhow::Result<()> {
    let mut cmd = plan.command();
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::null());
    cmd.stderr(Stdio::piped());
    log_command(&cmd);

    let bar = match (verbose, plan.total_duration) {
        (false, Some(total)) => Some(progress_bar(
            total.as_float_seconds().ceil() as u64,
            ProgressDrawTarget::stdout(),
        )?),
        _ => None,
    };

    let mut child = cmd.spawn().context("failed to run ffmpeg")?;
    let stderr = child.stderr.take().context("ffmpeg stderr was not captured")?;
    let followed = follow_stderr(
        BufReader::new(stderr),
        &mut io::stdout(),
        bar.as_ref(),
        verbose,
        &plan.output,
    );

    let status = child.wait()?;
    followed?;
    if !status.success() {
        return Err(ToolError::Command {
            program: "ffmpeg".into(),
            message: status.to_string(),
        }
        .into());
    }
    if let Some(bar) = bar {
        bar.set_position(bar.length().unwrap_or_default());
        bar.finish();
    }
    info!("wrote {}", plan.output.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn stream(width: u64) -> StreamInfo {
        StreamInfo::from_fields(
            json!({
                "codec_type": "video",
                "width": width,
                "height": width * 9 / 16,
                "level": 41,
                "bit_rate": "8000000",
                "duration": "120.5"
            })
            .as_object()
            .unwrap()
            .clone(),
        )
    }

    fn convert(decision: CanonDecision) -> CanonPlan {
        match decision {
            CanonDecision::Convert(plan) => plan,
            other => panic!("expected a conversion, got {:?}", other),
        }
    }

    #[test]
    fn test_default_output() {
        assert_eq!(
            default_output(Path::new("videos/clip.mov")),
            PathBuf::from("videos/clip-dst.mp4")
        );
        assert_eq!(
            default_output(Path::new("cafe\u{301}.mov")),
            PathBuf::from("caf\u{e9}-dst.mp4")
        );
    }

    #[test]
    fn test_input_names() {
        let args = vec![PathBuf::from("a.mp4"), PathBuf::from("b.mp4")];
        assert_eq!(input_names(&args, &b"ignored\n"[..]).unwrap(), args);

        let stdin = b"one.mp4\n\n  two words.mkv  \n";
        assert_eq!(
            input_names(&[PathBuf::from("-")], &stdin[..]).unwrap(),
            vec![PathBuf::from("one.mp4"), PathBuf::from("two words.mkv")]
        );
    }

    #[test]
    fn test_follow_stderr_progress() {
        let bar = progress_bar(400, ProgressDrawTarget::hidden()).unwrap();
        let data = b"Stream mapping:\nframe=  10 time=00:01:40.00 bitrate=1.0\rframe=  20 time=00:03:20.50 bitrate=1.0\r";
        let mut out = Vec::new();
        follow_stderr(&data[..], &mut out, Some(&bar), false, Path::new("o.mp4")).unwrap();
        assert_eq!(bar.position(), 200);
        assert!(out.is_empty());
    }

    #[test]
    fn test_follow_stderr_verbose_echoes() {
        let data = b"Stream mapping:\nframe=  10 time=00:00:01.00\r";
        let mut out = Vec::new();
        follow_stderr(&data[..], &mut out, None, true, Path::new("o.mp4")).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Stream mapping:\nframe=  10 time=00:00:01.00\n"
        );
    }

    #[test]
    fn test_follow_stderr_not_overwriting() {
        let data = b"File 'o.mp4' already exists. Overwrite? [y/N] Not overwriting - exiting\nframe=  10 time=00:00:01.00\r";
        let bar = progress_bar(10, ProgressDrawTarget::hidden()).unwrap();
        let mut out = Vec::new();
        let err = follow_stderr(&data[..], &mut out, Some(&bar), false, Path::new("o.mp4"))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ToolError>(),
            Some(ToolError::OutputExists(path)) if path == "o.mp4"
        ));
        assert_eq!(bar.position(), 0);
    }

    #[test]
    fn test_plan_skips() {
        let input = Path::new("a.mp4");
        let options = CanonOptions {
            copy_bitrate: true,
            ..Default::default()
        };
        assert_eq!(plan(input, &stream(1280), &options).unwrap(), CanonDecision::NoResize);

        let options = CanonOptions {
            show_profile: true,
            ..Default::default()
        };
        assert_eq!(plan(input, &stream(3840), &options).unwrap(), CanonDecision::ProfileOnly);
    }

    #[test]
    fn test_plan_copy_bitrate() {
        let options = CanonOptions {
            copy_bitrate: true,
            overwrite: true,
            ..Default::default()
        };
        let plan = convert(plan(Path::new("a.mp4"), &stream(1920), &options).unwrap());
        assert_eq!(
            plan.args,
            vec!["-y", "-b:v", "8000000", "-vf", "scale=1280:-2"]
        );
        assert_eq!(plan.output, PathBuf::from("a-dst.mp4"));
        assert_eq!(plan.total_duration.map(|d| d.as_millis()), Some(120_500));
    }

    #[test]
    fn test_plan_profile_and_edits() {
        let options = CanonOptions {
            scale: Some(640),
            rotate: Some(Rotation::Left),
            no_audio: true,
            time_start: Some("10".parse().unwrap()),
            time_end: Some("00:01:00".parse().unwrap()),
            output: Some(PathBuf::from("out.mp4")),
            force: true,
            ..Default::default()
        };
        assert!(options.implies_force());
        let plan = convert(plan(Path::new("a.mp4"), &stream(1280), &options).unwrap());
        assert_eq!(
            plan.args,
            vec![
                "-an",
                "-profile:v",
                "high",
                "-level:v",
                "41",
                "-vf",
                "scale=640:-2,transpose=2",
                "-ss",
                "00:00:10.000",
                "-to",
                "00:01:00.000"
            ]
        );
        assert_eq!(plan.output, PathBuf::from("out.mp4"));
        assert_eq!(plan.total_duration.map(|d| d.as_millis()), Some(50_000));
    }

    #[test]
    fn test_plan_duration_wins_over_end() {
        let options = CanonOptions {
            level: Some("4.0".into()),
            time_end: Some("90".parse().unwrap()),
            time_duration: Some("30".parse().unwrap()),
            force: true,
            ..Default::default()
        };
        let plan = convert(plan(Path::new("a.mp4"), &stream(1280), &options).unwrap());
        assert!(plan.args.contains(&"-t".to_string()));
        assert!(!plan.args.contains(&"-to".to_string()));
        assert!(plan.args.contains(&"4.0".to_string()));
        assert_eq!(plan.total_duration.map(|d| d.as_millis()), Some(30_000));
    }

    #[test]
    fn test_plan_missing_bitrate() {
        let info = StreamInfo::from_fields(json!({ "width": 3840 }).as_object().unwrap().clone());
        let options = CanonOptions {
            copy_bitrate: true,
            ..Default::default()
        };
        assert!(plan(Path::new("a.mp4"), &info, &options).is_err());
    }

    #[test]
    fn test_stderr_lines() {
        let data = b"Input #0, mov\nframe=  1 time=00:00:01.00 \rframe=  2 time=00:00:02.50 \r\n";
        let lines = stderr_lines(&data[..])
            .collect::<std::io::Result<Vec<_>>>()
            .unwrap();
        assert_eq!(
            lines,
            vec![
                "Input #0, mov",
                "frame=  1 time=00:00:01.00 ",
                "frame=  2 time=00:00:02.50 "
            ]
        );
    }

    #[test]
    fn test_parse_progress_time() {
        let re = Regex::new(PROGRESS_TIME_PATTERN).unwrap();
        let line = "frame=  671 fps= 19 q=-1.0 Lsize=   63844kB time=00:06:01.49 bitrate=1446.8kbits/s speed=0.324x";
        assert_eq!(
            parse_progress_time(&re, line).map(|t| t.as_millis()),
            Some(361_490)
        );
        assert_eq!(parse_progress_time(&re, "Stream mapping:"), None);
    }
}
