use std::{
    path::Path,
    process::{Command, Stdio},
};

use anyhow::Context;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    error::{FrameError, ToolError},
    gop::{Frame, PictureType},
};

use super::log_command;

/// Frame fields that may carry the presentation time, in order of
/// preference. Newer ffprobe releases dropped `pkt_pts_time`.
const TIMESTAMP_FIELDS: [&str; 3] = ["pts_time", "pkt_pts_time", "best_effort_timestamp_time"];

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<StreamInfo>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct StreamInfo {
    fields: Map<String, Value>,
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl StreamInfo {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key)
            .and_then(value_to_string)
            .filter(|s| s != "N/A" && !s.is_empty())
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match self.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn codec_type(&self) -> Option<String> {
        self.get_str("codec_type")
    }

    pub fn codec_name(&self) -> Option<String> {
        self.get_str("codec_name")
    }

    pub fn width(&self) -> Option<u64> {
        self.get_u64("width")
    }

    pub fn height(&self) -> Option<u64> {
        self.get_u64("height")
    }

    pub fn bit_rate(&self) -> Option<u64> {
        self.get_u64("bit_rate")
    }

    pub fn nb_frames(&self) -> Option<u64> {
        self.get_u64("nb_frames")
    }

    pub fn level(&self) -> Option<String> {
        self.get_str("level")
    }

    pub fn profile(&self) -> Option<String> {
        self.get_str("profile")
    }

    pub fn pix_fmt(&self) -> Option<String> {
        self.get_str("pix_fmt")
    }

    pub fn frame_rate(&self) -> Option<f64> {
        ["avg_frame_rate", "r_frame_rate"]
            .iter()
            .filter_map(|key| self.get_str(key))
            .find_map(|rate| parse_rational(&rate))
    }

    pub fn duration(&self) -> Option<f64> {
        self.get_f64("duration").or_else(|| {
            let frames = self.nb_frames()? as f64;
            Some(frames / self.frame_rate()?)
        })
    }

    pub fn aspect_ratio(&self) -> Option<(u64, u64)> {
        aspect_ratio(self.width()?, self.height()?)
    }
}

pub fn parse_rational(s: &str) -> Option<f64> {
    let value = match s.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().ok()?;
            let den = den.trim().parse::<f64>().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => s.trim().parse::<f64>().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

pub fn aspect_ratio(width: u64, height: u64) -> Option<(u64, u64)> {
    if width == 0 || height == 0 {
        return None;
    }
    let g = gcd(width, height);
    Some((width / g, height / g))
}

pub fn parse_streams(json: &[u8], codec_type: Option<&str>) -> anyhow::Result<Vec<StreamInfo>> {
    let output: ProbeOutput = serde_json::from_slice(json)?;
    Ok(output
        .streams
        .into_iter()
        .filter(|s| match codec_type {
            Some(t) => s.codec_type().as_deref() == Some(t),
            None => true,
        })
        .collect())
}

fn run_ffprobe(mut cmd: Command) -> anyhow::Result<Vec<u8>> {
    cmd.stdin(Stdio::null());
    log_command(&cmd);

    let output = cmd.output().context("failed to run ffprobe")?;
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !output.status.success() || !stderr.trim().is_empty() {
        let message = if stderr.trim().is_empty() {
            output.status.to_string()
        } else {
            stderr.trim().to_string()
        };
        return Err(ToolError::Command {
            program: "ffprobe".into(),
            message,
        }
        .into());
    }

    Ok(output.stdout)
}

pub fn probe_streams(input: &Path, codec_type: Option<&str>) -> anyhow::Result<Vec<StreamInfo>> {
    let mut cmd = Command::new("ffprobe");
    cmd.arg("-v").arg("error");
    cmd.arg("-show_streams");
    cmd.arg("-of").arg("json");
    cmd.arg("-i").arg(input);

    let stdout = run_ffprobe(cmd)?;
    parse_streams(&stdout, codec_type)
        .with_context(|| format!("failed to parse ffprobe output for {}", input.display()))
}

pub fn first_video_stream(input: &Path) -> anyhow::Result<StreamInfo> {
    probe_streams(input, Some("video"))?
        .into_iter()
        .next()
        .ok_or_else(|| {
            ToolError::NoStream {
                input: input.display().to_string(),
                codec_type: "video".into(),
            }
            .into()
        })
}

pub fn parse_compact_line(line: &str) -> Option<Map<String, Value>> {
    let mut sections = line.trim().split('|');
    if sections.next()? != "frame" {
        return None;
    }
    Some(
        sections
            .filter_map(|kv| kv.split_once('='))
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect(),
    )
}

fn parse_key_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_u64()? {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim() {
            "0" | "false" => Some(false),
            "1" | "true" => Some(true),
            _ => None,
        },
        _ => None,
    }
}

fn invalid(field: &str, value: &Value) -> FrameError {
    FrameError::InvalidField {
        field: field.into(),
        value: value_to_string(value).unwrap_or_else(|| value.to_string()),
    }
}

pub fn frame_from_record(record: &Map<String, Value>) -> Result<Frame, FrameError> {
    let missing = |field: &str| FrameError::MissingField {
        field: field.into(),
    };

    let key = record.get("key_frame").ok_or_else(|| missing("key_frame"))?;
    let is_key_frame = parse_key_flag(key).ok_or_else(|| invalid("key_frame", key))?;

    let pict = record.get("pict_type").ok_or_else(|| missing("pict_type"))?;
    let picture_type = match pict {
        Value::String(s) if !s.trim().is_empty() => PictureType::from_letter(s),
        other => return Err(invalid("pict_type", other)),
    };

    let mut present = TIMESTAMP_FIELDS
        .iter()
        .filter_map(|field| record.get(*field).map(|v| (*field, v)))
        .peekable();
    let (first_field, first_value) = *present
        .peek()
        .ok_or_else(|| missing(TIMESTAMP_FIELDS[0]))?;
    let timestamp = present
        .find_map(|(_, v)| {
            match v {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            }
            .filter(|t| t.is_finite())
        })
        .ok_or_else(|| invalid(first_field, first_value))?;

    Ok(Frame::new(is_key_frame, picture_type, timestamp))
}

pub fn parse_frames(output: &str, max_frames: usize) -> anyhow::Result<Vec<Frame>> {
    output
        .lines()
        .filter_map(parse_compact_line)
        .take(max_frames)
        .enumerate()
        .map(|(i, record)| {
            frame_from_record(&record).with_context(|| format!("bad frame record #{}", i))
        })
        .collect()
}

pub fn probe_frames(input: &Path, max_frames: usize) -> anyhow::Result<Vec<Frame>> {
    let mut cmd = Command::new("ffprobe");
    cmd.arg("-v").arg("error");
    cmd.arg("-select_streams").arg("v:0");
    cmd.arg("-read_intervals").arg(format!("%+#{}", max_frames));
    cmd.arg("-show_entries").arg(format!(
        "frame=key_frame,pict_type,{}",
        TIMESTAMP_FIELDS.join(",")
    ));
    cmd.arg("-of").arg("compact");
    cmd.arg("-i").arg(input);

    let stdout = run_ffprobe(cmd)?;
    parse_frames(&String::from_utf8_lossy(&stdout), max_frames)
}
