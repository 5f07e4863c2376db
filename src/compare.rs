use std::path::PathBuf;

use itertools::Itertools;
use rayon::prelude::*;
use serde_json::Value;

use crate::{
    error::ToolError,
    ffmpeg::probe::{first_video_stream, StreamInfo},
};

pub const DEFAULT_IGNORED_KEYS: [&str; 1] = ["codec_long_name"];

#[derive(Debug, Clone)]
pub struct CompareOptions {
    pub inputs: Vec<PathBuf>,
    pub targets: Option<Vec<usize>>,
    pub ignore_keys: Vec<String>,
}

impl CompareOptions {
    pub fn new(inputs: Vec<PathBuf>) -> Self {
        Self {
            inputs,
            targets: None,
            ignore_keys: DEFAULT_IGNORED_KEYS.iter().map(|k| k.to_string()).collect(),
        }
    }

    pub fn selected_inputs(&self) -> Result<Vec<PathBuf>, ToolError> {
        let Some(ref targets) = self.targets else {
            return Ok(self.inputs.clone());
        };
        targets
            .iter()
            .map(|&index| {
                self.inputs
                    .get(index)
                    .cloned()
                    .ok_or(ToolError::TargetOutOfRange {
                        index,
                        len: self.inputs.len(),
                    })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiffRow {
    pub key: String,
    pub differs: bool,
    pub values: Vec<Option<String>>,
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A key first seen in a later stream goes right after the key that precedes
/// it there.
pub fn common_keys(streams: &[StreamInfo], ignore_keys: &[String]) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for stream in streams {
        let mut pos = 0;
        for (key, value) in stream.fields() {
            if !is_scalar(value) || ignore_keys.contains(key) {
                continue;
            }
            match keys.iter().position(|k| k == key) {
                Some(i) => pos = i + 1,
                None => {
                    keys.insert(pos, key.clone());
                    pos += 1;
                }
            }
        }
    }
    keys
}

pub fn diff_rows(streams: &[StreamInfo], ignore_keys: &[String]) -> Vec<DiffRow> {
    common_keys(streams, ignore_keys)
        .into_iter()
        .map(|key| {
            let raw = streams.iter().map(|s| s.get(&key)).collect::<Vec<_>>();
            let differs = raw.iter().any(|v| v.is_none()) || !raw.iter().all_equal();
            DiffRow {
                values: raw.iter().map(|v| v.map(display_value)).collect(),
                key,
                differs,
            }
        })
        .collect()
}

pub fn render_table(rows: &[DiffRow]) -> Vec<String> {
    let key_width = rows.iter().map(|r| r.key.len()).max().unwrap_or(0);
    let columns = rows.first().map(|r| r.values.len()).unwrap_or(0);
    let value_widths = (0..columns)
        .map(|i| {
            rows.iter()
                .filter_map(|r| r.values[i].as_ref())
                .map(|v| v.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect::<Vec<_>>();

    rows.iter()
        .map(|row| {
            let flag = if row.differs { "X" } else { " " };
            std::iter::once(format!("{:<w$}", row.key, w = key_width))
                .chain(std::iter::once(flag.to_string()))
                .chain(row.values.iter().zip(&value_widths).map(|(v, w)| {
                    format!("{:<w$}", v.as_deref().unwrap_or(""), w = *w)
                }))
                .join(" ")
        })
        .collect()
}

pub fn probe_all(inputs: &[PathBuf]) -> anyhow::Result<Vec<StreamInfo>> {
    inputs
        .par_iter()
        .map(|input| first_video_stream(input))
        .collect()
}

pub fn compare(options: &CompareOptions) -> anyhow::Result<Vec<String>> {
    let inputs = options.selected_inputs()?;
    let streams = probe_all(&inputs)?;
    Ok(render_table(&diff_rows(&streams, &options.ignore_keys)))
}
