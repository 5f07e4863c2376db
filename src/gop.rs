use std::fmt;

use itertools::{Itertools, MinMaxResult};

use crate::{error::FrameError, iter::iter_runs};

pub const DEFAULT_PATTERN_FRAMES: usize = 300;
pub const DEFAULT_STATS_FRAMES: usize = 10000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureType {
    I,
    P,
    B,
    Other(char),
}

impl PictureType {
    pub fn from_letter(letter: &str) -> Self {
        match letter.trim() {
            "I" => Self::I,
            "P" => Self::P,
            "B" => Self::B,
            other => Self::Other(other.chars().next().unwrap_or('?')),
        }
    }

    pub fn letter(&self) -> char {
        match self {
            Self::I => 'I',
            Self::P => 'P',
            Self::B => 'B',
            Self::Other(c) => *c,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub is_key_frame: bool,
    pub picture_type: PictureType,
    pub timestamp: f64,
}

impl Frame {
    pub fn new(is_key_frame: bool, picture_type: PictureType, timestamp: f64) -> Self {
        Self {
            is_key_frame,
            picture_type,
            timestamp,
        }
    }

    pub fn symbol(&self) -> Symbol {
        match (self.is_key_frame, self.picture_type) {
            (true, PictureType::I) => Symbol::KeyFrame,
            (true, _) => Symbol::AnomalousKeyFrame,
            (false, t) => Symbol::Picture(t.letter()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    KeyFrame,
    AnomalousKeyFrame,
    Picture(char),
}

impl Symbol {
    pub fn as_char(self) -> char {
        match self {
            Self::KeyFrame => 'I',
            Self::AnomalousKeyFrame => 'X',
            Self::Picture(c) => c,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gop {
    pub symbols: Vec<Symbol>,
    /// `None` only for a leading partial GOP.
    pub start_timestamp: Option<f64>,
}

impl Gop {
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn is_partial(&self) -> bool {
        self.start_timestamp.is_none()
    }

    pub fn pattern(&self) -> String {
        self.symbols.iter().map(|s| s.as_char()).collect()
    }
}

pub fn partition_into_gops(frames: &[Frame]) -> Result<Vec<Gop>, FrameError> {
    if frames.is_empty() {
        return Err(FrameError::EmptyInput);
    }

    Ok(iter_runs(frames.iter(), |f| f.is_key_frame)
        .map(|run| Gop {
            start_timestamp: run
                .first()
                .filter(|f| f.is_key_frame)
                .map(|f| f.timestamp),
            symbols: run.iter().map(|f| f.symbol()).collect(),
        })
        .collect())
}

pub fn render_pattern(gops: &[Gop], separator: &str) -> String {
    gops.iter()
        .map(|gop| format!("{:4} {}", gop.len(), gop.pattern()))
        .join(separator)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntervalStats {
    Stats {
        key_frames: usize,
        count: usize,
        mean: f64,
        min: f64,
        max: f64,
    },
    NoStats {
        key_frames: usize,
    },
}

pub fn compute_interval_stats(gops: &[Gop]) -> IntervalStats {
    let starts = gops
        .iter()
        .filter_map(|gop| gop.start_timestamp)
        .collect::<Vec<_>>();
    let key_frames = starts.len();

    let intervals = starts
        .iter()
        .tuple_windows()
        .map(|(a, b)| b - a)
        .collect::<Vec<_>>();

    let (min, max) = match intervals.iter().copied().minmax_by(f64::total_cmp) {
        MinMaxResult::MinMax(min, max) => (min, max),
        MinMaxResult::OneElement(x) => (x, x),
        MinMaxResult::NoElements => return IntervalStats::NoStats { key_frames },
    };
    let count = intervals.len();
    let mean = intervals.iter().sum::<f64>() / count as f64;

    IntervalStats::Stats {
        key_frames,
        count,
        mean,
        min,
        max,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalousKeyFrame {
    pub index: usize,
    pub picture_type: PictureType,
    pub timestamp: f64,
}

impl fmt::Display for AnomalousKeyFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "key frame #{} at {}s, but type {}",
            self.index,
            self.timestamp,
            self.picture_type.letter()
        )
    }
}

pub fn anomalous_key_frames(frames: &[Frame]) -> Vec<AnomalousKeyFrame> {
    frames
        .iter()
        .enumerate()
        .filter(|(_, f)| f.is_key_frame && f.picture_type != PictureType::I)
        .map(|(index, f)| AnomalousKeyFrame {
            index,
            picture_type: f.picture_type,
            timestamp: f.timestamp,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GopConfig {
    pub max_frames: Option<usize>,
    pub show_pattern: bool,
    pub add_newline: bool,
    pub show_stats: bool,
}

impl Default for GopConfig {
    fn default() -> Self {
        Self {
            max_frames: None,
            show_pattern: false,
            add_newline: true,
            show_stats: true,
        }
    }
}

impl GopConfig {
    pub fn frame_limit(&self) -> usize {
        match self.max_frames {
            Some(n) => n,
            None if self.show_pattern => DEFAULT_PATTERN_FRAMES,
            None => DEFAULT_STATS_FRAMES,
        }
    }

    pub fn separator(&self) -> &'static str {
        if self.add_newline {
            "\n"
        } else {
            ""
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GopAnalysis {
    pub gops: Vec<Gop>,
    pub stats: IntervalStats,
    pub anomalies: Vec<AnomalousKeyFrame>,
}

pub fn analyze(frames: &[Frame]) -> Result<GopAnalysis, FrameError> {
    let gops = partition_into_gops(frames)?;
    let stats = compute_interval_stats(&gops);
    Ok(GopAnalysis {
        gops,
        stats,
        anomalies: anomalous_key_frames(frames),
    })
}

fn round6(x: f64) -> f64 {
    (x * 1e6).round() / 1e6
}

impl GopAnalysis {
    pub fn pattern_report(&self, config: &GopConfig) -> String {
        format!(
            "Size Pattern\n==== =======\n{}\n",
            render_pattern(&self.gops, config.separator())
        )
    }

    pub fn stats_report(&self) -> String {
        match self.stats {
            IntervalStats::Stats {
                key_frames,
                mean,
                min,
                max,
                ..
            } => format!(
                "## GOP size in seconds.\nnb of GOP: {}\navr time : {}\nmax time : {}\nmin time : {}\n",
                key_frames,
                round6(mean),
                round6(max),
                round6(min)
            ),
            IntervalStats::NoStats { key_frames } => {
                format!("NOTE: not enough key frames found. len={}\n", key_frames)
            }
        }
    }
}
