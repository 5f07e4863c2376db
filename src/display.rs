use itertools::Itertools;

use crate::ffmpeg::{probe::StreamInfo, VideoTimestamp};

const MISSING: &str = "-";

struct Column {
    title: &'static str,
    width: usize,
    render: fn(&StreamInfo) -> Option<String>,
}

fn size(info: &StreamInfo) -> Option<String> {
    Some(format!("{}x{}", info.width()?, info.height()?))
}

fn fps(info: &StreamInfo) -> Option<String> {
    info.frame_rate().map(|r| format!("{:.2}", r))
}

fn duration(info: &StreamInfo) -> Option<String> {
    info.duration()
        .map(|d| VideoTimestamp::from_float_seconds(d).as_ffmpeg_arg())
}

fn codec(info: &StreamInfo) -> Option<String> {
    info.codec_name()
}

fn aspect(info: &StreamInfo) -> Option<String> {
    info.aspect_ratio().map(|(w, h)| format!("{}:{}", w, h))
}

fn bitrate(info: &StreamInfo) -> Option<String> {
    info.bit_rate().map(|b| format!("{}k", b / 1000))
}

fn profile(info: &StreamInfo) -> Option<String> {
    info.profile()
}

fn level(info: &StreamInfo) -> Option<String> {
    info.level()
}

fn pix_fmt(info: &StreamInfo) -> Option<String> {
    info.pix_fmt()
}

fn frames(info: &StreamInfo) -> Option<String> {
    info.nb_frames().map(|n| n.to_string())
}

static SHORT_COLUMNS: [Column; 3] = [
    Column { title: "size", width: 9, render: size },
    Column { title: "fps", width: 6, render: fps },
    Column { title: "duration", width: 12, render: duration },
];

static LONG_COLUMNS: [Column; 3] = [
    Column { title: "codec", width: 6, render: codec },
    Column { title: "aspect", width: 6, render: aspect },
    Column { title: "bitrate", width: 8, render: bitrate },
];

static FULL_COLUMNS: [Column; 4] = [
    Column { title: "profile", width: 10, render: profile },
    Column { title: "level", width: 5, render: level },
    Column { title: "pix_fmt", width: 10, render: pix_fmt },
    Column { title: "frames", width: 7, render: frames },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamPrinter {
    print_mode: u8,
}

impl StreamPrinter {
    pub fn new(print_mode: u8) -> Self {
        Self { print_mode }
    }

    fn columns(&self) -> impl Iterator<Item = &'static Column> {
        let long: &'static [Column] = if self.print_mode >= 1 { &LONG_COLUMNS } else { &[] };
        let full: &'static [Column] = if self.print_mode >= 2 { &FULL_COLUMNS } else { &[] };
        SHORT_COLUMNS.iter().chain(long).chain(full)
    }

    pub fn header(&self) -> String {
        let titles = self
            .columns()
            .map(|c| format!("{:<w$}", c.title, w = c.width))
            .chain(std::iter::once("file".to_string()))
            .join(" ");
        let rules = self
            .columns()
            .map(|c| "=".repeat(c.width))
            .chain(std::iter::once("=".repeat(4)))
            .join(" ");
        format!("{}\n{}", titles, rules)
    }

    pub fn line(&self, info: &StreamInfo, name: &str) -> String {
        self.columns()
            .map(|c| {
                let value = (c.render)(info).unwrap_or_else(|| MISSING.to_string());
                format!("{:<w$}", value, w = c.width)
            })
            .chain(std::iter::once(name.to_string()))
            .join(" ")
    }
}
