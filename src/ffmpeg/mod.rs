use std::{fmt, process::Command, str::FromStr};

use itertools::Itertools;
use log::debug;

use crate::error::ToolError;

pub mod canon;
pub mod probe;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct VideoTimestamp {
    seconds: u64,
    milliseconds: u64,
}

impl VideoTimestamp {
    pub fn from_float_seconds(seconds: f64) -> Self {
        let seconds = seconds.max(0.0);
        let s = seconds.floor() as u64;
        let ms = ((seconds - seconds.floor()) * 1000.0).round() as u64;
        let mut ret = Self {
            seconds: s,
            milliseconds: ms,
        };
        ret.normalize();
        ret
    }
    pub fn from_millis(millis: u64) -> Self {
        Self {
            seconds: millis / 1000,
            milliseconds: millis % 1000,
        }
    }
    pub fn as_float_seconds(&self) -> f64 {
        self.seconds as f64 + self.milliseconds as f64 / 1000.0
    }
    pub fn as_millis(&self) -> u64 {
        self.seconds * 1000 + self.milliseconds
    }
    pub fn saturating_sub(&self, rhs: &Self) -> Self {
        Self::from_millis(self.as_millis().saturating_sub(rhs.as_millis()))
    }
    pub fn as_hms(&self) -> (u64, u64, u64) {
        let hours = self.seconds / 3600;
        let minutes = (self.seconds - hours * 3600) / 60;
        let seconds = self.seconds - hours * 3600 - minutes * 60;
        (hours, minutes, seconds)
    }
    pub fn as_ffmpeg_arg(&self) -> String {
        let (hours, minutes, seconds) = self.as_hms();
        format!(
            "{:02}:{:02}:{:02}.{:03}",
            hours, minutes, seconds, self.milliseconds
        )
    }
    pub fn normalize(&mut self) {
        self.seconds += self.milliseconds / 1000;
        self.milliseconds %= 1000;
    }
}

impl fmt::Display for VideoTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_ffmpeg_arg())
    }
}

fn is_decimal(s: &str) -> bool {
    s.chars().any(|c| c.is_ascii_digit())
        && s.chars().all(|c| c.is_ascii_digit() || c == '.')
        && s.matches('.').count() <= 1
}

/// Accepts `SS[.fff]`, `MM:SS[.fff]` and `HH:MM:SS[.fff]`. Only the hours of
/// the three part form and a lone seconds value may reach 60 or more.
impl FromStr for VideoTimestamp {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ToolError::InvalidTime(s.to_string());

        let parts = s.trim().split(':').collect::<Vec<_>>();
        if parts.len() > 3 || !parts.iter().all(|p| is_decimal(p)) {
            return Err(invalid());
        }
        let (whole, frac) = parts.split_at(parts.len() - 1);

        let seconds = frac[0].parse::<f64>().map_err(|_| invalid())?;
        if !whole.is_empty() && seconds >= 60.0 {
            return Err(invalid());
        }
        let mut minutes = 0u64;
        for (i, part) in whole.iter().enumerate() {
            let value = part.parse::<u64>().map_err(|_| invalid())?;
            if value >= 60 && !(i == 0 && whole.len() == 2) {
                return Err(invalid());
            }
            minutes = minutes * 60 + value;
        }

        Ok(Self::from_float_seconds(minutes as f64 * 60.0 + seconds))
    }
}

pub fn command_line(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|arg| {
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || "'\"\\$`".contains(c))
            {
                format!("'{}'", arg.replace('\'', r"'\''"))
            } else {
                arg.into_owned()
            }
        })
        .join(" ")
}

pub fn log_command(cmd: &Command) {
    debug!("COMMAND: {}", command_line(cmd));
}
