use std::path::PathBuf;

use clap::Parser;
use fftools::{
    ffmpeg::probe::probe_frames,
    gop::{analyze, GopConfig},
    logging::init_logging,
};
use log::warn;

/// Show stats of GOP.
#[derive(Parser)]
#[command(name = "ffgop")]
pub struct Cli {
    /// Video file.
    pub input_file: PathBuf,
    /// Show the frame pattern of every GOP.
    #[clap(short = 'p')]
    pub show_pattern: bool,
    /// Put all GOPs of the pattern on one line.
    #[clap(long)]
    pub no_newline: bool,
    /// Max frames to be read [default: 300 with -p, else 10000].
    #[clap(long = "frames")]
    pub max_frames: Option<usize>,
    /// Disable the interval statistics.
    #[clap(short = 'n')]
    pub no_stat: bool,
    #[clap(short = 'v')]
    pub verbose: bool,
}

impl From<&Cli> for GopConfig {
    fn from(cli: &Cli) -> Self {
        GopConfig {
            max_frames: cli.max_frames,
            show_pattern: cli.show_pattern,
            add_newline: !cli.no_newline,
            show_stats: !cli.no_stat,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = GopConfig::from(&cli);
    let frames = probe_frames(&cli.input_file, config.frame_limit())?;
    let analysis = analyze(&frames)?;

    for anomaly in &analysis.anomalies {
        warn!("{}", anomaly);
    }
    if config.show_pattern {
        print!("{}", analysis.pattern_report(&config));
    }
    if config.show_stats {
        print!("{}", analysis.stats_report());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config() {
        let cli = Cli::try_parse_from(["ffgop", "a.mp4"]).unwrap();
        let config = GopConfig::from(&cli);
        assert!(!config.show_pattern);
        assert!(config.add_newline);
        assert!(config.show_stats);
        assert_eq!(config.max_frames, None);

        let cli = Cli::try_parse_from(["ffgop", "-p", "-n", "--no-newline", "--frames", "50", "a.mp4"])
            .unwrap();
        let config = GopConfig::from(&cli);
        assert!(config.show_pattern);
        assert!(!config.add_newline);
        assert!(!config.show_stats);
        assert_eq!(config.max_frames, Some(50));
        assert_eq!(config.frame_limit(), 50);

        assert!(Cli::try_parse_from(["ffgop"]).is_err());
    }
}
