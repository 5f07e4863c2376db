use std::{
    io::stdin,
    path::{Path, PathBuf},
};

use anyhow::bail;
use clap::Parser;
use fftools::{
    display::StreamPrinter,
    ffmpeg::{
        canon::{self, CanonDecision, CanonOptions, Rotation},
        command_line,
        probe::first_video_stream,
        VideoTimestamp,
    },
    logging::init_logging,
};
use log::error;

/// Convert a video file.
#[derive(Parser)]
#[command(name = "ffcanon")]
pub struct Cli {
    /// Movie files, `-` reads the names from stdin.
    #[clap(required = true)]
    pub input_file: Vec<PathBuf>,
    /// The converted file name [default: <name>-dst.mp4].
    #[clap(long)]
    pub output: Option<PathBuf>,
    /// Profile level.
    #[clap(long)]
    pub level: Option<String>,
    /// Target width, e.g. --scale 1280.
    #[clap(long)]
    pub scale: Option<u32>,
    /// Direction of a 90 degree rotation.
    #[clap(long, value_enum)]
    pub rotate: Option<Rotation>,
    /// Passed to ffmpeg as -ss.
    #[clap(short = 's', long = "time-start", visible_alias = "start-time")]
    pub time_start: Option<VideoTimestamp>,
    /// Passed to ffmpeg as -to.
    #[clap(short = 'e', long = "time-end", visible_alias = "end-time")]
    pub time_end: Option<VideoTimestamp>,
    /// Passed to ffmpeg as -t, wins over --time-end.
    #[clap(short = 'd', long = "time-duration")]
    pub time_duration: Option<VideoTimestamp>,
    /// Remove audio.
    #[clap(short = 'a', long = "no-audio")]
    pub no_audio: bool,
    /// Convert even if the video is narrower than 1920.
    #[clap(short = 'f')]
    pub force: bool,
    /// Re-encode with profile high instead of keeping the original bitrate.
    #[clap(short = 'R')]
    pub no_copy_bitrate: bool,
    /// Overwrite the output file.
    #[clap(short = 'y')]
    pub overwrite: bool,
    /// Only show the profile.
    #[clap(short = 'p')]
    pub show_profile: bool,
    #[clap(short = 'v')]
    pub verbose: bool,
}

impl From<&Cli> for CanonOptions {
    fn from(cli: &Cli) -> Self {
        CanonOptions {
            output: cli.output.clone(),
            level: cli.level.clone(),
            scale: cli.scale,
            rotate: cli.rotate,
            time_start: cli.time_start,
            time_end: cli.time_end,
            time_duration: cli.time_duration,
            no_audio: cli.no_audio,
            force: cli.force,
            copy_bitrate: !cli.no_copy_bitrate,
            overwrite: cli.overwrite,
            show_profile: cli.show_profile,
            verbose: cli.verbose,
        }
    }
}

fn convert(input: &Path, options: &CanonOptions) -> anyhow::Result<()> {
    let info = first_video_stream(input)?;

    println!("## video stream profile: {}", input.display());
    let printer = StreamPrinter::new(1);
    println!("{}", printer.header());
    println!("{}", printer.line(&info, &input.display().to_string()));

    match canon::plan(input, &info, options)? {
        CanonDecision::ProfileOnly => {}
        CanonDecision::NoResize => println!("no need to resize."),
        CanonDecision::Convert(plan) => {
            println!("===> {}", command_line(&plan.command()));
            if let Some(duration) = plan.total_duration {
                println!("Duration: {}", duration);
            }
            canon::run(&plan, options.verbose)?;
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut options = CanonOptions::from(&cli);
    if options.implies_force() && !options.force {
        options.force = true;
        println!("NOTE: set force.");
    }

    let inputs = canon::input_names(&cli.input_file, stdin().lock())?;

    let mut failed = 0;
    for input in &inputs {
        if let Err(e) = convert(input, &options) {
            error!("{}: {:#}", input.display(), e);
            failed += 1;
        }
    }
    if failed > 0 {
        bail!("{} of {} inputs failed", failed, inputs.len());
    }

    Ok(())
}
