use std::{io::stdout, path::PathBuf};

use clap::{ArgAction, Parser};
use fftools::{
    listing::{
        list, parse_extensions, ListOptions, DEFAULT_EXTENSIONS, MAX_BITRATE, MIN_BITRATE,
        X_CHECK_BITRATE,
    },
    logging::init_logging,
};

/// List video files.
#[derive(Parser)]
#[command(name = "ffls")]
pub struct Cli {
    /// Files or directories [default: .].
    pub input_file: Vec<PathBuf>,
    /// Show long info, -l -l shows more.
    #[clap(short = 'l', action = ArgAction::Count)]
    pub long: u8,
    /// Only show files within the bitrate range.
    #[clap(short = 'c')]
    pub check_bitrate: bool,
    #[clap(long, default_value_t = MAX_BITRATE)]
    pub max_bitrate: u64,
    #[clap(long, default_value_t = MIN_BITRATE)]
    pub min_bitrate: u64,
    /// Check against the narrow 3900k..4100k range.
    #[clap(long)]
    pub x_check_bitrate: bool,
    /// Extensions to show, comma separated, `*` for every file.
    #[clap(short = 'p', default_value = DEFAULT_EXTENSIONS)]
    pub extensions: String,
    /// Only print the file names.
    #[clap(short = 'n')]
    pub names_only: bool,
    #[clap(short = 'r')]
    pub recursive: bool,
    #[clap(short = 'v')]
    pub verbose: bool,
}

impl From<Cli> for ListOptions {
    fn from(cli: Cli) -> Self {
        let bitrate_range = if cli.x_check_bitrate {
            Some(X_CHECK_BITRATE)
        } else if cli.check_bitrate {
            Some(cli.min_bitrate..=cli.max_bitrate)
        } else {
            None
        };
        let extensions = match cli.extensions.trim() {
            "*" => None,
            list => Some(parse_extensions(list)),
        };
        ListOptions {
            inputs: if cli.input_file.is_empty() {
                vec![PathBuf::from(".")]
            } else {
                cli.input_file
            },
            print_mode: cli.long,
            bitrate_range,
            extensions,
            names_only: cli.names_only,
            recursive: cli.recursive,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    list(&ListOptions::from(cli), &mut stdout().lock())
}
