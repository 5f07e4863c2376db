use std::path::PathBuf;

use clap::Parser;
use fftools::{compare::{compare, CompareOptions}, logging::init_logging};

/// Compare the video stream metadata of several files.
#[derive(Parser)]
#[command(name = "ffcmp")]
pub struct Cli {
    /// Movie files.
    #[clap(required = true)]
    pub input_file: Vec<PathBuf>,
    /// Targets to be compared, 0 origin, comma separated.
    #[clap(short = 't', value_delimiter = ',')]
    pub target: Option<Vec<usize>>,
    #[clap(short = 'v')]
    pub verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = CompareOptions {
        targets: cli.target,
        ..CompareOptions::new(cli.input_file)
    };
    for line in compare(&options)? {
        println!("{}", line);
    }

    Ok(())
}
