use blockprobe::{cli::CliArgs, drivers, logging};

use clap::Parser;

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    logging::init(args.verbose);

    drivers::transpose(args)
}
