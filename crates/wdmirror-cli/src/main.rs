use clap::Parser;
use wdmirror_core::logging;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    // Log to a file so the terminal stays free for progress output; fall back
    // to stderr if the state dir is unwritable.
    if logging::init_logging(args.verbose).is_err() {
        logging::init_logging_stderr(args.verbose);
    }

    if let Err(err) = args.run().await {
        eprintln!("wdmirror error: {:#}", err);
        std::process::exit(1);
    }
}
