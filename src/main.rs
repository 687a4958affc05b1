use std::process::ExitCode;

use clap::Parser;
use streampipe::{init_logging, StreamPipe, StreamPipeResult};

mod cli;

use cli::Cli;

fn run(cli: Cli) -> StreamPipeResult<()> {
    let config = cli.into_config()?;
    init_logging(config.log_level);

    let pipeline = config.build_pipeline("streampipe")?;
    let pipe = StreamPipe::open(config.source(), config.destination(), config.mode)?;

    // Flushes even when a stage fails
    pipe.scope(|pipe| pipeline.execute(pipe))
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("streampipe: {}", e);
            ExitCode::FAILURE
        }
    }
}
