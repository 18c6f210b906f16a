use clap::Parser;
use eso_processor::cli::{self, Args};
use std::process;

fn main() {
    let args = Args::parse();
    cli::init_tracing(args.verbose);

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    if let Err(error) = runtime.block_on(cli::run(args)) {
        eprintln!("Error: {:#}", error);
        process::exit(1);
    }
}
