//! intentcheck CLI entry point.

use clap::Parser;
use intentcheck::cli::{self, Cli, Commands, EXIT_ERROR};

fn main() {
    let cli = Cli::parse();

    let verbose = matches!(&cli.command, Commands::Check(args) if args.verbose);
    cli::init_logging(verbose);

    let result = match &cli.command {
        Commands::Check(args) => cli::run_check(args),
        Commands::Diff(args) => cli::run_diff(args),
        Commands::Init(args) => cli::run_init(args),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
