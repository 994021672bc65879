use clap::Parser;
use tracing_subscriber::EnvFilter;

use cbm_match::cli;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("cbm_match=debug,info")
    } else {
        EnvFilter::new("cbm_match=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        cli::Commands::Match(args) => {
            cli::matching::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Qa(args) => {
            cli::qa::run(args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}
