use anyhow::Result;
use clap::Parser;
use smart_extract::cli;
use tracing::error;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    if let Err(err) = cli::dispatch(args) {
        error!("{:#}", err);
        eprintln!("smart-extract: {:#}", err);
        std::process::exit(1);
    }
    Ok(())
}
