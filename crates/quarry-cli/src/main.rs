//! The `quarry` binary.

use clap::Parser;
use quarry_cli::{CliArgs, QuarryCli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let cli = QuarryCli::from_args("quarry", &args)?;
    cli.run(args).await?;
    Ok(())
}
