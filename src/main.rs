use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    match args.get_command() {
        cli::Commands::Start { port } => {
            commands::start::execute(&args.config, port).await?;
        }
        cli::Commands::Test => {
            commands::test::execute(&args.config)?;
        }
        cli::Commands::Version => {
            println!("Visa Log Server v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
