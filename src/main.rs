mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use formtree::config::Config;
use formtree::observability;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    observability::init_tracing("info");

    let cli = Cli::parse();

    match cli.command {
        Commands::Server(args) => {
            let config = match args.config {
                Some(path) => Config::load_from_path(path)?,
                None => Config::load()?,
            };
            let address = args.address.unwrap_or(config.server.bind_addr);
            formtree::api::run(address, config).await?
        }
    }

    Ok(())
}
