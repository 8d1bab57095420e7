use clap::Parser;
use license_service::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run().await,
        Command::CreateApiKey(args) => cli::create_api_key::run(args).await,
        Command::Reconcile => cli::reconcile::run().await,
    }
}
