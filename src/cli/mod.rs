//! CLI module for the license service
//!
//! Subcommands:
//! - `serve`: HTTP API with the background expiration sweep
//! - `create-api-key`: issue an agent API key against the configured store
//! - `reconcile`: run one expiration pass and exit

pub mod create_api_key;
pub mod reconcile;
pub mod serve;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// License Service - license validation and lifecycle management
#[derive(Parser)]
#[command(name = "license-service")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Create an API key and print it once
    CreateApiKey(create_api_key::CreateApiKeyArgs),

    /// Expire overdue licenses once and print a summary
    Reconcile,
}

/// Load `.env` and layered configuration, then install logging
fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create_api_key() {
        let product = uuid::Uuid::new_v4();
        let cli = Cli::try_parse_from([
            "license-service",
            "create-api-key",
            "--description",
            "billing agent",
            "--product-id",
            &product.to_string(),
        ])
        .unwrap();

        match cli.command {
            Command::CreateApiKey(args) => {
                assert_eq!(args.description, "billing agent");
                assert_eq!(args.product_id, Some(product));
            }
            _ => panic!("expected create-api-key"),
        }
    }

    #[test]
    fn test_create_api_key_requires_description() {
        assert!(Cli::try_parse_from(["license-service", "create-api-key"]).is_err());
    }

    #[test]
    fn test_parse_simple_commands() {
        let serve = Cli::try_parse_from(["license-service", "serve"]).unwrap();
        assert!(matches!(serve.command, Command::Serve));

        let reconcile = Cli::try_parse_from(["license-service", "reconcile"]).unwrap();
        assert!(matches!(reconcile.command, Command::Reconcile));
    }
}
