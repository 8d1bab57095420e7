//! Create-api-key command - issues a key directly against the configured store

use clap::Args;
use uuid::Uuid;

use crate::Repositories;
use crate::infrastructure::api_key::{ApiKeyGenerator, ApiKeyService};

#[derive(Debug, Args)]
pub struct CreateApiKeyArgs {
    /// What the key is for
    #[arg(long)]
    pub description: String,

    /// Product the key is bound to
    #[arg(long)]
    pub product_id: Option<Uuid>,
}

pub async fn run(args: CreateApiKeyArgs) -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    let repositories = Repositories::from_config(&config).await?;

    let service = ApiKeyService::new(repositories.api_keys)
        .with_generator(ApiKeyGenerator::new(config.api_key.credential_format()));

    let result = service.create(args.description, args.product_id).await?;
    let key = &result.api_key;

    println!("API key created");
    println!("  id:          {}", key.id());
    println!("  prefix:      {}", key.prefix());
    println!("  description: {}", key.description());
    if let Some(product_id) = key.product_id() {
        println!("  product_id:  {}", product_id);
    }
    println!();
    println!("{}", result.full_key);
    println!();
    println!("Store this key now; it cannot be shown again.");

    Ok(())
}
