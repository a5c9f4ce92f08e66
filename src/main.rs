use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_cart::{
    api::HttpCartApi,
    auth::StaticToken,
    config::CartConfig,
    models::ProductRef,
    services::CartStore,
};

#[derive(Parser)]
#[command(name = "storefront-cart")]
#[command(version, about = "Inspect and edit a storefront cart")]
struct Cli {
    /// Bearer token of the signed-in user
    #[arg(long, env = "CART_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the current cart
    Show,
    /// Add one unit of a product
    Add { product_id: String },
    /// Remove a product entirely
    Remove { product_id: String },
    /// Set the quantity of a product
    Set { product_id: String, quantity: u32 },
    /// Empty the cart
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,storefront_cart=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = CartConfig::from_env()?;
    tracing::debug!(api_url = %config.api_url, "using cart backend");

    let tokens = match cli.token {
        Some(token) => StaticToken::new(token),
        None => {
            tracing::warn!("no CART_TOKEN set, cart operations will be skipped");
            StaticToken::none()
        }
    };
    let api = HttpCartApi::from_config(&config)?;
    let store = CartStore::new(Arc::new(api), Arc::new(tokens), &config);

    // mutations resync on success; a fetch first lets `add` see existing lines
    store.refresh(true).await;

    match cli.command {
        Command::Show => {}
        Command::Add { product_id } => {
            match store.add_to_cart(&ProductRef::new(product_id.clone())).await {
                Some(false) => anyhow::bail!("backend rejected product {product_id}"),
                Some(true) | None => {}
            }
        }
        Command::Remove { product_id } => store.remove_from_cart(&product_id).await,
        Command::Set {
            product_id,
            quantity,
        } => store.update_quantity(&product_id, quantity).await,
        Command::Clear => store.clear_cart().await,
    }

    let cart = store.cart();
    tracing::info!(
        items = cart.len(),
        quantity = store.total_quantity(),
        "cart ready"
    );
    println!("{}", serde_json::to_string_pretty(&cart)?);

    Ok(())
}
