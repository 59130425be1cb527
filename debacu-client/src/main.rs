//! debacu-loader - run one subscription-view activation and print the result
//!
//! Usage: `debacu-loader <customer_id> [location_url]`
//!
//! Reads backend settings from the environment (`.env` supported). Setting
//! `DEBACU_FIXTURES=<file.json>` serves reads from a JSON file of
//! `{ "<table>": [rows...] }` instead of the network.

use std::sync::Arc;

use anyhow::Context;
use debacu_client::{
    ClientConfig, DataSource, MemoryDataSource, RestDataSource, SubscriptionController,
    SubscriptionDataLoader, SubscriptionStatusLoader, SubscriptionView, UrlLocation,
};

const DEFAULT_LOCATION: &str = "http://localhost/cuenta";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debacu_client=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let customer_id = args.next().filter(|id| !id.is_empty());
    let location = args.next().unwrap_or_else(|| DEFAULT_LOCATION.to_string());

    let fixtures = std::env::var("DEBACU_FIXTURES").ok();
    let config = match (ClientConfig::from_env(), fixtures.is_some()) {
        (Ok(config), _) => config,
        (Err(_), true) => ClientConfig::default(),
        (Err(e), false) => return Err(e.into()),
    };

    let source: Arc<dyn DataSource> = match &fixtures {
        Some(path) => Arc::new(load_fixtures(path)?),
        None => Arc::new(RestDataSource::new(&config)?),
    };

    tracing::info!(
        customer_id = customer_id.as_deref().unwrap_or("-"),
        app_id = %config.app_id,
        "Starting subscription load"
    );

    let view = SubscriptionView::new();
    let loader = SubscriptionDataLoader::new(source.clone(), view.clone(), &config);
    let mut controller = SubscriptionController::new(loader, UrlLocation::parse(&location)?);

    controller.set_customer(customer_id.as_deref());
    if let Some(activation) = controller.activation_mut() {
        activation.settled().await;
    }

    let subscription = match customer_id.as_deref() {
        Some(id) => Some(SubscriptionStatusLoader::new(source, &config).build(id).await),
        None => None,
    };

    let output = serde_json::json!({
        "location": controller.location().url().as_str(),
        "view": view.snapshot(),
        "subscription": subscription,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn load_fixtures(path: &str) -> anyhow::Result<MemoryDataSource> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let tables: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&text).with_context(|| format!("parsing {path}"))?;

    let source = MemoryDataSource::new();
    for (table, rows) in tables {
        let rows = match rows {
            serde_json::Value::Array(rows) => rows,
            _ => anyhow::bail!("table {table} in {path} is not an array of rows"),
        };
        source.set_table(table, rows);
    }
    Ok(source)
}
