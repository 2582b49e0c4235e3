// Listing index loader.
//
// Startup sequence:
// 1. Initialize tracing (stderr; there is no interactive front-end)
// 2. Parse arguments and load the search config
// 3. Read the listing documents
// 4. Create the index if it is missing
// 5. Embed and upload the listings

use std::path::PathBuf;

use anyhow::{bail, Context};
use serde_json::Value;
use tracing::info;

use voicerag_tools::{IndexManager, SearchConfig};

#[derive(Debug)]
struct Args {
    config: PathBuf,
    data: PathBuf,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let mut config = None;
    let mut data = None;
    while let Some(arg) = args.next() {
        let mut value = || {
            args.next()
                .map(PathBuf::from)
                .with_context(|| format!("{arg} needs a value"))
        };
        match arg.as_str() {
            "--config" => config = Some(value()?),
            "--data" => data = Some(value()?),
            other => bail!("unknown argument {other}"),
        }
    }
    Ok(Args {
        config: config.context("--config is required")?,
        data: data.unwrap_or_else(|| PathBuf::from("data/flat_data.json")),
    })
}

/// Listings arrive either as a bare array or wrapped in `{"listings": [...]}`.
fn listing_documents(value: Value) -> anyhow::Result<Vec<Value>> {
    match value {
        Value::Array(docs) => Ok(docs),
        Value::Object(mut obj) => match obj.remove("listings") {
            Some(Value::Array(docs)) => Ok(docs),
            _ => bail!("expected an array of listings"),
        },
        _ => bail!("expected an array of listings"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;

    // 2. Parse arguments and load the search config
    let args = parse_args(std::env::args().skip(1))?;
    let config = SearchConfig::load(&args.config).context("failed to load search config")?;
    info!(
        "Indexing into {} on {}",
        config.index_name, config.service_name
    );

    // 3. Read the listing documents
    let text = std::fs::read_to_string(&args.data)
        .with_context(|| format!("failed to read {}", args.data.display()))?;
    let docs = listing_documents(
        serde_json::from_str(&text)
            .with_context(|| format!("{} is not valid JSON", args.data.display()))?,
    )?;
    info!("Loaded {} listings from {}", docs.len(), args.data.display());

    // 4. Create the index if it is missing
    let manager = IndexManager::new(config);
    manager
        .create_index_if_not_exists()
        .await
        .context("failed to create index")?;

    // 5. Embed and upload the listings
    let total = docs.len();
    let uploaded = manager
        .upload_documents(docs)
        .await
        .context("failed to upload listings")?;
    info!("Indexed {} of {} listings", uploaded, total);
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("voicerag_index=info,voicerag_tools=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
