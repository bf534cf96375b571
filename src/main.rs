use chrono::Local;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use peachtree::config::EtlConfig;
use peachtree::infrastructure::hex_index::{GeoJsonHexIndex, HexIndex, NullHexIndex};
use peachtree::infrastructure::parcl_client::ParclClient;
use peachtree::persistence::init_database;
use peachtree::pipeline::EtlPipeline;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "peachtree=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    if let Err(e) = run().await {
        error!("ETL pipeline failed: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting ETL pipeline...");

    let config = EtlConfig::from_env()?;
    let today = Local::now().date_naive();
    info!(
        "Data range: {} to {}",
        config.min_event_date(today),
        config.max_event_date(today)
    );
    info!(
        "Lookback window: {} months, retention window: {} months",
        config.lookback_window, config.retention_window
    );

    let pool = init_database(&config.database_url).await?;

    let hex_index: Box<dyn HexIndex> = match GeoJsonHexIndex::from_file(&config.hex_geojson_path) {
        Ok(index) => {
            info!("Loaded {} hex polygons", index.len());
            Box::new(index)
        }
        Err(e) => {
            warn!(
                "Hex geodata unavailable ({}); hex aggregation will be empty",
                e
            );
            Box::new(NullHexIndex)
        }
    };

    let client = ParclClient::new(&config.api_base_url, &config.api_key);
    let pipeline = EtlPipeline::new(config, client, hex_index, pool);
    let report = pipeline.run(today).await?;

    info!("ETL pipeline completed successfully!");
    info!(
        "Summary: listings={} sales={} hex_rows={} county_rows={} net_sales_change={:+}",
        report.listings_processed,
        report.sales_processed,
        report.hex_rows,
        report.county_rows,
        report.reconciliation.net_change()
    );

    Ok(())
}
