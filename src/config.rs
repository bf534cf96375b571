use chrono::{Datelike, Days, Months, NaiveDate};
use thiserror::Error;

/// Property types requested from the events API (vendor spellings).
pub const PROPERTY_TYPES: [&str; 3] = ["SINGLE_FAMILY", "CONDO", "TOWNHOUSE"];

/// Vendor ids for the tracked metro Atlanta counties.
pub const COUNTIES: [(i64, &str); 29] = [
    (5821775, "Barrow"),
    (5823208, "Bartow"),
    (5824489, "Butts"),
    (5821127, "Carroll"),
    (5822987, "Cherokee"),
    (5821000, "Clayton"),
    (5822520, "Cobb"),
    (5820743, "Coweta"),
    (5820885, "Dawson"),
    (5821075, "DeKalb"),
    (5822002, "Douglas"),
    (5822843, "Fayette"),
    (5824605, "Forsyth"),
    (5823604, "Fulton"),
    (5822064, "Gwinnett"),
    (5823136, "Haralson"),
    (5821562, "Heard"),
    (5820830, "Henry"),
    (5820767, "Jasper"),
    (5824502, "Lumpkin"),
    (5822765, "Meriwether"),
    (5822014, "Morgan"),
    (5823086, "Newton"),
    (5822617, "Paulding"),
    (5821076, "Pickens"),
    (5822152, "Pike"),
    (5823393, "Rockdale"),
    (5824484, "Spalding"),
    (5821707, "Walton"),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("PARCL_API_KEY is not set in the environment")]
    MissingApiKey,
}

/// Configuration for one ETL run: API access, store location, fetch windows,
/// retention policy, and data-quality thresholds.
#[derive(Debug, Clone)]
pub struct EtlConfig {
    pub api_key: String,
    pub api_base_url: String,
    pub database_url: String,
    pub hex_geojson_path: String,

    /// Months between today and the newest month the API is asked for.
    pub lookback_lag: u32,
    /// Months of sale events fetched on each run.
    pub lookback_window: u32,
    /// Months of sales history retained in the store (FIFO cutoff).
    pub retention_window: u32,
    /// Months of sales included in hex-level aggregation.
    pub hex_aggregation_window: u32,

    pub insert_batch_size: usize,
    pub delete_batch_size: usize,

    pub min_price: i64,
    pub min_sqft: f64,
    pub max_price_per_sqft: f64,
    pub api_limit: u32,
}

impl Default for EtlConfig {
    fn default() -> Self {
        EtlConfig {
            api_key: String::new(),
            api_base_url: "https://api.parcllabs.com".to_string(),
            database_url: "sqlite://data/peachtree.db".to_string(),
            hex_geojson_path: "config/metro-hex.geojson".to_string(),
            lookback_lag: 2,
            lookback_window: 6,
            retention_window: 36,
            hex_aggregation_window: 12,
            insert_batch_size: 500,
            delete_batch_size: 50,
            min_price: 50_000,
            min_sqft: 500.0,
            max_price_per_sqft: 2_500.0,
            api_limit: 50_000,
        }
    }
}

impl EtlConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Result<EtlConfig, ConfigError> {
        let mut config = EtlConfig::default();

        config.api_key = std::env::var("PARCL_API_KEY").map_err(|_| ConfigError::MissingApiKey)?;

        if let Ok(base) = std::env::var("PARCL_API_BASE") {
            if !base.is_empty() {
                config.api_base_url = base;
            }
        }

        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.is_empty() {
                config.database_url = url;
            }
        }

        if let Ok(path) = std::env::var("HEX_GEOJSON_PATH") {
            if !path.is_empty() {
                config.hex_geojson_path = path;
            }
        }

        if let Ok(retention) = std::env::var("RETENTION_WINDOW_MONTHS") {
            match retention.parse::<u32>() {
                Ok(value) if value >= 1 => config.retention_window = value,
                _ => {
                    tracing::warn!(
                        "Invalid RETENTION_WINDOW_MONTHS value '{}', using default: {}",
                        retention,
                        config.retention_window
                    );
                }
            }
        }

        if let Ok(window) = std::env::var("LOOKBACK_WINDOW_MONTHS") {
            if let Ok(value) = window.parse::<u32>() {
                if value >= 1 {
                    config.lookback_window = value;
                }
            }
        }

        if let Ok(lag) = std::env::var("LOOKBACK_LAG_MONTHS") {
            if let Ok(value) = lag.parse::<u32>() {
                config.lookback_lag = value;
            }
        }

        if let Ok(hex_window) = std::env::var("HEX_AGGREGATION_WINDOW_MONTHS") {
            if let Ok(value) = hex_window.parse::<u32>() {
                if value >= 1 {
                    config.hex_aggregation_window = value;
                }
            }
        }

        if let Ok(batch) = std::env::var("INSERT_BATCH_SIZE") {
            match batch.parse::<usize>() {
                Ok(value) if value >= 1 => config.insert_batch_size = value,
                _ => {
                    tracing::warn!(
                        "Invalid INSERT_BATCH_SIZE value '{}', using default: {}",
                        batch,
                        config.insert_batch_size
                    );
                }
            }
        }

        if let Ok(batch) = std::env::var("DELETE_BATCH_SIZE") {
            match batch.parse::<usize>() {
                Ok(value) if value >= 1 => config.delete_batch_size = value,
                _ => {
                    tracing::warn!(
                        "Invalid DELETE_BATCH_SIZE value '{}', using default: {}",
                        batch,
                        config.delete_batch_size
                    );
                }
            }
        }

        if let Ok(price) = std::env::var("MIN_PRICE") {
            if let Ok(value) = price.parse::<i64>() {
                if value >= 0 {
                    config.min_price = value;
                }
            }
        }

        if let Ok(sqft) = std::env::var("MIN_SQFT") {
            if let Ok(value) = sqft.parse::<f64>() {
                if value >= 0.0 {
                    config.min_sqft = value;
                }
            }
        }

        if let Ok(max) = std::env::var("MAX_PRICE_PER_SQFT") {
            if let Ok(value) = max.parse::<f64>() {
                if value > 0.0 {
                    config.max_price_per_sqft = value;
                }
            }
        }

        if let Ok(limit) = std::env::var("API_LIMIT") {
            if let Ok(value) = limit.parse::<u32>() {
                if value >= 1 {
                    config.api_limit = value;
                }
            }
        }

        Ok(config)
    }

    /// Newest event date requested from the API: the last day of the month
    /// `lookback_lag` months before today.
    pub fn max_event_date(&self, today: NaiveDate) -> NaiveDate {
        let anchor = month_start(today - Months::new(self.lookback_lag));
        anchor + Months::new(1) - Days::new(1)
    }

    /// Oldest event date requested from the API: the first day of the month
    /// `lookback_lag + lookback_window - 1` months before today.
    pub fn min_event_date(&self, today: NaiveDate) -> NaiveDate {
        month_start(today - Months::new(self.lookback_lag + self.lookback_window - 1))
    }

    /// Retention cutoff for persisted sales: the first day of the month
    /// `retention_window` months before today. Rows strictly older are pruned.
    pub fn retention_cutoff(&self, today: NaiveDate) -> NaiveDate {
        month_start(today - Months::new(self.retention_window))
    }

    /// Start of the window used for hex-level sales aggregation.
    pub fn hex_window_start(&self, today: NaiveDate) -> NaiveDate {
        self.max_event_date(today) - Months::new(self.hex_aggregation_window)
    }

    /// Snapshot tag recorded on every row written during a run.
    pub fn as_of_tag(today: NaiveDate) -> String {
        today.format("%Y.%m.%d").to_string()
    }
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).expect("first of month is always valid")
}
