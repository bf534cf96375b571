pub mod aggregate;
pub mod batch_dedup;
pub mod listings;
pub mod matching_key;
pub mod sales;
