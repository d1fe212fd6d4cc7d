mod client;
mod config;
mod detail;
mod listing;

pub use client::build_client;
pub use config::SiteConfig;
pub use detail::{parse_detail, DetailClient};
pub use listing::{extract_posting_ids, SearchListing};
