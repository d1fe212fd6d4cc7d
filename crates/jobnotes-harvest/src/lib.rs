mod annotate;
mod config;
mod coordinator;
mod ledger;
mod limiter;
mod record;
mod source;
mod vocab;

pub use annotate::Annotator;
pub use config::{DelayRange, HarvestConfig, OnError};
pub use coordinator::{BatchReport, Coordinator, KeywordReport};
pub use ledger::{Claim, DedupLedger};
pub use limiter::RateLimiter;
pub use record::{PostingId, PostingRecord};
pub use source::{DetailFetcher, FetchError, ListingSource, RecordSink};
pub use vocab::{is_term_candidate, VocabularyPaths, VocabularyStore};

pub use anyhow;
