use async_trait::async_trait;

use crate::record::{PostingId, PostingRecord};

/// Stateful listing step: one search results page for a keyword.
///
/// Implementations share a live session across calls, the coordinator never
/// calls `list_ids` concurrently. A failing page is reported as an error and
/// handled by the coordinator exactly like an empty page.
#[async_trait]
pub trait ListingSource: Send {
    async fn list_ids(
        &mut self,
        keyword: &str,
        page: usize,
        limit: usize,
    ) -> anyhow::Result<Vec<PostingId>>;
}

/// Stateless detail step, may be called concurrently.
#[async_trait]
pub trait DetailFetcher: Send + Sync {
    async fn fetch(&self, id: &PostingId) -> Result<PostingRecord, FetchError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("HTTP error {0}")]
    Http(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Where accepted records of a keyword end up.
pub trait RecordSink {
    fn accept(&mut self, keyword: &str, record: &PostingRecord) -> anyhow::Result<()>;
}

impl RecordSink for Vec<(String, PostingRecord)> {
    fn accept(&mut self, keyword: &str, record: &PostingRecord) -> anyhow::Result<()> {
        self.push((keyword.to_string(), record.clone()));
        Ok(())
    }
}
