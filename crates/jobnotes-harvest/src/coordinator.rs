use std::cmp;
use std::fmt;

use anyhow::anyhow;
use futures::{pin_mut, stream, StreamExt};

use crate::config::{HarvestConfig, OnError};
use crate::ledger::DedupLedger;
use crate::limiter::RateLimiter;
use crate::record::{PostingId, PostingRecord};
use crate::source::{DetailFetcher, ListingSource, RecordSink};
use crate::vocab::VocabularyStore;

/// Outcome of one keyword run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordReport {
    pub keyword: String,
    pub records: usize,
    pub pages: usize,
    pub duplicates: usize,
    pub fetch_failures: usize,
    pub store_failures: usize,
    pub hit_page_ceiling: bool,
    pub error: Option<String>,
}

impl KeywordReport {
    fn new(keyword: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            ..Default::default()
        }
    }
}

impl fmt::Display for KeywordReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} records, {} pages, {} duplicates, {} fetch failures",
            self.keyword, self.records, self.pages, self.duplicates, self.fetch_failures
        )?;
        if self.store_failures > 0 {
            write!(f, ", {} not stored", self.store_failures)?;
        }
        if self.hit_page_ceiling {
            write!(f, " (page limit reached)")?;
        }
        if let Some(e) = &self.error {
            write!(f, " [failed: {e}]")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub keywords: Vec<KeywordReport>,
}

impl BatchReport {
    pub fn total_records(&self) -> usize {
        self.keywords.iter().map(|k| k.records).sum()
    }

    pub fn failed_keywords(&self) -> impl Iterator<Item = &KeywordReport> {
        self.keywords.iter().filter(|k| k.error.is_some())
    }
}

/// Turns keywords into bounded, deduplicated streams of annotated postings.
///
/// Per keyword, pages of the [`ListingSource`] are walked from page 1 until
/// the target count is reached, a page comes back empty, or the page limit
/// is hit. A page made only of known ids does not stop the walk since the
/// listing order is not chronological. Unknown ids are fetched through the
/// [`DetailFetcher`] in a bounded, order preserving pipeline, then learned
/// from, annotated, recorded in the ledger and handed to the sink.
pub struct Coordinator<L, F> {
    config: HarvestConfig,
    listing: L,
    fetcher: F,
    ledger: DedupLedger,
    vocab: VocabularyStore,
    listing_limiter: RateLimiter,
    detail_limiter: RateLimiter,
}

impl<L, F> Coordinator<L, F>
where
    L: ListingSource,
    F: DetailFetcher,
{
    /// Fails when `config` does not pass [`HarvestConfig::validate`].
    pub fn new(
        config: HarvestConfig,
        listing: L,
        fetcher: F,
        ledger: DedupLedger,
        vocab: VocabularyStore,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let listing_limiter = RateLimiter::new(config.listing_delay);
        let detail_limiter = RateLimiter::new(config.detail_delay);
        Ok(Self {
            config,
            listing,
            fetcher,
            ledger,
            vocab,
            listing_limiter,
            detail_limiter,
        })
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    pub fn vocabulary(&self) -> &VocabularyStore {
        &self.vocab
    }

    pub fn vocabulary_mut(&mut self) -> &mut VocabularyStore {
        &mut self.vocab
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Runs every keyword in turn, a failing keyword never stops the others
    /// unless `on_keyword_error` is [`OnError::Fail`].
    pub async fn harvest_all<S, K>(&mut self, keywords: &[K], sink: &mut S) -> anyhow::Result<BatchReport>
    where
        S: RecordSink + ?Sized,
        K: AsRef<str>,
    {
        let mut batch = BatchReport::default();
        for keyword in keywords {
            let keyword = keyword.as_ref();
            let mut report = KeywordReport::new(keyword);
            match self.run_keyword(keyword, sink, &mut report).await {
                Ok(()) => log::info!("Done with {report}"),
                Err(e) => match self.config.on_keyword_error {
                    OnError::SkipAndLog => {
                        log::error!("Skipping keyword {keyword:?} got: {e:#}");
                        report.error = Some(format!("{e:#}"));
                    }
                    OnError::Fail => return Err(e.context(format!("Keyword {keyword:?} failed"))),
                },
            }
            batch.keywords.push(report);
        }
        Ok(batch)
    }

    /// Harvests a single keyword, sending every accepted record to `sink`
    /// as soon as it is ready.
    pub async fn harvest_keyword<S>(&mut self, keyword: &str, sink: &mut S) -> anyhow::Result<KeywordReport>
    where
        S: RecordSink + ?Sized,
    {
        let mut report = KeywordReport::new(keyword);
        self.run_keyword(keyword, sink, &mut report).await?;
        Ok(report)
    }

    /// Page loop of one keyword, `report` keeps what was counted before an
    /// error.
    async fn run_keyword<S>(
        &mut self,
        keyword: &str,
        sink: &mut S,
        report: &mut KeywordReport,
    ) -> anyhow::Result<()>
    where
        S: RecordSink + ?Sized,
    {
        let target = self.config.target_per_keyword;
        log::info!("Harvesting {keyword:?}, target {target}");

        let mut page = 1;
        while report.records < target {
            if page > self.config.max_pages {
                log::warn!(
                    "Reached the {} pages limit for {keyword:?} with {}/{target} records",
                    self.config.max_pages,
                    report.records
                );
                report.hit_page_ceiling = true;
                break;
            }

            let remaining = target - report.records;
            let ids = self.list_page(keyword, page, remaining).await;
            report.pages = page;
            if ids.is_empty() {
                log::info!("No postings on page {page} for {keyword:?}, stopping");
                break;
            }

            let before = report.records;
            self.harvest_page(keyword, &ids, sink, report).await?;
            if report.records == before {
                log::info!("Nothing new on page {page} for {keyword:?}");
            }
            page += 1;
        }

        Ok(())
    }

    /// Collects the records of one keyword in memory.
    pub async fn collect_keyword(
        &mut self,
        keyword: &str,
    ) -> anyhow::Result<(KeywordReport, Vec<PostingRecord>)> {
        let mut sink = Vec::new();
        let report = self.harvest_keyword(keyword, &mut sink).await?;
        Ok((report, sink.into_iter().map(|(_, r)| r).collect()))
    }

    async fn list_page(&mut self, keyword: &str, page: usize, limit: usize) -> Vec<PostingId> {
        self.listing_limiter.acquire().await;
        log::info!("Listing page {page} for {keyword:?}");
        match self.listing.list_ids(keyword, page, limit).await {
            Ok(ids) => {
                log::debug!("Page {page} for {keyword:?} has {} postings", ids.len());
                ids
            }
            Err(e) => {
                log::warn!("Listing page {page} for {keyword:?} failed, got: {e:#}");
                Vec::new()
            }
        }
    }

    async fn harvest_page<S>(
        &mut self,
        keyword: &str,
        ids: &[PostingId],
        sink: &mut S,
        report: &mut KeywordReport,
    ) -> anyhow::Result<()>
    where
        S: RecordSink + ?Sized,
    {
        let Self {
            config,
            fetcher,
            ledger,
            vocab,
            detail_limiter,
            ..
        } = self;
        let target = config.target_per_keyword;

        let mut claims = Vec::with_capacity(ids.len());
        for id in ids {
            match ledger.claim(id) {
                Some(claim) => claims.push(claim),
                None => {
                    log::debug!("Posting {id} already captured, skipping");
                    report.duplicates += 1;
                }
            }
        }
        if claims.is_empty() {
            return Ok(());
        }

        let width = cmp::min(config.concurrent_fetches.get(), target - report.records);
        let fetcher = &*fetcher;
        let detail_limiter = &*detail_limiter;
        let fetches = stream::iter(claims)
            .map(|claim| async move {
                detail_limiter.acquire().await;
                log::debug!("Fetching posting {}", claim.id());
                let fetched = fetcher.fetch(claim.id()).await;
                (claim, fetched)
            })
            .buffered(cmp::max(1, width));
        pin_mut!(fetches);

        while let Some((claim, fetched)) = fetches.next().await {
            let mut record = match fetched {
                Ok(record) => record,
                Err(e) => {
                    report.fetch_failures += 1;
                    match config.on_fetch_error {
                        OnError::SkipAndLog => {
                            log::warn!("Skipping posting {} got: {e}", claim.id());
                            continue;
                        }
                        OnError::Fail => {
                            return Err(anyhow!("Couldn't fetch posting {} got: {e}", claim.id()))
                        }
                    }
                }
            };
            if record.id != *claim.id() {
                record.id = claim.id().clone();
            }

            vocab.process(&mut record);
            claim.commit();
            report.records += 1;
            log::info!(
                "Captured {}/{target} for {keyword:?}: {} ({})",
                report.records,
                record.title,
                record.id
            );

            if let Err(e) = sink.accept(keyword, &record) {
                report.store_failures += 1;
                log::error!("Couldn't store posting {} got: {e:#}", record.id);
            }

            if report.records >= target {
                break;
            }
        }

        Ok(())
    }
}
