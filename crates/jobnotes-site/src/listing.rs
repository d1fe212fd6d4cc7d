use std::collections::HashSet;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use select::document::Document;
use select::predicate::Name;

use jobnotes_harvest::{ListingSource, PostingId};

use crate::client::build_client;
use crate::config::SiteConfig;

static ENCODED_JOB: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"job%2F([a-z0-9]+)").expect("valid job regex"));
static JOB_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/job/([a-z0-9]+)").expect("valid job regex"));

/// Posting ids linked from a search results page, first seen order, at most
/// `limit` of them.
pub fn extract_posting_ids(html: &str, limit: usize) -> Vec<PostingId> {
    let document = Document::from(html);
    let mut seen = HashSet::new();
    document
        .find(Name("a"))
        .filter_map(|a| a.attr("href"))
        .filter_map(posting_id_in_href)
        .filter(|id| id != "ajax" && seen.insert(id.clone()))
        .take(limit)
        .map(PostingId::from)
        .collect()
}

/// Direct `/job/<id>` links or links carrying it url-encoded.
fn posting_id_in_href(href: &str) -> Option<String> {
    ENCODED_JOB
        .captures(href)
        .or_else(|| JOB_PATH.captures(href))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Search results pages fetched through one long lived session.
pub struct SearchListing {
    config: SiteConfig,
    client: reqwest::Client,
    warmed_up: bool,
}

impl SearchListing {
    pub fn new(config: SiteConfig) -> anyhow::Result<Self> {
        let client = build_client(&config)?;
        Ok(Self {
            config,
            client,
            warmed_up: false,
        })
    }

    /// Visits the home page once so that the session carries the site cookies.
    async fn warm_up(&mut self) {
        if self.warmed_up {
            return;
        }
        self.warmed_up = true;
        match self.client.get(self.config.base()).send().await {
            Ok(resp) => log::debug!("Session opened on {} ({})", self.config.base(), resp.status()),
            Err(e) => log::warn!("Couldn't open session on {} got: {e}", self.config.base()),
        }
    }
}

#[async_trait]
impl ListingSource for SearchListing {
    async fn list_ids(
        &mut self,
        keyword: &str,
        page: usize,
        limit: usize,
    ) -> anyhow::Result<Vec<PostingId>> {
        self.warm_up().await;

        let url = format!("{}/jobs/search/", self.config.base());
        let page_param = page.to_string();
        let html = self
            .client
            .get(&url)
            .query(&[("keyword", keyword), ("page", page_param.as_str())])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let ids = extract_posting_ids(&html, limit);
        log::info!("Found {} postings for {keyword:?} on page {page}", ids.len());
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(ids: Vec<PostingId>) -> Vec<String> {
        ids.into_iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn both_link_shapes_are_recognized() {
        let html = r#"
            <a href="https://www.104.com.tw/job/8lhbs?jobsource=joblist_search">Data</a>
            <a href='/jobs/apply?url=https%3A%2F%2Fwww.104.com.tw%2Fjob%2F7xkq2'>Apply</a>
            <a href="/company/1a2b3c">Company</a>
        "#;
        assert_eq!(ids(extract_posting_ids(html, 50)), ["8lhbs", "7xkq2"]);
    }

    #[test]
    fn duplicates_are_dropped_in_order() {
        let html = r#"<a href="/job/b2">x</a><a href="/job/a1">y</a><a href="/job/b2?x=1">z</a>"#;
        assert_eq!(ids(extract_posting_ids(html, 50)), ["b2", "a1"]);
    }

    #[test]
    fn limit_truncates() {
        let html = r#"<a href="/job/a1"></a><a href="/job/a2"></a><a href="/job/a3"></a>"#;
        assert_eq!(ids(extract_posting_ids(html, 2)), ["a1", "a2"]);
        assert!(extract_posting_ids(html, 0).is_empty());
    }

    #[test]
    fn unquoted_and_entity_encoded_hrefs() {
        let html = r#"
            <ul>
              <li><a href=/job/unq1 class=js-job-link>Unquoted</a></li>
              <li><a href="/job/&#x61;b2">Entity</a></li>
              <li><a data-href="/job/zz9">Not a link</a></li>
            </ul>
        "#;
        assert_eq!(ids(extract_posting_ids(html, 50)), ["unq1", "ab2"]);
    }

    #[test]
    fn ids_in_text_are_ignored() {
        let html = r#"<p>see /job/txt1</p><script>var u = "/job/js1";</script>"#;
        assert!(extract_posting_ids(html, 50).is_empty());
    }

    #[test]
    fn ajax_endpoints_are_not_postings() {
        let html = r#"<a href="/job/ajax/content/a1"></a>"#;
        assert!(extract_posting_ids(html, 5).is_empty());
    }
}
