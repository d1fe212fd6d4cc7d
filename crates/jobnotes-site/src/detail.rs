use async_trait::async_trait;
use reqwest::header::REFERER;
use serde::Deserialize;
use serde_json::Value;

use jobnotes_harvest::{DetailFetcher, FetchError, PostingId, PostingRecord};

use crate::client::build_client;
use crate::config::SiteConfig;

const NOT_PROVIDED: &str = "未提供";
const NOT_SPECIFIED: &str = "未指定";
const NEGOTIABLE: &str = "面議";

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Option<Content>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Content {
    header: Header,
    job_detail: JobDetail,
    condition: Condition,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Header {
    job_name: Option<String>,
    cust_name: Option<String>,
    appear_date: Option<String>,
    job_name_keyword: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct JobDetail {
    job_name: Option<String>,
    cust_name: Option<String>,
    salary: Option<String>,
    address_region: Option<String>,
    address_detail: Option<String>,
    job_description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Condition {
    edu: Option<String>,
    #[serde(rename = "workExp")]
    work_exp: Option<String>,
    specialty: Value,
    skill: Value,
    other: Option<String>,
}

/// Normalizes the JSON body of the job content endpoint.
pub fn parse_detail(config: &SiteConfig, id: &PostingId, body: &str) -> Result<PostingRecord, FetchError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;
    let Content {
        header,
        job_detail,
        condition,
    } = envelope
        .data
        .ok_or_else(|| FetchError::Malformed("missing `data`".to_string()))?;

    let location = format!(
        "{}{}",
        job_detail.address_region.unwrap_or_default(),
        job_detail.address_detail.unwrap_or_default()
    );

    Ok(PostingRecord {
        id: id.clone(),
        title: first_present(header.job_name, job_detail.job_name, NOT_PROVIDED),
        company: first_present(header.cust_name, job_detail.cust_name, NOT_PROVIDED),
        salary: or_default(job_detail.salary, NEGOTIABLE),
        location: or_default(Some(location), NOT_PROVIDED),
        description: job_detail.job_description.unwrap_or_default(),
        education: or_default(condition.edu, NOT_SPECIFIED),
        experience: or_default(condition.work_exp, NOT_SPECIFIED),
        requirement: descriptions(&condition.skill).join("\n"),
        specialties: descriptions(&condition.specialty),
        other_requirement: condition.other.unwrap_or_default(),
        tags: strings(&header.job_name_keyword),
        appeared_at: header.appear_date.unwrap_or_default(),
        url: config.posting_url(id.as_str()),
    })
}

fn first_present(primary: Option<String>, secondary: Option<String>, fallback: &str) -> String {
    primary
        .filter(|s| !s.trim().is_empty())
        .or(secondary.filter(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| fallback.to_string())
}

fn or_default(value: Option<String>, fallback: &str) -> String {
    first_present(value, None, fallback).trim().to_string()
}

/// `[{"description": "..."}, ...]` into the descriptions.
fn descriptions(items: &Value) -> Vec<String> {
    items
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("description")?.as_str())
                .filter(|d| !d.trim().is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn strings(items: &Value) -> Vec<String> {
    items
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn fetch_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if let Some(status) = e.status() {
        FetchError::Http(status.as_u16())
    } else if e.is_decode() {
        FetchError::Malformed(e.to_string())
    } else {
        FetchError::Transport(e.to_string())
    }
}

/// Posting details from the JSON endpoint backing the job pages.
pub struct DetailClient {
    config: SiteConfig,
    client: reqwest::Client,
}

impl DetailClient {
    pub fn new(config: SiteConfig) -> anyhow::Result<Self> {
        let client = build_client(&config)?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl DetailFetcher for DetailClient {
    async fn fetch(&self, id: &PostingId) -> Result<PostingRecord, FetchError> {
        let url = format!("{}/job/ajax/content/{id}", self.config.base());
        let body = self
            .client
            .get(&url)
            .header(REFERER, self.config.posting_url(id.as_str()))
            .header("X-Requested-With", "XMLHttpRequest")
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(fetch_error)?
            .text()
            .await
            .map_err(fetch_error)?;

        let record = parse_detail(&self.config, id, &body)?;
        log::debug!("Fetched posting {id}: {}", record.title);
        Ok(record)
    }
}
