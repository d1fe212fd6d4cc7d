use std::fmt::Write;

use chrono::{DateTime, Local};
use serde::Serialize;

use jobnotes_harvest::PostingRecord;

use crate::filename::{non_empty, UNKNOWN_COMPANY, UNKNOWN_TITLE};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize)]
struct Frontmatter<'a> {
    title: String,
    company: &'a str,
    salary: &'a str,
    location: &'a str,
    keywords: &'a [String],
    crawled_at: String,
    job_url: &'a str,
    job_id: &'a str,
}

/// Renders a posting as a markdown note with a YAML frontmatter.
pub fn render_note(record: &PostingRecord, crawled_at: DateTime<Local>) -> anyhow::Result<String> {
    let title = non_empty(&record.title, UNKNOWN_TITLE);
    let company = non_empty(&record.company, UNKNOWN_COMPANY);
    let now = crawled_at.format(TIMESTAMP_FORMAT).to_string();

    let frontmatter = Frontmatter {
        title: format!("{title} - {company}"),
        company,
        salary: non_empty(&record.salary, "面議"),
        location: non_empty(&record.location, "未提供"),
        keywords: &record.tags,
        crawled_at: now.clone(),
        job_url: &record.url,
        job_id: record.id.as_str(),
    };

    let mut note = String::new();
    writeln!(note, "---")?;
    note.push_str(&serde_yaml::to_string(&frontmatter)?);
    writeln!(note, "---")?;
    writeln!(note)?;
    writeln!(note, "# {title} - {company}")?;
    writeln!(note)?;
    writeln!(note, "## 工作地點")?;
    writeln!(note, "{}", frontmatter.location)?;
    writeln!(note)?;
    writeln!(note, "## 工作內容")?;
    writeln!(note, "{}", non_empty(&record.description, "（無詳細說明）"))?;
    writeln!(note)?;
    writeln!(note, "## 條件要求")?;
    writeln!(note)?;
    writeln!(note, "### 學歷要求")?;
    writeln!(note, "{}", non_empty(&record.education, "（未指定）"))?;
    writeln!(note)?;
    writeln!(note, "### 工作經驗")?;
    writeln!(note, "{}", non_empty(&record.experience, "（未指定）"))?;

    if !record.requirement.trim().is_empty() {
        writeln!(note)?;
        writeln!(note, "### 技能要求")?;
        writeln!(note, "{}", record.requirement.trim())?;
    }

    let specialties: Vec<&str> = record
        .specialties
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if !specialties.is_empty() {
        writeln!(note)?;
        writeln!(note, "### 擅長工具")?;
        for item in specialties {
            writeln!(note, "- {item}")?;
        }
    }

    if !record.other_requirement.trim().is_empty() {
        writeln!(note)?;
        writeln!(note, "### 其他條件")?;
        writeln!(note, "{}", record.other_requirement.trim())?;
    }

    writeln!(note)?;
    writeln!(note, "---")?;
    writeln!(note, "**抓取時間**: {now}  ")?;
    writeln!(note, "**職缺連結**: [查看原始職缺]({})", record.url)?;

    Ok(note)
}
