use once_cell::sync::Lazy;
use regex::Regex;

use jobnotes_harvest::{PostingId, PostingRecord};

const ILLEGAL_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

pub const UNKNOWN_COMPANY: &str = "未知公司";
pub const UNKNOWN_TITLE: &str = "未知職缺";

static NOTE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_([a-z0-9]+)\.md$").expect("valid note id regex"));

/// Replaces characters that are illegal in file names with `_`.
pub fn sanitize(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if ILLEGAL_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// `<company>_<title>_<id>.md`
pub fn note_file_name(record: &PostingRecord) -> String {
    let company = non_empty(&record.company, UNKNOWN_COMPANY);
    let title = non_empty(&record.title, UNKNOWN_TITLE);
    sanitize(&format!("{company}_{title}_{}.md", record.id))
}

/// Recovers the posting id from a note file name written by
/// [`note_file_name`].
pub fn posting_id_from_file_name(name: &str) -> Option<PostingId> {
    NOTE_ID
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| PostingId::from(m.as_str()))
}

pub(crate) fn non_empty<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    let value = value.trim();
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illegal_chars_are_substituted() {
        assert_eq!(sanitize(r#"A/B\C:D*E?F"G<H>I|J"#), "A_B_C_D_E_F_G_H_I_J");
        assert_ne!(sanitize("a/b"), sanitize("ab"));
    }

    #[test]
    fn file_name_embeds_the_id() {
        let record = PostingRecord {
            company: "Foo: Inc.".to_string(),
            title: "Data Engineer (ETL/ELT)".to_string(),
            ..PostingRecord::new("8lhbs")
        };
        let name = note_file_name(&record);
        assert_eq!(name, "Foo_ Inc._Data Engineer (ETL_ELT)_8lhbs.md");
        assert_eq!(posting_id_from_file_name(&name), Some("8lhbs".into()));
    }

    #[test]
    fn placeholders_for_missing_names() {
        let name = note_file_name(&PostingRecord::new("abc1"));
        assert_eq!(name, "未知公司_未知職缺_abc1.md");
    }

    #[test]
    fn foreign_files_have_no_id() {
        assert_eq!(posting_id_from_file_name("README.md"), None);
        assert_eq!(posting_id_from_file_name("notes_draft.txt"), None);
        assert_eq!(posting_id_from_file_name("x_ABC.md"), None);
    }
}
