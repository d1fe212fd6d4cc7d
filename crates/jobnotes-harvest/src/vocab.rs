use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::annotate::Annotator;
use crate::record::PostingRecord;

/// Generic qualifiers that show up in specialty lists but are not terms.
const STOP_WORDS: &[&str] = &[
    "具備", "熟悉", "了解", "使用", "操作", "經驗", "能力", "技能", "工具", "軟體", "系統", "平台",
    "相關", "以上", "以下", "或", "及", "與", "和",
];

const STOP_WORDS_EN: &[&str] = &[
    "familiar with",
    "experience",
    "tool",
    "tools",
    "software",
    "system",
    "platform",
    "skill",
    "skills",
    "ability",
    "related",
    "and",
    "or",
];

const CJK_PUNCTUATION: &[char] = &[
    '，', '。', '！', '？', '、', '；', '：', '「', '」', '『', '』', '（', '）', '【', '】',
];

#[derive(Debug, Clone, Default)]
pub struct VocabularyPaths {
    /// Curated terms grouped by category, never written.
    pub seed: Option<PathBuf>,
    /// Flat list of terms learned at runtime.
    pub learned: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LearnedTerms {
    #[serde(default)]
    auto_learned: BTreeSet<String>,
}

/// Known technical vocabulary, a curated seed plus terms learned at runtime.
///
/// Terms are keyed by their lowercase form and keep the first spelling seen,
/// so case variants never coexist. The set only grows.
#[derive(Debug, Default)]
pub struct VocabularyStore {
    paths: VocabularyPaths,
    terms: HashMap<String, String>,
    learned: BTreeSet<String>,
    annotator: Annotator,
}

impl VocabularyStore {
    /// Loads the seed and learned documents, both are optional.
    pub fn load(paths: VocabularyPaths) -> Self {
        let mut store = Self::default();

        if let Some(path) = &paths.seed {
            match read_seed(path) {
                Ok(Some(seed)) => {
                    let n = seed.len();
                    seed.into_iter().for_each(|t| store.insert(t));
                    log::info!("Loaded {n} seed terms from {}", path.display());
                }
                Ok(None) => log::warn!("Seed terms file not found: {}", path.display()),
                Err(e) => log::error!("Couldn't load seed terms {}: {e}", path.display()),
            }
        }

        if let Some(path) = &paths.learned {
            match read_learned(path) {
                Ok(Some(learned)) => {
                    log::info!(
                        "Loaded {} learned terms from {}",
                        learned.auto_learned.len(),
                        path.display()
                    );
                    for term in learned.auto_learned {
                        store.learned.insert(term.clone());
                        store.insert(term);
                    }
                }
                Ok(None) => log::info!("No learned terms yet at {}", path.display()),
                Err(e) => log::error!("Couldn't load learned terms {}: {e}", path.display()),
            }
        }

        store.paths = paths;
        store.rebuild();
        store
    }

    /// A store without backing files.
    pub fn with_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut store = Self::default();
        terms.into_iter().for_each(|t| store.insert(t.into()));
        store.rebuild();
        store
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.terms.contains_key(&term.trim().to_lowercase())
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.terms.values().map(String::as_str)
    }

    /// Filters `candidates` and adds the surviving unknown ones.
    ///
    /// New terms are persisted before returning. Returns only the terms that
    /// were actually added.
    pub fn learn<I, S>(&mut self, candidates: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = BTreeSet::new();
        for candidate in candidates {
            let term = candidate.as_ref().trim();
            if !is_term_candidate(term) || self.contains(term) {
                continue;
            }
            self.insert(term.to_string());
            self.learned.insert(term.to_string());
            added.insert(term.to_string());
        }

        if !added.is_empty() {
            log::info!("Learned {} new terms: {added:?}", added.len());
            self.rebuild();
            if let Err(e) = self.flush() {
                log::error!("Couldn't persist learned terms: {e}");
            }
        }
        added
    }

    pub fn annotate(&self, text: &str) -> String {
        self.annotator.annotate(text)
    }

    /// Learns from the specialty list, then links the free text fields.
    ///
    /// Learning goes first so that terms from this record already link in
    /// its own text.
    pub fn process(&mut self, record: &mut PostingRecord) {
        if !record.specialties.is_empty() {
            self.learn(&record.specialties);
        }
        for field in [
            &mut record.description,
            &mut record.requirement,
            &mut record.other_requirement,
        ] {
            *field = self.annotate(field);
        }
    }

    /// Writes every learned term to the learned document, merged with what
    /// is already on disk.
    pub fn flush(&self) -> anyhow::Result<()> {
        let Some(path) = &self.paths.learned else {
            return Ok(());
        };
        let mut doc = read_learned(path)?.unwrap_or_default();
        doc.auto_learned.extend(self.learned.iter().cloned());
        write_atomic(path, serde_yaml::to_string(&doc)?.as_bytes())?;
        log::debug!("Saved {} learned terms to {}", doc.auto_learned.len(), path.display());
        Ok(())
    }

    fn insert(&mut self, term: String) {
        let term = term.trim();
        if term.is_empty() {
            return;
        }
        self.terms
            .entry(term.to_lowercase())
            .or_insert_with(|| term.to_string());
    }

    fn rebuild(&mut self) {
        match Annotator::new(self.terms.values().map(String::as_str)) {
            Ok(annotator) => self.annotator = annotator,
            Err(e) => log::error!("Couldn't compile vocabulary of {} terms: {e}", self.len()),
        }
    }
}

/// Length, stop word and punctuation filters applied before learning.
pub fn is_term_candidate(term: &str) -> bool {
    if term.chars().count() < 2 {
        return false;
    }
    if STOP_WORDS.contains(&term) {
        return false;
    }
    let lower = term.to_lowercase();
    if STOP_WORDS_EN.contains(&lower.as_str()) {
        return false;
    }
    !term.contains(CJK_PUNCTUATION)
}

fn read_seed(path: &Path) -> anyhow::Result<Option<Vec<String>>> {
    let Some(content) = read_optional(path)? else {
        return Ok(None);
    };
    let doc: Option<BTreeMap<String, serde_yaml::Value>> = serde_yaml::from_str(&content)?;
    let terms = doc
        .unwrap_or_default()
        .into_values()
        .filter_map(|v| match v {
            serde_yaml::Value::Sequence(items) => Some(items),
            _ => None,
        })
        .flatten()
        .filter_map(|item| match item {
            serde_yaml::Value::String(s) => Some(s),
            serde_yaml::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect();
    Ok(Some(terms))
}

fn read_learned(path: &Path) -> anyhow::Result<Option<LearnedTerms>> {
    let Some(content) = read_optional(path)? else {
        return Ok(None);
    };
    let doc: Option<LearnedTerms> = serde_yaml::from_str(&content)?;
    Ok(Some(doc.unwrap_or_default()))
}

fn read_optional(path: &Path) -> io::Result<Option<String>> {
    match fs_err::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn write_atomic(path: &Path, content: &[u8]) -> anyhow::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs_err::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Couldn't create a temp file in {}", dir.display()))?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Couldn't replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_filters() {
        assert!(is_term_candidate("Python"));
        assert!(!is_term_candidate("熟悉"));
        assert!(!is_term_candidate("A"));
        assert!(!is_term_candidate("Docker、"));
        assert!(!is_term_candidate("Experience"));
        assert!(is_term_candidate("Go"));
    }
}
