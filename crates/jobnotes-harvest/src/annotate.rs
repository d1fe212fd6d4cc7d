use std::collections::HashMap;

use regex::{Captures, Regex, RegexBuilder};

const REGEX_SIZE_LIMIT: usize = 64 << 20;

/// Rewrites text so that every known term becomes a `[[term]]` link.
///
/// All terms are compiled into a single case-insensitive alternation ordered
/// longest first, so at any position the longest term wins and a term that
/// is a substring of a longer one is never linked inside it. Existing
/// `[[...]]` links are matched first and left untouched.
#[derive(Debug, Clone, Default)]
pub struct Annotator {
    pattern: Option<Regex>,
    canonical: HashMap<String, String>,
}

impl Annotator {
    pub fn new<'a, I>(terms: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut terms: Vec<&str> = terms.into_iter().filter(|t| !t.is_empty()).collect();
        if terms.is_empty() {
            return Ok(Self::default());
        }
        terms.sort_by(|a, b| {
            b.chars()
                .count()
                .cmp(&a.chars().count())
                .then_with(|| a.cmp(b))
        });
        terms.dedup();

        let alternation = terms
            .iter()
            .map(|term| bounded(term))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = RegexBuilder::new(&format!(r"(?P<linked>\[\[[^\]\n]*\]\])|(?:{alternation})"))
            .case_insensitive(true)
            .size_limit(REGEX_SIZE_LIMIT)
            .dfa_size_limit(REGEX_SIZE_LIMIT)
            .build()?;

        let canonical = terms
            .iter()
            .map(|term| (term.to_lowercase(), term.to_string()))
            .collect();

        Ok(Self {
            pattern: Some(pattern),
            canonical,
        })
    }

    pub fn annotate(&self, text: &str) -> String {
        let Some(pattern) = &self.pattern else {
            return text.to_string();
        };
        if text.is_empty() {
            return String::new();
        }
        pattern
            .replace_all(text, |caps: &Captures| {
                let matched = &caps[0];
                if caps.name("linked").is_some() {
                    return matched.to_string();
                }
                let term = self
                    .canonical
                    .get(&matched.to_lowercase())
                    .map(String::as_str)
                    .unwrap_or(matched);
                format!("[[{term}]]")
            })
            .into_owned()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Escapes `term` so that it never matches glued to a word character.
///
/// A word-character edge needs `\b`. A symbol edge needs `\B`, which next to
/// a non-word character holds only when the neighbour is not a word
/// character either.
fn bounded(term: &str) -> String {
    fn edge(c: Option<char>) -> &'static str {
        match c {
            Some(c) if is_word_char(c) => r"\b",
            Some(_) => r"\B",
            None => "",
        }
    }
    format!(
        "{}{}{}",
        edge(term.chars().next()),
        regex::escape(term),
        edge(term.chars().next_back())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotator(terms: &[&str]) -> Annotator {
        Annotator::new(terms.iter().copied()).unwrap()
    }

    #[test]
    fn longest_term_wins() {
        let a = annotator(&["Spark", "Apache Spark"]);
        assert_eq!(a.annotate("uses Apache Spark daily"), "uses [[Apache Spark]] daily");
        assert_eq!(a.annotate("Spark alone"), "[[Spark]] alone");
    }

    #[test]
    fn whole_words_only() {
        let a = annotator(&["SQL"]);
        assert_eq!(a.annotate("SQL and MySQL"), "[[SQL]] and MySQL");
    }

    #[test]
    fn case_insensitive_with_canonical_spelling() {
        let a = annotator(&["Docker"]);
        assert_eq!(a.annotate("docker or DOCKER"), "[[Docker]] or [[Docker]]");
    }

    #[test]
    fn symbol_edged_terms() {
        let a = annotator(&["C++", ".NET"]);
        assert_eq!(a.annotate("C++ and .NET skills"), "[[C++]] and [[.NET]] skills");
        assert_eq!(a.annotate("(C++, .NET)"), "([[C++]], [[.NET]])");
    }

    #[test]
    fn symbol_edges_do_not_link_inside_words() {
        let a = annotator(&["C++", ".NET"]);
        assert_eq!(a.annotate("ASP.NET Core and C++11"), "ASP.NET Core and C++11");
        let a = annotator(&["C++", ".NET", "ASP.NET Core"]);
        assert_eq!(a.annotate("ASP.NET Core and C++ 11"), "[[ASP.NET Core]] and [[C++]] 11");
    }

    #[test]
    fn annotation_is_idempotent() {
        let a = annotator(&["Spark", "Apache Spark", "Python"]);
        let once = a.annotate("Apache Spark with python");
        assert_eq!(once, "[[Apache Spark]] with [[Python]]");
        assert_eq!(a.annotate(&once), once);
    }

    #[test]
    fn cjk_terms() {
        let a = annotator(&["機器學習"]);
        assert_eq!(a.annotate("熟悉 機器學習 模型"), "熟悉 [[機器學習]] 模型");
    }

    #[test]
    fn empty_vocabulary_is_identity() {
        let a = Annotator::default();
        assert_eq!(a.annotate("nothing to do"), "nothing to do");
    }
}
