use std::fs::File;
use std::path::PathBuf;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use jobnotes_harvest::{HarvestConfig, VocabularyPaths};
use jobnotes_site::SiteConfig;

const SCHEDULE_TIME_FORMAT: &str = "%H:%M";

/// Whole application configuration, read from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_seed_terms_file")]
    pub seed_terms_file: Option<PathBuf>,

    #[serde(default = "default_learned_terms_file")]
    pub learned_terms_file: Option<PathBuf>,

    #[serde(default = "default_schedule_time")]
    pub schedule_time: String,

    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub harvest: HarvestConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            output_dir: default_output_dir(),
            seed_terms_file: default_seed_terms_file(),
            learned_terms_file: default_learned_terms_file(),
            schedule_time: default_schedule_time(),
            site: SiteConfig::default(),
            harvest: HarvestConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let conf: Self = serde_yaml::from_reader(File::open(path)?)?;
        Ok(conf)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.harvest.validate()?;
        self.schedule_time()?;
        if self.keywords.iter().any(|k| k.trim().is_empty()) {
            anyhow::bail!("Keywords must not be blank");
        }
        Ok(())
    }

    /// Time of day of the scheduled batches, `HH:MM` local time.
    pub fn schedule_time(&self) -> anyhow::Result<NaiveTime> {
        NaiveTime::parse_from_str(self.schedule_time.trim(), SCHEDULE_TIME_FORMAT).map_err(|e| {
            anyhow::anyhow!("Invalid `scheduleTime` {:?}: {e}", self.schedule_time)
        })
    }

    pub fn vocabulary_paths(&self) -> VocabularyPaths {
        VocabularyPaths {
            seed: self.seed_terms_file.clone(),
            learned: self.learned_terms_file.clone(),
        }
    }
}

fn default_keywords() -> Vec<String> {
    ["資料工程", "資料分析", "RPA自動化", "AI應用"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("jobs")
}

fn default_seed_terms_file() -> Option<PathBuf> {
    Some(PathBuf::from("data/tech_keywords.yaml"))
}

fn default_learned_terms_file() -> Option<PathBuf> {
    Some(PathBuf::from("data/learned_keywords.yaml"))
}

fn default_schedule_time() -> String {
    String::from("08:00")
}
