use std::cmp;
use std::num::NonZeroUsize;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestConfig {
    #[serde(default = "default_target_per_keyword")]
    pub target_per_keyword: usize,

    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    #[serde(default = "default_listing_delay")]
    pub listing_delay: DelayRange,

    #[serde(default = "default_detail_delay")]
    pub detail_delay: DelayRange,

    #[serde(default = "default_concurrent_fetches")]
    pub concurrent_fetches: NonZeroUsize,

    #[serde(default = "default_dedup")]
    pub dedup: bool,

    #[serde(default = "default_on_fetch_error")]
    pub on_fetch_error: OnError,

    #[serde(default = "default_on_keyword_error")]
    pub on_keyword_error: OnError,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            target_per_keyword: default_target_per_keyword(),
            max_pages: default_max_pages(),
            listing_delay: default_listing_delay(),
            detail_delay: default_detail_delay(),
            concurrent_fetches: default_concurrent_fetches(),
            dedup: default_dedup(),
            on_fetch_error: default_on_fetch_error(),
            on_keyword_error: default_on_keyword_error(),
        }
    }
}

impl HarvestConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_pages == 0 {
            anyhow::bail!("`maxPages` must be at least 1");
        }
        self.listing_delay
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid `listingDelay`: {e}"))?;
        self.detail_delay
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid `detailDelay`: {e}"))?;
        Ok(())
    }
}

fn default_target_per_keyword() -> usize {
    50
}

fn default_max_pages() -> usize {
    10
}

fn default_listing_delay() -> DelayRange {
    DelayRange(3.0, 5.0)
}

fn default_detail_delay() -> DelayRange {
    DelayRange(1.0, 3.0)
}

fn default_concurrent_fetches() -> NonZeroUsize {
    let n = cmp::min(4, cmp::max(1, num_cpus::get().saturating_sub(2)));
    NonZeroUsize::new(n).unwrap_or(NonZeroUsize::MIN)
}

fn default_dedup() -> bool {
    true
}

fn default_on_fetch_error() -> OnError {
    OnError::SkipAndLog
}

fn default_on_keyword_error() -> OnError {
    OnError::SkipAndLog
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OnError {
    Fail,
    SkipAndLog,
}

/// A `[min, max]` pause in seconds, sampled uniformly for every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayRange(pub f32, pub f32);

impl DelayRange {
    pub const ZERO: Self = Self(0.0, 0.0);

    pub fn min(&self) -> f32 {
        self.0
    }

    pub fn max(&self) -> f32 {
        self.1
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.0.is_finite() || !self.1.is_finite() || self.0 < 0.0 || self.1 < 0.0 {
            anyhow::bail!("bounds must be finite and non negative, got {:?}", self);
        }
        if self.0 > self.1 {
            anyhow::bail!("min {} is greater than max {}", self.0, self.1);
        }
        Ok(())
    }

    pub fn sample(&self) -> Duration {
        let secs = if self.0 < self.1 {
            rand::rng().random_range(self.0..self.1)
        } else {
            self.0
        };
        Duration::from_secs_f32(secs.max(0.0))
    }
}
