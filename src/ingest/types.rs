// src/ingest/types.rs
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Wikipedia language editions we serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    De,
    Fr,
    It,
    En,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::De => "de",
            Language::Fr => "fr",
            Language::It => "it",
            Language::En => "en",
        }
    }

    /// Project name as the pageviews API expects it, e.g. `de.wikipedia`.
    pub fn project(self) -> String {
        format!("{}.wikipedia", self.code())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "de" => Ok(Language::De),
            "fr" => Ok(Language::Fr),
            "it" => Ok(Language::It),
            "en" => Ok(Language::En),
            other => anyhow::bail!("unsupported language edition: {other}"),
        }
    }
}

/// Requested observation period. Upstream only offers daily top lists, so the
/// period only changes which day the trend baseline is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "daily")]
    Daily,
    #[serde(rename = "48h")]
    TwoDays,
    #[serde(rename = "weekly")]
    Weekly,
    #[serde(rename = "monthly")]
    Monthly,
}

impl Period {
    /// Days back from today for the comparison snapshot.
    pub fn comparison_offset_days(self) -> i64 {
        match self {
            Period::Daily => 2,
            Period::TwoDays => 3,
            Period::Weekly => 8,
            Period::Monthly => 31,
        }
    }
}

impl FromStr for Period {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" => Ok(Period::Daily),
            "48h" | "two_days" => Ok(Period::TwoDays),
            "weekly" | "week" => Ok(Period::Weekly),
            "monthly" | "month" => Ok(Period::Monthly),
            other => anyhow::bail!("unsupported period: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReliabilityTier {
    Low,
    Medium,
    High,
}

/// Post-hoc data from the metadata service. Never needed for ranking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleMetadata {
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub extract: Option<String>,
}

/// One ranked entry of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// URL-encoded title, underscores for spaces.
    pub identifier: String,
    pub view_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_view_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reliability: Option<ReliabilityTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ArticleMetadata>,
}

impl Article {
    pub fn new(identifier: impl Into<String>, view_count: u64) -> Self {
        Self {
            identifier: identifier.into(),
            view_count,
            rank: None,
            growth: None,
            growth_percentage: None,
            previous_view_count: None,
            reliability: None,
            metadata: None,
        }
    }

    /// Human-readable title (percent-decoded, spaces instead of underscores).
    pub fn title(&self) -> String {
        crate::ingest::decode_title(&self.identifier)
    }

    pub fn with_metadata(&self, metadata: ArticleMetadata) -> Self {
        Self {
            metadata: Some(metadata),
            ..self.clone()
        }
    }
}

/// One day of an article's view history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewPoint {
    pub date: NaiveDate,
    pub views: u64,
}
