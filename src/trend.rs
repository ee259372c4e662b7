//! # Trend Calculator
//! Compares the current snapshot against a previous one and ranks growing articles,
//! trustworthy spikes first.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::config::TrendSettings;
use crate::ingest::types::{Article, ReliabilityTier};

#[derive(Debug, Clone, Copy)]
pub struct TrendCalculator {
    reliability_floor: u64,
    high_current_views: u64,
    high_previous_views: u64,
}

impl Default for TrendCalculator {
    fn default() -> Self {
        Self::from_settings(&TrendSettings::default())
    }
}

impl TrendCalculator {
    pub fn from_settings(cfg: &TrendSettings) -> Self {
        Self {
            reliability_floor: cfg.reliability_floor,
            high_current_views: cfg.high_current_views,
            high_previous_views: cfg.high_previous_views,
        }
    }

    /// Growth fields for one article given its previous-period views.
    pub fn annotate(&self, article: &Article, previous_views: u64) -> Article {
        let mut out = article.clone();
        out.previous_view_count = Some(previous_views);

        if previous_views < self.reliability_floor {
            out.growth = Some(0);
            out.growth_percentage = Some(0.0);
            out.reliability = Some(ReliabilityTier::Low);
            return out;
        }

        let growth = article.view_count as i64 - previous_views as i64;
        out.growth = Some(growth);
        out.growth_percentage = Some(growth as f64 / previous_views as f64 * 100.0);
        out.reliability = Some(
            if article.view_count > self.high_current_views
                && previous_views > self.high_previous_views
            {
                ReliabilityTier::High
            } else {
                ReliabilityTier::Medium
            },
        );
        out
    }

    /// Articles of `current` with strictly positive growth: `high` tier first, then
    /// by growth descending. Ties keep snapshot order.
    pub fn compute_trends(&self, current: &[Article], previous: &[Article]) -> Vec<Article> {
        let prev: HashMap<&str, u64> = previous
            .iter()
            .map(|a| (a.identifier.as_str(), a.view_count))
            .collect();

        let mut out: Vec<Article> = current
            .iter()
            .map(|a| self.annotate(a, prev.get(a.identifier.as_str()).copied().unwrap_or(0)))
            .filter(|a| a.growth.unwrap_or(0) > 0)
            .collect();

        out.sort_by(trend_order);
        out
    }
}

fn trend_order(a: &Article, b: &Article) -> Ordering {
    let is_high = |x: &Article| x.reliability == Some(ReliabilityTier::High);
    is_high(b)
        .cmp(&is_high(a))
        .then_with(|| b.growth.unwrap_or(0).cmp(&a.growth.unwrap_or(0)))
}
