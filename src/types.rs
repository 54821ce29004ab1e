use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PricePulseError, Result};

// ── Catalog entities ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub ean: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub current_price: f64,
}

impl Product {
    /// A product enters simulation only with an EAN and a sellable price.
    pub fn is_eligible(&self) -> bool {
        !self.ean.is_empty() && self.current_price > 0.0
    }
}

/// Immutable sale event. Period fields are derived from the timestamp at
/// creation and never recomputed.
#[derive(Debug, Clone, Serialize)]
pub struct Sale {
    pub ean: String,
    pub timestamp: DateTime<Utc>,
    pub quantity: u32,
    pub unit_price: f64,
    pub hour_period: u8,
    pub day: u8,
    pub day_of_week: u8,
    pub month: u8,
}

impl Sale {
    pub fn record(ean: &str, quantity: u32, unit_price: f64, at: DateTime<Utc>) -> Self {
        Self {
            ean: ean.to_string(),
            timestamp: at,
            quantity,
            unit_price,
            hour_period: at.hour() as u8,
            day: at.day() as u8,
            // 1..=7, Monday-based, so 6 and 7 are the weekend
            day_of_week: at.weekday().number_from_monday() as u8,
            month: at.month() as u8,
        }
    }

    pub fn total_amount(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }
}

// ── Baselines ──

pub const MONTHS_PER_YEAR: usize = 12;
pub const DAYS_PER_MONTH: usize = 31;
pub const DAYS_PER_WEEK: usize = 7;

/// Per (EAN, hour-period) statistical baseline. Arrays must hold exactly
/// one entry per period or the record is invalid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyBaseline {
    pub ean: String,
    pub hour_period: u8,
    pub total_median_quantity: f64,
    pub total_mean_quantity: f64,
    pub monthly_medians: Vec<f64>,
    pub monthly_means: Vec<f64>,
    pub daily_medians: Vec<f64>,
    pub daily_means: Vec<f64>,
    pub dow_medians: Vec<f64>,
    pub dow_means: Vec<f64>,
}

impl HourlyBaseline {
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("monthly medians", self.monthly_medians.len(), MONTHS_PER_YEAR),
            ("monthly means", self.monthly_means.len(), MONTHS_PER_YEAR),
            ("daily medians", self.daily_medians.len(), DAYS_PER_MONTH),
            ("daily means", self.daily_means.len(), DAYS_PER_MONTH),
            ("dow medians", self.dow_medians.len(), DAYS_PER_WEEK),
            ("dow means", self.dow_means.len(), DAYS_PER_WEEK),
        ];
        for (what, got, want) in checks {
            if got != want {
                return Err(PricePulseError::InvalidBaseline(format!(
                    "{} for {} hour {}: expected {} values, got {}",
                    what, self.ean, self.hour_period, want, got
                )));
            }
        }
        Ok(())
    }
}

// ── Triggers ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerType {
    SalesVolume,
    TimeBased,
    CompetitorPrice,
    /// Reserved; never evaluated.
    StockLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    /// Sign applied to the trigger's price change percentage.
    pub fn signed(&self, pct: f64) -> f64 {
        match self {
            Direction::Increase => pct,
            Direction::Decrease => -pct,
        }
    }
}

/// A configurable pricing rule. Read-only to the engine; created and
/// edited through the trigger store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceTrigger {
    pub id: u64,
    pub name: String,
    pub trigger_type: TriggerType,
    pub active: bool,
    pub direction: Direction,
    pub percentage_threshold: f64,
    pub time_window_hours: u32,
    pub price_change_percentage: f64,
    /// Time-based rules: inclusive start / exclusive end virtual hour.
    pub start_hour: Option<u8>,
    pub end_hour: Option<u8>,
    /// Time-based rules: 1..=7, Monday-based.
    pub days_of_week: Vec<u8>,
    /// Competitor rules: names whose prices gate the rule.
    pub competitors: Vec<String>,
}

// ── Suggestions ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceSuggestion {
    pub id: u64,
    pub ean: String,
    pub trigger_id: u64,
    pub current_price: f64,
    pub suggested_price: f64,
    pub percentage_change: f64,
    pub reason: String,
    pub status: SuggestionStatus,
    pub created_at: DateTime<Utc>,
    /// Live product price at creation time; a mismatch with the catalog
    /// marks the suggestion stale and hides it from actionable views.
    pub product_price_snapshot: f64,
}

impl PriceSuggestion {
    pub fn is_stale(&self, live_price: f64) -> bool {
        self.product_price_snapshot != live_price
    }
}

// ── Analysis windows ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Hour,
    Day,
    Week,
    Month,
}

impl TimeWindow {
    pub fn hours(&self) -> i64 {
        match self {
            TimeWindow::Hour => 1,
            TimeWindow::Day => 24,
            TimeWindow::Week => 24 * 7,
            TimeWindow::Month => 24 * 30,
        }
    }
}

// ── Deviation output ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Pattern {
    PaydayEffect,
    WeekendEffect,
    LunchRush,
}

impl Pattern {
    pub fn label(&self) -> &'static str {
        match self {
            Pattern::PaydayEffect => "payday_effect",
            Pattern::WeekendEffect => "weekend_effect",
            Pattern::LunchRush => "lunch_rush",
        }
    }
}

/// Combined anomaly score across the four temporal granularities.
/// A `None` granularity was skipped (missing or out-of-range period) and
/// contributed nothing to the weighted sum.
#[derive(Debug, Clone, Serialize)]
pub struct DeviationResult {
    pub weighted_deviation: f64,
    pub hour_deviation: Option<f64>,
    pub dow_deviation: Option<f64>,
    pub day_deviation: Option<f64>,
    pub month_deviation: Option<f64>,
    pub patterns: Vec<Pattern>,
    /// Fraction of baseline mean arrays that carry data; data-quality
    /// signal only, never gates firing.
    pub confidence: f64,
    /// Current month's mean relative to the all-month average; 1.0 when
    /// undefined.
    pub seasonal_trend: f64,
}

impl DeviationResult {
    pub fn has_pattern(&self, pattern: Pattern) -> bool {
        self.patterns.contains(&pattern)
    }

    /// Largest-magnitude per-granularity deviation, with its label.
    pub fn dominant(&self) -> Option<(&'static str, f64)> {
        [
            ("hour", self.hour_deviation),
            ("day-of-week", self.dow_deviation),
            ("day", self.day_deviation),
            ("month", self.month_deviation),
        ]
        .into_iter()
        .filter_map(|(label, dev)| dev.map(|d| (label, d)))
        .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
    }
}
