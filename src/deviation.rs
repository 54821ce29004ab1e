use crate::error::Result;
use crate::types::{DeviationResult, HourlyBaseline, Pattern, Sale};

pub const WEIGHT_HOUR: f64 = 0.4;
pub const WEIGHT_DOW: f64 = 0.3;
pub const WEIGHT_DAY: f64 = 0.2;
pub const WEIGHT_MONTH: f64 = 0.1;

pub const PAYDAY_DAYS: &[u8] = &[1, 5, 10, 15, 20, 25, 30];
pub const WEEKEND_DOWS: &[u8] = &[6, 7];
pub const LUNCH_HOURS: std::ops::RangeInclusive<u8> = 11..=14;

/// Observed quantity plus the period coordinates it was observed in.
/// Built from a single sale or from an aggregated window.
#[derive(Debug, Clone, Copy)]
pub struct Observation {
    pub quantity: f64,
    pub hour_period: u8,
    pub day: u8,
    pub day_of_week: u8,
    pub month: u8,
}

impl From<&Sale> for Observation {
    fn from(sale: &Sale) -> Self {
        Self {
            quantity: sale.quantity as f64,
            hour_period: sale.hour_period,
            day: sale.day,
            day_of_week: sale.day_of_week,
            month: sale.month,
        }
    }
}

/// Percentage deviation of actual vs expected volume across the four
/// temporal granularities, combined into a fixed-weight score.
pub fn compute(observation: &Observation, baseline: &HourlyBaseline) -> Result<DeviationResult> {
    baseline.validate()?;

    let actual = observation.quantity;

    let hour_deviation = Some(percentage_deviation(actual, baseline.total_mean_quantity));
    // 1-based period indices; out-of-range skips the granularity
    let dow_deviation = indexed(&baseline.dow_means, observation.day_of_week)
        .map(|expected| percentage_deviation(actual, expected));
    let day_deviation = indexed(&baseline.daily_means, observation.day)
        .map(|expected| percentage_deviation(actual, expected));
    let month_deviation = indexed(&baseline.monthly_means, observation.month)
        .map(|expected| percentage_deviation(actual, expected));

    // Fixed weights, not re-normalized: a missing granularity silently
    // shrinks the weighted magnitude.
    let weighted_deviation = hour_deviation.unwrap_or(0.0) * WEIGHT_HOUR
        + dow_deviation.unwrap_or(0.0) * WEIGHT_DOW
        + day_deviation.unwrap_or(0.0) * WEIGHT_DAY
        + month_deviation.unwrap_or(0.0) * WEIGHT_MONTH;

    let mut result = DeviationResult {
        weighted_deviation,
        hour_deviation,
        dow_deviation,
        day_deviation,
        month_deviation,
        patterns: Vec::new(),
        confidence: confidence(baseline),
        seasonal_trend: seasonal_trend(baseline, observation.month),
    };
    result.patterns = detect_patterns(observation, &result);
    Ok(result)
}

/// `(actual - expected) / expected`, flattened to 0 when the expected
/// volume is 0. Deliberate: an absent baseline bucket is "nothing to
/// deviate from", not an error.
pub fn percentage_deviation(actual: f64, expected: f64) -> f64 {
    if expected == 0.0 {
        0.0
    } else {
        (actual - expected) / expected
    }
}

fn indexed(values: &[f64], period: u8) -> Option<f64> {
    if period == 0 {
        return None;
    }
    values.get(period as usize - 1).copied()
}

fn detect_patterns(observation: &Observation, result: &DeviationResult) -> Vec<Pattern> {
    let mut patterns = Vec::new();

    if PAYDAY_DAYS.contains(&observation.day) && result.day_deviation.unwrap_or(0.0) > 0.20 {
        patterns.push(Pattern::PaydayEffect);
    }
    if WEEKEND_DOWS.contains(&observation.day_of_week)
        && result.dow_deviation.unwrap_or(0.0) > 0.15
    {
        patterns.push(Pattern::WeekendEffect);
    }
    if LUNCH_HOURS.contains(&observation.hour_period)
        && result.hour_deviation.unwrap_or(0.0) > 0.25
    {
        patterns.push(Pattern::LunchRush);
    }

    patterns
}

fn confidence(baseline: &HourlyBaseline) -> f64 {
    let factors = [
        !baseline.monthly_means.is_empty(),
        !baseline.daily_means.is_empty(),
        !baseline.dow_means.is_empty(),
    ];
    factors.iter().filter(|present| **present).count() as f64 / factors.len() as f64
}

fn seasonal_trend(baseline: &HourlyBaseline, month: u8) -> f64 {
    let Some(current) = indexed(&baseline.monthly_means, month) else {
        return 1.0;
    };
    let sum: f64 = baseline.monthly_means.iter().sum();
    let avg = sum / baseline.monthly_means.len() as f64;
    if avg == 0.0 {
        1.0
    } else {
        current / avg
    }
}
