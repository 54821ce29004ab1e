use chrono::{DateTime, Datelike, Timelike, Utc};
use tracing::debug;

use crate::catalog::CompetitorBook;
use crate::types::{DeviationResult, Direction, Pattern, PriceTrigger, Product, TriggerType};

pub const WEEKEND_DAMPING: f64 = 0.8;
pub const PAYDAY_DAMPING: f64 = 0.7;
pub const SEASONAL_HIGH_TREND: f64 = 1.2;
pub const SEASONAL_LOW_TREND: f64 = 0.8;
pub const SEASONAL_HIGH_SCALE: f64 = 0.9;
pub const SEASONAL_LOW_SCALE: f64 = 1.2;

/// Everything one evaluation pass looks at for one product.
pub struct EvalContext<'a> {
    pub product: &'a Product,
    pub deviation: Option<&'a DeviationResult>,
    /// Virtual clock, not wall clock: time-based rules follow simulation time.
    pub now: DateTime<Utc>,
    pub competitors: &'a CompetitorBook,
}

/// A trigger that fired: signed percentage change plus the human-readable
/// justification for the suggestion row.
#[derive(Debug, Clone)]
pub struct Firing {
    pub trigger_id: u64,
    pub percentage_change: f64,
    pub reason: String,
}

/// Decide whether one trigger fires against the context. Inactive triggers
/// never fire; stock-level rules are reserved and never evaluated.
pub fn evaluate(trigger: &PriceTrigger, ctx: &EvalContext) -> Option<Firing> {
    if !trigger.active {
        return None;
    }
    match trigger.trigger_type {
        TriggerType::SalesVolume => evaluate_sales_volume(trigger, ctx),
        TriggerType::TimeBased => evaluate_time_based(trigger, ctx),
        TriggerType::CompetitorPrice => evaluate_competitor(trigger, ctx),
        TriggerType::StockLevel => None,
    }
}

/// First firing trigger wins; evaluation stops at the first match.
/// Callers pass triggers already in stable name order.
pub fn evaluate_all(triggers: &[&PriceTrigger], ctx: &EvalContext) -> Option<Firing> {
    triggers.iter().find_map(|t| evaluate(t, ctx))
}

/// Baseline-adjusted volume rule: the weighted deviation is dampened for
/// weekend/payday patterns and scaled by the seasonal trend before the
/// threshold comparison.
fn evaluate_sales_volume(trigger: &PriceTrigger, ctx: &EvalContext) -> Option<Firing> {
    let deviation = ctx.deviation?;

    let (adjusted, adjustments) = adjusted_deviation(deviation);
    let adjusted_pct = adjusted * 100.0;

    let fires = match trigger.direction {
        Direction::Increase => adjusted_pct >= trigger.percentage_threshold,
        Direction::Decrease => adjusted_pct <= -trigger.percentage_threshold,
    };
    if !fires {
        debug!(
            trigger = %trigger.name,
            ean = %ctx.product.ean,
            adjusted_pct,
            threshold = trigger.percentage_threshold,
            "below threshold"
        );
        return None;
    }

    let (dominant_label, dominant) = deviation.dominant().unwrap_or(("hour", 0.0));
    let applied = if adjustments.is_empty() {
        String::from("no adjustments")
    } else {
        format!("adjusted: {}", adjustments.join(", "))
    };
    Some(Firing {
        trigger_id: trigger.id,
        percentage_change: trigger.direction.signed(trigger.price_change_percentage),
        reason: format!(
            "Sales deviation {:+.1}% vs baseline (dominant: {} {:+.1}%; {})",
            adjusted_pct,
            dominant_label,
            dominant * 100.0,
            applied
        ),
    })
}

/// Dampen known behavioral patterns so they do not read as anomalies, then
/// scale against the seasonal trend. Returns the adjusted deviation and
/// the labels of the adjustments that applied.
pub fn adjusted_deviation(deviation: &DeviationResult) -> (f64, Vec<&'static str>) {
    let mut adjusted = deviation.weighted_deviation;
    let mut applied = Vec::new();

    if deviation.has_pattern(Pattern::WeekendEffect) {
        adjusted *= WEEKEND_DAMPING;
        applied.push("weekend x0.8");
    }
    if deviation.has_pattern(Pattern::PaydayEffect) {
        adjusted *= PAYDAY_DAMPING;
        applied.push("payday x0.7");
    }
    if deviation.seasonal_trend > SEASONAL_HIGH_TREND {
        adjusted *= SEASONAL_HIGH_SCALE;
        applied.push("seasonal x0.9");
    } else if deviation.seasonal_trend < SEASONAL_LOW_TREND {
        adjusted *= SEASONAL_LOW_SCALE;
        applied.push("seasonal x1.2");
    }

    (adjusted, applied)
}

/// Window containment on the virtual clock; no sales input. The end hour
/// is exclusive, and a window may wrap past midnight.
fn evaluate_time_based(trigger: &PriceTrigger, ctx: &EvalContext) -> Option<Firing> {
    let (start, end) = (trigger.start_hour?, trigger.end_hour?);
    let hour = ctx.now.hour() as u8;
    let dow = ctx.now.weekday().number_from_monday() as u8;

    let in_window = if start <= end {
        hour >= start && hour < end
    } else {
        hour >= start || hour < end
    };
    if !in_window || !trigger.days_of_week.contains(&dow) {
        return None;
    }

    Some(Firing {
        trigger_id: trigger.id,
        percentage_change: trigger.direction.signed(trigger.price_change_percentage),
        reason: format!(
            "Time window {:02}:00-{:02}:00 active (day {} of week)",
            start, end, dow
        ),
    })
}

/// Fires when the cheapest listed competitor undercuts the live price by
/// more than the threshold percentage.
fn evaluate_competitor(trigger: &PriceTrigger, ctx: &EvalContext) -> Option<Firing> {
    let live = ctx.product.current_price;
    if live <= 0.0 {
        return None;
    }
    let (name, price) = ctx.competitors.cheapest(&trigger.competitors, &ctx.product.ean)?;
    let undercut_pct = (live - price) / live * 100.0;
    if undercut_pct <= trigger.percentage_threshold {
        return None;
    }

    Some(Firing {
        trigger_id: trigger.id,
        percentage_change: trigger.direction.signed(trigger.price_change_percentage),
        reason: format!(
            "Competitor {} at {:.2} undercuts current {:.2} by {:.1}%",
            name, price, live, undercut_pct
        ),
    })
}
