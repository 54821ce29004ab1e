//! End-to-end correctness tests for the deviation math, trigger
//! evaluation, and the suggestion lifecycle.
//!
//! Seeds known products, baselines, and sales, then asserts exact
//! outputs through the public engine API.

use chrono::{Duration, TimeZone, Utc};

use pricepulse::catalog::CompetitorBook;
use pricepulse::deviation::{self, Observation};
use pricepulse::engine::{self, Engine};
use pricepulse::error::PricePulseError;
use pricepulse::evaluator::{self, EvalContext};
use pricepulse::ledger::SuggestionLedger;
use pricepulse::types::*;

fn flat_baseline(ean: &str, hour_period: u8, mean: f64) -> HourlyBaseline {
    HourlyBaseline {
        ean: ean.to_string(),
        hour_period,
        total_median_quantity: mean,
        total_mean_quantity: mean,
        monthly_medians: vec![mean; 12],
        monthly_means: vec![mean; 12],
        daily_medians: vec![mean; 31],
        daily_means: vec![mean; 31],
        dow_medians: vec![mean; 7],
        dow_means: vec![mean; 7],
    }
}

fn test_product(ean: &str, price: f64) -> Product {
    Product {
        ean: ean.to_string(),
        name: format!("Test {ean}"),
        brand: "TestBrand".to_string(),
        category: "Test".to_string(),
        current_price: price,
    }
}

// ── Deviation math ──

// All four granularity means are 2.0 and the observed quantity is 3, so
// every component is +50% and the fixed weights sum to 1.0.
#[test]
fn weighted_deviation_combines_four_granularities() {
    let baseline = flat_baseline("111", 9, 2.0);
    let obs = Observation {
        quantity: 3.0,
        hour_period: 9,
        day: 12,
        day_of_week: 3,
        month: 6,
    };

    let result = deviation::compute(&obs, &baseline).unwrap();

    assert!((result.hour_deviation.unwrap() - 0.5).abs() < 1e-9);
    assert!((result.dow_deviation.unwrap() - 0.5).abs() < 1e-9);
    assert!((result.day_deviation.unwrap() - 0.5).abs() < 1e-9);
    assert!((result.month_deviation.unwrap() - 0.5).abs() < 1e-9);
    assert!(
        (result.weighted_deviation - 0.5).abs() < 1e-9,
        "0.4*0.5 + 0.3*0.5 + 0.2*0.5 + 0.1*0.5 should be 0.5, got {}",
        result.weighted_deviation
    );
    assert!((result.seasonal_trend - 1.0).abs() < 1e-9, "flat months have no trend");
    assert!(result.patterns.is_empty(), "weekday morning at +50% matches no pattern");
}

// Pattern thresholds are strict: exactly at the threshold is not a match.
#[test]
fn payday_pattern_threshold_is_strict() {
    let mut baseline = flat_baseline("111", 9, 100.0);
    baseline.daily_means[4] = 5.0; // day 5, a payday

    // 6.0 / 5.0 is exactly +20%: below the strict threshold
    let at_threshold = Observation {
        quantity: 6.0,
        hour_period: 9,
        day: 5,
        day_of_week: 3,
        month: 6,
    };
    let result = deviation::compute(&at_threshold, &baseline).unwrap();
    assert!(
        !result.has_pattern(Pattern::PaydayEffect),
        "exactly +20% on a payday must not flag the pattern"
    );

    let above = Observation { quantity: 6.5, ..at_threshold };
    let result = deviation::compute(&above, &baseline).unwrap();
    assert!(result.has_pattern(Pattern::PaydayEffect));
}

#[test]
fn weekend_and_lunch_patterns_detected_together() {
    let baseline = flat_baseline("111", 12, 2.0);
    // Saturday lunch at +100%: above both the 15% weekend and 25% lunch bars
    let obs = Observation {
        quantity: 4.0,
        hour_period: 12,
        day: 14,
        day_of_week: 6,
        month: 6,
    };

    let result = deviation::compute(&obs, &baseline).unwrap();
    assert!(result.has_pattern(Pattern::WeekendEffect));
    assert!(result.has_pattern(Pattern::LunchRush));
    assert!(!result.has_pattern(Pattern::PaydayEffect), "day 14 is not a payday");
}

#[test]
fn weekend_pattern_boundary() {
    let mut baseline = flat_baseline("111", 9, 100.0);
    baseline.dow_means[5] = 10_000.0; // Saturday

    // 11_500 / 10_000 is exactly +15%: must not fire
    let obs = Observation {
        quantity: 11_500.0,
        hour_period: 9,
        day: 14,
        day_of_week: 6,
        month: 6,
    };
    let result = deviation::compute(&obs, &baseline).unwrap();
    assert!(!result.has_pattern(Pattern::WeekendEffect));

    let obs = Observation { quantity: 11_501.0, ..obs };
    let result = deviation::compute(&obs, &baseline).unwrap();
    assert!(result.has_pattern(Pattern::WeekendEffect), "+15.01% must fire");
}

// Out-of-range period indices skip their granularity; the fixed weights
// are not re-normalized, so only the hour term remains.
#[test]
fn missing_granularities_shrink_weighted_magnitude() {
    let baseline = flat_baseline("111", 9, 10.0);
    let obs = Observation {
        quantity: 15.0,
        hour_period: 9,
        day: 0,
        day_of_week: 0,
        month: 0,
    };

    let result = deviation::compute(&obs, &baseline).unwrap();
    assert_eq!(result.dow_deviation, None);
    assert_eq!(result.day_deviation, None);
    assert_eq!(result.month_deviation, None);
    assert!((result.hour_deviation.unwrap() - 0.5).abs() < 1e-9);
    assert!(
        (result.weighted_deviation - 0.2).abs() < 1e-9,
        "0.5 x 0.4 with the other terms absent, got {}",
        result.weighted_deviation
    );
}

// A zero expected volume reads as "nothing to deviate from", not a spike.
#[test]
fn zero_expected_volume_is_no_deviation() {
    let baseline = flat_baseline("111", 9, 0.0);
    let obs = Observation {
        quantity: 5.0,
        hour_period: 9,
        day: 12,
        day_of_week: 3,
        month: 6,
    };

    let result = deviation::compute(&obs, &baseline).unwrap();
    assert_eq!(result.weighted_deviation, 0.0);
    assert_eq!(result.hour_deviation, Some(0.0));
}

#[test]
fn malformed_baseline_is_rejected_by_compute() {
    let mut baseline = flat_baseline("111", 9, 2.0);
    baseline.dow_means = vec![2.0; 6]; // one short
    let obs = Observation {
        quantity: 3.0,
        hour_period: 9,
        day: 12,
        day_of_week: 3,
        month: 6,
    };

    let err = deviation::compute(&obs, &baseline).unwrap_err();
    assert!(matches!(err, PricePulseError::InvalidBaseline(_)), "got {err:?}");
}

// ── Trigger evaluation ──

#[test]
fn time_based_trigger_wraps_past_midnight() {
    let engine = Engine::new();
    let id = engine
        .create_time_based_trigger("Night owl", 22, 2, vec![1, 2, 3, 4, 5, 6, 7], Direction::Decrease, 5.0)
        .unwrap();
    let trigger = engine
        .list_triggers(true)
        .into_iter()
        .find(|t| t.id == id)
        .unwrap();

    let product = test_product("222", 10.0);
    let book = CompetitorBook::new();
    let at = |hour| {
        EvalContext {
            product: &product,
            deviation: None,
            now: Utc.with_ymd_and_hms(2026, 3, 4, hour, 30, 0).unwrap(),
            competitors: &book,
        }
    };

    assert!(evaluator::evaluate(&trigger, &at(23)).is_some(), "23:30 is inside 22-02");
    assert!(evaluator::evaluate(&trigger, &at(1)).is_some(), "01:30 is inside 22-02");
    assert!(evaluator::evaluate(&trigger, &at(2)).is_none(), "end hour is exclusive");
    assert!(evaluator::evaluate(&trigger, &at(21)).is_none(), "21:30 is before the window");

    let firing = evaluator::evaluate(&trigger, &at(23)).unwrap();
    assert!((firing.percentage_change - (-5.0)).abs() < 1e-9, "decrease is signed negative");
}

#[test]
fn competitor_undercut_fires_only_past_threshold() {
    let engine = Engine::new();
    let id = engine
        .create_competitor_trigger("Match rivals", vec!["MercadoMax".into()], 10.0, 8.0)
        .unwrap();
    let trigger = engine
        .list_triggers(true)
        .into_iter()
        .find(|t| t.id == id)
        .unwrap();

    let product = test_product("333", 10.0);
    let mut book = CompetitorBook::new();
    let now = Utc::now();

    // 9.50 undercuts by 5%: below the 10% threshold
    book.set("MercadoMax", "333", 9.50);
    let ctx = EvalContext { product: &product, deviation: None, now, competitors: &book };
    assert!(evaluator::evaluate(&trigger, &ctx).is_none());

    // 8.00 undercuts by 20%
    book.set("MercadoMax", "333", 8.00);
    let ctx = EvalContext { product: &product, deviation: None, now, competitors: &book };
    let firing = evaluator::evaluate(&trigger, &ctx).expect("20% undercut should fire");
    assert!(firing.percentage_change < 0.0, "competitor rules suggest decreases");
    assert!(firing.reason.contains("MercadoMax"));
}

fn volume_result(weighted: f64, trend: f64, patterns: Vec<Pattern>) -> DeviationResult {
    DeviationResult {
        weighted_deviation: weighted,
        hour_deviation: Some(weighted),
        dow_deviation: Some(weighted),
        day_deviation: Some(weighted),
        month_deviation: Some(weighted),
        patterns,
        confidence: 1.0,
        seasonal_trend: trend,
    }
}

fn volume_trigger(engine: &Engine, threshold: f64, change: f64) -> PriceTrigger {
    let id = engine
        .create_sales_volume_trigger("Spike", Direction::Increase, threshold, 24, change)
        .unwrap();
    engine
        .list_triggers(true)
        .into_iter()
        .find(|t| t.id == id)
        .unwrap()
}

// A +24% spike clears a 20% threshold on a weekday, but the same spike
// on a Saturday is expected behavior and gets dampened to +19.2%.
#[test]
fn weekend_damping_holds_borderline_spike_below_threshold() {
    let engine = Engine::new();
    let trigger = volume_trigger(&engine, 20.0, 10.0);
    let product = test_product("111", 10.0);
    let book = CompetitorBook::new();
    let now = Utc::now();

    let baseline = flat_baseline("111", 9, 100.0);
    let weekday = Observation {
        quantity: 124.0,
        hour_period: 9,
        day: 14,
        day_of_week: 3,
        month: 6,
    };
    let saturday = Observation { day_of_week: 6, ..weekday };

    let result = deviation::compute(&weekday, &baseline).unwrap();
    let ctx = EvalContext { product: &product, deviation: Some(&result), now, competitors: &book };
    let firing = evaluator::evaluate(&trigger, &ctx).expect("+24% undamped should fire");
    assert!(firing.reason.contains("no adjustments"));

    let result = deviation::compute(&saturday, &baseline).unwrap();
    assert!(result.has_pattern(Pattern::WeekendEffect));
    let (adjusted, applied) = evaluator::adjusted_deviation(&result);
    assert!((adjusted - 0.192).abs() < 1e-9, "0.24 x 0.8, got {adjusted}");
    assert_eq!(applied, vec!["weekend x0.8"]);
    let ctx = EvalContext { product: &product, deviation: Some(&result), now, competitors: &book };
    assert!(evaluator::evaluate(&trigger, &ctx).is_none(), "+19.2% damped must not fire");
}

#[test]
fn payday_damping_holds_borderline_spike_below_threshold() {
    let engine = Engine::new();
    let trigger = volume_trigger(&engine, 20.0, 10.0);
    let product = test_product("111", 10.0);
    let book = CompetitorBook::new();
    let now = Utc::now();

    let baseline = flat_baseline("111", 9, 100.0);
    let ordinary_day = Observation {
        quantity: 127.0,
        hour_period: 9,
        day: 14,
        day_of_week: 3,
        month: 6,
    };
    let payday = Observation { day: 5, ..ordinary_day };

    let result = deviation::compute(&ordinary_day, &baseline).unwrap();
    let ctx = EvalContext { product: &product, deviation: Some(&result), now, competitors: &book };
    assert!(evaluator::evaluate(&trigger, &ctx).is_some(), "+27% undamped should fire");

    let result = deviation::compute(&payday, &baseline).unwrap();
    assert!(result.has_pattern(Pattern::PaydayEffect));
    let (adjusted, applied) = evaluator::adjusted_deviation(&result);
    assert!((adjusted - 0.189).abs() < 1e-9, "0.27 x 0.7, got {adjusted}");
    assert_eq!(applied, vec!["payday x0.7"]);
    let ctx = EvalContext { product: &product, deviation: Some(&result), now, competitors: &book };
    assert!(evaluator::evaluate(&trigger, &ctx).is_none(), "+18.9% damped must not fire");
}

// Below-average months amplify by 1.2; above-average months dampen by 0.9.
#[test]
fn seasonal_trend_scales_deviation_both_ways() {
    let engine = Engine::new();
    let trigger = volume_trigger(&engine, 20.0, 10.0);
    let product = test_product("111", 10.0);
    let book = CompetitorBook::new();
    let now = Utc::now();
    let eval = |result: &DeviationResult| {
        let ctx = EvalContext { product: &product, deviation: Some(result), now, competitors: &book };
        evaluator::evaluate(&trigger, &ctx)
    };

    // +18% alone is short of the threshold, but a slow month (trend 0.5)
    // amplifies it to +21.6%
    assert!(eval(&volume_result(0.18, 1.0, Vec::new())).is_none());
    let firing = eval(&volume_result(0.18, 0.5, Vec::new())).expect("low trend amplifies");
    assert!(firing.reason.contains("seasonal x1.2"));

    // +21% fires on its own, but a hot month (trend 1.5) dampens it to +18.9%
    assert!(eval(&volume_result(0.21, 1.0, Vec::new())).is_some());
    assert!(eval(&volume_result(0.21, 1.5, Vec::new())).is_none(), "high trend dampens");
}

#[test]
fn quarter_deviation_clears_twenty_percent_threshold_and_raises_price_ten_percent() {
    let engine = Engine::new();
    let trigger = volume_trigger(&engine, 20.0, 10.0);
    let product = test_product("111", 10.0);
    let book = CompetitorBook::new();
    let now = Utc::now();

    let result = volume_result(0.25, 1.0, Vec::new());
    let ctx = EvalContext { product: &product, deviation: Some(&result), now, competitors: &book };
    let firing = evaluator::evaluate(&trigger, &ctx).expect("+25% clears a 20% threshold");
    assert!((firing.percentage_change - 10.0).abs() < 1e-9);

    let mut ledger = SuggestionLedger::new();
    let suggestion = ledger.create(&product, firing.trigger_id, firing.percentage_change, firing.reason, now);
    assert!((suggestion.suggested_price - 11.0).abs() < 1e-9, "10.00 x 1.10");
}

// ── Suggestion lifecycle through the engine ──

fn seed_engine_with_sale(engine: &Engine, ean: &str, quantity: u32) {
    engine.with_state(|st| {
        st.catalog.upsert(test_product(ean, 10.0));
        let at = st.simulator.virtual_clock - Duration::minutes(10);
        let sale = Sale::record(ean, quantity, 10.0, at);
        st.baselines
            .insert(flat_baseline(ean, sale.hour_period, 1.0))
            .unwrap();
        st.sales.push(sale);
    });
}

#[test]
fn analyze_raises_suggestion_and_caps_at_one_pending() {
    let engine = Engine::new();
    engine
        .create_sales_volume_trigger("Spike", Direction::Increase, 50.0, 24, 12.0)
        .unwrap();
    seed_engine_with_sale(&engine, "444", 10); // +900% vs flat mean 1.0

    let suggestion = engine
        .analyze_sales_for_product("444", TimeWindow::Day)
        .unwrap()
        .expect("a +900% deviation should fire a 50% threshold");
    assert_eq!(suggestion.ean, "444");
    assert!((suggestion.percentage_change - 12.0).abs() < 1e-9);
    assert!((suggestion.suggested_price - 11.2).abs() < 1e-9, "10.00 +12%");
    assert_eq!(suggestion.status, SuggestionStatus::Pending);

    // Second pass is gated by the existing pending suggestion
    let again = engine.analyze_sales_for_product("444", TimeWindow::Day).unwrap();
    assert!(again.is_none(), "one pending suggestion per product");
}

#[test]
fn accept_applies_price_once_and_is_idempotent() {
    let engine = Engine::new();
    engine
        .create_sales_volume_trigger("Spike", Direction::Increase, 50.0, 24, 12.0)
        .unwrap();
    seed_engine_with_sale(&engine, "555", 10);

    let suggestion = engine
        .analyze_sales_for_product("555", TimeWindow::Day)
        .unwrap()
        .unwrap();

    engine.accept_suggestion(suggestion.id).unwrap();
    let price = engine.with_state(|st| st.catalog.get("555").unwrap().current_price);
    assert!((price - 11.2).abs() < 1e-9);

    // Retrying a resolved suggestion is a no-op, not an error
    engine.accept_suggestion(suggestion.id).unwrap();
    let price = engine.with_state(|st| st.catalog.get("555").unwrap().current_price);
    assert!((price - 11.2).abs() < 1e-9, "price must not be applied twice");

    let (pending, accepted, rejected) = engine.snapshot().suggestion_counts;
    assert_eq!((pending, accepted, rejected), (0, 1, 0));
}

#[test]
fn stale_suggestion_is_hidden_and_refused() {
    let engine = Engine::new();
    engine
        .create_sales_volume_trigger("Spike", Direction::Increase, 50.0, 24, 12.0)
        .unwrap();
    seed_engine_with_sale(&engine, "666", 10);

    let suggestion = engine
        .analyze_sales_for_product("666", TimeWindow::Day)
        .unwrap()
        .unwrap();

    // Price moves after the suggestion was computed
    engine.with_state(|st| st.catalog.set_price("666", 9.0)).unwrap();

    assert!(
        engine.fetch_pending_suggestions().is_empty(),
        "stale suggestions are hidden from the actionable list"
    );

    let err = engine.accept_suggestion(suggestion.id).unwrap_err();
    assert!(matches!(err, PricePulseError::Validation(_)), "got {err:?}");
    let price = engine.with_state(|st| st.catalog.get("666").unwrap().current_price);
    assert!((price - 9.0).abs() < 1e-9, "a refused accept must not touch the price");
}

#[test]
fn reject_all_resolves_every_pending_suggestion() {
    let engine = Engine::new();
    engine
        .create_sales_volume_trigger("Spike", Direction::Increase, 50.0, 24, 12.0)
        .unwrap();
    seed_engine_with_sale(&engine, "777", 10);
    seed_engine_with_sale(&engine, "778", 10);

    let a = engine.analyze_sales_for_product("777", TimeWindow::Day).unwrap().unwrap();
    let b = engine.analyze_sales_for_product("778", TimeWindow::Day).unwrap().unwrap();

    engine.reject_all_suggestions(&[a.id, b.id]).unwrap();
    let (pending, accepted, rejected) = engine.snapshot().suggestion_counts;
    assert_eq!((pending, accepted, rejected), (0, 0, 2));
}

#[test]
fn first_matching_trigger_wins_in_name_order() {
    let engine = Engine::new();
    // Created out of order; evaluation order is by name
    let second = engine
        .create_sales_volume_trigger("B rule", Direction::Increase, 50.0, 24, 5.0)
        .unwrap();
    let first = engine
        .create_sales_volume_trigger("A rule", Direction::Increase, 50.0, 24, 3.0)
        .unwrap();
    assert!(second < first, "creation order differs from name order");
    seed_engine_with_sale(&engine, "888", 10);

    let suggestion = engine
        .analyze_sales_for_product("888", TimeWindow::Day)
        .unwrap()
        .unwrap();
    assert_eq!(suggestion.trigger_id, first, "\"A rule\" sorts first and wins");
    assert!((suggestion.percentage_change - 3.0).abs() < 1e-9);
}

// ── Baseline import ──

fn baseline_csv_row(ean: &str, hour: u8, mean: f64) -> String {
    let mut cols = vec![ean.to_string(), hour.to_string(), mean.to_string(), mean.to_string()];
    for _ in 0..(2 * 12 + 2 * 31 + 2 * 7) {
        cols.push(mean.to_string());
    }
    cols.join(",")
}

#[test]
fn csv_import_replaces_store_wholesale() {
    let engine = Engine::new();

    let csv = format!("header\n{}\n{}\n",
        baseline_csv_row("100", 9, 2.0),
        baseline_csv_row("100", 10, 3.0));
    assert_eq!(engine.import_baselines(&csv).unwrap(), 2);
    assert!(engine.get_baseline("100", 9).is_some());

    let csv = format!("header\n{}\n", baseline_csv_row("200", 9, 4.0));
    assert_eq!(engine.import_baselines(&csv).unwrap(), 1);
    assert!(engine.get_baseline("100", 9).is_none(), "reimport replaces everything");
    assert!(engine.get_baseline("200", 9).is_some());
}

#[test]
fn bad_csv_row_keeps_previous_records() {
    let engine = Engine::new();
    let good = format!("header\n{}\n", baseline_csv_row("100", 9, 2.0));
    engine.import_baselines(&good).unwrap();

    let mut short_row = baseline_csv_row("300", 9, 2.0);
    short_row.truncate(short_row.rfind(',').unwrap());
    let bad = format!("header\n{}\n{}\n", baseline_csv_row("200", 9, 4.0), short_row);

    let err = engine.import_baselines(&bad).unwrap_err();
    assert!(matches!(err, PricePulseError::DataImport(_)), "got {err:?}");
    assert!(engine.get_baseline("100", 9).is_some(), "failed import must not clear the store");
    assert!(engine.get_baseline("200", 9).is_none(), "failed import must not partially apply");
}

// ── Simulation control ──

#[test]
fn starting_with_no_eligible_products_fails() {
    let engine = Engine::new();
    let err = engine.start_simulation().unwrap_err();
    assert!(matches!(err, PricePulseError::NoEligibleProducts));
}

#[test]
fn run_cycle_advances_virtual_clock_by_speed() {
    let engine = Engine::new();
    engine.with_state(|st| st.catalog.upsert(test_product("999", 5.0)));
    engine.set_speed(60);
    engine.start_simulation().unwrap();

    let before = engine.snapshot().virtual_clock;
    engine.run_cycle();
    let after = engine.snapshot().virtual_clock;
    assert_eq!(after - before, Duration::minutes(60));
}

#[test]
fn run_cycle_is_noop_while_paused() {
    let engine = Engine::new();
    engine.with_state(|st| st.catalog.upsert(test_product("999", 5.0)));

    let before = engine.snapshot().virtual_clock;
    let report = engine.run_cycle();
    assert!(report.sales.is_empty());
    assert_eq!(engine.snapshot().virtual_clock, before);
}

// The wall-clock tick rate scales with the multiplier: x1 ticks every
// second, x5 every 200ms.
#[test]
fn tick_period_follows_speed_multiplier() {
    use std::time::Duration as StdDuration;

    assert_eq!(engine::tick_period(1), StdDuration::from_secs(1));
    assert_eq!(engine::tick_period(5), StdDuration::from_millis(200));
    assert_eq!(engine::tick_period(1440), StdDuration::from_micros(694));
    assert_eq!(engine::tick_period(0), StdDuration::from_secs(1), "zero clamps to x1");

    let engine = Engine::new();
    engine.set_speed(60);
    assert_eq!(engine.tick_period(), StdDuration::from_micros(16_666));
}

// A catalog that loses its last eligible product mid-run stops producing
// sales; the condition is signaled once, not every tick.
#[test]
fn losing_all_eligible_products_mid_run_stops_sales_and_latches() {
    let engine = Engine::new();
    engine.with_state(|st| st.catalog.upsert(test_product("999", 5.0)));
    engine.start_simulation().unwrap();
    assert!(!engine.no_eligible_latched());

    engine.with_state(|st| st.catalog.set_price("999", 0.0)).unwrap();

    let report = engine.run_cycle();
    assert!(report.sales.is_empty());
    assert!(engine.no_eligible_latched(), "first empty tick sets the latch");
    for _ in 0..4 {
        let report = engine.run_cycle();
        assert!(report.sales.is_empty());
    }
    assert!(engine.no_eligible_latched());

    // Restarting clears the latch once products are eligible again
    engine.with_state(|st| st.catalog.set_price("999", 5.0)).unwrap();
    engine.start_simulation().unwrap();
    assert!(!engine.no_eligible_latched());
}

#[test]
fn boost_requires_an_existing_active_trigger() {
    let engine = Engine::new();
    engine.with_state(|st| st.catalog.upsert(test_product("999", 5.0)));
    engine.start_simulation().unwrap();

    let err = engine.activate_boost(42, Vec::new()).unwrap_err();
    assert!(matches!(err, PricePulseError::Trigger(_)), "got {err:?}");

    let id = engine
        .create_sales_volume_trigger("Spike", Direction::Increase, 30.0, 24, 10.0)
        .unwrap();
    engine.activate_boost(id, vec!["999".into()]).unwrap();
    assert!(engine.snapshot().boost_active);

    engine.deactivate_boost();
    assert!(!engine.snapshot().boost_active);
}

#[test]
fn reset_clears_sales_and_reanchors_clock() {
    let engine = Engine::new();
    engine.with_state(|st| st.catalog.upsert(test_product("999", 5.0)));
    engine.set_speed(1440);
    engine.start_simulation().unwrap();
    for _ in 0..10 {
        engine.run_cycle();
    }

    engine.reset_simulation();
    let snapshot = engine.snapshot();
    assert!(snapshot.recent_sales.is_empty(), "reset discards the sales log");
    let drift = (Utc::now() - snapshot.virtual_clock).num_seconds().abs();
    assert!(drift < 5, "reset re-anchors the virtual clock to now, drift {drift}s");
}
