use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration as StdDuration, Instant};

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, warn};

use crate::baseline::BaselineStore;
use crate::catalog::{CompetitorBook, ProductCatalog, SalesLog};
use crate::deviation::{self, Observation};
use crate::error::{PricePulseError, Result};
use crate::evaluator::{self, EvalContext};
use crate::ledger::SuggestionLedger;
use crate::simulator::SalesSimulator;
use crate::triggers::TriggerStore;
use crate::types::{
    Direction, HourlyBaseline, PriceSuggestion, PriceTrigger, Sale, TimeWindow,
};

/// Everything the engine owns, behind one lock. Product price mutations
/// (accept, sale creation, import) all serialize here.
pub struct EngineState {
    pub catalog: ProductCatalog,
    pub sales: SalesLog,
    pub baselines: BaselineStore,
    pub triggers: TriggerStore,
    pub ledger: SuggestionLedger,
    pub simulator: SalesSimulator,
    pub competitors: CompetitorBook,
    /// Latched after the first empty-catalog tick so the condition is
    /// signaled once, not every 200ms.
    no_eligible_signaled: bool,
}

/// Output of one tick cycle, consumed by the run-mode loops.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub sales: Vec<Sale>,
    pub suggestions: Vec<PriceSuggestion>,
    pub skipped_products: u32,
    pub generation_us: u64,
    pub evaluation_us: u64,
}

/// Snapshot of engine state for the dashboards.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub running: bool,
    pub speed_multiplier: u32,
    pub virtual_clock: DateTime<Utc>,
    pub total_sales: u64,
    pub boost_active: bool,
    pub boost_trigger: Option<String>,
    pub pending_suggestions: Vec<PriceSuggestion>,
    pub recent_sales: Vec<Sale>,
    pub prices: Vec<(String, String, f64)>,
    pub suggestion_counts: (usize, usize, usize),
    pub trigger_count: usize,
    pub baseline_count: usize,
}

#[derive(Clone)]
pub struct Engine {
    state: Arc<Mutex<EngineState>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(EngineState {
                catalog: ProductCatalog::new(),
                sales: SalesLog::new(),
                baselines: BaselineStore::new(),
                triggers: TriggerStore::new(),
                ledger: SuggestionLedger::new(),
                simulator: SalesSimulator::new(),
                competitors: CompetitorBook::new(),
                no_eligible_signaled: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().expect("engine state lock poisoned")
    }

    /// Seed demo products, synthetic baselines, a default volume trigger
    /// and a couple of competitor quotes so every run mode works
    /// standalone.
    pub fn seed_demo(&self) {
        let mut st = self.lock();
        st.catalog.seed_demo();

        let eans: Vec<String> = st.catalog.iter().map(|p| p.ean.clone()).collect();
        let mut rng = rand::thread_rng();
        for ean in &eans {
            for hour in 7..=21u8 {
                let mean = demo_hour_mean(hour, &mut rng);
                let baseline = demo_baseline(ean, hour, mean, &mut rng);
                st.baselines.insert(baseline).expect("demo baseline valid");
            }
        }

        st.triggers
            .create_sales_volume("Volume spike +10%", Direction::Increase, 60.0, 24, 10.0)
            .expect("demo trigger valid");
        st.triggers
            .create_sales_volume("Volume drop -8%", Direction::Decrease, 60.0, 24, 8.0)
            .expect("demo trigger valid");

        if let Some(first) = eans.first() {
            st.competitors.set("MercadoMax", first, 6.99);
            st.competitors.set("SuperVarejo", first, 7.49);
        }
    }

    // ── Baselines ──

    pub fn get_baseline(&self, ean: &str, hour_period: u8) -> Option<HourlyBaseline> {
        self.lock().baselines.get(ean, hour_period).cloned()
    }

    pub fn import_baselines(&self, csv: &str) -> Result<usize> {
        self.lock().baselines.import_csv(csv)
    }

    // ── Triggers ──

    pub fn list_triggers(&self, active_only: bool) -> Vec<PriceTrigger> {
        self.lock()
            .triggers
            .list(active_only)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn create_sales_volume_trigger(
        &self,
        name: &str,
        direction: Direction,
        threshold: f64,
        window_hours: u32,
        price_change_pct: f64,
    ) -> Result<u64> {
        self.lock()
            .triggers
            .create_sales_volume(name, direction, threshold, window_hours, price_change_pct)
    }

    pub fn create_time_based_trigger(
        &self,
        name: &str,
        start_hour: u8,
        end_hour: u8,
        days_of_week: Vec<u8>,
        direction: Direction,
        price_change_pct: f64,
    ) -> Result<u64> {
        self.lock().triggers.create_time_based(
            name,
            start_hour,
            end_hour,
            days_of_week,
            direction,
            price_change_pct,
        )
    }

    pub fn create_competitor_trigger(
        &self,
        name: &str,
        competitors: Vec<String>,
        threshold: f64,
        price_change_pct: f64,
    ) -> Result<u64> {
        self.lock()
            .triggers
            .create_competitor(name, competitors, threshold, price_change_pct)
    }

    pub fn update_trigger(&self, trigger: PriceTrigger) -> Result<()> {
        self.lock().triggers.update(trigger)
    }

    pub fn delete_trigger(&self, id: u64) -> Result<()> {
        self.lock().triggers.delete(id)
    }

    // ── Suggestions ──

    pub fn fetch_pending_suggestions(&self) -> Vec<PriceSuggestion> {
        let st = self.lock();
        st.ledger
            .pending_actionable(&st.catalog)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn accept_suggestion(&self, id: u64) -> Result<()> {
        let mut st = self.lock();
        let st = &mut *st;
        st.ledger.accept(id, &mut st.catalog)
    }

    pub fn reject_suggestion(&self, id: u64) -> Result<()> {
        self.lock().ledger.reject(id)
    }

    pub fn reject_all_suggestions(&self, ids: &[u64]) -> Result<()> {
        self.lock().ledger.reject_all(ids)
    }

    // ── Simulation control ──

    pub fn start_simulation(&self) -> Result<()> {
        let mut st = self.lock();
        let eligible = st.catalog.eligible().len();
        st.no_eligible_signaled = false;
        st.simulator.start(eligible)
    }

    pub fn stop_simulation(&self) {
        self.lock().simulator.stop();
    }

    pub fn set_speed(&self, multiplier: u32) {
        self.lock().simulator.set_speed(multiplier);
    }

    pub fn speed(&self) -> u32 {
        self.lock().simulator.speed_multiplier
    }

    /// Wall-clock delay between ticks: one second divided by the speed
    /// multiplier, so higher speeds tick more often as well as advancing
    /// the virtual clock further per tick.
    pub fn tick_period(&self) -> StdDuration {
        tick_period(self.speed())
    }

    /// True once a running simulation has hit an empty eligible set; the
    /// warning is emitted on the first such tick only.
    pub fn no_eligible_latched(&self) -> bool {
        self.lock().no_eligible_signaled
    }

    pub fn reset_simulation(&self) {
        let mut st = self.lock();
        st.simulator.reset();
        st.sales.clear();
        st.no_eligible_signaled = false;
    }

    pub fn activate_boost(&self, trigger_id: u64, targets: Vec<String>) -> Result<()> {
        let mut st = self.lock();
        let st = &mut *st;
        let trigger = st
            .triggers
            .get(trigger_id)
            .ok_or_else(|| PricePulseError::Trigger(format!("no trigger with id {trigger_id}")))?
            .clone();
        if !trigger.active {
            return Err(PricePulseError::Trigger(format!(
                "trigger {} is inactive",
                trigger.name
            )));
        }
        let targets: HashSet<String> = if targets.is_empty() {
            st.catalog
                .eligible()
                .iter()
                .take(3)
                .map(|p| p.ean.clone())
                .collect()
        } else {
            targets.into_iter().collect()
        };
        st.simulator.activate_boost(&trigger, targets)
    }

    pub fn deactivate_boost(&self) {
        self.lock().simulator.deactivate_boost();
    }

    pub fn set_competitor_price(&self, competitor: &str, ean: &str, price: f64) {
        self.lock().competitors.set(competitor, ean, price);
    }

    pub fn set_pattern_modifier(&self, which: &str, enabled: bool) -> Result<()> {
        let mut st = self.lock();
        let modifiers = &mut st.simulator.modifiers;
        match which {
            "weekend" => modifiers.weekend.enabled = enabled,
            "lunch_rush" => modifiers.lunch_rush.enabled = enabled,
            "payday" => modifiers.payday.enabled = enabled,
            other => {
                return Err(PricePulseError::Validation(format!(
                    "unknown pattern modifier {other}"
                )))
            }
        }
        Ok(())
    }

    // ── Tick cycle ──

    /// One unit of work: generate this tick's sales, persist them, then
    /// run deviation + trigger evaluation per sale. Runs to completion
    /// under the state lock; a new cycle cannot overlap it.
    pub fn run_cycle(&self) -> CycleReport {
        let mut st = self.lock();
        let st = &mut *st;
        if !st.simulator.running {
            return CycleReport::default();
        }

        let mut rng = rand::thread_rng();
        let gen_start = Instant::now();
        let sales = match st.simulator.tick(&st.catalog, &mut rng) {
            Ok(sales) => sales,
            Err(PricePulseError::NoEligibleProducts) => {
                if !st.no_eligible_signaled {
                    st.no_eligible_signaled = true;
                    warn!(
                        hint = ?PricePulseError::NoEligibleProducts.recovery_hint(),
                        "no eligible products; tick is a no-op"
                    );
                }
                return CycleReport::default();
            }
            Err(e) => {
                warn!(error = %e, "tick failed; cycle abandoned");
                return CycleReport::default();
            }
        };
        let generation_us = gen_start.elapsed().as_micros() as u64;

        for sale in &sales {
            st.sales.push(sale.clone());
        }

        let eval_start = Instant::now();
        let mut suggestions = Vec::new();
        let mut skipped_products = 0u32;
        let active = st.triggers.list(true);
        let now = st.simulator.virtual_clock;

        for sale in &sales {
            let Some(product) = st.catalog.get(&sale.ean) else {
                continue;
            };
            if st.ledger.has_pending(&sale.ean) {
                continue;
            }

            let deviation = match st
                .baselines
                .get(&sale.ean, sale.hour_period)
                .ok_or_else(|| PricePulseError::BaselineNotFound {
                    ean: sale.ean.clone(),
                    hour_period: sale.hour_period,
                })
                .and_then(|b| deviation::compute(&Observation::from(sale), b))
            {
                Ok(result) => result,
                Err(e) => {
                    // per-product, non-fatal: skip for this cycle
                    debug!(ean = %sale.ean, error = %e, "skipping product");
                    skipped_products += 1;
                    continue;
                }
            };

            let ctx = EvalContext {
                product,
                deviation: Some(&deviation),
                now,
                competitors: &st.competitors,
            };
            if let Some(firing) = evaluator::evaluate_all(&active, &ctx) {
                let suggestion = st.ledger.create(
                    product,
                    firing.trigger_id,
                    firing.percentage_change,
                    firing.reason,
                    now,
                );
                suggestions.push(suggestion.clone());
            }
        }
        let evaluation_us = eval_start.elapsed().as_micros() as u64;

        CycleReport {
            sales,
            suggestions,
            skipped_products,
            generation_us,
            evaluation_us,
        }
    }

    // ── On-demand analysis ──

    /// Aggregate the product's most recent hour of sales inside the window
    /// and run the same deviation + trigger path as the live cycle.
    pub fn analyze_sales_for_product(
        &self,
        ean: &str,
        window: TimeWindow,
    ) -> Result<Option<PriceSuggestion>> {
        let mut st = self.lock();
        let st = &mut *st;
        let product = st
            .catalog
            .get(ean)
            .ok_or_else(|| PricePulseError::Validation(format!("unknown product {ean}")))?;

        let now = st.simulator.virtual_clock;
        let cutoff = now - Duration::hours(window.hours());
        let recent = st.sales.recent_for(ean, cutoff);
        let Some(latest) = recent.first() else {
            debug!(ean, window = ?window, "no sales in window");
            return Ok(None);
        };

        // volume of the most recent hour bucket inside the window
        let bucket_cutoff = latest.timestamp - Duration::hours(1);
        let volume: u32 = recent
            .iter()
            .filter(|s| s.timestamp > bucket_cutoff)
            .map(|s| s.quantity)
            .sum();
        let observation = Observation {
            quantity: volume as f64,
            hour_period: latest.hour_period,
            day: latest.day,
            day_of_week: latest.day_of_week,
            month: latest.month,
        };

        let baseline = st.baselines.get(ean, latest.hour_period).ok_or_else(|| {
            PricePulseError::BaselineNotFound {
                ean: ean.to_string(),
                hour_period: latest.hour_period,
            }
        })?;
        let deviation = deviation::compute(&observation, baseline)?;

        if st.ledger.has_pending(ean) {
            return Ok(None);
        }
        let active = st.triggers.list(true);
        let ctx = EvalContext {
            product,
            deviation: Some(&deviation),
            now,
            competitors: &st.competitors,
        };
        let Some(firing) = evaluator::evaluate_all(&active, &ctx) else {
            return Ok(None);
        };
        let suggestion = st.ledger.create(
            product,
            firing.trigger_id,
            firing.percentage_change,
            firing.reason,
            now,
        );
        Ok(Some(suggestion.clone()))
    }

    // ── Snapshots ──

    pub fn snapshot(&self) -> EngineSnapshot {
        let st = self.lock();
        EngineSnapshot {
            running: st.simulator.running,
            speed_multiplier: st.simulator.speed_multiplier,
            virtual_clock: st.simulator.virtual_clock,
            total_sales: st.simulator.total_generated,
            boost_active: st.simulator.boost().is_some(),
            boost_trigger: st.simulator.boost().map(|b| b.trigger_name.clone()),
            pending_suggestions: st
                .ledger
                .pending_actionable(&st.catalog)
                .into_iter()
                .cloned()
                .collect(),
            recent_sales: st.sales.last_n(10).into_iter().cloned().collect(),
            prices: st
                .catalog
                .iter()
                .map(|p| (p.ean.clone(), p.name.clone(), p.current_price))
                .collect(),
            suggestion_counts: st.ledger.counts(),
            trigger_count: st.triggers.len(),
            baseline_count: st.baselines.len(),
        }
    }

    /// Direct state access for tests and seeding helpers.
    pub fn with_state<T>(&self, f: impl FnOnce(&mut EngineState) -> T) -> T {
        f(&mut self.lock())
    }
}

pub fn tick_period(speed_multiplier: u32) -> StdDuration {
    StdDuration::from_micros(1_000_000 / speed_multiplier.max(1) as u64)
}

fn demo_hour_mean(hour: u8, rng: &mut impl Rng) -> f64 {
    // busier around lunch and early evening
    let shape = match hour {
        11..=14 => 3.2,
        17..=19 => 2.8,
        7..=9 => 1.6,
        _ => 2.0,
    };
    shape + rng.gen_range(-0.3..0.3)
}

fn jittered<R: Rng>(n: usize, mean: f64, rng: &mut R) -> Vec<f64> {
    (0..n)
        .map(|_| (mean + rng.gen_range(-0.5..0.5)).max(0.1))
        .collect()
}

fn demo_baseline(ean: &str, hour: u8, mean: f64, rng: &mut impl Rng) -> HourlyBaseline {
    HourlyBaseline {
        ean: ean.to_string(),
        hour_period: hour,
        total_median_quantity: mean * 0.9,
        total_mean_quantity: mean,
        monthly_medians: jittered(12, mean, rng),
        monthly_means: jittered(12, mean, rng),
        daily_medians: jittered(31, mean, rng),
        daily_means: jittered(31, mean, rng),
        dow_medians: jittered(7, mean, rng),
        dow_means: jittered(7, mean, rng),
    }
}
