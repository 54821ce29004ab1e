use std::collections::HashSet;

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

use crate::catalog::ProductCatalog;
use crate::error::{PricePulseError, Result};
use crate::types::{Direction, PriceTrigger, Sale};

/// Base per-product, per-tick probability of a sale.
pub const BASE_SALE_PROBABILITY: f64 = 0.3;
/// How many eligible products one tick samples by default.
pub const DEFAULT_SAMPLE_SIZE: usize = 8;

pub const NORMAL_QUANTITY: std::ops::RangeInclusive<u32> = 1..=5;
pub const BOOSTED_QUANTITY: std::ops::RangeInclusive<u32> = 3..=8;
pub const BOOSTED_EVENTS: std::ops::RangeInclusive<u32> = 2..=5;

/// One named probability modifier. All default off: they are configuration
/// hooks, not hardwired behavior.
#[derive(Debug, Clone, Copy)]
pub struct PatternModifier {
    pub enabled: bool,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct PatternModifiers {
    pub weekend: PatternModifier,
    pub lunch_rush: PatternModifier,
    pub payday: PatternModifier,
}

impl Default for PatternModifiers {
    fn default() -> Self {
        Self {
            weekend: PatternModifier { enabled: false, multiplier: 1.5 },
            lunch_rush: PatternModifier { enabled: false, multiplier: 1.8 },
            payday: PatternModifier { enabled: false, multiplier: 1.4 },
        }
    }
}

/// Boost: elevated sale probability and quantity for a target subset,
/// tied to one active trigger.
#[derive(Debug, Clone)]
pub struct BoostState {
    pub trigger_id: u64,
    pub trigger_name: String,
    pub targets: HashSet<String>,
    pub probability_factor: f64,
}

/// Synthetic POS sales generator driving a virtual clock.
/// Stopped -> Running -> Stopped, with boost orthogonal on Running.
#[derive(Debug)]
pub struct SalesSimulator {
    pub running: bool,
    pub speed_multiplier: u32,
    pub virtual_clock: DateTime<Utc>,
    pub total_generated: u64,
    pub modifiers: PatternModifiers,
    pub sample_size: usize,
    boost: Option<BoostState>,
}

impl Default for SalesSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl SalesSimulator {
    pub fn new() -> Self {
        Self {
            running: false,
            speed_multiplier: 1,
            virtual_clock: Utc::now(),
            total_generated: 0,
            modifiers: PatternModifiers::default(),
            sample_size: DEFAULT_SAMPLE_SIZE,
            boost: None,
        }
    }

    pub fn boost(&self) -> Option<&BoostState> {
        self.boost.as_ref()
    }

    pub fn start(&mut self, eligible_count: usize) -> Result<()> {
        if self.running {
            return Ok(());
        }
        if eligible_count == 0 {
            return Err(PricePulseError::NoEligibleProducts);
        }
        self.running = true;
        info!(speed = self.speed_multiplier, eligible_count, "simulation started");
        Ok(())
    }

    /// Once this returns, no further tick generates sales: the running
    /// flag is only read under the same state lock that calls `tick`.
    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            info!("simulation stopped");
        }
    }

    pub fn set_speed(&mut self, multiplier: u32) {
        self.speed_multiplier = multiplier.max(1);
    }

    /// Multiply target products' sale probability by a factor derived from
    /// the trigger threshold.
    pub fn activate_boost(&mut self, trigger: &PriceTrigger, targets: HashSet<String>) -> Result<()> {
        if targets.is_empty() {
            return Err(PricePulseError::Simulation(
                "boost needs at least one target product".into(),
            ));
        }
        let factor = boost_factor(trigger);
        info!(trigger = %trigger.name, targets = targets.len(), factor, "boost activated");
        self.boost = Some(BoostState {
            trigger_id: trigger.id,
            trigger_name: trigger.name.clone(),
            targets,
            probability_factor: factor,
        });
        Ok(())
    }

    pub fn deactivate_boost(&mut self) {
        if self.boost.take().is_some() {
            info!("boost deactivated");
        }
    }

    /// Stop, re-anchor the virtual clock to real time, clear the counter
    /// and any boost. The caller clears the sales log in the same unit of
    /// work.
    pub fn reset(&mut self) {
        self.stop();
        self.virtual_clock = Utc::now();
        self.total_generated = 0;
        self.boost = None;
        info!("simulation reset");
    }

    /// One tick: advance the virtual clock by `speed_multiplier` minutes,
    /// then sample a bounded subset of eligible products for sales.
    pub fn tick(&mut self, catalog: &ProductCatalog, rng: &mut impl Rng) -> Result<Vec<Sale>> {
        self.virtual_clock += Duration::minutes(self.speed_multiplier as i64);

        let eligible = catalog.eligible();
        if eligible.is_empty() {
            return Err(PricePulseError::NoEligibleProducts);
        }

        let base = self.base_probability(self.virtual_clock);
        let mut sales = Vec::new();

        for product in eligible.choose_multiple(rng, self.sample_size) {
            let boosted = self
                .boost
                .as_ref()
                .is_some_and(|b| b.targets.contains(&product.ean));
            let probability = if boosted {
                let factor = self.boost.as_ref().expect("checked").probability_factor;
                (base * factor).clamp(0.0, 1.0)
            } else {
                base.clamp(0.0, 1.0)
            };

            if !rng.gen_bool(probability) {
                continue;
            }

            let events = if boosted { rng.gen_range(BOOSTED_EVENTS) } else { 1 };
            for _ in 0..events {
                let quantity = if boosted {
                    rng.gen_range(BOOSTED_QUANTITY)
                } else {
                    rng.gen_range(NORMAL_QUANTITY)
                };
                sales.push(Sale::record(
                    &product.ean,
                    quantity,
                    product.current_price,
                    self.virtual_clock,
                ));
            }
        }

        self.total_generated += sales.len() as u64;
        Ok(sales)
    }

    /// Base probability with any enabled pattern modifiers applied for the
    /// current virtual time.
    pub fn base_probability(&self, at: DateTime<Utc>) -> f64 {
        let hour = at.hour();
        let dow = at.weekday().number_from_monday();
        let day = at.day();

        let mut probability = BASE_SALE_PROBABILITY;
        if self.modifiers.weekend.enabled && (dow == 6 || dow == 7) {
            probability *= self.modifiers.weekend.multiplier;
        }
        if self.modifiers.lunch_rush.enabled && (11..=14).contains(&hour) {
            probability *= self.modifiers.lunch_rush.multiplier;
        }
        if self.modifiers.payday.enabled && (day == 5 || day == 20) {
            probability *= self.modifiers.payday.multiplier;
        }
        probability
    }
}

/// `1 + threshold/100` for increase triggers, `1 - threshold/100` for
/// decrease. The probability product is clamped to [0,1] at use.
pub fn boost_factor(trigger: &PriceTrigger) -> f64 {
    match trigger.direction {
        Direction::Increase => 1.0 + trigger.percentage_threshold / 100.0,
        Direction::Decrease => (1.0 - trigger.percentage_threshold / 100.0).max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TriggerType;

    fn volume_trigger(direction: Direction, threshold: f64) -> PriceTrigger {
        PriceTrigger {
            id: 1,
            name: "t".into(),
            trigger_type: TriggerType::SalesVolume,
            active: true,
            direction,
            percentage_threshold: threshold,
            time_window_hours: 24,
            price_change_percentage: 10.0,
            start_hour: None,
            end_hour: None,
            days_of_week: Vec::new(),
            competitors: Vec::new(),
        }
    }

    #[test]
    fn boost_factor_by_direction() {
        assert!((boost_factor(&volume_trigger(Direction::Increase, 50.0)) - 1.5).abs() < 1e-9);
        assert!((boost_factor(&volume_trigger(Direction::Decrease, 30.0)) - 0.7).abs() < 1e-9);
        // never negative even for absurd thresholds
        assert_eq!(boost_factor(&volume_trigger(Direction::Decrease, 250.0)), 0.0);
    }

    #[test]
    fn start_with_no_eligible_products_fails() {
        let mut sim = SalesSimulator::new();
        assert!(matches!(
            sim.start(0),
            Err(PricePulseError::NoEligibleProducts)
        ));
        assert!(!sim.running);
        assert!(sim.start(3).is_ok());
        assert!(sim.running);
    }

    #[test]
    fn tick_advances_virtual_clock_by_speed_minutes() {
        let mut sim = SalesSimulator::new();
        sim.set_speed(5);
        let before = sim.virtual_clock;
        let mut catalog = ProductCatalog::new();
        catalog.seed_demo();
        let mut rng = rand::thread_rng();
        sim.tick(&catalog, &mut rng).unwrap();
        assert_eq!(sim.virtual_clock - before, Duration::minutes(5));
    }

    #[test]
    fn reset_reanchors_clock() {
        let mut sim = SalesSimulator::new();
        sim.virtual_clock = Utc::now() + Duration::days(30);
        sim.total_generated = 99;
        sim.reset();
        assert!((Utc::now() - sim.virtual_clock).num_seconds().abs() < 5);
        assert_eq!(sim.total_generated, 0);
        assert!(sim.boost().is_none());
    }
}
