use tracing::info;

use crate::error::{PricePulseError, Result};
use crate::types::{Direction, PriceTrigger, TriggerType};

/// Holds the set of user-defined pricing rules. The engine only ever sees
/// the active subset, in stable name order.
#[derive(Debug, Default)]
pub struct TriggerStore {
    triggers: Vec<PriceTrigger>,
    next_id: u64,
}

impl TriggerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Triggers sorted by name so an evaluation pass is deterministic.
    pub fn list(&self, active_only: bool) -> Vec<&PriceTrigger> {
        let mut out: Vec<&PriceTrigger> = self
            .triggers
            .iter()
            .filter(|t| !active_only || t.active)
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    pub fn get(&self, id: u64) -> Option<&PriceTrigger> {
        self.triggers.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn create_sales_volume(
        &mut self,
        name: &str,
        direction: Direction,
        percentage_threshold: f64,
        time_window_hours: u32,
        price_change_percentage: f64,
    ) -> Result<u64> {
        validate_name(name)?;
        if percentage_threshold <= 0.0 {
            return Err(PricePulseError::Trigger(
                "threshold must be positive".into(),
            ));
        }
        Ok(self.push(PriceTrigger {
            id: 0,
            name: name.to_string(),
            trigger_type: TriggerType::SalesVolume,
            active: true,
            direction,
            percentage_threshold,
            time_window_hours,
            price_change_percentage,
            start_hour: None,
            end_hour: None,
            days_of_week: Vec::new(),
            competitors: Vec::new(),
        }))
    }

    pub fn create_time_based(
        &mut self,
        name: &str,
        start_hour: u8,
        end_hour: u8,
        days_of_week: Vec<u8>,
        direction: Direction,
        price_change_percentage: f64,
    ) -> Result<u64> {
        validate_name(name)?;
        if start_hour >= 24 || end_hour >= 24 {
            return Err(PricePulseError::Validation("invalid hour range".into()));
        }
        if days_of_week.is_empty() {
            return Err(PricePulseError::Validation(
                "must select at least one day".into(),
            ));
        }
        if days_of_week.iter().any(|d| !(1..=7).contains(d)) {
            return Err(PricePulseError::Validation(
                "days of week must be 1..=7".into(),
            ));
        }
        Ok(self.push(PriceTrigger {
            id: 0,
            name: name.to_string(),
            trigger_type: TriggerType::TimeBased,
            active: true,
            direction,
            percentage_threshold: 0.0,
            time_window_hours: 0,
            price_change_percentage,
            start_hour: Some(start_hour),
            end_hour: Some(end_hour),
            days_of_week,
            competitors: Vec::new(),
        }))
    }

    pub fn create_competitor(
        &mut self,
        name: &str,
        competitors: Vec<String>,
        percentage_threshold: f64,
        price_change_percentage: f64,
    ) -> Result<u64> {
        validate_name(name)?;
        if competitors.is_empty() {
            return Err(PricePulseError::Validation(
                "must specify at least one competitor".into(),
            ));
        }
        Ok(self.push(PriceTrigger {
            id: 0,
            name: name.to_string(),
            trigger_type: TriggerType::CompetitorPrice,
            active: true,
            direction: Direction::Decrease,
            percentage_threshold,
            time_window_hours: 0,
            price_change_percentage,
            start_hour: None,
            end_hour: None,
            days_of_week: Vec::new(),
            competitors,
        }))
    }

    /// Replace an existing trigger wholesale; the id must already exist.
    pub fn update(&mut self, trigger: PriceTrigger) -> Result<()> {
        validate_name(&trigger.name)?;
        let slot = self
            .triggers
            .iter_mut()
            .find(|t| t.id == trigger.id)
            .ok_or_else(|| {
                PricePulseError::Trigger(format!("no trigger with id {}", trigger.id))
            })?;
        info!(id = trigger.id, name = %trigger.name, "updated trigger");
        *slot = trigger;
        Ok(())
    }

    pub fn delete(&mut self, id: u64) -> Result<()> {
        let before = self.triggers.len();
        self.triggers.retain(|t| t.id != id);
        if self.triggers.len() == before {
            return Err(PricePulseError::Trigger(format!("no trigger with id {id}")));
        }
        info!(id, "deleted trigger");
        Ok(())
    }

    fn push(&mut self, mut trigger: PriceTrigger) -> u64 {
        self.next_id += 1;
        trigger.id = self.next_id;
        info!(id = trigger.id, name = %trigger.name, kind = ?trigger.trigger_type, "created trigger");
        self.triggers.push(trigger);
        self.next_id
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(PricePulseError::Validation(
            "trigger name cannot be empty".into(),
        ));
    }
    Ok(())
}
