use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::catalog::ProductCatalog;
use crate::error::{PricePulseError, Result};
use crate::types::{PriceSuggestion, Product, SuggestionStatus};

/// Owns the lifecycle of price suggestions. At most one pending suggestion
/// per product; accept applies the price and flips the status inside one
/// unit of work (the caller already holds the engine state lock, so both
/// mutations are observed together or not at all).
#[derive(Debug, Default)]
pub struct SuggestionLedger {
    suggestions: Vec<PriceSuggestion>,
    next_id: u64,
}

impl SuggestionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.suggestions.len()
    }

    pub fn get(&self, id: u64) -> Option<&PriceSuggestion> {
        self.suggestions.iter().find(|s| s.id == id)
    }

    pub fn has_pending(&self, ean: &str) -> bool {
        self.suggestions
            .iter()
            .any(|s| s.ean == ean && s.status == SuggestionStatus::Pending)
    }

    pub fn create(
        &mut self,
        product: &Product,
        trigger_id: u64,
        percentage_change: f64,
        reason: String,
        at: DateTime<Utc>,
    ) -> &PriceSuggestion {
        self.next_id += 1;
        let suggested_price = product.current_price * (1.0 + percentage_change / 100.0);
        let suggestion = PriceSuggestion {
            id: self.next_id,
            ean: product.ean.clone(),
            trigger_id,
            current_price: product.current_price,
            suggested_price,
            percentage_change,
            reason,
            status: SuggestionStatus::Pending,
            created_at: at,
            product_price_snapshot: product.current_price,
        };
        info!(
            id = suggestion.id,
            ean = %suggestion.ean,
            from = suggestion.current_price,
            to = suggestion.suggested_price,
            "new price suggestion"
        );
        self.suggestions.push(suggestion);
        self.suggestions.last().expect("just pushed")
    }

    /// Pending suggestions whose price snapshot still matches the live
    /// product price. Stale ones are hidden, never auto-rejected.
    pub fn pending_actionable(&self, catalog: &ProductCatalog) -> Vec<&PriceSuggestion> {
        self.suggestions
            .iter()
            .filter(|s| s.status == SuggestionStatus::Pending)
            .filter(|s| {
                catalog
                    .get(&s.ean)
                    .is_some_and(|p| !s.is_stale(p.current_price))
            })
            .collect()
    }

    /// Apply the suggested price and mark accepted. Idempotent: a retry on
    /// an already-accepted suggestion changes nothing. A stale pending
    /// suggestion is refused and left untouched.
    pub fn accept(&mut self, id: u64, catalog: &mut ProductCatalog) -> Result<()> {
        let suggestion = self
            .suggestions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| PricePulseError::Validation(format!("no suggestion with id {id}")))?;

        if suggestion.status != SuggestionStatus::Pending {
            debug!(id, status = ?suggestion.status, "accept retried on settled suggestion");
            return Ok(());
        }

        let live = catalog
            .get(&suggestion.ean)
            .map(|p| p.current_price)
            .ok_or_else(|| {
                PricePulseError::Database(format!("product {} missing for suggestion", suggestion.ean))
            })?;
        if suggestion.is_stale(live) {
            return Err(PricePulseError::Validation(format!(
                "suggestion {id} is stale: product price moved since creation"
            )));
        }

        // Price first, then status; both under the caller's lock.
        catalog.set_price(&suggestion.ean, suggestion.suggested_price)?;
        suggestion.status = SuggestionStatus::Accepted;
        info!(id, ean = %suggestion.ean, price = suggestion.suggested_price, "suggestion accepted");
        Ok(())
    }

    pub fn reject(&mut self, id: u64) -> Result<()> {
        let suggestion = self
            .suggestions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| PricePulseError::Validation(format!("no suggestion with id {id}")))?;
        if suggestion.status == SuggestionStatus::Pending {
            suggestion.status = SuggestionStatus::Rejected;
            info!(id, ean = %suggestion.ean, "suggestion rejected");
        }
        Ok(())
    }

    pub fn reject_all(&mut self, ids: &[u64]) -> Result<()> {
        for id in ids {
            self.reject(*id)?;
        }
        Ok(())
    }

    pub fn counts(&self) -> (usize, usize, usize) {
        let mut counts = (0, 0, 0);
        for s in &self.suggestions {
            match s.status {
                SuggestionStatus::Pending => counts.0 += 1,
                SuggestionStatus::Accepted => counts.1 += 1,
                SuggestionStatus::Rejected => counts.2 += 1,
            }
        }
        counts
    }
}
