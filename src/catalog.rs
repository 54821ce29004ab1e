use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::{PricePulseError, Result};
use crate::types::{Product, Sale};

/// Demo catalog: (ean, name, brand, category, price).
pub const DEMO_PRODUCTS: &[(&str, &str, &str, &str, f64)] = &[
    ("7891000100103", "Doritos Original 140g", "Elma Chips", "Snacks", 7.99),
    ("7894900011517", "Coca-Cola 2L", "Coca-Cola", "Beverages", 8.99),
    ("7891000053508", "Nescau 400g", "Nestle", "Breakfast", 11.49),
    ("7896005800249", "Arroz Tipo 1 5kg", "Camil", "Staples", 24.90),
    ("7896004000592", "Feijao Carioca 1kg", "Kicaldo", "Staples", 8.49),
    ("7891910000197", "Acucar Refinado 1kg", "Uniao", "Staples", 5.29),
    ("7896036090244", "Cafe Torrado 500g", "Pilao", "Breakfast", 18.90),
    ("7891149104403", "Cerveja Pilsen 350ml", "Brahma", "Beverages", 3.79),
    ("7896102513714", "Sabao em Po 1.6kg", "Omo", "Cleaning", 22.90),
    ("7891024134702", "Creme Dental 90g", "Colgate", "Personal Care", 4.99),
    ("7898080640611", "Leite Integral 1L", "Italac", "Dairy", 5.89),
    ("7891991010856", "Biscoito Recheado 140g", "Bono", "Snacks", 3.49),
];

/// Arena-style product table keyed by EAN. Price mutations only happen
/// here, under the engine's state lock.
#[derive(Debug, Default)]
pub struct ProductCatalog {
    products: BTreeMap<String, Product>,
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_demo(&mut self) {
        for (ean, name, brand, category, price) in DEMO_PRODUCTS {
            self.upsert(Product {
                ean: ean.to_string(),
                name: name.to_string(),
                brand: brand.to_string(),
                category: category.to_string(),
                current_price: *price,
            });
        }
    }

    pub fn upsert(&mut self, product: Product) {
        self.products.insert(product.ean.clone(), product);
    }

    pub fn get(&self, ean: &str) -> Option<&Product> {
        self.products.get(ean)
    }

    pub fn set_price(&mut self, ean: &str, price: f64) -> Result<()> {
        let product = self
            .products
            .get_mut(ean)
            .ok_or_else(|| PricePulseError::Validation(format!("unknown product {ean}")))?;
        product.current_price = price;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    pub fn eligible(&self) -> Vec<&Product> {
        self.products.values().filter(|p| p.is_eligible()).collect()
    }
}

/// Append-only log of sale events. Cleared only by simulation reset.
#[derive(Debug, Default)]
pub struct SalesLog {
    sales: Vec<Sale>,
}

impl SalesLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sale: Sale) {
        self.sales.push(sale);
    }

    pub fn len(&self) -> usize {
        self.sales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sales.is_empty()
    }

    /// Sales for one product since `cutoff`, newest first.
    pub fn recent_for(&self, ean: &str, cutoff: DateTime<Utc>) -> Vec<&Sale> {
        let mut out: Vec<&Sale> = self
            .sales
            .iter()
            .filter(|s| s.ean == ean && s.timestamp >= cutoff)
            .collect();
        out.sort_by_key(|s| std::cmp::Reverse(s.timestamp));
        out
    }

    pub fn last_n(&self, n: usize) -> Vec<&Sale> {
        self.sales.iter().rev().take(n).collect()
    }

    pub fn clear(&mut self) {
        self.sales.clear();
    }
}

/// Competitor price table fed by the (excluded) import layer:
/// (competitor name, ean) -> observed price.
#[derive(Debug, Default)]
pub struct CompetitorBook {
    prices: BTreeMap<(String, String), f64>,
}

impl CompetitorBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, competitor: &str, ean: &str, price: f64) {
        self.prices
            .insert((competitor.to_string(), ean.to_string()), price);
    }

    /// Cheapest price among the named competitors for one product.
    pub fn cheapest<'a>(&self, competitors: &'a [String], ean: &str) -> Option<(&'a str, f64)> {
        competitors
            .iter()
            .filter_map(|name| {
                self.prices
                    .get(&(name.clone(), ean.to_string()))
                    .map(|price| (name.as_str(), *price))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}
