use std::collections::HashMap;

use tracing::info;

use crate::error::{PricePulseError, Result};
use crate::types::{HourlyBaseline, DAYS_PER_MONTH, DAYS_PER_WEEK, MONTHS_PER_YEAR};

/// Fixed column layout of a baseline import row:
/// ean, hourPeriod, totalMedian, totalMean, 12 monthly medians, 12 monthly
/// means, 31 daily medians, 31 daily means, 7 dow medians, 7 dow means.
pub const IMPORT_COLUMNS: usize =
    4 + 2 * MONTHS_PER_YEAR + 2 * DAYS_PER_MONTH + 2 * DAYS_PER_WEEK;

/// Read-only lookup of precomputed per-product, per-hour-period baselines.
/// Records are immutable once imported and replaced wholesale on reimport.
#[derive(Debug, Default)]
pub struct BaselineStore {
    records: HashMap<(String, u8), HourlyBaseline>,
}

impl BaselineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, ean: &str, hour_period: u8) -> Option<&HourlyBaseline> {
        self.records.get(&(ean.to_string(), hour_period))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn insert(&mut self, baseline: HourlyBaseline) -> Result<()> {
        baseline.validate()?;
        self.records
            .insert((baseline.ean.clone(), baseline.hour_period), baseline);
        Ok(())
    }

    /// Parse and import a full baseline CSV (header row + data rows).
    /// Any malformed row rejects the whole import and the previous records
    /// stay in place; on success the store is replaced wholesale.
    pub fn import_csv(&mut self, csv: &str) -> Result<usize> {
        let cleaned = csv.replace('\r', "");
        let mut lines = cleaned.lines();
        let _header = lines
            .next()
            .ok_or_else(|| PricePulseError::DataImport("CSV file is empty".into()))?;

        let mut parsed = Vec::new();
        for (line_no, line) in lines.enumerate() {
            if line.is_empty() {
                continue;
            }
            let baseline = parse_row(line).map_err(|e| {
                PricePulseError::DataImport(format!("row {}: {}", line_no + 2, e))
            })?;
            baseline.validate()?;
            parsed.push(baseline);
        }

        if parsed.is_empty() {
            return Err(PricePulseError::DataImport(
                "CSV file has no data rows".into(),
            ));
        }

        self.records.clear();
        let count = parsed.len();
        for baseline in parsed {
            self.records
                .insert((baseline.ean.clone(), baseline.hour_period), baseline);
        }
        info!(count, "imported baselines");
        Ok(count)
    }
}

fn parse_row(line: &str) -> std::result::Result<HourlyBaseline, String> {
    let columns: Vec<&str> = line.split(',').collect();
    if columns.len() != IMPORT_COLUMNS {
        return Err(format!(
            "expected {} columns, got {}",
            IMPORT_COLUMNS,
            columns.len()
        ));
    }

    let ean = columns[0].trim();
    if ean.is_empty() {
        return Err("missing EAN".into());
    }
    let hour_period: u8 = columns[1]
        .trim()
        .parse()
        .map_err(|_| format!("bad hour period {:?}", columns[1]))?;
    let total_median_quantity = parse_f64(columns[2])?;
    let total_mean_quantity = parse_f64(columns[3])?;

    let mut cursor = 4;
    let mut take = |count: usize| -> std::result::Result<Vec<f64>, String> {
        let slice = &columns[cursor..cursor + count];
        cursor += count;
        slice.iter().map(|v| parse_f64(v)).collect()
    };

    Ok(HourlyBaseline {
        ean: ean.to_string(),
        hour_period,
        total_median_quantity,
        total_mean_quantity,
        monthly_medians: take(MONTHS_PER_YEAR)?,
        monthly_means: take(MONTHS_PER_YEAR)?,
        daily_medians: take(DAYS_PER_MONTH)?,
        daily_means: take(DAYS_PER_MONTH)?,
        dow_medians: take(DAYS_PER_WEEK)?,
        dow_means: take(DAYS_PER_WEEK)?,
    })
}

fn parse_f64(value: &str) -> std::result::Result<f64, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("bad numeric value {:?}", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_row(ean: &str, hour: u8) -> String {
        let mut cols = vec![ean.to_string(), hour.to_string(), "2.0".into(), "2.5".into()];
        cols.extend(std::iter::repeat("1.5".to_string()).take(IMPORT_COLUMNS - 4));
        cols.join(",")
    }

    #[test]
    fn import_replaces_wholesale() {
        let mut store = BaselineStore::new();
        let csv = format!("header\n{}\n{}\n", demo_row("111", 9), demo_row("222", 9));
        assert_eq!(store.import_csv(&csv).unwrap(), 2);

        let csv2 = format!("header\n{}\n", demo_row("333", 10));
        assert_eq!(store.import_csv(&csv2).unwrap(), 1);
        assert!(store.get("111", 9).is_none());
        assert!(store.get("333", 10).is_some());
    }

    #[test]
    fn short_row_rejected_without_partial_import() {
        let mut store = BaselineStore::new();
        store
            .import_csv(&format!("header\n{}\n", demo_row("111", 9)))
            .unwrap();

        // 101 columns: drop one value from a valid row
        let good = demo_row("222", 9);
        let short = good.rsplit_once(',').unwrap().0.to_string();
        let bad_csv = format!("header\n{}\n{}\n", demo_row("333", 9), short);

        let err = store.import_csv(&bad_csv).unwrap_err();
        assert!(matches!(err, PricePulseError::DataImport(_)));
        // previous records untouched, nothing from the failed import
        assert!(store.get("111", 9).is_some());
        assert!(store.get("333", 9).is_none());
    }

    #[test]
    fn non_numeric_field_rejected() {
        let mut store = BaselineStore::new();
        let row = demo_row("111", 9).replacen("1.5", "oops", 1);
        assert!(store.import_csv(&format!("header\n{}\n", row)).is_err());
    }
}
