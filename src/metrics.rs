//! In-memory run counters, logged as a summary at the end of the run.
//! Never persisted; a crash loses only the counters, never the data.

use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct Metrics {
    pub rows_read: u64,
    pub rows_cleaned: u64,
    pub rows_successful: u64,
    pub rows_rejected: u64,
    pub rows_deduplicated: u64,
    pub rejection_reasons: BTreeMap<&'static str, u64>,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics::default()
    }

    pub fn record_read(&mut self, count: u64) {
        self.rows_read += count;
    }

    pub fn record_clean_result(&mut self, is_valid: bool, errors: &[&'static str]) {
        self.rows_cleaned += 1;
        if is_valid {
            self.rows_successful += 1;
        } else {
            self.rows_rejected += 1;
        }
        for reason in errors {
            *self.rejection_reasons.entry(reason).or_insert(0) += 1;
        }
    }

    pub fn record_duplicate(&mut self) {
        self.rows_deduplicated += 1;
    }

    pub fn summary_line(&self) -> String {
        format!(
            "rows_read={} rows_successful={} rows_rejected={} rows_deduplicated={}",
            self.rows_read, self.rows_successful, self.rows_rejected, self.rows_deduplicated
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_successes_and_rejections_independently() {
        let mut metrics = Metrics::new();
        metrics.record_clean_result(true, &[]);
        metrics.record_clean_result(false, &["invalid_quantity"]);
        metrics.record_clean_result(false, &["invalid_quantity"]);

        assert_eq!(metrics.rows_successful, 1);
        assert_eq!(metrics.rows_rejected, 2);
        assert_eq!(metrics.rejection_reasons.get("invalid_quantity"), Some(&2));
    }

    #[test]
    fn soft_fail_rows_count_as_successful_but_still_tally_reasons() {
        let mut metrics = Metrics::new();
        metrics.record_clean_result(true, &["default_region", "default_category"]);
        assert_eq!(metrics.rows_successful, 1);
        assert_eq!(metrics.rows_rejected, 0);
        assert_eq!(metrics.rejection_reasons.len(), 2);
    }
}
