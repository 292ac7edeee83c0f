//! Streaming, associative business aggregates plus a bounded top-N
//! anomaly tracker. Memory is bounded by the domain cardinality of
//! months/products/regions/categories, plus `anomaly_top_n`.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use crate::domain::CleanRecord;

#[derive(Debug, Clone, Default)]
struct MonthlyAgg {
    revenue: f64,
    quantity: i64,
    discount_sum: f64,
    count: u64,
}

#[derive(Debug, Clone, Default)]
struct ProductAgg {
    revenue: f64,
    quantity: i64,
}

#[derive(Debug, Clone, Default)]
struct CategoryAgg {
    discount_sum: f64,
    count: u64,
}

/// An anomaly-heap entry. Ordered by revenue only; on ties, ordering
/// among equal-revenue rows is unspecified (insertion order breaks the
/// tie in practice, which is acceptable per the source contract).
#[derive(Debug, Clone)]
struct AnomalyEntry(CleanRecord);

impl PartialEq for AnomalyEntry {
    fn eq(&self, other: &Self) -> bool {
        self.0.revenue == other.0.revenue
    }
}
impl Eq for AnomalyEntry {}

impl PartialOrd for AnomalyEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for AnomalyEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.revenue.total_cmp(&other.0.revenue)
    }
}

pub struct MonthlySalesSummaryRow {
    pub sale_month: String,
    pub total_revenue: f64,
    pub total_quantity: i64,
    pub avg_discount: f64,
}

pub struct TopProductRow {
    pub product_key: String,
    pub revenue: f64,
    pub quantity: i64,
}

pub struct RegionRevenueRow {
    pub region: String,
    pub total_revenue: f64,
}

pub struct CategoryDiscountRow {
    pub category: String,
    pub avg_discount: f64,
}

pub struct FinalizedTables {
    pub monthly_sales_summary: Vec<MonthlySalesSummaryRow>,
    pub top_products: Vec<TopProductRow>,
    pub region_wise_performance: Vec<RegionRevenueRow>,
    pub category_discount_map: Vec<CategoryDiscountRow>,
    pub anomaly_records: Vec<CleanRecord>,
}

/// Streaming accumulator engine. One instance lives for the entire
/// Phase 2 run; `finalize()` is called once at the end.
pub struct AggregationEngine {
    anomaly_top_n: usize,
    monthly: BTreeMap<String, MonthlyAgg>,
    products: BTreeMap<String, ProductAgg>,
    regions: BTreeMap<String, f64>,
    category_discount: BTreeMap<String, CategoryAgg>,
    anomalies: BinaryHeap<std::cmp::Reverse<AnomalyEntry>>,
}

impl AggregationEngine {
    pub fn new(anomaly_top_n: usize) -> Self {
        AggregationEngine {
            anomaly_top_n,
            monthly: BTreeMap::new(),
            products: BTreeMap::new(),
            regions: BTreeMap::new(),
            category_discount: BTreeMap::new(),
            anomalies: BinaryHeap::new(),
        }
    }

    /// Applies the five aggregate updates for one (already deduped)
    /// clean record.
    pub fn process(&mut self, row: &CleanRecord) {
        let month = self.monthly.entry(row.sale_month.clone()).or_default();
        month.revenue += row.revenue;
        month.quantity += row.quantity;
        month.discount_sum += row.discount_percent;
        month.count += 1;

        let product = self.products.entry(row.product_key.clone()).or_default();
        product.revenue += row.revenue;
        product.quantity += row.quantity;

        *self.regions.entry(row.region.to_string()).or_insert(0.0) += row.revenue;

        let category = self
            .category_discount
            .entry(row.category.to_string())
            .or_default();
        category.discount_sum += row.discount_percent;
        category.count += 1;

        self.track_anomaly(row.clone());
    }

    fn track_anomaly(&mut self, row: CleanRecord) {
        let entry = std::cmp::Reverse(AnomalyEntry(row));
        if self.anomalies.len() < self.anomaly_top_n {
            self.anomalies.push(entry);
        } else if let Some(std::cmp::Reverse(min)) = self.anomalies.peek() {
            if entry.0 .0.revenue > min.0.revenue {
                self.anomalies.push(entry);
                self.anomalies.pop();
            }
        }
    }

    pub fn finalize(self) -> FinalizedTables {
        let monthly_sales_summary = self
            .monthly
            .into_iter()
            .map(|(sale_month, agg)| MonthlySalesSummaryRow {
                sale_month,
                total_revenue: round2(agg.revenue),
                total_quantity: agg.quantity,
                avg_discount: round4(agg.discount_sum / agg.count as f64),
            })
            .collect();

        let mut top_products: Vec<TopProductRow> = self
            .products
            .into_iter()
            .map(|(product_key, agg)| TopProductRow {
                product_key,
                revenue: round2(agg.revenue),
                quantity: agg.quantity,
            })
            .collect();
        top_products.sort_by(|a, b| b.revenue.total_cmp(&a.revenue).then_with(|| a.product_key.cmp(&b.product_key)));
        top_products.truncate(10);

        let region_wise_performance = self
            .regions
            .into_iter()
            .map(|(region, total_revenue)| RegionRevenueRow { region, total_revenue })
            .collect();

        let category_discount_map = self
            .category_discount
            .into_iter()
            .map(|(category, agg)| CategoryDiscountRow {
                category,
                avg_discount: round4(agg.discount_sum / agg.count as f64),
            })
            .collect();

        let mut anomaly_records: Vec<CleanRecord> = self
            .anomalies
            .into_iter()
            .map(|std::cmp::Reverse(AnomalyEntry(row))| row)
            .collect();
        anomaly_records.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));

        FinalizedTables {
            monthly_sales_summary,
            top_products,
            region_wise_performance,
            category_discount_map,
            anomaly_records,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
