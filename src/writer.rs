//! Output writers. Silver chunks are written once each, named by
//! position, and never rewritten. Gold tables are written atomically
//! by full overwrite, except `monthly_sales_summary` which is summed
//! by `sale_month` against whatever is already on disk. A run that
//! produces no rows for a full-overwrite table leaves that table's
//! file untouched rather than wiping it.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::aggregation::FinalizedTables;
use crate::domain::CleanRecord;
use crate::error::Result;

/// Writes one Silver chunk to `<output_dir>/silver/<stem>_chunk_<NNNN>.csv`.
/// A no-op when `rows` is empty: no zero-row files are ever created, so
/// `SilverFiles` never has to special-case them.
pub fn write_silver_chunk(
    output_dir: &Path,
    source_file: &str,
    chunk_index: u64,
    rows: &[CleanRecord],
) -> Result<Option<PathBuf>> {
    if rows.is_empty() {
        return Ok(None);
    }

    let silver_dir = output_dir.join("silver");
    fs::create_dir_all(&silver_dir)?;

    let stem = Path::new(source_file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("chunk");
    let path = silver_dir.join(format!("{stem}_chunk_{chunk_index:04}.csv"));

    atomic_write_csv(&path, &CleanRecord::FIELDS, rows, |w, row| {
        w.write_record([
            row.order_id.as_str(),
            row.product_name.as_str(),
            row.product_key.as_str(),
            &row.category.to_string(),
            &row.quantity.to_string(),
            &row.unit_price.to_string(),
            &row.discount_percent.to_string(),
            &row.region.to_string(),
            row.sale_date.as_str(),
            row.sale_month.as_str(),
            row.customer_email.as_deref().unwrap_or(""),
            &row.revenue.to_string(),
        ])
    })?;

    Ok(Some(path))
}

/// Writes the five Gold tables under `<output_dir>/gold/`.
/// `monthly_sales_summary.csv` is merged with any existing rows keyed
/// by `sale_month`; the other four are fully overwritten, but only when
/// this run actually produced rows for them — an empty table from a
/// run that covered no new data must never wipe out Gold analytics a
/// prior run already computed.
pub fn write_gold_tables(output_dir: &Path, tables: FinalizedTables) -> Result<()> {
    let gold_dir = output_dir.join("gold");
    fs::create_dir_all(&gold_dir)?;

    write_monthly_summary_merged(&gold_dir.join("monthly_sales_summary.csv"), tables.monthly_sales_summary)?;

    if !tables.top_products.is_empty() {
        atomic_write_csv(
            &gold_dir.join("top_products.csv"),
            &["product_key", "revenue", "quantity"],
            &tables.top_products,
            |w, row| w.write_record([row.product_key.as_str(), &row.revenue.to_string(), &row.quantity.to_string()]),
        )?;
    }

    if !tables.region_wise_performance.is_empty() {
        atomic_write_csv(
            &gold_dir.join("region_wise_performance.csv"),
            &["region", "total_revenue"],
            &tables.region_wise_performance,
            |w, row| w.write_record([row.region.as_str(), &row.total_revenue.to_string()]),
        )?;
    }

    if !tables.category_discount_map.is_empty() {
        atomic_write_csv(
            &gold_dir.join("category_discount_map.csv"),
            &["category", "avg_discount"],
            &tables.category_discount_map,
            |w, row| w.write_record([row.category.as_str(), &row.avg_discount.to_string()]),
        )?;
    }

    if !tables.anomaly_records.is_empty() {
        atomic_write_csv(
            &gold_dir.join("anomaly_records.csv"),
            &CleanRecord::FIELDS,
            &tables.anomaly_records,
            |w, row| {
                w.write_record([
                    row.order_id.as_str(),
                    row.product_name.as_str(),
                    row.product_key.as_str(),
                    &row.category.to_string(),
                    &row.quantity.to_string(),
                    &row.unit_price.to_string(),
                    &row.discount_percent.to_string(),
                    &row.region.to_string(),
                    row.sale_date.as_str(),
                    row.sale_month.as_str(),
                    row.customer_email.as_deref().unwrap_or(""),
                    &row.revenue.to_string(),
                ])
            },
        )?;
    }

    Ok(())
}

/// Sums `total_revenue`/`total_quantity`/`avg_discount` per `sale_month`
/// against whatever is already on disk, rather than replacing it —
/// repeated runs over disjoint data sources are additive in the monthly
/// aggregates, per the upsert contract.
fn write_monthly_summary_merged(
    path: &Path,
    rows: Vec<crate::aggregation::MonthlySalesSummaryRow>,
) -> Result<()> {
    let mut merged: BTreeMap<String, (f64, i64, f64)> = BTreeMap::new();

    if path.exists() {
        let mut reader = csv::Reader::from_reader(File::open(path)?);
        for record in reader.records() {
            let record = record?;
            if record.len() < 4 {
                continue;
            }
            let month = record[0].to_string();
            let revenue: f64 = record[1].parse().unwrap_or(0.0);
            let quantity: i64 = record[2].parse().unwrap_or(0);
            let discount: f64 = record[3].parse().unwrap_or(0.0);
            merged.insert(month, (revenue, quantity, discount));
        }
    }

    for row in rows {
        let entry = merged.entry(row.sale_month).or_insert((0.0, 0, 0.0));
        entry.0 += row.total_revenue;
        entry.1 += row.total_quantity;
        entry.2 += row.avg_discount;
    }

    let tmp_path = tmp_path(path);
    {
        let mut writer = csv::Writer::from_writer(File::create(&tmp_path)?);
        writer.write_record(["sale_month", "total_revenue", "total_quantity", "avg_discount"])?;
        for (month, (revenue, quantity, discount)) in &merged {
            writer.write_record([month.as_str(), &revenue.to_string(), &quantity.to_string(), &discount.to_string()])?;
        }
        writer.flush()?;
    }
    File::open(&tmp_path)?.sync_all()?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn atomic_write_csv<T>(
    path: &Path,
    header: &[&str],
    rows: &[T],
    mut write_row: impl FnMut(&mut csv::Writer<File>, &T) -> std::result::Result<(), csv::Error>,
) -> Result<()> {
    let tmp_path = tmp_path(path);
    {
        let mut writer = csv::Writer::from_writer(File::create(&tmp_path)?);
        writer.write_record(header)?;
        for row in rows {
            write_row(&mut writer, row)?;
        }
        writer.flush()?;
    }
    File::open(&tmp_path)?.sync_all()?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}
