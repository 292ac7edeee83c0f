//! Stateless, deterministic row cleaning: one raw record in, one
//! [`CleanResult`] out. Hard-fail fields reject the row; soft-fail
//! fields fall back to a default and annotate `errors`.

use chrono::NaiveDate;

use crate::domain::{Category, CleanRecord, CleanResult, Region, RawRecord};

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%m-%d-%Y", "%Y/%m/%d"];
const DEFAULT_DATE: &str = "1970-01-01";
const DEFAULT_MONTH: &str = "1970-01";

const REGION_MAP: [(&str, Region); 4] = [
    ("north", Region::North),
    ("nort", Region::North),
    ("south", Region::South),
    ("east", Region::East),
];
const REGION_WEST: (&str, Region) = ("west", Region::West);

const CATEGORY_MAP: [(&str, Category); 7] = [
    ("electronics", Category::Electronics),
    ("electronic", Category::Electronics),
    ("home appliance", Category::HomeAppliance),
    ("homeappliance", Category::HomeAppliance),
    ("home-appl", Category::HomeAppliance),
    ("fashion", Category::Fashion),
    ("cloths", Category::Fashion),
];

/// Cleans and canonicalizes one raw record. Pure: same input always
/// produces the same output, no I/O, no shared state.
pub fn clean_row(row: &RawRecord) -> CleanResult {
    let mut errors: Vec<&'static str> = Vec::new();

    // order_id (HARD)
    let order_id = match row.get("order_id").map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => return reject("missing_order_id"),
    };

    // quantity (HARD)
    let quantity = match row.get("quantity").and_then(|v| v.trim().parse::<i64>().ok()) {
        Some(q) if q > 0 => q,
        _ => return reject("invalid_quantity"),
    };

    // unit_price (HARD)
    let unit_price = match row.get("unit_price").and_then(|v| v.trim().parse::<f64>().ok()) {
        Some(p) if p > 0.0 && p.is_finite() => round2(p),
        _ => return reject("invalid_unit_price"),
    };

    // product_name (SOFT)
    let raw_product = row.get("product_name").unwrap_or("").trim().to_lowercase();
    let product_name = if raw_product.is_empty() {
        errors.push("default_product_name");
        "unknown_product".to_string()
    } else {
        raw_product
    };
    let product_key = derive_product_key(&product_name);

    // category (SOFT)
    let raw_category = row.get("category").unwrap_or("").trim().to_lowercase();
    let category = lookup_category(&raw_category).unwrap_or_else(|| {
        errors.push("default_category");
        Category::Unknown
    });

    // discount_percent (SOFT)
    let discount_percent = match row.get("discount_percent").and_then(|v| v.trim().parse::<f64>().ok()) {
        Some(d) => d.clamp(0.0, 1.0),
        None => {
            errors.push("default_discount");
            0.0
        }
    };

    // region (SOFT)
    let raw_region = row.get("region").unwrap_or("").trim().to_lowercase();
    let region = lookup_region(&raw_region).unwrap_or_else(|| {
        errors.push("default_region");
        Region::North
    });

    // sale_date (SOFT)
    let (sale_date, sale_month) = match row.get("sale_date").filter(|s| !s.is_empty()) {
        Some(raw) => match parse_date(raw) {
            Some((d, m)) => (d, m),
            None => {
                errors.push("default_sale_date");
                (DEFAULT_DATE.to_string(), DEFAULT_MONTH.to_string())
            }
        },
        None => {
            errors.push("default_sale_date");
            (DEFAULT_DATE.to_string(), DEFAULT_MONTH.to_string())
        }
    };

    // customer_email (OPTIONAL)
    let customer_email = match row.get("customer_email").filter(|s| !s.is_empty()) {
        Some(email) if email.contains('@') => Some(email.to_string()),
        Some(_) => {
            errors.push("invalid_email");
            None
        }
        None => None,
    };

    // revenue (computed last, only after hard-fail fields validated)
    let revenue = round2(quantity as f64 * unit_price * (1.0 - discount_percent));

    CleanResult {
        is_valid: true,
        clean_row: Some(CleanRecord {
            order_id,
            product_name,
            product_key,
            category,
            quantity,
            unit_price,
            discount_percent,
            region,
            sale_date,
            sale_month,
            customer_email,
            revenue,
        }),
        errors,
    }
}

fn reject(reason: &'static str) -> CleanResult {
    CleanResult {
        clean_row: None,
        is_valid: false,
        errors: vec![reason],
    }
}

fn derive_product_key(product_name: &str) -> String {
    let mut key = String::with_capacity(product_name.len());
    let mut last_was_sep = false;
    for c in product_name.chars() {
        if c.is_ascii_alphanumeric() {
            key.push(c.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            key.push('_');
            last_was_sep = true;
        }
    }
    key.trim_matches('_').to_string()
}

fn lookup_category(raw: &str) -> Option<Category> {
    CATEGORY_MAP.iter().find(|(k, _)| *k == raw).map(|(_, v)| *v)
}

fn lookup_region(raw: &str) -> Option<Region> {
    if raw == REGION_WEST.0 {
        return Some(REGION_WEST.1);
    }
    REGION_MAP.iter().find(|(k, _)| *k == raw).map(|(_, v)| *v)
}

fn parse_date(raw: &str) -> Option<(String, String)> {
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            let full = date.format("%Y-%m-%d").to_string();
            let month = date.format("%Y-%m").to_string();
            return Some((full, month));
        }
    }
    None
}

/// Half-away-from-zero rounding to 2 decimals (not ties-to-even).
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn raw(pairs: &[(&str, &str)]) -> RawRecord {
        let mut fields = HashMap::new();
        for (k, v) in pairs {
            fields.insert(k.to_string(), v.to_string());
        }
        RawRecord::new(fields)
    }

    // S1
    #[test]
    fn happy_path_matches_expected_revenue_and_keys() {
        let row = raw(&[
            ("order_id", "ORD-1"),
            ("product_name", "iPhone 14"),
            ("category", "electronics"),
            ("quantity", "2"),
            ("unit_price", "100"),
            ("discount_percent", "0.1"),
            ("region", "north"),
            ("sale_date", "2024-01-01"),
            ("customer_email", "a@b.com"),
        ]);

        let result = clean_row(&row);
        assert!(result.is_valid);
        let clean = result.clean_row.unwrap();
        assert_eq!(clean.revenue, 180.0);
        assert_eq!(clean.product_key, "iphone_14");
        assert_eq!(clean.sale_month, "2024-01");
        assert!(result.errors.is_empty());
    }

    // S2
    #[test]
    fn non_numeric_quantity_is_rejected() {
        let row = raw(&[
            ("order_id", "ORD-2"),
            ("quantity", "zero"),
            ("unit_price", "10"),
        ]);
        let result = clean_row(&row);
        assert!(!result.is_valid);
        assert_eq!(result.errors, vec!["invalid_quantity"]);
    }

    #[test]
    fn missing_order_id_is_rejected() {
        let row = raw(&[("quantity", "1"), ("unit_price", "10")]);
        let result = clean_row(&row);
        assert!(!result.is_valid);
        assert_eq!(result.errors, vec!["missing_order_id"]);
    }

    #[test]
    fn zero_or_negative_quantity_is_rejected() {
        for q in ["0", "-5"] {
            let row = raw(&[("order_id", "X"), ("quantity", q), ("unit_price", "10")]);
            assert!(!clean_row(&row).is_valid);
        }
    }

    #[test]
    fn non_positive_unit_price_is_rejected() {
        let row = raw(&[("order_id", "X"), ("quantity", "1"), ("unit_price", "0")]);
        let result = clean_row(&row);
        assert!(!result.is_valid);
        assert_eq!(result.errors, vec!["invalid_unit_price"]);
    }

    #[test]
    fn soft_fail_defaults_annotate_and_keep_row() {
        let row = raw(&[
            ("order_id", "X"),
            ("quantity", "1"),
            ("unit_price", "10"),
            ("category", "bogus"),
            ("region", "nowhere"),
            ("discount_percent", "nope"),
            ("customer_email", "not-an-email"),
        ]);
        let result = clean_row(&row);
        assert!(result.is_valid);
        let clean = result.clean_row.unwrap();
        assert_eq!(clean.category, Category::Unknown);
        assert_eq!(clean.region, Region::North);
        assert_eq!(clean.discount_percent, 0.0);
        assert_eq!(clean.customer_email, None);
        assert_eq!(clean.product_name, "unknown_product");
        for reason in [
            "default_category",
            "default_region",
            "default_discount",
            "invalid_email",
            "default_product_name",
            "default_sale_date",
        ] {
            assert!(result.errors.contains(&reason), "missing {reason}");
        }
    }

    #[test]
    fn discount_percent_is_clamped() {
        let row = raw(&[
            ("order_id", "X"),
            ("quantity", "1"),
            ("unit_price", "10"),
            ("discount_percent", "5.0"),
        ]);
        assert_eq!(clean_row(&row).clean_row.unwrap().discount_percent, 1.0);

        let row = raw(&[
            ("order_id", "X"),
            ("quantity", "1"),
            ("unit_price", "10"),
            ("discount_percent", "-5.0"),
        ]);
        assert_eq!(clean_row(&row).clean_row.unwrap().discount_percent, 0.0);
    }

    #[test]
    fn alternate_date_formats_parse() {
        for (raw_date, expected) in [
            ("15/03/2024", "2024-03-15"),
            ("03-15-2024", "2024-03-15"),
            ("2024/03/15", "2024-03-15"),
        ] {
            let row = raw(&[
                ("order_id", "X"),
                ("quantity", "1"),
                ("unit_price", "10"),
                ("sale_date", raw_date),
            ]);
            let clean = clean_row(&row).clean_row.unwrap();
            assert_eq!(clean.sale_date, expected, "input {raw_date}");
        }
    }

    #[test]
    fn unparseable_date_falls_back_to_epoch() {
        let row = raw(&[
            ("order_id", "X"),
            ("quantity", "1"),
            ("unit_price", "10"),
            ("sale_date", "not-a-date"),
        ]);
        let clean = clean_row(&row).clean_row.unwrap();
        assert_eq!(clean.sale_date, "1970-01-01");
        assert_eq!(clean.sale_month, "1970-01");
    }

    #[test]
    fn product_key_strips_and_collapses_non_alphanumerics() {
        let row = raw(&[
            ("order_id", "X"),
            ("quantity", "1"),
            ("unit_price", "10"),
            ("product_name", "  Men's T-Shirt!! "),
        ]);
        let clean = clean_row(&row).clean_row.unwrap();
        assert_eq!(clean.product_key, "men_s_t_shirt");
    }

    #[test]
    fn revenue_never_negative_for_valid_rows() {
        let row = raw(&[
            ("order_id", "X"),
            ("quantity", "3"),
            ("unit_price", "9.999"),
            ("discount_percent", "1.0"),
        ]);
        let clean = clean_row(&row).clean_row.unwrap();
        assert!(clean.revenue >= 0.0);
    }
}
