//! Core data types shared across the pipeline: the raw Bronze row view,
//! the canonical Silver [`CleanRecord`], and the durable [`Checkpoint`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// A single Bronze row: the header-indexed string fields as read off
/// disk, before any cleaning. Fields beyond the recognized set are
/// tolerated and simply never looked up.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    fields: HashMap<String, String>,
}

impl RawRecord {
    pub fn new(fields: HashMap<String, String>) -> Self {
        RawRecord { fields }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

/// Closed category set. `Unknown` is the soft-fail default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Electronics,
    HomeAppliance,
    Fashion,
    Unknown,
}

/// Closed region set. `North` is the soft-fail default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Region {
    North,
    South,
    East,
    West,
}

/// A cleaned, typed Silver record. Crossing into Phase 2 always goes
/// through this type — the dynamic `RawRecord` map never does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanRecord {
    pub order_id: String,
    pub product_name: String,
    pub product_key: String,
    pub category: Category,
    pub quantity: i64,
    pub unit_price: f64,
    pub discount_percent: f64,
    pub region: Region,
    pub sale_date: String,
    pub sale_month: String,
    pub customer_email: Option<String>,
    pub revenue: f64,
}

impl CleanRecord {
    /// Column order used for both Silver CSV headers and round-tripping
    /// a Silver file back into typed records in Phase 2.
    pub const FIELDS: [&'static str; 12] = [
        "order_id",
        "product_name",
        "product_key",
        "category",
        "quantity",
        "unit_price",
        "discount_percent",
        "region",
        "sale_date",
        "sale_month",
        "customer_email",
        "revenue",
    ];
}

/// Outcome of cleaning one raw record: either a rejection with reasons,
/// or a clean record plus soft-error annotations.
#[derive(Debug, Clone)]
pub struct CleanResult {
    pub clean_row: Option<CleanRecord>,
    pub is_valid: bool,
    pub errors: Vec<&'static str>,
}

/// Durable progress marker. `(None, 0)` is the initial state: all
/// chunks strictly before `(file, chunk_index)` are durably in Silver.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Checkpoint {
    pub file: Option<String>,
    pub chunk_index: u64,
    /// Observability only; not part of the resume decision.
    pub rows_processed: u64,
}

impl Checkpoint {
    pub fn new(file: String, chunk_index: u64) -> Self {
        Checkpoint {
            file: Some(file),
            chunk_index,
            rows_processed: 0,
        }
    }
}

/// A bounded window of raw rows read from one Bronze file.
#[derive(Debug, Clone)]
pub struct ChunkEnvelope {
    pub file: String,
    pub chunk_index: u64,
    pub rows: Vec<RawRecord>,
}

/// One fully-loaded Silver file, handed to Phase 2 as a unit.
#[derive(Debug, Clone)]
pub struct SilverFile {
    pub file: String,
    pub rows: Vec<CleanRecord>,
}
