// Write-once price snapshots for order lines
//
// A line's unit price and applied rules are captured from one engine result
// when the line is inserted. After that the application never writes them:
// update bodies naming them are refused here, and the `order_items` trigger
// refuses any UPDATE that changes them with SQLSTATE `SNP01`.

use rust_decimal::Decimal;
use serde_json::Value;

use crate::orders::error::OrderError;
use crate::pricing::result::{AppliedRule, PriceResult};

/// Columns frozen at insert time
pub const SNAPSHOT_FIELDS: [&str; 2] = ["unit_price_snapshot", "price_rules_snapshot"];

/// SQLSTATE raised by the `order_items` snapshot trigger
pub const SNAPSHOT_SQLSTATE: &str = "SNP01";

/// Frozen output of one price calculation
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSnapshot {
    pub unit_price: Decimal,
    pub applied_rules: Vec<AppliedRule>,
}

impl From<PriceResult> for PriceSnapshot {
    fn from(result: PriceResult) -> Self {
        Self {
            unit_price: result.final_price,
            applied_rules: result.applied_rules,
        }
    }
}

/// Refuse an update body that names a snapshot column
pub fn reject_snapshot_fields(body: &Value) -> Result<(), OrderError> {
    let Some(fields) = body.as_object() else {
        return Ok(());
    };

    match SNAPSHOT_FIELDS.iter().find(|field| fields.contains_key(**field)) {
        Some(field) => {
            tracing::warn!("Rejected update of frozen order line field '{}'", field);
            Err(OrderError::SnapshotImmutable(field.to_string()))
        }
        None => Ok(()),
    }
}

/// Field reported when a trigger message names no snapshot column
pub const SNAPSHOT_FALLBACK_FIELD: &str = "price snapshot";

/// Snapshot column named in a trigger message
pub fn violated_snapshot_field(message: &str) -> &'static str {
    SNAPSHOT_FIELDS
        .iter()
        .copied()
        .find(|field| message.starts_with(field))
        .unwrap_or(SNAPSHOT_FALLBACK_FIELD)
}

/// Whether a database error came from the snapshot trigger
pub fn is_snapshot_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .map_or(false, |code| code == SNAPSHOT_SQLSTATE)
}
