//! Deterministic event identity derivation.
//!
//! The warehouse deduplicates on a content hash of the five business fields
//! of a usage record. The merge statement computes it in the database via
//! `generate_event_uuid` (see [`crate::db::sql`]); this module carries the
//! equivalent pure Rust implementation for callers that need to predict an
//! identity without a round-trip.

/// Joins the five preimage components. Must match the SQL function.
pub const IDENTITY_FIELD_DELIMITER: &str = "_";

/// Derive the 32-character lowercase hex identity of a usage record from
/// the textual renderings of its business fields. An absent field hashes as
/// an empty string, never as an error.
pub fn event_identity(
    customer_id: Option<&str>,
    event_time: Option<&str>,
    event_type: Option<&str>,
    rate_plan_id: Option<&str>,
    charge: Option<&str>,
) -> String {
    let preimage = [customer_id, event_time, event_type, rate_plan_id, charge]
        .map(|field| field.unwrap_or(""))
        .join(IDENTITY_FIELD_DELIMITER);
    format!("{:x}", md5::compute(preimage.as_bytes()))
}
