use serde::{Deserialize, Serialize};

/// An external platform account whose posts are ingested.
///
/// Rows are owned by account management; the ingestion pipeline only reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedAccount {
    /// Internal identifier assigned by the account registry.
    pub id: i64,
    /// Platform-assigned account identifier, unique among tracked accounts.
    pub external_id: String,
    pub display_name: String,
    /// Platform handle without the leading `@`.
    pub handle: String,
}
