//! Stored policy rule row.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use miniblog_core::types::PolicyRule;

/// One row of the `policy_rules` table.
///
/// Columns follow positional naming (`v0`..`v2`) so the table stays
/// agnostic of what each position means in the model.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PolicyRow {
    /// Surrogate key.
    pub id: i64,
    /// Policy type discriminator.
    pub ptype: String,
    /// Subject.
    pub v0: String,
    /// Object pattern.
    pub v1: String,
    /// Action pattern.
    pub v2: String,
}

impl From<PolicyRow> for PolicyRule {
    fn from(row: PolicyRow) -> Self {
        Self {
            ptype: row.ptype,
            subject: row.v0,
            object: row.v1,
            action: row.v2,
        }
    }
}
