//! Authorization rule value type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Policy type discriminator for plain allow rules.
pub const DEFAULT_PTYPE: &str = "p";

/// A single authorization rule: `subject` may perform actions matching
/// `action` on objects matching `object`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Policy type discriminator (always `p` for allow rules).
    pub ptype: String,
    /// Identity the rule applies to.
    pub subject: String,
    /// Object (resource path) pattern.
    pub object: String,
    /// Action (HTTP method) regular expression.
    pub action: String,
}

impl PolicyRule {
    /// Creates an allow rule.
    pub fn new(
        subject: impl Into<String>,
        object: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            ptype: DEFAULT_PTYPE.to_string(),
            subject: subject.into(),
            object: object.into(),
            action: action.into(),
        }
    }

    /// Returns the rule's fields in policy-definition order.
    pub fn values(&self) -> [&str; 3] {
        [&self.subject, &self.object, &self.action]
    }
}

impl fmt::Display for PolicyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}",
            self.ptype, self.subject, self.object, self.action
        )
    }
}
