//! Authorization decision seam used by the HTTP layer.

use super::engine::PolicyEngine;

/// Decides whether `subject` may perform `action` on `object`.
pub trait Authorizer: Send + Sync {
    /// `true` allows the request; anything that cannot be decided denies.
    fn authorize(&self, subject: &str, object: &str, action: &str) -> bool;
}

impl Authorizer for PolicyEngine {
    fn authorize(&self, subject: &str, object: &str, action: &str) -> bool {
        self.evaluate(subject, object, action)
    }
}
