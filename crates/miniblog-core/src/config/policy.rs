//! Authorization policy engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Policy engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Interval between full reloads from the durable store.
    #[serde(default = "default_reload_interval")]
    pub reload_interval_seconds: u64,
    /// Optional path to a model definition file. The built-in ACL model is
    /// used when unset.
    #[serde(default)]
    pub model_path: Option<String>,
}

impl PolicyConfig {
    /// A zero interval would spin the reload task.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.reload_interval_seconds == 0 {
            return Err(AppError::configuration(
                "policy.reload_interval_seconds must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            reload_interval_seconds: default_reload_interval(),
            model_path: None,
        }
    }
}

fn default_reload_interval() -> u64 {
    5
}
