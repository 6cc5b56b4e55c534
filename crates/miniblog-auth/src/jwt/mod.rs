//! Signed, time-bounded identity tokens.

pub mod carrier;
pub mod claims;
pub mod clock;
pub mod service;
pub mod signing;

pub use carrier::{CredentialCarrier, bearer_token};
pub use claims::Claims;
pub use clock::{Clock, ManualClock, SystemClock};
pub use service::TokenService;
pub use signing::SigningConfig;
