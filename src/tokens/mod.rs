pub mod claims;
pub mod clock;
pub mod manager;

pub use claims::Claims;
pub use clock::{Clock, ManualClock, SystemClock};
pub use manager::{revocation_key, TokenError, TokenManager, REVOCATION_NAMESPACE};
