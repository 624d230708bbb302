pub mod bearer;
pub mod service;

pub use bearer::{extract_bearer, BEARER_PREFIX};
pub use service::{AuthService, RegisterOutcome, Session, MAX_IDEMPOTENCY_KEY_LEN, REGISTER_TOKEN_ERROR};
