pub mod idempotency;
pub mod request_id;

pub use idempotency::{IdempotencyKey, IDEMPOTENCY_KEY_HEADER};
pub use request_id::request_id_middleware;
