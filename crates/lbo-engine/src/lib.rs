pub mod assumptions;
pub mod debt;
pub mod debt_schedule;
pub mod engine;
pub mod error;
pub mod opening_balance;
pub mod period;
pub mod projector;
pub mod reconcile;
pub mod returns;
pub mod sensitivity;
pub mod sources_uses;
pub mod time_value;
pub mod types;
pub mod validation;

pub use error::LboError;
pub use types::*;

/// Standard result type for every engine operation.
pub type LboResult<T> = Result<T, LboError>;
