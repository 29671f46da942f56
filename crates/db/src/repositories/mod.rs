//! Repository layer for the deposit store.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod deposit_repo;
pub mod log_event_repo;

pub use deposit_repo::DepositRepo;
pub use log_event_repo::LogEventRepo;
