//! Row structs and DTOs for the `deposits` and `log_events` tables.

pub mod deposit;
pub mod log_event;
pub mod status;
