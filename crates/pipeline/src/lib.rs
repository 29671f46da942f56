//! The deposit pipeline: per-document state machine and batch runner.
//!
//! [`DepositPipeline`] moves one catalog document through
//! replace → prefix gate → fetch → rewrite/validate → hand-off, persisting
//! each step through a [`DepositStore`]. [`BatchRunner`] feeds it documents
//! listed by the catalog, one at a time.

pub mod clock;
pub mod error;
pub mod pipeline;
pub mod runner;
pub mod sink;
pub mod store;

pub use clock::MonotonicClock;
pub use error::PipelineError;
pub use pipeline::{DepositOutcome, DepositPipeline};
pub use runner::{BatchRequest, BatchRunner, BatchSummary};
pub use sink::{DeferredSubmission, RegistrationRequest, SinkError, SubmissionSink};
pub use store::{DepositStore, MemoryStore, PgDepositStore, StoreError};
