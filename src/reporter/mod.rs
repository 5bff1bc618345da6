//! Report delivery
//!
//! - `payload`: wire structs and merging of collector outputs
//! - `client`: the HTTPS submitter and response classification
//! - `retry`: backoff policy for failed submissions
//! - `scheduler`: report cycle, tick loop and sampling task

pub mod client;
pub mod payload;
pub mod retry;
pub mod scheduler;

pub use client::{ReportClient, ReportSubmitter, classify_response};
pub use payload::{ReportPayload, ServerDirective};
pub use retry::{RetryPolicy, RetryState};
pub use scheduler::{CycleOutcome, CycleState, ReportScheduler};
