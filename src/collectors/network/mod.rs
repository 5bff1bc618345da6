//! Network traffic collection
//!
//! - `interface`: name-based interface classification
//! - `counters`: cumulative counter reads and public interface selection
//! - `sampler`: counter deltas, sample buffer and averaged rates
//! - `collector`: the `Collector` adapter used by report cycles

pub mod collector;
pub mod counters;
pub mod interface;
pub mod sampler;

pub use collector::NetworkCollector;
pub use counters::{CounterSnapshot, CounterSource, SysinfoCounters};
pub use interface::{InterfaceClassifier, InterfaceKind};
pub use sampler::{SAMPLE_INTERVAL, TrafficSample, TrafficSampler, TrafficSummary};

#[cfg(test)]
pub mod tests;
