//! Delta-based traffic sampler
//!
//! Converts successive cumulative counter reads for the tracked public
//! interface into bounded-duration samples and buffers them until a report
//! has been confirmed by the server.
//!
//! Rules:
//! - the first read for an interface only seeds state and produces no sample
//! - a change of tracked interface reseeds (one dropped sample)
//! - a decreasing counter floors that direction's delta to zero
//! - a sample where both directions are zero is not buffered
//! - the buffer is cleared only after a confirmed report, oldest samples
//!   first, never past what that report carried

use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info, warn};
use serde::{Serialize, Serializer};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::collectors::network::counters::CounterSnapshot;

/// Fixed cadence of the sampling tick
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Traffic observed on the public interface between two counter reads
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficSample {
    #[serde(serialize_with = "serialize_rfc3339")]
    pub timestamp: DateTime<Utc>,
    pub in_bytes: u64,
    pub out_bytes: u64,
    pub total_bytes: u64,
    pub time_delta_seconds: f64,
}

/// Buffered samples plus their time-weighted average rate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficSummary {
    /// Interface tracked when the summary was taken. Samples buffered before
    /// a change of public interface are reported under the new name.
    pub interface: String,
    pub samples: Vec<TrafficSample>,
    /// Average inbound rate in bytes per second over all samples
    #[serde(rename = "total_in_bytes")]
    pub avg_in_bytes_per_sec: u64,
    /// Average outbound rate in bytes per second over all samples
    #[serde(rename = "total_out_bytes")]
    pub avg_out_bytes_per_sec: u64,
    pub sample_count: usize,
}

fn serialize_rfc3339<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[derive(Debug, Default)]
struct SamplerState {
    /// Last counters seen for the tracked interface
    last: Option<CounterSnapshot>,
    last_sample_time: Option<DateTime<Utc>>,
    samples: Vec<TrafficSample>,
}

/// Owns the counter-delta state and the sample buffer.
///
/// All methods take `&self`; the internal lock only guards in-memory state
/// and is never held across I/O.
#[derive(Debug)]
pub struct TrafficSampler {
    sample_interval: Duration,
    state: Mutex<SamplerState>,
}

impl Default for TrafficSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl TrafficSampler {
    pub fn new() -> Self {
        Self::with_interval(SAMPLE_INTERVAL)
    }

    pub fn with_interval(sample_interval: Duration) -> Self {
        Self {
            sample_interval,
            state: Mutex::new(SamplerState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SamplerState> {
        // state stays consistent even if a holder panicked mid-log
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records counters read now; see [`TrafficSampler::sample_at`].
    pub fn sample(&self, interface: &str, in_bytes: u64, out_bytes: u64) -> Option<TrafficSample> {
        self.sample_at(interface, in_bytes, out_bytes, Utc::now())
    }

    /// Feeds one counter read into the sampler.
    ///
    /// Returns the sample appended to the buffer, if any.
    pub fn sample_at(
        &self,
        interface: &str,
        in_bytes: u64,
        out_bytes: u64,
        now: DateTime<Utc>,
    ) -> Option<TrafficSample> {
        let mut state = self.lock();
        state.last_sample_time = Some(now);

        let current = CounterSnapshot {
            interface_name: interface.to_string(),
            in_bytes,
            out_bytes,
            timestamp: now,
        };
        let previous = state.last.replace(current);

        let Some(prev) = previous else {
            info!(
                "Network sample {}: initializing (total in={}, out={})",
                interface, in_bytes, out_bytes
            );
            return None;
        };

        if prev.interface_name != interface {
            info!(
                "Public interface changed {} -> {}: reseeding counters (in={}, out={})",
                prev.interface_name, interface, in_bytes, out_bytes
            );
            return None;
        }

        let mut time_delta = (now - prev.timestamp).num_milliseconds() as f64 / 1000.0;
        if time_delta < 0.0 {
            warn!(
                "Network sample {}: clock moved backwards by {:.3}s, recording zero duration",
                interface, -time_delta
            );
            time_delta = 0.0;
        }

        if in_bytes < prev.in_bytes || out_bytes < prev.out_bytes {
            debug!(
                "Network sample {}: counter reset detected (in: {} -> {}, out: {} -> {})",
                interface, prev.in_bytes, in_bytes, prev.out_bytes, out_bytes
            );
        }

        let delta_in = in_bytes.saturating_sub(prev.in_bytes);
        let delta_out = out_bytes.saturating_sub(prev.out_bytes);

        if delta_in == 0 && delta_out == 0 {
            debug!("Network sample {}: no traffic in {:.1}s, skipping", interface, time_delta);
            return None;
        }

        let sample = TrafficSample {
            timestamp: now,
            in_bytes: delta_in,
            out_bytes: delta_out,
            total_bytes: delta_in.saturating_add(delta_out),
            time_delta_seconds: time_delta,
        };
        state.samples.push(sample.clone());

        info!(
            "Network sample {}: delta_in={}, delta_out={}, time={:.1}s (buffered={})",
            interface,
            delta_in,
            delta_out,
            time_delta,
            state.samples.len()
        );
        Some(sample)
    }

    /// True if no sample was taken yet or the sampling interval has elapsed.
    pub fn should_sample(&self, now: DateTime<Utc>) -> bool {
        let state = self.lock();
        match state.last_sample_time {
            None => true,
            Some(last) => (now - last)
                .to_std()
                .map(|elapsed| elapsed >= self.sample_interval)
                // negative elapsed time means the clock jumped back
                .unwrap_or(false),
        }
    }

    /// Snapshot of the buffer with averaged rates; `None` if nothing is buffered.
    ///
    /// Does not clear the buffer.
    pub fn drain(&self) -> Option<TrafficSummary> {
        let state = self.lock();
        if state.samples.is_empty() {
            return None;
        }

        let total_in: u64 = state.samples.iter().map(|s| s.in_bytes).sum();
        let total_out: u64 = state.samples.iter().map(|s| s.out_bytes).sum();
        let total_time: f64 = state.samples.iter().map(|s| s.time_delta_seconds).sum();

        let (avg_in, avg_out) = if total_time > 0.0 {
            (
                (total_in as f64 / total_time) as u64,
                (total_out as f64 / total_time) as u64,
            )
        } else {
            (0, 0)
        };

        let interface = state
            .last
            .as_ref()
            .map(|s| s.interface_name.clone())
            .unwrap_or_default();

        info!(
            "Network traffic: avg in rate={} bytes/sec, avg out rate={} bytes/sec (period={:.1}s, samples={})",
            avg_in,
            avg_out,
            total_time,
            state.samples.len()
        );

        Some(TrafficSummary {
            interface,
            samples: state.samples.clone(),
            avg_in_bytes_per_sec: avg_in,
            avg_out_bytes_per_sec: avg_out,
            sample_count: state.samples.len(),
        })
    }

    /// Empties the buffer.
    pub fn clear(&self) -> usize {
        let mut state = self.lock();
        let cleared = state.samples.len();
        state.samples.clear();
        cleared
    }

    /// Drops the `reported` oldest samples after the server confirmed them.
    ///
    /// Samples appended since the matching [`TrafficSampler::drain`] stay
    /// buffered for the next report. Returns the number removed.
    pub fn clear_reported(&self, reported: usize) -> usize {
        let mut state = self.lock();
        let cleared = reported.min(state.samples.len());
        state.samples.drain(..cleared);
        if !state.samples.is_empty() {
            debug!(
                "Keeping {} traffic samples taken after the report was built",
                state.samples.len()
            );
        }
        cleared
    }

    pub fn len(&self) -> usize {
        self.lock().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().samples.is_empty()
    }

    /// Interface whose counters are currently tracked
    pub fn tracked_interface(&self) -> Option<String> {
        self.lock().last.as_ref().map(|s| s.interface_name.clone())
    }
}
