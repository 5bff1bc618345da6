//! Cumulative interface counters
//!
//! Reads absolute byte counters from the OS and picks the interface that
//! carries the host's public traffic.

use chrono::{DateTime, Utc};
use log::{debug, trace};
use sysinfo::Networks;

use crate::collectors::network::interface::InterfaceClassifier;
use crate::error::CollectorError;

/// Absolute counters for one interface at one point in time
#[derive(Debug, Clone, PartialEq)]
pub struct CounterSnapshot {
    pub interface_name: String,
    pub in_bytes: u64,
    pub out_bytes: u64,
    pub timestamp: DateTime<Utc>,
}

impl CounterSnapshot {
    pub fn new(interface_name: impl Into<String>, in_bytes: u64, out_bytes: u64) -> Self {
        Self {
            interface_name: interface_name.into(),
            in_bytes,
            out_bytes,
            timestamp: Utc::now(),
        }
    }

    pub fn combined_bytes(&self) -> u64 {
        self.in_bytes.saturating_add(self.out_bytes)
    }
}

/// Source of cumulative interface counters
pub trait CounterSource: Send {
    fn read_counters(&mut self) -> Result<Vec<CounterSnapshot>, CollectorError>;
}

/// Reads counters through sysinfo (procfs on Linux, sysctl on macOS)
#[derive(Debug)]
pub struct SysinfoCounters {
    networks: Networks,
}

impl Default for SysinfoCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoCounters {
    pub fn new() -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl CounterSource for SysinfoCounters {
    fn read_counters(&mut self) -> Result<Vec<CounterSnapshot>, CollectorError> {
        // refresh(true) also drops interfaces that disappeared since the last read
        self.networks.refresh(true);
        let now = Utc::now();

        let snapshots: Vec<CounterSnapshot> = self
            .networks
            .iter()
            .map(|(name, data)| CounterSnapshot {
                interface_name: name.to_string(),
                in_bytes: data.total_received(),
                out_bytes: data.total_transmitted(),
                timestamp: now,
            })
            .collect();

        if snapshots.is_empty() {
            return Err(CollectorError::Unavailable {
                collector: "network",
                message: "no network interfaces found".to_string(),
            });
        }

        trace!("Read counters for {} interfaces", snapshots.len());
        Ok(snapshots)
    }
}

/// Picks the candidate interface with the highest combined byte count.
///
/// Ties keep the first interface seen, so a host whose candidates all show
/// zero traffic still gets its first eligible interface.
pub fn select_public_interface<'a>(
    snapshots: &'a [CounterSnapshot],
    classifier: &InterfaceClassifier,
) -> Option<&'a CounterSnapshot> {
    let selected = snapshots
        .iter()
        .filter(|s| classifier.is_public_candidate(&s.interface_name))
        .fold(None::<&CounterSnapshot>, |best, s| match best {
            Some(b) if b.combined_bytes() >= s.combined_bytes() => Some(b),
            _ => Some(s),
        });

    if let Some(s) = selected {
        debug!(
            "Selected public interface '{}' (in={}, out={}) from {} interfaces",
            s.interface_name,
            s.in_bytes,
            s.out_bytes,
            snapshots.len()
        );
    }
    selected
}
