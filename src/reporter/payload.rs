//! Report wire format
//!
//! One [`ReportPayload`] is built per report cycle by merging collector
//! outputs by variant. Sources that produced nothing leave their field out of
//! the JSON body entirely.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::collectors::{CollectorOutput, HostInfo, SshLogin, SystemLoad, TrafficSummary};
use crate::config::MAX_REPORT_INTERVAL;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportPayload {
    pub hostname: String,
    pub public_ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_logins: Option<Vec<SshLogin>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_load: Option<SystemLoad>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_traffic: Option<TrafficSummary>,
}

impl ReportPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one collector result into the payload.
    pub fn merge(&mut self, output: CollectorOutput) {
        match output {
            CollectorOutput::SshLogins(logins) => {
                debug!("Merging {} SSH login entries", logins.len());
                self.ssh_logins = Some(logins);
            }
            CollectorOutput::SystemLoad(load) => {
                self.system_load = Some(load);
            }
            CollectorOutput::NetworkTraffic(summary) => {
                debug!(
                    "Merging network traffic for {} ({} samples)",
                    summary.interface, summary.sample_count
                );
                self.network_traffic = Some(summary);
            }
            CollectorOutput::HostInfo(info) => self.merge_host_info(info),
            CollectorOutput::Empty => {}
        }
    }

    fn merge_host_info(&mut self, info: HostInfo) {
        if !self.hostname.is_empty() && self.hostname != info.hostname {
            warn!(
                "Host info reported hostname {} after {} was set, keeping the latest",
                info.hostname, self.hostname
            );
        }
        self.hostname = info.hostname;
        self.public_ip = info.public_ip;
    }

    /// Number of sections carrying data, host identity excluded
    pub fn section_count(&self) -> usize {
        [
            self.ssh_logins.is_some(),
            self.system_load.is_some(),
            self.network_traffic.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }
}

/// Server answer to an accepted report
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServerDirective {
    #[serde(default)]
    pub success: bool,
    /// New report interval in seconds; absent, zero or above
    /// [`MAX_REPORT_INTERVAL`] means unchanged
    #[serde(default)]
    pub report_interval: Option<u64>,
}

impl ServerDirective {
    /// The interval to switch to, if it differs from `current_secs`
    pub fn interval_change(&self, current_secs: u64) -> Option<u64> {
        let secs = self.report_interval.filter(|secs| *secs > 0)?;
        if secs > MAX_REPORT_INTERVAL {
            warn!(
                "Ignoring server report interval of {} seconds (maximum {})",
                secs, MAX_REPORT_INTERVAL
            );
            return None;
        }
        (secs != current_secs).then_some(secs)
    }
}
