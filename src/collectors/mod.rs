//! Data sources for agent reports
//!
//! Every source implements [`Collector`] and returns one [`CollectorOutput`]
//! variant. The report cycle merges outputs by variant; a source that fails or
//! has nothing to say is simply left out of the payload.

pub mod hostinfo;
pub mod network;
pub mod ssh;
pub mod system;

use async_trait::async_trait;

use crate::error::CollectorError;

pub use hostinfo::{HostInfo, HostInfoCollector};
pub use network::{NetworkCollector, TrafficSampler, TrafficSummary};
pub use ssh::{SshCollector, SshLogin};
pub use system::{SystemCollector, SystemLoad};

/// Result of one collection, tagged by the kind of data it carries
#[derive(Debug, Clone, PartialEq)]
pub enum CollectorOutput {
    SshLogins(Vec<SshLogin>),
    SystemLoad(SystemLoad),
    NetworkTraffic(TrafficSummary),
    HostInfo(HostInfo),
    /// Nothing to report this cycle
    Empty,
}

impl CollectorOutput {
    pub fn kind(&self) -> &'static str {
        match self {
            CollectorOutput::SshLogins(_) => "ssh_logins",
            CollectorOutput::SystemLoad(_) => "system_load",
            CollectorOutput::NetworkTraffic(_) => "network_traffic",
            CollectorOutput::HostInfo(_) => "host_info",
            CollectorOutput::Empty => "empty",
        }
    }
}

#[async_trait]
pub trait Collector: Send + Sync {
    /// Short name used in logs (e.g. `"ssh"`, `"network"`)
    fn name(&self) -> &str;

    async fn collect(&self) -> Result<CollectorOutput, CollectorError>;
}
