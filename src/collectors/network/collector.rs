use async_trait::async_trait;
use log::{debug, info};
use std::sync::Arc;

use crate::collectors::network::counters::{CounterSource, select_public_interface};
use crate::collectors::network::interface::InterfaceClassifier;
use crate::collectors::network::sampler::{TrafficSample, TrafficSampler};
use crate::collectors::{Collector, CollectorOutput};
use crate::error::CollectorError;

/// Network traffic collector
///
/// Sampling ticks feed counter reads into the shared [`TrafficSampler`];
/// report cycles only read the buffered samples back out.
#[derive(Debug, Clone)]
pub struct NetworkCollector {
    sampler: Arc<TrafficSampler>,
    classifier: InterfaceClassifier,
}

impl Default for NetworkCollector {
    fn default() -> Self {
        Self::new(Arc::new(TrafficSampler::new()))
    }
}

impl NetworkCollector {
    pub fn new(sampler: Arc<TrafficSampler>) -> Self {
        Self {
            sampler,
            classifier: InterfaceClassifier::new(),
        }
    }

    pub fn with_classifier(sampler: Arc<TrafficSampler>, classifier: InterfaceClassifier) -> Self {
        Self { sampler, classifier }
    }

    pub fn sampler(&self) -> &Arc<TrafficSampler> {
        &self.sampler
    }

    /// Reads counters, re-selects the public interface and records a sample.
    pub fn take_sample(
        &self,
        source: &mut dyn CounterSource,
    ) -> Result<Option<TrafficSample>, CollectorError> {
        let snapshots = source.read_counters()?;
        let public = select_public_interface(&snapshots, &self.classifier).ok_or_else(|| {
            CollectorError::Unavailable {
                collector: "network",
                message: "no valid network interface found".to_string(),
            }
        })?;

        Ok(self.sampler.sample_at(
            &public.interface_name,
            public.in_bytes,
            public.out_bytes,
            public.timestamp,
        ))
    }
}

#[async_trait]
impl Collector for NetworkCollector {
    fn name(&self) -> &str {
        "network"
    }

    async fn collect(&self) -> Result<CollectorOutput, CollectorError> {
        match self.sampler.drain() {
            Some(summary) => {
                debug!(
                    "Network collector returning {} samples for {}",
                    summary.sample_count, summary.interface
                );
                Ok(CollectorOutput::NetworkTraffic(summary))
            }
            None => {
                info!("No network traffic samples available yet, skipping");
                Ok(CollectorOutput::Empty)
            }
        }
    }
}
