use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};
use sysinfo::System;

use crate::collectors::{Collector, CollectorOutput};
use crate::error::CollectorError;

/// 1, 5 and 15 minute load averages
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemLoad {
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
}

impl SystemLoad {
    fn validate(self) -> Result<Self, CollectorError> {
        let values = [self.load1, self.load5, self.load15];
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(CollectorError::Parse {
                collector: "system",
                message: format!(
                    "invalid load averages: {} {} {}",
                    self.load1, self.load5, self.load15
                ),
            });
        }
        Ok(self)
    }
}

#[derive(Debug, Default)]
pub struct SystemCollector;

impl SystemCollector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Collector for SystemCollector {
    fn name(&self) -> &str {
        "system"
    }

    async fn collect(&self) -> Result<CollectorOutput, CollectorError> {
        let avg = System::load_average();
        let load = SystemLoad {
            load1: avg.one,
            load5: avg.five,
            load15: avg.fifteen,
        }
        .validate()?;

        info!(
            "System load: {:.2} {:.2} {:.2}",
            load.load1, load.load5, load.load15
        );
        Ok(CollectorOutput::SystemLoad(load))
    }
}
