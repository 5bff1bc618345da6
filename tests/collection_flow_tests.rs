use chrono::{Duration as ChronoDuration, Local, Utc};
use kaipo_agent::collectors::network::interface::Platform;
use kaipo_agent::collectors::network::{
    CounterSnapshot, CounterSource, InterfaceClassifier, SysinfoCounters,
};
use kaipo_agent::collectors::{
    Collector, CollectorOutput, NetworkCollector, SshCollector, TrafficSampler,
};
use kaipo_agent::error::CollectorError;
use kaipo_agent::reporter::ReportPayload;
use std::io::Write;
use std::sync::Arc;

/// Integration tests for the collection side: counter reads through the
/// sampler into report payloads, and SSH log scanning from real files

/// Replays a fixed list of counter reads, one per call
struct ReplayCounters {
    reads: Vec<Vec<(&'static str, u64, u64)>>,
    offset_secs: i64,
}

impl CounterSource for ReplayCounters {
    fn read_counters(&mut self) -> Result<Vec<CounterSnapshot>, CollectorError> {
        if self.reads.is_empty() {
            return Err(CollectorError::Unavailable {
                collector: "network",
                message: "no more reads".to_string(),
            });
        }
        let timestamp = Utc::now() + ChronoDuration::seconds(self.offset_secs);
        self.offset_secs += 300;
        Ok(self
            .reads
            .remove(0)
            .into_iter()
            .map(|(name, rx, tx)| CounterSnapshot {
                interface_name: name.to_string(),
                in_bytes: rx,
                out_bytes: tx,
                timestamp,
            })
            .collect())
    }
}

fn linux_collector() -> NetworkCollector {
    NetworkCollector::with_classifier(
        Arc::new(TrafficSampler::new()),
        InterfaceClassifier::for_platform(Platform::Linux),
    )
}

#[tokio::test]
async fn test_busiest_public_interface_feeds_payload() {
    let collector = linux_collector();
    let mut source = ReplayCounters {
        reads: vec![
            vec![("lo", 90_000, 90_000), ("docker0", 80_000, 80_000), ("eth0", 1_000, 500)],
            vec![("lo", 99_000, 99_000), ("docker0", 88_000, 88_000), ("eth0", 1_500, 700)],
            vec![("lo", 99_500, 99_500), ("docker0", 89_000, 89_000), ("eth0", 4_500, 1_300)],
        ],
        offset_secs: 0,
    };

    for _ in 0..3 {
        collector.take_sample(&mut source).unwrap();
    }

    let output = collector.collect().await.unwrap();
    let mut payload = ReportPayload::new();
    payload.merge(output);

    let traffic = payload.network_traffic.as_ref().expect("traffic summary");
    assert_eq!(traffic.interface, "eth0");
    assert_eq!(traffic.sample_count, 2);
    let in_total: u64 = traffic.samples.iter().map(|s| s.in_bytes).sum();
    let out_total: u64 = traffic.samples.iter().map(|s| s.out_bytes).sum();
    assert_eq!(in_total, 3_500);
    assert_eq!(out_total, 800);
    // 3500 bytes in and 800 bytes out over 600 seconds
    assert_eq!(traffic.avg_in_bytes_per_sec, 5);
    assert_eq!(traffic.avg_out_bytes_per_sec, 1);
}

#[tokio::test]
async fn test_interface_switch_drops_one_sample() {
    let collector = linux_collector();
    let mut source = ReplayCounters {
        reads: vec![
            vec![("eth0", 1_000, 1_000), ("wlan0", 10, 10)],
            vec![("eth0", 2_000, 2_000), ("wlan0", 20, 20)],
            // wlan0 takes over as busiest interface
            vec![("eth0", 2_000, 2_000), ("wlan0", 90_000, 90_000)],
            vec![("eth0", 2_000, 2_000), ("wlan0", 91_000, 90_500)],
        ],
        offset_secs: 0,
    };

    let results: Vec<_> = (0..4)
        .map(|_| collector.take_sample(&mut source).unwrap())
        .collect();
    assert!(results[0].is_none());
    assert!(results[1].is_some());
    assert!(results[2].is_none());
    assert_eq!(results[3].as_ref().unwrap().in_bytes, 1_000);

    assert_eq!(collector.sampler().tracked_interface().as_deref(), Some("wlan0"));
    assert_eq!(collector.sampler().len(), 2);
}

#[tokio::test]
async fn test_cleared_buffer_reports_empty() {
    let collector = linux_collector();
    let mut source = ReplayCounters {
        reads: vec![vec![("eth0", 0, 0)], vec![("eth0", 100, 100)]],
        offset_secs: 0,
    };
    collector.take_sample(&mut source).unwrap();
    collector.take_sample(&mut source).unwrap();

    assert_eq!(collector.sampler().clear(), 1);
    assert!(matches!(
        collector.collect().await.unwrap(),
        CollectorOutput::Empty
    ));
}

#[test]
fn test_sysinfo_counters_read_host_interfaces() {
    let mut counters = SysinfoCounters::new();
    // containers without network namespaces may expose no interfaces at all
    if let Ok(snapshots) = counters.read_counters() {
        assert!(!snapshots.is_empty());
        assert!(snapshots.iter().all(|s| !s.interface_name.is_empty()));
    }
}

#[tokio::test]
async fn test_ssh_collector_reads_recent_entries() {
    let mut log = tempfile::NamedTempFile::new().unwrap();
    let recent = (Local::now() - ChronoDuration::minutes(2)).format("%b %e %H:%M:%S");
    let old = (Local::now() - ChronoDuration::hours(3)).format("%b %e %H:%M:%S");

    writeln!(
        log,
        "{old} host sshd[100]: Accepted password for stale-user from 192.0.2.1 port 2200 ssh2"
    )
    .unwrap();
    writeln!(
        log,
        "{recent} host sshd[101]: Accepted publickey for it-deploy from 198.51.100.20 port 51515 ssh2: ED25519 SHA256:x"
    )
    .unwrap();
    writeln!(
        log,
        "{recent} host sshd[102]: Invalid user it-probe from 203.0.113.99 port 40404"
    )
    .unwrap();
    writeln!(log, "{recent} host kernel: unrelated line").unwrap();
    log.flush().unwrap();

    let collector = SshCollector::with_log_paths(vec![log.path().to_path_buf()]);
    let logins = match collector.collect().await.unwrap() {
        CollectorOutput::SshLogins(logins) => logins,
        other => panic!("unexpected output: {:?}", other),
    };

    assert!(logins.iter().all(|l| l.user != "stale-user"));

    let deploy = logins.iter().find(|l| l.user == "it-deploy").unwrap();
    assert!(deploy.success);
    assert_eq!(deploy.method, "publickey");
    assert_eq!(deploy.port, 51515);
    assert_eq!(deploy.ip, "198.51.100.20");

    let probe = logins.iter().find(|l| l.user == "it-probe").unwrap();
    assert!(!probe.success);
    assert!(!probe.is_active);
}
