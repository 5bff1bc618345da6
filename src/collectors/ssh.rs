//! SSH login activity
//!
//! Scans the tail of the system auth logs for accepted, failed and
//! invalid-user attempts from the last 15 minutes, then marks successful
//! logins that still have a live remote session (from `who -u`).

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, Local, NaiveDateTime, TimeZone};
use log::{debug, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::collectors::{Collector, CollectorOutput};
use crate::error::CollectorError;

/// Only the newest lines of each log are inspected
const MAX_LINES: usize = 1000;

/// Log entries older than this are not reported
const RECENT_WINDOW_MINUTES: i64 = 15;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SshLogin {
    pub user: String,
    pub ip: String,
    /// Local time, `YYYY-MM-DD HH:MM:SS`
    pub time: String,
    /// password, publickey, keyboard-interactive, ...
    pub method: String,
    pub success: bool,
    pub port: u16,
    pub protocol: String,
    /// Seconds the session has been open, 0 when not active
    pub session_duration: i64,
    pub is_active: bool,
}

/// A parsed log entry with its resolved timestamp
#[derive(Debug, Clone)]
struct AuthEvent {
    login: SshLogin,
    at: DateTime<Local>,
}

struct LinePatterns {
    auth_result: Regex,
    invalid_user: Regex,
}

impl LinePatterns {
    fn compile() -> Result<Self, regex::Error> {
        // syslog ("Jan 30 10:00:00") or RFC 3339 ("2024-01-30T10:00:00.123+00:00") prefixes
        let ts = r"^(\w{3}\s+\d{1,2}\s+\d{2}:\d{2}:\d{2}|\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\S*)";
        Ok(Self {
            auth_result: Regex::new(&format!(
                r"{ts}.*sshd\[\d+\]:\s+(Accepted|Failed)\s+(\S+)\s+for\s+(?:invalid user\s+)?(\S+)\s+from\s+([0-9A-Fa-f:.]+)\s+port\s+(\d+)"
            ))?,
            invalid_user: Regex::new(&format!(
                r"{ts}.*sshd\[\d+\]:\s+Invalid user\s+(\S+)\s+from\s+([0-9A-Fa-f:.]+)\s+port\s+(\d+)"
            ))?,
        })
    }
}

pub struct SshCollector {
    log_paths: Vec<PathBuf>,
}

impl Default for SshCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl SshCollector {
    pub fn new() -> Self {
        let mut paths = vec![
            PathBuf::from("/var/log/auth.log"), // Debian/Ubuntu
            PathBuf::from("/var/log/secure"),   // RHEL/CentOS/Amazon Linux
            PathBuf::from("/var/log/messages"),
        ];
        if cfg!(target_os = "macos") {
            paths.insert(0, PathBuf::from("/var/log/system.log"));
        }
        Self::with_log_paths(paths)
    }

    pub fn with_log_paths(log_paths: Vec<PathBuf>) -> Self {
        Self { log_paths }
    }

    async fn read_tail(path: &Path) -> std::io::Result<Vec<String>> {
        let bytes = tokio::fs::read(path).await?;
        let content = String::from_utf8_lossy(&bytes);
        let lines: Vec<&str> = content.lines().collect();
        let start = lines.len().saturating_sub(MAX_LINES);
        Ok(lines[start..].iter().map(|l| l.to_string()).collect())
    }

    async fn active_sessions(&self, now: DateTime<Local>) -> Vec<SshLogin> {
        let output = match Command::new("who").arg("-u").output().await {
            Ok(out) if out.status.success() => out,
            Ok(out) => {
                warn!("'who -u' exited with {}", out.status);
                return Vec::new();
            }
            Err(e) => {
                warn!("Failed to run 'who -u': {}", e);
                return Vec::new();
            }
        };

        let sessions: Vec<SshLogin> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(|line| parse_who_line(line, now))
            .collect();
        info!("Found {} active remote sessions", sessions.len());
        sessions
    }
}

#[async_trait]
impl Collector for SshCollector {
    fn name(&self) -> &str {
        "ssh"
    }

    async fn collect(&self) -> Result<CollectorOutput, CollectorError> {
        let patterns = LinePatterns::compile().map_err(|e| CollectorError::Parse {
            collector: "ssh",
            message: e.to_string(),
        })?;
        let now = Local::now();

        let mut events = Vec::new();
        for path in &self.log_paths {
            if !path.exists() {
                continue;
            }
            match Self::read_tail(path).await {
                Ok(lines) => {
                    let parsed = parse_log_lines(&lines, &patterns, now);
                    info!("Found {} SSH log entries in {}", parsed.len(), path.display());
                    events.extend(parsed);
                }
                Err(e) => warn!("Failed to parse {}: {}", path.display(), e),
            }
        }

        let recent = filter_recent(events, now, Duration::minutes(RECENT_WINDOW_MINUTES));
        let sessions = self.active_sessions(now).await;

        if recent.is_empty() {
            // binary-only logs (e.g. macOS unified logging) still show live sessions
            debug!("No SSH log entries found, reporting active sessions only");
            return Ok(CollectorOutput::SshLogins(sessions));
        }

        let logins = enrich_with_sessions(recent, &sessions, now);
        info!("Total SSH log entries collected: {}", logins.len());
        Ok(CollectorOutput::SshLogins(logins))
    }
}

fn parse_log_lines(lines: &[String], patterns: &LinePatterns, now: DateTime<Local>) -> Vec<AuthEvent> {
    lines
        .iter()
        .filter_map(|line| parse_auth_line(line, patterns, now))
        .collect()
}

fn parse_auth_line(line: &str, patterns: &LinePatterns, now: DateTime<Local>) -> Option<AuthEvent> {
    if let Some(caps) = patterns.auth_result.captures(line) {
        let at = resolve_log_time(&caps[1], now)?;
        return Some(AuthEvent {
            login: SshLogin {
                user: caps[4].to_string(),
                ip: caps[5].to_string(),
                time: at.format(TIME_FORMAT).to_string(),
                method: caps[3].to_string(),
                success: &caps[2] == "Accepted",
                port: caps[6].parse().unwrap_or(0),
                protocol: "ssh2".to_string(),
                session_duration: 0,
                is_active: false,
            },
            at,
        });
    }

    let caps = patterns.invalid_user.captures(line)?;
    let at = resolve_log_time(&caps[1], now)?;
    Some(AuthEvent {
        login: SshLogin {
            user: caps[2].to_string(),
            ip: caps[3].to_string(),
            time: at.format(TIME_FORMAT).to_string(),
            method: "password".to_string(),
            success: false,
            port: caps[4].parse().unwrap_or(0),
            protocol: "ssh2".to_string(),
            session_duration: 0,
            is_active: false,
        },
        at,
    })
}

/// Resolves a log timestamp. Syslog stamps carry no year: the current year is
/// assumed unless that lands more than a day in the future, in which case the
/// entry is from last year.
fn resolve_log_time(raw: &str, now: DateTime<Local>) -> Option<DateTime<Local>> {
    if raw.contains('T') {
        return DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Local));
    }

    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let with_year = |year: i32| {
        NaiveDateTime::parse_from_str(&format!("{} {}", year, normalized), "%Y %b %d %H:%M:%S")
            .ok()
            .and_then(|naive| Local.from_local_datetime(&naive).earliest())
    };

    let this_year = with_year(now.year())?;
    if this_year > now + Duration::days(1) {
        with_year(now.year() - 1)
    } else {
        Some(this_year)
    }
}

fn filter_recent(events: Vec<AuthEvent>, now: DateTime<Local>, window: Duration) -> Vec<AuthEvent> {
    let cutoff = now - window;
    events.into_iter().filter(|e| e.at > cutoff).collect()
}

/// Parses one `who -u` line; local (non-remote) sessions yield `None`.
///
/// Linux: `alice pts/0 2026-01-31 10:00 00:05 1234 (203.0.113.7)`
/// macOS: `alice ttys000 Jan 31 10:00 (203.0.113.7)`
fn parse_who_line(line: &str, now: DateTime<Local>) -> Option<SshLogin> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 3 || fields[0] == "USER" {
        return None;
    }

    let last = fields[fields.len() - 1];
    let ip = last.strip_prefix('(')?.strip_suffix(')')?;
    // X displays show up as "(:0)"; remote peers are addresses or hostnames
    if ip.parse::<std::net::IpAddr>().is_err() && !ip.contains('.') {
        return None;
    }

    let login_time = parse_who_time(&fields[2..], now);
    let session_duration = login_time
        .map(|t| (now - t).num_seconds().max(0))
        .unwrap_or(0);

    Some(SshLogin {
        user: fields[0].to_string(),
        ip: ip.to_string(),
        time: login_time
            .map(|t| t.format(TIME_FORMAT).to_string())
            .unwrap_or_default(),
        method: String::new(),
        success: true,
        port: 0,
        protocol: "ssh2".to_string(),
        session_duration,
        is_active: true,
    })
}

fn parse_who_time(fields: &[&str], now: DateTime<Local>) -> Option<DateTime<Local>> {
    let local = |naive: NaiveDateTime| Local.from_local_datetime(&naive).earliest();

    if fields.len() >= 2 {
        let iso = format!("{} {}", fields[0], fields[1]);
        if let Ok(naive) = NaiveDateTime::parse_from_str(&iso, "%Y-%m-%d %H:%M") {
            return local(naive);
        }
    }
    if fields.len() >= 3 {
        let stamp = format!("{} {} {}", fields[0], fields[1], fields[2]);
        return resolve_log_time(&format!("{}:00", stamp), now);
    }
    None
}

/// Marks successful logins that match a live session as active.
fn enrich_with_sessions(events: Vec<AuthEvent>, sessions: &[SshLogin], now: DateTime<Local>) -> Vec<SshLogin> {
    let active: HashSet<(&str, &str)> = sessions
        .iter()
        .map(|s| (s.user.as_str(), s.ip.as_str()))
        .collect();

    events
        .into_iter()
        .map(|event| {
            let mut login = event.login;
            if login.success && active.contains(&(login.user.as_str(), login.ip.as_str())) {
                login.is_active = true;
                login.session_duration = (now - event.at).num_seconds().max(0);
            }
            login
        })
        .collect()
}
