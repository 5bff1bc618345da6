//! Process lifecycle
//!
//! PID file marking the single running agent instance, and the stop signal
//! shared by the report loop and the sampling task.

use log::{debug, info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl Default for PidFile {
    fn default() -> Self {
        Self::new(default_pid_path())
    }
}

impl PidFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, pid: u32) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, pid.to_string())?;
        debug!("Wrote PID {} to {}", pid, self.path.display());
        Ok(())
    }

    pub fn write_current(&self) -> io::Result<()> {
        self.write(std::process::id())
    }

    /// `Ok(None)` when no PID file exists
    pub fn read(&self) -> io::Result<Option<u32>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        content.trim().parse::<u32>().map(Some).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid PID file {}: {}", self.path.display(), e),
            )
        })
    }

    pub fn remove(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed PID file {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// PID of the running agent. A stale or unreadable PID file is removed.
    pub fn status(&self) -> io::Result<Option<u32>> {
        let pid = match self.read() {
            Ok(Some(pid)) => pid,
            Ok(None) => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                warn!("{}, removing", e);
                self.remove()?;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if is_alive(pid) {
            Ok(Some(pid))
        } else {
            info!("Removing stale PID file for process {}", pid);
            self.remove()?;
            Ok(None)
        }
    }

    /// Sends SIGTERM to the recorded process and returns its PID.
    pub fn signal_stop(&self) -> io::Result<u32> {
        let pid = self.read()?.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("PID file {} not found", self.path.display()),
            )
        })?;
        send_terminate(pid)?;
        info!("Sent SIGTERM to agent (PID: {})", pid);
        Ok(pid)
    }
}

/// `/var/run/kaipo-agent.pid` for root, the temp dir otherwise
pub fn default_pid_path() -> PathBuf {
    #[cfg(unix)]
    {
        if nix::unistd::geteuid().is_root() {
            return PathBuf::from("/var/run/kaipo-agent.pid");
        }
    }
    std::env::temp_dir().join("kaipo-agent.pid")
}

#[cfg(unix)]
fn is_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    match kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        // exists but belongs to another user
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_alive(_pid: u32) -> bool {
    true
}

#[cfg(unix)]
fn send_terminate(pid: u32) -> io::Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("invalid PID {}", pid)))?;
    kill(Pid::from_raw(raw), Signal::SIGTERM).map_err(io::Error::from)
}

#[cfg(not(unix))]
fn send_terminate(_pid: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "stopping the agent is only supported on unix",
    ))
}

/// Stop flag observed by every long-running task
pub fn stop_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Flips the stop flag on the first SIGINT, SIGTERM or SIGHUP.
pub fn spawn_signal_listener(stop: watch::Sender<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let name = wait_for_signal().await;
        info!("Received signal: {}", name);
        if stop.send(true).is_err() {
            debug!("No task is waiting for the stop signal");
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    let (mut term, mut hup) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::hangup()),
    ) {
        (Ok(term), Ok(hup)) => (term, hup),
        (Err(e), _) | (_, Err(e)) => {
            warn!("Failed to install signal handlers, only Ctrl-C will stop the agent: {}", e);
            return wait_for_ctrl_c().await;
        }
    };

    tokio::select! {
        name = wait_for_ctrl_c() => name,
        _ = term.recv() => "SIGTERM",
        _ = hup.recv() => "SIGHUP",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() -> &'static str {
    match tokio::signal::ctrl_c().await {
        Ok(()) => "SIGINT",
        Err(e) => {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending().await
        }
    }
}
