//! Background daemon that updates every tree on a fixed interval.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tokio::time::interval;

use crate::app::{AppContext, CanopyError, Result};
use crate::sync::UpdateSummary;

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Seconds between updates (default: 86400 = 1 day)
    pub update_interval_secs: u64,
    pub update_on_start: bool,
    /// Log file path (None = stdout)
    pub log_file: Option<PathBuf>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: 86400,
            update_on_start: true,
            log_file: None,
        }
    }
}

/// Interval units, largest first.
const UNITS: [(char, u64); 4] = [('d', 86400), ('h', 3600), ('m', 60), ('s', 1)];

impl DaemonConfig {
    /// Seconds in an interval such as `90`, `30m`, `6h` or `1d`. A bare
    /// number is seconds.
    pub fn parse_interval(s: &str) -> std::result::Result<u64, String> {
        let s = s.trim().to_lowercase();
        let invalid = || format!("Invalid interval {:?}, use e.g. 30m, 6h or 1d", s);

        let (digits, scale) = match s.char_indices().last() {
            Some((pos, unit)) if unit.is_ascii_alphabetic() => {
                let (_, scale) = UNITS.iter().find(|(u, _)| *u == unit).ok_or_else(invalid)?;
                (&s[..pos], *scale)
            }
            _ => (s.as_str(), 1),
        };

        digits
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_mul(scale))
            .ok_or_else(invalid)
    }

    /// The shortest exact rendering of `secs` in the largest fitting unit.
    pub fn format_interval(secs: u64) -> String {
        let (unit, scale) = UNITS
            .iter()
            .find(|(_, scale)| secs >= *scale && secs % scale == 0)
            .copied()
            .unwrap_or(('s', 1));
        format!("{}{}", secs / scale, unit)
    }
}

pub struct Daemon {
    ctx: Arc<AppContext>,
    config: DaemonConfig,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
}

impl Daemon {
    pub fn new(ctx: Arc<AppContext>, config: DaemonConfig) -> Self {
        Self {
            ctx,
            config,
            running: Arc::new(AtomicBool::new(true)),
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub fn pid_file_path() -> Option<PathBuf> {
        dirs::runtime_dir()
            .or_else(dirs::cache_dir)
            .map(|d| d.join("canopy").join("daemon.pid"))
    }

    /// Whether the PID file names a live process.
    pub fn is_running() -> bool {
        Self::read_pid().is_some_and(Self::process_exists)
    }

    fn read_pid() -> Option<u32> {
        let pid_path = Self::pid_file_path()?;
        fs::read_to_string(pid_path).ok()?.trim().parse().ok()
    }

    /// `kill -0` succeeds for any live process we may signal.
    fn process_exists(pid: u32) -> bool {
        signal_process(pid, "-0").unwrap_or(false)
    }

    fn write_pid_file(&self) -> std::io::Result<()> {
        if let Some(pid_path) = Self::pid_file_path() {
            if let Some(parent) = pid_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = fs::File::create(&pid_path)?;
            writeln!(file, "{}", std::process::id())?;
        }
        Ok(())
    }

    fn remove_pid_file(&self) {
        if let Some(pid_path) = Self::pid_file_path() {
            let _ = fs::remove_file(pid_path);
        }
    }

    /// Run until SIGTERM/SIGINT or [`stop`](Self::stop).
    pub async fn run(&self) -> Result<()> {
        if Self::is_running() {
            return Err(CanopyError::Other(
                "Another daemon instance is already running".to_string(),
            ));
        }

        self.listen_for_signals()?;

        self.write_pid_file()
            .map_err(|e| CanopyError::Other(format!("Failed to write PID file: {}", e)))?;

        tracing::info!(
            interval = %DaemonConfig::format_interval(self.config.update_interval_secs),
            pid = std::process::id(),
            "canopy daemon started"
        );

        if self.config.update_on_start {
            tracing::info!("Running initial update");
            self.run_update().await;
        }

        let mut timer = interval(Duration::from_secs(self.config.update_interval_secs.max(1)));
        timer.tick().await; // Skip the first immediate tick

        while self.running.load(Ordering::SeqCst) {
            tokio::select! {
                _ = timer.tick() => {}
                _ = self.shutdown.notified() => break,
            }

            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            tracing::info!("Running scheduled update");
            self.run_update().await;
        }

        tracing::info!("Daemon shutting down");
        self.remove_pid_file();

        Ok(())
    }

    fn listen_for_signals(&self) -> Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let running = self.running.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => {},
                _ = sigint.recv() => {},
            }
            running.store(false, Ordering::SeqCst);
            shutdown.notify_one();
        });
        Ok(())
    }

    async fn run_update(&self) -> UpdateSummary {
        let start = Instant::now();
        let summary = self.ctx.tree.update_all().await;

        if summary.roots == 0 {
            tracing::info!("No folders to update");
        } else {
            tracing::info!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Update complete: {}",
                summary
            );
        }
        summary
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();
    }
}

fn signal_process(pid: u32, signal: &str) -> std::io::Result<bool> {
    std::process::Command::new("kill")
        .args([signal, &pid.to_string()])
        .status()
        .map(|status| status.success())
}

/// Send SIGTERM to the daemon named in the PID file.
pub fn stop_daemon() -> Result<u32> {
    let pid = Daemon::read_pid()
        .ok_or_else(|| CanopyError::Other("No daemon is running (no readable PID file)".into()))?;

    if !signal_process(pid, "-TERM")? {
        return Err(CanopyError::Other(format!("Failed to stop daemon (PID {})", pid)));
    }
    if let Some(path) = Daemon::pid_file_path() {
        let _ = fs::remove_file(path);
    }
    Ok(pid)
}

pub fn daemon_status() -> String {
    let has_pid_file = Daemon::pid_file_path().is_some_and(|p| p.exists());
    match Daemon::read_pid() {
        Some(pid) if Daemon::process_exists(pid) => format!("Daemon is running (PID: {})", pid),
        Some(_) => "Daemon is not running (stale PID file)".to_string(),
        None if has_pid_file => "Daemon is not running (unreadable PID file)".to_string(),
        None => "Daemon is not running".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interval() {
        assert_eq!(DaemonConfig::parse_interval("1h").unwrap(), 3600);
        assert_eq!(DaemonConfig::parse_interval("30m").unwrap(), 1800);
        assert_eq!(DaemonConfig::parse_interval("1d").unwrap(), 86400);
        assert_eq!(DaemonConfig::parse_interval("60s").unwrap(), 60);
        assert_eq!(DaemonConfig::parse_interval("3600").unwrap(), 3600);
        assert_eq!(DaemonConfig::parse_interval(" 6H ").unwrap(), 21600);
    }

    #[test]
    fn test_parse_interval_rejects_garbage() {
        for bad in ["invalid", "xd", "", "h", "5w", "-1h", "99999999999999999999d"] {
            assert!(
                DaemonConfig::parse_interval(bad).is_err(),
                "{:?} should not parse",
                bad
            );
        }
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(DaemonConfig::format_interval(3600), "1h");
        assert_eq!(DaemonConfig::format_interval(1800), "30m");
        assert_eq!(DaemonConfig::format_interval(86400), "1d");
        assert_eq!(DaemonConfig::format_interval(90), "90s");
        assert_eq!(DaemonConfig::format_interval(7200), "2h");
        assert_eq!(DaemonConfig::format_interval(0), "0s");
    }

    #[test]
    fn test_default_interval_is_daily() {
        assert_eq!(
            DaemonConfig::format_interval(DaemonConfig::default().update_interval_secs),
            "1d"
        );
    }

    #[tokio::test]
    async fn test_run_update_with_empty_tree() {
        let ctx = Arc::new(AppContext::in_memory().unwrap());
        let root = ctx.registry.ensure_root("alice").unwrap();
        let daemon = Daemon::new(ctx, DaemonConfig::default());

        let summary = daemon.run_update().await;
        assert_eq!(summary.roots, 1);
        assert_eq!(summary.children, 0);
        assert_eq!(summary.entries, 0);
        assert!(daemon.ctx.registry.folder(root).unwrap().children.is_empty());
    }
}
