#[cfg(feature = "cli")]
use std::sync::Mutex;
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// 單一階段結束時的資源快照
#[derive(Debug, Clone)]
pub struct PhaseStats {
    pub phase: String,
    pub memory_mb: u64,
    pub peak_memory_mb: u64,
    pub elapsed: Duration,
}

#[cfg(feature = "cli")]
struct Probe {
    system: System,
    pid: Pid,
    peak_memory_mb: u64,
}

/// Records process memory and elapsed time at each pipeline phase.
pub struct SystemMonitor {
    #[cfg(feature = "cli")]
    probe: Option<Mutex<Probe>>,
    start_time: Instant,
}

impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        #[cfg(feature = "cli")]
        let probe = if enabled {
            match sysinfo::get_current_pid() {
                Ok(pid) => Some(Mutex::new(Probe {
                    system: System::new(),
                    pid,
                    peak_memory_mb: 0,
                })),
                Err(e) => {
                    tracing::warn!("⚠️ System monitoring disabled: {}", e);
                    None
                }
            }
        } else {
            None
        };
        #[cfg(not(feature = "cli"))]
        let _ = enabled;

        Self {
            #[cfg(feature = "cli")]
            probe,
            start_time: Instant::now(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        #[cfg(feature = "cli")]
        {
            self.probe.is_some()
        }
        #[cfg(not(feature = "cli"))]
        {
            false
        }
    }

    #[cfg(feature = "cli")]
    pub fn snapshot(&self, phase: &str) -> Option<PhaseStats> {
        let mut probe = self.probe.as_ref()?.lock().ok()?;
        let pid = probe.pid;
        probe.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        let memory_mb = probe.system.process(pid)?.memory() / 1024 / 1024;
        probe.peak_memory_mb = probe.peak_memory_mb.max(memory_mb);

        Some(PhaseStats {
            phase: phase.to_string(),
            memory_mb,
            peak_memory_mb: probe.peak_memory_mb,
            elapsed: self.start_time.elapsed(),
        })
    }

    #[cfg(not(feature = "cli"))]
    pub fn snapshot(&self, _phase: &str) -> Option<PhaseStats> {
        None
    }

    pub fn log_stats(&self, phase: &str) {
        if let Some(stats) = self.snapshot(phase) {
            tracing::info!(
                "📊 {} - Memory: {}MB, Peak: {}MB, Time: {:?}",
                stats.phase,
                stats.memory_mb,
                stats.peak_memory_mb,
                stats.elapsed
            );
        }
    }

    pub fn log_final_stats(&self) {
        if let Some(stats) = self.snapshot("final") {
            tracing::info!(
                "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB",
                stats.elapsed,
                stats.peak_memory_mb
            );
        }
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}
